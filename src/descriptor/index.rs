use std::collections::{hash_map, HashMap};

use crate::{
    index_to_i32, make_name,
    tag,
    types::{DescriptorProto, EnumDescriptorProto, FileDescriptorProto},
};

/// The kind of entity a fully-qualified name refers to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DefinitionKind {
    Package,
    Message,
    Field,
    Oneof,
    Enum,
    EnumValue,
    Extension,
    Service,
    Method,
}

/// An entry in the name index of a file: the kind of entity, and its position in the
/// flattened list of entities of that kind.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct Definition {
    pub kind: DefinitionKind,
    pub index: usize,
}

/// Every named element of a file, flattened in declaration order and addressable by index.
///
/// The index only depends on the structure of the file, so it is the same before and
/// after type names are resolved.
#[derive(Debug, Default)]
pub(crate) struct Index {
    pub package: String,
    pub messages: Vec<MessageIndex>,
    pub fields: Vec<FieldIndex>,
    pub extensions: Vec<FieldIndex>,
    pub oneofs: Vec<OneofIndex>,
    pub enums: Vec<EnumIndex>,
    pub values: Vec<ValueIndex>,
    pub services: Vec<ServiceIndex>,
    pub methods: Vec<MethodIndex>,
    pub names: HashMap<String, Definition>,
    /// Every declared name, including duplicates, in the order they were declared.
    pub declarations: Vec<Declaration>,
}

#[derive(Debug, Clone)]
pub(crate) struct Declaration {
    pub full_name: String,
    pub kind: DefinitionKind,
    pub path: Vec<i32>,
}

#[derive(Debug, Clone)]
pub(crate) struct MessageIndex {
    pub full_name: String,
    pub path: Vec<i32>,
    pub parent: Option<usize>,
    pub fields: Vec<usize>,
    pub oneofs: Vec<usize>,
    pub nested: Vec<usize>,
    pub enums: Vec<usize>,
    pub extensions: Vec<usize>,
    pub is_map_entry: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct FieldIndex {
    pub full_name: String,
    pub path: Vec<i32>,
    /// The message the field is declared in, which for extensions is not the extendee.
    pub parent: Option<usize>,
    pub oneof: Option<usize>,
}

#[derive(Debug, Clone)]
pub(crate) struct OneofIndex {
    pub full_name: String,
    pub path: Vec<i32>,
    pub parent: usize,
    pub fields: Vec<usize>,
}

#[derive(Debug, Clone)]
pub(crate) struct EnumIndex {
    pub full_name: String,
    pub path: Vec<i32>,
    pub parent: Option<usize>,
    pub values: Vec<usize>,
}

#[derive(Debug, Clone)]
pub(crate) struct ValueIndex {
    pub full_name: String,
    pub path: Vec<i32>,
    pub parent: usize,
}

#[derive(Debug, Clone)]
pub(crate) struct ServiceIndex {
    pub full_name: String,
    pub path: Vec<i32>,
    pub methods: Vec<usize>,
}

#[derive(Debug, Clone)]
pub(crate) struct MethodIndex {
    pub full_name: String,
    pub path: Vec<i32>,
    pub parent: usize,
}

impl Index {
    pub fn build(file: &FileDescriptorProto) -> Self {
        let mut index = Index {
            package: file.package().to_owned(),
            ..Default::default()
        };

        if !file.package().is_empty() {
            let mut package = String::new();
            for part in file.package().split('.') {
                package = make_name(&package, part);
                index.declare(package.clone(), DefinitionKind::Package, vec![tag::file::PACKAGE]);
            }
        }

        let scope = index.package.clone();
        for (i, message) in file.message_type.iter().enumerate() {
            index.add_message(
                &scope,
                None,
                message,
                vec![tag::file::MESSAGE_TYPE, index_to_i32(i)],
            );
        }
        for (i, enum_) in file.enum_type.iter().enumerate() {
            index.add_enum(&scope, None, enum_, vec![tag::file::ENUM_TYPE, index_to_i32(i)]);
        }
        for (i, extension) in file.extension.iter().enumerate() {
            index.add_extension(
                &scope,
                None,
                extension.name(),
                vec![tag::file::EXTENSION, index_to_i32(i)],
            );
        }
        for (i, service) in file.service.iter().enumerate() {
            let full_name = make_name(&scope, service.name());
            let path = vec![tag::file::SERVICE, index_to_i32(i)];
            let service_index = index.services.len();
            index.declare(full_name.clone(), DefinitionKind::Service, path.clone());
            index.services.push(ServiceIndex {
                full_name: full_name.clone(),
                path: path.clone(),
                methods: Vec::new(),
            });

            for (j, method) in service.method.iter().enumerate() {
                let method_name = make_name(&full_name, method.name());
                let mut method_path = path.clone();
                method_path.extend([tag::service::METHOD, index_to_i32(j)]);

                let method_index = index.methods.len();
                index.declare(method_name.clone(), DefinitionKind::Method, method_path.clone());
                index.methods.push(MethodIndex {
                    full_name: method_name,
                    path: method_path,
                    parent: service_index,
                });
                index.services[service_index].methods.push(method_index);
            }
        }

        index
    }

    fn declare(&mut self, full_name: String, kind: DefinitionKind, path: Vec<i32>) {
        let index = match kind {
            DefinitionKind::Package => 0,
            DefinitionKind::Message => self.messages.len(),
            DefinitionKind::Field => self.fields.len(),
            DefinitionKind::Oneof => self.oneofs.len(),
            DefinitionKind::Enum => self.enums.len(),
            DefinitionKind::EnumValue => self.values.len(),
            DefinitionKind::Extension => self.extensions.len(),
            DefinitionKind::Service => self.services.len(),
            DefinitionKind::Method => self.methods.len(),
        };

        if kind != DefinitionKind::Package {
            self.declarations.push(Declaration {
                full_name: full_name.clone(),
                kind,
                path,
            });
        }

        if let hash_map::Entry::Vacant(entry) = self.names.entry(full_name) {
            entry.insert(Definition { kind, index });
        }
    }

    fn add_message(
        &mut self,
        scope: &str,
        parent: Option<usize>,
        message: &DescriptorProto,
        path: Vec<i32>,
    ) -> usize {
        let full_name = make_name(scope, message.name());
        let message_index = self.messages.len();
        self.declare(full_name.clone(), DefinitionKind::Message, path.clone());
        self.messages.push(MessageIndex {
            full_name: full_name.clone(),
            path: path.clone(),
            parent,
            fields: Vec::new(),
            oneofs: Vec::new(),
            nested: Vec::new(),
            enums: Vec::new(),
            extensions: Vec::new(),
            is_map_entry: message
                .options
                .as_ref()
                .map_or(false, |options| options.map_entry()),
        });

        for (i, oneof) in message.oneof_decl.iter().enumerate() {
            let oneof_name = make_name(&full_name, oneof.name());
            let mut oneof_path = path.clone();
            oneof_path.extend([tag::message::ONEOF_DECL, index_to_i32(i)]);

            let oneof_index = self.oneofs.len();
            self.declare(oneof_name.clone(), DefinitionKind::Oneof, oneof_path.clone());
            self.oneofs.push(OneofIndex {
                full_name: oneof_name,
                path: oneof_path,
                parent: message_index,
                fields: Vec::new(),
            });
            self.messages[message_index].oneofs.push(oneof_index);
        }

        for (i, field) in message.field.iter().enumerate() {
            let field_name = make_name(&full_name, field.name());
            let mut field_path = path.clone();
            field_path.extend([tag::message::FIELD, index_to_i32(i)]);

            let oneof = field
                .oneof_index
                .and_then(|oneof| usize::try_from(oneof).ok())
                .and_then(|oneof| self.messages[message_index].oneofs.get(oneof).copied());

            let field_index = self.fields.len();
            self.declare(field_name.clone(), DefinitionKind::Field, field_path.clone());
            self.fields.push(FieldIndex {
                full_name: field_name,
                path: field_path,
                parent: Some(message_index),
                oneof,
            });
            self.messages[message_index].fields.push(field_index);
            if let Some(oneof) = oneof {
                self.oneofs[oneof].fields.push(field_index);
            }
        }

        for (i, nested) in message.nested_type.iter().enumerate() {
            let mut nested_path = path.clone();
            nested_path.extend([tag::message::NESTED_TYPE, index_to_i32(i)]);
            let nested_index = self.add_message(&full_name, Some(message_index), nested, nested_path);
            self.messages[message_index].nested.push(nested_index);
        }

        for (i, enum_) in message.enum_type.iter().enumerate() {
            let mut enum_path = path.clone();
            enum_path.extend([tag::message::ENUM_TYPE, index_to_i32(i)]);
            let enum_index = self.add_enum(&full_name, Some(message_index), enum_, enum_path);
            self.messages[message_index].enums.push(enum_index);
        }

        for (i, extension) in message.extension.iter().enumerate() {
            let mut extension_path = path.clone();
            extension_path.extend([tag::message::EXTENSION, index_to_i32(i)]);
            let extension_index =
                self.add_extension(&full_name, Some(message_index), extension.name(), extension_path);
            self.messages[message_index].extensions.push(extension_index);
        }

        message_index
    }

    fn add_enum(
        &mut self,
        scope: &str,
        parent: Option<usize>,
        enum_: &EnumDescriptorProto,
        path: Vec<i32>,
    ) -> usize {
        let full_name = make_name(scope, enum_.name());
        let enum_index = self.enums.len();
        self.declare(full_name.clone(), DefinitionKind::Enum, path.clone());
        self.enums.push(EnumIndex {
            full_name,
            path: path.clone(),
            parent,
            values: Vec::new(),
        });

        for (i, value) in enum_.value.iter().enumerate() {
            // Enum values are scoped as siblings of their enum.
            let value_name = make_name(scope, value.name());
            let mut value_path = path.clone();
            value_path.extend([tag::enum_::VALUE, index_to_i32(i)]);

            let value_index = self.values.len();
            self.declare(value_name.clone(), DefinitionKind::EnumValue, value_path.clone());
            self.values.push(ValueIndex {
                full_name: value_name,
                path: value_path,
                parent: enum_index,
            });
            self.enums[enum_index].values.push(value_index);
        }

        enum_index
    }

    fn add_extension(
        &mut self,
        scope: &str,
        parent: Option<usize>,
        name: &str,
        path: Vec<i32>,
    ) -> usize {
        let full_name = make_name(scope, name);
        let extension_index = self.extensions.len();
        self.declare(full_name.clone(), DefinitionKind::Extension, path.clone());
        self.extensions.push(FieldIndex {
            full_name,
            path,
            parent,
            oneof: None,
        });
        extension_index
    }

    pub fn get(&self, full_name: &str) -> Option<Definition> {
        self.names.get(full_name).copied()
    }

    pub fn message_by_name(&self, full_name: &str) -> Option<usize> {
        match self.get(full_name) {
            Some(Definition {
                kind: DefinitionKind::Message,
                index,
            }) => Some(index),
            _ => None,
        }
    }

    pub fn enum_by_name(&self, full_name: &str) -> Option<usize> {
        match self.get(full_name) {
            Some(Definition {
                kind: DefinitionKind::Enum,
                index,
            }) => Some(index),
            _ => None,
        }
    }

    /// The full name of the scope a definition is declared in, used as the starting
    /// point for resolving names relative to it.
    pub fn scope_of(&self, path: &[i32]) -> &str {
        let mut best: &str = &self.package;
        for message in &self.messages {
            if path.len() > message.path.len() && path.starts_with(&message.path) {
                best = &message.full_name;
            }
        }
        best
    }
}

impl DefinitionKind {
    /// Whether a name of this kind may contain other names.
    pub fn is_aggregate(self) -> bool {
        matches!(
            self,
            DefinitionKind::Package
                | DefinitionKind::Message
                | DefinitionKind::Enum
                | DefinitionKind::Service
        )
    }

    pub fn is_type(self) -> bool {
        matches!(self, DefinitionKind::Message | DefinitionKind::Enum)
    }

    pub fn describe(self) -> &'static str {
        match self {
            DefinitionKind::Package => "package",
            DefinitionKind::Message => "message",
            DefinitionKind::Field => "field",
            DefinitionKind::Oneof => "oneof",
            DefinitionKind::Enum => "enum",
            DefinitionKind::EnumValue => "enum value",
            DefinitionKind::Extension => "extension",
            DefinitionKind::Service => "service",
            DefinitionKind::Method => "method",
        }
    }
}
