use std::collections::HashSet;

use super::options::OptionsMessage;
use crate::{
    ast::{self, Span},
    case::{to_json_name, to_pascal_case},
    diagnostic::CheckError,
    index_to_i32,
    tag,
    types::{
        descriptor_proto, enum_descriptor_proto, field_descriptor_proto, uninterpreted_option,
        DescriptorProto, Edition, EnumDescriptorProto, EnumValueDescriptorProto,
        FieldDescriptorProto, FileDescriptorProto, MessageOptions, MethodDescriptorProto,
        OneofDescriptorProto, ServiceDescriptorProto, UninterpretedOption,
    },
    MAX_MESSAGE_FIELD_NUMBER,
};

/// The result of lowering a parsed file to a descriptor.
pub(crate) struct Generated {
    pub file: FileDescriptorProto,
    pub spans: Vec<(Vec<i32>, Span)>,
    pub errors: Vec<(CheckError, Span)>,
}

/// Converts the AST to a `FileDescriptorProto`, generating group and map entry messages, and
/// synthetic oneofs. Type names are left as written.
pub(crate) fn generate(name: &str, ast: &ast::File) -> Generated {
    let mut ctx = Context {
        syntax: ast.syntax.clone(),
        errors: vec![],
        path: vec![],
        spans: vec![],
    };

    let file = ctx.generate_file_descriptor(name, ast);

    Generated {
        file,
        spans: ctx.spans,
        errors: ctx.errors,
    }
}

struct Context {
    syntax: ast::Syntax,
    errors: Vec<(CheckError, Span)>,
    path: Vec<i32>,
    spans: Vec<(Vec<i32>, Span)>,
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum FieldScope {
    Message,
    Oneof,
    Extend,
}

impl Context {
    fn is_proto3(&self) -> bool {
        self.syntax == ast::Syntax::Proto3
    }

    fn is_editions(&self) -> bool {
        matches!(self.syntax, ast::Syntax::Edition(_))
    }

    fn syntax_name(&self) -> &'static str {
        match self.syntax {
            ast::Syntax::Proto2 => "proto2",
            ast::Syntax::Proto3 => "proto3",
            ast::Syntax::Edition(_) => "editions",
        }
    }

    fn generate_file_descriptor(&mut self, name: &str, ast: &ast::File) -> FileDescriptorProto {
        self.add_span(ast.span.clone());

        let package = if let Some(package) = &ast.package {
            self.add_span_for(&[tag::file::PACKAGE], package.span.clone());
            Some(package.name.to_string())
        } else {
            None
        };

        let mut dependency = Vec::with_capacity(ast.imports.len());
        let mut public_dependency = Vec::new();
        let mut weak_dependency = Vec::new();
        for import in &ast.imports {
            let index = index_to_i32(dependency.len());

            self.add_span_for(&[tag::file::DEPENDENCY, index], import.value_span.clone());

            dependency.push(import.value.clone());
            match import.kind {
                Some(ast::ImportKind::Public) => {
                    self.add_span_for(
                        &[
                            tag::file::PUBLIC_DEPENDENCY,
                            index_to_i32(public_dependency.len()),
                        ],
                        import.span.clone(),
                    );
                    public_dependency.push(index);
                }
                Some(ast::ImportKind::Weak) => {
                    self.add_span_for(
                        &[
                            tag::file::WEAK_DEPENDENCY,
                            index_to_i32(weak_dependency.len()),
                        ],
                        import.span.clone(),
                    );
                    weak_dependency.push(index);
                }
                None => (),
            }
        }

        let mut message_type = Vec::new();
        let mut enum_type = Vec::new();
        let mut service = Vec::new();
        let mut extension = Vec::new();

        for item in &ast.items {
            match item {
                ast::FileItem::Message(message_ast) => {
                    self.path
                        .extend(&[tag::file::MESSAGE_TYPE, index_to_i32(message_type.len())]);
                    message_type.push(self.generate_message_descriptor(message_ast));
                    self.pop_path(2);
                }
                ast::FileItem::Enum(enum_ast) => {
                    self.path
                        .extend(&[tag::file::ENUM_TYPE, index_to_i32(enum_type.len())]);
                    enum_type.push(self.generate_enum_descriptor(enum_ast));
                    self.pop_path(2);
                }
                ast::FileItem::Service(service_ast) => {
                    self.path
                        .extend(&[tag::file::SERVICE, index_to_i32(service.len())]);
                    service.push(self.generate_service_descriptor(service_ast));
                    self.pop_path(2);
                }
                ast::FileItem::Extend(extend_ast) => {
                    self.generate_extend_descriptors(
                        extend_ast,
                        tag::file::EXTENSION,
                        &mut extension,
                        tag::file::MESSAGE_TYPE,
                        &mut message_type,
                    );
                }
            }
        }

        self.path.push(tag::file::OPTIONS);
        let options = self.generate_options(&ast.options);
        self.path.pop();

        let (syntax, edition) = match &ast.syntax {
            ast::Syntax::Proto2 => (None, None),
            ast::Syntax::Proto3 => (Some("proto3".to_owned()), None),
            ast::Syntax::Edition(edition) => {
                let edition = match edition.as_str() {
                    "2023" => Edition::Edition2023,
                    "2024" => Edition::Edition2024,
                    _ => {
                        self.errors.push((
                            CheckError::UnsupportedEdition {
                                edition: edition.clone(),
                            },
                            ast.syntax_span.clone().unwrap_or_default(),
                        ));
                        Edition::Edition2023
                    }
                };
                (Some("editions".to_owned()), Some(edition as i32))
            }
        };
        if let Some(syntax_span) = &ast.syntax_span {
            let tag = if edition.is_some() {
                tag::file::EDITION
            } else {
                tag::file::SYNTAX
            };
            self.add_span_for(&[tag], syntax_span.clone());
        }

        FileDescriptorProto {
            name: Some(name.to_owned()),
            package,
            dependency,
            public_dependency,
            weak_dependency,
            message_type,
            enum_type,
            service,
            extension,
            options,
            source_code_info: None,
            syntax,
            edition,
        }
    }

    fn generate_message_descriptor(&mut self, ast: &ast::Message) -> DescriptorProto {
        self.add_span(ast.span.clone());
        self.add_span_for(&[tag::message::NAME], ast.name.span.clone());

        DescriptorProto {
            name: Some(ast.name.value.clone()),
            ..self.generate_message_body_descriptor(&ast.body)
        }
    }

    fn generate_message_body_descriptor(&mut self, ast: &ast::MessageBody) -> DescriptorProto {
        let mut field = Vec::new();
        let mut extension = Vec::new();
        let mut nested_type = Vec::new();
        let mut enum_type = Vec::new();
        let mut oneof_decl = Vec::new();
        let mut extension_range = Vec::new();
        let mut reserved_range = Vec::new();
        let mut reserved_name = Vec::new();

        // Real oneofs must be ordered before any synthetic oneofs generated by fields
        let real_oneof_count = ast
            .items
            .iter()
            .filter(|item| matches!(item, ast::MessageItem::Oneof(_)))
            .count();
        oneof_decl.resize(real_oneof_count, OneofDescriptorProto::default());
        let mut taken_names = message_body_names(ast);

        let mut real_oneof_index = 0;
        for item in &ast.items {
            match item {
                ast::MessageItem::Field(field_ast) => {
                    let field_index = field.len();
                    let mut synthetic_oneof = None;
                    if self.is_proto3()
                        && matches!(field_ast.label, Some((ast::FieldLabel::Optional, _)))
                    {
                        let oneof_index = index_to_i32(oneof_decl.len());
                        oneof_decl.push(OneofDescriptorProto {
                            name: Some(synthetic_oneof_name(
                                &field_ast.name.value,
                                &mut taken_names,
                            )),
                            options: None,
                        });
                        synthetic_oneof = Some(oneof_index);
                    }

                    let mut descriptor = self.generate_field_descriptor(
                        field_ast,
                        field_index,
                        tag::message::FIELD,
                        tag::message::NESTED_TYPE,
                        &mut nested_type,
                        FieldScope::Message,
                    );
                    if let Some(oneof_index) = synthetic_oneof {
                        descriptor.oneof_index = Some(oneof_index);
                        descriptor.proto3_optional = Some(true);
                    }
                    field.push(descriptor);
                }
                ast::MessageItem::Enum(enum_ast) => {
                    self.path
                        .extend(&[tag::message::ENUM_TYPE, index_to_i32(enum_type.len())]);
                    enum_type.push(self.generate_enum_descriptor(enum_ast));
                    self.pop_path(2);
                }
                ast::MessageItem::Message(message_ast) => {
                    self.path
                        .extend(&[tag::message::NESTED_TYPE, index_to_i32(nested_type.len())]);
                    nested_type.push(self.generate_message_descriptor(message_ast));
                    self.pop_path(2);
                }
                ast::MessageItem::Extend(extend_ast) => {
                    self.generate_extend_descriptors(
                        extend_ast,
                        tag::message::EXTENSION,
                        &mut extension,
                        tag::message::NESTED_TYPE,
                        &mut nested_type,
                    );
                }
                ast::MessageItem::Oneof(oneof) => {
                    oneof_decl[real_oneof_index] = self.generate_oneof_descriptor(
                        oneof,
                        real_oneof_index,
                        &mut nested_type,
                        &mut field,
                    );
                    real_oneof_index += 1;
                }
            }
        }

        for reserved in &ast.reserved {
            match &reserved.kind {
                ast::ReservedKind::Ranges(ranges) => {
                    self.path.push(tag::message::RESERVED_RANGE);
                    for range in ranges {
                        self.path.push(index_to_i32(reserved_range.len()));
                        self.add_span(range.span.clone());
                        reserved_range.push(self.generate_message_reserved_range(range));
                        self.path.pop();
                    }
                    self.path.pop();
                }
                ast::ReservedKind::Names(names) => {
                    self.path.push(tag::message::RESERVED_NAME);
                    for name in names {
                        self.path.push(index_to_i32(reserved_name.len()));
                        reserved_name.push(self.generate_reserved_name(name));
                        self.path.pop();
                    }
                    self.path.pop();
                }
            }
        }

        self.path.push(tag::message::EXTENSION_RANGE);
        for extensions in &ast.extensions {
            for range in &extensions.ranges {
                self.path.push(index_to_i32(extension_range.len()));
                extension_range
                    .push(self.generate_message_extension_range(range, &extensions.options));
                self.path.pop();
            }
        }
        self.path.pop();

        self.path.push(tag::message::OPTIONS);
        let options = self.generate_options(&ast.options);
        self.path.pop();

        DescriptorProto {
            name: None,
            field,
            extension,
            nested_type,
            enum_type,
            extension_range,
            oneof_decl,
            options,
            reserved_range,
            reserved_name,
        }
    }

    fn generate_field_descriptor(
        &mut self,
        ast: &ast::Field,
        field_index: usize,
        field_tag: i32,
        message_tag: i32,
        messages: &mut Vec<DescriptorProto>,
        scope: FieldScope,
    ) -> FieldDescriptorProto {
        self.path.extend(&[field_tag, index_to_i32(field_index)]);
        self.add_span(ast.span.clone());
        self.add_span_for(&[tag::field::NAME], ast.name.span.clone());
        self.add_span_for(&[tag::field::NUMBER], ast.number.span.clone());
        let number = self.generate_field_number(&ast.number);

        let name;
        let r#type;
        let type_name;
        let label;
        match &ast.kind {
            ast::FieldKind::Normal {
                ty: ast::Ty::Named(ty),
                ..
            } => {
                name = ast.name.value.clone();
                label = self.generate_field_label(&ast.label, ast.span.clone(), scope);
                r#type = None;
                type_name = Some(ty.to_string());

                self.add_span_for(&[tag::field::TYPE_NAME], ty.span());
            }
            ast::FieldKind::Normal { ty, ty_span } => {
                name = ast.name.value.clone();
                label = self.generate_field_label(&ast.label, ast.span.clone(), scope);
                r#type = ty.proto_ty();
                type_name = None;

                self.add_span_for(&[tag::field::TYPE], ty_span.clone());
            }
            ast::FieldKind::Group { ty_span, body } => {
                name = ast.name.value.to_ascii_lowercase();
                label = self.generate_field_label(&ast.label, ast.span.clone(), scope);
                r#type = Some(field_descriptor_proto::Type::Group);
                type_name = Some(ast.name.value.clone());

                self.add_span_for(&[tag::field::TYPE], ty_span.clone());
                self.add_span_for(&[tag::field::TYPE_NAME], ast.name.span.clone());

                self.pop_path(2);
                self.path
                    .extend(&[message_tag, index_to_i32(messages.len())]);
                self.add_span(ast.span.clone());
                self.add_span_for(&[tag::message::NAME], ast.name.span.clone());
                let message = DescriptorProto {
                    name: type_name.clone(),
                    ..self.generate_message_body_descriptor(body)
                };
                messages.push(message);
                self.pop_path(2);
                self.path.extend(&[field_tag, index_to_i32(field_index)]);
            }
            ast::FieldKind::Map {
                ty_span,
                key_ty,
                key_ty_span,
                value_ty,
                ..
            } => {
                name = ast.name.value.clone();
                label = Some(field_descriptor_proto::Label::Repeated);
                r#type = Some(field_descriptor_proto::Type::Message);
                type_name = Some(to_pascal_case(&name) + "Entry");

                match scope {
                    FieldScope::Oneof => self.errors.push((
                        CheckError::MapFieldNotAllowed { context: "oneofs" },
                        ast.span.clone(),
                    )),
                    FieldScope::Extend => self.errors.push((
                        CheckError::MapFieldNotAllowed {
                            context: "extensions",
                        },
                        ast.span.clone(),
                    )),
                    FieldScope::Message => {
                        if let Some((_, span)) = &ast.label {
                            self.errors.push((CheckError::MapFieldWithLabel, span.clone()));
                        }
                    }
                }

                self.add_span_for(&[tag::field::TYPE_NAME], ty_span.clone());

                if !key_ty.is_valid_map_key() {
                    self.errors.push((
                        CheckError::InvalidMapKey {
                            ty: key_ty.to_string(),
                        },
                        key_ty_span.clone(),
                    ));
                }

                messages.push(DescriptorProto {
                    name: type_name.clone(),
                    field: vec![
                        FieldDescriptorProto {
                            name: Some("key".to_owned()),
                            json_name: Some("key".to_owned()),
                            label: Some(field_descriptor_proto::Label::Optional as _),
                            number: Some(1),
                            r#type: key_ty.proto_ty().map(|t| t as _),
                            type_name: key_ty.type_name(),
                            ..Default::default()
                        },
                        FieldDescriptorProto {
                            name: Some("value".to_owned()),
                            json_name: Some("value".to_owned()),
                            label: Some(field_descriptor_proto::Label::Optional as _),
                            number: Some(2),
                            r#type: value_ty.proto_ty().map(|t| t as _),
                            type_name: value_ty.type_name(),
                            ..Default::default()
                        },
                    ],
                    options: Some(MessageOptions {
                        map_entry: Some(true),
                        ..Default::default()
                    }),
                    ..Default::default()
                });
            }
        }

        let mut json_name = None;
        let mut default_value = None;
        let mut options = Vec::new();
        for option in &ast.options {
            match pseudo_option(option) {
                Some("json_name") => {
                    if scope == FieldScope::Extend {
                        self.errors
                            .push((CheckError::JsonNameOnExtension, option.span.clone()));
                    }
                    match &option.value {
                        ast::OptionValue::String(value) => {
                            self.add_span_for(&[tag::field::JSON_NAME], option.span.clone());
                            json_name = Some(String::from_utf8_lossy(&value.value).into_owned());
                        }
                        _ => self.errors.push((
                            CheckError::OptionValueInvalidType {
                                name: "json_name".to_owned(),
                                expected: "string".to_owned(),
                            },
                            option.span.clone(),
                        )),
                    }
                }
                Some("default") => {
                    self.add_span_for(&[tag::field::DEFAULT_VALUE], option.span.clone());
                    default_value = Some(default_value_text(&option.value, r#type));
                }
                _ => options.push(option.clone()),
            }
        }
        if json_name.is_none() && scope != FieldScope::Extend {
            json_name = Some(to_json_name(&name));
        }

        self.path.push(tag::field::OPTIONS);
        let options = self.generate_options(&options);
        self.pop_path(3);

        FieldDescriptorProto {
            name: Some(name),
            number,
            label: label.map(|l| l as _),
            r#type: r#type.map(|t| t as _),
            type_name,
            extendee: None,
            default_value,
            oneof_index: None,
            json_name,
            options,
            proto3_optional: None,
        }
    }

    fn generate_field_label(
        &mut self,
        label: &Option<(ast::FieldLabel, Span)>,
        field_span: Span,
        scope: FieldScope,
    ) -> Option<field_descriptor_proto::Label> {
        match (scope, label) {
            (FieldScope::Oneof, Some((_, span))) => {
                self.errors
                    .push((CheckError::OneofFieldWithLabel, span.clone()));
                Some(field_descriptor_proto::Label::Optional)
            }
            (FieldScope::Message | FieldScope::Extend, None)
                if self.syntax == ast::Syntax::Proto2 =>
            {
                self.errors.push((CheckError::MissingLabel, field_span));
                Some(field_descriptor_proto::Label::Optional)
            }
            (_, Some((ast::FieldLabel::Optional, span))) if self.is_editions() => {
                self.errors.push((
                    CheckError::LabelNotAllowed {
                        label: "optional",
                        syntax: self.syntax_name(),
                        help: Some("use `option features.field_presence = EXPLICIT;` instead"),
                    },
                    span.clone(),
                ));
                Some(field_descriptor_proto::Label::Optional)
            }
            (_, Some((ast::FieldLabel::Required, span))) => {
                self.add_span_for(&[tag::field::LABEL], span.clone());
                Some(field_descriptor_proto::Label::Required)
            }
            (_, Some((ast::FieldLabel::Repeated, span))) => {
                self.add_span_for(&[tag::field::LABEL], span.clone());
                Some(field_descriptor_proto::Label::Repeated)
            }
            (_, Some((ast::FieldLabel::Optional, span))) => {
                self.add_span_for(&[tag::field::LABEL], span.clone());
                Some(field_descriptor_proto::Label::Optional)
            }
            (_, None) => Some(field_descriptor_proto::Label::Optional),
        }
    }

    fn generate_field_number(&mut self, ast: &ast::Int) -> Option<i32> {
        match ast.as_i32() {
            Some(number) => Some(number),
            None => {
                self.errors.push((
                    CheckError::InvalidFieldNumber {
                        number: ast.as_i64().unwrap_or(i64::MAX),
                    },
                    ast.span.clone(),
                ));
                None
            }
        }
    }

    fn generate_message_reserved_range(
        &mut self,
        range: &ast::ReservedRange,
    ) -> descriptor_proto::ReservedRange {
        self.add_span_for(&[tag::message::reserved_range::START], range.start.span.clone());
        let start = self.generate_field_number(&range.start);
        let end = match &range.end {
            ast::ReservedRangeEnd::None => start,
            ast::ReservedRangeEnd::Int(value) => {
                self.add_span_for(&[tag::message::reserved_range::END], value.span.clone());
                self.generate_field_number(value)
            }
            ast::ReservedRangeEnd::Max(span) => {
                self.add_span_for(&[tag::message::reserved_range::END], span.clone());
                Some(MAX_MESSAGE_FIELD_NUMBER)
            }
        };

        descriptor_proto::ReservedRange {
            start,
            end: end.map(|n| n.saturating_add(1)),
        }
    }

    fn generate_message_extension_range(
        &mut self,
        range: &ast::ReservedRange,
        options: &[ast::OptionBody],
    ) -> descriptor_proto::ExtensionRange {
        self.add_span(range.span.clone());
        self.add_span_for(
            &[tag::message::extension_range::START],
            range.start.span.clone(),
        );

        self.path.push(tag::message::extension_range::OPTIONS);
        let options = self.generate_options(options);
        self.path.pop();

        let start = self.generate_field_number(&range.start);
        let end = match &range.end {
            ast::ReservedRangeEnd::None => start,
            ast::ReservedRangeEnd::Int(value) => {
                self.add_span_for(&[tag::message::extension_range::END], value.span.clone());
                self.generate_field_number(value)
            }
            ast::ReservedRangeEnd::Max(span) => {
                self.add_span_for(&[tag::message::extension_range::END], span.clone());
                Some(MAX_MESSAGE_FIELD_NUMBER)
            }
        };

        descriptor_proto::ExtensionRange {
            start,
            end: end.map(|n| n.saturating_add(1)),
            options,
        }
    }

    fn generate_reserved_name(&mut self, name: &ast::ReservedName) -> String {
        let (ident, is_string) = match name {
            ast::ReservedName::Ident(ident) => (ident, false),
            ast::ReservedName::String(ident) => (ident, true),
        };
        self.add_span(ident.span.clone());

        if self.is_editions() == is_string {
            let expected = if self.is_editions() {
                "identifiers"
            } else {
                "string literals"
            };
            self.errors.push((
                CheckError::ReservedNameStyle {
                    expected,
                    syntax: self.syntax_name(),
                },
                ident.span.clone(),
            ));
        }

        ident.value.clone()
    }

    fn generate_oneof_descriptor(
        &mut self,
        oneof: &ast::Oneof,
        oneof_index: usize,
        messages: &mut Vec<DescriptorProto>,
        fields: &mut Vec<FieldDescriptorProto>,
    ) -> OneofDescriptorProto {
        self.path
            .extend(&[tag::message::ONEOF_DECL, index_to_i32(oneof_index)]);
        self.add_span(oneof.span.clone());
        self.add_span_for(&[tag::oneof::NAME], oneof.name.span.clone());

        self.path.push(tag::oneof::OPTIONS);
        let options = self.generate_options(&oneof.options);
        self.path.pop();
        self.pop_path(2);

        for field_ast in &oneof.fields {
            let field = FieldDescriptorProto {
                oneof_index: Some(index_to_i32(oneof_index)),
                ..self.generate_field_descriptor(
                    field_ast,
                    fields.len(),
                    tag::message::FIELD,
                    tag::message::NESTED_TYPE,
                    messages,
                    FieldScope::Oneof,
                )
            };
            fields.push(field);
        }

        OneofDescriptorProto {
            name: Some(oneof.name.value.clone()),
            options,
        }
    }

    fn generate_extend_descriptors(
        &mut self,
        ast: &ast::Extend,
        extension_tag: i32,
        extensions: &mut Vec<FieldDescriptorProto>,
        message_tag: i32,
        messages: &mut Vec<DescriptorProto>,
    ) {
        for field_ast in &ast.fields {
            self.path
                .extend(&[extension_tag, index_to_i32(extensions.len())]);
            self.add_span_for(&[tag::field::EXTENDEE], ast.extendee.span());
            self.pop_path(2);

            let extension = FieldDescriptorProto {
                extendee: Some(ast.extendee.to_string()),
                ..self.generate_field_descriptor(
                    field_ast,
                    extensions.len(),
                    extension_tag,
                    message_tag,
                    messages,
                    FieldScope::Extend,
                )
            };
            extensions.push(extension);
        }
    }

    fn generate_enum_descriptor(&mut self, ast: &ast::Enum) -> EnumDescriptorProto {
        self.add_span(ast.span.clone());
        self.add_span_for(&[tag::enum_::NAME], ast.name.span.clone());

        let mut value = Vec::new();
        let mut reserved_range = Vec::new();
        let mut reserved_name = Vec::new();

        for value_ast in &ast.values {
            self.path
                .extend(&[tag::enum_::VALUE, index_to_i32(value.len())]);
            value.push(self.generate_enum_value_descriptor(value_ast));
            self.pop_path(2);
        }

        for reserved in &ast.reserved {
            match &reserved.kind {
                ast::ReservedKind::Ranges(ranges) => {
                    self.path.push(tag::enum_::RESERVED_RANGE);
                    for range in ranges {
                        self.path.push(index_to_i32(reserved_range.len()));
                        self.add_span(range.span.clone());
                        reserved_range.push(self.generate_enum_reserved_range(range));
                        self.path.pop();
                    }
                    self.path.pop();
                }
                ast::ReservedKind::Names(names) => {
                    self.path.push(tag::enum_::RESERVED_NAME);
                    for name in names {
                        self.path.push(index_to_i32(reserved_name.len()));
                        reserved_name.push(self.generate_reserved_name(name));
                        self.path.pop();
                    }
                    self.path.pop();
                }
            }
        }

        self.path.push(tag::enum_::OPTIONS);
        let options = self.generate_options(&ast.options);
        self.path.pop();

        EnumDescriptorProto {
            name: Some(ast.name.value.clone()),
            value,
            options,
            reserved_range,
            reserved_name,
        }
    }

    fn generate_enum_value_descriptor(&mut self, ast: &ast::EnumValue) -> EnumValueDescriptorProto {
        self.add_span(ast.span.clone());
        self.add_span_for(&[tag::enum_value::NAME], ast.name.span.clone());

        self.add_span_for(&[tag::enum_value::NUMBER], ast.number.span.clone());
        let number = match ast.number.as_i32() {
            Some(number) => Some(number),
            None => {
                self.errors.push((
                    CheckError::EnumValueOutOfRange {
                        name: ast.name.value.clone(),
                        number: ast.number.as_i64().unwrap_or(i64::MAX),
                    },
                    ast.number.span.clone(),
                ));
                None
            }
        };

        self.path.push(tag::enum_value::OPTIONS);
        let options = self.generate_options(&ast.options);
        self.path.pop();

        EnumValueDescriptorProto {
            name: Some(ast.name.value.clone()),
            number,
            options,
        }
    }

    fn generate_enum_reserved_range(
        &mut self,
        range: &ast::ReservedRange,
    ) -> enum_descriptor_proto::EnumReservedRange {
        let number = |ctx: &mut Self, int: &ast::Int| match int.as_i32() {
            Some(number) => Some(number),
            None => {
                ctx.errors.push((
                    CheckError::InvalidRange {
                        kind: "reserved",
                        start: range.start.as_i64().unwrap_or(i64::MAX),
                        end: int.as_i64().unwrap_or(i64::MAX),
                    },
                    int.span.clone(),
                ));
                None
            }
        };

        self.add_span_for(&[tag::enum_::reserved_range::START], range.start.span.clone());
        let start = number(self, &range.start);
        let end = match &range.end {
            ast::ReservedRangeEnd::None => start,
            ast::ReservedRangeEnd::Int(value) => {
                self.add_span_for(&[tag::enum_::reserved_range::END], value.span.clone());
                number(self, value)
            }
            ast::ReservedRangeEnd::Max(span) => {
                self.add_span_for(&[tag::enum_::reserved_range::END], span.clone());
                Some(i32::MAX)
            }
        };

        enum_descriptor_proto::EnumReservedRange { start, end }
    }

    fn generate_service_descriptor(&mut self, service: &ast::Service) -> ServiceDescriptorProto {
        self.add_span(service.span.clone());
        self.add_span_for(&[tag::service::NAME], service.name.span.clone());
        let mut method = Vec::new();

        self.path.push(tag::service::METHOD);
        for method_ast in &service.methods {
            self.path.push(index_to_i32(method.len()));
            method.push(self.generate_method_descriptor(method_ast));
            self.path.pop();
        }
        self.path.pop();

        self.path.push(tag::service::OPTIONS);
        let options = self.generate_options(&service.options);
        self.path.pop();

        ServiceDescriptorProto {
            name: Some(service.name.value.clone()),
            method,
            options,
        }
    }

    fn generate_method_descriptor(&mut self, ast: &ast::Method) -> MethodDescriptorProto {
        self.add_span(ast.span.clone());
        self.add_span_for(&[tag::method::NAME], ast.name.span.clone());

        self.add_span_for(&[tag::method::INPUT_TYPE], ast.input_ty.span());
        let input_type = ast.input_ty.to_string();

        self.add_span_for(&[tag::method::OUTPUT_TYPE], ast.output_ty.span());
        let output_type = ast.output_ty.to_string();

        let client_streaming = ast.client_streaming.is_some();
        if let Some(span) = &ast.client_streaming {
            self.add_span_for(&[tag::method::CLIENT_STREAMING], span.clone());
        }
        let server_streaming = ast.server_streaming.is_some();
        if let Some(span) = &ast.server_streaming {
            self.add_span_for(&[tag::method::SERVER_STREAMING], span.clone());
        }

        self.path.push(tag::method::OPTIONS);
        let options = self.generate_options(&ast.options);
        self.path.pop();

        MethodDescriptorProto {
            name: Some(ast.name.value.clone()),
            input_type: Some(input_type),
            output_type: Some(output_type),
            options,
            client_streaming: Some(client_streaming),
            server_streaming: Some(server_streaming),
        }
    }

    fn generate_options<T>(&mut self, ast: &[ast::OptionBody]) -> Option<T>
    where
        T: OptionsMessage,
    {
        if ast.is_empty() {
            return None;
        }

        let mut options = T::default();
        for option_ast in ast {
            let index = options.uninterpreted_option().len();
            self.add_span_for(
                &[tag::UNINTERPRETED_OPTION, index_to_i32(index)],
                option_ast.span.clone(),
            );
            let option = self.generate_option(option_ast);
            options.uninterpreted_option().push(option);
        }
        Some(options)
    }

    fn generate_option(&mut self, ast: &ast::OptionBody) -> UninterpretedOption {
        let name = ast
            .name
            .iter()
            .map(|part| match part {
                ast::OptionNamePart::Ident(ident) => uninterpreted_option::NamePart {
                    name_part: ident.value.clone(),
                    is_extension: false,
                },
                ast::OptionNamePart::Extension(extension, _) => uninterpreted_option::NamePart {
                    name_part: extension.to_string(),
                    is_extension: true,
                },
            })
            .collect();

        match &ast.value {
            ast::OptionValue::Ident(ident) => UninterpretedOption {
                name,
                identifier_value: Some(ident.value.clone()),
                ..Default::default()
            },
            ast::OptionValue::Int(int) if int.negative => {
                let negative_int_value = int.as_i64();
                if negative_int_value.is_none() {
                    self.errors.push((
                        CheckError::OptionIntegerOutOfRange {
                            name: option_name(ast),
                            min: i64::MIN,
                            max: u64::MAX,
                        },
                        int.span.clone(),
                    ));
                }
                UninterpretedOption {
                    name,
                    negative_int_value,
                    ..Default::default()
                }
            }
            ast::OptionValue::Int(int) => UninterpretedOption {
                name,
                positive_int_value: Some(int.value),
                ..Default::default()
            },
            ast::OptionValue::Float(float) => UninterpretedOption {
                name,
                double_value: Some(float.value),
                ..Default::default()
            },
            ast::OptionValue::String(string) => UninterpretedOption {
                name,
                string_value: Some(string.value.clone()),
                ..Default::default()
            },
            ast::OptionValue::Aggregate(message, _) => UninterpretedOption {
                name,
                aggregate_value: Some(message.clone()),
                ..Default::default()
            },
        }
    }

    fn add_span(&mut self, span: Span) {
        self.spans.push((self.path.clone(), span));
    }

    fn add_span_for(&mut self, path_items: &[i32], span: Span) {
        self.path.extend_from_slice(path_items);
        self.add_span(span);
        self.pop_path(path_items.len());
    }

    fn pop_path(&mut self, n: usize) {
        self.path.truncate(self.path.len() - n);
    }
}

/// The names of every element declared directly in a message body.
fn message_body_names(ast: &ast::MessageBody) -> HashSet<String> {
    let mut names = HashSet::new();
    for item in &ast.items {
        match item {
            ast::MessageItem::Field(field) => {
                names.insert(field.name.value.clone());
            }
            ast::MessageItem::Message(message) => {
                names.insert(message.name.value.clone());
            }
            ast::MessageItem::Enum(enum_) => {
                names.insert(enum_.name.value.clone());
            }
            ast::MessageItem::Oneof(oneof) => {
                names.insert(oneof.name.value.clone());
                for field in &oneof.fields {
                    names.insert(field.name.value.clone());
                }
            }
            ast::MessageItem::Extend(_) => (),
        }
    }
    names
}

fn synthetic_oneof_name(field_name: &str, taken: &mut HashSet<String>) -> String {
    let mut name = format!("_{}", field_name);
    while taken.contains(&name) {
        name.insert(0, 'X');
    }
    taken.insert(name.clone());
    name
}

fn pseudo_option(option: &ast::OptionBody) -> Option<&str> {
    match option.name.as_slice() {
        [ast::OptionNamePart::Ident(ident)] if ident.value == "default" || ident.value == "json_name" => {
            Some(ident.value.as_str())
        }
        _ => None,
    }
}

fn option_name(option: &ast::OptionBody) -> String {
    option
        .name
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(".")
}

fn default_value_text(
    value: &ast::OptionValue,
    ty: Option<field_descriptor_proto::Type>,
) -> String {
    match value {
        ast::OptionValue::Ident(ident) => ident.value.clone(),
        ast::OptionValue::Int(int) if int.negative => format!("-{}", int.value),
        ast::OptionValue::Int(int) => int.value.to_string(),
        ast::OptionValue::Float(float) => {
            if float.value.is_nan() {
                "nan".to_owned()
            } else if float.value.is_infinite() && float.value > 0.0 {
                "inf".to_owned()
            } else if float.value.is_infinite() {
                "-inf".to_owned()
            } else {
                float.value.to_string()
            }
        }
        ast::OptionValue::String(string) => {
            if ty == Some(field_descriptor_proto::Type::Bytes) {
                escape_bytes(&string.value)
            } else {
                String::from_utf8_lossy(&string.value).into_owned()
            }
        }
        ast::OptionValue::Aggregate(text, _) => format!("{{{}}}", text),
    }
}

/// C-style escaping, as used for the default values of bytes fields.
fn escape_bytes(bytes: &[u8]) -> String {
    let mut result = String::with_capacity(bytes.len());
    for &byte in bytes {
        match byte {
            b'\n' => result.push_str("\\n"),
            b'\r' => result.push_str("\\r"),
            b'\t' => result.push_str("\\t"),
            b'"' => result.push_str("\\\""),
            b'\'' => result.push_str("\\\'"),
            b'\\' => result.push_str("\\\\"),
            0x20..=0x7e => result.push(byte as char),
            _ => result.push_str(&format!("\\{:03o}", byte)),
        }
    }
    result
}

impl ast::Ty {
    fn proto_ty(&self) -> Option<field_descriptor_proto::Type> {
        use field_descriptor_proto::Type;

        match self {
            ast::Ty::Double => Some(Type::Double),
            ast::Ty::Float => Some(Type::Float),
            ast::Ty::Int32 => Some(Type::Int32),
            ast::Ty::Int64 => Some(Type::Int64),
            ast::Ty::Uint32 => Some(Type::Uint32),
            ast::Ty::Uint64 => Some(Type::Uint64),
            ast::Ty::Sint32 => Some(Type::Sint32),
            ast::Ty::Sint64 => Some(Type::Sint64),
            ast::Ty::Fixed32 => Some(Type::Fixed32),
            ast::Ty::Fixed64 => Some(Type::Fixed64),
            ast::Ty::Sfixed32 => Some(Type::Sfixed32),
            ast::Ty::Sfixed64 => Some(Type::Sfixed64),
            ast::Ty::Bool => Some(Type::Bool),
            ast::Ty::String => Some(Type::String),
            ast::Ty::Bytes => Some(Type::Bytes),
            ast::Ty::Named(_) => None,
        }
    }

    fn type_name(&self) -> Option<String> {
        match self {
            ast::Ty::Named(name) => Some(name.to_string()),
            _ => None,
        }
    }

    fn is_valid_map_key(&self) -> bool {
        !matches!(
            self,
            ast::Ty::Double | ast::Ty::Float | ast::Ty::Bytes | ast::Ty::Named(_)
        )
    }
}

impl std::fmt::Display for ast::Ty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ast::Ty::Double => f.write_str("double"),
            ast::Ty::Float => f.write_str("float"),
            ast::Ty::Int32 => f.write_str("int32"),
            ast::Ty::Int64 => f.write_str("int64"),
            ast::Ty::Uint32 => f.write_str("uint32"),
            ast::Ty::Uint64 => f.write_str("uint64"),
            ast::Ty::Sint32 => f.write_str("sint32"),
            ast::Ty::Sint64 => f.write_str("sint64"),
            ast::Ty::Fixed32 => f.write_str("fixed32"),
            ast::Ty::Fixed64 => f.write_str("fixed64"),
            ast::Ty::Sfixed32 => f.write_str("sfixed32"),
            ast::Ty::Sfixed64 => f.write_str("sfixed64"),
            ast::Ty::Bool => f.write_str("bool"),
            ast::Ty::String => f.write_str("string"),
            ast::Ty::Bytes => f.write_str("bytes"),
            ast::Ty::Named(name) => write!(f, "{}", name),
        }
    }
}
