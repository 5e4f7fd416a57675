//! Linked descriptors.
//!
//! A [`FileDescriptor`] is immutable once published and cheap to clone. The handles for the
//! elements of a file ([`MessageDescriptor`], [`FieldDescriptor`], etc.) pair the file with the
//! index of the element, so they are cheap to clone too.

pub(crate) mod index;

use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use prost::Message;

use crate::{
    link::features,
    source::SourceMap,
    types::{
        feature_set::{MessageEncoding, RepeatedFieldEncoding},
        field_descriptor_proto::{Label, Type},
        DescriptorProto, Edition, EnumDescriptorProto, EnumValueDescriptorProto, FeatureSet,
        FieldDescriptorProto, FileDescriptorProto, MethodDescriptorProto, OneofDescriptorProto,
        ServiceDescriptorProto,
    },
};

pub use self::index::DefinitionKind;
use self::index::Index;

/// A fully linked protobuf file.
#[derive(Clone)]
pub struct FileDescriptor {
    inner: Arc<FileInner>,
}

pub(crate) struct FileInner {
    pub proto: FileDescriptorProto,
    pub edition: Edition,
    pub dependencies: Vec<FileDescriptor>,
    pub index: Index,
    pub field_types: Vec<Option<TypeRef>>,
    pub extension_types: Vec<Option<TypeRef>>,
    pub extendees: Vec<Option<TypeRef>>,
    pub method_types: Vec<(Option<TypeRef>, Option<TypeRef>)>,
    pub source: SourceMap,
    pub has_errors: AtomicBool,
}

/// A resolved reference to a message or enum, in this file (`file` is `None`) or a dependency.
#[derive(Clone)]
pub(crate) struct TypeRef {
    pub file: Option<FileDescriptor>,
    pub kind: DefinitionKind,
    pub index: usize,
}

/// A message type.
#[derive(Clone, PartialEq, Eq)]
pub struct MessageDescriptor {
    file: FileDescriptor,
    index: usize,
}

/// A field of a message.
#[derive(Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    file: FileDescriptor,
    index: usize,
}

/// An extension field.
#[derive(Clone, PartialEq, Eq)]
pub struct ExtensionDescriptor {
    file: FileDescriptor,
    index: usize,
}

/// A oneof, which may be synthetic.
#[derive(Clone, PartialEq, Eq)]
pub struct OneofDescriptor {
    file: FileDescriptor,
    index: usize,
}

/// An enum type.
#[derive(Clone, PartialEq, Eq)]
pub struct EnumDescriptor {
    file: FileDescriptor,
    index: usize,
}

/// A value of an enum.
#[derive(Clone, PartialEq, Eq)]
pub struct EnumValueDescriptor {
    file: FileDescriptor,
    index: usize,
}

/// A service.
#[derive(Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    file: FileDescriptor,
    index: usize,
}

/// A method of a service.
#[derive(Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    file: FileDescriptor,
    index: usize,
}

/// The resolved type of a field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Kind {
    Double,
    Float,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Bool,
    String,
    Bytes,
    Message(MessageDescriptor),
    Enum(EnumDescriptor),
    /// The type name could not be resolved. The file was reported as having errors.
    Unresolved(String),
}

/// Any named element of a file, as returned by name lookups.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Symbol {
    Package(String),
    Message(MessageDescriptor),
    Field(FieldDescriptor),
    Oneof(OneofDescriptor),
    Enum(EnumDescriptor),
    EnumValue(EnumValueDescriptor),
    Extension(ExtensionDescriptor),
    Service(ServiceDescriptor),
    Method(MethodDescriptor),
}

impl FileDescriptor {
    pub(crate) fn from_inner(inner: FileInner) -> Self {
        FileDescriptor {
            inner: Arc::new(inner),
        }
    }

    pub(crate) fn inner(&self) -> &FileInner {
        &self.inner
    }

    /// The unique name of this file, as used in import statements.
    pub fn name(&self) -> &str {
        self.inner.proto.name()
    }

    /// The package of this file, or an empty string.
    pub fn package(&self) -> &str {
        self.inner.proto.package()
    }

    /// The edition of this file. Files using the `proto2` and `proto3` syntax report the
    /// corresponding pseudo-editions.
    pub fn edition(&self) -> Edition {
        self.inner.edition
    }

    /// Whether errors were reported while linking this file.
    pub fn has_errors(&self) -> bool {
        self.inner.has_errors.load(Ordering::Relaxed)
    }

    pub(crate) fn set_has_errors(&self) {
        self.inner.has_errors.store(true, Ordering::Relaxed);
    }

    /// The files directly imported by this file, in import order. Imports which could not be
    /// loaded are skipped.
    pub fn dependencies(&self) -> impl ExactSizeIterator<Item = FileDescriptor> + '_ {
        self.inner.dependencies.iter().cloned()
    }

    /// The files publicly imported by this file.
    pub fn public_dependencies(&self) -> impl Iterator<Item = FileDescriptor> + '_ {
        let proto = &self.inner.proto;
        proto.public_dependency.iter().filter_map(move |&index| {
            let name = proto.dependency.get(usize::try_from(index).ok()?)?;
            self.inner
                .dependencies
                .iter()
                .find(|file| file.name() == name)
                .cloned()
        })
    }

    /// The top-level messages of this file.
    pub fn messages(&self) -> impl Iterator<Item = MessageDescriptor> + '_ {
        self.inner
            .index
            .messages
            .iter()
            .enumerate()
            .filter(|(_, message)| message.parent.is_none())
            .map(|(index, _)| self.message(index))
    }

    /// Every message of this file, including nested and synthetic ones, in declaration order.
    pub fn all_messages(&self) -> impl ExactSizeIterator<Item = MessageDescriptor> + '_ {
        (0..self.inner.index.messages.len()).map(|index| self.message(index))
    }

    /// The top-level enums of this file.
    pub fn enums(&self) -> impl Iterator<Item = EnumDescriptor> + '_ {
        self.inner
            .index
            .enums
            .iter()
            .enumerate()
            .filter(|(_, enum_)| enum_.parent.is_none())
            .map(|(index, _)| self.enum_(index))
    }

    /// Every enum of this file, including nested ones, in declaration order.
    pub fn all_enums(&self) -> impl ExactSizeIterator<Item = EnumDescriptor> + '_ {
        (0..self.inner.index.enums.len()).map(|index| self.enum_(index))
    }

    /// The extensions declared at the top level of this file.
    pub fn extensions(&self) -> impl Iterator<Item = ExtensionDescriptor> + '_ {
        self.inner
            .index
            .extensions
            .iter()
            .enumerate()
            .filter(|(_, extension)| extension.parent.is_none())
            .map(|(index, _)| self.extension(index))
    }

    /// Every extension of this file, including ones nested in messages.
    pub fn all_extensions(&self) -> impl ExactSizeIterator<Item = ExtensionDescriptor> + '_ {
        (0..self.inner.index.extensions.len()).map(|index| self.extension(index))
    }

    /// The services of this file.
    pub fn services(&self) -> impl ExactSizeIterator<Item = ServiceDescriptor> + '_ {
        (0..self.inner.index.services.len()).map(|index| ServiceDescriptor {
            file: self.clone(),
            index,
        })
    }

    /// Finds a definition of this file by its fully-qualified name, without a leading dot.
    pub fn get_by_name(&self, full_name: &str) -> Option<Symbol> {
        let definition = self.inner.index.get(full_name)?;
        Some(self.symbol(definition.kind, definition.index, full_name))
    }

    pub fn get_message_by_name(&self, full_name: &str) -> Option<MessageDescriptor> {
        match self.get_by_name(full_name)? {
            Symbol::Message(message) => Some(message),
            _ => None,
        }
    }

    pub fn get_enum_by_name(&self, full_name: &str) -> Option<EnumDescriptor> {
        match self.get_by_name(full_name)? {
            Symbol::Enum(enum_) => Some(enum_),
            _ => None,
        }
    }

    pub fn get_extension_by_name(&self, full_name: &str) -> Option<ExtensionDescriptor> {
        match self.get_by_name(full_name)? {
            Symbol::Extension(extension) => Some(extension),
            _ => None,
        }
    }

    /// The linked file as a descriptor proto, including any source code info.
    pub fn file_descriptor_proto(&self) -> &FileDescriptorProto {
        &self.inner.proto
    }

    /// Encodes the linked file as a serialized `FileDescriptorProto`.
    pub fn encode_to_vec(&self) -> Vec<u8> {
        self.inner.proto.encode_to_vec()
    }

    /// The resolved features of this file.
    pub fn features(&self) -> FeatureSet {
        let mut features = features::edition_defaults(self.inner.edition);
        if let Some(overrides) = self
            .inner
            .proto
            .options
            .as_ref()
            .and_then(|options| options.features.as_ref())
        {
            features::merge(&mut features, overrides);
        }
        features
    }

    pub(crate) fn source(&self) -> &SourceMap {
        &self.inner.source
    }

    pub(crate) fn index(&self) -> &Index {
        &self.inner.index
    }

    pub(crate) fn symbol(&self, kind: DefinitionKind, index: usize, full_name: &str) -> Symbol {
        let file = self.clone();
        match kind {
            DefinitionKind::Package => Symbol::Package(full_name.to_owned()),
            DefinitionKind::Message => Symbol::Message(MessageDescriptor { file, index }),
            DefinitionKind::Field => Symbol::Field(FieldDescriptor { file, index }),
            DefinitionKind::Oneof => Symbol::Oneof(OneofDescriptor { file, index }),
            DefinitionKind::Enum => Symbol::Enum(EnumDescriptor { file, index }),
            DefinitionKind::EnumValue => Symbol::EnumValue(EnumValueDescriptor { file, index }),
            DefinitionKind::Extension => Symbol::Extension(ExtensionDescriptor { file, index }),
            DefinitionKind::Service => Symbol::Service(ServiceDescriptor { file, index }),
            DefinitionKind::Method => Symbol::Method(MethodDescriptor { file, index }),
        }
    }

    pub(crate) fn message(&self, index: usize) -> MessageDescriptor {
        MessageDescriptor {
            file: self.clone(),
            index,
        }
    }

    pub(crate) fn enum_(&self, index: usize) -> EnumDescriptor {
        EnumDescriptor {
            file: self.clone(),
            index,
        }
    }

    pub(crate) fn extension(&self, index: usize) -> ExtensionDescriptor {
        ExtensionDescriptor {
            file: self.clone(),
            index,
        }
    }

    fn resolve_type_ref(&self, type_ref: &TypeRef) -> Option<Kind> {
        let file = type_ref.file.clone().unwrap_or_else(|| self.clone());
        match type_ref.kind {
            DefinitionKind::Message => Some(Kind::Message(file.message(type_ref.index))),
            DefinitionKind::Enum => Some(Kind::Enum(file.enum_(type_ref.index))),
            _ => None,
        }
    }

    fn message_by_ref(&self, type_ref: &Option<TypeRef>) -> Option<MessageDescriptor> {
        match type_ref.as_ref().and_then(|type_ref| self.resolve_type_ref(type_ref)) {
            Some(Kind::Message(message)) => Some(message),
            _ => None,
        }
    }

    /// Merges the feature overrides of the messages enclosing `message` onto `features`,
    /// outermost first.
    fn merge_message_features(&self, features: &mut FeatureSet, message: Option<usize>) {
        let mut chain = Vec::new();
        let mut current = message;
        while let Some(index) = current {
            chain.push(index);
            current = self.inner.index.messages[index].parent;
        }

        for &index in chain.iter().rev() {
            let proto = message_proto(&self.inner.proto, &self.inner.index.messages[index].path);
            if let Some(overrides) = proto.options.as_ref().and_then(|o| o.features.as_ref()) {
                features::merge(features, overrides);
            }
        }
    }
}

impl MessageDescriptor {
    /// The position of this element in the file's flattened list of all such elements.
    pub(crate) fn arena_index(&self) -> usize {
        self.index
    }

    fn inner(&self) -> &index::MessageIndex {
        &self.file.inner.index.messages[self.index]
    }

    pub fn name(&self) -> &str {
        self.descriptor_proto().name()
    }

    pub fn full_name(&self) -> &str {
        &self.inner().full_name
    }

    /// The index of this message within its parent message or file.
    pub fn index(&self) -> usize {
        last_index(&self.inner().path)
    }

    pub fn parent_file(&self) -> FileDescriptor {
        self.file.clone()
    }

    pub fn parent_message(&self) -> Option<MessageDescriptor> {
        self.inner().parent.map(|index| self.file.message(index))
    }

    pub fn descriptor_proto(&self) -> &DescriptorProto {
        message_proto(&self.file.inner.proto, &self.inner().path)
    }

    /// Whether this is the synthetic entry message of a map field.
    pub fn is_map_entry(&self) -> bool {
        self.inner().is_map_entry
    }

    pub fn fields(&self) -> impl ExactSizeIterator<Item = FieldDescriptor> + '_ {
        self.inner().fields.iter().map(|&index| FieldDescriptor {
            file: self.file.clone(),
            index,
        })
    }

    pub fn oneofs(&self) -> impl ExactSizeIterator<Item = OneofDescriptor> + '_ {
        self.inner().oneofs.iter().map(|&index| OneofDescriptor {
            file: self.file.clone(),
            index,
        })
    }

    pub fn child_messages(&self) -> impl ExactSizeIterator<Item = MessageDescriptor> + '_ {
        self.inner()
            .nested
            .iter()
            .map(|&index| self.file.message(index))
    }

    pub fn child_enums(&self) -> impl ExactSizeIterator<Item = EnumDescriptor> + '_ {
        self.inner().enums.iter().map(|&index| self.file.enum_(index))
    }

    /// The extensions declared within this message's scope.
    pub fn child_extensions(&self) -> impl ExactSizeIterator<Item = ExtensionDescriptor> + '_ {
        self.inner()
            .extensions
            .iter()
            .map(|&index| self.file.extension(index))
    }

    pub fn get_field(&self, number: u32) -> Option<FieldDescriptor> {
        self.fields().find(|field| field.number() == number)
    }

    pub fn get_field_by_name(&self, name: &str) -> Option<FieldDescriptor> {
        self.fields().find(|field| field.name() == name)
    }

    pub fn features(&self) -> FeatureSet {
        let mut features = self.file.features();
        self.file
            .merge_message_features(&mut features, Some(self.index));
        features
    }
}

impl FieldDescriptor {
    fn inner(&self) -> &index::FieldIndex {
        &self.file.inner.index.fields[self.index]
    }

    pub fn name(&self) -> &str {
        self.field_descriptor_proto().name()
    }

    pub fn full_name(&self) -> &str {
        &self.inner().full_name
    }

    pub fn number(&self) -> u32 {
        self.field_descriptor_proto().number() as u32
    }

    pub fn json_name(&self) -> &str {
        self.field_descriptor_proto().json_name()
    }

    /// The index of this field within its message.
    pub fn index(&self) -> usize {
        last_index(&self.inner().path)
    }

    pub fn parent_file(&self) -> FileDescriptor {
        self.file.clone()
    }

    pub fn parent_message(&self) -> MessageDescriptor {
        match self.inner().parent {
            Some(parent) => self.file.message(parent),
            None => unreachable!("message fields always have a parent"),
        }
    }

    pub fn containing_oneof(&self) -> Option<OneofDescriptor> {
        self.inner().oneof.map(|index| OneofDescriptor {
            file: self.file.clone(),
            index,
        })
    }

    pub fn field_descriptor_proto(&self) -> &FieldDescriptorProto {
        let path = &self.inner().path;
        let message = message_proto(&self.file.inner.proto, &path[..path.len() - 2]);
        &message.field[last_index(path)]
    }

    pub fn kind(&self) -> Kind {
        field_kind(
            &self.file,
            self.field_descriptor_proto(),
            &self.file.inner.field_types[self.index],
        )
    }

    pub fn is_list(&self) -> bool {
        self.field_descriptor_proto().label() == Label::Repeated && !self.is_map()
    }

    pub fn is_map(&self) -> bool {
        self.field_descriptor_proto().label() == Label::Repeated
            && matches!(self.kind(), Kind::Message(message) if message.is_map_entry())
    }

    /// Whether this field uses group encoding and is named after its message type.
    pub fn is_group_like(&self) -> bool {
        match self.kind() {
            Kind::Message(message) => is_group_like(
                self.field_descriptor_proto(),
                &self.features(),
                &message,
                self.inner().parent,
                &self.file,
            ),
            _ => false,
        }
    }

    pub fn features(&self) -> FeatureSet {
        let mut features = self.file.features();
        self.file
            .merge_message_features(&mut features, self.inner().parent);
        if let Some(oneof) = self.containing_oneof() {
            if let Some(overrides) = oneof
                .descriptor_proto()
                .options
                .as_ref()
                .and_then(|o| o.features.as_ref())
            {
                features::merge(&mut features, overrides);
            }
        }
        merge_field_features(&mut features, self.file.edition(), self.field_descriptor_proto());
        features
    }
}

impl ExtensionDescriptor {
    /// The position of this element in the file's flattened list of all such elements.
    pub(crate) fn arena_index(&self) -> usize {
        self.index
    }

    fn inner(&self) -> &index::FieldIndex {
        &self.file.inner.index.extensions[self.index]
    }

    pub fn name(&self) -> &str {
        self.field_descriptor_proto().name()
    }

    pub fn full_name(&self) -> &str {
        &self.inner().full_name
    }

    pub fn number(&self) -> u32 {
        self.field_descriptor_proto().number() as u32
    }

    /// The index of this extension within its parent message or file.
    pub fn index(&self) -> usize {
        last_index(&self.inner().path)
    }

    pub fn parent_file(&self) -> FileDescriptor {
        self.file.clone()
    }

    /// The message this extension is declared in, which is not necessarily its extendee.
    pub fn parent_message(&self) -> Option<MessageDescriptor> {
        self.inner().parent.map(|index| self.file.message(index))
    }

    /// The message this extension extends, if it was resolved.
    pub fn extendee(&self) -> Option<MessageDescriptor> {
        self.file
            .message_by_ref(&self.file.inner.extendees[self.index])
    }

    pub fn field_descriptor_proto(&self) -> &FieldDescriptorProto {
        let path = &self.inner().path;
        if path.len() == 2 {
            &self.file.inner.proto.extension[last_index(path)]
        } else {
            let message = message_proto(&self.file.inner.proto, &path[..path.len() - 2]);
            &message.extension[last_index(path)]
        }
    }

    pub fn kind(&self) -> Kind {
        field_kind(
            &self.file,
            self.field_descriptor_proto(),
            &self.file.inner.extension_types[self.index],
        )
    }

    pub fn is_list(&self) -> bool {
        self.field_descriptor_proto().label() == Label::Repeated
    }

    pub fn is_group_like(&self) -> bool {
        match self.kind() {
            Kind::Message(message) => is_group_like(
                self.field_descriptor_proto(),
                &self.features(),
                &message,
                self.inner().parent,
                &self.file,
            ),
            _ => false,
        }
    }

    pub fn features(&self) -> FeatureSet {
        let mut features = self.file.features();
        self.file
            .merge_message_features(&mut features, self.inner().parent);
        merge_field_features(&mut features, self.file.edition(), self.field_descriptor_proto());
        features
    }
}

impl OneofDescriptor {
    fn inner(&self) -> &index::OneofIndex {
        &self.file.inner.index.oneofs[self.index]
    }

    pub fn name(&self) -> &str {
        self.descriptor_proto().name()
    }

    pub fn full_name(&self) -> &str {
        &self.inner().full_name
    }

    pub fn index(&self) -> usize {
        last_index(&self.inner().path)
    }

    pub fn parent_message(&self) -> MessageDescriptor {
        self.file.message(self.inner().parent)
    }

    pub fn descriptor_proto(&self) -> &OneofDescriptorProto {
        let path = &self.inner().path;
        let message = message_proto(&self.file.inner.proto, &path[..path.len() - 2]);
        &message.oneof_decl[last_index(path)]
    }

    pub fn fields(&self) -> impl ExactSizeIterator<Item = FieldDescriptor> + '_ {
        self.inner().fields.iter().map(|&index| FieldDescriptor {
            file: self.file.clone(),
            index,
        })
    }

    /// Whether this oneof was generated for a proto3 `optional` field.
    pub fn is_synthetic(&self) -> bool {
        let mut fields = self.fields();
        match (fields.next(), fields.next()) {
            (Some(field), None) => field.field_descriptor_proto().proto3_optional(),
            _ => false,
        }
    }

    pub fn features(&self) -> FeatureSet {
        let mut features = self.parent_message().features();
        if let Some(overrides) = self
            .descriptor_proto()
            .options
            .as_ref()
            .and_then(|o| o.features.as_ref())
        {
            features::merge(&mut features, overrides);
        }
        features
    }
}

impl EnumDescriptor {
    /// The position of this element in the file's flattened list of all such elements.
    pub(crate) fn arena_index(&self) -> usize {
        self.index
    }

    fn inner(&self) -> &index::EnumIndex {
        &self.file.inner.index.enums[self.index]
    }

    pub fn name(&self) -> &str {
        self.descriptor_proto().name()
    }

    pub fn full_name(&self) -> &str {
        &self.inner().full_name
    }

    pub fn index(&self) -> usize {
        last_index(&self.inner().path)
    }

    pub fn parent_file(&self) -> FileDescriptor {
        self.file.clone()
    }

    pub fn parent_message(&self) -> Option<MessageDescriptor> {
        self.inner().parent.map(|index| self.file.message(index))
    }

    pub fn descriptor_proto(&self) -> &EnumDescriptorProto {
        enum_proto(&self.file.inner.proto, &self.inner().path)
    }

    pub fn values(&self) -> impl ExactSizeIterator<Item = EnumValueDescriptor> + '_ {
        self.inner().values.iter().map(|&index| EnumValueDescriptor {
            file: self.file.clone(),
            index,
        })
    }

    pub fn get_value(&self, number: i32) -> Option<EnumValueDescriptor> {
        self.values().find(|value| value.number() == number)
    }

    pub fn get_value_by_name(&self, name: &str) -> Option<EnumValueDescriptor> {
        self.values().find(|value| value.name() == name)
    }

    /// Whether unknown values of this enum are rejected when parsing.
    pub fn is_closed(&self) -> bool {
        self.features().enum_type() == crate::types::feature_set::EnumType::Closed
    }

    pub fn features(&self) -> FeatureSet {
        let mut features = self.file.features();
        self.file
            .merge_message_features(&mut features, self.inner().parent);
        if let Some(overrides) = self
            .descriptor_proto()
            .options
            .as_ref()
            .and_then(|o| o.features.as_ref())
        {
            features::merge(&mut features, overrides);
        }
        features
    }
}

impl EnumValueDescriptor {
    fn inner(&self) -> &index::ValueIndex {
        &self.file.inner.index.values[self.index]
    }

    pub fn name(&self) -> &str {
        self.descriptor_proto().name()
    }

    /// The full name of this value, which is scoped as a sibling of its enum.
    pub fn full_name(&self) -> &str {
        &self.inner().full_name
    }

    pub fn number(&self) -> i32 {
        self.descriptor_proto().number()
    }

    pub fn index(&self) -> usize {
        last_index(&self.inner().path)
    }

    pub fn parent_enum(&self) -> EnumDescriptor {
        self.file.enum_(self.inner().parent)
    }

    pub fn descriptor_proto(&self) -> &EnumValueDescriptorProto {
        let path = &self.inner().path;
        &enum_proto(&self.file.inner.proto, &path[..path.len() - 2]).value[last_index(path)]
    }

    pub fn features(&self) -> FeatureSet {
        let mut features = self.parent_enum().features();
        if let Some(overrides) = self
            .descriptor_proto()
            .options
            .as_ref()
            .and_then(|o| o.features.as_ref())
        {
            features::merge(&mut features, overrides);
        }
        features
    }
}

impl ServiceDescriptor {
    fn inner(&self) -> &index::ServiceIndex {
        &self.file.inner.index.services[self.index]
    }

    pub fn name(&self) -> &str {
        self.descriptor_proto().name()
    }

    pub fn full_name(&self) -> &str {
        &self.inner().full_name
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn parent_file(&self) -> FileDescriptor {
        self.file.clone()
    }

    pub fn descriptor_proto(&self) -> &ServiceDescriptorProto {
        &self.file.inner.proto.service[self.index]
    }

    pub fn methods(&self) -> impl ExactSizeIterator<Item = MethodDescriptor> + '_ {
        self.inner().methods.iter().map(|&index| MethodDescriptor {
            file: self.file.clone(),
            index,
        })
    }

    pub fn features(&self) -> FeatureSet {
        let mut features = self.file.features();
        if let Some(overrides) = self
            .descriptor_proto()
            .options
            .as_ref()
            .and_then(|o| o.features.as_ref())
        {
            features::merge(&mut features, overrides);
        }
        features
    }
}

impl MethodDescriptor {
    fn inner(&self) -> &index::MethodIndex {
        &self.file.inner.index.methods[self.index]
    }

    pub fn name(&self) -> &str {
        self.descriptor_proto().name()
    }

    pub fn full_name(&self) -> &str {
        &self.inner().full_name
    }

    pub fn index(&self) -> usize {
        last_index(&self.inner().path)
    }

    pub fn parent_service(&self) -> ServiceDescriptor {
        ServiceDescriptor {
            file: self.file.clone(),
            index: self.inner().parent,
        }
    }

    pub fn descriptor_proto(&self) -> &MethodDescriptorProto {
        &self.file.inner.proto.service[self.inner().parent].method[self.index()]
    }

    /// The request type, if it was resolved.
    pub fn input(&self) -> Option<MessageDescriptor> {
        self.file
            .message_by_ref(&self.file.inner.method_types[self.index].0)
    }

    /// The response type, if it was resolved.
    pub fn output(&self) -> Option<MessageDescriptor> {
        self.file
            .message_by_ref(&self.file.inner.method_types[self.index].1)
    }

    pub fn is_client_streaming(&self) -> bool {
        self.descriptor_proto().client_streaming()
    }

    pub fn is_server_streaming(&self) -> bool {
        self.descriptor_proto().server_streaming()
    }

    pub fn features(&self) -> FeatureSet {
        let mut features = self.parent_service().features();
        if let Some(overrides) = self
            .descriptor_proto()
            .options
            .as_ref()
            .and_then(|o| o.features.as_ref())
        {
            features::merge(&mut features, overrides);
        }
        features
    }
}

fn field_kind(file: &FileDescriptor, proto: &FieldDescriptorProto, type_ref: &Option<TypeRef>) -> Kind {
    if let Some(kind) = type_ref.as_ref().and_then(|type_ref| file.resolve_type_ref(type_ref)) {
        return kind;
    }

    match proto.r#type.and_then(|ty| Type::try_from(ty).ok()) {
        Some(Type::Double) => Kind::Double,
        Some(Type::Float) => Kind::Float,
        Some(Type::Int32) => Kind::Int32,
        Some(Type::Int64) => Kind::Int64,
        Some(Type::Uint32) => Kind::Uint32,
        Some(Type::Uint64) => Kind::Uint64,
        Some(Type::Sint32) => Kind::Sint32,
        Some(Type::Sint64) => Kind::Sint64,
        Some(Type::Fixed32) => Kind::Fixed32,
        Some(Type::Fixed64) => Kind::Fixed64,
        Some(Type::Sfixed32) => Kind::Sfixed32,
        Some(Type::Sfixed64) => Kind::Sfixed64,
        Some(Type::Bool) => Kind::Bool,
        Some(Type::String) => Kind::String,
        Some(Type::Bytes) => Kind::Bytes,
        Some(Type::Message | Type::Group | Type::Enum) | None => {
            Kind::Unresolved(proto.type_name().to_owned())
        }
    }
}

/// Applies the features implied by the syntax of proto2 and proto3 files.
pub(crate) fn merge_field_features(
    features: &mut FeatureSet,
    edition: Edition,
    proto: &FieldDescriptorProto,
) {
    if let Some(overrides) = proto.options.as_ref().and_then(|o| o.features.as_ref()) {
        features::merge(features, overrides);
    }

    match edition {
        Edition::Proto2 => {
            if proto.label() == Label::Required {
                features.field_presence =
                    Some(crate::types::feature_set::FieldPresence::LegacyRequired as i32);
            }
            if proto.r#type() == Type::Group {
                features.message_encoding = Some(MessageEncoding::Delimited as i32);
            }
            if proto.options.as_ref().map_or(false, |o| o.packed()) {
                features.repeated_field_encoding = Some(RepeatedFieldEncoding::Packed as i32);
            }
        }
        Edition::Proto3 => {
            if proto
                .options
                .as_ref()
                .map_or(false, |o| o.packed.is_some() && !o.packed())
            {
                features.repeated_field_encoding = Some(RepeatedFieldEncoding::Expanded as i32);
            }
        }
        _ => (),
    }
}

/// A field is group-like if it is delimited, named after its type in lowercase, and declared
/// in the same scope as its type.
pub(crate) fn is_group_like(
    proto: &FieldDescriptorProto,
    features: &FeatureSet,
    message: &MessageDescriptor,
    scope: Option<usize>,
    file: &FileDescriptor,
) -> bool {
    features.message_encoding() == MessageEncoding::Delimited
        && proto.name() == message.name().to_ascii_lowercase()
        && message.file == *file
        && message.inner().parent == scope
}

pub(crate) fn message_proto<'a>(file: &'a FileDescriptorProto, path: &[i32]) -> &'a DescriptorProto {
    let mut message = &file.message_type[path_index(path[1])];
    for pair in path[2..].chunks(2) {
        message = &message.nested_type[path_index(pair[1])];
    }
    message
}

pub(crate) fn enum_proto<'a>(file: &'a FileDescriptorProto, path: &[i32]) -> &'a EnumDescriptorProto {
    if path.len() == 2 {
        &file.enum_type[path_index(path[1])]
    } else {
        &message_proto(file, &path[..path.len() - 2]).enum_type[last_index(path)]
    }
}

fn last_index(path: &[i32]) -> usize {
    path.last().map_or(0, |&index| path_index(index))
}

fn path_index(index: i32) -> usize {
    usize::try_from(index).unwrap_or_default()
}

impl PartialEq for FileDescriptor {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for FileDescriptor {}

impl fmt::Debug for FileDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileDescriptor")
            .field("name", &self.name())
            .field("package", &self.package())
            .finish_non_exhaustive()
    }
}

macro_rules! debug_full_name {
    ($($ty:ident),*) => {
        $(
            impl fmt::Debug for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.debug_tuple(stringify!($ty)).field(&self.full_name()).finish()
                }
            }
        )*
    };
}

debug_full_name!(
    MessageDescriptor,
    FieldDescriptor,
    ExtensionDescriptor,
    OneofDescriptor,
    EnumDescriptor,
    EnumValueDescriptor,
    ServiceDescriptor,
    MethodDescriptor
);

macro_rules! element_path {
    ($($ty:ident),*) => {
        $(
            impl $ty {
                /// The source code info path of this element.
                pub(crate) fn path(&self) -> &[i32] {
                    &self.inner().path
                }
            }
        )*
    };
}

element_path!(
    MessageDescriptor,
    FieldDescriptor,
    ExtensionDescriptor,
    OneofDescriptor,
    EnumDescriptor,
    EnumValueDescriptor,
    ServiceDescriptor,
    MethodDescriptor
);
