//! Interpretation of the options recorded as `uninterpreted_option` entries.
//!
//! Each option name is resolved to a path of fields, starting at one of the standard options
//! messages and possibly passing through extensions. The value is checked against the type of
//! the last field and encoded, wrapped in the encoding of each enclosing field, so it can be
//! merged into the options message. Options which go through an extension are offered to an
//! [`OptionInterpreter`], and kept as uninterpreted if it declines them.

use std::collections::HashSet;

use prost::{
    encoding::{encode_key, encode_varint, WireType},
    Message,
};

use super::{
    features::{self, check_feature_support, SupportProblem},
    resolve::{NameResolver, Target},
    schema::{self, FieldSchema, MessageSchema, SchemaType},
    text_format,
};
use crate::{
    descriptor::{
        DefinitionKind, EnumDescriptor, ExtensionDescriptor, FileDescriptor, Kind,
        MessageDescriptor,
    },
    diagnostic::{CheckError, Severity},
    index_to_i32, make_name, tag,
    types::{
        field_descriptor_proto::Type, field_options::FeatureSupport, DescriptorProto,
        EnumDescriptorProto, EnumOptions, EnumValueOptions, ExtensionRangeOptions,
        FieldDescriptorProto, FieldOptions, FileDescriptorProto, FileOptions, MessageOptions,
        MethodOptions, OneofOptions, ServiceOptions, UninterpretedOption,
    },
};

/// Handles custom options: options set through an extension of an options message.
///
/// Implementations are shared by every linking task, so they must be thread-safe.
pub trait OptionInterpreter: Send + Sync {
    /// Interprets a custom option.
    ///
    /// Returns `Ok(true)` if the option was consumed, in which case it is merged into the
    /// options message and removed from its `uninterpreted_option` list, or `Ok(false)` to
    /// keep it uninterpreted. An error is reported against the option.
    fn interpret(&self, option: &CustomOption<'_>) -> Result<bool, String>;
}

/// An [`OptionInterpreter`] which keeps every custom option uninterpreted, after checking its
/// value against the type of the extension.
#[derive(Debug, Default, Clone, Copy)]
pub struct RetainUninterpreted;

impl OptionInterpreter for RetainUninterpreted {
    fn interpret(&self, _: &CustomOption<'_>) -> Result<bool, String> {
        Ok(false)
    }
}

/// A custom option whose name and value have been checked.
#[derive(Debug)]
pub struct CustomOption<'a> {
    file: &'a str,
    element: &'a str,
    options_message: &'static str,
    name: String,
    extension: &'a ExtensionDescriptor,
    field_numbers: Vec<u32>,
    encoded: Vec<u8>,
    uninterpreted: &'a UninterpretedOption,
}

impl<'a> CustomOption<'a> {
    /// The name of the file the option is set in.
    pub fn file(&self) -> &str {
        self.file
    }

    /// The full name of the element the option is set on, or the file name for file options.
    pub fn element(&self) -> &str {
        self.element
    }

    /// The full name of the options message, e.g. `google.protobuf.FieldOptions`.
    pub fn options_message(&self) -> &str {
        self.options_message
    }

    /// The option name as written, e.g. `(foo.bar).baz`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The first extension in the option name.
    pub fn extension(&self) -> &ExtensionDescriptor {
        self.extension
    }

    /// The field numbers of each part of the option name.
    pub fn field_numbers(&self) -> &[u32] {
        &self.field_numbers
    }

    /// The value, encoded as it would appear in the serialized options message.
    pub fn encoded_value(&self) -> &[u8] {
        &self.encoded
    }

    pub fn uninterpreted(&self) -> &UninterpretedOption {
        self.uninterpreted
    }
}

/// The generated options messages.
pub(crate) trait OptionsMessage: Message + Default {
    fn schema() -> &'static MessageSchema;

    fn uninterpreted_option(&mut self) -> &mut Vec<UninterpretedOption>;
}

macro_rules! options_message {
    ($($ty:ty => $schema:ident),* $(,)?) => {
        $(
            impl OptionsMessage for $ty {
                fn schema() -> &'static MessageSchema {
                    &schema::$schema
                }

                fn uninterpreted_option(&mut self) -> &mut Vec<UninterpretedOption> {
                    &mut self.uninterpreted_option
                }
            }
        )*
    };
}

options_message!(
    FileOptions => FILE_OPTIONS,
    MessageOptions => MESSAGE_OPTIONS,
    FieldOptions => FIELD_OPTIONS,
    OneofOptions => ONEOF_OPTIONS,
    EnumOptions => ENUM_OPTIONS,
    EnumValueOptions => ENUM_VALUE_OPTIONS,
    ServiceOptions => SERVICE_OPTIONS,
    MethodOptions => METHOD_OPTIONS,
    ExtensionRangeOptions => EXTENSION_RANGE_OPTIONS,
);

/// The problems found while interpreting the options of a file, and the source locations of
/// options which moved.
#[derive(Default)]
pub(crate) struct Interpreted {
    pub errors: Vec<(Vec<i32>, Severity, CheckError)>,
    pub moves: Vec<(Vec<i32>, Vec<i32>)>,
}

/// Interprets every option in `proto`.
///
/// `file` is the same file with resolved types, used to look up the types of extensions
/// declared locally.
pub(crate) fn interpret(
    proto: &mut FileDescriptorProto,
    file: &FileDescriptor,
    resolver: &NameResolver<'_>,
    interpreter: &dyn OptionInterpreter,
) -> Interpreted {
    let mut ctx = Context {
        file,
        resolver,
        interpreter,
        result: Interpreted::default(),
    };
    ctx.visit_file(proto);
    ctx.result
}

struct Context<'a> {
    file: &'a FileDescriptor,
    resolver: &'a NameResolver<'a>,
    interpreter: &'a dyn OptionInterpreter,
    result: Interpreted,
}

/// The outcome of interpreting one option.
enum Outcome {
    /// The option was merged into the options message. Holds the field numbers of its name.
    Set(Vec<i32>),
    Retain,
}

/// A field which can appear in an option name or message literal.
#[derive(Clone)]
struct OptionField {
    name: String,
    number: u32,
    ty: ValueType,
    repeated: bool,
    extension: Option<ExtensionDescriptor>,
    feature_support: Option<FeatureSupport>,
}

#[derive(Clone)]
enum MessageType {
    Standard(&'static MessageSchema),
    Dynamic(MessageDescriptor),
}

#[derive(Clone)]
enum EnumType {
    Standard(&'static [(&'static str, i32)]),
    Dynamic(EnumDescriptor),
}

#[derive(Clone)]
enum ValueType {
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
    Enum(EnumType),
    Message(MessageType),
    Group(MessageType),
    /// The type of the field could not be resolved, which was already reported.
    Unresolved,
}

#[derive(Debug, Clone, Copy)]
enum Value<'a> {
    Ident { negative: bool, ident: &'a str },
    Int(i128),
    Float(f64),
    String(&'a [u8]),
    Aggregate(&'a str),
}

impl<'a> Context<'a> {
    fn visit_file(&mut self, proto: &mut FileDescriptorProto) {
        let package = proto.package().to_owned();
        let name = proto.name().to_owned();

        self.interpret_options(&mut proto.options, vec![tag::file::OPTIONS], &package, &name);
        for (i, message) in proto.message_type.iter_mut().enumerate() {
            self.visit_message(message, vec![tag::file::MESSAGE_TYPE, index_to_i32(i)], &package);
        }
        for (i, enum_) in proto.enum_type.iter_mut().enumerate() {
            self.visit_enum(enum_, vec![tag::file::ENUM_TYPE, index_to_i32(i)], &package);
        }
        for (i, extension) in proto.extension.iter_mut().enumerate() {
            self.visit_field(extension, vec![tag::file::EXTENSION, index_to_i32(i)], &package);
        }
        for (i, service) in proto.service.iter_mut().enumerate() {
            let full_name = make_name(&package, service.name());
            let path = vec![tag::file::SERVICE, index_to_i32(i)];
            self.interpret_options(
                &mut service.options,
                join(&path, &[tag::service::OPTIONS]),
                &package,
                &full_name,
            );
            for (j, method) in service.method.iter_mut().enumerate() {
                let method_name = make_name(&full_name, method.name());
                self.interpret_options(
                    &mut method.options,
                    join(
                        &path,
                        &[tag::service::METHOD, index_to_i32(j), tag::method::OPTIONS],
                    ),
                    &full_name,
                    &method_name,
                );
            }
        }
    }

    fn visit_message(&mut self, message: &mut DescriptorProto, path: Vec<i32>, scope: &str) {
        let full_name = make_name(scope, message.name());
        self.interpret_options(
            &mut message.options,
            join(&path, &[tag::message::OPTIONS]),
            scope,
            &full_name,
        );

        for (i, field) in message.field.iter_mut().enumerate() {
            self.visit_field(
                field,
                join(&path, &[tag::message::FIELD, index_to_i32(i)]),
                &full_name,
            );
        }
        for (i, oneof) in message.oneof_decl.iter_mut().enumerate() {
            let oneof_name = make_name(&full_name, oneof.name());
            self.interpret_options(
                &mut oneof.options,
                join(
                    &path,
                    &[tag::message::ONEOF_DECL, index_to_i32(i), tag::oneof::OPTIONS],
                ),
                &full_name,
                &oneof_name,
            );
        }
        for (i, range) in message.extension_range.iter_mut().enumerate() {
            self.interpret_options(
                &mut range.options,
                join(
                    &path,
                    &[
                        tag::message::EXTENSION_RANGE,
                        index_to_i32(i),
                        tag::message::extension_range::OPTIONS,
                    ],
                ),
                scope,
                &full_name,
            );
        }
        for (i, nested) in message.nested_type.iter_mut().enumerate() {
            self.visit_message(
                nested,
                join(&path, &[tag::message::NESTED_TYPE, index_to_i32(i)]),
                &full_name,
            );
        }
        for (i, enum_) in message.enum_type.iter_mut().enumerate() {
            self.visit_enum(
                enum_,
                join(&path, &[tag::message::ENUM_TYPE, index_to_i32(i)]),
                &full_name,
            );
        }
        for (i, extension) in message.extension.iter_mut().enumerate() {
            self.visit_field(
                extension,
                join(&path, &[tag::message::EXTENSION, index_to_i32(i)]),
                &full_name,
            );
        }
    }

    fn visit_field(&mut self, field: &mut FieldDescriptorProto, path: Vec<i32>, scope: &str) {
        let full_name = make_name(scope, field.name());
        self.interpret_options(
            &mut field.options,
            join(&path, &[tag::field::OPTIONS]),
            scope,
            &full_name,
        );
    }

    fn visit_enum(&mut self, enum_: &mut EnumDescriptorProto, path: Vec<i32>, scope: &str) {
        let full_name = make_name(scope, enum_.name());
        self.interpret_options(
            &mut enum_.options,
            join(&path, &[tag::enum_::OPTIONS]),
            scope,
            &full_name,
        );
        for (i, value) in enum_.value.iter_mut().enumerate() {
            let value_name = make_name(scope, value.name());
            self.interpret_options(
                &mut value.options,
                join(
                    &path,
                    &[tag::enum_::VALUE, index_to_i32(i), tag::enum_value::OPTIONS],
                ),
                scope,
                &value_name,
            );
        }
    }

    /// Interprets the options of one element. The first part of each option name is resolved
    /// relative to `scope`, the scope enclosing the element.
    fn interpret_options<T: OptionsMessage>(
        &mut self,
        options: &mut Option<T>,
        path: Vec<i32>,
        scope: &str,
        element: &str,
    ) {
        let options = match options {
            Some(options) => options,
            None => return,
        };

        let uninterpreted = std::mem::take(options.uninterpreted_option());
        if uninterpreted.is_empty() {
            return;
        }
        let mut retained = Vec::new();
        let mut already_set = HashSet::new();
        for (i, option) in uninterpreted.into_iter().enumerate() {
            let option_path = join(&path, &[tag::UNINTERPRETED_OPTION, index_to_i32(i)]);
            match self.interpret_option(options, &option, scope, element, &option_path, &mut already_set) {
                Ok(Outcome::Set(numbers)) => {
                    self.result.moves.push((option_path, join(&path, &numbers)));
                }
                Ok(Outcome::Retain) => {
                    let new_path =
                        join(&path, &[tag::UNINTERPRETED_OPTION, index_to_i32(retained.len())]);
                    self.result.moves.push((option_path, new_path));
                    retained.push(option);
                }
                Err(err) => {
                    self.result
                        .errors
                        .push((option_path.clone(), Severity::Error, err));
                    let new_path =
                        join(&path, &[tag::UNINTERPRETED_OPTION, index_to_i32(retained.len())]);
                    self.result.moves.push((option_path, new_path));
                    retained.push(option);
                }
            }
        }
        *options.uninterpreted_option() = retained;
    }

    fn interpret_option<T: OptionsMessage>(
        &mut self,
        options: &mut T,
        option: &UninterpretedOption,
        scope: &str,
        element: &str,
        option_path: &[i32],
        already_set: &mut HashSet<Vec<u32>>,
    ) -> Result<Outcome, CheckError> {
        let name = option_name(option);

        let mut fields: Vec<OptionField> = Vec::with_capacity(option.name.len());
        let mut message = MessageType::Standard(T::schema());
        for (i, part) in option.name.iter().enumerate() {
            let field = if part.is_extension {
                self.resolve_extension(&part.name_part, &message, (i == 0).then_some(scope))?
            } else {
                message
                    .field(&part.name_part, false)
                    .ok_or_else(|| CheckError::OptionUnknownField {
                        name: part.name_part.clone(),
                        message: message.full_name().to_owned(),
                    })?
            };

            if i + 1 < option.name.len() {
                message = match &field.ty {
                    ValueType::Message(ty) | ValueType::Group(ty) if !field.repeated => ty.clone(),
                    ValueType::Unresolved => return Ok(Outcome::Retain),
                    _ => {
                        return Err(CheckError::OptionNotMessage {
                            name: option_name_prefix(option, i + 1),
                        })
                    }
                };
            }
            fields.push(field);
        }

        let leaf = match fields.last() {
            Some(leaf) => leaf,
            None => {
                return Err(CheckError::OptionUnknownField {
                    name: String::new(),
                    message: T::schema().name.to_owned(),
                })
            }
        };
        if matches!(leaf.ty, ValueType::Unresolved) {
            return Ok(Outcome::Retain);
        }

        self.check_custom_features(&fields, &name, option_path);

        let numbers: Vec<u32> = fields.iter().map(|field| field.number).collect();
        if !fields.iter().any(|field| field.repeated) && !already_set.insert(numbers.clone()) {
            return Err(CheckError::OptionAlreadySet { name });
        }

        let value = uninterpreted_value(option).ok_or_else(|| CheckError::OptionValueInvalidType {
            name: name.clone(),
            expected: leaf.ty.name().to_owned(),
        })?;
        let mut encoded = Vec::new();
        self.encode_field(leaf, value, &name, &mut encoded)?;
        for field in fields[..fields.len() - 1].iter().rev() {
            encoded = wrap_message(field, encoded);
        }

        let path_numbers: Vec<i32> = numbers.iter().map(|&number| number as i32).collect();
        match fields.iter().find_map(|field| field.extension.as_ref()) {
            None => {
                if T::schema().name == schema::MESSAGE_OPTIONS.name && numbers == [7] {
                    return Err(CheckError::MapEntrySetExplicitly);
                }
                options
                    .merge(encoded.as_slice())
                    .map_err(|err| CheckError::OptionInvalidAggregate {
                        name,
                        reason: err.to_string(),
                    })?;
                Ok(Outcome::Set(path_numbers))
            }
            Some(extension) => {
                let custom = CustomOption {
                    file: self.file.name(),
                    element,
                    options_message: T::schema().name,
                    name: name.clone(),
                    extension,
                    field_numbers: numbers,
                    encoded,
                    uninterpreted: option,
                };
                match self.interpreter.interpret(&custom) {
                    Ok(true) => {
                        options.merge(custom.encoded.as_slice()).map_err(|err| {
                            CheckError::OptionInvalidAggregate {
                                name: name.clone(),
                                reason: err.to_string(),
                            }
                        })?;
                        Ok(Outcome::Set(path_numbers))
                    }
                    Ok(false) => Ok(Outcome::Retain),
                    Err(message) => Err(CheckError::OptionInterpreterFailed { name, message }),
                }
            }
        }
    }

    /// Resolves an extension in an option name or message literal, and checks it extends
    /// `message`. The first part of an option name uses full scoped lookup from `scope`,
    /// other extension names only search the file's package and the root.
    fn resolve_extension(
        &self,
        name: &str,
        message: &MessageType,
        scope: Option<&str>,
    ) -> Result<OptionField, CheckError> {
        let resolved = match scope {
            Some(scope) => self.resolver.lookup(scope, name, false),
            None => self.resolver.lookup_extension_relative(name),
        };
        let not_found = || CheckError::OptionExtensionNotFound {
            name: name.to_owned(),
        };
        let resolved = resolved.map_err(|_| not_found())?;
        if resolved.kind != DefinitionKind::Extension {
            return Err(not_found());
        }

        let extension = match resolved.target {
            Target::Local(index) => self.file.extension(index),
            Target::Dependency(file, index) => file.extension(index),
        };
        let extendee = extension
            .field_descriptor_proto()
            .extendee()
            .trim_start_matches('.');
        if extendee != message.full_name() {
            return Err(CheckError::OptionExtendeeMismatch {
                name: resolved.full_name,
                extendee: extendee.to_owned(),
                expected: message.full_name().to_owned(),
            });
        }

        let proto = extension.field_descriptor_proto();
        Ok(OptionField::dynamic(
            format!("({})", name),
            extension.number(),
            extension.kind(),
            proto,
            extension.is_list(),
            Some(extension.clone()),
        ))
    }

    /// Checks the lifetimes declared on custom features set through the `features` option.
    fn check_custom_features(&mut self, fields: &[OptionField], name: &str, path: &[i32]) {
        if fields.first().map_or(true, |field| field.name != "features") {
            return;
        }

        let edition = self.file.edition();
        for field in &fields[1..] {
            let support = match &field.feature_support {
                Some(support) => support,
                None => continue,
            };
            let (severity, err) = match check_feature_support(support, edition) {
                None => continue,
                Some(SupportProblem::NotIntroduced(introduced)) => (
                    Severity::Error,
                    CheckError::FeatureNotYetIntroduced {
                        feature: name.to_owned(),
                        introduced: features::edition_name(introduced).to_owned(),
                    },
                ),
                Some(SupportProblem::Removed(removed)) => (
                    Severity::Error,
                    CheckError::FeatureRemoved {
                        feature: name.to_owned(),
                        removed: features::edition_name(removed).to_owned(),
                    },
                ),
                Some(SupportProblem::Deprecated(deprecated, warning)) => (
                    Severity::Warning,
                    CheckError::FeatureDeprecated {
                        feature: name.to_owned(),
                        deprecated: features::edition_name(deprecated).to_owned(),
                        warning,
                    },
                ),
            };
            self.result.errors.push((path.to_vec(), severity, err));
        }
    }

    /// Encodes one value of a field, including its key.
    fn encode_field(
        &self,
        field: &OptionField,
        value: Value<'_>,
        name: &str,
        buf: &mut Vec<u8>,
    ) -> Result<(), CheckError> {
        let invalid_type = || CheckError::OptionValueInvalidType {
            name: name.to_owned(),
            expected: field.ty.name().to_owned(),
        };
        let number = field.number;

        match &field.ty {
            ValueType::Bool => {
                let value = match value {
                    Value::Ident {
                        negative: false,
                        ident: "true",
                    } => 1,
                    Value::Ident {
                        negative: false,
                        ident: "false",
                    } => 0,
                    _ => return Err(invalid_type()),
                };
                encode_key(number, WireType::Varint, buf);
                encode_varint(value, buf);
            }
            ValueType::Int32 | ValueType::Enum(_) | ValueType::Sint32 | ValueType::Sfixed32 => {
                let value = match (&field.ty, value) {
                    (ValueType::Enum(ty), Value::Ident { negative: false, ident }) => {
                        ty.value(ident).ok_or_else(|| CheckError::OptionInvalidEnumValue {
                            name: name.to_owned(),
                            value: ident.to_owned(),
                        })?
                    }
                    (ValueType::Enum(_), _) => return Err(invalid_type()),
                    (_, value) => int_in_range(value, name, i32::MIN.into(), i32::MAX as u64)
                        .ok_or_else(invalid_type)?? as i32,
                };
                match field.ty {
                    ValueType::Sint32 => {
                        encode_key(number, WireType::Varint, buf);
                        encode_varint(((value << 1) ^ (value >> 31)) as u32 as u64, buf);
                    }
                    ValueType::Sfixed32 => {
                        encode_key(number, WireType::ThirtyTwoBit, buf);
                        buf.extend_from_slice(&value.to_le_bytes());
                    }
                    _ => {
                        encode_key(number, WireType::Varint, buf);
                        encode_varint(value as i64 as u64, buf);
                    }
                }
            }
            ValueType::Int64 | ValueType::Sint64 | ValueType::Sfixed64 => {
                let value = int_in_range(value, name, i64::MIN, i64::MAX as u64)
                    .ok_or_else(invalid_type)?? as i64;
                match field.ty {
                    ValueType::Sint64 => {
                        encode_key(number, WireType::Varint, buf);
                        encode_varint(((value << 1) ^ (value >> 63)) as u64, buf);
                    }
                    ValueType::Sfixed64 => {
                        encode_key(number, WireType::SixtyFourBit, buf);
                        buf.extend_from_slice(&value.to_le_bytes());
                    }
                    _ => {
                        encode_key(number, WireType::Varint, buf);
                        encode_varint(value as u64, buf);
                    }
                }
            }
            ValueType::Uint32 | ValueType::Fixed32 => {
                let value =
                    int_in_range(value, name, 0, u32::MAX.into()).ok_or_else(invalid_type)?? as u32;
                if matches!(field.ty, ValueType::Fixed32) {
                    encode_key(number, WireType::ThirtyTwoBit, buf);
                    buf.extend_from_slice(&value.to_le_bytes());
                } else {
                    encode_key(number, WireType::Varint, buf);
                    encode_varint(value.into(), buf);
                }
            }
            ValueType::Uint64 | ValueType::Fixed64 => {
                let value = int_in_range(value, name, 0, u64::MAX).ok_or_else(invalid_type)?? as u64;
                if matches!(field.ty, ValueType::Fixed64) {
                    encode_key(number, WireType::SixtyFourBit, buf);
                    buf.extend_from_slice(&value.to_le_bytes());
                } else {
                    encode_key(number, WireType::Varint, buf);
                    encode_varint(value, buf);
                }
            }
            ValueType::Double | ValueType::Float => {
                let value = float_value(value).ok_or_else(invalid_type)?;
                if matches!(field.ty, ValueType::Float) {
                    encode_key(number, WireType::ThirtyTwoBit, buf);
                    buf.extend_from_slice(&(value as f32).to_le_bytes());
                } else {
                    encode_key(number, WireType::SixtyFourBit, buf);
                    buf.extend_from_slice(&value.to_le_bytes());
                }
            }
            ValueType::String | ValueType::Bytes => {
                let bytes = match value {
                    Value::String(bytes) => bytes,
                    _ => return Err(invalid_type()),
                };
                if matches!(field.ty, ValueType::String) && std::str::from_utf8(bytes).is_err() {
                    return Err(CheckError::OptionValueInvalidType {
                        name: name.to_owned(),
                        expected: "valid UTF-8 string".to_owned(),
                    });
                }
                encode_bytes(number, bytes, buf);
            }
            ValueType::Message(ty) | ValueType::Group(ty) => {
                let text = match value {
                    Value::Aggregate(text) => text,
                    _ => return Err(invalid_type()),
                };
                let invalid_aggregate = |reason: String| CheckError::OptionInvalidAggregate {
                    name: name.to_owned(),
                    reason,
                };
                let message = text_format::parse(text).map_err(invalid_aggregate)?;
                let body = self
                    .encode_message(ty, &message)
                    .map_err(invalid_aggregate)?;
                buf.extend(wrap_message(field, body));
            }
            ValueType::Unresolved => (),
        }
        Ok(())
    }

    /// Encodes a message literal as the body of a message of type `ty`.
    fn encode_message(
        &self,
        ty: &MessageType,
        message: &text_format::Message,
    ) -> Result<Vec<u8>, String> {
        let mut buf = Vec::new();
        let mut seen = HashSet::new();
        for field in &message.fields {
            let (name, def) = match &field.name {
                text_format::FieldName::Ident(name) => (
                    name.clone(),
                    ty.field(name, true).ok_or_else(|| {
                        format!("'{}' is not a field of '{}'", name, ty.full_name())
                    })?,
                ),
                text_format::FieldName::Extension(name) => (
                    format!("[{}]", name),
                    self.resolve_extension(name, ty, None)
                        .map_err(|err| err.to_string())?,
                ),
                text_format::FieldName::Any(..) => {
                    return Err("expanded Any values are not supported".to_owned())
                }
            };

            if !def.repeated && !seen.insert(def.number) {
                return Err(format!(
                    "non-repeated field '{}' is specified multiple times",
                    name
                ));
            }

            match &field.value {
                text_format::FieldValue::Scalar(scalar) => {
                    self.encode_scalar(&def, scalar, &name, &mut buf)?;
                }
                text_format::FieldValue::ScalarList(list) => {
                    if !def.repeated {
                        return Err(format!("field '{}' is not repeated", name));
                    }
                    for scalar in list {
                        self.encode_scalar(&def, scalar, &name, &mut buf)?;
                    }
                }
                text_format::FieldValue::Message(value) => {
                    buf.extend(self.encode_nested(&def, value, &name)?);
                }
                text_format::FieldValue::MessageList(list) => {
                    if !def.repeated {
                        return Err(format!("field '{}' is not repeated", name));
                    }
                    for value in list {
                        buf.extend(self.encode_nested(&def, value, &name)?);
                    }
                }
            }
        }
        Ok(buf)
    }

    fn encode_scalar(
        &self,
        field: &OptionField,
        scalar: &text_format::Scalar,
        name: &str,
        buf: &mut Vec<u8>,
    ) -> Result<(), String> {
        let value = match scalar {
            text_format::Scalar::String(bytes) => Value::String(bytes),
            text_format::Scalar::Ident { negative, ident } => Value::Ident {
                negative: *negative,
                ident,
            },
            text_format::Scalar::Int { negative, value } => {
                let value = i128::from(*value);
                Value::Int(if *negative { -value } else { value })
            }
            text_format::Scalar::Float(value) => Value::Float(*value),
        };
        let value = match (&field.ty, value) {
            // Message literals also accept the short forms of booleans.
            (ValueType::Bool, Value::Ident { negative: false, ident: "True" | "t" })
            | (ValueType::Bool, Value::Int(1)) => Value::Ident {
                negative: false,
                ident: "true",
            },
            (ValueType::Bool, Value::Ident { negative: false, ident: "False" | "f" })
            | (ValueType::Bool, Value::Int(0)) => Value::Ident {
                negative: false,
                ident: "false",
            },
            (ValueType::Enum(ty), Value::Int(number)) => {
                return match i32::try_from(number).ok().filter(|&number| ty.contains(number)) {
                    Some(number) => {
                        encode_key(field.number, WireType::Varint, buf);
                        encode_varint(number as i64 as u64, buf);
                        Ok(())
                    }
                    None => Err(format!("{} is not a valid value for field '{}'", number, name)),
                };
            }
            (_, value) => value,
        };

        self.encode_field(field, value, name, buf)
            .map_err(|err| err.to_string())
    }

    fn encode_nested(
        &self,
        field: &OptionField,
        value: &text_format::Message,
        name: &str,
    ) -> Result<Vec<u8>, String> {
        match &field.ty {
            ValueType::Message(ty) | ValueType::Group(ty) => {
                let body = self.encode_message(ty, value)?;
                Ok(wrap_message(field, body))
            }
            _ => Err(format!("field '{}' is not a message", name)),
        }
    }
}

impl MessageType {
    fn full_name(&self) -> &str {
        match self {
            MessageType::Standard(schema) => schema.name,
            MessageType::Dynamic(message) => message.full_name(),
        }
    }

    /// Finds a field by name. In message literals, a group field may also be named by its
    /// message type.
    fn field(&self, name: &str, allow_group_name: bool) -> Option<OptionField> {
        match self {
            MessageType::Standard(schema) => schema.field(name).map(OptionField::standard),
            MessageType::Dynamic(message) => {
                let field = message.get_field_by_name(name).or_else(|| {
                    if !allow_group_name {
                        return None;
                    }
                    message.fields().find(|field| {
                        field.is_group_like()
                            && matches!(field.kind(), Kind::Message(ty) if ty.name() == name)
                    })
                })?;
                Some(OptionField::dynamic(
                    field.name().to_owned(),
                    field.number(),
                    field.kind(),
                    field.field_descriptor_proto(),
                    field.is_list() || field.is_map(),
                    None,
                ))
            }
        }
    }
}

impl EnumType {
    fn value(&self, name: &str) -> Option<i32> {
        match self {
            EnumType::Standard(values) => values
                .iter()
                .find(|(value, _)| *value == name)
                .map(|&(_, number)| number),
            EnumType::Dynamic(enum_) => enum_.get_value_by_name(name).map(|value| value.number()),
        }
    }

    fn contains(&self, number: i32) -> bool {
        match self {
            EnumType::Standard(values) => values.iter().any(|&(_, value)| value == number),
            EnumType::Dynamic(enum_) => enum_.get_value(number).is_some(),
        }
    }
}

impl ValueType {
    fn name(&self) -> &'static str {
        match self {
            ValueType::Double => "double",
            ValueType::Float => "float",
            ValueType::Int32 => "int32",
            ValueType::Int64 => "int64",
            ValueType::Uint32 => "uint32",
            ValueType::Uint64 => "uint64",
            ValueType::Sint32 => "sint32",
            ValueType::Sint64 => "sint64",
            ValueType::Fixed32 => "fixed32",
            ValueType::Fixed64 => "fixed64",
            ValueType::Sfixed32 => "sfixed32",
            ValueType::Sfixed64 => "sfixed64",
            ValueType::Bool => "bool",
            ValueType::String => "string",
            ValueType::Bytes => "bytes",
            ValueType::Enum(_) => "enum",
            ValueType::Message(_) | ValueType::Group(_) => "message",
            ValueType::Unresolved => "unknown",
        }
    }
}

impl OptionField {
    fn standard(schema: &'static FieldSchema) -> Self {
        OptionField {
            name: schema.name.to_owned(),
            number: schema.number,
            ty: match schema.ty {
                SchemaType::Bool => ValueType::Bool,
                SchemaType::Int32 => ValueType::Int32,
                SchemaType::String => ValueType::String,
                SchemaType::Enum(values) => ValueType::Enum(EnumType::Standard(values)),
                SchemaType::Message(schema) => ValueType::Message(MessageType::Standard(schema)),
            },
            repeated: schema.repeated,
            extension: None,
            feature_support: None,
        }
    }

    fn dynamic(
        name: String,
        number: u32,
        kind: Kind,
        proto: &FieldDescriptorProto,
        repeated: bool,
        extension: Option<ExtensionDescriptor>,
    ) -> Self {
        let ty = match kind {
            Kind::Double => ValueType::Double,
            Kind::Float => ValueType::Float,
            Kind::Int32 => ValueType::Int32,
            Kind::Int64 => ValueType::Int64,
            Kind::Uint32 => ValueType::Uint32,
            Kind::Uint64 => ValueType::Uint64,
            Kind::Sint32 => ValueType::Sint32,
            Kind::Sint64 => ValueType::Sint64,
            Kind::Fixed32 => ValueType::Fixed32,
            Kind::Fixed64 => ValueType::Fixed64,
            Kind::Sfixed32 => ValueType::Sfixed32,
            Kind::Sfixed64 => ValueType::Sfixed64,
            Kind::Bool => ValueType::Bool,
            Kind::String => ValueType::String,
            Kind::Bytes => ValueType::Bytes,
            Kind::Message(message) if proto.r#type() == Type::Group => {
                ValueType::Group(MessageType::Dynamic(message))
            }
            Kind::Message(message) => ValueType::Message(MessageType::Dynamic(message)),
            Kind::Enum(enum_) => ValueType::Enum(EnumType::Dynamic(enum_)),
            Kind::Unresolved(_) => ValueType::Unresolved,
        };

        OptionField {
            name,
            number,
            ty,
            repeated,
            extension,
            feature_support: proto
                .options
                .as_ref()
                .and_then(|options| options.feature_support.clone()),
        }
    }
}

fn uninterpreted_value(option: &UninterpretedOption) -> Option<Value<'_>> {
    if let Some(ident) = &option.identifier_value {
        Some(Value::Ident {
            negative: false,
            ident,
        })
    } else if let Some(value) = option.positive_int_value {
        Some(Value::Int(value.into()))
    } else if let Some(value) = option.negative_int_value {
        Some(Value::Int(value.into()))
    } else if let Some(value) = option.double_value {
        Some(Value::Float(value))
    } else if let Some(value) = &option.string_value {
        Some(Value::String(value))
    } else {
        option
            .aggregate_value
            .as_deref()
            .map(Value::Aggregate)
    }
}

/// Returns `None` if the value is not an integer, or an error if it is out of range.
fn int_in_range(value: Value<'_>, name: &str, min: i64, max: u64) -> Option<Result<i128, CheckError>> {
    match value {
        Value::Int(value) if value >= i128::from(min) && value <= i128::from(max) => Some(Ok(value)),
        Value::Int(_) => Some(Err(CheckError::OptionIntegerOutOfRange {
            name: name.to_owned(),
            min,
            max,
        })),
        _ => None,
    }
}

fn float_value(value: Value<'_>) -> Option<f64> {
    match value {
        Value::Float(value) => Some(value),
        Value::Int(value) => Some(value as f64),
        Value::Ident { negative, ident } => {
            let value = match ident.to_ascii_lowercase().as_str() {
                "inf" | "infinity" => f64::INFINITY,
                "nan" => f64::NAN,
                _ => return None,
            };
            Some(if negative { -value } else { value })
        }
        _ => None,
    }
}

fn encode_bytes(number: u32, bytes: &[u8], buf: &mut Vec<u8>) {
    encode_key(number, WireType::LengthDelimited, buf);
    encode_varint(bytes.len() as u64, buf);
    buf.extend_from_slice(bytes);
}

/// Wraps the encoded body of a message in the key of `field`, using group encoding if needed.
fn wrap_message(field: &OptionField, body: Vec<u8>) -> Vec<u8> {
    let mut buf = Vec::with_capacity(body.len() + 8);
    if matches!(field.ty, ValueType::Group(_)) {
        encode_key(field.number, WireType::StartGroup, &mut buf);
        buf.extend(body);
        encode_key(field.number, WireType::EndGroup, &mut buf);
    } else {
        encode_bytes(field.number, &body, &mut buf);
    }
    buf
}

/// Formats an option name as written, e.g. `(foo.bar).baz`.
pub(crate) fn option_name(option: &UninterpretedOption) -> String {
    option_name_prefix(option, option.name.len())
}

fn option_name_prefix(option: &UninterpretedOption, len: usize) -> String {
    let mut name = String::new();
    for (i, part) in option.name.iter().take(len).enumerate() {
        if i > 0 {
            name.push('.');
        }
        if part.is_extension {
            name.push('(');
            name.push_str(&part.name_part);
            name.push(')');
        } else {
            name.push_str(&part.name_part);
        }
    }
    name
}

fn join(path: &[i32], rest: &[i32]) -> Vec<i32> {
    let mut result = Vec::with_capacity(path.len() + rest.len());
    result.extend_from_slice(path);
    result.extend_from_slice(rest);
    result
}
