use std::collections::{hash_map, HashMap, HashSet};

use super::{join, kind_name, overlaps, Context};
use crate::{
    case::to_json_name,
    descriptor::{FieldDescriptor, Kind, MessageDescriptor},
    diagnostic::{CheckError, Severity},
    index_to_i32, tag,
    types::{
        extension_range_options::VerificationState,
        feature_set::{FieldPresence, JsonFormat, MessageEncoding},
        field_descriptor_proto::{Label, Type},
        field_options::OptionTargetType,
        DescriptorProto, FeatureSet, FieldDescriptorProto,
    },
    Error, MAX_MESSAGE_FIELD_NUMBER,
};

/// The checks shared by message fields and extensions.
pub(super) struct FieldCheck<'f> {
    pub proto: &'f FieldDescriptorProto,
    pub kind: Kind,
    pub features: FeatureSet,
    pub path: &'f [i32],
    pub is_extension: bool,
    pub in_oneof: bool,
    pub max_number: i32,
}

/// A range of numbers in a message, for overlap checks.
struct NumberRange {
    description: String,
    range: (i64, i64),
    path: Vec<i32>,
}

impl<'a> Context<'a> {
    pub(super) fn check_message(&mut self, message: &MessageDescriptor) -> Result<(), Error> {
        let proto = message.descriptor_proto();
        let path = message.path();
        let options = proto.options.as_ref();

        self.check_features(
            options.and_then(|options| options.features.as_ref()),
            OptionTargetType::TargetTypeMessage,
            &join(path, &[tag::message::OPTIONS, 12]),
        )?;

        let is_message_set = options.map_or(false, |options| options.message_set_wire_format());
        let max_number = if is_message_set {
            i32::MAX
        } else {
            MAX_MESSAGE_FIELD_NUMBER
        };

        let (reserved, extensions) = self.check_ranges(proto, path, max_number)?;
        self.check_field_numbers(message, &reserved, &extensions, max_number)?;
        self.check_json_names(message)?;

        for field in message.fields() {
            self.check_field(&field, max_number)?;
        }
        self.check_oneofs(message)?;

        if message.is_map_entry() {
            self.check_map_entry(message)?;
        }
        if is_message_set {
            let reason = if self.is_proto3() {
                Some("are not supported in proto3")
            } else if !proto.field.is_empty() {
                Some("cannot have fields")
            } else if proto.extension_range.is_empty() {
                Some("must have at least one extension range")
            } else {
                None
            };
            if let Some(reason) = reason {
                self.error(
                    CheckError::InvalidMessageSet { reason },
                    &join(path, &[tag::message::OPTIONS, 1]),
                )?;
            }
        }

        for (i, range) in proto.extension_range.iter().enumerate() {
            let range_path = join(path, &[tag::message::EXTENSION_RANGE, index_to_i32(i)]);
            let options = match &range.options {
                Some(options) => options,
                None => continue,
            };
            self.check_features(
                options.features.as_ref(),
                OptionTargetType::TargetTypeExtensionRange,
                &join(&range_path, &[tag::message::extension_range::OPTIONS, 50]),
            )?;
            self.check_declarations(
                range.start(),
                range.end(),
                options.declaration.as_slice(),
                options.verification.map(|_| options.verification()),
                &range_path,
            )?;
        }

        Ok(())
    }

    fn check_ranges(
        &mut self,
        proto: &DescriptorProto,
        path: &[i32],
        max_number: i32,
    ) -> Result<(Vec<NumberRange>, Vec<NumberRange>), Error> {
        let mut reserved = Vec::new();
        for (i, range) in proto.reserved_range.iter().enumerate() {
            let (start, end) = match (range.start, range.end) {
                (Some(start), Some(end)) => (i64::from(start), i64::from(end) - 1),
                _ => continue,
            };
            let range_path = join(path, &[tag::message::RESERVED_RANGE, index_to_i32(i)]);
            if let Some(range) = self.check_range("reserved", start, end, max_number, range_path)? {
                reserved.push(range);
            }
        }

        let mut extensions = Vec::new();
        for (i, range) in proto.extension_range.iter().enumerate() {
            let (start, end) = match (range.start, range.end) {
                (Some(start), Some(end)) => (i64::from(start), i64::from(end) - 1),
                _ => continue,
            };
            let range_path = join(path, &[tag::message::EXTENSION_RANGE, index_to_i32(i)]);
            if let Some(range) = self.check_range("extension", start, end, max_number, range_path)? {
                extensions.push(range);
            }
        }

        let all: Vec<&NumberRange> = reserved.iter().chain(&extensions).collect();
        for (j, second) in all.iter().enumerate() {
            for first in &all[..j] {
                if overlaps(first.range, second.range) {
                    self.error(
                        CheckError::Overlap {
                            first: first.description.clone(),
                            second: second.description.clone(),
                        },
                        &second.path,
                    )?;
                }
            }
        }

        Ok((reserved, extensions))
    }

    fn check_range(
        &mut self,
        kind: &'static str,
        start: i64,
        end: i64,
        max_number: i32,
        path: Vec<i32>,
    ) -> Result<Option<NumberRange>, Error> {
        if start < 1 || end < start || end > i64::from(max_number) {
            self.error(CheckError::InvalidRange { kind, start, end }, &path)?;
            return Ok(None);
        }

        let description = if start == end {
            format!("{} number {}", kind, start)
        } else {
            format!("{} range {} to {}", kind, start, end)
        };
        Ok(Some(NumberRange {
            description,
            range: (start, end),
            path,
        }))
    }

    fn check_field_numbers(
        &mut self,
        message: &MessageDescriptor,
        reserved: &[NumberRange],
        extensions: &[NumberRange],
        max_number: i32,
    ) -> Result<(), Error> {
        let proto = message.descriptor_proto();
        let mut numbers: HashMap<i32, String> = HashMap::new();

        for field in message.fields() {
            let field_proto = field.field_descriptor_proto();
            let number = match field_proto.number {
                Some(number) if (1..=max_number).contains(&number) => number,
                _ => continue,
            };
            let number_path = join(field.path(), &[tag::field::NUMBER]);

            match numbers.entry(number) {
                hash_map::Entry::Occupied(first) => {
                    self.error(
                        CheckError::DuplicateFieldNumber {
                            name: field.name().to_owned(),
                            number,
                            first: first.get().clone(),
                        },
                        &number_path,
                    )?;
                }
                hash_map::Entry::Vacant(entry) => {
                    entry.insert(field.name().to_owned());
                }
            }

            for range in reserved.iter().chain(extensions) {
                if overlaps(range.range, (i64::from(number), i64::from(number))) {
                    self.error(
                        CheckError::Overlap {
                            first: range.description.clone(),
                            second: format!("field '{}' (number {})", field.name(), number),
                        },
                        &number_path,
                    )?;
                }
            }

            if proto.reserved_name.iter().any(|name| name == field.name()) {
                self.error(
                    CheckError::ReservedFieldName {
                        name: field.name().to_owned(),
                    },
                    &join(field.path(), &[tag::field::NAME]),
                )?;
            }
        }

        Ok(())
    }

    /// Fields may not share a JSON name, whether it is derived from the field name or set
    /// explicitly.
    fn check_json_names(&mut self, message: &MessageDescriptor) -> Result<(), Error> {
        let proto = message.descriptor_proto();
        if message.is_map_entry()
            || proto
                .options
                .as_ref()
                .map_or(false, |options| options.deprecated_legacy_json_field_conflicts())
        {
            return Ok(());
        }
        let severity = match message.features().json_format() {
            JsonFormat::Allow => Severity::Error,
            _ => Severity::Warning,
        };

        let mut seen: HashMap<String, String> = HashMap::new();
        let mut reported: HashSet<(String, String)> = HashSet::new();
        for field in message.fields() {
            let field_proto = field.field_descriptor_proto();
            let default = to_json_name(field.name());
            let custom = field_proto
                .json_name
                .as_ref()
                .filter(|json_name| **json_name != default);

            let mut names = vec![(default.clone(), tag::field::NAME)];
            if let Some(custom) = custom {
                names.push((custom.clone(), tag::field::JSON_NAME));
            }

            for (json_name, tag) in names {
                match seen.get(&json_name) {
                    Some(first) => {
                        if first != field.name()
                            && reported.insert((first.clone(), field.name().to_owned()))
                        {
                            let err = CheckError::JsonNameConflict {
                                name: field.name().to_owned(),
                                json_name,
                                first: first.clone(),
                            };
                            self.report(severity, err, &join(field.path(), &[tag]))?;
                        }
                    }
                    None => {
                        seen.insert(json_name, field.name().to_owned());
                    }
                }
            }
        }

        Ok(())
    }

    fn check_field(&mut self, field: &FieldDescriptor, max_number: i32) -> Result<(), Error> {
        let proto = field.field_descriptor_proto();
        let kind = field.kind();

        if self.is_proto3() {
            if let Kind::Enum(enum_) = &kind {
                if enum_.is_closed() {
                    self.error(
                        CheckError::ClosedEnumInProto3 {
                            name: field.name().to_owned(),
                            enum_name: enum_.full_name().to_owned(),
                        },
                        &join(field.path(), &[tag::field::TYPE_NAME]),
                    )?;
                }
            }
        }

        self.check_field_common(FieldCheck {
            proto,
            kind,
            features: field.features(),
            path: field.path(),
            is_extension: false,
            in_oneof: field.containing_oneof().is_some(),
            max_number,
        })
    }

    pub(super) fn check_field_common(&mut self, field: FieldCheck<'_>) -> Result<(), Error> {
        let FieldCheck {
            proto,
            kind,
            features,
            path,
            is_extension,
            in_oneof,
            max_number,
        } = field;

        if let Some(number) = proto.number {
            let number_path = join(path, &[tag::field::NUMBER]);
            if number < 1 || number > max_number {
                self.error(
                    CheckError::InvalidFieldNumber {
                        number: number.into(),
                    },
                    &number_path,
                )?;
            } else if (19_000..=19_999).contains(&number) {
                self.error(CheckError::ReservedImplementationNumber { number }, &number_path)?;
            }
        }

        if proto.label() == Label::Required {
            let label_path = join(path, &[tag::field::LABEL]);
            if is_extension {
                self.error(CheckError::RequiredExtension, &label_path)?;
            } else if self.is_proto3() {
                self.error(
                    CheckError::LabelNotAllowed {
                        label: "required",
                        syntax: "proto3",
                        help: None,
                    },
                    &label_path,
                )?;
            } else if self.is_editions() {
                self.error(
                    CheckError::LabelNotAllowed {
                        label: "required",
                        syntax: "editions",
                        help: Some("use `option features.field_presence = LEGACY_REQUIRED;` instead"),
                    },
                    &label_path,
                )?;
            }
        }

        if proto.r#type() == Type::Group {
            let help = if self.is_editions() {
                Some("use a message field with `features.message_encoding = DELIMITED` instead")
            } else {
                None
            };
            if self.is_proto3() || self.is_editions() {
                let syntax = self.syntax_name();
                self.error(
                    CheckError::GroupNotAllowed { syntax, help },
                    &join(path, &[tag::field::TYPE]),
                )?;
            }
        }

        if let Some(value) = &proto.default_value {
            self.check_default_value(proto, &kind, &features, value, path, in_oneof)?;
        }

        let options = proto.options.as_ref();
        let is_repeated = proto.label() == Label::Repeated;
        let is_message = matches!(kind, Kind::Message(_));

        if options.map_or(false, |options| options.packed.is_some())
            && (!is_repeated || !is_packable(proto.r#type()))
        {
            self.error(CheckError::InvalidPacked, &join(path, &[tag::field::OPTIONS, 2]))?;
        }

        if options.map_or(false, |options| options.lazy() || options.unverified_lazy()) {
            let delimited = proto.r#type() == Type::Group
                || features.message_encoding() == MessageEncoding::Delimited;
            if !is_message || delimited {
                self.error(CheckError::InvalidLazy, &join(path, &[tag::field::OPTIONS]))?;
            }
        }

        let features_path = join(path, &[tag::field::OPTIONS, 21]);
        self.check_features(
            options.and_then(|options| options.features.as_ref()),
            OptionTargetType::TargetTypeField,
            &features_path,
        )?;
        self.check_field_features(proto, is_extension, in_oneof, &features_path)
    }

    fn check_default_value(
        &mut self,
        proto: &FieldDescriptorProto,
        kind: &Kind,
        features: &FeatureSet,
        value: &str,
        path: &[i32],
        in_oneof: bool,
    ) -> Result<(), Error> {
        let default_path = join(path, &[tag::field::DEFAULT_VALUE]);
        if self.is_proto3() {
            return self.error(
                CheckError::DefaultValueNotAllowed { syntax: "proto3" },
                &default_path,
            );
        }

        let target = if proto.label() == Label::Repeated {
            Some("repeated")
        } else if matches!(kind, Kind::Message(_)) || proto.r#type() == Type::Group {
            Some("message")
        } else if self.is_editions()
            && !in_oneof
            && features.field_presence() == FieldPresence::Implicit
        {
            Some("implicit presence")
        } else {
            None
        };
        if let Some(kind) = target {
            return self.error(CheckError::InvalidDefaultTarget { kind }, &default_path);
        }

        if !is_valid_default(kind, value) {
            self.error(
                CheckError::InvalidDefaultValue {
                    value: value.to_owned(),
                    ty: kind_name(kind),
                },
                &default_path,
            )?;
        }
        Ok(())
    }

    fn check_oneofs(&mut self, message: &MessageDescriptor) -> Result<(), Error> {
        for oneof in message.oneofs() {
            self.check_features(
                oneof
                    .descriptor_proto()
                    .options
                    .as_ref()
                    .and_then(|options| options.features.as_ref()),
                OptionTargetType::TargetTypeOneof,
                &join(oneof.path(), &[tag::oneof::OPTIONS, 1]),
            )?;

            if oneof.fields().len() == 0 {
                self.error(
                    CheckError::EmptyOneof {
                        name: oneof.name().to_owned(),
                    },
                    &join(oneof.path(), &[tag::oneof::NAME]),
                )?;
            }
        }

        for field in message.fields() {
            let proto = field.field_descriptor_proto();
            if !proto.proto3_optional() {
                continue;
            }
            let valid = proto.label() == Label::Optional
                && field
                    .containing_oneof()
                    .map_or(false, |oneof| oneof.fields().len() == 1);
            if !valid {
                self.error(
                    CheckError::InvalidProto3Optional {
                        name: field.name().to_owned(),
                    },
                    &join(field.path(), &[tag::field::NAME]),
                )?;
            }
        }

        Ok(())
    }

    fn check_map_entry(&mut self, message: &MessageDescriptor) -> Result<(), Error> {
        let proto = message.descriptor_proto();
        let reason = if !message.name().ends_with("Entry") {
            Some("the name must end with 'Entry'")
        } else if !proto.nested_type.is_empty()
            || !proto.enum_type.is_empty()
            || !proto.extension.is_empty()
            || !proto.extension_range.is_empty()
            || !proto.oneof_decl.is_empty()
        {
            Some("map entries may only contain fields")
        } else if !is_map_entry_field(proto.field.first(), "key", 1)
            || !is_map_entry_field(proto.field.get(1), "value", 2)
            || proto.field.len() != 2
        {
            Some("map entries must have exactly the fields 'key = 1' and 'value = 2'")
        } else {
            None
        };
        if let Some(reason) = reason {
            return self.error(
                CheckError::InvalidMapEntry {
                    name: message.full_name().to_owned(),
                    reason,
                },
                &join(message.path(), &[tag::message::NAME]),
            );
        }

        // Keys written as `map<K, V>` were checked when lowering the declaration.
        if !self.from_source {
            if let Some(key) = message.fields().next() {
                let kind = key.kind();
                let valid = !matches!(
                    kind,
                    Kind::Double | Kind::Float | Kind::Bytes | Kind::Message(_) | Kind::Enum(_)
                );
                if !valid {
                    self.error(
                        CheckError::InvalidMapKey {
                            ty: kind_name(&kind),
                        },
                        &join(key.path(), &[tag::field::TYPE]),
                    )?;
                }
            }
        }

        Ok(())
    }

    fn check_declarations(
        &mut self,
        start: i32,
        end: i32,
        declarations: &[crate::types::extension_range_options::Declaration],
        verification: Option<VerificationState>,
        range_path: &[i32],
    ) -> Result<(), Error> {
        if declarations.is_empty() {
            return Ok(());
        }

        let mut numbers = HashSet::new();
        let mut names = HashSet::new();
        for (k, declaration) in declarations.iter().enumerate() {
            let path = join(
                range_path,
                &[
                    tag::message::extension_range::OPTIONS,
                    tag::extension_range_options::DECLARATION,
                    index_to_i32(k),
                ],
            );
            let number = declaration.number();

            let mut reasons = Vec::new();
            if number < start || number >= end {
                reasons.push("the number is outside of the extension range");
            }
            if !numbers.insert(number) {
                reasons.push("the number is declared more than once");
            }
            if let Some(full_name) = &declaration.full_name {
                if !full_name.starts_with('.') {
                    reasons.push("the full name must start with a '.'");
                } else if !names.insert(full_name.as_str()) {
                    reasons.push("the full name is declared more than once");
                }
            }
            if !declaration.reserved() {
                if declaration.full_name.is_none() {
                    reasons.push("the full name must be set unless the declaration is reserved");
                }
                if declaration.r#type.is_none() {
                    reasons.push("the type must be set unless the declaration is reserved");
                }
            }

            for reason in reasons {
                self.error(
                    CheckError::InvalidExtensionDeclaration {
                        number,
                        reason: reason.to_owned(),
                    },
                    &path,
                )?;
            }
        }

        if verification == Some(VerificationState::Unverified) {
            self.error(
                CheckError::InvalidExtensionDeclaration {
                    number: declarations[0].number(),
                    reason: "a range with declarations cannot be marked as unverified".to_owned(),
                },
                &join(range_path, &[tag::message::extension_range::OPTIONS, 3]),
            )?;
        }

        Ok(())
    }
}

fn is_map_entry_field(field: Option<&FieldDescriptorProto>, name: &str, number: i32) -> bool {
    match field {
        Some(field) => {
            field.name() == name && field.number() == number && field.label() == Label::Optional
        }
        None => false,
    }
}

fn is_packable(ty: Type) -> bool {
    !matches!(ty, Type::String | Type::Bytes | Type::Message | Type::Group)
}

fn is_valid_default(kind: &Kind, value: &str) -> bool {
    match kind {
        Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => value.parse::<i32>().is_ok(),
        Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => value.parse::<i64>().is_ok(),
        Kind::Uint32 | Kind::Fixed32 => value.parse::<u32>().is_ok(),
        Kind::Uint64 | Kind::Fixed64 => value.parse::<u64>().is_ok(),
        Kind::Float | Kind::Double => {
            matches!(value, "inf" | "-inf" | "nan") || value.parse::<f64>().is_ok()
        }
        Kind::Bool => matches!(value, "true" | "false"),
        Kind::String | Kind::Bytes => true,
        Kind::Enum(enum_) => enum_.get_value_by_name(value).is_some(),
        Kind::Message(_) | Kind::Unresolved(_) => true,
    }
}
