//! Edition defaults, inheritance and lifetimes of the standard features.

use crate::types::{
    feature_set::{
        EnforceNamingStyle, EnumType, FieldPresence, JsonFormat, MessageEncoding,
        RepeatedFieldEncoding, Utf8Validation,
    },
    field_options::{FeatureSupport, OptionTargetType},
    Edition, FeatureSet,
};

/// The editions which can be compiled, in order.
pub(crate) const SUPPORTED_EDITIONS: &[Edition] =
    &[Edition::Proto2, Edition::Proto3, Edition::Edition2023];

pub(crate) fn edition_defaults(edition: Edition) -> FeatureSet {
    match edition {
        Edition::Proto3 => FeatureSet {
            field_presence: Some(FieldPresence::Implicit as i32),
            enum_type: Some(EnumType::Open as i32),
            repeated_field_encoding: Some(RepeatedFieldEncoding::Packed as i32),
            utf8_validation: Some(Utf8Validation::Verify as i32),
            message_encoding: Some(MessageEncoding::LengthPrefixed as i32),
            json_format: Some(JsonFormat::Allow as i32),
            enforce_naming_style: Some(EnforceNamingStyle::StyleLegacy as i32),
        },
        Edition::Edition2023 | Edition::Edition2024 => FeatureSet {
            field_presence: Some(FieldPresence::Explicit as i32),
            enum_type: Some(EnumType::Open as i32),
            repeated_field_encoding: Some(RepeatedFieldEncoding::Packed as i32),
            utf8_validation: Some(Utf8Validation::Verify as i32),
            message_encoding: Some(MessageEncoding::LengthPrefixed as i32),
            json_format: Some(JsonFormat::Allow as i32),
            enforce_naming_style: Some(EnforceNamingStyle::StyleLegacy as i32),
        },
        _ => FeatureSet {
            field_presence: Some(FieldPresence::Explicit as i32),
            enum_type: Some(EnumType::Closed as i32),
            repeated_field_encoding: Some(RepeatedFieldEncoding::Expanded as i32),
            utf8_validation: Some(Utf8Validation::None as i32),
            message_encoding: Some(MessageEncoding::LengthPrefixed as i32),
            json_format: Some(JsonFormat::LegacyBestEffort as i32),
            enforce_naming_style: Some(EnforceNamingStyle::StyleLegacy as i32),
        },
    }
}

/// Overrides the values in `base` with every value explicitly set in `overrides`.
pub(crate) fn merge(base: &mut FeatureSet, overrides: &FeatureSet) {
    fn set(base: &mut Option<i32>, value: Option<i32>) {
        if let Some(value) = value.filter(|&value| value != 0) {
            *base = Some(value);
        }
    }

    set(&mut base.field_presence, overrides.field_presence);
    set(&mut base.enum_type, overrides.enum_type);
    set(
        &mut base.repeated_field_encoding,
        overrides.repeated_field_encoding,
    );
    set(&mut base.utf8_validation, overrides.utf8_validation);
    set(&mut base.message_encoding, overrides.message_encoding);
    set(&mut base.json_format, overrides.json_format);
    set(&mut base.enforce_naming_style, overrides.enforce_naming_style);
}

pub(crate) fn edition_name(edition: Edition) -> &'static str {
    match edition {
        Edition::Unknown => "UNKNOWN",
        Edition::Legacy => "LEGACY",
        Edition::Proto2 => "PROTO2",
        Edition::Proto3 => "PROTO3",
        Edition::Edition2023 => "2023",
        Edition::Edition2024 => "2024",
    }
}

/// A standard feature, with the editions it can be used in and the elements it can be set on.
#[derive(Debug)]
pub(crate) struct FeatureDef {
    pub name: &'static str,
    pub number: u32,
    pub introduced: Edition,
    pub deprecated: Option<(Edition, &'static str)>,
    pub removed: Option<Edition>,
    pub targets: &'static [OptionTargetType],
    pub invalid_target: &'static str,
}

pub(crate) static FEATURES: &[FeatureDef] = &[
    FeatureDef {
        name: "field_presence",
        number: 1,
        introduced: Edition::Edition2023,
        deprecated: None,
        removed: None,
        targets: &[
            OptionTargetType::TargetTypeField,
            OptionTargetType::TargetTypeFile,
        ],
        invalid_target: "the field_presence feature can only be set on fields and files",
    },
    FeatureDef {
        name: "enum_type",
        number: 2,
        introduced: Edition::Edition2023,
        deprecated: None,
        removed: None,
        targets: &[
            OptionTargetType::TargetTypeEnum,
            OptionTargetType::TargetTypeFile,
        ],
        invalid_target: "the enum_type feature can only be set on enums and files",
    },
    FeatureDef {
        name: "repeated_field_encoding",
        number: 3,
        introduced: Edition::Edition2023,
        deprecated: None,
        removed: None,
        targets: &[
            OptionTargetType::TargetTypeField,
            OptionTargetType::TargetTypeFile,
        ],
        invalid_target: "the repeated_field_encoding feature can only be set on fields and files",
    },
    FeatureDef {
        name: "utf8_validation",
        number: 4,
        introduced: Edition::Edition2023,
        deprecated: None,
        removed: None,
        targets: &[
            OptionTargetType::TargetTypeField,
            OptionTargetType::TargetTypeFile,
        ],
        invalid_target: "the utf8_validation feature can only be set on fields and files",
    },
    FeatureDef {
        name: "message_encoding",
        number: 5,
        introduced: Edition::Edition2023,
        deprecated: None,
        removed: None,
        targets: &[
            OptionTargetType::TargetTypeField,
            OptionTargetType::TargetTypeFile,
        ],
        invalid_target: "the message_encoding feature can only be set on fields and files",
    },
    FeatureDef {
        name: "json_format",
        number: 6,
        introduced: Edition::Edition2023,
        deprecated: None,
        removed: None,
        targets: &[
            OptionTargetType::TargetTypeMessage,
            OptionTargetType::TargetTypeEnum,
            OptionTargetType::TargetTypeFile,
        ],
        invalid_target: "the json_format feature can only be set on messages, enums and files",
    },
    FeatureDef {
        name: "enforce_naming_style",
        number: 7,
        introduced: Edition::Edition2024,
        deprecated: None,
        removed: None,
        targets: &[
            OptionTargetType::TargetTypeFile,
            OptionTargetType::TargetTypeExtensionRange,
            OptionTargetType::TargetTypeMessage,
            OptionTargetType::TargetTypeField,
            OptionTargetType::TargetTypeOneof,
            OptionTargetType::TargetTypeEnum,
            OptionTargetType::TargetTypeEnumEntry,
            OptionTargetType::TargetTypeService,
            OptionTargetType::TargetTypeMethod,
        ],
        invalid_target: "",
    },
];

pub(crate) fn feature_by_number(number: u32) -> Option<&'static FeatureDef> {
    FEATURES.iter().find(|feature| feature.number == number)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SupportProblem {
    NotIntroduced(Edition),
    Removed(Edition),
    Deprecated(Edition, String),
}

/// Checks whether something with the given lifetime may be used in `edition`.
pub(crate) fn check_support(
    introduced: Option<Edition>,
    deprecated: Option<(Edition, &str)>,
    removed: Option<Edition>,
    edition: Edition,
) -> Option<SupportProblem> {
    match (introduced, removed) {
        (Some(introduced), _) if edition < introduced => {
            Some(SupportProblem::NotIntroduced(introduced))
        }
        (_, Some(removed)) if edition >= removed => Some(SupportProblem::Removed(removed)),
        _ => match deprecated {
            Some((deprecated, warning)) if edition >= deprecated => {
                Some(SupportProblem::Deprecated(deprecated, warning.to_owned()))
            }
            _ => None,
        },
    }
}

impl FeatureDef {
    pub fn check(&self, edition: Edition) -> Option<SupportProblem> {
        check_support(Some(self.introduced), self.deprecated, self.removed, edition)
    }
}

/// Checks the lifetime declared by a custom feature's `feature_support` option.
pub(crate) fn check_feature_support(
    support: &FeatureSupport,
    edition: Edition,
) -> Option<SupportProblem> {
    let deprecation_warning = support.deprecation_warning();
    check_support(
        support.edition_introduced.map(|_| support.edition_introduced()),
        support
            .edition_deprecated
            .map(|_| (support.edition_deprecated(), deprecation_warning)),
        support.edition_removed.map(|_| support.edition_removed()),
        edition,
    )
}

/// The standard features explicitly set in a feature set, paired with their values.
pub(crate) fn set_features(set: &FeatureSet) -> impl Iterator<Item = (&'static FeatureDef, i32)> {
    [
        (1, set.field_presence),
        (2, set.enum_type),
        (3, set.repeated_field_encoding),
        (4, set.utf8_validation),
        (5, set.message_encoding),
        (6, set.json_format),
        (7, set.enforce_naming_style),
    ]
    .into_iter()
    .filter_map(|(number, value)| Some((feature_by_number(number)?, value?)))
}
