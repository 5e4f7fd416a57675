//! The fields of the standard options messages which can be set by option statements.

pub(crate) struct MessageSchema {
    pub name: &'static str,
    pub fields: &'static [FieldSchema],
}

pub(crate) struct FieldSchema {
    pub name: &'static str,
    pub number: u32,
    pub ty: SchemaType,
    pub repeated: bool,
}

#[derive(Clone, Copy)]
pub(crate) enum SchemaType {
    Bool,
    Int32,
    String,
    Enum(&'static [(&'static str, i32)]),
    Message(&'static MessageSchema),
}

impl MessageSchema {
    pub fn field(&self, name: &str) -> Option<&'static FieldSchema> {
        // The schemas are statics, so the fields outlive `self`.
        let fields: &'static [FieldSchema] = self.fields;
        fields.iter().find(|field| field.name == name)
    }
}

const fn field(name: &'static str, number: u32, ty: SchemaType) -> FieldSchema {
    FieldSchema {
        name,
        number,
        ty,
        repeated: false,
    }
}

const fn repeated(name: &'static str, number: u32, ty: SchemaType) -> FieldSchema {
    FieldSchema {
        name,
        number,
        ty,
        repeated: true,
    }
}

use SchemaType::{Bool, Int32, String};

const EDITION: SchemaType = SchemaType::Enum(&[
    ("EDITION_UNKNOWN", 0),
    ("EDITION_LEGACY", 900),
    ("EDITION_PROTO2", 998),
    ("EDITION_PROTO3", 999),
    ("EDITION_2023", 1000),
    ("EDITION_2024", 1001),
]);

pub(crate) static FEATURE_SET: MessageSchema = MessageSchema {
    name: "google.protobuf.FeatureSet",
    fields: &[
        field(
            "field_presence",
            1,
            SchemaType::Enum(&[
                ("FIELD_PRESENCE_UNKNOWN", 0),
                ("EXPLICIT", 1),
                ("IMPLICIT", 2),
                ("LEGACY_REQUIRED", 3),
            ]),
        ),
        field(
            "enum_type",
            2,
            SchemaType::Enum(&[("ENUM_TYPE_UNKNOWN", 0), ("OPEN", 1), ("CLOSED", 2)]),
        ),
        field(
            "repeated_field_encoding",
            3,
            SchemaType::Enum(&[
                ("REPEATED_FIELD_ENCODING_UNKNOWN", 0),
                ("PACKED", 1),
                ("EXPANDED", 2),
            ]),
        ),
        field(
            "utf8_validation",
            4,
            SchemaType::Enum(&[("UTF8_VALIDATION_UNKNOWN", 0), ("VERIFY", 2), ("NONE", 3)]),
        ),
        field(
            "message_encoding",
            5,
            SchemaType::Enum(&[
                ("MESSAGE_ENCODING_UNKNOWN", 0),
                ("LENGTH_PREFIXED", 1),
                ("DELIMITED", 2),
            ]),
        ),
        field(
            "json_format",
            6,
            SchemaType::Enum(&[
                ("JSON_FORMAT_UNKNOWN", 0),
                ("ALLOW", 1),
                ("LEGACY_BEST_EFFORT", 2),
            ]),
        ),
        field(
            "enforce_naming_style",
            7,
            SchemaType::Enum(&[
                ("ENFORCE_NAMING_STYLE_UNKNOWN", 0),
                ("STYLE2024", 1),
                ("STYLE_LEGACY", 2),
            ]),
        ),
    ],
};

static DECLARATION: MessageSchema = MessageSchema {
    name: "google.protobuf.ExtensionRangeOptions.Declaration",
    fields: &[
        field("number", 1, Int32),
        field("full_name", 2, String),
        field("type", 3, String),
        field("reserved", 5, Bool),
        field("repeated", 6, Bool),
    ],
};

static EDITION_DEFAULT: MessageSchema = MessageSchema {
    name: "google.protobuf.FieldOptions.EditionDefault",
    fields: &[field("edition", 3, EDITION), field("value", 2, String)],
};

static FEATURE_SUPPORT: MessageSchema = MessageSchema {
    name: "google.protobuf.FieldOptions.FeatureSupport",
    fields: &[
        field("edition_introduced", 1, EDITION),
        field("edition_deprecated", 2, EDITION),
        field("deprecation_warning", 3, String),
        field("edition_removed", 4, EDITION),
    ],
};

pub(crate) static FILE_OPTIONS: MessageSchema = MessageSchema {
    name: "google.protobuf.FileOptions",
    fields: &[
        field("java_package", 1, String),
        field("java_outer_classname", 8, String),
        field("java_multiple_files", 10, Bool),
        field("java_string_check_utf8", 27, Bool),
        field(
            "optimize_for",
            9,
            SchemaType::Enum(&[("SPEED", 1), ("CODE_SIZE", 2), ("LITE_RUNTIME", 3)]),
        ),
        field("go_package", 11, String),
        field("cc_generic_services", 16, Bool),
        field("java_generic_services", 17, Bool),
        field("py_generic_services", 18, Bool),
        field("deprecated", 23, Bool),
        field("cc_enable_arenas", 31, Bool),
        field("objc_class_prefix", 36, String),
        field("csharp_namespace", 37, String),
        field("swift_prefix", 39, String),
        field("php_class_prefix", 40, String),
        field("php_namespace", 41, String),
        field("php_metadata_namespace", 44, String),
        field("ruby_package", 45, String),
        field("features", 50, SchemaType::Message(&FEATURE_SET)),
    ],
};

pub(crate) static MESSAGE_OPTIONS: MessageSchema = MessageSchema {
    name: "google.protobuf.MessageOptions",
    fields: &[
        field("message_set_wire_format", 1, Bool),
        field("no_standard_descriptor_accessor", 2, Bool),
        field("deprecated", 3, Bool),
        field("map_entry", 7, Bool),
        field("deprecated_legacy_json_field_conflicts", 11, Bool),
        field("features", 12, SchemaType::Message(&FEATURE_SET)),
    ],
};

pub(crate) static FIELD_OPTIONS: MessageSchema = MessageSchema {
    name: "google.protobuf.FieldOptions",
    fields: &[
        field(
            "ctype",
            1,
            SchemaType::Enum(&[("STRING", 0), ("CORD", 1), ("STRING_PIECE", 2)]),
        ),
        field("packed", 2, Bool),
        field(
            "jstype",
            6,
            SchemaType::Enum(&[("JS_NORMAL", 0), ("JS_STRING", 1), ("JS_NUMBER", 2)]),
        ),
        field("lazy", 5, Bool),
        field("unverified_lazy", 15, Bool),
        field("deprecated", 3, Bool),
        field("weak", 10, Bool),
        field("debug_redact", 16, Bool),
        field(
            "retention",
            17,
            SchemaType::Enum(&[
                ("RETENTION_UNKNOWN", 0),
                ("RETENTION_RUNTIME", 1),
                ("RETENTION_SOURCE", 2),
            ]),
        ),
        repeated(
            "targets",
            19,
            SchemaType::Enum(&[
                ("TARGET_TYPE_UNKNOWN", 0),
                ("TARGET_TYPE_FILE", 1),
                ("TARGET_TYPE_EXTENSION_RANGE", 2),
                ("TARGET_TYPE_MESSAGE", 3),
                ("TARGET_TYPE_FIELD", 4),
                ("TARGET_TYPE_ONEOF", 5),
                ("TARGET_TYPE_ENUM", 6),
                ("TARGET_TYPE_ENUM_ENTRY", 7),
                ("TARGET_TYPE_SERVICE", 8),
                ("TARGET_TYPE_METHOD", 9),
            ]),
        ),
        repeated(
            "edition_defaults",
            20,
            SchemaType::Message(&EDITION_DEFAULT),
        ),
        field("features", 21, SchemaType::Message(&FEATURE_SET)),
        field("feature_support", 22, SchemaType::Message(&FEATURE_SUPPORT)),
    ],
};

pub(crate) static ONEOF_OPTIONS: MessageSchema = MessageSchema {
    name: "google.protobuf.OneofOptions",
    fields: &[field("features", 1, SchemaType::Message(&FEATURE_SET))],
};

pub(crate) static ENUM_OPTIONS: MessageSchema = MessageSchema {
    name: "google.protobuf.EnumOptions",
    fields: &[
        field("allow_alias", 2, Bool),
        field("deprecated", 3, Bool),
        field("deprecated_legacy_json_field_conflicts", 6, Bool),
        field("features", 7, SchemaType::Message(&FEATURE_SET)),
    ],
};

pub(crate) static ENUM_VALUE_OPTIONS: MessageSchema = MessageSchema {
    name: "google.protobuf.EnumValueOptions",
    fields: &[
        field("deprecated", 1, Bool),
        field("features", 2, SchemaType::Message(&FEATURE_SET)),
        field("debug_redact", 3, Bool),
    ],
};

pub(crate) static SERVICE_OPTIONS: MessageSchema = MessageSchema {
    name: "google.protobuf.ServiceOptions",
    fields: &[
        field("features", 34, SchemaType::Message(&FEATURE_SET)),
        field("deprecated", 33, Bool),
    ],
};

pub(crate) static METHOD_OPTIONS: MessageSchema = MessageSchema {
    name: "google.protobuf.MethodOptions",
    fields: &[
        field("deprecated", 33, Bool),
        field(
            "idempotency_level",
            34,
            SchemaType::Enum(&[
                ("IDEMPOTENCY_UNKNOWN", 0),
                ("NO_SIDE_EFFECTS", 1),
                ("IDEMPOTENT", 2),
            ]),
        ),
        field("features", 35, SchemaType::Message(&FEATURE_SET)),
    ],
};

pub(crate) static EXTENSION_RANGE_OPTIONS: MessageSchema = MessageSchema {
    name: "google.protobuf.ExtensionRangeOptions",
    fields: &[
        repeated("declaration", 2, SchemaType::Message(&DECLARATION)),
        field(
            "verification",
            3,
            SchemaType::Enum(&[("DECLARATION", 0), ("UNVERIFIED", 1)]),
        ),
        field("features", 50, SchemaType::Message(&FEATURE_SET)),
    ],
};
