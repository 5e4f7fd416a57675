use parking_lot::Mutex;
use proptest::prelude::*;

use super::overlaps;
use crate::{
    diagnostic::{Diagnostic, Reporter, Severity},
    link::{link, LinkInput},
    symbols::SymbolTable,
    types::{
        descriptor_proto::{ExtensionRange, ReservedRange},
        enum_descriptor_proto::EnumReservedRange,
        extension_range_options::Declaration,
        feature_set::MessageEncoding,
        field_descriptor_proto::{Label, Type},
        DescriptorProto, Edition, EnumDescriptorProto, EnumOptions, EnumValueDescriptorProto,
        ExtensionRangeOptions, FeatureSet, FieldDescriptorProto, FieldOptions, FileDescriptorProto,
        FileOptions, MessageOptions,
    },
    Error,
};

#[derive(Default)]
struct Collect(Mutex<Vec<Diagnostic>>);

impl Reporter for Collect {
    fn error(&self, diagnostic: &Diagnostic) -> Result<(), Error> {
        self.0.lock().push(diagnostic.clone());
        Ok(())
    }

    fn warning(&self, diagnostic: &Diagnostic) {
        self.0.lock().push(diagnostic.clone());
    }
}

fn check(file: FileDescriptorProto) -> Vec<(Severity, String)> {
    let reporter = Collect::default();
    link(
        "test.proto",
        LinkInput::Descriptor(file),
        &[],
        &SymbolTable::new(),
        &reporter,
    )
    .unwrap();
    reporter
        .0
        .into_inner()
        .into_iter()
        .map(|diagnostic| (diagnostic.severity(), diagnostic.message()))
        .collect()
}

fn errors(file: FileDescriptorProto) -> Vec<String> {
    check(file)
        .into_iter()
        .filter(|(severity, _)| *severity == Severity::Error)
        .map(|(_, message)| message)
        .collect()
}

fn file(syntax: &str) -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some("test.proto".to_owned()),
        syntax: Some(syntax.to_owned()),
        ..Default::default()
    }
}

fn field(name: &str, number: i32, ty: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_owned()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(ty as i32),
        ..Default::default()
    }
}

fn editions() -> FileDescriptorProto {
    let mut proto = file("editions");
    proto.edition = Some(Edition::Edition2023 as i32);
    proto
}

fn message_field(name: &str, number: i32, type_name: &str) -> FieldDescriptorProto {
    let mut field = field(name, number, Type::Message);
    field.type_name = Some(type_name.to_owned());
    field
}

fn message(name: &str, fields: Vec<FieldDescriptorProto>) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_owned()),
        field: fields,
        ..Default::default()
    }
}

fn enum_(name: &str, values: &[(&str, i32)]) -> EnumDescriptorProto {
    EnumDescriptorProto {
        name: Some(name.to_owned()),
        value: values
            .iter()
            .map(|&(name, number)| EnumValueDescriptorProto {
                name: Some(name.to_owned()),
                number: Some(number),
                options: None,
            })
            .collect(),
        ..Default::default()
    }
}

#[test]
fn proto3_enum_first_value_not_zero() {
    let mut proto = file("proto3");
    proto.enum_type.push(enum_("Foo", &[("FIRST", 1)]));

    assert_eq!(
        errors(proto),
        vec!["enum Foo: proto3 requires that first value of enum have numeric value zero"]
    );
}

#[test]
fn proto2_enum_first_value_may_be_nonzero() {
    let mut proto = file("proto2");
    proto.enum_type.push(enum_("Foo", &[("FIRST", 1)]));

    assert_eq!(check(proto), vec![]);
}

#[test]
fn reserved_and_extension_ranges_overlap() {
    let mut proto = file("proto2");
    let mut foo = message("Foo", vec![]);
    foo.reserved_range.push(ReservedRange {
        start: Some(1),
        end: Some(6),
    });
    foo.extension_range.push(ExtensionRange {
        start: Some(5),
        end: Some(10),
        options: None,
    });
    proto.message_type.push(foo);

    assert_eq!(
        errors(proto),
        vec!["extension range 5 to 9 overlaps with reserved range 1 to 5"]
    );
}

#[test]
fn field_in_reserved_range() {
    let mut proto = file("proto2");
    let mut foo = message("Foo", vec![field("a", 3, Type::Int32)]);
    foo.reserved_range.push(ReservedRange {
        start: Some(1),
        end: Some(6),
    });
    foo.reserved_name.push("b".to_owned());
    proto.message_type.push(foo);

    assert_eq!(
        errors(proto),
        vec!["field 'a' (number 3) overlaps with reserved range 1 to 5"]
    );
}

#[test]
fn invalid_field_numbers() {
    let mut proto = file("proto2");
    proto.message_type.push(message(
        "Foo",
        vec![
            field("a", 1, Type::Int32),
            field("b", 1, Type::Int32),
            field("c", 19_001, Type::Int32),
            field("d", 0, Type::Int32),
        ],
    ));

    assert_eq!(
        errors(proto),
        vec![
            "field 'b' uses number 1, which is already used by field 'a'",
            "field number 19001 is in the range 19,000 to 19,999, which is reserved for the protobuf implementation",
            "field number 0 is out of range: must be between 1 and 536,870,911",
        ]
    );
}

#[test]
fn json_name_conflict_in_proto3() {
    let mut proto = file("proto3");
    proto.message_type.push(message(
        "Foo",
        vec![field("foo_bar", 1, Type::Int32), field("fooBar", 2, Type::Int32)],
    ));

    assert_eq!(
        check(proto),
        vec![(
            Severity::Error,
            "the JSON name of field 'fooBar' (\"fooBar\") conflicts with the JSON name of field 'foo_bar'"
                .to_owned()
        )]
    );
}

#[test]
fn json_name_conflict_in_proto2_is_a_warning() {
    let mut proto = file("proto2");
    proto.message_type.push(message(
        "Foo",
        vec![field("foo_bar", 1, Type::Int32), field("fooBar", 2, Type::Int32)],
    ));

    let diagnostics = check(proto);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].0, Severity::Warning);
}

#[test]
fn custom_json_name_conflicts_with_default() {
    let mut proto = file("proto3");
    let mut renamed = field("b", 2, Type::Int32);
    renamed.json_name = Some("a".to_owned());
    proto
        .message_type
        .push(message("Foo", vec![field("a", 1, Type::Int32), renamed]));

    assert_eq!(
        errors(proto),
        vec!["the JSON name of field 'b' (\"a\") conflicts with the JSON name of field 'a'"]
    );
}

#[test]
fn enum_values_conflict_in_camel_case() {
    let mut proto = file("proto3");
    proto
        .enum_type
        .push(enum_("Foo", &[("bar_baz", 0), ("BAR_BAZ", 1)]));

    assert_eq!(
        errors(proto),
        vec!["enum value 'BAR_BAZ' conflicts with 'bar_baz' after conversion to camel case (\"BarBaz\")"]
    );
}

#[test]
fn enum_aliases() {
    let mut proto = file("proto2");
    proto
        .enum_type
        .push(enum_("Foo", &[("A", 0), ("B", 0)]));
    let mut unused = enum_("Bar", &[("C", 0), ("D", 1)]);
    unused.options = Some(EnumOptions {
        allow_alias: Some(true),
        ..Default::default()
    });
    proto.enum_type.push(unused);

    assert_eq!(
        errors(proto),
        vec![
            "enum value 'B' uses number 0, which is already used by 'A'",
            "enum 'Bar' sets allow_alias but does not have any aliased values",
        ]
    );
}

#[test]
fn enum_reserved_values() {
    let mut proto = file("proto2");
    let mut foo = enum_("Foo", &[("A", 0), ("B", 2), ("C", 3)]);
    foo.reserved_range.push(EnumReservedRange {
        start: Some(2),
        end: Some(2),
    });
    foo.reserved_name.push("C".to_owned());
    proto.enum_type.push(foo);

    assert_eq!(
        errors(proto),
        vec![
            "enum value 'B' uses number 2, which is reserved",
            "enum value name 'C' is reserved",
        ]
    );
}

#[test]
fn required_is_not_allowed_in_proto3() {
    let mut proto = file("proto3");
    let mut required = field("a", 1, Type::Int32);
    required.label = Some(Label::Required as i32);
    proto.message_type.push(message("Foo", vec![required]));

    assert_eq!(errors(proto), vec!["the 'required' label is not allowed in proto3"]);
}

#[test]
fn invalid_default_values() {
    let mut proto = file("proto2");
    let mut bad_int = field("a", 1, Type::Int32);
    bad_int.default_value = Some("abc".to_owned());
    let mut repeated = field("b", 2, Type::Bool);
    repeated.label = Some(Label::Repeated as i32);
    repeated.default_value = Some("true".to_owned());
    let mut float = field("c", 3, Type::Float);
    float.default_value = Some("-inf".to_owned());
    proto
        .message_type
        .push(message("Foo", vec![bad_int, repeated, float]));

    assert_eq!(
        errors(proto),
        vec![
            "invalid default value 'abc' for field of type int32",
            "default values are not allowed on repeated fields",
        ]
    );
}

#[test]
fn message_set_with_fields() {
    let mut proto = file("proto2");
    let mut foo = message("Foo", vec![field("a", 1, Type::Int32)]);
    foo.options = Some(MessageOptions {
        message_set_wire_format: Some(true),
        ..Default::default()
    });
    foo.extension_range.push(ExtensionRange {
        start: Some(4),
        end: Some(i32::MAX),
        options: None,
    });
    proto.message_type.push(foo);

    assert_eq!(errors(proto), vec!["message sets cannot have fields"]);
}

#[test]
fn message_set_extensions_must_be_singular_messages() {
    let mut proto = file("proto2");
    let mut set = message("Set", vec![]);
    set.options = Some(MessageOptions {
        message_set_wire_format: Some(true),
        ..Default::default()
    });
    set.extension_range.push(ExtensionRange {
        start: Some(4),
        end: Some(i32::MAX),
        options: None,
    });
    proto.message_type.push(set);
    proto.message_type.push(message("Payload", vec![]));

    let mut scalar = field("scalar", 10, Type::Int32);
    let mut repeated = message_field("repeated", 11, "Payload");
    repeated.label = Some(Label::Repeated as i32);
    let mut singular = message_field("singular", 12, "Payload");
    for extension in [&mut scalar, &mut repeated, &mut singular] {
        extension.extendee = Some("Set".to_owned());
    }
    proto.extension.extend([scalar, repeated, singular]);

    assert_eq!(
        errors(proto),
        vec![
            "message sets can only be extended by non-repeated message fields",
            "message sets can only be extended by non-repeated message fields",
        ]
    );
}

#[test]
fn lazy_requires_length_prefixed_message() {
    let lazy = |features: Option<FeatureSet>| {
        Some(FieldOptions {
            lazy: Some(true),
            features,
            ..Default::default()
        })
    };

    let mut proto = editions();
    let mut scalar = field("scalar", 1, Type::Int32);
    scalar.options = lazy(None);
    let mut delimited = message_field("delimited", 2, "Bar");
    delimited.options = lazy(Some(FeatureSet {
        message_encoding: Some(MessageEncoding::Delimited as i32),
        ..Default::default()
    }));
    let mut prefixed = message_field("prefixed", 3, "Bar");
    prefixed.options = lazy(None);
    proto
        .message_type
        .push(message("Foo", vec![scalar, delimited, prefixed]));
    proto.message_type.push(message("Bar", vec![]));

    assert_eq!(
        errors(proto),
        vec![
            "the lazy options are only allowed on message fields with length-prefixed encoding",
            "the lazy options are only allowed on message fields with length-prefixed encoding",
        ]
    );
}

#[test]
fn groups_are_only_allowed_in_proto2() {
    let group = |syntax: FileDescriptorProto| {
        let mut proto = syntax;
        let mut field = field("g", 1, Type::Group);
        field.type_name = Some("G".to_owned());
        let mut foo = message("Foo", vec![field]);
        foo.nested_type.push(message("G", vec![]));
        proto.message_type.push(foo);
        errors(proto)
    };

    assert_eq!(group(file("proto2")), Vec::<String>::new());
    assert_eq!(group(file("proto3")), vec!["groups are not allowed in proto3"]);
    assert_eq!(group(editions()), vec!["groups are not allowed in editions"]);
}

#[test]
fn required_is_not_allowed_in_editions() {
    let mut proto = editions();
    let mut required = field("a", 1, Type::Int32);
    required.label = Some(Label::Required as i32);
    proto.message_type.push(message("Foo", vec![required]));

    assert_eq!(errors(proto), vec!["the 'required' label is not allowed in editions"]);
}

#[test]
fn features_outside_editions() {
    let mut proto = file("proto2");
    proto.options = Some(FileOptions {
        features: Some(FeatureSet::default()),
        ..Default::default()
    });

    assert_eq!(errors(proto), vec!["features are only valid under editions"]);
}

#[test]
fn extension_number_not_in_range() {
    let mut proto = file("proto2");
    let mut foo = message("Foo", vec![]);
    foo.extension_range.push(ExtensionRange {
        start: Some(100),
        end: Some(200),
        options: None,
    });
    proto.message_type.push(foo);
    let mut extension = field("ext", 5, Type::Int32);
    extension.extendee = Some("Foo".to_owned());
    proto.extension.push(extension);

    assert_eq!(
        errors(proto),
        vec!["message 'Foo' does not declare 5 as an extension number"]
    );
}

#[test]
fn extension_declaration_mismatch() {
    let mut proto = file("proto2");
    proto.package = Some("foo".to_owned());
    let mut ext = message("Ext", vec![]);
    ext.extension_range.push(ExtensionRange {
        start: Some(1),
        end: Some(10),
        options: Some(ExtensionRangeOptions {
            declaration: vec![Declaration {
                number: Some(1),
                full_name: Some(".foo.bar".to_owned()),
                r#type: Some("string".to_owned()),
                ..Default::default()
            }],
            ..Default::default()
        }),
    });
    proto.message_type.push(ext);
    let mut extension = field("s", 1, Type::Uint32);
    extension.extendee = Some("Ext".to_owned());
    proto.extension.push(extension);

    assert_eq!(
        errors(proto),
        vec![
            "extension 'foo.s' does not match its declaration at test.proto: expected full name \".foo.bar\", found \".foo.s\"; expected type \"string\", found \"uint32\""
        ]
    );
}

#[test]
fn undeclared_extension_number() {
    let mut proto = file("proto2");
    let mut ext = message("Ext", vec![]);
    ext.extension_range.push(ExtensionRange {
        start: Some(1),
        end: Some(10),
        options: Some(ExtensionRangeOptions {
            declaration: vec![Declaration {
                number: Some(1),
                reserved: Some(true),
                ..Default::default()
            }],
            ..Default::default()
        }),
    });
    proto.message_type.push(ext);
    for number in [1, 2] {
        let mut extension = field(&format!("e{}", number), number, Type::Int32);
        extension.extendee = Some("Ext".to_owned());
        proto.extension.push(extension);
    }

    assert_eq!(
        errors(proto),
        vec![
            "extension number 1 of 'Ext' is reserved by its declaration at test.proto",
            "extension number 2 of 'Ext' has no declaration",
        ]
    );
}

proptest! {
    #[test]
    fn overlap_is_symmetric(a in -50i64..50, b in -50i64..50, c in -50i64..50, d in -50i64..50) {
        let first = (a.min(b), a.max(b));
        let second = (c.min(d), c.max(d));
        prop_assert_eq!(overlaps(first, second), overlaps(second, first));
        let shared = (first.0..=first.1).any(|n| (second.0..=second.1).contains(&n));
        prop_assert_eq!(overlaps(first, second), shared);
    }
}
