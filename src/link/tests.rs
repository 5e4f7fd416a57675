use parking_lot::Mutex;
use prost_types::{source_code_info::Location, uninterpreted_option::NamePart};

use std::collections::HashMap;

use super::{link, link_file, LinkInput, LinkRequest, Resolver, RetainUninterpreted};
use crate::{
    ast,
    descriptor::{FileDescriptor, Symbol},
    diagnostic::{CheckError, Diagnostic, Reporter, Severity},
    symbols::SymbolTable,
    types::{
        descriptor_proto::ExtensionRange,
        field_descriptor_proto::{Label, Type},
        field_options::FeatureSupport,
        DescriptorProto, Edition, FieldDescriptorProto, FieldOptions, FileDescriptorProto,
        FileOptions, MessageOptions, SourceCodeInfo, UninterpretedOption,
    },
    Error,
};

#[derive(Default)]
struct Collect(Mutex<Vec<Diagnostic>>);

impl Collect {
    fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.0.lock())
    }
}

impl Reporter for Collect {
    fn error(&self, diagnostic: &Diagnostic) -> Result<(), Error> {
        self.0.lock().push(diagnostic.clone());
        Ok(())
    }

    fn warning(&self, diagnostic: &Diagnostic) {
        self.0.lock().push(diagnostic.clone());
    }
}

struct Linker {
    symbols: SymbolTable,
    reporter: Collect,
}

impl Linker {
    fn new() -> Self {
        Linker {
            symbols: SymbolTable::new(),
            reporter: Collect::default(),
        }
    }

    fn link(&self, proto: FileDescriptorProto, dependencies: &[&FileDescriptor]) -> FileDescriptor {
        let name = proto.name().to_owned();
        self.link_input(&name, LinkInput::Descriptor(proto), dependencies)
    }

    fn link_input(
        &self,
        name: &str,
        input: LinkInput,
        dependencies: &[&FileDescriptor],
    ) -> FileDescriptor {
        let dependencies: Vec<FileDescriptor> = dependencies.iter().map(|&file| file.clone()).collect();
        link(name, input, &dependencies, &self.symbols, &self.reporter).unwrap()
    }
}

fn file(name: &str, package: &str, dependencies: &[&str]) -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some(name.to_owned()),
        package: (!package.is_empty()).then(|| package.to_owned()),
        dependency: dependencies.iter().map(|&name| name.to_owned()).collect(),
        ..Default::default()
    }
}

fn message(name: &str, fields: Vec<FieldDescriptorProto>) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_owned()),
        field: fields,
        ..Default::default()
    }
}

fn field(name: &str, number: i32, type_name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_owned()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        type_name: Some(type_name.to_owned()),
        ..Default::default()
    }
}

fn scalar(name: &str, number: i32, ty: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_owned()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(ty as i32),
        ..Default::default()
    }
}

fn extension(name: &str, number: i32, extendee: &str, ty: Result<Type, &str>) -> FieldDescriptorProto {
    let mut extension = match ty {
        Ok(ty) => scalar(name, number, ty),
        Err(type_name) => field(name, number, type_name),
    };
    extension.extendee = Some(extendee.to_owned());
    extension
}

#[test]
fn resolves_names_in_enclosing_scopes() {
    let linker = Linker::new();
    let mut dep = file("dep.proto", "foo.bar", &[]);
    dep.message_type.push(message("Baz", vec![]));
    let dep = linker.link(dep, &[]);

    let mut proto = file("test.proto", "foo.bar.qux", &["dep.proto"]);
    proto
        .message_type
        .push(message("M", vec![field("baz", 1, "Baz"), field("m", 2, "M")]));
    let linked = linker.link(proto, &[&dep]);

    assert!(linker.reporter.take().is_empty());
    assert!(!linked.has_errors());
    let fields = &linked.file_descriptor_proto().message_type[0].field;
    assert_eq!(fields[0].type_name(), ".foo.bar.Baz");
    assert_eq!(fields[0].r#type(), Type::Message);
    assert_eq!(fields[1].type_name(), ".foo.bar.qux.M");

    let resolver = Resolver::new(&linked);
    match resolver.find_type("foo.bar.qux.M", "Baz").unwrap() {
        Symbol::Message(message) => assert_eq!(message.full_name(), "foo.bar.Baz"),
        other => panic!("unexpected symbol {:?}", other),
    }
}

#[test]
fn compound_name_stops_at_innermost_match() {
    let linker = Linker::new();
    let mut dep = file("dep.proto", "a", &[]);
    let mut outer = message("Foo", vec![]);
    outer.nested_type.push(message("Bar", vec![]));
    dep.message_type.push(outer);
    let dep = linker.link(dep, &[]);

    let mut proto = file("test.proto", "a.b", &["dep.proto"]);
    proto.message_type.push(message("Foo", vec![]));
    proto
        .message_type
        .push(message("Msg", vec![field("bar", 1, "Foo.Bar")]));
    let linked = linker.link(proto, &[&dep]);

    assert!(linked.has_errors());
    let diagnostics = linker.reporter.take();
    assert_eq!(diagnostics.len(), 1);
    match diagnostics[0].kind() {
        CheckError::TypeNameNotFound { name, help } => {
            assert_eq!(name, "Foo.Bar");
            assert!(help
                .as_deref()
                .unwrap()
                .starts_with("'Foo.Bar' is resolved to 'a.b.Foo.Bar', which is not defined"));
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn name_in_unimported_file() {
    let linker = Linker::new();
    let mut hidden = file("hidden.proto", "", &[]);
    hidden.message_type.push(message("Hidden", vec![]));
    let hidden = linker.link(hidden, &[]);
    let middle = linker.link(file("middle.proto", "", &["hidden.proto"]), &[&hidden]);

    let mut proto = file("test.proto", "", &["middle.proto"]);
    proto
        .message_type
        .push(message("Foo", vec![field("h", 1, "Hidden")]));
    linker.link(proto, &[&middle]);

    let diagnostics = linker.reporter.take();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(
        diagnostics[0].kind(),
        &CheckError::TypeNameNotFound {
            name: "Hidden".to_owned(),
            help: Some(
                "'Hidden' is defined in 'hidden.proto', which is not imported by 'test.proto'"
                    .to_owned()
            ),
        }
    );
}

#[test]
fn missing_import() {
    let linker = Linker::new();
    let mut proto = file("foo.proto", "", &["foo2.proto"]);
    proto.message_type.push(message("fubar", vec![]));
    proto.source_code_info = Some(SourceCodeInfo {
        location: vec![Location {
            path: vec![3, 0],
            span: vec![0, 7, 19],
            ..Default::default()
        }],
    });
    let linked = linker.link(proto, &[]);

    assert!(linked.has_errors());
    let diagnostics = linker.reporter.take();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(
        diagnostics[0].to_string(),
        "foo.proto:1:8: file not found: foo2.proto"
    );
}

#[test]
fn relinking_a_linked_file_is_a_no_op() {
    let linker = Linker::new();
    let mut dep = file("dep.proto", "foo", &[]);
    dep.message_type.push(message("Baz", vec![]));
    let dep_linked = linker.link(dep.clone(), &[]);

    let mut proto = file("test.proto", "foo.bar", &["dep.proto"]);
    let mut outer = message("M", vec![field("baz", 1, "Baz"), field("inner", 2, "Inner")]);
    outer.nested_type.push(message("Inner", vec![]));
    proto.message_type.push(outer);
    let first = linker.link(proto, &[&dep_linked]);

    let relinker = Linker::new();
    let dep_relinked = relinker.link(dep, &[]);
    let second = relinker.link(first.file_descriptor_proto().clone(), &[&dep_relinked]);

    assert!(relinker.reporter.take().is_empty());
    assert_eq!(first.file_descriptor_proto(), second.file_descriptor_proto());
}

#[test]
fn duplicate_extension_numbers_across_files() {
    let linker = Linker::new();
    let mut base = file("base.proto", "base", &[]);
    let mut foo = message("Foo", vec![]);
    foo.extension_range.push(ExtensionRange {
        start: Some(100),
        end: Some(200),
        options: None,
    });
    base.message_type.push(foo);
    let base = linker.link(base, &[]);

    let mut first = file("first.proto", "first", &["base.proto"]);
    first
        .extension
        .push(extension("a", 100, "base.Foo", Ok(Type::Int32)));
    let first = linker.link(first, &[&base]);
    assert!(!first.has_errors());

    let mut second = file("second.proto", "second", &["base.proto"]);
    second
        .extension
        .push(extension("b", 100, "base.Foo", Ok(Type::Int32)));
    let second = linker.link(second, &[&base]);

    assert!(second.has_errors());
    let diagnostics = linker.reporter.take();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].file(), "second.proto");
    assert!(matches!(
        diagnostics[0].kind(),
        CheckError::DuplicateExtension { extendee, number: 100, first }
            if extendee == "base.Foo" && first == "first.proto"
    ));
}

fn ident(value: &str) -> ast::Ident {
    ast::Ident::new(value, 0..0)
}

fn ast_message(name: &str, items: Vec<ast::MessageItem>) -> ast::Message {
    ast::Message {
        name: ident(name),
        body: ast::MessageBody {
            items,
            ..Default::default()
        },
        span: 0..0,
    }
}

fn ast_field(name: &str, number: i64, kind: ast::FieldKind) -> ast::MessageItem {
    ast::MessageItem::Field(ast::Field {
        label: None,
        name: ident(name),
        kind,
        number: ast::Int::new(number, 0..0),
        options: vec![],
        span: 0..0,
    })
}

fn ast_file(imports: Vec<ast::Import>, messages: Vec<ast::Message>) -> ast::File {
    ast::File {
        syntax: ast::Syntax::Proto3,
        syntax_span: None,
        package: None,
        imports,
        options: vec![],
        items: messages.into_iter().map(ast::FileItem::Message).collect(),
        span: 0..0,
    }
}

#[test]
fn map_fields_generate_entry_messages() {
    let linker = Linker::new();
    let ast = ast_file(
        vec![],
        vec![
            ast_message(
                "Foo",
                vec![ast_field(
                    "bar",
                    1,
                    ast::FieldKind::Map {
                        ty_span: 0..0,
                        key_ty: ast::Ty::String,
                        key_ty_span: 0..0,
                        value_ty: ast::Ty::String,
                        value_ty_span: 0..0,
                    },
                )],
            ),
            ast_message(
                "Other",
                vec![ast_field(
                    "entry",
                    1,
                    ast::FieldKind::Normal {
                        ty: ast::Ty::named("Foo.BarEntry", 0..0),
                        ty_span: 0..0,
                    },
                )],
            ),
        ],
    );
    let linked = linker.link_input("test.proto", LinkInput::Ast { ast, source: None }, &[]);

    let entry = linked.get_message_by_name("Foo.BarEntry").unwrap();
    assert!(entry.is_map_entry());
    let fields: Vec<_> = entry
        .fields()
        .map(|field| (field.name().to_owned(), field.number()))
        .collect();
    assert_eq!(fields, [("key".to_owned(), 1), ("value".to_owned(), 2)]);
    let bar = linked
        .get_message_by_name("Foo")
        .unwrap()
        .get_field_by_name("bar")
        .unwrap();
    assert!(bar.is_map());

    let diagnostics = linker.reporter.take();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(
        diagnostics[0].message(),
        "'Foo.BarEntry' is a synthetic map entry message and may not be referenced explicitly"
    );
}

#[test]
fn unused_import_warning() {
    let linker = Linker::new();
    let mut dep = file("dep.proto", "", &[]);
    dep.message_type.push(message("Bar", vec![]));
    let dep = linker.link(dep, &[]);

    let source = "import \"dep.proto\";\nmessage Foo {}\n";
    let ast = ast_file(
        vec![ast::Import {
            kind: None,
            value: "dep.proto".to_owned(),
            value_span: 7..18,
            span: 0..19,
        }],
        vec![ast_message("Foo", vec![])],
    );
    let linked = linker.link_input(
        "test.proto",
        LinkInput::Ast {
            ast,
            source: Some(source.to_owned()),
        },
        &[&dep],
    );

    assert!(!linked.has_errors());
    let diagnostics = linker.reporter.take();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].severity(), Severity::Warning);
    assert_eq!(
        diagnostics[0].to_string(),
        "test.proto:1:8: import 'dep.proto' is unused"
    );
}

#[test]
fn package_names_do_not_use_imports() {
    let linker = Linker::new();
    let mut a = file("a.proto", "foo", &[]);
    a.message_type.push(message("Unrelated", vec![]));
    let a = linker.link(a, &[]);
    let mut b = file("b.proto", "foo", &[]);
    b.message_type.push(message("Bar", vec![]));
    let b = linker.link(b, &[]);

    let source = "import \"a.proto\";\nimport \"b.proto\";\nmessage M { foo.Bar bar = 1; }\n";
    let ast = ast_file(
        vec![
            ast::Import {
                kind: None,
                value: "a.proto".to_owned(),
                value_span: 7..16,
                span: 0..17,
            },
            ast::Import {
                kind: None,
                value: "b.proto".to_owned(),
                value_span: 25..34,
                span: 18..35,
            },
        ],
        vec![ast_message(
            "M",
            vec![ast_field(
                "bar",
                1,
                ast::FieldKind::Normal {
                    ty: ast::Ty::named("foo.Bar", 0..0),
                    ty_span: 0..0,
                },
            )],
        )],
    );
    let linked = linker.link_input(
        "test.proto",
        LinkInput::Ast {
            ast,
            source: Some(source.to_owned()),
        },
        &[&a, &b],
    );

    assert!(!linked.has_errors());
    let field = &linked.file_descriptor_proto().message_type[0].field[0];
    assert_eq!(field.type_name(), ".foo.Bar");
    let diagnostics = linker.reporter.take();
    assert_eq!(diagnostics.len(), 1, "{:?}", diagnostics);
    assert_eq!(
        diagnostics[0].to_string(),
        "test.proto:1:8: import 'a.proto' is unused"
    );
}

#[test]
fn cancelled_between_stages() {
    let symbols = SymbolTable::new();
    let reporter = Collect::default();
    let mut proto = file("test.proto", "", &[]);
    proto
        .message_type
        .push(message("M", vec![field("missing", 1, "Missing")]));

    let err = link_file(LinkRequest {
        name: "test.proto",
        input: LinkInput::Descriptor(proto),
        dependencies: &[],
        import_errors: &HashMap::new(),
        symbols: &symbols,
        interpreter: &RetainUninterpreted,
        reporter: &reporter,
        cancelled: &|| !reporter.0.lock().is_empty(),
    })
    .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(reporter.take().len(), 1);
    assert!(symbols.file("test.proto").is_none());
}

/// `link` forwards each diagnostic as soon as its stage finds it, so a duplicate symbol is
/// reported before an unresolved type which precedes it in the file.
#[test]
fn link_reports_in_stage_order() {
    let linker = Linker::new();
    let mut proto = file("test.proto", "", &[]);
    proto
        .message_type
        .push(message("A", vec![field("missing", 1, "Missing")]));
    proto.message_type.push(message("B", vec![]));
    proto.message_type.push(message("B", vec![]));
    linker.link(proto, &[]);

    let diagnostics = linker.reporter.take();
    assert_eq!(diagnostics.len(), 2, "{:?}", diagnostics);
    assert!(matches!(diagnostics[0].kind(), CheckError::DuplicateSymbol { name, .. } if name == "B"));
    assert!(matches!(diagnostics[1].kind(), CheckError::TypeNameNotFound { name, .. } if name == "Missing"));
}

fn messages(linker: &Linker) -> Vec<String> {
    linker
        .reporter
        .take()
        .into_iter()
        .map(|diagnostic| diagnostic.message())
        .collect()
}

#[test]
fn proto3_optional_fields_get_synthetic_oneofs() {
    let linker = Linker::new();
    let optional = ast::MessageItem::Field(ast::Field {
        label: Some((ast::FieldLabel::Optional, 0..0)),
        name: ident("foo"),
        kind: ast::FieldKind::Normal {
            ty: ast::Ty::Int32,
            ty_span: 0..0,
        },
        number: ast::Int::new(1, 0..0),
        options: vec![],
        span: 0..0,
    });
    let taken = ast_field(
        "_foo",
        2,
        ast::FieldKind::Normal {
            ty: ast::Ty::Int32,
            ty_span: 0..0,
        },
    );
    let choice = ast::MessageItem::Oneof(ast::Oneof {
        name: ident("choice"),
        fields: vec![ast::Field {
            label: None,
            name: ident("bar"),
            kind: ast::FieldKind::Normal {
                ty: ast::Ty::String,
                ty_span: 0..0,
            },
            number: ast::Int::new(3, 0..0),
            options: vec![],
            span: 0..0,
        }],
        options: vec![],
        span: 0..0,
    });
    let ast = ast_file(vec![], vec![ast_message("Foo", vec![optional, taken, choice])]);
    let linked = linker.link_input("test.proto", LinkInput::Ast { ast, source: None }, &[]);

    assert!(linker.reporter.take().is_empty());
    let foo = &linked.file_descriptor_proto().message_type[0];
    let oneofs: Vec<&str> = foo.oneof_decl.iter().map(|oneof| oneof.name()).collect();
    assert_eq!(oneofs, ["choice", "X_foo"]);

    let field = |name: &str| foo.field.iter().find(|field| field.name() == name).unwrap();
    assert_eq!(field("foo").oneof_index, Some(1));
    assert!(field("foo").proto3_optional());
    assert_eq!(field("_foo").oneof_index, None);
    assert_eq!(field("bar").oneof_index, Some(0));
    assert!(!field("bar").proto3_optional());
}

fn ast_reserved_names(syntax: ast::Syntax, name: ast::ReservedName) -> ast::File {
    let mut message = ast_message("Foo", vec![]);
    message.body.reserved.push(ast::Reserved {
        kind: ast::ReservedKind::Names(vec![name]),
        span: 0..0,
    });
    let mut file = ast_file(vec![], vec![message]);
    file.syntax = syntax;
    file
}

#[test]
fn reserved_name_style() {
    let editions = ast::Syntax::Edition("2023".to_owned());
    let cases = [
        (ast::Syntax::Proto3, ast::ReservedName::String(ident("a")), None),
        (
            ast::Syntax::Proto3,
            ast::ReservedName::Ident(ident("a")),
            Some("reserved names must be string literals in proto3"),
        ),
        (editions.clone(), ast::ReservedName::Ident(ident("a")), None),
        (
            editions,
            ast::ReservedName::String(ident("a")),
            Some("reserved names must be identifiers in editions"),
        ),
    ];

    for (syntax, name, expected) in cases {
        let linker = Linker::new();
        let ast = ast_reserved_names(syntax, name);
        let linked = linker.link_input("test.proto", LinkInput::Ast { ast, source: None }, &[]);
        assert_eq!(linked.file_descriptor_proto().message_type[0].reserved_name, ["a"]);
        assert_eq!(messages(&linker), expected.into_iter().collect::<Vec<_>>());
    }
}

#[test]
fn optional_label_in_editions() {
    let linker = Linker::new();
    let field = ast::MessageItem::Field(ast::Field {
        label: Some((ast::FieldLabel::Optional, 0..0)),
        name: ident("a"),
        kind: ast::FieldKind::Normal {
            ty: ast::Ty::Int32,
            ty_span: 0..0,
        },
        number: ast::Int::new(1, 0..0),
        options: vec![],
        span: 0..0,
    });
    let mut ast = ast_file(vec![], vec![ast_message("Foo", vec![field])]);
    ast.syntax = ast::Syntax::Edition("2023".to_owned());
    let linked = linker.link_input("test.proto", LinkInput::Ast { ast, source: None }, &[]);

    assert!(linked.has_errors());
    let diagnostics = linker.reporter.take();
    assert_eq!(diagnostics.len(), 1);
    match diagnostics[0].kind() {
        CheckError::LabelNotAllowed {
            label,
            syntax,
            help,
        } => {
            assert_eq!(*label, "optional");
            assert_eq!(*syntax, "editions");
            assert_eq!(
                *help,
                Some("use `option features.field_presence = EXPLICIT;` instead")
            );
        }
        other => panic!("unexpected error {:?}", other),
    }
    // No synthetic oneof outside proto3.
    assert!(linked.file_descriptor_proto().message_type[0].oneof_decl.is_empty());
}

fn feature_option(feature: &str) -> UninterpretedOption {
    let part = |name: &str, is_extension| NamePart {
        name_part: name.to_owned(),
        is_extension,
    };
    UninterpretedOption {
        name: vec![part("features", false), part("pkg.my", true), part(feature, false)],
        identifier_value: Some("true".to_owned()),
        ..Default::default()
    }
}

#[test]
fn custom_feature_lifetimes() {
    let linker = Linker::new();

    let mut descriptor = file("google/protobuf/descriptor.proto", "google.protobuf", &[]);
    let mut feature_set = message("FeatureSet", vec![]);
    feature_set.extension_range.push(ExtensionRange {
        start: Some(1000),
        end: Some(10000),
        options: None,
    });
    descriptor.message_type.push(feature_set);
    let descriptor = linker.link(descriptor, &[]);

    let supported = |introduced: Edition, deprecated: Option<Edition>, removed: Option<Edition>| {
        Some(FieldOptions {
            feature_support: Some(FeatureSupport {
                edition_introduced: Some(introduced as i32),
                edition_deprecated: deprecated.map(|edition| edition as i32),
                deprecation_warning: deprecated.map(|_| "use current instead".to_owned()),
                edition_removed: removed.map(|edition| edition as i32),
            }),
            ..Default::default()
        })
    };
    let mut current = scalar("current", 1, Type::Bool);
    current.options = supported(Edition::Edition2023, None, None);
    let mut old = scalar("old", 2, Type::Bool);
    old.options = supported(Edition::Proto2, None, Some(Edition::Edition2023));
    let mut legacy = scalar("legacy", 3, Type::Bool);
    legacy.options = supported(Edition::Edition2023, Some(Edition::Edition2023), None);
    let mut future = scalar("future", 4, Type::Bool);
    future.options = supported(Edition::Edition2024, None, None);

    let mut features = file("features.proto", "pkg", &["google/protobuf/descriptor.proto"]);
    features
        .message_type
        .push(message("MyFeatures", vec![current, old, legacy, future]));
    features.extension.push(extension(
        "my",
        1000,
        ".google.protobuf.FeatureSet",
        Err("MyFeatures"),
    ));
    let features = linker.link(features, &[&descriptor]);
    assert!(linker.reporter.take().is_empty());

    let mut proto = file("test.proto", "", &["features.proto"]);
    proto.syntax = Some("editions".to_owned());
    proto.edition = Some(Edition::Edition2023 as i32);
    proto.options = Some(FileOptions {
        uninterpreted_option: ["current", "old", "legacy", "future"]
            .into_iter()
            .map(feature_option)
            .collect(),
        ..Default::default()
    });
    let linked = linker.link(proto, &[&features]);

    assert!(linked.has_errors());
    let diagnostics: Vec<(Severity, String)> = linker
        .reporter
        .take()
        .into_iter()
        .map(|diagnostic| (diagnostic.severity(), diagnostic.message()))
        .collect();
    assert_eq!(
        diagnostics,
        [
            (
                Severity::Error,
                "feature 'features.(pkg.my).old' was removed in edition 2023".to_owned()
            ),
            (
                Severity::Warning,
                "feature 'features.(pkg.my).legacy' has been deprecated in edition 2023: use current instead".to_owned()
            ),
            (
                Severity::Error,
                "feature 'features.(pkg.my).future' was not introduced until edition 2024".to_owned()
            ),
        ]
    );
}

fn custom_option(name: &str, aggregate: &str) -> MessageOptions {
    MessageOptions {
        uninterpreted_option: vec![UninterpretedOption {
            name: vec![NamePart {
                name_part: name.to_owned(),
                is_extension: true,
            }],
            aggregate_value: Some(aggregate.to_owned()),
            ..Default::default()
        }],
        ..Default::default()
    }
}

/// Extension names in message literals are only looked up in the file's package and the root,
/// unlike the first part of an option name.
#[test]
fn message_literal_extension_scope() {
    let linker = Linker::new();

    let mut descriptor = file(
        "google/protobuf/descriptor.proto",
        "google.protobuf",
        &[],
    );
    let mut options = message("MessageOptions", vec![]);
    options.extension_range.push(ExtensionRange {
        start: Some(1000),
        end: Some(536_870_912),
        options: None,
    });
    descriptor.message_type.push(options);
    let descriptor = linker.link(descriptor, &[]);

    let mut ext = file("ext.proto", "a", &["google/protobuf/descriptor.proto"]);
    let mut opt = message("Opt", vec![scalar("x", 1, Type::Int32)]);
    opt.extension_range.push(ExtensionRange {
        start: Some(100),
        end: Some(200),
        options: None,
    });
    ext.message_type.push(opt);
    ext.extension.push(extension(
        "opt",
        1000,
        ".google.protobuf.MessageOptions",
        Err("Opt"),
    ));
    ext.extension
        .push(extension("ext", 100, "Opt", Ok(Type::Int32)));
    let ext = linker.link(ext, &[&descriptor]);
    assert!(linker.reporter.take().is_empty());

    let mut proto = file("test.proto", "a.b", &["ext.proto"]);
    let mut relative = message("Relative", vec![]);
    relative.options = Some(custom_option("opt", "[ext]: 5"));
    let mut qualified = message("Qualified", vec![]);
    qualified.options = Some(custom_option("opt", "x: 1 [a.ext]: 5"));
    proto.message_type.push(relative);
    proto.message_type.push(qualified);
    linker.link(proto, &[&ext]);

    let diagnostics = linker.reporter.take();
    assert_eq!(diagnostics.len(), 1, "{:?}", diagnostics);
    match diagnostics[0].kind() {
        CheckError::OptionInvalidAggregate { name, reason } => {
            assert_eq!(name, "(opt)");
            assert_eq!(reason, "extension 'ext' is not defined");
        }
        other => panic!("unexpected error {:?}", other),
    }
}
