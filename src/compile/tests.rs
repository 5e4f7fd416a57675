use std::collections::HashMap;

use parking_lot::Mutex;

use super::*;
use crate::{
    ast,
    diagnostic::FailFast,
    types::{
        field_descriptor_proto::{Label, Type},
        DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
        FileDescriptorProto,
    },
};

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

fn resolver(files: Vec<FileDescriptorProto>) -> HashMap<String, File> {
    files
        .into_iter()
        .map(|file| (file.name().to_owned(), File::Descriptor(file)))
        .collect()
}

fn names(files: &[FileDescriptor]) -> Vec<&str> {
    files.iter().map(|file| file.name()).collect()
}

#[derive(Default)]
struct Collect(Mutex<Vec<String>>);

impl Reporter for Collect {
    fn error(&self, diagnostic: &Diagnostic) -> Result<(), Error> {
        self.0.lock().push(diagnostic.to_string());
        Ok(())
    }
}

struct CancelOnError(CancellationToken);

impl Reporter for CancelOnError {
    fn error(&self, _: &Diagnostic) -> Result<(), Error> {
        self.0.cancel();
        Ok(())
    }
}

struct PanickingResolver;

impl FileResolver for PanickingResolver {
    fn open_file(&self, name: &str) -> Result<File, Error> {
        panic!("cannot open {}", name)
    }
}

struct EmptyParser;

impl Parser for EmptyParser {
    fn parse(&self, _: &str, source: &str) -> Result<ast::File, Error> {
        if source.is_empty() {
            return Err(Error::new("unexpected end of file"));
        }
        Ok(ast::File {
            syntax: ast::Syntax::Proto3,
            syntax_span: None,
            package: None,
            imports: vec![],
            options: vec![],
            items: vec![],
            span: 0..source.len(),
        })
    }
}

#[test]
fn links_imports_before_importers() {
    let mut c = file("c.proto", "pkg", &[]);
    c.message_type.push(message("C", vec![]));
    let mut b = file("b.proto", "pkg", &["c.proto"]);
    b.message_type.push(message("B", vec![field("c", 1, "C")]));
    let mut a = file("a.proto", "pkg", &["b.proto"]);
    a.message_type.push(message("A", vec![field("b", 1, "B")]));

    let mut compiler = Compiler::new(resolver(vec![a, b, c]));
    let compilation = compiler.compile(["a.proto"]);
    assert!(compilation.error().is_none(), "{:?}", compilation.error());
    assert_eq!(names(compilation.files()), ["c.proto", "b.proto", "a.proto"]);

    let set = compilation.file_descriptor_set();
    assert_eq!(set.file.len(), 1);
    assert_eq!(set.file[0].name(), "a.proto");
    assert_eq!(set.file[0].message_type[0].field[0].type_name(), ".pkg.B");

    compiler.include_imports(true);
    let set = compiler.compile(["a.proto"]).file_descriptor_set();
    let set_names: Vec<&str> = set.file.iter().map(|file| file.name()).collect();
    assert_eq!(set_names, ["c.proto", "b.proto", "a.proto"]);
}

#[test]
fn shared_imports_are_linked_once() {
    let mut base = file("base.proto", "", &[]);
    base.message_type.push(message("Base", vec![]));
    let mut left = file("left.proto", "", &["base.proto"]);
    left.message_type.push(message("Left", vec![field("base", 1, "Base")]));
    let mut right = file("right.proto", "", &["base.proto"]);
    right.message_type.push(message("Right", vec![field("base", 1, "Base")]));
    let top = file("top.proto", "", &["left.proto", "right.proto"]);

    let compilation = Compiler::new(resolver(vec![base, left, right, top]))
        .parallelism(4)
        .compile(["top.proto", "left.proto"]);
    assert!(compilation.diagnostics().is_empty(), "{:?}", compilation.diagnostics());
    let files = names(compilation.files());
    assert_eq!(files.len(), 4);
    assert_eq!(files[0], "base.proto");
    assert_eq!(files[3], "top.proto");

    let set = compilation.file_descriptor_set();
    let mut set_names: Vec<&str> = set.file.iter().map(|file| file.name()).collect();
    set_names.sort_unstable();
    assert_eq!(set_names, ["left.proto", "top.proto"]);
}

#[test]
fn import_cycle() {
    let a = file("a.proto", "", &["b.proto"]);
    let b = file("b.proto", "", &["a.proto"]);

    let compilation = Compiler::new(resolver(vec![a, b])).compile(["a.proto"]);
    let err = compilation.error().unwrap();
    assert!(err.is_invalid_input());

    let cycles: Vec<&Diagnostic> = compilation
        .diagnostics()
        .iter()
        .filter(|diagnostic| matches!(diagnostic.kind(), CheckError::ImportCycle { .. }))
        .collect();
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].file(), "b.proto");
    assert_eq!(
        cycles[0].message(),
        "import cycle detected: a.proto -> b.proto -> a.proto"
    );
}

#[test]
fn missing_root() {
    let compilation = Compiler::new(resolver(vec![])).compile(["nope.proto"]);
    assert!(compilation.files().is_empty());
    let err = compilation.into_result().unwrap_err();
    assert!(err.is_file_not_found());
    assert_eq!(err.file(), Some("nope.proto"));
}

#[test]
fn import_failed_to_load() {
    let mut files = resolver(vec![file("a.proto", "", &["b.proto"])]);
    files.insert("b.proto".to_owned(), File::Source("message B {}".to_owned()));

    let compilation = Compiler::new(files).compile(["a.proto"]);
    assert!(compilation.error().unwrap().is_invalid_input());
    assert_eq!(compilation.diagnostics().len(), 1);
    assert_eq!(
        compilation.diagnostics()[0].kind(),
        &CheckError::ImportFailed {
            name: "b.proto".to_owned(),
            message: "no parser is configured to read source file 'b.proto'".to_owned(),
        }
    );
}

#[test]
fn source_files_are_parsed() {
    let mut files = HashMap::new();
    files.insert("a.proto".to_owned(), File::Source("syntax = \"proto3\";".to_owned()));
    files.insert("empty.proto".to_owned(), File::Source(String::new()));

    let mut compiler = Compiler::new(files);
    let err = compiler.compile(["a.proto"]).into_result().unwrap_err();
    assert_eq!(err.file(), Some("a.proto"));

    compiler.parser(EmptyParser);
    let files = compiler.compile(["a.proto"]).into_result().unwrap();
    assert_eq!(files[0].file_descriptor_proto().syntax(), "proto3");

    let err = compiler.compile(["empty.proto"]).into_result().unwrap_err();
    assert_eq!(err.to_string(), "unexpected end of file");
}

#[test]
fn cancelled_before_start() {
    let token = CancellationToken::new();
    token.cancel();

    let compilation = Compiler::new(resolver(vec![file("a.proto", "", &[])]))
        .cancellation(token)
        .compile(["a.proto"]);
    assert!(compilation.files().is_empty());
    assert!(compilation.error().unwrap().is_cancelled());
}

#[test]
fn cancelled_while_linking() {
    let token = CancellationToken::new();
    let mut bad = file("a.proto", "", &[]);
    bad.message_type
        .push(message("M", vec![field("missing", 1, "Missing")]));

    let compilation = Compiler::new(resolver(vec![bad]))
        .reporter(CancelOnError(token.clone()))
        .cancellation(token.clone())
        .compile(["a.proto"]);
    assert!(token.is_cancelled());
    assert!(compilation.files().is_empty());
    assert!(compilation.error().unwrap().is_cancelled());
    assert_eq!(compilation.diagnostics().len(), 1);
}

#[test]
fn max_errors() {
    let files: Vec<FileDescriptorProto> = (0..4)
        .map(|i| {
            let mut proto = file(&format!("f{}.proto", i), "", &[]);
            proto
                .message_type
                .push(message("M", vec![field("missing", 1, "Missing")]));
            proto.package = Some(format!("p{}", i));
            proto
        })
        .collect();
    let names: Vec<String> = files.iter().map(|file| file.name().to_owned()).collect();

    let compilation = Compiler::new(resolver(files))
        .max_errors(1)
        .compile(&names);
    assert!(compilation.error().unwrap().is_too_many_errors());
    assert!(compilation.files().is_empty());
}

#[test]
fn fail_fast_reporter() {
    let mut bad = file("bad.proto", "", &[]);
    bad.message_type
        .push(message("M", vec![field("missing", 1, "Missing")]));

    let compilation = Compiler::new(resolver(vec![bad]))
        .reporter(FailFast)
        .compile(["bad.proto"]);
    let err = compilation.error().unwrap();
    assert!(err.is_invalid_input());
    assert_eq!(err.to_string(), "bad.proto: name 'Missing' is not defined");
}

#[test]
fn reporter_sees_every_error() {
    let collect = Arc::new(Collect::default());
    let mut bad = file("bad.proto", "", &[]);
    bad.message_type.push(message(
        "M",
        vec![field("a", 1, "Missing"), field("b", 2, "AlsoMissing")],
    ));

    let compilation = Compiler::new(resolver(vec![bad]))
        .reporter(collect.clone())
        .compile(["bad.proto"]);
    assert_eq!(compilation.diagnostics().len(), 2);
    assert_eq!(collect.0.lock().len(), 2);
}

#[test]
fn diagnostics_are_grouped_by_file() {
    let mut dep = file("dep.proto", "", &[]);
    dep.message_type
        .push(message("Dep", vec![field("x", 1, "MissingInDep")]));
    let mut root = file("root.proto", "", &["dep.proto"]);
    root.message_type.push(message(
        "Root",
        vec![field("dep", 1, "Dep"), field("y", 2, "MissingInRoot")],
    ));

    let compilation = Compiler::new(resolver(vec![root, dep])).compile(["root.proto"]);
    let files: Vec<&str> = compilation
        .diagnostics()
        .iter()
        .map(|diagnostic| diagnostic.file())
        .collect();
    assert_eq!(files, ["dep.proto", "root.proto"]);

    // Files with errors are left out of the output.
    assert!(compilation.file("dep.proto").is_none());
    assert!(compilation.file("root.proto").is_none());
}

#[test]
fn resolver_panic() {
    let compilation = Compiler::new(PanickingResolver).compile(["a.proto"]);
    let err = compilation.error().unwrap();
    assert!(err.is_panic());
    assert_eq!(err.file(), Some("a.proto"));
    assert!(err.backtrace().is_some());
    assert_eq!(
        err.to_string(),
        "panic while linking 'a.proto': cannot open a.proto"
    );
}

#[test]
fn panics_replace_earlier_failures() {
    let token = CancellationToken::new();
    let collector = Collector {
        reporter: None,
        max_errors: Some(0),
        cancellation: &token,
        diagnostics: Mutex::new(Vec::new()),
        errors: AtomicUsize::new(0),
        aborted: AtomicBool::new(false),
        fatal: Mutex::new(None),
    };

    collector.fail(&Error::too_many_errors(0));
    let panic = catch_panic("b.proto", || -> Result<(), Error> { panic!("interpreter failed") })
        .unwrap_err();
    collector.fail(&panic);
    collector.fail(&Error::cancelled());

    let fatal = collector.fatal.lock().take().unwrap();
    assert!(fatal.is_panic());
    assert_eq!(fatal.file(), Some("b.proto"));
    assert_eq!(
        fatal.to_string(),
        "panic while linking 'b.proto': interpreter failed"
    );
}

#[test]
fn prelinked_dependency() {
    let mut base = file("base.proto", "base", &[]);
    base.message_type.push(message("Base", vec![]));
    let base = Compiler::new(resolver(vec![base]))
        .compile(["base.proto"])
        .into_result()
        .unwrap()
        .remove(0);

    let mut user = file("user.proto", "user", &["base.proto"]);
    user.message_type
        .push(message("User", vec![field("base", 1, "base.Base")]));
    let mut files = resolver(vec![user]);
    files.insert("base.proto".to_owned(), File::Linked(base.clone()));

    let linked = Compiler::new(files)
        .compile(["user.proto"])
        .into_result()
        .unwrap();
    assert_eq!(names(&linked), ["base.proto", "user.proto"]);
    assert_eq!(
        linked[1].file_descriptor_proto().message_type[0].field[0].type_name(),
        ".base.Base"
    );
    assert_eq!(linked[1].dependencies().next().unwrap().name(), base.name());
}

#[test]
fn duplicate_symbol_in_either_order() {
    let mut message_file = file("message.proto", "", &[]);
    message_file.message_type.push(message("foo", vec![]));
    let mut enum_file = file("enum.proto", "", &[]);
    enum_file.enum_type.push(EnumDescriptorProto {
        name: Some("foo".to_owned()),
        value: vec![EnumValueDescriptorProto {
            name: Some("V".to_owned()),
            number: Some(0),
            ..Default::default()
        }],
        ..Default::default()
    });

    let compilation = Compiler::new(resolver(vec![message_file, enum_file]))
        .compile(["message.proto", "enum.proto"]);
    let duplicates: Vec<String> = compilation
        .diagnostics()
        .iter()
        .filter(|diagnostic| matches!(diagnostic.kind(), CheckError::DuplicateSymbol { .. }))
        .map(|diagnostic| diagnostic.to_string())
        .collect();
    assert_eq!(duplicates.len(), 1);
    assert!(
        duplicates[0] == "message.proto: symbol \"foo\" already defined at enum.proto"
            || duplicates[0] == "enum.proto: symbol \"foo\" already defined at message.proto",
        "{}",
        duplicates[0]
    );
    assert_eq!(compilation.files().len(), 1);
}

#[test]
fn encode_file_descriptor_set() {
    let mut proto = file("a.proto", "", &[]);
    proto.message_type.push(message(
        "A",
        vec![FieldDescriptorProto {
            name: Some("x".to_owned()),
            number: Some(1),
            label: Some(Label::Optional as i32),
            r#type: Some(Type::Int32 as i32),
            ..Default::default()
        }],
    ));

    let compilation = Compiler::new(resolver(vec![proto])).compile(["a.proto"]);
    let decoded =
        FileDescriptorSet::decode(compilation.encode_file_descriptor_set().as_slice()).unwrap();
    similar_asserts::assert_eq!(decoded, compilation.file_descriptor_set());
}
