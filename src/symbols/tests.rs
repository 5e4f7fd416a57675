use std::sync::Arc;

use crate::{
    descriptor::{index::Index, DefinitionKind},
    diagnostic::{CheckError, Diagnostic},
    source::SourceMap,
    types::{
        DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FileDescriptorProto,
    },
};

use super::{FileSymbols, SymbolEntry, SymbolTable};

fn file(name: &str, package: &str, messages: &[&str], enums: &[(&str, &[&str])]) -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some(name.to_owned()),
        package: if package.is_empty() {
            None
        } else {
            Some(package.to_owned())
        },
        message_type: messages
            .iter()
            .map(|&name| DescriptorProto {
                name: Some(name.to_owned()),
                ..Default::default()
            })
            .collect(),
        enum_type: enums
            .iter()
            .map(|&(name, values)| EnumDescriptorProto {
                name: Some(name.to_owned()),
                value: values
                    .iter()
                    .enumerate()
                    .map(|(number, &name)| EnumValueDescriptorProto {
                        name: Some(name.to_owned()),
                        number: Some(number as i32),
                        options: None,
                    })
                    .collect(),
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    }
}

fn import(table: &SymbolTable, proto: &FileDescriptorProto, source: &SourceMap) -> Vec<Diagnostic> {
    let index = Index::build(proto);
    let mut diagnostics = Vec::new();
    table
        .import_symbols(
            &FileSymbols {
                name: proto.name(),
                index: &index,
                source,
            },
            &mut |diagnostic| {
                diagnostics.push(diagnostic);
                Ok(())
            },
        )
        .unwrap();
    diagnostics
}

#[test]
fn duplicate_symbol_across_files() {
    let table = SymbolTable::new();
    let first = file("a.proto", "", &["foo"], &[]);
    let second = file("b.proto", "", &[], &[("foo", &["V"][..])]);

    let a_source = SourceMap::from_spans("a.proto", Some("message foo {}\n"), vec![(vec![4, 0], 0..14)]);
    assert!(import(&table, &first, &a_source).is_empty());

    let diagnostics = import(&table, &second, &SourceMap::empty("b.proto"));
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].file(), "b.proto");
    assert_eq!(
        diagnostics[0].kind(),
        &CheckError::DuplicateSymbol {
            name: "foo".to_owned(),
            first: "a.proto:1:1".to_owned(),
        }
    );

    let entry = table.lookup("foo").unwrap();
    assert_eq!(entry.file, "a.proto");
    assert_eq!(entry.kind, DefinitionKind::Message);
}

#[test]
fn duplicate_symbol_in_one_file() {
    let table = SymbolTable::new();
    let proto = file("a.proto", "pkg", &["Foo", "Foo"], &[]);

    let diagnostics = import(&table, &proto, &SourceMap::empty("a.proto"));
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(
        diagnostics[0].to_string(),
        "a.proto: symbol \"pkg.Foo\" already defined at a.proto"
    );
}

#[test]
fn import_is_idempotent() {
    let table = SymbolTable::new();
    let proto = file("a.proto", "foo.bar", &["Baz"], &[]);
    let source = SourceMap::empty("a.proto");

    assert!(import(&table, &proto, &source).is_empty());
    assert!(import(&table, &proto, &source).is_empty());
    assert!(table.has_package("foo"));
    assert!(table.has_package("foo.bar"));
    assert!(!table.has_package("foo.baz"));
    assert_eq!(table.lookup(".foo.bar.Baz").unwrap().kind, DefinitionKind::Message);
    assert_eq!(table.lookup("foo.bar").unwrap().kind, DefinitionKind::Package);
}

#[test]
fn package_conflicts_with_symbol() {
    let table = SymbolTable::new();
    let first = file("a.proto", "foo", &["bar"], &[]);
    let second = file("b.proto", "foo.bar", &["Baz"], &[]);

    assert!(import(&table, &first, &SourceMap::empty("a.proto")).is_empty());
    let diagnostics = import(&table, &second, &SourceMap::empty("b.proto"));
    assert_eq!(diagnostics.len(), 1);
    assert!(matches!(
        diagnostics[0].kind(),
        CheckError::PackageConflict { name, .. } if name == "foo.bar"
    ));
}

#[test]
fn symbol_conflicts_with_package() {
    let table = SymbolTable::new();
    let first = file("a.proto", "foo.bar", &["Baz"], &[]);
    let second = file("b.proto", "foo", &["bar"], &[]);

    assert!(import(&table, &first, &SourceMap::empty("a.proto")).is_empty());
    let diagnostics = import(&table, &second, &SourceMap::empty("b.proto"));
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(
        diagnostics[0].kind(),
        &CheckError::SymbolConflictsWithPackage {
            name: "foo.bar".to_owned(),
            first: "a.proto".to_owned(),
        }
    );
}

#[test]
fn enum_values_are_siblings_of_their_enum() {
    let table = SymbolTable::new();
    let proto = file("a.proto", "", &[], &[("Foo", &["A"][..]), ("Bar", &["A"][..])]);

    let diagnostics = import(&table, &proto, &SourceMap::empty("a.proto"));
    assert_eq!(diagnostics.len(), 1);
    assert!(matches!(
        diagnostics[0].kind(),
        CheckError::DuplicateEnumValueSymbol { name, .. } if name == "A"
    ));
}

#[test]
fn add_extension() {
    let table = SymbolTable::new();
    let proto = file("a.proto", "foo", &["Extendee"], &[]);
    assert!(import(&table, &proto, &SourceMap::empty("a.proto")).is_empty());

    let entry = |file: &str| SymbolEntry {
        kind: DefinitionKind::Extension,
        file: file.to_owned(),
        location: format!("{}:3:5", file),
    };

    assert_eq!(table.add_extension("foo", ".foo.Extendee", 100, entry("b.proto")), Ok(()));
    assert_eq!(
        table.add_extension("foo", "foo.Extendee", 100, entry("c.proto")),
        Err(CheckError::DuplicateExtension {
            extendee: "foo.Extendee".to_owned(),
            number: 100,
            first: "b.proto:3:5".to_owned(),
        })
    );
    assert_eq!(table.add_extension("foo", "foo.Extendee", 101, entry("c.proto")), Ok(()));
    assert_eq!(
        table.add_extension("bar", "foo.Extendee", 102, entry("c.proto")),
        Err(CheckError::ExtensionPackageMismatch {
            extendee: "foo.Extendee".to_owned(),
            package: "bar".to_owned(),
        })
    );

    assert_eq!(table.find_extension("foo.Extendee", 100).unwrap().file, "b.proto");
    assert_eq!(table.find_extension("foo.Extendee", 103), None);
}

#[test]
fn get_package_creates_nodes() {
    let table = SymbolTable::new();
    assert!(table.get_package("a.b.c", false).is_none());
    let node = table.get_package("a.b.c", true).unwrap();
    assert_eq!(node.name(), "a.b.c");
    assert!(table.has_package("a.b"));
    assert!(Arc::ptr_eq(&node, &table.get_package("a.b.c", false).unwrap()));
}

#[test]
fn concurrent_imports() {
    let table = SymbolTable::new();
    let files: Vec<_> = (0..16)
        .map(|i| file(&format!("f{}.proto", i), &format!("pkg{}.sub", i % 4), &[format!("M{}", i).as_str()], &[]))
        .collect();

    let diagnostics: Vec<Diagnostic> = std::thread::scope(|scope| {
        let handles: Vec<_> = files
            .iter()
            .map(|proto| {
                let table = &table;
                scope.spawn(move || import(table, proto, &SourceMap::empty(proto.name())))
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect()
    });

    assert!(diagnostics.is_empty());
    for i in 0..16 {
        let entry = table.lookup(&format!("pkg{}.sub.M{}", i % 4, i)).unwrap();
        assert_eq!(entry.file, format!("f{}.proto", i));
    }
}
