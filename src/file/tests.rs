use std::collections::HashMap;

use prost::Message;

use super::*;
use crate::types::FileDescriptorSet;

fn proto(name: &str, dependency: &[&str]) -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some(name.to_owned()),
        dependency: dependency.iter().map(|&name| name.to_owned()).collect(),
        ..Default::default()
    }
}

fn map(files: &[FileDescriptorProto]) -> HashMap<String, File> {
    files
        .iter()
        .map(|file| (file.name().to_owned(), File::Descriptor(file.clone())))
        .collect()
}

struct Broken;

impl FileResolver for Broken {
    fn open_file(&self, _: &str) -> Result<File, Error> {
        Err(Error::new("permission denied"))
    }
}

#[test]
fn map_resolver_not_found() {
    let resolver = map(&[proto("a.proto", &[])]);

    assert!(resolver.open_file("a.proto").is_ok());
    let err = resolver.open_file("b.proto").unwrap_err();
    assert!(err.is_file_not_found());
    assert_eq!(err.file(), Some("b.proto"));
}

#[test]
fn chain_resolver_searches_in_order() {
    let mut first = map(&[proto("a.proto", &[])]);
    first.insert("shared.proto".to_owned(), File::Descriptor(proto("shared.proto", &["a.proto"])));
    let second = map(&[proto("b.proto", &[]), proto("shared.proto", &[])]);

    let mut resolver = ChainFileResolver::new();
    resolver.add(first);
    resolver.add(second);

    assert!(resolver.open_file("a.proto").is_ok());
    assert!(resolver.open_file("b.proto").is_ok());
    match resolver.open_file("shared.proto").unwrap() {
        File::Descriptor(file) => assert_eq!(file.dependency, vec!["a.proto".to_owned()]),
        file => panic!("unexpected file {:?}", file),
    }
    assert!(resolver.open_file("c.proto").unwrap_err().is_file_not_found());
}

#[test]
fn chain_resolver_stops_at_other_errors() {
    let mut resolver = ChainFileResolver::new();
    resolver.add(Broken);
    resolver.add(map(&[proto("a.proto", &[])]));

    let err = resolver.open_file("a.proto").unwrap_err();
    assert!(!err.is_file_not_found());
    assert_eq!(err.to_string(), "permission denied");
}

#[test]
fn descriptor_set_resolver() {
    let set = FileDescriptorSet {
        file: vec![proto("a.proto", &[]), proto("b.proto", &["a.proto"])],
    };
    let encoded = set.encode_to_vec();

    for resolver in [
        DescriptorSetFileResolver::new(set.clone()),
        DescriptorSetFileResolver::decode(encoded.as_slice()).unwrap(),
    ] {
        let mut names: Vec<&str> = resolver.file_names().collect();
        names.sort_unstable();
        assert_eq!(names, ["a.proto", "b.proto"]);

        match resolver.open_file("b.proto").unwrap() {
            File::Descriptor(file) => assert_eq!(file, set.file[1]),
            file => panic!("unexpected file {:?}", file),
        }
        assert!(resolver.open_file("c.proto").unwrap_err().is_file_not_found());
    }
}

#[test]
fn descriptor_set_decode_error() {
    assert!(DescriptorSetFileResolver::decode(&[0x0a, 0x05, 0x01][..]).is_err());
}

#[test]
fn decode_file() {
    let encoded = proto("a.proto", &["b.proto", "c.proto"]).encode_to_vec();
    let file = File::decode("a.proto", encoded.as_slice()).unwrap();
    assert_eq!(file.imports(), ["b.proto", "c.proto"]);

    let err = File::decode("bad.proto", &[0xff][..]).unwrap_err();
    assert_eq!(err.file(), Some("bad.proto"));
    assert!(!err.is_file_not_found());
}

#[test]
fn source_files_have_no_known_imports() {
    assert!(File::Source("import \"a.proto\";".to_owned()).imports().is_empty());
}
