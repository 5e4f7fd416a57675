use std::collections::HashMap;

use bytes::Buf;
use prost::{
    encoding::{decode_key, message, skip_field, DecodeContext},
    DecodeError,
};

use crate::{
    file::{File, FileResolver},
    tag,
    types::{FileDescriptorProto, FileDescriptorSet},
    Error,
};

/// An implementation of [`FileResolver`] which resolves files from a compiled [`FileDescriptorSet`].
///
/// The descriptors are linked again when opened. Since every name in a compiled set is already
/// fully-qualified, this only registers their symbols and checks them.
#[derive(Debug, Default)]
pub struct DescriptorSetFileResolver {
    files: HashMap<String, FileDescriptorProto>,
}

impl DescriptorSetFileResolver {
    /// Creates an instance of [`DescriptorSetFileResolver`] from the file descriptor set.
    ///
    /// If the set contains several files with the same name, the last one is used.
    pub fn new(set: FileDescriptorSet) -> Self {
        DescriptorSetFileResolver {
            files: set
                .file
                .into_iter()
                .map(|file| (file.name().to_owned(), file))
                .collect(),
        }
    }

    /// Creates an instance of [`DescriptorSetFileResolver`] by deserializing a [`FileDescriptorSet`]
    /// from the given bytes.
    pub fn decode<B>(mut buf: B) -> Result<Self, DecodeError>
    where
        B: Buf,
    {
        let mut set = Vec::new();
        while buf.has_remaining() {
            let (number, wire_type) = decode_key(&mut buf)?;
            if number == tag::file_descriptor_set::FILE as u32 {
                message::merge_repeated(wire_type, &mut set, &mut buf, DecodeContext::default())?;
            } else {
                skip_field(wire_type, number, &mut buf, DecodeContext::default())?;
            }
        }
        Ok(DescriptorSetFileResolver::new(FileDescriptorSet { file: set }))
    }

    /// The names of the files in the set.
    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }
}

impl FileResolver for DescriptorSetFileResolver {
    fn open_file(&self, name: &str) -> Result<File, Error> {
        match self.files.get(name) {
            Some(file) => Ok(File::Descriptor(file.clone())),
            None => Err(Error::file_not_found(name)),
        }
    }
}
