//! Sources of the files read by the [`Compiler`](crate::Compiler).

mod chain;
mod descriptor_set;

#[cfg(test)]
mod tests;

pub use chain::ChainFileResolver;
pub use descriptor_set::DescriptorSetFileResolver;

use std::{collections::HashMap, sync::Arc};

use bytes::Buf;
use prost::Message;

use crate::{
    ast,
    descriptor::FileDescriptor,
    error::ErrorKind,
    types::FileDescriptorProto,
    Error,
};

/// A strategy for locating the files imported during compilation.
///
/// Files may be opened concurrently from several threads, but each name is opened at most
/// once per compilation.
pub trait FileResolver: Send + Sync {
    /// Opens a file by its import name.
    ///
    /// # Errors
    ///
    /// If the file is not found, the implementation should return [`Error::file_not_found`].
    fn open_file(&self, name: &str) -> Result<File, Error>;
}

impl<T> FileResolver for Box<T>
where
    T: FileResolver + ?Sized,
{
    fn open_file(&self, name: &str) -> Result<File, Error> {
        (**self).open_file(name)
    }
}

impl<T> FileResolver for Arc<T>
where
    T: FileResolver + ?Sized,
{
    fn open_file(&self, name: &str) -> Result<File, Error> {
        (**self).open_file(name)
    }
}

/// A resolver backed by a map from names to files.
impl FileResolver for HashMap<String, File> {
    fn open_file(&self, name: &str) -> Result<File, Error> {
        self.get(name)
            .cloned()
            .ok_or_else(|| Error::file_not_found(name))
    }
}

/// Converts source text to a syntax tree.
pub trait Parser: Send + Sync {
    /// Parses the contents of the file `name`.
    fn parse(&self, name: &str, source: &str) -> Result<ast::File, Error>;
}

/// A file returned by a [`FileResolver`], in any of the forms the compiler can link.
#[derive(Debug, Clone)]
pub enum File {
    /// A file which is already linked. It is used as-is and its symbols are registered.
    Linked(FileDescriptor),
    /// A descriptor whose names may still be relative.
    Descriptor(FileDescriptorProto),
    /// A parsed file, with its source text if available.
    Ast {
        ast: ast::File,
        source: Option<String>,
    },
    /// Source text, which is parsed by the compiler's [`Parser`].
    Source(String),
}

impl File {
    /// Decodes an encoded `FileDescriptorProto`.
    pub fn decode<B>(name: &str, buf: B) -> Result<Self, Error>
    where
        B: Buf,
    {
        FileDescriptorProto::decode(buf)
            .map(File::Descriptor)
            .map_err(|err| {
                Error::from_kind(ErrorKind::Decode {
                    name: name.to_owned(),
                    err,
                })
            })
    }

    /// The names of the files imported by this file, in order.
    ///
    /// Already linked files and unparsed source have no imports to load.
    pub(crate) fn imports(&self) -> Vec<String> {
        match self {
            File::Descriptor(proto) => proto.dependency.clone(),
            File::Ast { ast, .. } => ast.imports.iter().map(|import| import.value.clone()).collect(),
            File::Linked(_) | File::Source(_) => Vec::new(),
        }
    }
}

impl From<FileDescriptorProto> for File {
    fn from(proto: FileDescriptorProto) -> Self {
        File::Descriptor(proto)
    }
}

impl From<FileDescriptor> for File {
    fn from(file: FileDescriptor) -> Self {
        File::Linked(file)
    }
}

impl From<ast::File> for File {
    fn from(ast: ast::File) -> Self {
        File::Ast { ast, source: None }
    }
}
