//! A linker for protobuf files.
//!
//! Files are taken either as parsed syntax trees ([`ast::File`]) or as `FileDescriptorProto`s
//! whose type names may still be relative. Linking resolves every name using the scoping rules
//! of `protoc`, builds [`FileDescriptor`]s whose references point directly at the descriptors
//! they name, interprets standard options and checks the result against the rules of the
//! protobuf language.
//!
//! A single file can be linked against already linked imports with [`link()`]. To link a set of
//! files along with everything they import, using a pool of worker threads, see [`Compiler`].
//!
//! # Examples
//!
//! ```
//! # use std::collections::HashMap;
//! # use protolink::{file::File, types::{DescriptorProto, FileDescriptorProto}};
//! use protolink::Compiler;
//!
//! let mut files = HashMap::new();
//! files.insert(
//!     "root.proto".to_owned(),
//!     File::Descriptor(FileDescriptorProto {
//!         name: Some("root.proto".to_owned()),
//!         message_type: vec![DescriptorProto {
//!             name: Some("Root".to_owned()),
//!             ..Default::default()
//!         }],
//!         ..Default::default()
//!     }),
//! );
//!
//! let files = Compiler::new(files).compile(["root.proto"]).into_result().unwrap();
//! assert_eq!(files[0].get_message_by_name("Root").unwrap().full_name(), "Root");
//! ```
//!
//! ### Error messages
//!
//! Errors implement [`miette::Diagnostic`]. When files are linked from a syntax tree with its
//! source text, each diagnostic carries a labelled span of that source.
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod ast;
pub mod file;
pub mod types;

mod case;
mod compile;
mod descriptor;
mod diagnostic;
mod error;
mod lines;
mod link;
mod source;
mod symbols;
mod tag;
mod validate;

pub use prost;

pub use self::compile::{CancellationToken, Compilation, Compiler};
pub use self::descriptor::{
    DefinitionKind, EnumDescriptor, EnumValueDescriptor, ExtensionDescriptor, FieldDescriptor,
    FileDescriptor, Kind, MessageDescriptor, MethodDescriptor, OneofDescriptor, ServiceDescriptor,
    Symbol,
};
pub use self::diagnostic::{CheckError, Diagnostic, FailFast, KeepGoing, Position, Reporter, Severity};
pub use self::error::Error;
pub use self::link::{link, CustomOption, LinkInput, OptionInterpreter, Resolver, RetainUninterpreted};
pub use self::symbols::{SymbolEntry, SymbolTable};

const MAX_MESSAGE_FIELD_NUMBER: i32 = 536_870_911;

fn make_name(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_owned()
    } else {
        format!("{}.{}", namespace, name)
    }
}

fn index_to_i32(index: usize) -> i32 {
    // Encoded descriptors are smaller than i32::MAX bytes, so element indices always fit.
    i32::try_from(index).unwrap_or(i32::MAX)
}
