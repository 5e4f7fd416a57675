//! Checks on linked files which need resolved types.
//!
//! Every check reports through the same callback and keeps going, so one pass finds every
//! problem in a file.

mod enum_;
mod extension;
mod features;
mod message;

#[cfg(test)]
mod tests;

use crate::{
    descriptor::{FileDescriptor, Kind},
    diagnostic::{CheckError, Diagnostic, Severity},
    tag,
    types::{field_options::OptionTargetType, Edition},
    Error,
};

/// Runs every check on `file`.
///
/// `from_source` is set when the file was lowered from a syntax tree, which already reported
/// some problems with how declarations were written.
pub(crate) fn validate(
    file: &FileDescriptor,
    from_source: bool,
    report: &mut dyn FnMut(Diagnostic) -> Result<(), Error>,
) -> Result<(), Error> {
    let mut ctx = Context {
        file,
        edition: file.edition(),
        from_source,
        report,
    };

    ctx.check_features(
        file.file_descriptor_proto()
            .options
            .as_ref()
            .and_then(|options| options.features.as_ref()),
        OptionTargetType::TargetTypeFile,
        &[tag::file::OPTIONS, 50],
    )?;

    for message in file.all_messages() {
        ctx.check_message(&message)?;
    }
    for enum_ in file.all_enums() {
        ctx.check_enum(&enum_)?;
    }
    for extension in file.all_extensions() {
        ctx.check_extension(&extension)?;
    }
    for service in file.services() {
        ctx.check_features(
            service
                .descriptor_proto()
                .options
                .as_ref()
                .and_then(|options| options.features.as_ref()),
            OptionTargetType::TargetTypeService,
            &join(service.path(), &[tag::service::OPTIONS, 34]),
        )?;
        for method in service.methods() {
            ctx.check_features(
                method
                    .descriptor_proto()
                    .options
                    .as_ref()
                    .and_then(|options| options.features.as_ref()),
                OptionTargetType::TargetTypeMethod,
                &join(method.path(), &[tag::method::OPTIONS, 35]),
            )?;
        }
    }

    Ok(())
}

struct Context<'a> {
    file: &'a FileDescriptor,
    edition: Edition,
    from_source: bool,
    report: &'a mut dyn FnMut(Diagnostic) -> Result<(), Error>,
}

impl<'a> Context<'a> {
    fn report(&mut self, severity: Severity, err: CheckError, path: &[i32]) -> Result<(), Error> {
        let diagnostic = self.file.source().diagnostic(severity, err, path);
        (self.report)(diagnostic)
    }

    fn error(&mut self, err: CheckError, path: &[i32]) -> Result<(), Error> {
        self.report(Severity::Error, err, path)
    }

    fn is_proto3(&self) -> bool {
        self.edition == Edition::Proto3
    }

    fn is_editions(&self) -> bool {
        self.edition >= Edition::Edition2023
    }

    fn syntax_name(&self) -> &'static str {
        match self.edition {
            Edition::Proto3 => "proto3",
            Edition::Proto2 => "proto2",
            _ => "editions",
        }
    }
}

fn join(path: &[i32], rest: &[i32]) -> Vec<i32> {
    let mut path = path.to_vec();
    path.extend_from_slice(rest);
    path
}

/// Whether two inclusive ranges share a number.
pub(crate) fn overlaps(a: (i64, i64), b: (i64, i64)) -> bool {
    a.0 <= b.1 && b.0 <= a.1
}

/// The name of a type as written in a declaration, such as `uint32` or `.foo.Bar`.
fn kind_name(kind: &Kind) -> String {
    let name = match kind {
        Kind::Double => "double",
        Kind::Float => "float",
        Kind::Int32 => "int32",
        Kind::Int64 => "int64",
        Kind::Uint32 => "uint32",
        Kind::Uint64 => "uint64",
        Kind::Sint32 => "sint32",
        Kind::Sint64 => "sint64",
        Kind::Fixed32 => "fixed32",
        Kind::Fixed64 => "fixed64",
        Kind::Sfixed32 => "sfixed32",
        Kind::Sfixed64 => "sfixed64",
        Kind::Bool => "bool",
        Kind::String => "string",
        Kind::Bytes => "bytes",
        Kind::Message(message) => return format!(".{}", message.full_name()),
        Kind::Enum(enum_) => return format!(".{}", enum_.full_name()),
        Kind::Unresolved(name) => return name.clone(),
    };
    name.to_owned()
}
