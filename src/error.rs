use std::{backtrace::Backtrace, fmt, sync::Arc};

use miette::{Diagnostic as MietteDiagnostic, LabeledSpan, SourceCode};
use thiserror::Error;

use crate::diagnostic::{Diagnostic, Severity};

/// An error that can occur when linking protobuf files.
#[derive(MietteDiagnostic, Error)]
#[error(transparent)]
#[diagnostic(transparent)]
pub struct Error {
    kind: Box<ErrorKind>,
}

#[derive(Debug, MietteDiagnostic, Error)]
pub(crate) enum ErrorKind {
    #[error(transparent)]
    #[diagnostic(transparent)]
    InvalidInput(DiagnosticList),
    #[error("file '{name}' not found")]
    FileNotFound { name: String },
    #[error("no parser is configured to read source file '{name}'")]
    #[diagnostic(help("set a parser with `Compiler::parser`, or provide the file as an AST or descriptor"))]
    NoParser { name: String },
    #[error("failed to decode file descriptor '{name}'")]
    Decode {
        name: String,
        #[source]
        err: prost::DecodeError,
    },
    #[error("panic while linking '{file}': {message}")]
    Panic {
        file: String,
        message: String,
        stack: Arc<Backtrace>,
    },
    #[error("compilation was cancelled")]
    Cancelled,
    #[error("too many errors: the limit of {limit} was exceeded")]
    TooManyErrors { limit: usize },
    #[error(transparent)]
    Custom(Box<dyn std::error::Error + Send + Sync>),
}

/// The error diagnostics reported while compiling, presented as a single error.
#[derive(Debug)]
pub(crate) struct DiagnosticList {
    first: Diagnostic,
    related: Vec<Diagnostic>,
}

impl Error {
    /// Creates an instance of [`struct@Error`] with an arbitrary payload.
    pub fn new<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Error::from_kind(ErrorKind::Custom(error.into()))
    }

    /// Creates an instance of [`struct@Error`] indicating that an imported file could not be found.
    ///
    /// This error should be returned by [`FileResolver`](crate::file::FileResolver) instances if a file is not found.
    pub fn file_not_found(name: &str) -> Self {
        Error::from_kind(ErrorKind::FileNotFound {
            name: name.to_owned(),
        })
    }

    /// Creates an error which aborts the compilation because too many errors were reported.
    pub fn too_many_errors(limit: usize) -> Self {
        Error::from_kind(ErrorKind::TooManyErrors { limit })
    }

    pub(crate) fn no_parser(name: &str) -> Self {
        Error::from_kind(ErrorKind::NoParser {
            name: name.to_owned(),
        })
    }

    pub(crate) fn cancelled() -> Self {
        Error::from_kind(ErrorKind::Cancelled)
    }

    /// Wraps the error diagnostics of a compilation. Returns `None` if there are none.
    pub(crate) fn invalid_input<I>(diagnostics: I) -> Option<Self>
    where
        I: IntoIterator<Item = Diagnostic>,
    {
        let mut errors = diagnostics
            .into_iter()
            .filter(|diagnostic| diagnostic.severity() == Severity::Error);
        let first = errors.next()?;
        Some(Error::from_kind(ErrorKind::InvalidInput(DiagnosticList {
            first,
            related: errors.collect(),
        })))
    }

    pub(crate) fn panic(file: &str, payload: &(dyn std::any::Any + Send), backtrace: Backtrace) -> Self {
        let message = if let Some(message) = payload.downcast_ref::<&str>() {
            (*message).to_owned()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "unknown panic payload".to_owned()
        };

        Error::from_kind(ErrorKind::Panic {
            file: file.to_owned(),
            message,
            stack: Arc::new(backtrace),
        })
    }

    /// The file in which this error occurred, if available.
    pub fn file(&self) -> Option<&str> {
        match &*self.kind {
            ErrorKind::InvalidInput(list) => Some(list.first.file()),
            ErrorKind::FileNotFound { name }
            | ErrorKind::NoParser { name }
            | ErrorKind::Decode { name, .. } => Some(name),
            ErrorKind::Panic { file, .. } => Some(file),
            ErrorKind::Cancelled | ErrorKind::TooManyErrors { .. } | ErrorKind::Custom(_) => None,
        }
    }

    /// The error diagnostics, if this error was caused by invalid input files.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        let list = match &*self.kind {
            ErrorKind::InvalidInput(list) => Some(list),
            _ => None,
        };
        list.into_iter()
            .flat_map(|list| std::iter::once(&list.first).chain(&list.related))
    }

    /// The stack trace captured when linking panicked.
    pub fn backtrace(&self) -> Option<&Backtrace> {
        match &*self.kind {
            ErrorKind::Panic { stack, .. } => Some(stack),
            _ => None,
        }
    }

    pub(crate) fn from_kind(kind: ErrorKind) -> Self {
        Error {
            kind: Box::new(kind),
        }
    }

    #[cfg(test)]
    pub(crate) fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Returns true if at least one error diagnostic was reported for the input files.
    pub fn is_invalid_input(&self) -> bool {
        matches!(&*self.kind, ErrorKind::InvalidInput(_))
    }

    /// Returns true if this is an instance of [`Error::file_not_found()`]
    pub fn is_file_not_found(&self) -> bool {
        matches!(&*self.kind, ErrorKind::FileNotFound { .. })
    }

    /// Returns true if linking a file panicked.
    pub fn is_panic(&self) -> bool {
        matches!(&*self.kind, ErrorKind::Panic { .. })
    }

    /// Returns true if the compilation was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(&*self.kind, ErrorKind::Cancelled)
    }

    /// Returns true if the compilation stopped because the error limit was exceeded.
    pub fn is_too_many_errors(&self) -> bool {
        matches!(&*self.kind, ErrorKind::TooManyErrors { .. })
    }
}

impl Clone for Error {
    fn clone(&self) -> Self {
        let kind = match &*self.kind {
            ErrorKind::InvalidInput(list) => ErrorKind::InvalidInput(DiagnosticList {
                first: list.first.clone(),
                related: list.related.clone(),
            }),
            ErrorKind::FileNotFound { name } => ErrorKind::FileNotFound { name: name.clone() },
            ErrorKind::NoParser { name } => ErrorKind::NoParser { name: name.clone() },
            ErrorKind::Decode { name, err } => ErrorKind::Decode {
                name: name.clone(),
                err: err.clone(),
            },
            ErrorKind::Panic {
                file,
                message,
                stack,
            } => ErrorKind::Panic {
                file: file.clone(),
                message: message.clone(),
                stack: stack.clone(),
            },
            ErrorKind::Cancelled => ErrorKind::Cancelled,
            ErrorKind::TooManyErrors { limit } => ErrorKind::TooManyErrors { limit: *limit },
            ErrorKind::Custom(err) => ErrorKind::Custom(err.to_string().into()),
        };
        Error::from_kind(kind)
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.kind {
            ErrorKind::InvalidInput(list) => {
                write!(f, "{}", list.first)?;
                for diagnostic in &list.related {
                    write!(f, "\n{}", diagnostic)?;
                }
                Ok(())
            }
            ErrorKind::Panic { stack, .. } => write!(f, "{}\n{}", self, stack),
            ErrorKind::Decode { err, .. } => write!(f, "{}: {}", self, err),
            ErrorKind::Custom(err) => err.fmt(f),
            _ => write!(f, "{}", self),
        }
    }
}

impl fmt::Display for DiagnosticList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.first.fmt(f)
    }
}

impl std::error::Error for DiagnosticList {}

impl MietteDiagnostic for DiagnosticList {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.first.code()
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.first.help()
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        self.first.source_code()
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        self.first.labels()
    }

    fn related<'a>(&'a self) -> Option<Box<dyn Iterator<Item = &'a dyn MietteDiagnostic> + 'a>> {
        if self.related.is_empty() {
            return None;
        }
        Some(Box::new(
            self.related
                .iter()
                .map(|diagnostic| diagnostic as &dyn MietteDiagnostic),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::{CheckError, Position};

    #[test]
    fn invalid_input_displays_first_error() {
        let warning = Diagnostic::new(
            Severity::Warning,
            CheckError::UnusedImport {
                name: "dep.proto".to_owned(),
            },
            "root.proto",
        );
        let error = Diagnostic::new(
            Severity::Error,
            CheckError::ImportNotFound {
                name: "foo2.proto".to_owned(),
            },
            "foo.proto",
        )
        .with_position(Position { line: 1, column: 8 });

        let err = Error::invalid_input([warning, error]).unwrap();
        assert!(err.is_invalid_input());
        assert_eq!(err.file(), Some("foo.proto"));
        assert_eq!(err.to_string(), "foo.proto:1:8: file not found: foo2.proto");
        assert_eq!(err.diagnostics().count(), 1);
    }

    #[test]
    fn no_errors_is_not_invalid_input() {
        let warning = Diagnostic::new(
            Severity::Warning,
            CheckError::UnusedImport {
                name: "dep.proto".to_owned(),
            },
            "root.proto",
        );
        assert!(Error::invalid_input([warning]).is_none());
    }

    #[test]
    fn fmt_debug_panic() {
        let err = Error::panic("foo.proto", &"boom", Backtrace::disabled());
        assert!(err.is_panic());
        assert_eq!(err.file(), Some("foo.proto"));
        assert!(format!("{:?}", err).starts_with("panic while linking 'foo.proto': boom"));
        assert!(matches!(err.kind(), ErrorKind::Panic { .. }));
    }
}
