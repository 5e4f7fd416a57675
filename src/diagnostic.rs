//! Problems reported while linking and validating files.

use std::{fmt, sync::Arc};

use miette::{Diagnostic as MietteDiagnostic, LabeledSpan, NamedSource, SourceCode, SourceSpan};
use thiserror::Error;

use crate::Error;

/// The severity of a [`Diagnostic`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

/// A one-based line and column in a source file.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

/// A problem found in a file, with the position it was found at if known.
#[derive(Clone)]
pub struct Diagnostic {
    kind: CheckError,
    severity: Severity,
    file: String,
    position: Option<Position>,
    span: Option<SourceSpan>,
    related_span: Option<(String, SourceSpan)>,
    source_code: Option<Arc<NamedSource<Arc<str>>>>,
}

/// Receives diagnostics as files are linked.
///
/// Implementations are called concurrently from every linking task.
pub trait Reporter: Send + Sync {
    /// Handles an error diagnostic.
    ///
    /// Returning an error aborts the file being linked and cancels the rest of the
    /// compilation.
    fn error(&self, diagnostic: &Diagnostic) -> Result<(), Error>;

    /// Handles a warning diagnostic. Warnings never stop compilation.
    fn warning(&self, diagnostic: &Diagnostic) {
        let _ = diagnostic;
    }
}

impl<T> Reporter for Arc<T>
where
    T: Reporter + ?Sized,
{
    fn error(&self, diagnostic: &Diagnostic) -> Result<(), Error> {
        (**self).error(diagnostic)
    }

    fn warning(&self, diagnostic: &Diagnostic) {
        (**self).warning(diagnostic)
    }
}

/// A [`Reporter`] which accepts every diagnostic.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeepGoing;

impl Reporter for KeepGoing {
    fn error(&self, _: &Diagnostic) -> Result<(), Error> {
        Ok(())
    }
}

/// A [`Reporter`] which aborts at the first error.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailFast;

impl Reporter for FailFast {
    fn error(&self, diagnostic: &Diagnostic) -> Result<(), Error> {
        Err(Error::invalid_input([diagnostic.clone()]).unwrap_or_else(Error::cancelled))
    }
}

/// The problems detected by the linker and validator.
#[derive(Error, Debug, Clone, PartialEq, MietteDiagnostic)]
#[non_exhaustive]
pub enum CheckError {
    #[error("file not found: {name}")]
    ImportNotFound { name: String },
    #[error("failed to load '{name}': {message}")]
    ImportFailed { name: String, message: String },
    #[error("import cycle detected: {cycle}")]
    ImportCycle { cycle: String },
    #[error("import '{name}' was listed twice")]
    DuplicateImport { name: String },
    #[error("import '{name}' is unused")]
    UnusedImport { name: String },
    #[error("unknown syntax '{syntax}'")]
    #[diagnostic(help("possible values are 'proto2' and 'proto3'"))]
    UnknownSyntax { syntax: String },
    #[error("edition '{edition}' is not supported")]
    #[diagnostic(help("the supported editions are 'proto2', 'proto3' and '2023'"))]
    UnsupportedEdition { edition: String },
    #[error("symbol \"{name}\" already defined at {first}")]
    DuplicateSymbol { name: String, first: String },
    #[error("package \"{name}\" conflicts with symbol \"{name}\" defined at {first}")]
    PackageConflict { name: String, first: String },
    #[error("symbol \"{name}\" conflicts with package \"{name}\" declared in {first}")]
    SymbolConflictsWithPackage { name: String, first: String },
    #[error(
        "enum value \"{name}\" conflicts with \"{first}\": enum values are siblings of their enum, not children of it"
    )]
    DuplicateEnumValueSymbol { name: String, first: String },
    #[error("extension with number {number} for message {extendee} already defined at {first}")]
    DuplicateExtension {
        extendee: String,
        number: i32,
        first: String,
    },
    #[error(
        "could not register extension: extendee \"{extendee}\" does not match package \"{package}\""
    )]
    ExtensionPackageMismatch { extendee: String, package: String },
    #[error("name '{name}' is not defined")]
    TypeNameNotFound {
        name: String,
        #[help]
        help: Option<String>,
    },
    #[error("'{name}' is not a message or enum type")]
    InvalidMessageFieldTypeName { name: String },
    #[error("'{name}' is not a message type")]
    InvalidExtendeeTypeName { name: String },
    #[error("'{name}' is not a message type")]
    InvalidMethodTypeName { name: String },
    #[error("'{name}' is a synthetic map entry message and may not be referenced explicitly")]
    SyntheticMapEntryReferenced { name: String },
    #[error("group field '{name}' must refer to a message type")]
    InvalidGroupType { name: String },
    #[error("field number {number} is out of range: must be between 1 and 536,870,911")]
    InvalidFieldNumber { number: i64 },
    #[error("field number {number} is in the range 19,000 to 19,999, which is reserved for the protobuf implementation")]
    ReservedImplementationNumber { number: i32 },
    #[error("enum value '{name}' is out of range: {number} does not fit in a 32-bit integer")]
    EnumValueOutOfRange { name: String, number: i64 },
    #[error("{kind} range {start} to {end} is invalid")]
    InvalidRange {
        kind: &'static str,
        start: i64,
        end: i64,
    },
    #[error("{second} overlaps with {first}")]
    Overlap { first: String, second: String },
    #[error("field '{name}' uses number {number}, which is already used by field '{first}'")]
    DuplicateFieldNumber {
        name: String,
        number: i32,
        first: String,
    },
    #[error("field name '{name}' is reserved")]
    ReservedFieldName { name: String },
    #[error("enum value name '{name}' is reserved")]
    ReservedEnumValueName { name: String },
    #[error("enum value '{name}' uses number {number}, which is reserved")]
    ReservedEnumValueNumber { name: String, number: i32 },
    #[error("enum value '{name}' uses number {number}, which is already used by '{first}'")]
    #[diagnostic(help("set `option allow_alias = true;` to allow aliases"))]
    DuplicateEnumNumber {
        name: String,
        number: i32,
        first: String,
    },
    #[error("enum '{name}' sets allow_alias but does not have any aliased values")]
    AllowAliasUnused { name: String },
    #[error("the '{label}' label is not allowed in {syntax}")]
    LabelNotAllowed {
        label: &'static str,
        syntax: &'static str,
        #[help]
        help: Option<&'static str>,
    },
    #[error("fields must have a label in proto2")]
    MissingLabel,
    #[error("fields in oneofs must not have labels")]
    OneofFieldWithLabel,
    #[error("map fields are not allowed in {context}")]
    MapFieldNotAllowed { context: &'static str },
    #[error("map fields cannot have labels")]
    MapFieldWithLabel,
    #[error("extensions cannot be required")]
    RequiredExtension,
    #[error("groups are not allowed in {syntax}")]
    GroupNotAllowed {
        syntax: &'static str,
        #[help]
        help: Option<&'static str>,
    },
    #[error("reserved names must be {expected} in {syntax}")]
    ReservedNameStyle {
        expected: &'static str,
        syntax: &'static str,
    },
    #[error("enum {name}: proto3 requires that first value of enum have numeric value zero")]
    Proto3EnumFirstValueNotZero { name: String },
    #[error("enum {name}: open enums require that first value of enum have numeric value zero")]
    OpenEnumFirstValueNotZero { name: String },
    #[error("default values are not allowed in {syntax}")]
    DefaultValueNotAllowed { syntax: &'static str },
    #[error("default values are not allowed on {kind} fields")]
    InvalidDefaultTarget { kind: &'static str },
    #[error("invalid default value '{value}' for field of type {ty}")]
    InvalidDefaultValue { value: String, ty: String },
    #[error("extensions in proto3 are only allowed for custom options")]
    Proto3Extension,
    #[error("field '{name}' uses closed enum '{enum_name}', which is not allowed in a proto3 message")]
    ClosedEnumInProto3 { name: String, enum_name: String },
    #[error("the JSON name of field '{name}' (\"{json_name}\") conflicts with the JSON name of field '{first}'")]
    JsonNameConflict {
        name: String,
        json_name: String,
        first: String,
    },
    #[error("json_name may not be set on extensions")]
    JsonNameOnExtension,
    #[error("enum value '{name}' conflicts with '{first}' after conversion to camel case (\"{camel_case}\")")]
    EnumValueCamelCaseConflict {
        name: String,
        first: String,
        camel_case: String,
    },
    #[error("message '{extendee}' does not declare {number} as an extension number")]
    ExtensionNumberNotInRange { extendee: String, number: i32 },
    #[error("extension '{name}' does not match its declaration at {declared_at}: {mismatch}")]
    ExtensionDeclarationMismatch {
        name: String,
        declared_at: String,
        mismatch: String,
    },
    #[error("extension number {number} of '{extendee}' has no declaration")]
    ExtensionDeclarationMissing { extendee: String, number: i32 },
    #[error("extension number {number} of '{extendee}' is reserved by its declaration at {declared_at}")]
    ExtensionDeclarationReserved {
        extendee: String,
        number: i32,
        declared_at: String,
    },
    #[error("invalid extension declaration for number {number}: {reason}")]
    InvalidExtensionDeclaration { number: i32, reason: String },
    #[error("feature '{feature}' was not introduced until edition {introduced}")]
    FeatureNotYetIntroduced { feature: String, introduced: String },
    #[error("feature '{feature}' was removed in edition {removed}")]
    FeatureRemoved { feature: String, removed: String },
    #[error("feature '{feature}' has been deprecated in edition {deprecated}: {warning}")]
    FeatureDeprecated {
        feature: String,
        deprecated: String,
        warning: String,
    },
    #[error("features are only valid under editions")]
    FeaturesInLegacySyntax,
    #[error("{reason}")]
    InvalidFeatureTarget { reason: &'static str },
    #[error("message sets {reason}")]
    InvalidMessageSet { reason: &'static str },
    #[error("the lazy options are only allowed on message fields with length-prefixed encoding")]
    InvalidLazy,
    #[error("the packed option is only allowed on repeated fields of scalar numeric types")]
    InvalidPacked,
    #[error("map_entry should not be set explicitly")]
    #[diagnostic(help("use map<KeyType, ValueType> instead"))]
    MapEntrySetExplicitly,
    #[error("'{ty}' is not a valid map key type")]
    #[diagnostic(help("map keys must be an integer, bool or string type"))]
    InvalidMapKey { ty: String },
    #[error("invalid map entry message '{name}': {reason}")]
    InvalidMapEntry { name: String, reason: &'static str },
    #[error("field '{name}' has proto3_optional set but is not the only field of a synthetic oneof")]
    InvalidProto3Optional { name: String },
    #[error("oneof '{name}' must contain at least one field")]
    EmptyOneof { name: String },
    #[error("'{name}' is not a field of '{message}'")]
    OptionUnknownField { name: String, message: String },
    #[error("extension '{name}' is not defined")]
    OptionExtensionNotFound { name: String },
    #[error("extension '{name}' extends '{extendee}', not '{expected}'")]
    OptionExtendeeMismatch {
        name: String,
        extendee: String,
        expected: String,
    },
    #[error("option '{name}' is already set")]
    OptionAlreadySet { name: String },
    #[error("option '{name}' is not a message and cannot have sub-fields")]
    OptionNotMessage { name: String },
    #[error("expected a value of type {expected} for option '{name}'")]
    OptionValueInvalidType { name: String, expected: String },
    #[error("value for option '{name}' is out of range: expected an integer between {min} and {max}")]
    OptionIntegerOutOfRange { name: String, min: i64, max: u64 },
    #[error("'{value}' is not a valid value for enum option '{name}'")]
    OptionInvalidEnumValue { name: String, value: String },
    #[error("invalid message literal for option '{name}': {reason}")]
    OptionInvalidAggregate { name: String, reason: String },
    #[error("failed to interpret option '{name}': {message}")]
    OptionInterpreterFailed { name: String, message: String },
}

impl Diagnostic {
    /// Creates a diagnostic with no position information.
    pub fn new(severity: Severity, kind: CheckError, file: impl Into<String>) -> Self {
        Diagnostic {
            kind,
            severity,
            file: file.into(),
            position: None,
            span: None,
            related_span: None,
            source_code: None,
        }
    }

    pub(crate) fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    pub(crate) fn with_span(mut self, span: SourceSpan) -> Self {
        self.span = Some(span);
        self
    }

    pub(crate) fn with_related_span(mut self, label: impl Into<String>, span: SourceSpan) -> Self {
        self.related_span = Some((label.into(), span));
        self
    }

    pub(crate) fn with_source_code(mut self, source_code: Arc<NamedSource<Arc<str>>>) -> Self {
        self.source_code = Some(source_code);
        self
    }

    /// The kind of problem.
    pub fn kind(&self) -> &CheckError {
        &self.kind
    }

    /// Whether this is an error or a warning.
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// The name of the file this diagnostic was reported for.
    pub fn file(&self) -> &str {
        &self.file
    }

    /// The position of the problem, or `None` if no source information is available.
    pub fn position(&self) -> Option<Position> {
        self.position
    }

    /// The byte offset of the problem in the file's source text, if known.
    pub fn offset(&self) -> Option<usize> {
        self.span.map(|span| span.offset())
    }

    /// The message, without file or position.
    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position {
            Some(Position { line, column }) => {
                write!(f, "{}:{}:{}: {}", self.file, line, column, self.kind)
            }
            None => write!(f, "{}: {}", self.file, self.kind),
        }
    }
}

impl fmt::Debug for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.severity, self)
    }
}

impl std::error::Error for Diagnostic {}

impl MietteDiagnostic for Diagnostic {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.kind.code()
    }

    fn severity(&self) -> Option<miette::Severity> {
        match self.severity {
            Severity::Warning => Some(miette::Severity::Warning),
            Severity::Error => Some(miette::Severity::Error),
        }
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.kind.help()
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        match &self.source_code {
            Some(source) => Some(&**source),
            None => None,
        }
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let primary = self
            .span
            .map(|span| LabeledSpan::new_with_span(None, span));
        let related = self
            .related_span
            .as_ref()
            .map(|(label, span)| LabeledSpan::new_with_span(Some(label.clone()), *span));
        if primary.is_none() && related.is_none() {
            return None;
        }
        Some(Box::new(primary.into_iter().chain(related)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_with_position() {
        let diagnostic = Diagnostic::new(
            Severity::Error,
            CheckError::Proto3EnumFirstValueNotZero {
                name: "Foo".to_owned(),
            },
            "foo.proto",
        )
        .with_position(Position { line: 1, column: 19 });

        assert_eq!(
            diagnostic.to_string(),
            "foo.proto:1:19: enum Foo: proto3 requires that first value of enum have numeric value zero"
        );
    }

    #[test]
    fn display_without_position() {
        let diagnostic = Diagnostic::new(
            Severity::Error,
            CheckError::ImportNotFound {
                name: "dep.proto".to_owned(),
            },
            "foo.proto",
        );

        assert_eq!(diagnostic.to_string(), "foo.proto: file not found: dep.proto");
        assert_eq!(diagnostic.position(), None);
    }

    #[test]
    fn miette_labels() {
        let source = Arc::new(NamedSource::new("foo.proto", Arc::<str>::from("message Foo {}")));
        let diagnostic = Diagnostic::new(
            Severity::Error,
            CheckError::DuplicateSymbol {
                name: "Foo".to_owned(),
                first: "bar.proto:1:9".to_owned(),
            },
            "foo.proto",
        )
        .with_span(SourceSpan::from(8..11))
        .with_source_code(source);

        let labels: Vec<_> = MietteDiagnostic::labels(&diagnostic).unwrap().collect();
        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].offset(), 8);
        assert!(MietteDiagnostic::source_code(&diagnostic).is_some());
    }
}
