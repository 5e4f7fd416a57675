//! The declaration tree produced by a protobuf parser, as consumed by the linker.
//!
//! Every node carries the byte range it was parsed from. Spans are only used to
//! attribute diagnostics, so a tree built without real source text may use empty
//! spans.

use std::{fmt, ops::Range};

pub type Span = Range<usize>;

#[derive(Clone, Debug, PartialEq)]
pub struct File {
    pub syntax: Syntax,
    pub syntax_span: Option<Span>,
    pub package: Option<Package>,
    pub imports: Vec<Import>,
    pub options: Vec<OptionBody>,
    pub items: Vec<FileItem>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum Syntax {
    #[default]
    Proto2,
    Proto3,
    Edition(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ident {
    pub value: String,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FullIdent {
    pub parts: Vec<Ident>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeName {
    pub leading_dot: Option<Span>,
    pub name: FullIdent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Int {
    pub negative: bool,
    pub value: u64,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Float {
    pub value: f64,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StringLit {
    pub value: Vec<u8>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Package {
    pub name: FullIdent,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Import {
    pub kind: Option<ImportKind>,
    pub value: String,
    pub value_span: Span,
    pub span: Span,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ImportKind {
    Weak,
    Public,
}

#[derive(Clone, Debug, PartialEq)]
pub enum FileItem {
    Message(Message),
    Enum(Enum),
    Extend(Extend),
    Service(Service),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    pub name: Ident,
    pub body: MessageBody,
    pub span: Span,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MessageBody {
    pub items: Vec<MessageItem>,
    pub extensions: Vec<Extensions>,
    pub reserved: Vec<Reserved>,
    pub options: Vec<OptionBody>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum MessageItem {
    Field(Field),
    Message(Message),
    Enum(Enum),
    Extend(Extend),
    Oneof(Oneof),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub label: Option<(FieldLabel, Span)>,
    pub name: Ident,
    pub kind: FieldKind,
    pub number: Int,
    pub options: Vec<OptionBody>,
    pub span: Span,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FieldLabel {
    Required,
    Optional,
    Repeated,
}

#[derive(Clone, Debug, PartialEq)]
pub enum FieldKind {
    Normal {
        ty: Ty,
        ty_span: Span,
    },
    Group {
        ty_span: Span,
        body: MessageBody,
    },
    Map {
        ty_span: Span,
        key_ty: Ty,
        key_ty_span: Span,
        value_ty: Ty,
        value_ty_span: Span,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Ty {
    Double,
    Float,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Bool,
    String,
    Bytes,
    Named(TypeName),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Oneof {
    pub name: Ident,
    pub fields: Vec<Field>,
    pub options: Vec<OptionBody>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Extend {
    pub extendee: TypeName,
    pub fields: Vec<Field>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Extensions {
    pub ranges: Vec<ReservedRange>,
    pub options: Vec<OptionBody>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reserved {
    pub kind: ReservedKind,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReservedKind {
    Ranges(Vec<ReservedRange>),
    Names(Vec<ReservedName>),
}

/// A reserved name, written either as an identifier (editions) or a string literal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReservedName {
    Ident(Ident),
    String(Ident),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReservedRange {
    pub start: Int,
    pub end: ReservedRangeEnd,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReservedRangeEnd {
    None,
    Int(Int),
    Max(Span),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Enum {
    pub name: Ident,
    pub values: Vec<EnumValue>,
    pub options: Vec<OptionBody>,
    pub reserved: Vec<Reserved>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EnumValue {
    pub name: Ident,
    pub number: Int,
    pub options: Vec<OptionBody>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Service {
    pub name: Ident,
    pub methods: Vec<Method>,
    pub options: Vec<OptionBody>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Method {
    pub name: Ident,
    pub input_ty: TypeName,
    pub output_ty: TypeName,
    pub client_streaming: Option<Span>,
    pub server_streaming: Option<Span>,
    pub options: Vec<OptionBody>,
    pub span: Span,
}

/// An `option` statement, or one entry of a compact `[...]` option list.
#[derive(Clone, Debug, PartialEq)]
pub struct OptionBody {
    pub name: Vec<OptionNamePart>,
    pub value: OptionValue,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OptionNamePart {
    Ident(Ident),
    Extension(TypeName, Span),
}

#[derive(Clone, Debug, PartialEq)]
pub enum OptionValue {
    Ident(Ident),
    Int(Int),
    Float(Float),
    String(StringLit),
    /// The text of a message literal, without the enclosing braces.
    Aggregate(String, Span),
}

impl Ident {
    pub fn new(value: impl Into<String>, span: Span) -> Self {
        Ident {
            value: value.into(),
            span,
        }
    }
}

impl FullIdent {
    /// Splits a dotted name into parts, all sharing the given span.
    pub fn parse(name: &str, span: Span) -> Self {
        FullIdent {
            parts: name
                .split('.')
                .map(|part| Ident::new(part, span.clone()))
                .collect(),
        }
    }

    pub fn span(&self) -> Span {
        match (self.parts.first(), self.parts.last()) {
            (Some(first), Some(last)) => first.span.start..last.span.end,
            _ => 0..0,
        }
    }
}

impl TypeName {
    /// Parses a possibly fully-qualified type name like `.foo.Bar`.
    pub fn parse(name: &str, span: Span) -> Self {
        match name.strip_prefix('.') {
            Some(rest) => TypeName {
                leading_dot: Some(span.start..span.start + 1),
                name: FullIdent::parse(rest, span.start + 1..span.end),
            },
            None => TypeName {
                leading_dot: None,
                name: FullIdent::parse(name, span),
            },
        }
    }

    pub fn span(&self) -> Span {
        match &self.leading_dot {
            Some(dot) => dot.start..self.name.span().end,
            None => self.name.span(),
        }
    }
}

impl Int {
    pub fn new(value: i64, span: Span) -> Self {
        Int {
            negative: value < 0,
            value: value.unsigned_abs(),
            span,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        if self.negative {
            0i64.checked_sub_unsigned(self.value)
        } else {
            i64::try_from(self.value).ok()
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        self.as_i64().and_then(|value| i32::try_from(value).ok())
    }
}

impl Ty {
    pub fn named(name: &str, span: Span) -> Self {
        Ty::Named(TypeName::parse(name, span))
    }
}

impl OptionBody {
    /// Creates an option with a single plain name part.
    pub fn new(name: &str, value: OptionValue, span: Span) -> Self {
        OptionBody {
            name: name
                .split('.')
                .map(|part| OptionNamePart::Ident(Ident::new(part, span.clone())))
                .collect(),
            value,
            span,
        }
    }
}

impl fmt::Display for Syntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Syntax::Proto2 => write!(f, "proto2"),
            Syntax::Proto3 => write!(f, "proto3"),
            Syntax::Edition(edition) => write!(f, "edition {}", edition),
        }
    }
}

impl fmt::Display for FullIdent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, part) in self.parts.iter().enumerate() {
            if index != 0 {
                f.write_str(".")?;
            }
            f.write_str(&part.value)?;
        }
        Ok(())
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.leading_dot.is_some() {
            f.write_str(".")?;
        }
        self.name.fmt(f)
    }
}

impl fmt::Display for OptionNamePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionNamePart::Ident(ident) => f.write_str(&ident.value),
            OptionNamePart::Extension(name, _) => write!(f, "({})", name),
        }
    }
}
