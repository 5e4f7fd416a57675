//! Linking of a single file against its already linked dependencies.
//!
//! Linking runs in stages. Parsed files are first lowered to a `FileDescriptorProto`. The
//! names it declares are then indexed and registered in the [`SymbolTable`], after which every
//! type name is resolved using the scoping rules of protoc. Finally options are interpreted and
//! the linked file is validated.

pub(crate) mod features;
mod generate;
mod options;
mod resolve;
mod schema;
mod text_format;

#[cfg(test)]
mod tests;

use std::{
    collections::{HashMap, HashSet},
    sync::atomic::AtomicBool,
};

use tracing::debug;

pub use self::{
    options::{CustomOption, OptionInterpreter, RetainUninterpreted},
    resolve::Resolver,
};
use self::resolve::{NameResolver, Resolved, Target};
use crate::{
    ast,
    case::to_pascal_case,
    descriptor::{index::Index, DefinitionKind, FileDescriptor, FileInner, TypeRef},
    diagnostic::{CheckError, Diagnostic, Reporter, Severity},
    index_to_i32,
    source::SourceMap,
    symbols::{FileSymbols, SymbolEntry, SymbolTable},
    tag,
    types::{
        field_descriptor_proto::{Label, Type},
        DescriptorProto, Edition, FieldDescriptorProto, FileDescriptorProto,
        MethodDescriptorProto,
    },
    validate, Error,
};

/// A file which is ready to be linked.
#[derive(Debug, Clone)]
pub enum LinkInput {
    /// A parsed file, with its source text if available.
    Ast {
        ast: ast::File,
        source: Option<String>,
    },
    /// A descriptor, whose type names may still be relative.
    Descriptor(FileDescriptorProto),
}

/// Links a file against its direct imports.
///
/// Every dependency must already be linked. The symbols of the file are registered in
/// `symbols`, and problems are passed to `reporter`. If the reporter accepts every error, the
/// linked file is returned even if it has errors, as reported by
/// [`FileDescriptor::has_errors`]. Custom options are left uninterpreted.
///
/// Diagnostics are passed to `reporter` as soon as each stage finds them, so they are not in
/// source order. [`Compiler::compile`](crate::Compiler::compile) sorts them by position.
pub fn link(
    name: &str,
    input: LinkInput,
    dependencies: &[FileDescriptor],
    symbols: &SymbolTable,
    reporter: &dyn Reporter,
) -> Result<FileDescriptor, Error> {
    link_file(LinkRequest {
        name,
        input,
        dependencies,
        import_errors: &HashMap::new(),
        symbols,
        interpreter: &RetainUninterpreted,
        reporter,
        cancelled: &|| false,
    })
}

pub(crate) struct LinkRequest<'a> {
    pub name: &'a str,
    pub input: LinkInput,
    pub dependencies: &'a [FileDescriptor],
    /// Why imports missing from `dependencies` could not be loaded, if known.
    pub import_errors: &'a HashMap<String, CheckError>,
    pub symbols: &'a SymbolTable,
    pub interpreter: &'a dyn OptionInterpreter,
    pub reporter: &'a dyn Reporter,
    /// Polled between stages. Once it returns `true` linking stops with a cancellation error.
    pub cancelled: &'a dyn Fn() -> bool,
}

/// Forwards diagnostics to a reporter, counting errors.
pub(crate) struct Sink<'a> {
    reporter: &'a dyn Reporter,
    errors: usize,
}

impl<'a> Sink<'a> {
    pub fn new(reporter: &'a dyn Reporter) -> Self {
        Sink {
            reporter,
            errors: 0,
        }
    }

    pub fn report(&mut self, diagnostic: Diagnostic) -> Result<(), Error> {
        match diagnostic.severity() {
            Severity::Error => {
                self.errors += 1;
                self.reporter.error(&diagnostic)
            }
            Severity::Warning => {
                self.reporter.warning(&diagnostic);
                Ok(())
            }
        }
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }
}

pub(crate) fn link_file(request: LinkRequest<'_>) -> Result<FileDescriptor, Error> {
    let LinkRequest {
        name,
        input,
        dependencies,
        import_errors,
        symbols,
        interpreter,
        reporter,
        cancelled,
    } = request;
    let mut sink = Sink::new(reporter);
    let checkpoint = |stage: &str| {
        if cancelled() {
            debug!(file = name, stage, "cancelled");
            Err(Error::cancelled())
        } else {
            Ok(())
        }
    };

    let (mut proto, mut source, from_source) = match input {
        LinkInput::Ast { ast, source } => {
            let generated = generate::generate(name, &ast);
            let source_map = SourceMap::from_spans(name, source.as_deref(), generated.spans);
            for (err, span) in generated.errors {
                sink.report(source_map.diagnostic_at(Severity::Error, err, span))?;
            }
            (generated.file, source_map, true)
        }
        LinkInput::Descriptor(mut proto) => {
            let source_map = SourceMap::from_source_code_info(name, proto.source_code_info.as_ref());
            proto.name = Some(name.to_owned());
            (proto, source_map, false)
        }
    };
    debug!(file = name, "generated descriptor");
    checkpoint("generated")?;

    let edition = match file_edition(&proto) {
        Ok(edition) => edition,
        Err((err, path, fallback)) => {
            sink.report(source.diagnostic(Severity::Error, err, &path))?;
            fallback
        }
    };

    let imports = check_imports(&proto, dependencies, import_errors, &source, &mut sink)?;
    import_dependencies(symbols, &imports, &mut sink)?;

    let index = Index::build(&proto);
    symbols.import_symbols(
        &FileSymbols {
            name,
            index: &index,
            source: &source,
        },
        &mut |diagnostic| sink.report(diagnostic),
    )?;
    debug!(file = name, symbols = index.declarations.len(), "registered symbols");
    checkpoint("symbols")?;

    let resolver = NameResolver::new(name, &index, &imports, Some(symbols));
    let types = TypeResolver {
        proto: &mut proto,
        index: &index,
        resolver: &resolver,
        source: &source,
        sink: &mut sink,
    }
    .resolve()?;
    register_extensions(name, &proto, &index, &types, symbols, &source, &mut sink)?;
    debug!(file = name, "resolved type names");
    checkpoint("types")?;

    let draft = FileDescriptor::from_inner(FileInner {
        proto: proto.clone(),
        edition,
        dependencies: imports.clone(),
        index: Index::build(&proto),
        field_types: types.field_types.clone(),
        extension_types: types.extension_types.clone(),
        extendees: types.extendees.clone(),
        method_types: types.method_types.clone(),
        source: SourceMap::empty(name),
        has_errors: AtomicBool::new(false),
    });
    let interpreted = options::interpret(&mut proto, &draft, &resolver, interpreter);
    for (path, severity, err) in interpreted.errors {
        sink.report(source.diagnostic(severity, err, &path))?;
    }
    source.remap(&interpreted.moves);
    debug!(file = name, "interpreted options");
    checkpoint("options")?;

    let used_imports = resolver.used_imports();
    drop(resolver);

    if from_source {
        proto.source_code_info = source.to_source_code_info();
    }

    let unused: Vec<(usize, String)> = if from_source {
        unused_imports(&proto, &imports, &used_imports)
    } else {
        Vec::new()
    };

    let file = FileDescriptor::from_inner(FileInner {
        proto,
        edition,
        dependencies: imports,
        index,
        field_types: types.field_types,
        extension_types: types.extension_types,
        extendees: types.extendees,
        method_types: types.method_types,
        source,
        has_errors: AtomicBool::new(false),
    });

    validate::validate(&file, from_source, &mut |diagnostic| sink.report(diagnostic))?;
    debug!(file = name, "validated");
    checkpoint("validated")?;

    for (i, dependency) in unused {
        sink.report(file.source().diagnostic(
            Severity::Warning,
            CheckError::UnusedImport { name: dependency },
            &[tag::file::DEPENDENCY, index_to_i32(i)],
        ))?;
    }

    if sink.has_errors() {
        file.set_has_errors();
    }
    symbols.publish(file.clone());
    debug!(file = name, has_errors = file.has_errors(), "linked");
    Ok(file)
}

/// Determines the edition of a file from its `syntax` and `edition` fields.
///
/// On error, returns the problem, where it was found, and the edition to continue with.
fn file_edition(proto: &FileDescriptorProto) -> Result<Edition, (CheckError, Vec<i32>, Edition)> {
    match proto.syntax.as_deref() {
        None | Some("") | Some("proto2") => Ok(Edition::Proto2),
        Some("proto3") => Ok(Edition::Proto3),
        Some("editions") => {
            let edition = proto.edition();
            if edition >= Edition::Edition2023 && features::SUPPORTED_EDITIONS.contains(&edition) {
                Ok(edition)
            } else {
                Err((
                    CheckError::UnsupportedEdition {
                        edition: features::edition_name(edition).to_owned(),
                    },
                    vec![tag::file::EDITION],
                    Edition::Edition2023,
                ))
            }
        }
        Some(syntax) => Err((
            CheckError::UnknownSyntax {
                syntax: syntax.to_owned(),
            },
            vec![tag::file::SYNTAX],
            Edition::Proto2,
        )),
    }
}

/// Matches the imports of a file with the dependencies which were loaded, reporting imports
/// which are listed twice or could not be loaded.
fn check_imports(
    proto: &FileDescriptorProto,
    dependencies: &[FileDescriptor],
    import_errors: &HashMap<String, CheckError>,
    source: &SourceMap,
    sink: &mut Sink<'_>,
) -> Result<Vec<FileDescriptor>, Error> {
    let mut seen = HashSet::new();
    let mut imports = Vec::with_capacity(proto.dependency.len());
    for (i, import) in proto.dependency.iter().enumerate() {
        let path = [tag::file::DEPENDENCY, index_to_i32(i)];
        if !seen.insert(import.as_str()) {
            sink.report(source.diagnostic(
                Severity::Error,
                CheckError::DuplicateImport {
                    name: import.clone(),
                },
                &path,
            ))?;
            continue;
        }

        match dependencies.iter().find(|file| file.name() == import) {
            Some(file) => imports.push(file.clone()),
            None => {
                let err = import_errors
                    .get(import)
                    .cloned()
                    .unwrap_or_else(|| CheckError::ImportNotFound {
                        name: import.clone(),
                    });
                sink.report(source.diagnostic(Severity::Error, err, &path))?;
            }
        }
    }
    Ok(imports)
}

/// Registers the symbols of every file reachable from `imports`. Files which were already
/// registered are skipped.
fn import_dependencies(
    symbols: &SymbolTable,
    imports: &[FileDescriptor],
    sink: &mut Sink<'_>,
) -> Result<(), Error> {
    let mut seen = HashSet::new();
    let mut stack: Vec<FileDescriptor> = imports.to_vec();
    while let Some(file) = stack.pop() {
        if !seen.insert(file.name().to_owned()) {
            continue;
        }
        symbols.import_symbols(
            &FileSymbols {
                name: file.name(),
                index: file.index(),
                source: file.source(),
            },
            &mut |diagnostic| sink.report(diagnostic),
        )?;
        stack.extend(file.dependencies());
    }
    Ok(())
}

/// The non-public imports which provided no names used by the file.
fn unused_imports(
    proto: &FileDescriptorProto,
    imports: &[FileDescriptor],
    used: &HashSet<String>,
) -> Vec<(usize, String)> {
    proto
        .dependency
        .iter()
        .enumerate()
        .filter(|(i, _)| !proto.public_dependency.contains(&index_to_i32(*i)))
        .filter(|(_, name)| imports.iter().any(|file| file.name() == name.as_str()))
        .filter(|(_, name)| !used.contains(name.as_str()))
        .map(|(i, name)| (i, name.clone()))
        .collect()
}

/// The resolved type references of a file, indexed like the elements of its [`Index`].
struct ResolvedTypes {
    field_types: Vec<Option<TypeRef>>,
    extension_types: Vec<Option<TypeRef>>,
    extendees: Vec<Option<TypeRef>>,
    method_types: Vec<(Option<TypeRef>, Option<TypeRef>)>,
}

/// Resolves the type names of fields, extendees and methods, and rewrites them as
/// fully-qualified names.
struct TypeResolver<'a, 'b> {
    proto: &'a mut FileDescriptorProto,
    index: &'a Index,
    resolver: &'a NameResolver<'a>,
    source: &'a SourceMap,
    sink: &'a mut Sink<'b>,
}

/// What was found for a type name, before it is written back to the descriptor.
enum Lookup {
    Found(Resolved),
    Invalid(CheckError),
}

impl<'a, 'b> TypeResolver<'a, 'b> {
    fn resolve(mut self) -> Result<ResolvedTypes, Error> {
        let index = self.index;

        let mut field_types = Vec::with_capacity(index.fields.len());
        for field in &index.fields {
            let scope = field
                .parent
                .map_or(index.package.as_str(), |parent| &index.messages[parent].full_name);
            field_types.push(self.resolve_field_type(&field.path, scope, field.parent, false)?);
        }

        let mut extension_types = Vec::with_capacity(index.extensions.len());
        let mut extendees = Vec::with_capacity(index.extensions.len());
        for extension in &index.extensions {
            let scope = extension
                .parent
                .map_or(index.package.as_str(), |parent| &index.messages[parent].full_name);
            extendees.push(self.resolve_extendee(&extension.path, scope)?);
            extension_types.push(self.resolve_field_type(
                &extension.path,
                scope,
                extension.parent,
                true,
            )?);
        }

        let mut method_types = Vec::with_capacity(index.methods.len());
        for method in &index.methods {
            let scope = &index.services[method.parent].full_name;
            let input = self.resolve_method_type(&method.path, scope, tag::method::INPUT_TYPE)?;
            let output = self.resolve_method_type(&method.path, scope, tag::method::OUTPUT_TYPE)?;
            method_types.push((input, output));
        }

        Ok(ResolvedTypes {
            field_types,
            extension_types,
            extendees,
            method_types,
        })
    }

    fn resolve_field_type(
        &mut self,
        path: &[i32],
        scope: &str,
        parent: Option<usize>,
        is_extension: bool,
    ) -> Result<Option<TypeRef>, Error> {
        let field = field_mut(self.proto, path);
        let type_name = match field.type_name.as_deref() {
            Some(type_name) if !type_name.is_empty() => type_name.to_owned(),
            _ => return Ok(None),
        };
        let field_name = field.name().to_owned();
        let declared = field.r#type.and_then(|ty| Type::try_from(ty).ok());
        let label = field.label();

        let lookup = match self.resolver.lookup(scope, &type_name, true) {
            Err(err) => Lookup::Invalid(err),
            Ok(resolved) => match (resolved.kind, declared) {
                (DefinitionKind::Enum, Some(Type::Group)) => {
                    Lookup::Invalid(CheckError::InvalidGroupType { name: field_name.clone() })
                }
                (DefinitionKind::Message, _) if !is_extension => {
                    match self.check_map_entry(&resolved, parent, label, &field_name) {
                        Some(err) => Lookup::Invalid(err),
                        None => Lookup::Found(resolved),
                    }
                }
                (DefinitionKind::Message | DefinitionKind::Enum, _) => Lookup::Found(resolved),
                _ => Lookup::Invalid(CheckError::InvalidMessageFieldTypeName {
                    name: type_name.clone(),
                }),
            },
        };

        let resolved = match lookup {
            Lookup::Found(resolved) => resolved,
            Lookup::Invalid(err) => {
                self.error(err, &join(path, tag::field::TYPE_NAME))?;
                return Ok(None);
            }
        };

        let field = field_mut(self.proto, path);
        field.type_name = Some(format!(".{}", resolved.full_name));
        if declared != Some(Type::Group) {
            let ty = if resolved.kind == DefinitionKind::Enum {
                Type::Enum
            } else {
                Type::Message
            };
            field.r#type = Some(ty as i32);
        }
        Ok(Some(type_ref(&resolved)))
    }

    /// Map entry messages may only be used by the map field they were generated for.
    fn check_map_entry(
        &self,
        resolved: &Resolved,
        parent: Option<usize>,
        label: Label,
        field_name: &str,
    ) -> Option<CheckError> {
        let is_map_entry = match &resolved.target {
            Target::Local(index) => self.index.messages[*index].is_map_entry,
            Target::Dependency(file, index) => file.index().messages[*index].is_map_entry,
        };
        if !is_map_entry {
            return None;
        }

        let entry_name = resolved
            .full_name
            .rsplit('.')
            .next()
            .unwrap_or(&resolved.full_name);
        let is_own_entry = matches!(resolved.target, Target::Local(index) if self.index.messages[index].parent == parent && parent.is_some())
            && label == Label::Repeated
            && entry_name == format!("{}Entry", to_pascal_case(field_name));
        if is_own_entry {
            None
        } else {
            Some(CheckError::SyntheticMapEntryReferenced {
                name: resolved.full_name.clone(),
            })
        }
    }

    fn resolve_extendee(&mut self, path: &[i32], scope: &str) -> Result<Option<TypeRef>, Error> {
        let field = field_mut(self.proto, path);
        let extendee = match field.extendee.as_deref() {
            Some(extendee) if !extendee.is_empty() => extendee.to_owned(),
            _ => return Ok(None),
        };

        let resolved = match self.resolver.lookup(scope, &extendee, false) {
            Ok(resolved) if resolved.kind == DefinitionKind::Message => resolved,
            Ok(_) => {
                self.error(
                    CheckError::InvalidExtendeeTypeName { name: extendee },
                    &join(path, tag::field::EXTENDEE),
                )?;
                return Ok(None);
            }
            Err(err) => {
                self.error(err, &join(path, tag::field::EXTENDEE))?;
                return Ok(None);
            }
        };

        field_mut(self.proto, path).extendee = Some(format!(".{}", resolved.full_name));
        Ok(Some(type_ref(&resolved)))
    }

    fn resolve_method_type(
        &mut self,
        path: &[i32],
        scope: &str,
        field_tag: i32,
    ) -> Result<Option<TypeRef>, Error> {
        let method = method_mut(self.proto, path);
        let type_name = if field_tag == tag::method::INPUT_TYPE {
            method.input_type.clone()
        } else {
            method.output_type.clone()
        };
        let type_name = match type_name {
            Some(type_name) if !type_name.is_empty() => type_name,
            _ => return Ok(None),
        };

        let resolved = match self.resolver.lookup(scope, &type_name, false) {
            Ok(resolved) if resolved.kind == DefinitionKind::Message => resolved,
            Ok(_) => {
                self.error(
                    CheckError::InvalidMethodTypeName { name: type_name },
                    &join(path, field_tag),
                )?;
                return Ok(None);
            }
            Err(err) => {
                self.error(err, &join(path, field_tag))?;
                return Ok(None);
            }
        };

        let full_name = Some(format!(".{}", resolved.full_name));
        let method = method_mut(self.proto, path);
        if field_tag == tag::method::INPUT_TYPE {
            method.input_type = full_name;
        } else {
            method.output_type = full_name;
        }
        Ok(Some(type_ref(&resolved)))
    }

    fn error(&mut self, err: CheckError, path: &[i32]) -> Result<(), Error> {
        self.sink
            .report(self.source.diagnostic(Severity::Error, err, path))
    }
}

/// Records the number of every extension with a resolved extendee in the symbol table, so
/// conflicting extensions in different files are detected.
fn register_extensions(
    name: &str,
    proto: &FileDescriptorProto,
    index: &Index,
    types: &ResolvedTypes,
    symbols: &SymbolTable,
    source: &SourceMap,
    sink: &mut Sink<'_>,
) -> Result<(), Error> {
    for (extension, extendee) in index.extensions.iter().zip(&types.extendees) {
        let extendee = match extendee {
            Some(extendee) => extendee,
            None => continue,
        };
        let package = match &extendee.file {
            Some(file) => file.package(),
            None => proto.package(),
        };
        let field = field_proto(proto, &extension.path);
        let entry = SymbolEntry {
            kind: DefinitionKind::Extension,
            file: name.to_owned(),
            location: source.describe(&extension.path),
        };
        if let Err(err) = symbols.add_extension(package, field.extendee(), field.number(), entry) {
            sink.report(source.diagnostic(
                Severity::Error,
                err,
                &join(&extension.path, tag::field::NUMBER),
            ))?;
        }
    }
    Ok(())
}

fn type_ref(resolved: &Resolved) -> TypeRef {
    match &resolved.target {
        Target::Local(index) => TypeRef {
            file: None,
            kind: resolved.kind,
            index: *index,
        },
        Target::Dependency(file, index) => TypeRef {
            file: Some(file.clone()),
            kind: resolved.kind,
            index: *index,
        },
    }
}

fn join(path: &[i32], tag: i32) -> Vec<i32> {
    let mut path = path.to_vec();
    path.push(tag);
    path
}

fn path_index(index: i32) -> usize {
    usize::try_from(index).unwrap_or_default()
}

fn message_mut<'a>(file: &'a mut FileDescriptorProto, path: &[i32]) -> &'a mut DescriptorProto {
    let mut message = &mut file.message_type[path_index(path[1])];
    for pair in path[2..].chunks(2) {
        message = &mut message.nested_type[path_index(pair[1])];
    }
    message
}

/// Finds the field or extension at `path`, which must come from the index of `file`.
fn field_mut<'a>(file: &'a mut FileDescriptorProto, path: &[i32]) -> &'a mut FieldDescriptorProto {
    let (parent, last) = path.split_at(path.len() - 2);
    let index = path_index(last[1]);
    if parent.is_empty() {
        &mut file.extension[index]
    } else if last[0] == tag::message::FIELD {
        &mut message_mut(file, parent).field[index]
    } else {
        &mut message_mut(file, parent).extension[index]
    }
}

fn field_proto<'a>(file: &'a FileDescriptorProto, path: &[i32]) -> &'a FieldDescriptorProto {
    let (parent, last) = path.split_at(path.len() - 2);
    let index = path_index(last[1]);
    if parent.is_empty() {
        &file.extension[index]
    } else {
        let message = crate::descriptor::message_proto(file, parent);
        if last[0] == tag::message::FIELD {
            &message.field[index]
        } else {
            &message.extension[index]
        }
    }
}

fn method_mut<'a>(file: &'a mut FileDescriptorProto, path: &[i32]) -> &'a mut MethodDescriptorProto {
    &mut file.service[path_index(path[1])].method[path_index(path[3])]
}
