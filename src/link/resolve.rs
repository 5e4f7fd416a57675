//! Scoped name lookup, as seen from inside one file.

use std::{cell::RefCell, collections::HashSet};

use tracing::trace;

use crate::{
    descriptor::{index::Index, DefinitionKind, ExtensionDescriptor, FileDescriptor, Symbol},
    diagnostic::CheckError,
    make_name,
    symbols::SymbolTable,
};

/// Where a resolved name is defined.
#[derive(Debug, Clone)]
pub(crate) enum Target {
    Local(usize),
    Dependency(FileDescriptor, usize),
}

#[derive(Debug, Clone)]
pub(crate) struct Resolved {
    pub kind: DefinitionKind,
    /// The fully-qualified name, without a leading dot.
    pub full_name: String,
    pub target: Target,
}

/// Resolves names used in a file which is being linked.
pub(crate) struct NameResolver<'a> {
    name: &'a str,
    local: &'a Index,
    visible: Vec<FileDescriptor>,
    /// For each visible file, the direct import it is visible through.
    origins: Vec<String>,
    transitive: Vec<FileDescriptor>,
    symbols: Option<&'a SymbolTable>,
    used: RefCell<HashSet<String>>,
}

impl<'a> NameResolver<'a> {
    pub fn new(
        name: &'a str,
        local: &'a Index,
        dependencies: &[FileDescriptor],
        symbols: Option<&'a SymbolTable>,
    ) -> Self {
        let (visible, origins) = visible_with_origins(dependencies);
        NameResolver {
            name,
            local,
            visible,
            origins,
            transitive: transitive_files(dependencies),
            symbols,
            used: RefCell::default(),
        }
    }

    /// The direct imports which provided at least one name found so far.
    pub fn used_imports(&self) -> HashSet<String> {
        self.used.borrow().clone()
    }

    /// Looks up a fully-qualified name, without a leading dot.
    pub fn find(&self, full_name: &str) -> Option<Resolved> {
        if let Some(definition) = self.local.get(full_name) {
            return Some(Resolved {
                kind: definition.kind,
                full_name: full_name.to_owned(),
                target: Target::Local(definition.index),
            });
        }

        for (file, origin) in self.visible.iter().zip(&self.origins) {
            if let Some(definition) = file.index().get(full_name) {
                // Any file in a package declares it, so finding one says nothing about the import.
                if definition.kind != DefinitionKind::Package {
                    self.used.borrow_mut().insert(origin.clone());
                }
                return Some(Resolved {
                    kind: definition.kind,
                    full_name: full_name.to_owned(),
                    target: Target::Dependency(file.clone(), definition.index),
                });
            }
        }

        None
    }

    /// Resolves a name relative to `scope`, searching the innermost scope first.
    ///
    /// If `types_only` is set, a simple name which resolves to something other than a message
    /// or enum is skipped and the search continues in the enclosing scope.
    pub fn lookup(&self, scope: &str, name: &str, types_only: bool) -> Result<Resolved, CheckError> {
        let result = self.lookup_inner(scope, name, types_only);
        trace!(
            file = self.name,
            scope,
            name,
            resolved = result.as_ref().map(|r| r.full_name.as_str()).unwrap_or(""),
            "resolved name"
        );
        result
    }

    fn lookup_inner(
        &self,
        scope: &str,
        name: &str,
        types_only: bool,
    ) -> Result<Resolved, CheckError> {
        if let Some(full_name) = name.strip_prefix('.') {
            return self
                .find(full_name)
                .ok_or_else(|| self.not_found(name, std::iter::once(full_name.to_owned())));
        }

        let first_part = name.split('.').next().unwrap_or(name);
        let is_compound = first_part.len() < name.len();

        let mut tried = Vec::new();
        let mut scope = scope;
        loop {
            let candidate = make_name(scope, first_part);
            if let Some(found) = self.find(&candidate) {
                if is_compound {
                    if found.kind.is_aggregate() {
                        let full_name = make_name(scope, name);
                        return match self.find(&full_name) {
                            Some(found) => Ok(found),
                            None => Err(CheckError::TypeNameNotFound {
                                name: name.to_owned(),
                                help: Some(format!(
                                    "'{}' is resolved to '{}', which is not defined. The innermost scope is searched first in name resolution. Consider using a leading '.' (i.e., '.{}') to start from the outermost scope.",
                                    name, full_name, name
                                )),
                            }),
                        };
                    }
                } else if !types_only || found.kind.is_type() {
                    return Ok(found);
                }
            }
            tried.push(make_name(scope, name));

            if scope.is_empty() {
                break;
            }
            scope = match scope.rfind('.') {
                Some(dot) => &scope[..dot],
                None => "",
            };
        }

        Err(self.not_found(name, tried.into_iter()))
    }

    /// Resolves an extension name used after the first part of an option name, or as a `[key]`
    /// in a message literal. Only the package of the file and the root are searched.
    pub fn lookup_extension_relative(&self, name: &str) -> Result<Resolved, CheckError> {
        if let Some(full_name) = name.strip_prefix('.') {
            return self
                .find(full_name)
                .ok_or_else(|| self.not_found(name, std::iter::once(full_name.to_owned())));
        }

        let relative = make_name(&self.local.package, name);
        if let Some(found) = self.find(&relative) {
            return Ok(found);
        }
        self.find(name)
            .ok_or_else(|| self.not_found(name, [relative, name.to_owned()].into_iter()))
    }

    fn not_found(&self, name: &str, tried: impl Iterator<Item = String>) -> CheckError {
        let mut help = None;
        for candidate in tried {
            if let Some(file) = self
                .transitive
                .iter()
                .find(|file| file.index().get(&candidate).is_some())
            {
                help = Some(format!(
                    "'{}' is defined in '{}', which is not imported by '{}'",
                    candidate,
                    file.name(),
                    self.name
                ));
                break;
            }

            if let Some(entry) = self
                .symbols
                .and_then(|symbols| symbols.lookup(&candidate))
                .filter(|entry| entry.kind != DefinitionKind::Package && entry.file != self.name)
            {
                help = Some(format!(
                    "'{}' is defined in '{}', which is not imported by '{}'",
                    candidate, entry.file, self.name
                ));
                break;
            }
        }

        CheckError::TypeNameNotFound {
            name: name.to_owned(),
            help,
        }
    }
}

/// Answers name lookups against a linked file, with the same visibility rules used while
/// linking it.
#[derive(Debug, Clone)]
pub struct Resolver<'a> {
    file: FileDescriptor,
    symbols: Option<&'a SymbolTable>,
}

impl<'a> Resolver<'a> {
    pub fn new(file: &FileDescriptor) -> Self {
        Resolver {
            file: file.clone(),
            symbols: None,
        }
    }

    /// Also consults the extensions registered in `symbols` by other files of the compilation.
    pub fn with_symbols(mut self, symbols: &'a SymbolTable) -> Self {
        self.symbols = Some(symbols);
        self
    }

    /// Resolves a message or enum name used in `scope`, which is a fully-qualified message name
    /// or a package name.
    pub fn find_type(&self, scope: &str, name: &str) -> Result<Symbol, CheckError> {
        self.find(scope, name, true)
    }

    /// Resolves any kind of name used in `scope`.
    pub fn find_symbol(&self, scope: &str, name: &str) -> Result<Symbol, CheckError> {
        self.find(scope, name, false)
    }

    fn find(&self, scope: &str, name: &str, types_only: bool) -> Result<Symbol, CheckError> {
        let dependencies: Vec<_> = self.file.dependencies().collect();
        let resolver = NameResolver::new(
            self.file.name(),
            self.file.index(),
            &dependencies,
            self.symbols,
        );
        let resolved = resolver.lookup(scope.trim_start_matches('.'), name, types_only)?;
        Ok(match resolved.target {
            Target::Local(index) => self.file.symbol(resolved.kind, index, &resolved.full_name),
            Target::Dependency(file, index) => file.symbol(resolved.kind, index, &resolved.full_name),
        })
    }

    /// Finds the extension with a number of a message, declared in this file, a file visible
    /// to it, or any other file registered in the symbol table.
    pub fn find_extension(&self, extendee: &str, number: u32) -> Option<ExtensionDescriptor> {
        let extendee = extendee.trim_start_matches('.');
        let matches = |extension: &ExtensionDescriptor| {
            extension.number() == number
                && extension
                    .field_descriptor_proto()
                    .extendee()
                    .trim_start_matches('.')
                    == extendee
        };

        if let Some(extension) = self.file.all_extensions().find(matches) {
            return Some(extension);
        }
        let dependencies: Vec<_> = self.file.dependencies().collect();
        for file in visible_files(&dependencies) {
            if let Some(extension) = file.all_extensions().find(matches) {
                return Some(extension);
            }
        }

        let entry = self
            .symbols?
            .find_extension(extendee, i32::try_from(number).ok()?)?;
        let file = self.symbols?.file(&entry.file)?;
        let found = file.all_extensions().find(matches);
        found
    }
}

/// The direct dependencies of a file, plus every file they publicly import, transitively.
pub(crate) fn visible_files(dependencies: &[FileDescriptor]) -> Vec<FileDescriptor> {
    visible_with_origins(dependencies).0
}

fn visible_with_origins(dependencies: &[FileDescriptor]) -> (Vec<FileDescriptor>, Vec<String>) {
    let mut seen = HashSet::new();
    let mut files = Vec::new();
    let mut origins = Vec::new();
    for dependency in dependencies {
        let mut stack = vec![dependency.clone()];
        while let Some(file) = stack.pop() {
            if !seen.insert(file.name().to_owned()) {
                continue;
            }
            let public: Vec<_> = file.public_dependencies().collect();
            stack.extend(public.into_iter().rev());
            files.push(file);
            origins.push(dependency.name().to_owned());
        }
    }
    (files, origins)
}

/// Every file reachable through imports of any kind.
fn transitive_files(dependencies: &[FileDescriptor]) -> Vec<FileDescriptor> {
    let mut seen = HashSet::new();
    let mut result = Vec::new();
    let mut stack: Vec<FileDescriptor> = dependencies.iter().rev().cloned().collect();
    while let Some(file) = stack.pop() {
        if !seen.insert(file.name().to_owned()) {
            continue;
        }
        let imports: Vec<_> = file.dependencies().collect();
        stack.extend(imports.into_iter().rev());
        result.push(file);
    }
    result
}
