//! The registry of every name declared by the files of one compilation.
//!
//! Packages form a trie keyed by name segment. Each node is locked independently, so files in
//! unrelated packages register their symbols concurrently.

#[cfg(test)]
mod tests;

use std::{
    collections::{hash_map, HashMap, HashSet},
    sync::Arc,
};

use parking_lot::RwLock;
use tracing::trace;

use crate::{
    descriptor::{index::Index, DefinitionKind, FileDescriptor},
    diagnostic::{CheckError, Diagnostic, Reporter, Severity},
    source::SourceMap,
    Error,
};

/// Global uniqueness and lookup of fully-qualified names across all linked files.
#[derive(Debug, Default)]
pub struct SymbolTable {
    root: Arc<PackageNode>,
    files: RwLock<HashMap<String, FileDescriptor>>,
}

/// The owner of a fully-qualified name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolEntry {
    pub kind: DefinitionKind,
    /// The file that declared the symbol.
    pub file: String,
    /// The location of the declaration, formatted as `file:line:column` if known.
    pub location: String,
}

#[derive(Debug, Default)]
pub(crate) struct PackageNode {
    name: String,
    declared_in: String,
    state: RwLock<PackageState>,
}

#[derive(Debug, Default)]
struct PackageState {
    children: HashMap<String, Arc<PackageNode>>,
    symbols: HashMap<String, SymbolEntry>,
    extensions: HashMap<(String, i32), SymbolEntry>,
    files: HashSet<String>,
}

/// The declarations of one file, as needed to register them.
pub(crate) struct FileSymbols<'a> {
    pub name: &'a str,
    pub index: &'a Index,
    pub source: &'a SourceMap,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable::default()
    }

    /// Registers every package prefix and symbol declared by a linked file.
    ///
    /// Conflicts are passed to `reporter`. Importing the same file twice has no effect.
    pub fn import(&self, file: &FileDescriptor, reporter: &dyn Reporter) -> Result<(), Error> {
        self.import_symbols(
            &FileSymbols {
                name: file.name(),
                index: file.index(),
                source: file.source(),
            },
            &mut |diagnostic| reporter.error(&diagnostic),
        )
    }

    pub(crate) fn import_symbols(
        &self,
        file: &FileSymbols<'_>,
        report: &mut dyn FnMut(Diagnostic) -> Result<(), Error>,
    ) -> Result<(), Error> {
        let package = &file.index.package;
        let mut diagnostics = Vec::new();

        let node = if package.is_empty() {
            self.root.clone()
        } else {
            let mut node = self.root.clone();
            let mut full_name = String::new();
            for part in package.split('.') {
                full_name = crate::make_name(&full_name, part);
                let child = {
                    let mut state = node.state.write();
                    if let Some(existing) = state.symbols.get(&full_name) {
                        diagnostics.push(file.source.diagnostic(
                            Severity::Error,
                            CheckError::PackageConflict {
                                name: full_name.clone(),
                                first: existing.location.clone(),
                            },
                            &[crate::tag::file::PACKAGE],
                        ));
                    }
                    state
                        .children
                        .entry(part.to_owned())
                        .or_insert_with(|| {
                            Arc::new(PackageNode {
                                name: full_name.clone(),
                                declared_in: file.name.to_owned(),
                                state: RwLock::default(),
                            })
                        })
                        .clone()
                };
                node = child;
            }
            node
        };

        {
            let mut state = node.state.write();
            if !state.files.insert(file.name.to_owned()) {
                trace!(file = file.name, "symbols already imported");
                return Ok(());
            }

            for declaration in &file.index.declarations {
                let location = file.source.describe(&declaration.path);

                if let Some(child) = child_package(&state, package, &declaration.full_name) {
                    diagnostics.push(file.source.diagnostic(
                        Severity::Error,
                        CheckError::SymbolConflictsWithPackage {
                            name: declaration.full_name.clone(),
                            first: child.declared_in.clone(),
                        },
                        &declaration.path,
                    ));
                }

                match state.symbols.entry(declaration.full_name.clone()) {
                    hash_map::Entry::Vacant(entry) => {
                        entry.insert(SymbolEntry {
                            kind: declaration.kind,
                            file: file.name.to_owned(),
                            location,
                        });
                    }
                    hash_map::Entry::Occupied(entry) => {
                        let first = entry.get();
                        let kind = if declaration.kind == DefinitionKind::EnumValue
                            && first.kind == DefinitionKind::EnumValue
                        {
                            CheckError::DuplicateEnumValueSymbol {
                                name: declaration.full_name.clone(),
                                first: first.location.clone(),
                            }
                        } else {
                            CheckError::DuplicateSymbol {
                                name: declaration.full_name.clone(),
                                first: first.location.clone(),
                            }
                        };
                        diagnostics.push(file.source.diagnostic(
                            Severity::Error,
                            kind,
                            &declaration.path,
                        ));
                    }
                }
            }
        }

        trace!(
            file = file.name,
            package = %package,
            symbols = file.index.declarations.len(),
            "imported symbols"
        );

        for diagnostic in diagnostics {
            report(diagnostic)?;
        }
        Ok(())
    }

    /// Records that `number` is used by an extension of `extendee`.
    ///
    /// `package` must be the package of the file declaring the extendee.
    pub fn add_extension(
        &self,
        package: &str,
        extendee: &str,
        number: i32,
        entry: SymbolEntry,
    ) -> Result<(), CheckError> {
        let extendee = extendee.strip_prefix('.').unwrap_or(extendee);
        let in_package = package.is_empty()
            || extendee
                .strip_prefix(package)
                .map_or(false, |rest| rest.starts_with('.'));
        let node = match self.get_package(package, false) {
            Some(node) if in_package => node,
            _ => {
                return Err(CheckError::ExtensionPackageMismatch {
                    extendee: extendee.to_owned(),
                    package: package.to_owned(),
                })
            }
        };

        let mut state = node.state.write();
        match state.extensions.entry((extendee.to_owned(), number)) {
            hash_map::Entry::Vacant(vacant) => {
                vacant.insert(entry);
                Ok(())
            }
            hash_map::Entry::Occupied(occupied) => Err(CheckError::DuplicateExtension {
                extendee: extendee.to_owned(),
                number,
                first: occupied.get().location.clone(),
            }),
        }
    }

    /// Finds the owner of a fully-qualified name.
    pub fn lookup(&self, full_name: &str) -> Option<SymbolEntry> {
        let full_name = full_name.strip_prefix('.').unwrap_or(full_name);
        let mut found = None;
        self.walk_prefixes(full_name, |node| {
            let state = node.state.read();
            if let Some(entry) = state.symbols.get(full_name) {
                found = Some(entry.clone());
                return false;
            }
            if node.name == full_name {
                found = Some(SymbolEntry {
                    kind: DefinitionKind::Package,
                    file: node.declared_in.clone(),
                    location: node.declared_in.clone(),
                });
                return false;
            }
            true
        });
        found
    }

    /// Finds the extension registered for a number of a message, from any file.
    pub fn find_extension(&self, extendee: &str, number: i32) -> Option<SymbolEntry> {
        let extendee = extendee.strip_prefix('.').unwrap_or(extendee);
        let key = (extendee.to_owned(), number);
        let mut found = None;
        self.walk_prefixes(extendee, |node| {
            if let Some(entry) = node.state.read().extensions.get(&key) {
                found = Some(entry.clone());
                return false;
            }
            true
        });
        found
    }

    /// Returns true if any imported file declares this package or a subpackage of it.
    pub fn has_package(&self, name: &str) -> bool {
        self.get_package(name, false).is_some()
    }

    pub(crate) fn get_package(&self, name: &str, create: bool) -> Option<Arc<PackageNode>> {
        let mut node = self.root.clone();
        if name.is_empty() {
            return Some(node);
        }

        for part in name.split('.') {
            let existing = node.state.read().children.get(part).cloned();
            node = match existing {
                Some(child) => child,
                None if create => {
                    let full_name = crate::make_name(&node.name, part);
                    node.state
                        .write()
                        .children
                        .entry(part.to_owned())
                        .or_insert_with(|| {
                            Arc::new(PackageNode {
                                name: full_name,
                                declared_in: String::new(),
                                state: RwLock::default(),
                            })
                        })
                        .clone()
                }
                None => return None,
            };
        }
        Some(node)
    }

    /// Makes a linked file available to the files which are linked after it.
    pub(crate) fn publish(&self, file: FileDescriptor) {
        self.files.write().insert(file.name().to_owned(), file);
    }

    /// A file which has finished linking in this compilation.
    pub fn file(&self, name: &str) -> Option<FileDescriptor> {
        self.files.read().get(name).cloned()
    }

    /// Visits the root and then each package node whose name is a prefix of `name`, until
    /// `visit` returns false.
    fn walk_prefixes(&self, name: &str, mut visit: impl FnMut(&PackageNode) -> bool) {
        let mut node = self.root.clone();
        if !visit(&node) {
            return;
        }
        for part in name.split('.') {
            let child = node.state.read().children.get(part).cloned();
            match child {
                Some(child) => {
                    if !visit(&child) {
                        return;
                    }
                    node = child;
                }
                None => return,
            }
        }
    }
}

impl PackageNode {
    pub(crate) fn name(&self) -> &str {
        &self.name
    }
}

/// If a top-level symbol of `package` has the same name as a subpackage, returns the subpackage.
fn child_package<'a>(
    state: &'a PackageState,
    package: &str,
    full_name: &str,
) -> Option<&'a Arc<PackageNode>> {
    let relative = if package.is_empty() {
        full_name
    } else {
        full_name.strip_prefix(package)?.strip_prefix('.')?
    };
    if relative.contains('.') {
        return None;
    }
    state.children.get(relative)
}
