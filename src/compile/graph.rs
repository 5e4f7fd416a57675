use std::collections::{HashMap, HashSet};

use crate::{diagnostic::CheckError, file::File, Error};

/// The imports between the files loaded for one compilation.
#[derive(Debug, Default)]
pub(super) struct ImportGraph {
    /// Every loaded file, with dependencies before the files that import them.
    pub order: Vec<String>,
    /// The loaded imports of each file, without duplicates or edges which close a cycle.
    pub edges: HashMap<String, Vec<String>>,
    /// Why the imports missing from `edges` were dropped, keyed by importing file.
    pub import_errors: HashMap<String, HashMap<String, CheckError>>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    InProgress,
    Done,
}

struct Builder<'a> {
    loaded: &'a HashMap<String, Result<File, Error>>,
    visits: HashMap<String, Visit>,
    stack: Vec<String>,
    graph: ImportGraph,
}

impl ImportGraph {
    /// Orders the loaded files reachable from `roots` topologically.
    ///
    /// Imports which could not be loaded are recorded as errors of the importing file, unless
    /// the file simply does not exist. An import which would close a cycle is recorded as an
    /// error of the file containing it, and the edge is removed so the rest of the graph can
    /// still be linked.
    pub fn build(roots: &[String], loaded: &HashMap<String, Result<File, Error>>) -> Self {
        let mut builder = Builder {
            loaded,
            visits: HashMap::new(),
            stack: Vec::new(),
            graph: ImportGraph::default(),
        };
        for root in roots {
            if matches!(loaded.get(root), Some(Ok(_))) && !builder.visits.contains_key(root) {
                builder.visit(root);
            }
        }
        builder.graph
    }
}

impl<'a> Builder<'a> {
    fn visit(&mut self, name: &str) {
        let file = match self.loaded.get(name) {
            Some(Ok(file)) => file,
            _ => return,
        };

        self.visits.insert(name.to_owned(), Visit::InProgress);
        self.stack.push(name.to_owned());

        let mut seen = HashSet::new();
        let mut edges = Vec::new();
        for import in file.imports() {
            if !seen.insert(import.clone()) {
                continue;
            }

            match self.loaded.get(&import) {
                Some(Ok(_)) => (),
                Some(Err(err)) if !err.is_file_not_found() => {
                    self.error(
                        name,
                        &import,
                        CheckError::ImportFailed {
                            name: import.clone(),
                            message: err.to_string(),
                        },
                    );
                    continue;
                }
                _ => continue,
            }

            match self.visits.get(&import).copied() {
                Some(Visit::InProgress) => {
                    let start = self
                        .stack
                        .iter()
                        .position(|file| *file == import)
                        .unwrap_or(0);
                    let mut cycle = self.stack[start..].to_vec();
                    cycle.push(import.clone());
                    self.error(
                        name,
                        &import,
                        CheckError::ImportCycle {
                            cycle: cycle.join(" -> "),
                        },
                    );
                }
                Some(Visit::Done) => edges.push(import),
                None => {
                    self.visit(&import);
                    edges.push(import);
                }
            }
        }

        self.stack.pop();
        self.visits.insert(name.to_owned(), Visit::Done);
        self.graph.edges.insert(name.to_owned(), edges);
        self.graph.order.push(name.to_owned());
    }

    fn error(&mut self, file: &str, import: &str, err: CheckError) {
        self.graph
            .import_errors
            .entry(file.to_owned())
            .or_default()
            .insert(import.to_owned(), err);
    }
}
