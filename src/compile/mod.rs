//! The compiler driver, which loads a set of files with their imports and links them in
//! parallel.

mod graph;

#[cfg(test)]
mod tests;

use std::{
    backtrace::Backtrace,
    collections::{hash_map::Entry, HashMap, HashSet},
    fmt, mem,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
};

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use prost::Message;
use rayon::{Scope, ThreadPoolBuilder};
use tracing::{debug, info, info_span, warn};

use self::graph::ImportGraph;
use crate::{
    descriptor::FileDescriptor,
    diagnostic::{CheckError, Diagnostic, Reporter, Severity},
    file::{File, FileResolver, Parser},
    link::{link_file, LinkInput, LinkRequest, OptionInterpreter, RetainUninterpreted},
    symbols::SymbolTable,
    types::FileDescriptorSet,
    Error,
};

/// Options for compiling protobuf files.
pub struct Compiler {
    resolver: Arc<dyn FileResolver>,
    parser: Option<Arc<dyn Parser>>,
    interpreter: Arc<dyn OptionInterpreter>,
    reporter: Option<Arc<dyn Reporter>>,
    parallelism: usize,
    max_errors: Option<usize>,
    include_imports: bool,
    include_source_info: bool,
    cancellation: CancellationToken,
}

/// A handle used to cancel a running compilation from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

/// The outcome of [`Compiler::compile`].
///
/// A compilation which failed still holds every file which was linked without errors.
#[derive(Debug)]
pub struct Compilation {
    files: Vec<FileDescriptor>,
    roots: HashSet<String>,
    diagnostics: Vec<Diagnostic>,
    error: Option<Error>,
    include_imports: bool,
    include_source_info: bool,
}

impl Compiler {
    /// Create a new [`Compiler`] with default options, which opens files using `resolver`.
    pub fn new<R>(resolver: R) -> Self
    where
        R: FileResolver + 'static,
    {
        Compiler {
            resolver: Arc::new(resolver),
            parser: None,
            interpreter: Arc::new(RetainUninterpreted),
            reporter: None,
            parallelism: 0,
            max_errors: None,
            include_imports: false,
            include_source_info: false,
            cancellation: CancellationToken::default(),
        }
    }

    /// Set the number of worker threads used to link files.
    ///
    /// If zero, which is the default, one thread is used per available CPU.
    pub fn parallelism(&mut self, threads: usize) -> &mut Self {
        self.parallelism = threads;
        self
    }

    /// Abort the compilation once more than `limit` errors have been reported.
    pub fn max_errors(&mut self, limit: usize) -> &mut Self {
        self.max_errors = Some(limit);
        self
    }

    /// Set whether the output `FileDescriptorSet` should include imported files.
    ///
    /// By default, only the files passed to [`compile`](Compiler::compile) are returned by
    /// [`Compilation::file_descriptor_set`]. If this option is set, imported files are included too.
    pub fn include_imports(&mut self, yes: bool) -> &mut Self {
        self.include_imports = yes;
        self
    }

    /// Set whether the output `FileDescriptorSet` should include source info.
    ///
    /// If set, the file descriptors returned by [`Compilation::file_descriptor_set`] will have
    /// the [`FileDescriptorProto::source_code_info`](crate::types::FileDescriptorProto::source_code_info)
    /// field populated with source locations.
    pub fn include_source_info(&mut self, yes: bool) -> &mut Self {
        self.include_source_info = yes;
        self
    }

    /// Set a reporter which is passed every diagnostic as soon as it is found.
    ///
    /// Diagnostics are collected into the [`Compilation`] regardless.
    pub fn reporter<R>(&mut self, reporter: R) -> &mut Self
    where
        R: Reporter + 'static,
    {
        self.reporter = Some(Arc::new(reporter));
        self
    }

    /// Set the parser used for files returned as [`File::Source`].
    pub fn parser<P>(&mut self, parser: P) -> &mut Self
    where
        P: Parser + 'static,
    {
        self.parser = Some(Arc::new(parser));
        self
    }

    /// Set the interpreter for custom options. By default they are left uninterpreted.
    pub fn option_interpreter<I>(&mut self, interpreter: I) -> &mut Self
    where
        I: OptionInterpreter + 'static,
    {
        self.interpreter = Arc::new(interpreter);
        self
    }

    /// Set the token used to cancel compilations.
    pub fn cancellation(&mut self, token: CancellationToken) -> &mut Self {
        self.cancellation = token;
        self
    }

    /// Loads the named files with everything they import, and links them.
    pub fn compile<I>(&self, names: I) -> Compilation
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut roots: Vec<String> = Vec::new();
        for name in names {
            let name = name.as_ref();
            if !roots.iter().any(|root| root == name) {
                roots.push(name.to_owned());
            }
        }

        let pool = match ThreadPoolBuilder::new()
            .num_threads(self.parallelism)
            .thread_name(|i| format!("protolink-{}", i))
            .build()
        {
            Ok(pool) => pool,
            Err(err) => return self.finish(roots, Vec::new(), Vec::new(), Some(Error::new(err))),
        };

        let collector = Collector {
            reporter: self.reporter.as_deref(),
            max_errors: self.max_errors,
            cancellation: &self.cancellation,
            diagnostics: Mutex::new(Vec::new()),
            errors: AtomicUsize::new(0),
            aborted: AtomicBool::new(false),
            fatal: Mutex::new(None),
        };

        let loader = Loader {
            compiler: self,
            collector: &collector,
            files: Mutex::new(HashMap::new()),
        };
        pool.scope(|scope| {
            for root in &roots {
                loader.load(scope, root);
            }
        });
        let mut loaded = loader.into_files();

        let graph = ImportGraph::build(&roots, &loaded);
        let mut session = Session {
            compiler: self,
            nodes: Vec::with_capacity(graph.order.len()),
            symbols: SymbolTable::new(),
            collector: &collector,
        };
        for name in &graph.order {
            if let Some(Ok(file)) = loaded.remove(name) {
                session.nodes.push(Node {
                    name: name.clone(),
                    file,
                    deps: Vec::new(),
                    dependents: Vec::new(),
                    pending: AtomicUsize::new(0),
                    import_errors: graph.import_errors.get(name).cloned().unwrap_or_default(),
                    result: OnceCell::new(),
                });
            }
        }
        session.connect(&graph);

        let session = &session;
        pool.scope(|scope| {
            for (i, node) in session.nodes.iter().enumerate() {
                if node.deps.is_empty() {
                    scope.spawn(move |scope| session.run(scope, i));
                }
            }
        });

        let mut linked = Vec::new();
        let mut failed = 0;
        for node in &session.nodes {
            match node.result.get() {
                Some(Ok(file)) if !file.has_errors() => linked.push(file.clone()),
                _ => failed += 1,
            }
        }

        let mut diagnostics = mem::take(&mut *collector.diagnostics.lock());
        let positions: HashMap<&str, usize> = session
            .nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node.name.as_str(), i))
            .collect();
        diagnostics.sort_by_key(|diagnostic| {
            (
                positions
                    .get(diagnostic.file())
                    .copied()
                    .unwrap_or(usize::MAX),
                diagnostic.offset().unwrap_or(0),
            )
        });

        let error = collector
            .fatal
            .lock()
            .take()
            .or_else(|| {
                roots.iter().find_map(|root| match loaded.get(root) {
                    Some(Err(err)) => Some(err.clone()),
                    _ => None,
                })
            })
            .or_else(|| Error::invalid_input(diagnostics.iter().cloned()));

        info!(
            files = linked.len(),
            failed,
            errors = diagnostics
                .iter()
                .filter(|diagnostic| diagnostic.severity() == Severity::Error)
                .count(),
            warnings = diagnostics
                .iter()
                .filter(|diagnostic| diagnostic.severity() == Severity::Warning)
                .count(),
            "compilation finished"
        );
        self.finish(roots, linked, diagnostics, error)
    }

    fn finish(
        &self,
        roots: Vec<String>,
        files: Vec<FileDescriptor>,
        diagnostics: Vec<Diagnostic>,
        error: Option<Error>,
    ) -> Compilation {
        Compilation {
            files,
            roots: roots.into_iter().collect(),
            diagnostics,
            error,
            include_imports: self.include_imports,
            include_source_info: self.include_source_info,
        }
    }
}

impl fmt::Debug for Compiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compiler")
            .field("parallelism", &self.parallelism)
            .field("max_errors", &self.max_errors)
            .field("include_imports", &self.include_imports)
            .field("include_source_info", &self.include_source_info)
            .field("cancellation", &self.cancellation)
            .finish_non_exhaustive()
    }
}

impl CancellationToken {
    /// Create a new token which is not cancelled.
    pub fn new() -> Self {
        CancellationToken::default()
    }

    /// Cancel every compilation using this token. Files which have not started linking are
    /// skipped, and the compilation fails with a cancellation error.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Returns `true` if [`cancel`](CancellationToken::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Compilation {
    /// The files which were linked without errors, with dependencies before the files that import
    /// them.
    pub fn files(&self) -> &[FileDescriptor] {
        &self.files
    }

    /// Gets a file which was linked without errors by name.
    pub fn file(&self, name: &str) -> Option<&FileDescriptor> {
        self.files.iter().find(|file| file.name() == name)
    }

    /// Every error and warning reported, grouped by file and in source order within each file.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// The reason the compilation failed, if it did.
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Returns the linked files, or the error if the compilation failed.
    pub fn into_result(self) -> Result<Vec<FileDescriptor>, Error> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.files),
        }
    }

    /// Convert the linked files into an instance of [`FileDescriptorSet`].
    ///
    /// Files are sorted topologically, with dependency files ordered before the files that import them.
    pub fn file_descriptor_set(&self) -> FileDescriptorSet {
        let file = self
            .files
            .iter()
            .filter(|file| self.include_imports || self.roots.contains(file.name()))
            .map(|file| {
                let mut proto = file.file_descriptor_proto().clone();
                if !self.include_source_info {
                    proto.source_code_info = None;
                }
                proto
            })
            .collect();

        FileDescriptorSet { file }
    }

    /// Encodes the output of [`file_descriptor_set`](Compilation::file_descriptor_set).
    pub fn encode_file_descriptor_set(&self) -> Vec<u8> {
        self.file_descriptor_set().encode_to_vec()
    }
}

/// Collects the diagnostics of every task, and decides when the compilation is aborted.
struct Collector<'a> {
    reporter: Option<&'a dyn Reporter>,
    max_errors: Option<usize>,
    cancellation: &'a CancellationToken,
    diagnostics: Mutex<Vec<Diagnostic>>,
    errors: AtomicUsize,
    aborted: AtomicBool,
    fatal: Mutex<Option<Error>>,
}

impl<'a> Collector<'a> {
    fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Acquire) || self.cancellation.is_cancelled()
    }

    /// Records the first error which failed a task. A panic replaces any earlier error which
    /// was not a panic.
    fn fail(&self, err: &Error) {
        let mut fatal = self.fatal.lock();
        match &*fatal {
            Some(existing) if existing.is_panic() || !err.is_panic() => (),
            _ => *fatal = Some(err.clone()),
        }
    }

    fn abort(&self, err: Error) -> Error {
        self.fail(&err);
        self.aborted.store(true, Ordering::Release);
        warn!(error = %err, "aborting compilation");
        err
    }
}

impl<'a> Reporter for Collector<'a> {
    fn error(&self, diagnostic: &Diagnostic) -> Result<(), Error> {
        if let Some(limit) = self.max_errors {
            if self.errors.load(Ordering::Acquire) > limit {
                return Err(Error::too_many_errors(limit));
            }
        }
        if self.is_aborted() {
            return Err(Error::cancelled());
        }

        self.diagnostics.lock().push(diagnostic.clone());
        if let Some(reporter) = self.reporter {
            if let Err(err) = reporter.error(diagnostic) {
                return Err(self.abort(err));
            }
        }

        let count = self.errors.fetch_add(1, Ordering::AcqRel) + 1;
        match self.max_errors {
            Some(limit) if count > limit => Err(self.abort(Error::too_many_errors(limit))),
            _ => Ok(()),
        }
    }

    fn warning(&self, diagnostic: &Diagnostic) {
        if self.is_aborted() {
            return;
        }

        self.diagnostics.lock().push(diagnostic.clone());
        if let Some(reporter) = self.reporter {
            reporter.warning(diagnostic);
        }
    }
}

/// Opens each file reachable from the roots exactly once, in parallel.
struct Loader<'a> {
    compiler: &'a Compiler,
    collector: &'a Collector<'a>,
    files: Mutex<HashMap<String, Arc<OnceCell<Result<File, Error>>>>>,
}

impl<'a> Loader<'a> {
    fn load<'s>(&'s self, scope: &Scope<'s>, name: &str) {
        let cell = match self.files.lock().entry(name.to_owned()) {
            Entry::Occupied(_) => return,
            Entry::Vacant(entry) => entry.insert(Arc::default()).clone(),
        };

        let name = name.to_owned();
        scope.spawn(move |scope| match cell.get_or_init(|| self.open(&name)) {
            Ok(file) => {
                for import in file.imports() {
                    self.load(scope, &import);
                }
            }
            Err(err) if err.is_panic() => self.collector.fail(err),
            Err(_) => (),
        });
    }

    fn open(&self, name: &str) -> Result<File, Error> {
        if self.collector.is_aborted() {
            return Err(Error::cancelled());
        }

        debug!(file = name, "opening file");
        match catch_panic(name, || self.compiler.resolver.open_file(name))? {
            File::Source(source) => match &self.compiler.parser {
                Some(parser) => {
                    let ast = catch_panic(name, || parser.parse(name, &source))?;
                    Ok(File::Ast {
                        ast,
                        source: Some(source),
                    })
                }
                None => Err(Error::no_parser(name)),
            },
            file => Ok(file),
        }
    }

    fn into_files(self) -> HashMap<String, Result<File, Error>> {
        self.files
            .into_inner()
            .into_iter()
            .map(|(name, cell)| {
                let file = match Arc::try_unwrap(cell) {
                    Ok(cell) => cell.into_inner(),
                    Err(cell) => cell.get().cloned(),
                };
                (name, file.unwrap_or_else(|| Err(Error::cancelled())))
            })
            .collect()
    }
}

/// A loaded file waiting to be linked.
struct Node {
    name: String,
    file: File,
    deps: Vec<usize>,
    dependents: Vec<usize>,
    /// The number of dependencies which have not finished linking.
    pending: AtomicUsize,
    import_errors: HashMap<String, CheckError>,
    result: OnceCell<Result<FileDescriptor, Error>>,
}

/// The shared state of the link tasks.
struct Session<'a> {
    compiler: &'a Compiler,
    nodes: Vec<Node>,
    symbols: SymbolTable,
    collector: &'a Collector<'a>,
}

impl<'a> Session<'a> {
    fn connect(&mut self, graph: &ImportGraph) {
        let index: HashMap<String, usize> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node.name.clone(), i))
            .collect();

        let mut edges = Vec::new();
        for (i, node) in self.nodes.iter_mut().enumerate() {
            node.deps = graph
                .edges
                .get(&node.name)
                .into_iter()
                .flatten()
                .filter_map(|import| index.get(import).copied())
                .collect();
            node.pending = AtomicUsize::new(node.deps.len());
            edges.extend(node.deps.iter().map(|&dep| (dep, i)));
        }
        for (dep, dependent) in edges {
            self.nodes[dep].dependents.push(dependent);
        }
    }

    /// Links a file whose dependencies have all finished, then schedules the dependents which
    /// were only waiting on it.
    fn run<'s>(&'s self, scope: &Scope<'s>, index: usize) {
        let node = &self.nodes[index];
        let result = info_span!("link", file = node.name.as_str()).in_scope(|| self.link(node));
        if let Err(err) = &result {
            debug!(file = node.name.as_str(), error = %err, "link failed");
            self.collector.fail(err);
        }
        let _ = node.result.set(result);

        for &dependent in &node.dependents {
            if self.nodes[dependent].pending.fetch_sub(1, Ordering::AcqRel) == 1 {
                scope.spawn(move |scope| self.run(scope, dependent));
            }
        }
    }

    fn link(&self, node: &Node) -> Result<FileDescriptor, Error> {
        if self.collector.is_aborted() {
            return Err(Error::cancelled());
        }

        let mut dependencies = Vec::with_capacity(node.deps.len());
        let mut import_errors = node.import_errors.clone();
        for &dep in &node.deps {
            let dep = &self.nodes[dep];
            match dep.result.get() {
                Some(Ok(file)) => dependencies.push(file.clone()),
                Some(Err(err)) => {
                    import_errors.insert(
                        dep.name.clone(),
                        CheckError::ImportFailed {
                            name: dep.name.clone(),
                            message: err.to_string(),
                        },
                    );
                }
                None => (),
            }
        }

        catch_panic(&node.name, || {
            let input = match node.file.clone() {
                File::Linked(file) => {
                    self.symbols.import(&file, self.collector)?;
                    self.symbols.publish(file.clone());
                    return Ok(file);
                }
                File::Descriptor(proto) => LinkInput::Descriptor(proto),
                File::Ast { ast, source } => LinkInput::Ast { ast, source },
                File::Source(_) => return Err(Error::no_parser(&node.name)),
            };

            link_file(LinkRequest {
                name: &node.name,
                input,
                dependencies: &dependencies,
                import_errors: &import_errors,
                symbols: &self.symbols,
                interpreter: &*self.compiler.interpreter,
                reporter: self.collector,
                cancelled: &|| self.collector.is_aborted(),
            })
        })
    }
}

fn catch_panic<T>(name: &str, f: impl FnOnce() -> Result<T, Error>) -> Result<T, Error> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            warn!(file = name, "panic while linking");
            Err(Error::panic(name, &*payload, Backtrace::force_capture()))
        }
    }
}
