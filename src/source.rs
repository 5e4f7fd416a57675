use std::{collections::HashMap, sync::Arc};

use miette::{NamedSource, SourceSpan};

use crate::{
    ast::Span,
    diagnostic::{CheckError, Diagnostic, Position, Severity},
    lines::LineResolver,
    types::{source_code_info::Location, SourceCodeInfo},
};

/// Source locations of the elements of one file, keyed by descriptor path.
#[derive(Debug)]
pub(crate) struct SourceMap {
    name: String,
    source: Option<Arc<NamedSource<Arc<str>>>>,
    lines: Option<LineResolver>,
    locations: HashMap<Vec<i32>, SourceLocation>,
    order: Vec<Vec<i32>>,
}

#[derive(Debug, Clone)]
struct SourceLocation {
    span: Option<Span>,
    /// Zero-based line and column.
    start: Option<(usize, usize)>,
    code_span: Vec<i32>,
}

impl SourceMap {
    pub fn empty(name: &str) -> Self {
        SourceMap {
            name: name.to_owned(),
            source: None,
            lines: None,
            locations: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Builds a source map from the spans recorded while lowering an AST.
    pub fn from_spans(
        name: &str,
        source: Option<&str>,
        spans: impl IntoIterator<Item = (Vec<i32>, Span)>,
    ) -> Self {
        let lines = source.map(LineResolver::new);
        let mut map = SourceMap::empty(name);
        map.source = source.map(|source| {
            Arc::new(NamedSource::new(name, Arc::<str>::from(source)))
        });

        for (path, span) in spans {
            let (start, code_span) = match &lines {
                Some(lines) => (Some(lines.resolve(span.start)), lines.code_span(&span)),
                None => (None, Vec::new()),
            };
            map.insert(
                path,
                SourceLocation {
                    span: Some(span),
                    start,
                    code_span,
                },
            );
        }
        map.lines = lines;
        map
    }

    /// Builds a source map from the source code info of a descriptor, if present.
    pub fn from_source_code_info(name: &str, info: Option<&SourceCodeInfo>) -> Self {
        let mut map = SourceMap::empty(name);
        for location in info.into_iter().flat_map(|info| &info.location) {
            let start = match location.span.as_slice() {
                [line, col, ..] if *line >= 0 && *col >= 0 => Some((*line as usize, *col as usize)),
                _ => None,
            };
            map.insert(
                location.path.clone(),
                SourceLocation {
                    span: None,
                    start,
                    code_span: location.span.clone(),
                },
            );
        }
        map
    }

    fn insert(&mut self, path: Vec<i32>, location: SourceLocation) {
        if !self.locations.contains_key(&path) {
            self.order.push(path.clone());
            self.locations.insert(path, location);
        }
    }

    /// Moves the locations under each `from` path, including nested ones, to the matching
    /// `to` path. Where two locations end up at the same path the earlier one is kept.
    pub fn remap(&mut self, moves: &[(Vec<i32>, Vec<i32>)]) {
        if moves.is_empty() {
            return;
        }

        let mut locations = HashMap::with_capacity(self.locations.len());
        let mut order = Vec::with_capacity(self.order.len());
        for path in self.order.drain(..) {
            let location = match self.locations.remove(&path) {
                Some(location) => location,
                None => continue,
            };
            let path = match moves.iter().find(|(from, _)| path.starts_with(from)) {
                Some((from, to)) => {
                    let mut moved = to.clone();
                    moved.extend_from_slice(&path[from.len()..]);
                    moved
                }
                None => path,
            };
            if !locations.contains_key(&path) {
                order.push(path.clone());
                locations.insert(path, location);
            }
        }
        self.locations = locations;
        self.order = order;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }

    /// Finds the location recorded for `path`, or for its closest recorded ancestor.
    fn lookup(&self, path: &[i32]) -> Option<&SourceLocation> {
        let mut path = path;
        loop {
            if let Some(location) = self.locations.get(path) {
                return Some(location);
            }
            if path.is_empty() {
                return None;
            }
            path = &path[..path.len() - 1];
        }
    }

    pub fn span(&self, path: &[i32]) -> Option<Span> {
        self.lookup(path).and_then(|location| location.span.clone())
    }

    pub fn position(&self, path: &[i32]) -> Option<Position> {
        self.lookup(path)
            .and_then(|location| location.start)
            .map(|(line, col)| Position {
                line: line + 1,
                column: col + 1,
            })
    }

    /// Formats a location as `file:line:col`, for messages which refer to an earlier definition.
    pub fn describe(&self, path: &[i32]) -> String {
        match self.position(path) {
            Some(Position { line, column }) => format!("{}:{}:{}", self.name, line, column),
            None => self.name.clone(),
        }
    }

    pub fn diagnostic(&self, severity: Severity, kind: CheckError, path: &[i32]) -> Diagnostic {
        let mut diagnostic = Diagnostic::new(severity, kind, &self.name);
        if let Some(position) = self.position(path) {
            diagnostic = diagnostic.with_position(position);
        }
        if let Some(span) = self.span(path) {
            diagnostic = diagnostic.with_span(SourceSpan::from(span));
        }
        if let Some(source) = &self.source {
            diagnostic = diagnostic.with_source_code(source.clone());
        }
        diagnostic
    }

    /// Creates a diagnostic for a span of the source which has no descriptor path.
    pub fn diagnostic_at(&self, severity: Severity, kind: CheckError, span: Span) -> Diagnostic {
        let mut diagnostic = Diagnostic::new(severity, kind, &self.name);
        if let Some(lines) = &self.lines {
            diagnostic = diagnostic.with_position(lines.position(span.start));
        }
        if let Some(source) = &self.source {
            diagnostic = diagnostic
                .with_span(SourceSpan::from(span))
                .with_source_code(source.clone());
        }
        diagnostic
    }

    /// Adds a secondary label pointing at `path` in this same file.
    pub fn with_related(&self, diagnostic: Diagnostic, label: &str, path: &[i32]) -> Diagnostic {
        match self.span(path) {
            Some(span) if self.source.is_some() => {
                diagnostic.with_related_span(label, SourceSpan::from(span))
            }
            _ => diagnostic,
        }
    }

    /// Converts the recorded locations to source code info, in the order they were recorded.
    pub fn to_source_code_info(&self) -> Option<SourceCodeInfo> {
        if self.order.is_empty() {
            return None;
        }
        let location = self
            .order
            .iter()
            .filter_map(|path| {
                let location = &self.locations[path];
                if location.code_span.is_empty() {
                    return None;
                }
                Some(Location {
                    path: path.clone(),
                    span: location.code_span.clone(),
                    ..Default::default()
                })
            })
            .collect::<Vec<_>>();
        if location.is_empty() {
            None
        } else {
            Some(SourceCodeInfo { location })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_falls_back_to_parent() {
        let map = SourceMap::from_spans(
            "foo.proto",
            Some("import \"foo2.proto\";\nmessage Foo {}\n"),
            vec![(vec![3, 0], 7..19), (vec![4, 0], 21..35)],
        );

        assert_eq!(map.position(&[3, 0]), Some(Position { line: 1, column: 8 }));
        assert_eq!(map.position(&[4, 0, 2, 1]), Some(Position { line: 2, column: 1 }));
        assert_eq!(map.position(&[5, 0]), None);
        assert_eq!(map.describe(&[4, 0]), "foo.proto:2:1");
    }

    #[test]
    fn remap_moves_nested_locations() {
        let mut map = SourceMap::from_spans(
            "foo.proto",
            Some("option java_package = \"a\";\noption (b) = 1;\n"),
            vec![
                (vec![8, 999, 0], 0..26),
                (vec![8, 999, 0, 2], 7..19),
                (vec![8, 999, 1], 27..42),
            ],
        );
        map.remap(&[
            (vec![8, 999, 0], vec![8, 1]),
            (vec![8, 999, 1], vec![8, 999, 0]),
        ]);

        assert_eq!(map.position(&[8, 1]), Some(Position { line: 1, column: 1 }));
        assert_eq!(map.position(&[8, 1, 2]), Some(Position { line: 1, column: 8 }));
        assert_eq!(map.position(&[8, 999, 0]), Some(Position { line: 2, column: 1 }));
        assert_eq!(map.position(&[8, 999, 1]), None);
    }

    #[test]
    fn source_code_info_positions() {
        let info = SourceCodeInfo {
            location: vec![Location {
                path: vec![4, 0],
                span: vec![2, 4, 10],
                ..Default::default()
            }],
        };
        let map = SourceMap::from_source_code_info("bar.proto", Some(&info));

        assert_eq!(map.position(&[4, 0, 1]), Some(Position { line: 3, column: 5 }));
        assert_eq!(map.to_source_code_info(), Some(info));
    }
}
