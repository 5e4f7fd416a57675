use crate::{ast::Span, diagnostic::Position, index_to_i32};

/// Maps byte offsets in a source file to zero-based line and column numbers.
#[derive(Debug)]
pub(crate) struct LineResolver {
    /// Offset of the first byte of every line after the first.
    starts: Vec<usize>,
}

impl LineResolver {
    pub fn new(source: &str) -> Self {
        LineResolver {
            starts: source
                .bytes()
                .enumerate()
                .filter(|&(_, byte)| byte == b'\n')
                .map(|(offset, _)| offset + 1)
                .collect(),
        }
    }

    pub fn resolve(&self, offset: usize) -> (usize, usize) {
        let line = self.starts.partition_point(|&start| start <= offset);
        match line.checked_sub(1) {
            Some(prev) => (line, offset - self.starts[prev]),
            None => (0, offset),
        }
    }

    /// The one-based position reported in diagnostics.
    pub fn position(&self, offset: usize) -> Position {
        let (line, col) = self.resolve(offset);
        Position {
            line: line + 1,
            column: col + 1,
        }
    }

    /// The `span` field of a source code info location: three elements when the span
    /// starts and ends on the same line, four otherwise.
    pub fn code_span(&self, span: &Span) -> Vec<i32> {
        let (start_line, start_col) = self.resolve(span.start);
        let (end_line, end_col) = self.resolve(span.end);

        let mut code_span = vec![index_to_i32(start_line), index_to_i32(start_col)];
        if start_line != end_line {
            code_span.push(index_to_i32(end_line));
        }
        code_span.push(index_to_i32(end_col));
        code_span
    }
}

#[test]
fn offsets_to_lines() {
    let resolver = LineResolver::new("syntax = \"proto3\";\npackage a;\n\nmessage B {}");

    assert_eq!(resolver.resolve(0), (0, 0));
    assert_eq!(resolver.resolve(18), (0, 18));
    assert_eq!(resolver.resolve(19), (1, 0));
    assert_eq!(resolver.resolve(27), (1, 8));
    assert_eq!(resolver.resolve(30), (2, 0));
    assert_eq!(resolver.resolve(31), (3, 0));
    assert_eq!(resolver.position(39), Position { line: 4, column: 9 });
}

#[test]
fn code_spans() {
    let resolver = LineResolver::new("message Foo {\n}\n");

    assert_eq!(resolver.code_span(&(8..11)), vec![0, 8, 11]);
    assert_eq!(resolver.code_span(&(0..15)), vec![0, 0, 1, 1]);
}
