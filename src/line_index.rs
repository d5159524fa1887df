/// Maps byte offsets to 1-based line:column positions for one source file.
pub struct LineIndex {
    /// Byte offset of the start of each line. line_starts[0] == 0 always.
    line_starts: Vec<usize>,
}

/// 1-based line and column (column counted in chars).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self { line_starts }
    }

    pub fn position(&self, source: &str, offset: usize) -> Position {
        let offset = offset.min(source.len());
        // Binary search: find the last line_start <= offset
        let line = match self.line_starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(ins) => ins.saturating_sub(1),
        };
        let line_start = self.line_starts[line];
        let column = source
            .get(line_start..offset)
            .map_or(offset - line_start, |s| s.chars().count());
        Position { line: line + 1, column: column + 1 }
    }
}

/// Byte offset → char offset, for renderers that count in chars.
pub fn char_offset(source: &str, byte_offset: usize) -> usize {
    let byte_offset = byte_offset.min(source.len());
    source
        .char_indices()
        .take_while(|(i, _)| *i < byte_offset)
        .count()
}
