use crate::common::consts::WHEREOFFSETBITS;
use std::fmt;

/// A source position packed into one 64-bit value: the line number in the
/// high bits and the byte offset from the start of the file in the low
/// `WHEREOFFSETBITS` bits. Packed positions order by line, then offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Where(pub u64);

impl Where {
    /// Position used for synthesized code that has no source text
    pub const NOWHERE: Where = Where(0);

    pub fn new(line: u32, offset: u32) -> Self {
        Where(((line as u64) << WHEREOFFSETBITS) | offset as u64)
    }

    pub fn line(self) -> u32 {
        (self.0 >> WHEREOFFSETBITS) as u32
    }

    pub fn offset(self) -> u32 {
        (self.0 & ((1u64 << WHEREOFFSETBITS) - 1)) as u32
    }

    pub fn is_known(self) -> bool {
        self.0 != 0
    }

    /// 1-based column of this position within `source`
    pub fn column(self, source: &str) -> usize {
        let offset = (self.offset() as usize).min(source.len());
        let line_start = source[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0);
        source[line_start..offset].chars().count() + 1
    }

    /// The full text of the line containing this position
    pub fn line_text(self, source: &str) -> &str {
        let offset = (self.offset() as usize).min(source.len());
        let start = source[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0);
        let end = source[offset..].find('\n').map(|i| offset + i).unwrap_or(source.len());
        source[start..end].trim_end_matches('\r')
    }
}

impl fmt::Display for Where {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.line())
    }
}

/// Represents a location in source code while lexing
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Location {
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed)
    pub column: usize,
    /// Byte offset from start of file
    pub offset: usize,
}

impl Location {
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self { line, column, offset }
    }

    pub fn start() -> Self {
        Self { line: 1, column: 1, offset: 0 }
    }

    pub fn to_where(self) -> Where {
        Where::new(self.line as u32, self.offset as u32)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packing_round_trips() {
        let w = Where::new(1234, 98765);
        assert_eq!(w.line(), 1234);
        assert_eq!(w.offset(), 98765);
        assert_eq!(Where::new(u32::MAX, u32::MAX).line(), u32::MAX);
        assert_eq!(Where::new(u32::MAX, u32::MAX).offset(), u32::MAX);
    }

    #[test]
    fn positions_order_by_line_first() {
        assert!(Where::new(2, 0) > Where::new(1, 500));
        assert!(Where::new(3, 10) < Where::new(3, 11));
    }

    #[test]
    fn column_and_line_text() {
        let src = "class A {\n  int x;\n}\n";
        let w = Where::new(2, 12);
        assert_eq!(w.column(src), 3);
        assert_eq!(w.line_text(src), "  int x;");
    }
}
