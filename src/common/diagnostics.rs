//! Diagnostic collection and rendering
//!
//! Diagnostics are buffered per source file, then flushed in position order
//! with exact duplicates (same position, same text) removed. Each rendered
//! message carries the offending source line and a caret under the column
//! recovered from the packed position.

use crate::parser::span::Where;
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

/// Index of a source file in the environment's file table
pub type FileId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub file: Option<FileId>,
    pub pos: Where,
    pub severity: Severity,
    pub text: String,
}

/// Source text retained for caret rendering
#[derive(Debug, Clone)]
pub struct SourceText {
    pub path: PathBuf,
    pub text: String,
}

#[derive(Debug)]
pub struct Diagnostics {
    pending: BTreeMap<Option<FileId>, Vec<Diagnostic>>,
    seen: HashSet<(Option<FileId>, Where, String)>,
    rendered: Vec<String>,
    flushed: Vec<Diagnostic>,
    errors: usize,
    warnings: usize,
    max_errors: usize,
    nowarn: bool,
}

impl Diagnostics {
    pub fn new(max_errors: usize, nowarn: bool) -> Self {
        Self {
            pending: BTreeMap::new(),
            seen: HashSet::new(),
            rendered: Vec::new(),
            flushed: Vec::new(),
            errors: 0,
            warnings: 0,
            max_errors,
            nowarn,
        }
    }

    /// Record an error. Returns false when it was a duplicate.
    pub fn error(&mut self, file: Option<FileId>, pos: Where, text: impl Into<String>) -> bool {
        self.push(file, pos, Severity::Error, text.into())
    }

    pub fn warning(&mut self, file: Option<FileId>, pos: Where, text: impl Into<String>) -> bool {
        if self.nowarn {
            return false;
        }
        self.push(file, pos, Severity::Warning, text.into())
    }

    pub fn note(&mut self, file: Option<FileId>, text: impl Into<String>) -> bool {
        if self.nowarn {
            return false;
        }
        self.push(file, Where::NOWHERE, Severity::Note, text.into())
    }

    fn push(&mut self, file: Option<FileId>, pos: Where, severity: Severity, text: String) -> bool {
        if !self.seen.insert((file, pos, text.clone())) {
            return false;
        }
        match severity {
            Severity::Error => {
                self.errors += 1;
                if self.errors > self.max_errors {
                    return true;
                }
            }
            Severity::Warning => {
                self.warnings += 1;
                if self.warnings > self.max_errors {
                    return true;
                }
            }
            Severity::Note => {}
        }
        self.pending.entry(file).or_default().push(Diagnostic { file, pos, severity, text });
        true
    }

    pub fn error_count(&self) -> usize {
        self.errors
    }

    pub fn warning_count(&self) -> usize {
        self.warnings
    }

    /// Render and release everything buffered for `file`, in position order.
    pub fn flush(&mut self, file: Option<FileId>, files: &[SourceText]) {
        let Some(mut list) = self.pending.remove(&file) else { return };
        list.sort_by(|a, b| a.pos.cmp(&b.pos).then(a.severity.cmp(&b.severity)));
        for diag in list {
            let text = render(&diag, files);
            self.rendered.push(text);
            self.flushed.push(diag);
        }
    }

    /// Flush every file, files in id order, file-less messages last
    pub fn flush_all(&mut self, files: &[SourceText]) {
        let keys: Vec<Option<FileId>> = self.pending.keys().copied().collect();
        for key in keys.iter().filter(|k| k.is_some()) {
            self.flush(*key, files);
        }
        self.flush(None, files);
    }

    /// Rendered text produced so far, draining the buffer
    pub fn take_rendered(&mut self) -> Vec<String> {
        std::mem::take(&mut self.rendered)
    }

    /// Every diagnostic flushed so far, in flush order
    pub fn flushed(&self) -> &[Diagnostic] {
        &self.flushed
    }

    /// Messages of every diagnostic, flushed or still pending
    pub fn all_texts(&self) -> Vec<String> {
        let mut out: Vec<String> = self.flushed.iter().map(|d| d.text.clone()).collect();
        for list in self.pending.values() {
            out.extend(list.iter().map(|d| d.text.clone()));
        }
        out
    }
}

fn render(diag: &Diagnostic, files: &[SourceText]) -> String {
    let prefix = match diag.severity {
        Severity::Error => "",
        Severity::Warning => "warning: ",
        Severity::Note => "Note: ",
    };
    let source = diag.file.and_then(|f| files.get(f));
    match source {
        Some(src) if diag.pos.is_known() => {
            let line_text = diag.pos.line_text(&src.text);
            let column = diag.pos.column(&src.text);
            let caret: String = line_text
                .chars()
                .take(column.saturating_sub(1))
                .map(|c| if c == '\t' { '\t' } else { ' ' })
                .collect();
            format!(
                "{}:{}: {}{}\n{}\n{}^",
                src.path.display(),
                diag.pos.line(),
                prefix,
                diag.text,
                line_text,
                caret
            )
        }
        Some(src) => format!("{}: {}{}", src.path.display(), prefix, diag.text),
        None if diag.severity == Severity::Error => format!("error: {}", diag.text),
        None => format!("{}{}", prefix, diag.text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files() -> Vec<SourceText> {
        vec![SourceText { path: PathBuf::from("A.java"), text: "class A {\n\tint x = y;\n}\n".to_string() }]
    }

    #[test]
    fn sorted_and_deduplicated_on_flush() {
        let mut d = Diagnostics::new(100, false);
        d.error(Some(0), Where::new(2, 19), "undefined variable: y");
        d.error(Some(0), Where::new(1, 6), "first");
        assert!(!d.error(Some(0), Where::new(2, 19), "undefined variable: y"));
        assert!(d.error(Some(0), Where::new(2, 19), "another message, same place"));
        d.flush(Some(0), &files());
        let texts: Vec<_> = d.flushed().iter().map(|x| x.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "undefined variable: y", "another message, same place"]);
        assert_eq!(d.error_count(), 3);
    }

    #[test]
    fn caret_under_offending_column() {
        let mut d = Diagnostics::new(100, false);
        // offset 19 is the 'y' on line 2
        d.error(Some(0), Where::new(2, 19), "undefined variable: y");
        d.flush(Some(0), &files());
        let out = d.take_rendered();
        assert_eq!(out[0], "A.java:2: undefined variable: y\n\tint x = y;\n\t        ^");
    }

    #[test]
    fn errors_past_the_cap_are_counted_not_kept() {
        let mut d = Diagnostics::new(2, false);
        for i in 0..5 {
            d.error(None, Where::new(1, i), format!("e{}", i));
        }
        d.flush_all(&[]);
        assert_eq!(d.error_count(), 5);
        assert_eq!(d.flushed().len(), 2);
    }

    #[test]
    fn nowarn_drops_warnings() {
        let mut d = Diagnostics::new(100, true);
        assert!(!d.warning(None, Where::NOWHERE, "deprecated"));
        assert_eq!(d.warning_count(), 0);
    }
}
