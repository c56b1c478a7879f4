//! Destinations for emitted class files

use super::class_writer::class_file_path;
use crate::common::error::Result;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub trait ClassSink {
    /// Store the class `name` (binary form, `p.A$B`) compiled from `source`.
    /// Returns where it went.
    fn write_class(&mut self, name: &str, source: Option<&Path>, bytes: &[u8]) -> Result<PathBuf>;
}

/// Writes under `-d`, or next to the source file when there is no output
/// directory
#[derive(Debug, Clone, Default)]
pub struct DirectorySink {
    output_dir: Option<PathBuf>,
}

impl DirectorySink {
    pub fn new(output_dir: Option<PathBuf>) -> Self {
        Self { output_dir }
    }

    pub fn path_for(&self, name: &str, source: Option<&Path>) -> PathBuf {
        match (&self.output_dir, source) {
            (Some(dir), _) => class_file_path(dir, name),
            (None, Some(source)) => {
                let simple = name.rsplit('.').next().unwrap_or(name);
                source.with_file_name(format!("{}.class", simple))
            }
            (None, None) => class_file_path(Path::new("."), name),
        }
    }
}

impl ClassSink for DirectorySink {
    fn write_class(&mut self, name: &str, source: Option<&Path>, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.path_for(name, source);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, bytes)?;
        Ok(path)
    }
}

/// Keeps class files in memory, keyed by binary name
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub classes: BTreeMap<String, Vec<u8>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.classes.get(name).map(Vec::as_slice)
    }
}

impl ClassSink for MemorySink {
    fn write_class(&mut self, name: &str, _source: Option<&Path>, bytes: &[u8]) -> Result<PathBuf> {
        self.classes.insert(name.to_string(), bytes.to_vec());
        Ok(class_file_path(Path::new(""), name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn output_directory_gets_package_folders() {
        let dir = TempDir::new().unwrap();
        let mut sink = DirectorySink::new(Some(dir.path().to_path_buf()));
        let path = sink.write_class("p.A$B", Some(Path::new("src/p/A.java")), &[0xca, 0xfe]).unwrap();
        assert_eq!(path, dir.path().join("p").join("A$B.class"));
        assert_eq!(fs::read(path).unwrap(), vec![0xca, 0xfe]);
    }

    #[test]
    fn without_output_directory_next_to_source() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("A.java");
        let mut sink = DirectorySink::new(None);
        let path = sink.write_class("p.A$1", Some(&source), &[1]).unwrap();
        assert_eq!(path, dir.path().join("A$1.class"));
        assert!(path.exists());
    }

    #[test]
    fn memory_sink_keeps_bytes() {
        let mut sink = MemorySink::new();
        sink.write_class("A", None, &[7]).unwrap();
        assert_eq!(sink.get("A"), Some(&[7u8][..]));
        assert_eq!(sink.get("B"), None);
    }
}
