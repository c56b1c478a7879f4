//! Package lookup over the search path
//!
//! Answers the loader's questions: which binary and which source file could
//! define a class, how old they are, and whether a package exists at all.

use crate::common::classpath::{ClasspathResolver, SearchPath};
use crate::common::config::Config;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// A file that might define a class
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub path: PathBuf,
    pub modified: Option<SystemTime>,
}

impl Candidate {
    fn stat(path: PathBuf) -> io::Result<Option<Candidate>> {
        match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => Ok(Some(Candidate { modified: meta.modified().ok(), path })),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Strictly newer than `other`; unknown times never win
    pub fn is_newer_than(&self, other: &Candidate) -> bool {
        match (self.modified, other.modified) {
            (Some(a), Some(b)) => a > b,
            _ => false,
        }
    }
}

/// The binary and source candidates for one class name
#[derive(Debug, Clone, Default)]
pub struct ClassFiles {
    pub binary: Option<Candidate>,
    pub source: Option<Candidate>,
}

pub struct ClasspathManager {
    search: SearchPath,
    package_cache: HashMap<String, bool>,
}

impl ClasspathManager {
    pub fn new(config: &Config) -> Self {
        let search = ClasspathResolver::search_path(config);
        log::debug!(
            "classpath: {} binary and {} source directories",
            search.binary.len(),
            search.source.len()
        );
        Self::from_search_path(search)
    }

    pub fn from_search_path(search: SearchPath) -> Self {
        Self { search, package_cache: HashMap::new() }
    }

    pub fn search_path(&self) -> &SearchPath {
        &self.search
    }

    /// First binary and first source candidate for a class. Nested names
    /// map to the source file of their top-level class.
    pub fn lookup(&self, class_name: &str) -> io::Result<ClassFiles> {
        let binary_rel = format!("{}.class", class_name.replace('.', "/"));
        let top = match class_name.find('$') {
            Some(i) => &class_name[..i],
            None => class_name,
        };
        let source_rel = format!("{}.java", top.replace('.', "/"));
        let mut files = ClassFiles::default();
        for dir in &self.search.binary {
            if let Some(found) = Candidate::stat(dir.join(&binary_rel))? {
                files.binary = Some(found);
                break;
            }
        }
        for dir in &self.search.source {
            if let Some(found) = Candidate::stat(dir.join(&source_rel))? {
                files.source = Some(found);
                break;
            }
        }
        Ok(files)
    }

    /// Source candidate at a specific path, e.g. one recorded in a binary
    pub fn source_at(&self, path: &Path) -> io::Result<Option<Candidate>> {
        Candidate::stat(path.to_path_buf())
    }

    /// Whether any search directory holds the package. I/O failures count
    /// as existence.
    pub fn package_exists(&mut self, package: &str) -> bool {
        if package.is_empty() {
            return true;
        }
        if let Some(&known) = self.package_cache.get(package) {
            return known;
        }
        let rel = package.replace('.', "/");
        let exists = self.search.binary.iter().chain(self.search.source.iter()).any(|dir| {
            match fs::metadata(dir.join(&rel)) {
                Ok(meta) => meta.is_dir(),
                Err(e) => e.kind() != io::ErrorKind::NotFound,
            }
        });
        self.package_cache.insert(package.to_string(), exists);
        exists
    }

    /// Names of the classes a package directory offers, sorted
    pub fn package_classes(&self, package: &str) -> Vec<String> {
        let rel = package.replace('.', "/");
        let mut names: Vec<String> = Vec::new();
        for dir in self.search.binary.iter().chain(self.search.source.iter()) {
            let pkg_dir = dir.join(&rel);
            for entry in walkdir::WalkDir::new(&pkg_dir).min_depth(1).max_depth(1).into_iter().filter_map(|e| e.ok()) {
                let path = entry.path();
                let is_class = matches!(path.extension().and_then(|e| e.to_str()), Some("class") | Some("java"));
                if !is_class {
                    continue;
                }
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    let name = if package.is_empty() { stem.to_string() } else { format!("{}.{}", package, stem) };
                    if !names.contains(&name) {
                        names.push(name);
                    }
                }
            }
        }
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn manager_for(dir: &Path) -> ClasspathManager {
        ClasspathManager::from_search_path(SearchPath {
            binary: vec![dir.to_path_buf()],
            source: vec![dir.to_path_buf()],
        })
    }

    #[test]
    fn finds_binary_and_source_candidates() {
        let temp = TempDir::new().unwrap();
        let pkg = temp.path().join("p");
        fs::create_dir_all(&pkg).unwrap();
        fs::write(pkg.join("A.java"), "package p; class A {}").unwrap();
        fs::write(pkg.join("A$B.class"), [0xca, 0xfe]).unwrap();

        let manager = manager_for(temp.path());
        let files = manager.lookup("p.A").unwrap();
        assert!(files.binary.is_none());
        assert_eq!(files.source.unwrap().path, pkg.join("A.java"));

        let inner = manager.lookup("p.A$B").unwrap();
        assert_eq!(inner.binary.unwrap().path, pkg.join("A$B.class"));
        assert_eq!(inner.source.unwrap().path, pkg.join("A.java"));
    }

    #[test]
    fn package_existence_and_listing() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("q/r")).unwrap();
        fs::write(temp.path().join("q/r/C.java"), "").unwrap();
        fs::write(temp.path().join("q/r/D.class"), "").unwrap();

        let mut manager = manager_for(temp.path());
        assert!(manager.package_exists("q.r"));
        assert!(manager.package_exists(""));
        assert!(!manager.package_exists("nope"));
        assert_eq!(manager.package_classes("q.r"), vec!["q.r.C", "q.r.D"]);
    }
}
