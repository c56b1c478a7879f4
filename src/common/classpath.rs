//! Search path resolution
//!
//! The user class path follows the usual priority order:
//! 1. `-classpath` or `-cp` on the command line
//! 2. the `CLASSPATH` environment variable
//! 3. the current directory
//!
//! Binaries are searched in the boot class path, then the extension
//! directories, then the user class path. Sources are searched in the
//! source path, or the user class path when no source path is given.

use crate::common::config::Config;
use std::env;
use std::path::{Path, PathBuf};

pub struct ClasspathResolver;

impl ClasspathResolver {
    /// Resolve the user class path; never empty, falls back to "."
    pub fn resolve_classpath(classpath_arg: Option<&str>, cp_arg: Option<&str>) -> String {
        if let Some(cp) = cp_arg {
            log::debug!("classpath: using -cp argument: {}", cp);
            return cp.to_string();
        }
        if let Some(classpath) = classpath_arg {
            log::debug!("classpath: using -classpath argument: {}", classpath);
            return classpath.to_string();
        }
        if let Ok(classpath_env) = env::var("CLASSPATH") {
            if !classpath_env.is_empty() {
                log::debug!("classpath: using CLASSPATH environment variable: {}", classpath_env);
                return classpath_env;
            }
        }
        log::debug!("classpath: using default (current directory)");
        ".".to_string()
    }

    /// Split a path string on the platform separator
    pub fn parse_classpath_entries(classpath: &str) -> Vec<String> {
        if classpath.is_empty() {
            return vec![];
        }
        let separator = if cfg!(windows) { ';' } else { ':' };
        classpath
            .split(separator)
            .map(|entry| entry.trim().to_string())
            .filter(|entry| !entry.is_empty())
            .collect()
    }

    pub fn combine_classpaths(classpaths: &[&str]) -> String {
        let separator = if cfg!(windows) { ";" } else { ":" };
        classpaths
            .iter()
            .filter(|cp| !cp.is_empty())
            .map(|cp| cp.to_string())
            .collect::<Vec<_>>()
            .join(separator)
    }

    /// Ordered directories to search for binaries and for sources.
    /// Archive entries are not searched and are reported once.
    pub fn search_path(config: &Config) -> SearchPath {
        let mut binary = Vec::new();
        if let Some(boot) = &config.bootclasspath {
            binary.extend(Self::parse_classpath_entries(boot));
        }
        if let Some(extdirs) = &config.extdirs {
            for dir in Self::parse_classpath_entries(extdirs) {
                binary.extend(Self::archives_in(Path::new(&dir)));
            }
        }
        let user = Self::parse_classpath_entries(&config.classpath);
        binary.extend(user.iter().cloned());
        let source = match &config.sourcepath {
            Some(sp) => Self::parse_classpath_entries(sp),
            None => user,
        };
        SearchPath { binary: Self::directories(binary), source: Self::directories(source) }
    }

    fn archives_in(dir: &Path) -> Vec<String> {
        walkdir::WalkDir::new(dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| is_archive(e.path()))
            .map(|e| e.path().to_string_lossy().into_owned())
            .collect()
    }

    fn directories(entries: Vec<String>) -> Vec<PathBuf> {
        let mut dirs = Vec::new();
        for entry in entries {
            let path = PathBuf::from(&entry);
            if is_archive(&path) {
                log::warn!("classpath: archive entries are not supported, skipping {}", entry);
                continue;
            }
            if !dirs.contains(&path) {
                dirs.push(path);
            }
        }
        dirs
    }
}

fn is_archive(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()).as_deref(),
        Some("jar") | Some("zip")
    )
}

/// Resolved search directories
#[derive(Debug, Clone, Default)]
pub struct SearchPath {
    pub binary: Vec<PathBuf>,
    pub source: Vec<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cp_argument_wins() {
        let result = ClasspathResolver::resolve_classpath(Some("/path/classpath"), Some("/path/cp"));
        assert_eq!(result, "/path/cp");
        let result = ClasspathResolver::resolve_classpath(Some("/path/classpath"), None);
        assert_eq!(result, "/path/classpath");
    }

    #[test]
    fn environment_then_default() {
        env::set_var("CLASSPATH", "/env/path");
        assert_eq!(ClasspathResolver::resolve_classpath(None, None), "/env/path");
        env::remove_var("CLASSPATH");
        assert_eq!(ClasspathResolver::resolve_classpath(None, None), ".");
    }

    #[test]
    fn entries_split_and_combine() {
        let separator = if cfg!(windows) { ";" } else { ":" };
        let joined = ClasspathResolver::combine_classpaths(&["/path1", "/path2", ""]);
        assert_eq!(joined, format!("/path1{}/path2", separator));
        assert_eq!(ClasspathResolver::parse_classpath_entries(&joined), vec!["/path1", "/path2"]);
    }

    #[test]
    fn search_path_skips_archives_and_defaults_sources() {
        let config = Config { classpath: "lib.jar:classes".replace(':', if cfg!(windows) { ";" } else { ":" }), ..Config::default() };
        let path = ClasspathResolver::search_path(&config);
        assert_eq!(path.binary, vec![PathBuf::from("classes")]);
        assert_eq!(path.source, vec![PathBuf::from("classes")]);
    }
}
