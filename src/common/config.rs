//! Compilation options shared by the driver and every phase

use crate::common::error::{Error, Result};
use std::path::PathBuf;

/// Which debugging tables the emitter writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebugInfo {
    pub lines: bool,
    pub vars: bool,
    pub source: bool,
}

impl Default for DebugInfo {
    fn default() -> Self {
        Self { lines: true, vars: false, source: true }
    }
}

impl DebugInfo {
    pub fn all() -> Self {
        Self { lines: true, vars: true, source: true }
    }

    pub fn none() -> Self {
        Self { lines: false, vars: false, source: false }
    }

    /// Parse the argument of `-g:`, e.g. `lines,source` or `none`
    pub fn parse(spec: &str) -> Result<Self> {
        let mut info = Self::none();
        for part in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            match part {
                "lines" => info.lines = true,
                "vars" => info.vars = true,
                "source" => info.source = true,
                "none" => info = Self::none(),
                other => return Err(Error::usage(format!("invalid -g option: {}", other))),
            }
        }
        Ok(info)
    }
}

/// Class-file version selected by `-target`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Jdk1_1,
    Jdk1_2,
    Jdk1_3,
    Jdk1_4,
    Jdk1_5,
}

impl Default for Target {
    fn default() -> Self {
        Target::Jdk1_1
    }
}

impl Target {
    pub fn parse(release: &str) -> Result<Self> {
        match release {
            "1.1" => Ok(Target::Jdk1_1),
            "1.2" => Ok(Target::Jdk1_2),
            "1.3" => Ok(Target::Jdk1_3),
            "1.4" => Ok(Target::Jdk1_4),
            "1.5" | "5" => Ok(Target::Jdk1_5),
            other => Err(Error::usage(format!("invalid target release: {}", other))),
        }
    }

    /// (major, minor) class-file version
    pub fn version(self) -> (u16, u16) {
        use crate::codegen::defs::major_versions::*;
        match self {
            Target::Jdk1_1 => (JAVA_1_1, 3),
            Target::Jdk1_2 => (JAVA_1_2, 0),
            Target::Jdk1_3 => (JAVA_1_3, 0),
            Target::Jdk1_4 => (JAVA_1_4, 0),
            Target::Jdk1_5 => (JAVA_5_0, 0),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub debug: DebugInfo,
    pub target: Target,
    /// Track dependencies of binaries: a binary stays UNDECIDED until its
    /// dependency closure is known not to contain recompiled sources.
    pub depend: bool,
    pub print_dependencies: bool,
    pub nowarn: bool,
    pub deprecation: bool,
    pub verbose: bool,
    pub encoding: Option<String>,
    pub max_errors: usize,
    pub output_dir: Option<PathBuf>,
    pub classpath: String,
    pub sourcepath: Option<String>,
    pub bootclasspath: Option<String>,
    pub extdirs: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug: DebugInfo::default(),
            target: Target::default(),
            depend: false,
            print_dependencies: false,
            nowarn: false,
            deprecation: false,
            verbose: false,
            encoding: None,
            max_errors: 100,
            output_dir: None,
            classpath: ".".to_string(),
            sourcepath: None,
            bootclasspath: None,
            extdirs: None,
        }
    }
}

impl Config {
    /// Miranda methods are emitted only for the oldest target, whose
    /// virtual machines do not search superinterfaces during lookup.
    pub fn miranda(&self) -> bool {
        self.target == Target::Jdk1_1
    }

    pub fn set_encoding(&mut self, encoding: &str) -> Result<()> {
        let normalized = encoding.to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "utf-8" | "utf8" | "us-ascii" | "ascii" | "iso-8859-1" | "latin1" => {
                self.encoding = Some(encoding.to_string());
                Ok(())
            }
            _ => Err(Error::usage(format!("unsupported encoding: {}", encoding))),
        }
    }

    /// Latin-1 input is widened byte by byte; everything else must be UTF-8.
    pub fn decode(&self, bytes: Vec<u8>) -> std::result::Result<String, String> {
        let latin1 = matches!(
            self.encoding.as_deref().map(|e| e.to_ascii_lowercase()),
            Some(ref e) if e == "iso-8859-1" || e == "latin1"
        );
        if latin1 {
            return Ok(bytes.iter().map(|&b| b as char).collect());
        }
        String::from_utf8(bytes).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_spec_subsets() {
        let info = DebugInfo::parse("lines,vars").unwrap();
        assert!(info.lines && info.vars && !info.source);
        assert_eq!(DebugInfo::parse("none").unwrap(), DebugInfo::none());
        assert!(DebugInfo::parse("bogus").is_err());
    }

    #[test]
    fn target_versions() {
        assert_eq!(Target::parse("1.1").unwrap().version(), (45, 3));
        assert_eq!(Target::parse("1.5").unwrap().version(), (49, 0));
        assert!(Target::parse("1.9").is_err());
    }

    #[test]
    fn miranda_follows_target() {
        let mut config = Config::default();
        assert!(config.miranda());
        config.target = Target::Jdk1_2;
        assert!(!config.miranda());
    }

    #[test]
    fn encodings() {
        let mut config = Config::default();
        assert!(config.set_encoding("UTF-8").is_ok());
        assert!(config.set_encoding("EBCDIC").is_err());
        config.set_encoding("ISO-8859-1").unwrap();
        assert_eq!(config.decode(vec![0x41, 0xe9]).unwrap(), "A\u{e9}");
    }
}
