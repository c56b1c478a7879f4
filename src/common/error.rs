use once_cell::sync::Lazy;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for jbatch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Message used when the compiler runs out of resources. Built before the
/// run starts so reporting it never needs to allocate.
pub static OUT_OF_RESOURCES: Lazy<String> = Lazy::new(|| {
    "The system is out of resources.\nConsult the following stack trace for details.".to_string()
});

/// Error types that abort or escape the compilation driver.
///
/// User source errors are not represented here; they are diagnostics.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed class file {}: {message}", path.display())]
    ClassFormat { path: PathBuf, message: String },

    #[error("{message}")]
    Environment { message: String },

    #[error("Internal compiler error: {message}")]
    Internal { message: String },

    #[error("{message}")]
    ResourceExhausted { message: String },

    #[error("{message}")]
    Usage { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

/// Process exit status of a compilation run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Compilation completed with no errors
    Ok = 0,
    /// Compilation completed but reported errors
    Error = 1,
    /// Bad command-line arguments
    CmdErr = 2,
    /// System error or resource exhaustion
    SysErr = 3,
    /// Compiler terminated abnormally
    Abnormal = 4,
}

impl ExitStatus {
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl Error {
    pub fn class_format(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ClassFormat { path: path.into(), message: message.into() }
    }

    pub fn environment(message: impl Into<String>) -> Self {
        Self::Environment { message: message.into() }
    }

    /// Create an internal consistency error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage { message: message.into() }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }

    /// Resource exhaustion carrying the preloaded message
    pub fn out_of_resources() -> Self {
        Self::ResourceExhausted { message: OUT_OF_RESOURCES.clone() }
    }

    pub fn exit_status(&self) -> ExitStatus {
        match self {
            Error::Usage { .. } | Error::Config { .. } => ExitStatus::CmdErr,
            Error::ResourceExhausted { .. } => ExitStatus::SysErr,
            Error::Internal { .. } => ExitStatus::Abnormal,
            Error::Io(_) | Error::Environment { .. } | Error::ClassFormat { .. } => ExitStatus::SysErr,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_status_by_category() {
        assert_eq!(Error::usage("bad flag").exit_status().code(), 2);
        assert_eq!(Error::out_of_resources().exit_status().code(), 3);
        assert_eq!(Error::internal("duplicate check").exit_status().code(), 4);
        assert_eq!(ExitStatus::Error.code(), 1);
    }

    #[test]
    fn internal_error_message() {
        let e = Error::internal("misplaced outer this");
        assert_eq!(e.to_string(), "Internal compiler error: misplaced outer this");
    }
}
