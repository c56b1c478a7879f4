// Common test utilities
#![allow(dead_code)]

use jbatch::codegen::reader::{read_class, ClassFileInfo};
use jbatch::codegen::sink::DirectorySink;
use jbatch::{CompileOutput, Compiler, Config};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A source tree in a temporary directory. Class files go to `out/`.
pub struct Project {
    dir: TempDir,
}

impl Project {
    pub fn new() -> Self {
        init_logging();
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("out")).unwrap();
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn out(&self) -> PathBuf {
        self.dir.path().join("out")
    }

    pub fn write(&self, rel: &str, text: &str) -> PathBuf {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, text).unwrap();
        path
    }

    pub fn config(&self) -> Config {
        Config {
            classpath: self.root().to_string_lossy().into_owned(),
            output_dir: Some(self.out()),
            ..Config::default()
        }
    }

    /// Compile the named files with the project's configuration
    pub fn compile(&self, files: &[&str]) -> CompileOutput {
        self.compile_with(self.config(), files).0
    }

    pub fn compile_with(&self, config: Config, files: &[&str]) -> (CompileOutput, Compiler) {
        let mut sink = DirectorySink::new(config.output_dir.clone());
        let mut compiler = Compiler::new(config);
        for file in files {
            compiler.add_source(&self.root().join(file)).unwrap();
        }
        let output = compiler.compile(&mut sink);
        (output, compiler)
    }

    pub fn class_path(&self, name: &str) -> PathBuf {
        let mut path = self.out();
        for part in name.split('.') {
            path.push(part);
        }
        path.set_extension("class");
        path
    }

    pub fn has_class(&self, name: &str) -> bool {
        self.class_path(name).exists()
    }

    pub fn class_bytes(&self, name: &str) -> Vec<u8> {
        fs::read(self.class_path(name)).unwrap()
    }

    pub fn read(&self, name: &str) -> ClassFileInfo {
        let path = self.class_path(name);
        read_class(&fs::read(&path).unwrap(), &path).unwrap()
    }
}

/// Trace output for failing tests: `RUST_LOG=debug cargo test`
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn count_containing(output: &CompileOutput, text: &str) -> usize {
    output.diagnostics.iter().filter(|d| d.contains(text)).count()
}
