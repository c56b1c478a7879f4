//! The compilation driver
//!
//! Source files named by the caller are parsed up front. After that the
//! driver scans the declaration table over and over, moving every
//! declaration it can one step along `SOURCE -> PARSED -> CHECKED ->
//! COMPILED`, until a whole scan changes nothing. Classes pulled in while
//! checking (from the source path, or by dependency tracking) are appended
//! to the table and picked up by the next scan.

use crate::codegen::class_writer::{write_class, EmittedClass};
use crate::codegen::registry::ActiveCompilations;
use crate::codegen::sink::ClassSink;
use crate::common::classloader;
use crate::common::config::Config;
use crate::common::diagnostics::FileId;
use crate::common::env::BatchEnvironment;
use crate::common::error::{Error, ExitStatus, Result, OUT_OF_RESOURCES};
use crate::symtab::{ClassId, Status};
use crate::wash::check::check_nest;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// What a compilation run produced
#[derive(Debug, Clone)]
pub struct CompileOutput {
    pub status: ExitStatus,
    /// Rendered diagnostics in flush order, summary lines last
    pub diagnostics: Vec<String>,
    /// Binary names and destinations of the class files written
    pub written: Vec<(String, PathBuf)>,
    /// `CLASS:` and `CLDEP:` lines, when dependency printing is on
    pub dependency_lines: Vec<String>,
    pub errors: usize,
    pub warnings: usize,
}

impl CompileOutput {
    pub fn is_success(&self) -> bool {
        self.status == ExitStatus::Ok
    }
}

pub struct Compiler {
    env: BatchEnvironment,
    registry: Arc<ActiveCompilations>,
    written: Vec<(String, PathBuf)>,
    dependency_lines: Vec<String>,
}

impl Compiler {
    pub fn new(config: Config) -> Self {
        Self::with_environment(BatchEnvironment::new(config))
    }

    pub fn with_environment(env: BatchEnvironment) -> Self {
        Self { env, registry: Arc::new(ActiveCompilations::new()), written: Vec::new(), dependency_lines: Vec::new() }
    }

    /// Share the registry of names being written with other compilers
    pub fn with_registry(mut self, registry: Arc<ActiveCompilations>) -> Self {
        self.registry = registry;
        self
    }

    pub fn env(&self) -> &BatchEnvironment {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut BatchEnvironment {
        &mut self.env
    }

    /// Read and parse a source file. Unreadable files are reported as
    /// diagnostics.
    pub fn add_source(&mut self, path: &Path) -> Result<Option<FileId>> {
        classloader::read_and_parse(&mut self.env, path)
    }

    /// Parse source text as if it had been read from `path`
    pub fn add_source_text(&mut self, path: impl Into<PathBuf>, text: impl Into<String>) -> Result<FileId> {
        crate::wash::enter::parse_source(&mut self.env, path.into(), text.into())
    }

    /// Run the fixpoint loop and write every class that compiled cleanly
    pub fn compile(&mut self, sink: &mut dyn ClassSink) -> CompileOutput {
        let default_hook = panic::take_hook();
        panic::set_hook(Box::new(|info| log::error!("driver: compiler panic: {}", info)));
        let run = panic::catch_unwind(AssertUnwindSafe(|| self.run(sink)));
        panic::set_hook(default_hook);
        let mut fatal = Vec::new();
        let status = match run {
            Ok(Ok(())) => None,
            Ok(Err(e)) => {
                log::debug!("driver: aborted: {:?}", e);
                let text = match e {
                    Error::ResourceExhausted { .. } => OUT_OF_RESOURCES.clone(),
                    ref other => format!("error: {}", other),
                };
                fatal.push(text);
                Some(e.exit_status())
            }
            Err(_) => {
                fatal.push("error: An exception has occurred in the compiler; please file a bug report.".to_string());
                Some(ExitStatus::Abnormal)
            }
        };
        self.finish(status, fatal)
    }

    fn run(&mut self, sink: &mut dyn ClassSink) -> Result<()> {
        let mut round = 0;
        loop {
            round += 1;
            let mut progress = false;
            for id in self.env.table.ids() {
                progress |= self.step(id, sink)?;
            }
            log::trace!("driver: round {} progress {}", round, progress);
            if !progress {
                return Ok(());
            }
        }
    }

    /// Move `id` along as far as it goes; true when its status changed
    fn step(&mut self, id: ClassId, sink: &mut dyn ClassSink) -> Result<bool> {
        let before = self.env.table.status(id);
        match before {
            Status::Undefined | Status::Undecided if self.env.config.depend => {
                classloader::load_definition(&mut self.env, id)?;
            }
            Status::Source => classloader::load_definition(&mut self.env, id)?,
            _ => {}
        }
        if self.env.table.status(id) == Status::Parsed {
            self.check(id)?;
        }
        if self.env.table.status(id) == Status::Checked {
            self.emit(id, sink)?;
        }
        let changed = self.env.table.status(id) != before;
        if let (true, Some(file)) = (changed, self.env.file_of(id)) {
            self.env.flush_errors(Some(file));
        }
        Ok(changed)
    }

    /// Check the nest `id` belongs to and mark its source classes checked
    fn check(&mut self, id: ClassId) -> Result<()> {
        let top = self.env.outermost(id);
        check_nest(&mut self.env, top)?;
        for c in self.env.nest_of(top) {
            if self.env.table.status(c) == Status::Parsed {
                self.env.table.set_status(c, Status::Checked);
            }
        }
        if self.env.table.status(id) == Status::Parsed {
            self.env.table.set_status(id, Status::Checked);
        }
        Ok(())
    }

    /// A nest is written only if none of its classes, and not its source
    /// file, had errors
    fn nest_has_errors(&self, id: ClassId) -> bool {
        let top = self.env.outermost(id);
        let file_errors = self.env.file_of(top).and_then(|f| self.env.files.get(f)).map_or(0, |f| f.errors);
        file_errors > 0 || self.env.nest_of(top).iter().any(|&c| self.env.table.def(c).map_or(false, |d| d.erroneous))
    }

    fn emit(&mut self, id: ClassId, sink: &mut dyn ClassSink) -> Result<()> {
        if self.nest_has_errors(id) {
            log::debug!("driver: not writing {}, its nest has errors", self.env.class_name(id));
            self.env.table.set_status(id, Status::Compiled);
            return Ok(());
        }
        if let Some(emitted) = write_class(&mut self.env, id)? {
            self.store(&emitted, sink)?;
        }
        self.env.table.set_status(id, Status::Compiled);
        Ok(())
    }

    fn store(&mut self, emitted: &EmittedClass, sink: &mut dyn ClassSink) -> Result<()> {
        let file = self.env.file_of(emitted.class);
        let source = file.and_then(|f| self.env.files.get(f)).map(|f| f.path.clone());
        let written = {
            let _guard = self.registry.acquire(&emitted.name)?;
            sink.write_class(&emitted.name, source.as_deref(), &emitted.bytes)
        };
        match written {
            Ok(path) => {
                if self.env.config.verbose {
                    log::info!("[wrote {}]", path.display());
                }
                self.written.push((emitted.name.clone(), path));
            }
            Err(e) => {
                let pos = self.env.table[emitted.class].pos;
                self.env.error(file, pos, format!("Can't write class file for {}: {}", emitted.name, e));
                return Ok(());
            }
        }
        if self.env.config.print_dependencies || self.env.config.verbose {
            self.dependency_report(emitted, source.as_deref());
        }
        Ok(())
    }

    fn dependency_report(&mut self, emitted: &EmittedClass, source: Option<&Path>) {
        let def = &self.env.table[emitted.class];
        let mut lines = vec![format!(
            "CLASS:{},{},{},{}",
            source.map(|p| p.display().to_string()).unwrap_or_default(),
            def.pos.line(),
            def.end_pos.line(),
            emitted.name
        )];
        for &dep in &emitted.dependencies {
            lines.push(format!("CLDEP:{},{}", emitted.name, self.env.class_name(dep)));
        }
        for line in &lines {
            log::debug!("driver: {}", line);
        }
        if self.env.config.print_dependencies {
            self.dependency_lines.extend(lines);
        }
    }

    fn finish(&mut self, fatal_status: Option<ExitStatus>, fatal: Vec<String>) -> CompileOutput {
        if !self.env.config.deprecation {
            let notes: Vec<(FileId, String)> = self
                .env
                .files
                .iter()
                .enumerate()
                .filter(|(_, f)| f.uses_deprecated)
                .map(|(i, f)| (i, f.path.display().to_string()))
                .collect();
            for (file, path) in notes {
                self.env.diags.note(
                    Some(file),
                    format!("{} uses a deprecated API.  Recompile with \"-deprecation\" for details.", path),
                );
            }
        }
        self.env.flush_errors(None);
        let mut diagnostics = self.env.diags.take_rendered();
        diagnostics.extend(fatal);

        let errors = self.env.diags.error_count();
        let warnings = self.env.diags.warning_count();
        if errors > 0 {
            diagnostics.push(plural(errors, "error"));
        }
        if warnings > 0 {
            diagnostics.push(plural(warnings, "warning"));
        }
        let status = fatal_status.unwrap_or(if errors > 0 { ExitStatus::Error } else { ExitStatus::Ok });
        log::info!("driver: finished with {:?}, {} errors, {} warnings", status, errors, warnings);
        CompileOutput {
            status,
            diagnostics,
            written: std::mem::take(&mut self.written),
            dependency_lines: std::mem::take(&mut self.dependency_lines),
            errors,
            warnings,
        }
    }
}

fn plural(n: usize, what: &str) -> String {
    if n == 1 {
        format!("1 {}", what)
    } else {
        format!("{} {}s", n, what)
    }
}

/// Compile `sources` with `config`, writing class files through `sink`
pub fn compile_files(config: Config, sources: &[PathBuf], sink: &mut dyn ClassSink) -> Result<CompileOutput> {
    let mut compiler = Compiler::new(config);
    for path in sources {
        compiler.add_source(path)?;
    }
    Ok(compiler.compile(sink))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::sink::MemorySink;

    fn compile(sources: &[(&str, &str)]) -> (CompileOutput, MemorySink) {
        let mut compiler = Compiler::new(Config::default());
        for (path, text) in sources {
            compiler.add_source_text(*path, *text).unwrap();
        }
        let mut sink = MemorySink::new();
        let output = compiler.compile(&mut sink);
        (output, sink)
    }

    #[test]
    fn clean_sources_compile() {
        let (output, sink) = compile(&[("A.java", "class A { void m() {} }"), ("B.java", "class B extends A {}")]);
        assert!(output.is_success(), "{:?}", output.diagnostics);
        assert!(sink.get("A").is_some());
        assert!(sink.get("B").is_some());
        assert_eq!(output.written.len(), 2);
    }

    #[test]
    fn errors_stop_the_nest_from_being_written() {
        let (output, sink) = compile(&[("A.java", "class A { int f() { return true; } static class B {} }")]);
        assert_eq!(output.status, ExitStatus::Error);
        assert!(sink.get("A").is_none());
        assert!(sink.get("A$B").is_none());
        assert_eq!(output.diagnostics.last().map(String::as_str), Some("1 error"));
    }

    #[test]
    fn other_nests_still_compile() {
        let (output, sink) = compile(&[("A.java", "class A { int f() { return true; } }"), ("C.java", "class C {}")]);
        assert_eq!(output.status, ExitStatus::Error);
        assert!(sink.get("C").is_some());
    }

    #[test]
    fn every_class_ends_compiled() {
        let mut compiler = Compiler::new(Config::default());
        compiler.add_source_text("A.java", "class A { class B {} Object o = new Object() {}; }").unwrap();
        let mut sink = MemorySink::new();
        assert!(compiler.compile(&mut sink).is_success());
        for name in ["A", "A$B", "A$1"] {
            let id = compiler.env().table.lookup(name).unwrap();
            assert_eq!(compiler.env().table.status(id), Status::Compiled, "{}", name);
            assert!(sink.get(name).is_some(), "{}", name);
        }
    }

    #[test]
    fn dependency_lines_when_requested() {
        let mut config = Config::default();
        config.print_dependencies = true;
        let mut compiler = Compiler::new(config);
        compiler.add_source_text("A.java", "class A {}\n").unwrap();
        compiler.add_source_text("B.java", "class B extends A {\n}\n").unwrap();
        let mut sink = MemorySink::new();
        let output = compiler.compile(&mut sink);
        let class_line = output.dependency_lines.iter().find(|l| l.starts_with("CLASS:B.java,1,")).unwrap();
        assert!(class_line.ends_with(",B"));
        assert!(output.dependency_lines.contains(&"CLDEP:B,A".to_string()));
    }

    #[test]
    fn deprecation_note_once_per_file() {
        let text = "class A { /** @deprecated */ static void old() {} }";
        let (output, _) = compile(&[("A.java", text), ("B.java", "class B { void f() { A.old(); A.old(); } }")]);
        assert!(output.is_success());
        let notes: Vec<&String> = output.diagnostics.iter().filter(|d| d.contains("deprecated API")).collect();
        assert_eq!(notes.len(), 1);
        assert!(notes[0].contains("B.java"));
    }

    #[test]
    fn diagnostics_are_flushed_as_each_file_is_done() {
        let mut compiler = Compiler::new(Config::default());
        compiler.add_source_text("A.java", "class A { int f() { return true; } }").unwrap();
        compiler.add_source_text("B.java", "class B {}").unwrap();
        let a = compiler.env().table.lookup("A").unwrap();
        let mut sink = MemorySink::new();
        assert!(compiler.step(a, &mut sink).unwrap());
        let rendered = compiler.env_mut().diags.take_rendered();
        assert_eq!(rendered.len(), 1, "{:?}", rendered);
        assert!(rendered[0].starts_with("A.java:1: "), "{}", rendered[0]);
    }

    struct PanickingSink;

    impl ClassSink for PanickingSink {
        fn write_class(&mut self, name: &str, _: Option<&Path>, _: &[u8]) -> Result<PathBuf> {
            panic!("cannot store {}", name)
        }
    }

    #[test]
    fn panic_during_compilation_is_abnormal() {
        let mut compiler = Compiler::new(Config::default());
        compiler.add_source_text("A.java", "class A {}").unwrap();
        let output = compiler.compile(&mut PanickingSink);
        assert_eq!(output.status, ExitStatus::Abnormal);
        assert!(output.diagnostics.iter().any(|d| d.contains("An exception has occurred in the compiler")));
        assert!(output.diagnostics.iter().all(|d| !d.contains("cannot store")));
    }

    #[test]
    fn plural_forms() {
        assert_eq!(plural(1, "error"), "1 error");
        assert_eq!(plural(3, "warning"), "3 warnings");
    }
}
