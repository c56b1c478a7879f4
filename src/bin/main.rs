use anyhow::{bail, Context, Result};
use clap::Parser;
use jbatch::codegen::sink::DirectorySink;
use jbatch::common::classpath::ClasspathResolver;
use jbatch::{Compiler, Config, DebugInfo, ExitStatus, Target};
use std::fs;
use std::path::PathBuf;

/// javac-style options. Single-dash spellings (`-classpath`, `-g:none`)
/// are rewritten to their double-dash form before parsing.
#[derive(Parser, Debug)]
#[command(name = "jbatch")]
#[command(about = "Batch Java source to bytecode compiler")]
#[command(version)]
struct Cli {
    /// User class path
    #[arg(long, visible_alias = "cp", value_name = "PATH")]
    classpath: Option<String>,

    /// Where to look for source files
    #[arg(long, value_name = "PATH")]
    sourcepath: Option<String>,

    #[arg(long, value_name = "PATH")]
    bootclasspath: Option<String>,

    #[arg(long, value_name = "DIRS")]
    extdirs: Option<String>,

    /// Output directory for class files
    #[arg(long = "d", value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Debugging tables: `-g` for all, `-g:none`, or `-g:lines,vars,source`
    #[arg(long = "g", value_name = "SPEC", num_args = 0..=1, require_equals = true, default_missing_value = "lines,vars,source")]
    debug: Option<String>,

    /// Class file version: 1.1 (default) to 1.5
    #[arg(long, value_name = "RELEASE")]
    target: Option<String>,

    /// Report each use of a deprecated API
    #[arg(long)]
    deprecation: bool,

    /// Suppress warnings
    #[arg(long)]
    nowarn: bool,

    #[arg(long)]
    verbose: bool,

    /// Source file encoding
    #[arg(long, value_name = "ENCODING")]
    encoding: Option<String>,

    /// Recompile binaries whose dependencies are being compiled
    #[arg(long, visible_alias = "Xdepend")]
    depend: bool,

    /// Print the dependencies of each class written
    #[arg(long = "Xprintdepend")]
    print_dependencies: bool,

    /// Maximum number of errors to report
    #[arg(long = "Xmaxerrs", value_name = "N")]
    max_errors: Option<usize>,

    /// Source files, or `@file` naming more arguments
    #[arg(value_name = "FILE")]
    sources: Vec<PathBuf>,
}

/// Expand `@file` arguments and map single-dash options to clap's form
fn normalize_args(raw: impl Iterator<Item = String>) -> Result<Vec<String>> {
    let mut args = Vec::new();
    for (i, arg) in raw.enumerate() {
        if i == 0 {
            args.push(arg);
            continue;
        }
        if let Some(file) = arg.strip_prefix('@') {
            let text = fs::read_to_string(file).with_context(|| format!("cannot read argument file {}", file))?;
            args.extend(normalize_args(std::iter::once(String::new()).chain(text.split_whitespace().map(String::from)))?.into_iter().skip(1));
            continue;
        }
        let normalized = match arg.strip_prefix('-') {
            Some(rest) if !rest.starts_with('-') && !rest.is_empty() => match rest.split_once(':') {
                Some(("g", spec)) => format!("--g={}", spec),
                _ => format!("--{}", rest),
            },
            _ => arg,
        };
        args.push(normalized);
    }
    Ok(args)
}

fn build_config(cli: &Cli) -> jbatch::Result<Config> {
    let mut config = Config::default();
    if let Some(spec) = &cli.debug {
        config.debug = DebugInfo::parse(spec)?;
    }
    if let Some(release) = &cli.target {
        config.target = Target::parse(release)?;
    }
    if let Some(encoding) = &cli.encoding {
        config.set_encoding(encoding)?;
    }
    if let Some(max) = cli.max_errors {
        config.max_errors = max;
    }
    config.classpath = ClasspathResolver::resolve_classpath(cli.classpath.as_deref(), None);
    config.sourcepath = cli.sourcepath.clone();
    config.bootclasspath = cli.bootclasspath.clone();
    config.extdirs = cli.extdirs.clone();
    config.output_dir = cli.output_dir.clone();
    config.deprecation = cli.deprecation;
    config.nowarn = cli.nowarn;
    config.verbose = cli.verbose;
    config.depend = cli.depend;
    config.print_dependencies = cli.print_dependencies;
    Ok(config)
}

fn init_logging(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn run() -> Result<ExitStatus> {
    let args = normalize_args(std::env::args())?;
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) if !e.use_stderr() => {
            print!("{}", e);
            return Ok(ExitStatus::Ok);
        }
        Err(e) => {
            eprint!("{}", e);
            return Ok(ExitStatus::CmdErr);
        }
    };
    init_logging(cli.verbose);

    let config = match build_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("jbatch: {}", e);
            return Ok(e.exit_status());
        }
    };
    if cli.sources.is_empty() {
        eprintln!("jbatch: no source files");
        return Ok(ExitStatus::CmdErr);
    }
    if let Some(bad) = cli.sources.iter().find(|p| p.extension().map_or(true, |e| e != "java")) {
        eprintln!("jbatch: invalid argument: {}", bad.display());
        return Ok(ExitStatus::CmdErr);
    }
    if let Some(dir) = &config.output_dir {
        if !dir.is_dir() {
            bail!("output directory {} does not exist", dir.display());
        }
    }

    let mut sink = DirectorySink::new(config.output_dir.clone());
    let mut compiler = Compiler::new(config);
    for path in &cli.sources {
        if let Err(e) = compiler.add_source(path) {
            eprintln!("jbatch: {}", e);
            return Ok(e.exit_status());
        }
    }
    let output = compiler.compile(&mut sink);
    for line in &output.dependency_lines {
        println!("{}", line);
    }
    for diagnostic in &output.diagnostics {
        eprintln!("{}", diagnostic);
    }
    Ok(output.status)
}

fn main() {
    let status = match run() {
        Ok(status) => status,
        Err(e) => {
            eprintln!("jbatch: {:#}", e);
            ExitStatus::CmdErr
        }
    };
    std::process::exit(status.code());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let args = normalize_args(std::iter::once("jbatch").chain(args.iter().copied()).map(String::from)).unwrap();
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn single_dash_options() {
        let cli = parse(&["-classpath", "lib", "-d", "out", "-deprecation", "A.java"]);
        assert_eq!(cli.classpath.as_deref(), Some("lib"));
        assert_eq!(cli.output_dir, Some(PathBuf::from("out")));
        assert!(cli.deprecation);
        assert_eq!(cli.sources, vec![PathBuf::from("A.java")]);
    }

    #[test]
    fn debug_spellings() {
        let config = build_config(&parse(&["-g", "A.java"])).unwrap();
        assert_eq!(config.debug, DebugInfo::all());
        let config = build_config(&parse(&["-g:none", "A.java"])).unwrap();
        assert_eq!(config.debug, DebugInfo::none());
        let config = build_config(&parse(&["A.java"])).unwrap();
        assert_eq!(config.debug, DebugInfo::default());
    }

    #[test]
    fn bad_target_is_a_usage_error() {
        let e = build_config(&parse(&["-target", "9", "A.java"])).unwrap_err();
        assert_eq!(e.exit_status(), ExitStatus::CmdErr);
    }

    #[test]
    fn argument_files_expand() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("args");
        fs::write(&file, "-nowarn\nA.java B.java\n").unwrap();
        let cli = parse(&[&format!("@{}", file.display())]);
        assert!(cli.nowarn);
        assert_eq!(cli.sources.len(), 2);
    }
}
