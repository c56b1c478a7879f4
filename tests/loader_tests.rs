//! Choosing between binaries and sources on the class path

mod common;

use common::Project;
use jbatch::common::classloader::{advance, load_definition};
use jbatch::common::BatchEnvironment;
use jbatch::symtab::Status;
use jbatch::Config;
use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

fn set_age(path: &Path, secs: u64) {
    let file = fs::File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() - Duration::from_secs(secs)).unwrap();
}

/// Compile `A` and `B extends A`, then make every file old except the
/// source of `A`
fn stale_superclass() -> Project {
    let project = Project::new();
    project.write("A.java", "class A {\n}\n");
    project.write("B.java", "class B extends A {\n}\n");
    let output = project.compile(&["A.java", "B.java"]);
    assert!(output.is_success(), "{:?}", output.diagnostics);
    set_age(&project.root().join("B.java"), 300);
    set_age(&project.class_path("A"), 200);
    set_age(&project.class_path("B"), 200);
    set_age(&project.root().join("A.java"), 10);
    project
}

fn environment(project: &Project, depend: bool) -> BatchEnvironment {
    let config = Config {
        classpath: project.out().to_string_lossy().into_owned(),
        sourcepath: Some(project.root().to_string_lossy().into_owned()),
        depend,
        ..Config::default()
    };
    BatchEnvironment::new(config)
}

#[test]
fn newer_source_replaces_the_binary() {
    let project = stale_superclass();
    let mut env = environment(&project, false);
    let a = env.declare("A");
    advance(&mut env, a).unwrap();
    assert_eq!(env.table.status(a), Status::Source);
    load_definition(&mut env, a).unwrap();
    assert_eq!(env.table.status(a), Status::Parsed);
}

#[test]
fn up_to_date_binary_is_used() {
    let project = stale_superclass();
    let mut env = environment(&project, false);
    let b = env.declare("B");
    advance(&mut env, b).unwrap();
    assert_eq!(env.table.status(b), Status::Binary);
    assert!(env.table[b].is_binary());
    let a = env.table.lookup("A").unwrap();
    assert_eq!(env.table[b].super_class, Some(a));
}

#[test]
fn depend_mode_recompiles_dependents_of_changed_sources() {
    let project = stale_superclass();
    let mut env = environment(&project, true);
    let b = env.declare("B");
    advance(&mut env, b).unwrap();
    assert_eq!(env.table.status(b), Status::Undecided);
    advance(&mut env, b).unwrap();
    assert_eq!(env.table.status(b), Status::Source);
    load_definition(&mut env, b).unwrap();
    assert_eq!(env.table.status(b), Status::Parsed);
    assert!(env.table[b].is_source());
}

#[test]
fn depend_mode_keeps_binaries_with_fresh_dependencies() {
    let project = stale_superclass();
    set_age(&project.root().join("A.java"), 400);
    let mut env = environment(&project, true);
    let b = env.declare("B");
    load_definition(&mut env, b).unwrap();
    assert_eq!(env.table.status(b), Status::Binary);
    assert_eq!(env.diags.error_count(), 0);
}

#[test]
fn class_nowhere_on_the_path_is_not_found() {
    let project = Project::new();
    let mut env = environment(&project, false);
    let missing = env.declare("p.Missing");
    load_definition(&mut env, missing).unwrap();
    assert_eq!(env.table.status(missing), Status::NotFound);
    assert_eq!(env.diags.error_count(), 0);
}

#[test]
fn binary_holding_another_class_is_rejected() {
    let project = Project::new();
    project.write("A.java", "class A {\n}\n");
    let output = project.compile(&["A.java"]);
    assert!(output.is_success(), "{:?}", output.diagnostics);
    fs::copy(project.class_path("A"), project.out().join("Z.class")).unwrap();

    let mut env = environment(&project, false);
    let z = env.declare("Z");
    load_definition(&mut env, z).unwrap();
    assert_eq!(env.table.status(z), Status::NotFound);
    assert_eq!(env.diags.error_count(), 1);
    let texts = env.diags.all_texts();
    assert!(texts[0].starts_with("class file has wrong class: A, expected Z"), "{:?}", texts);
}
