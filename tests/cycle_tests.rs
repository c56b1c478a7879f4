//! Inheritance cycles are reported once and never hang the compiler

mod common;

use common::{count_containing, Project};
use jbatch::ExitStatus;

#[test]
fn two_class_cycle() {
    let project = Project::new();
    project.write("A.java", "class A extends B {\n}\n");
    project.write("B.java", "class B extends A {\n}\n");
    let output = project.compile(&["A.java", "B.java"]);
    assert_eq!(output.status, ExitStatus::Error);
    assert_eq!(count_containing(&output, "Cyclic class inheritance."), 1);
}

#[test]
fn class_extending_itself() {
    let project = Project::new();
    project.write("A.java", "class A extends A {\n}\n");
    let output = project.compile(&["A.java"]);
    assert_eq!(output.status, ExitStatus::Error);
    assert_eq!(output.errors, 1);
    assert_eq!(count_containing(&output, "Cyclic class inheritance."), 1);
    assert!(!project.has_class("A"));
}

#[test]
fn three_class_cycle_in_one_file() {
    let project = Project::new();
    project.write("A.java", "class A extends C {\n}\nclass B extends A {\n}\nclass C extends B {\n}\n");
    let output = project.compile(&["A.java"]);
    assert_eq!(output.status, ExitStatus::Error);
    assert_eq!(count_containing(&output, "Cyclic class inheritance."), 1);
}

#[test]
fn interface_cycle() {
    let project = Project::new();
    project.write("I.java", "interface I extends J {\n}\ninterface J extends I {\n}\n");
    let output = project.compile(&["I.java"]);
    assert_eq!(output.status, ExitStatus::Error);
    assert_eq!(count_containing(&output, "Cyclic interface inheritance."), 1);
}

#[test]
fn cycle_does_not_block_unrelated_files() {
    let project = Project::new();
    project.write("A.java", "class A extends A {\n}\n");
    project.write("Ok.java", "class Ok {\n}\n");
    let output = project.compile(&["A.java", "Ok.java"]);
    assert_eq!(output.status, ExitStatus::Error);
    assert!(project.has_class("Ok"));
}
