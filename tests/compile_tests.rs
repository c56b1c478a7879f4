//! End-to-end compilation through the driver

mod common;

use common::{count_containing, Project};
use jbatch::codegen::opcodes::{GETFIELD, INVOKEVIRTUAL};
use jbatch::common::consts::*;
use jbatch::ExitStatus;

#[test]
fn subclass_and_superclass_in_separate_files() {
    let project = Project::new();
    project.write("A.java", "class A { void m(){} }\n");
    project.write("B.java", "class B extends A {}\n");
    let output = project.compile(&["A.java", "B.java"]);
    assert_eq!(output.status, ExitStatus::Ok, "{:?}", output.diagnostics);
    assert_eq!(output.errors, 0);

    let a = project.read("A");
    let b = project.read("B");
    assert_eq!(a.super_name.as_deref(), Some("java.lang.Object"));
    assert_eq!(b.super_name.as_deref(), Some("A"));
    for class in [&a, &b] {
        let init = class.methods.iter().find(|m| m.name == "<init>").unwrap();
        assert_eq!(init.descriptor, "()V");
        assert_eq!(init.access_flags & (ACC_PUBLIC | ACC_PRIVATE | ACC_PROTECTED), 0);
    }
    assert!(a.methods.iter().any(|m| m.name == "m" && m.descriptor == "()V"));
    assert!(b.dependencies().iter().any(|d| d == "A"));
    assert_eq!(b.source_file.as_deref(), Some("B.java"));
}

#[test]
fn superclass_found_through_the_class_path() {
    let project = Project::new();
    project.write("A.java", "class A {\n  int size() { return 1; }\n}\n");
    project.write("B.java", "class B extends A {\n  int twice() { return size() * 2; }\n}\n");
    let output = project.compile(&["B.java"]);
    assert!(output.is_success(), "{:?}", output.diagnostics);
    assert!(project.has_class("A"));
    assert!(project.has_class("B"));
}

#[test]
fn missing_superclass_is_reported() {
    let project = Project::new();
    project.write("B.java", "class B extends Missing {\n}\n");
    let output = project.compile(&["B.java"]);
    assert_eq!(output.status, ExitStatus::Error);
    assert_eq!(count_containing(&output, "Superclass Missing of class B not found."), 1);
    assert!(!project.has_class("B"));
}

#[test]
fn final_superclass_is_rejected() {
    let project = Project::new();
    project.write("A.java", "final class A {\n}\nclass B extends A {\n}\n");
    let output = project.compile(&["A.java"]);
    assert_eq!(output.status, ExitStatus::Error);
    assert_eq!(count_containing(&output, "Can't subclass final classes: A"), 1);
}

#[test]
fn packages_map_to_directories() {
    let project = Project::new();
    project.write("p/Outer.java", "package p;\npublic class Outer {\n  public static class Inner {\n  }\n}\n");
    project.write("q/User.java", "package q;\nimport p.Outer;\nclass User {\n  Outer.Inner f;\n}\n");
    let output = project.compile(&["p/Outer.java", "q/User.java"]);
    assert!(output.is_success(), "{:?}", output.diagnostics);
    assert!(project.class_path("p.Outer$Inner").ends_with("p/Outer$Inner.class"));
    assert!(project.has_class("p.Outer$Inner"));
    let user = project.read("q.User");
    assert_eq!(user.fields[0].descriptor, "Lp/Outer$Inner;");
}

#[test]
fn unknown_import_is_reported() {
    let project = Project::new();
    project.write("A.java", "import nowhere.Thing;\nclass A {\n}\n");
    let output = project.compile(&["A.java"]);
    assert_eq!(output.status, ExitStatus::Error);
    assert_eq!(count_containing(&output, "not found in import."), 1);
}

#[test]
fn empty_compilation_succeeds() {
    let project = Project::new();
    let output = project.compile(&[]);
    assert_eq!(output.status, ExitStatus::Ok);
    assert!(output.written.is_empty());
}

#[test]
fn exceptions_declared_in_user_code() {
    let project = Project::new();
    project.write("E.java", "class E extends Exception {\n}\n");
    project.write("R.java", "class R extends RuntimeException {\n}\n");
    project.write(
        "U.java",
        "class U {\n  void f() throws E { throw new E(); }\n  void g() { throw new R(); }\n}\n",
    );
    let output = project.compile(&["E.java", "R.java", "U.java"]);
    assert_eq!(output.status, ExitStatus::Ok, "{:?}", output.diagnostics);
    assert_eq!(project.read("E").super_name.as_deref(), Some("java.lang.Exception"));
    assert_eq!(project.read("R").super_name.as_deref(), Some("java.lang.RuntimeException"));
    let u = project.read("U");
    let f = u.methods.iter().find(|m| m.name == "f").unwrap();
    assert_eq!(f.exceptions, vec!["E".to_string()]);
}

#[test]
fn protected_members_reach_inner_classes_across_packages() {
    let project = Project::new();
    project.write(
        "p/S.java",
        "package p;\npublic class S {\n  protected int v;\n  protected int get() { return v; }\n}\n",
    );
    project.write(
        "q/M.java",
        "package q;\nimport p.S;\npublic class M extends S {\n  class B {\n    int f() { return get() + v; }\n  }\n}\n",
    );
    let output = project.compile(&["p/S.java", "q/M.java"]);
    assert_eq!(output.status, ExitStatus::Ok, "{:?}", output.diagnostics);

    let m = project.read("q.M");
    let bridges: Vec<_> = m.methods.iter().filter(|m| m.name.starts_with(PREFIX_ACCESS)).collect();
    assert_eq!(bridges.len(), 2);
    for bridge in &bridges {
        assert_eq!(bridge.descriptor, "(Lq/M;)I");
        assert_eq!(bridge.access_flags & ACC_STATIC, ACC_STATIC);
        assert!(bridge.synthetic);
    }
    let bodies: Vec<&Vec<u8>> = bridges.iter().map(|b| &b.code.as_ref().unwrap().bytes).collect();
    assert!(bodies.iter().any(|b| b.contains(&INVOKEVIRTUAL)));
    assert!(bodies.iter().any(|b| b.contains(&GETFIELD)));

    let inner = project.read("q.M$B");
    assert!(!inner.dependencies().iter().any(|d| d == "p.S"), "{:?}", inner.dependencies());
}

#[test]
fn inheritance_too_deep_to_resolve_exhausts_resources() {
    let project = Project::new();
    let depth = MAX_RESOLVE_DEPTH + 8;
    let mut text = String::new();
    for i in 0..depth {
        text.push_str(&format!("class C{} extends C{} {{}}\n", i, i + 1));
    }
    text.push_str(&format!("class C{} {{}}\n", depth));
    project.write("C0.java", &text);
    let output = std::thread::Builder::new()
        .stack_size(256 * 1024 * 1024)
        .spawn(move || project.compile(&["C0.java"]))
        .unwrap()
        .join()
        .unwrap();
    assert_eq!(output.status, ExitStatus::SysErr);
    assert_eq!(count_containing(&output, "The system is out of resources."), 1);
}
