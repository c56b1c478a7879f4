//! Class file layout: stable output, nested classes and synthetic members

mod common;

use common::Project;
use jbatch::common::consts::*;
use jbatch::{compile_in_memory, Config, ExitStatus};

const SHAPES: &str = "public class Shapes {\n\
    static final int SIDES = 4;\n\
    private int count;\n\
    public int zeta() { return count; }\n\
    int alpha(int x) { return x + SIDES; }\n\
    static String name = \"shapes\";\n\
    class Square {\n\
        int area() { return count * count; }\n\
    }\n\
    static class Circle {\n\
    }\n\
}\n";

#[test]
fn output_is_byte_identical_across_runs() {
    let first = Project::new();
    let second = Project::new();
    for project in [&first, &second] {
        project.write("Shapes.java", SHAPES);
        let output = project.compile(&["Shapes.java"]);
        assert!(output.is_success(), "{:?}", output.diagnostics);
    }
    for name in ["Shapes", "Shapes$Square", "Shapes$Circle"] {
        assert_eq!(first.class_bytes(name), second.class_bytes(name), "{} differs", name);
    }
}

#[test]
fn in_memory_and_on_disk_agree() {
    let project = Project::new();
    project.write("Shapes.java", SHAPES);
    project.compile(&["Shapes.java"]);
    let (output, classes) = compile_in_memory(Config::default(), &[("Shapes.java", SHAPES)]).unwrap();
    assert_eq!(output.status, ExitStatus::Ok);
    assert_eq!(classes.keys().collect::<Vec<_>>(), vec!["Shapes", "Shapes$Circle", "Shapes$Square"]);
    assert_eq!(classes["Shapes"], project.class_bytes("Shapes"));
}

#[test]
fn methods_come_out_sorted() {
    let project = Project::new();
    project.write("Shapes.java", SHAPES);
    project.compile(&["Shapes.java"]);
    let info = project.read("Shapes");
    let keys: Vec<(String, String)> = info.methods.iter().map(|m| (m.name.clone(), m.descriptor.clone())).collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
    assert!(keys.iter().any(|(name, _)| name == "<clinit>"));
}

#[test]
fn one_bridge_per_private_field() {
    let project = Project::new();
    project.write("Shapes.java", SHAPES);
    project.compile(&["Shapes.java"]);
    let info = project.read("Shapes");
    let bridges: Vec<_> = info.methods.iter().filter(|m| m.name.starts_with(PREFIX_ACCESS)).collect();
    assert_eq!(bridges.len(), 1);
    assert_eq!(bridges[0].descriptor, "(LShapes;)I");
    assert_eq!(bridges[0].access_flags & ACC_STATIC, ACC_STATIC);
    assert!(bridges[0].synthetic);
}

#[test]
fn inner_classes_rows() {
    let project = Project::new();
    project.write("Shapes.java", SHAPES);
    project.compile(&["Shapes.java"]);
    let outer = project.read("Shapes");
    let inners: Vec<&str> = outer.inner_classes.iter().map(|e| e.inner.as_str()).collect();
    assert!(inners.contains(&"Shapes$Square"));
    assert!(inners.contains(&"Shapes$Circle"));

    let circle = project.read("Shapes$Circle");
    let own = circle.self_entry().unwrap();
    assert_eq!(own.outer.as_deref(), Some("Shapes"));
    assert_eq!(own.simple_name.as_deref(), Some("Circle"));
    assert_eq!(own.access_flags, ACC_STATIC);

    let square = project.read("Shapes$Square");
    assert!(square.fields.iter().any(|f| f.name.starts_with(PREFIX_THIS) && f.synthetic));
}

#[test]
fn private_nested_class_gets_package_constructor() {
    let project = Project::new();
    project.write("A.java", "class A {\n  private static class P {\n  }\n}\n");
    let output = project.compile(&["A.java"]);
    assert!(output.is_success(), "{:?}", output.diagnostics);
    let p = project.read("A$P");
    let init = p.methods.iter().find(|m| m.name == "<init>").unwrap();
    assert_eq!(init.access_flags & (ACC_PUBLIC | ACC_PRIVATE | ACC_PROTECTED), 0);
    assert_eq!(p.access_flags & (ACC_PRIVATE | ACC_PROTECTED), 0);
    assert_eq!(p.self_entry().unwrap().access_flags & ACC_PRIVATE, ACC_PRIVATE);
}

#[test]
fn private_top_level_class_is_an_error_but_still_has_a_constructor() {
    let project = Project::new();
    project.write("A.java", "private class A {\n}\n");
    let (output, compiler) = project.compile_with(project.config(), &["A.java"]);
    assert_eq!(output.status, ExitStatus::Error);
    assert_eq!(common::count_containing(&output, "The type A can't be private."), 1);
    let env = compiler.env();
    let a = env.table.lookup("A").unwrap();
    assert_eq!(env.table[a].constructors().len(), 1);
    assert!(!project.has_class("A"));
}

#[test]
fn debug_tables_follow_the_options() {
    let source = "class D {\n  int f(int x) {\n    int y = x;\n    return y;\n  }\n}\n";
    let project = Project::new();
    project.write("D.java", source);
    let config = Config { debug: jbatch::DebugInfo::none(), ..project.config() };
    project.compile_with(config, &["D.java"]);
    let info = project.read("D");
    let f = info.methods.iter().find(|m| m.name == "f").unwrap();
    assert!(f.code.as_ref().unwrap().attributes.is_empty());
    assert_eq!(info.source_file, None);

    let project = Project::new();
    project.write("D.java", source);
    let config = Config { debug: jbatch::DebugInfo::all(), ..project.config() };
    project.compile_with(config, &["D.java"]);
    let info = project.read("D");
    let f = info.methods.iter().find(|m| m.name == "f").unwrap();
    let attributes = &f.code.as_ref().unwrap().attributes;
    assert!(attributes.iter().any(|a| a == "LineNumberTable"));
    assert!(attributes.iter().any(|a| a == "LocalVariableTable"));
}
