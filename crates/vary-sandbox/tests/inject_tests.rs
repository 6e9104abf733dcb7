use std::path::{Path, PathBuf};

use vary_ir::load_schema;
use vary_ir::merge::ensure_schema_file;
use vary_sandbox::inject::{
    ensure_value_includes, register_graphics_variables, register_itemsep_variable, rewrite_graphics, sub_files,
    write_macros,
};

const MAIN_TEX: &str = r"\documentclass{article}
\begin{document}
\input{figures}
% \input{draft}
\includegraphics[width=0.5\textwidth]{logo}
\end{document}
";

const FIGURES_TEX: &str = r"\begin{figure}
\includegraphics[height=10cm]{plot}
\end{figure}
";

/// A document with one figure in the main file and one in a sub-file,
/// prepared the way `vary instrument` prepares it.
fn document() -> (tempfile::TempDir, PathBuf, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let main = dir.path().join("main.tex");
    let schema = dir.path().join("variables.json");
    std::fs::write(&main, MAIN_TEX).unwrap();
    std::fs::write(dir.path().join("figures.tex"), FIGURES_TEX).unwrap();
    ensure_schema_file(&schema).unwrap();
    write_macros(dir.path()).unwrap();
    ensure_value_includes(&main).unwrap();
    (dir, main, schema)
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

#[test]
fn test_sub_files_skip_comments() {
    let (_dir, main, _) = document();
    assert_eq!(sub_files(&main).unwrap(), vec!["macros", "values", "figures"]);
}

#[test]
fn test_rewrite_graphics_in_sub_file() {
    let (dir, _, _) = document();
    let variables = rewrite_graphics(&dir.path().join("figures")).unwrap();
    assert_eq!(variables, vec![("height_plot".to_string(), 10.0)]);
    assert!(read(&dir.path().join("figures.tex")).contains(r"\includegraphics[height=\getVal{height_plot}cm]{plot}"));

    // Nothing left to discover.
    assert!(rewrite_graphics(&dir.path().join("figures.tex")).unwrap().is_empty());
}

#[test]
fn test_register_graphics_variables() {
    let (dir, main, schema_path) = document();
    let domains = register_graphics_variables(&main, &schema_path).unwrap();
    let names: Vec<_> = domains.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["height_plot", "width_logo"]);

    assert!(read(&main).contains(r"\includegraphics[width=\getVal{width_logo}\textwidth]{logo}"));
    assert!(read(&dir.path().join("figures.tex")).contains(r"\getVal{height_plot}cm"));

    let schema = load_schema(&schema_path).unwrap();
    let height = schema.number("height_plot").unwrap();
    assert_eq!((height.min, height.max, height.precision), (7.0, 13.0, 1));
    let width = schema.number("width_logo").unwrap();
    assert_eq!((width.min, width.max, width.precision), (0.35, 0.65, 2));
}

#[test]
fn test_itemsep_follows_values_include() {
    let (_dir, main, schema_path) = document();
    assert!(register_itemsep_variable(&main, &schema_path).unwrap());

    let content = read(&main);
    let lines: Vec<&str> = content.lines().collect();
    let values = lines.iter().position(|l| *l == r"\input{values}").unwrap();
    assert_eq!(lines[values + 1], r"\setlength\itemsep{\getVal{itemsep}pt}");

    let schema = load_schema(&schema_path).unwrap();
    let itemsep = schema.number("itemsep").unwrap();
    assert_eq!((itemsep.min, itemsep.max, itemsep.precision), (-5.0, 5.0, 1));
}

#[test]
fn test_instrumenting_twice_keeps_schema_valid() {
    let (_dir, main, schema_path) = document();
    register_graphics_variables(&main, &schema_path).unwrap();
    assert!(register_itemsep_variable(&main, &schema_path).unwrap());
    let first = load_schema(&schema_path).unwrap();

    assert!(register_graphics_variables(&main, &schema_path).unwrap().is_empty());
    assert!(!register_itemsep_variable(&main, &schema_path).unwrap());

    let second = load_schema(&schema_path).unwrap();
    assert_eq!(second.numbers.len(), 3);
    assert_eq!(second.number("itemsep"), first.number("itemsep"));
    assert_eq!(read(&main).matches(r"\setlength\itemsep").count(), 1);
}

#[test]
fn test_itemsep_declared_only_in_schema() {
    let (_dir, main, schema_path) = document();
    std::fs::write(&schema_path, r#"{"numbers": {"itemsep": [-2, 2, 1]}}"#).unwrap();

    assert!(register_itemsep_variable(&main, &schema_path).unwrap());
    assert!(read(&main).contains(r"\getVal{itemsep}"));
    let itemsep = load_schema(&schema_path).unwrap().number("itemsep").cloned().unwrap();
    assert_eq!((itemsep.min, itemsep.max), (-2.0, 2.0));
}
