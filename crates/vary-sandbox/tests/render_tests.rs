#![cfg(unix)]

use std::path::Path;

use vary_ir::types::{Configuration, Value};
use vary_sandbox::config::RenderConfig;
use vary_sandbox::render::{CommandRenderer, RenderError, Renderer};

const MAIN_TEX: &str = r"\documentclass{article}
\begin{document}
Hello \getVal{name}.
\end{document}
";

const LAYOUT: &str = r#"{
    "pages": [
        {"rect": [0, 0, 612, 792], "blocks": [[72, 72, 540, 400]]},
        {"rect": [0, 0, 612, 792], "crop_origin": [0, 10], "blocks": [[72, 72, 540, 100], [72, 300, 540, 320]]}
    ]
}"#;

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

fn source_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("main.tex"), MAIN_TEX).unwrap();
    std::fs::write(dir.path().join("layout.json"), LAYOUT).unwrap();
    dir
}

fn scripted_config(compile: &[&str]) -> RenderConfig {
    RenderConfig {
        main_file: "main".to_string(),
        timeout_secs: 1,
        compile_command: argv(compile),
        compile_passes: 1,
        bibliography: false,
        bibliography_command: argv(&["true"]),
        layout_command: argv(&["sh", "-c", "cat layout.json"]),
    }
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

#[test]
fn test_prepare_instruments_copy_only() {
    let source = source_dir();
    let renderer = CommandRenderer::prepare(source.path(), scripted_config(&["true"])).unwrap();

    let main = read(&renderer.workspace_path().join("main.tex"));
    assert!(main.contains("\\input{macros}"));
    assert!(main.contains("\\input{values}"));
    let indicator = main.find("\\newwrite\\writeRemSpace").unwrap();
    assert!(indicator < main.find("\\end{document}").unwrap());
    assert!(renderer.workspace_path().join("macros.tex").exists());

    // The user's source is untouched.
    assert_eq!(read(&source.path().join("main.tex")), MAIN_TEX);
}

#[test]
fn test_render_reads_layout_and_values() {
    let source = source_dir();
    let renderer = CommandRenderer::prepare(source.path(), scripted_config(&["true"])).unwrap();

    let mut config = Configuration::new();
    config.insert("ACK", true);
    config.insert("EMAIL", false);
    config.insert("size", 0.7);
    let doc = renderer.render(&config).unwrap();

    assert_eq!(doc.page_count, 2);
    assert_eq!(doc.last_page().unwrap().crop_extent(), (10.0, 802.0));
    assert_eq!(doc.last_page().unwrap().block_extents(), vec![(82.0, 110.0), (310.0, 330.0)]);
    assert_eq!(doc.reported_space, None);

    let values = read(&renderer.workspace_path().join("values.tex"));
    assert!(values.contains("\\defVal{ACK}{}"));
    assert!(values.contains("\\defVal{size}{0.7}"));
    assert!(!values.contains("EMAIL"));
}

#[test]
fn test_render_picks_up_reported_space() {
    let source = source_dir();
    let config = scripted_config(&["sh", "-c", "echo 12.5pt > space.txt"]);
    let renderer = CommandRenderer::prepare(source.path(), config).unwrap();

    let mut cfg = Configuration::new();
    cfg.insert("style", Value::Text("\\tiny".to_string()));
    let doc = renderer.render(&cfg).unwrap();
    assert_eq!(doc.reported_space, Some(12.5));
}

#[test]
fn test_slow_compile_times_out() {
    let source = source_dir();
    let renderer = CommandRenderer::prepare(source.path(), scripted_config(&["sh", "-c", "sleep 5"])).unwrap();

    let err = renderer.render(&Configuration::new()).unwrap_err();
    assert!(err.is_timeout(), "expected timeout, got {err:?}");
}

#[test]
fn test_failing_layout_extractor() {
    let source = source_dir();
    let mut config = scripted_config(&["true"]);
    config.layout_command = argv(&["false"]);
    let renderer = CommandRenderer::prepare(source.path(), config).unwrap();

    let err = renderer.render(&Configuration::new()).unwrap_err();
    assert!(matches!(err, RenderError::Failed { .. }));
}

#[test]
fn test_garbage_layout_output() {
    let source = source_dir();
    let mut config = scripted_config(&["true"]);
    config.layout_command = argv(&["echo", "not json"]);
    let renderer = CommandRenderer::prepare(source.path(), config).unwrap();

    let err = renderer.render(&Configuration::new()).unwrap_err();
    assert!(matches!(err, RenderError::Layout(_)));
}
