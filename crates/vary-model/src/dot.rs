//! Graphviz rendering of a trained tree.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::encode::FeatureSpace;
use crate::tree::DecisionTree;

fn class_name(class: bool) -> &'static str {
    if class {
        "True"
    } else {
        "False"
    }
}

fn escape(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}

/// DOT text of `tree`, features named after `features`.
pub fn export_dot(tree: &DecisionTree, features: &FeatureSpace) -> String {
    let mut out = String::new();
    out.push_str("digraph Tree {\n");
    out.push_str("node [shape=box, style=\"rounded\", fontname=\"helvetica\"] ;\n");
    out.push_str("edge [fontname=\"helvetica\"] ;\n");

    for node in 0..tree.node_count() {
        let population = &tree.value()[node];
        let samples: f64 = population.iter().sum();
        let gini = if samples > 0.0 {
            1.0 - population.iter().map(|c| (c / samples).powi(2)).sum::<f64>()
        } else {
            0.0
        };
        let counts: Vec<String> = population.iter().map(|c| c.to_string()).collect();

        let mut label = String::new();
        if !tree.is_leaf(node) {
            let index = tree.feature()[node] as usize;
            let name = features
                .get(index)
                .map(|f| f.to_string())
                .unwrap_or_else(|| format!("X[{index}]"));
            let _ = write!(label, "{} <= {}\\n", escape(&name), tree.threshold()[node]);
        }
        let _ = write!(
            label,
            "gini = {gini:.3}\\nsamples = {samples}\\nvalue = [{}]\\nclass = {}",
            counts.join(", "),
            class_name(tree.majority(node))
        );
        let _ = writeln!(out, "{node} [label=\"{label}\"] ;");

        if !tree.is_leaf(node) {
            let left = tree.children_left()[node];
            let right = tree.children_right()[node];
            if node == 0 {
                let _ = writeln!(out, "{node} -> {left} [labeldistance=2.5, labelangle=45, headlabel=\"True\"] ;");
                let _ = writeln!(out, "{node} -> {right} [labeldistance=2.5, labelangle=-45, headlabel=\"False\"] ;");
            } else {
                let _ = writeln!(out, "{node} -> {left} ;");
                let _ = writeln!(out, "{node} -> {right} ;");
            }
        }
    }
    out.push_str("}\n");
    out
}

/// Write `dt.dot` into `output_dir` and, when `dot_program` is given,
/// render `dt.png` from it. A failing renderer is logged, not returned.
pub fn write_visualization(
    tree: &DecisionTree,
    features: &FeatureSpace,
    output_dir: &Path,
    dot_program: Option<&str>,
) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;
    let dot_path = output_dir.join("dt.dot");
    std::fs::write(&dot_path, export_dot(tree, features))?;
    log::info!("tree written to {}", dot_path.display());

    if let Some(program) = dot_program {
        let png_path = output_dir.join("dt.png");
        match Command::new(program)
            .arg("-Tpng")
            .arg(&dot_path)
            .arg("-o")
            .arg(&png_path)
            .status()
        {
            Ok(status) if status.success() => log::info!("tree image written to {}", png_path.display()),
            Ok(status) => log::warn!("'{program}' exited with {status}, no tree image"),
            Err(err) => log::warn!("could not run '{program}': {err}"),
        }
    }
    Ok(dot_path)
}
