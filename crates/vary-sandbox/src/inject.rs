//! Source instrumentation: variable definitions, the space indicator and
//! discovery of numeric variables in the document.

use std::path::{Path, PathBuf};

use regex::Regex;
use serde_json::{json, Map};

use vary_ir::merge::merge_into_file;
use vary_ir::types::{round_to, Configuration, NumberDomain, Value};

/// File the values of the current configuration are written to.
pub const VALUES_FILE: &str = "values.tex";
/// File holding the `\defVal` / `\getVal` macros.
pub const MACROS_FILE: &str = "macros.tex";
/// File the space indicator writes the remaining space to.
pub const SPACE_FILE: &str = "space.txt";

const MACROS: &str = r"\makeatletter
\newcommand{\defVal}[2]{\expandafter\def\csname vary@#1\endcsname{#2}}
\newcommand{\getVal}[1]{\csname vary@#1\endcsname}
\newcommand{\ifVal}[3]{\@ifundefined{vary@#1}{#3}{#2}}
\makeatother
";

const SPACE_INDICATOR: &str = "\\newwrite\\writeRemSpace\n\
\\immediate\\openout\\writeRemSpace=space.txt\n\
\\immediate\\write\\writeRemSpace{\\the\\dimexpr\\pagegoal-\\pagetotal-\\baselineskip\\relax}\n\
\\immediate\\closeout\\writeRemSpace\n";

#[derive(Debug, thiserror::Error)]
pub enum InjectError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("no {anchor} found in {path}")]
    MissingAnchor { path: PathBuf, anchor: &'static str },

    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("cannot parse remaining space '{content}'")]
    BadSpace { content: String },

    #[error("schema update failed: {0}")]
    Schema(#[from] vary_ir::SchemaError),
}

fn read(path: &Path) -> Result<String, InjectError> {
    std::fs::read_to_string(path).map_err(|source| InjectError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn write(path: &Path, content: &str) -> Result<(), InjectError> {
    std::fs::write(path, content).map_err(|source| InjectError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// ── Values ───────────────────────────────────────────────────────────

/// `\defVal{name}{value}` line for one variable, or `None` when the
/// variable is switched off.
pub fn variable_definition(name: &str, value: &Value) -> Option<String> {
    match value {
        Value::Bool(false) => None,
        Value::Text(s) if s == "False" || s == "false" => None,
        Value::Bool(true) => Some(format!("\\defVal{{{name}}}{{}}")),
        other => Some(format!("\\defVal{{{name}}}{{{other}}}")),
    }
}

/// Write the configuration as `values.tex` in `dir`.
pub fn write_values(dir: &Path, config: &Configuration) -> Result<(), InjectError> {
    let mut content = String::new();
    for (name, value) in config.iter() {
        if let Some(line) = variable_definition(name, value) {
            content.push_str(&line);
            content.push('\n');
        }
    }
    write(&dir.join(VALUES_FILE), &content)
}

/// Write the macros file next to the document.
pub fn write_macros(dir: &Path) -> Result<(), InjectError> {
    write(&dir.join(MACROS_FILE), MACROS)
}

/// Make the main file load the macros and values right after
/// `\documentclass`. Returns whether the file was modified.
pub fn ensure_value_includes(main_tex: &Path) -> Result<bool, InjectError> {
    let content = read(main_tex)?;
    let mut to_inject = String::new();
    for name in ["macros", "values"] {
        let input = format!("\\input{{{name}}}");
        let include = format!("\\include{{{name}}}");
        if !content.contains(&input) && !content.contains(&include) {
            to_inject.push_str(&input);
            to_inject.push('\n');
        }
    }
    if to_inject.is_empty() {
        return Ok(false);
    }

    let documentclass = Regex::new(r"\\documentclass(\[[^\]]*\])*\{[^}]*\}")?;
    let mut lines: Vec<String> = content.lines().map(str::to_string).collect();
    let index = lines
        .iter()
        .position(|line| documentclass.is_match(line))
        .ok_or_else(|| InjectError::MissingAnchor {
            path: main_tex.to_path_buf(),
            anchor: "\\documentclass",
        })?;
    lines.insert(index + 1, to_inject.trim_end().to_string());
    write(main_tex, &(lines.join("\n") + "\n"))?;
    Ok(true)
}

/// Insert the remaining-space writer just before the last uncommented
/// `\end{document}`.
pub fn inject_space_indicator(main_tex: &Path) -> Result<(), InjectError> {
    let content = read(main_tex)?;
    let end_document = Regex::new(r"^[^%]*\\end\{document\}")?;
    let mut lines: Vec<String> = content.lines().map(str::to_string).collect();
    let index = lines
        .iter()
        .rposition(|line| end_document.is_match(line))
        .ok_or_else(|| InjectError::MissingAnchor {
            path: main_tex.to_path_buf(),
            anchor: "\\end{document}",
        })?;
    lines.insert(index, SPACE_INDICATOR.trim_end().to_string());
    write(main_tex, &(lines.join("\n") + "\n"))
}

/// Remaining space reported by the indicator, in points (`"12.3pt"`).
pub fn read_reported_space(dir: &Path) -> Result<f64, InjectError> {
    let content = read(&dir.join(SPACE_FILE))?;
    let trimmed = content.trim();
    trimmed
        .strip_suffix("pt")
        .unwrap_or(trimmed)
        .trim()
        .parse()
        .map_err(|_| InjectError::BadSpace {
            content: trimmed.to_string(),
        })
}

// ── Variable discovery ───────────────────────────────────────────────

/// Files pulled in by `\input{...}` / `\include{...}` outside comments.
pub fn sub_files(main_tex: &Path) -> Result<Vec<String>, InjectError> {
    let pattern = Regex::new(r"^[^%]*\\(?:input|include)\{([^}]*)\}")?;
    Ok(read(main_tex)?
        .lines()
        .filter_map(|line| pattern.captures(line))
        .map(|caps| caps[1].to_string())
        .collect())
}

/// Domain around a measured size: 70%–130% of `value`, precision chosen so
/// a step is about a hundredth of its magnitude.
pub fn numeric_range(name: &str, value: f64) -> NumberDomain {
    let precision = (2.0 - value.log10()).round() as i32;
    NumberDomain {
        name: name.to_string(),
        min: round_to(value * 0.7, precision),
        max: round_to(value * 1.3, precision),
        precision,
    }
}

/// Rewrite `\includegraphics[param=<n><unit>]{file}` into
/// `\includegraphics[param=\getVal{param_file}<unit>]{file}` and return the
/// discovered variables with their original values.
pub fn rewrite_graphics(tex_file: &Path) -> Result<Vec<(String, f64)>, InjectError> {
    let tex_file = if tex_file.extension().is_some_and(|e| e == "tex") {
        tex_file.to_path_buf()
    } else {
        tex_file.with_extension("tex")
    };
    if !tex_file.is_file() {
        return Ok(Vec::new());
    }

    let graphics = Regex::new(r"^[^%]*(\\includegraphics\[([^\]]*)\]\{([^}]*)\})")?;
    let param = Regex::new(r"(\w+)\s*=\s*([\d.]+)(.*)")?;

    let content = read(&tex_file)?;
    let mut variables = Vec::new();
    let mut lines = Vec::new();
    for line in content.lines() {
        let mut rewritten = line.to_string();
        if let Some(caps) = graphics.captures(line) {
            let command = &caps[1];
            let graphic = &caps[3];
            if let Some(p) = param.captures(&caps[2]) {
                if let Ok(value) = p[2].parse::<f64>() {
                    let var_name = format!("{}_{}", &p[1], graphic);
                    let replacement = format!(
                        "\\includegraphics[{}=\\getVal{{{}}}{}]{{{}}}",
                        &p[1], var_name, &p[3], graphic
                    );
                    rewritten = line.replace(command, &replacement);
                    variables.push((var_name, value));
                }
            }
        }
        lines.push(rewritten);
    }
    if !variables.is_empty() {
        write(&tex_file, &(lines.join("\n") + "\n"))?;
    }
    Ok(variables)
}

/// Turn every graphics size of the document into a numeric variable and
/// register it in the schema file.
pub fn register_graphics_variables(
    main_tex: &Path,
    schema_path: &Path,
) -> Result<Vec<NumberDomain>, InjectError> {
    let base = main_tex.parent().unwrap_or(Path::new("."));
    let mut files: Vec<PathBuf> = sub_files(main_tex)?
        .into_iter()
        .map(|name| base.join(name))
        .collect();
    files.push(main_tex.to_path_buf());

    let mut domains = Vec::new();
    for file in files {
        for (name, value) in rewrite_graphics(&file)? {
            domains.push(numeric_range(&name, value));
        }
    }

    let numbers: Map<String, serde_json::Value> = domains
        .iter()
        .map(|d| (d.name.clone(), json!([d.min, d.max, d.precision])))
        .collect();
    merge_into_file(schema_path, json!({ "numbers": numbers }))?;
    log::info!("registered {} graphics variables", domains.len());
    Ok(domains)
}

/// Whether the schema file at `schema_path` already declares number `name`.
fn declares_number(schema_path: &Path, name: &str) -> Result<bool, InjectError> {
    let text = read(schema_path)?;
    if text.trim().is_empty() {
        return Ok(false);
    }
    let schema: serde_json::Value = serde_json::from_str(&text).map_err(vary_ir::SchemaError::from)?;
    Ok(schema.get("numbers").and_then(|numbers| numbers.get(name)).is_some())
}

/// Make the item spacing a numeric variable in `[-5, 5]` points. Returns
/// `false` when the document already has it.
pub fn register_itemsep_variable(main_tex: &Path, schema_path: &Path) -> Result<bool, InjectError> {
    let content = read(main_tex)?;
    let in_source = content.contains("\\getVal{itemsep}");
    let in_schema = declares_number(schema_path, "itemsep")?;
    if in_source && in_schema {
        return Ok(false);
    }

    if !in_source {
        let values_include = Regex::new(r"\\(?:input|include)\{values\}")?;
        let mut lines: Vec<String> = content.lines().map(str::to_string).collect();
        let index = lines
            .iter()
            .position(|line| values_include.is_match(line))
            .ok_or_else(|| InjectError::MissingAnchor {
                path: main_tex.to_path_buf(),
                anchor: "\\input{values}",
            })?;
        lines.insert(index + 1, "\\setlength\\itemsep{\\getVal{itemsep}pt}".to_string());
        write(main_tex, &(lines.join("\n") + "\n"))?;
    }
    if !in_schema {
        merge_into_file(schema_path, json!({"numbers": {"itemsep": [-5, 5, 1]}}))?;
    }
    Ok(true)
}
