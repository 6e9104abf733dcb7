//! Append-only table of observations.
//!
//! Column order is fixed by the schema: booleans, numbers, enums, choice
//! members, then `nbPages` and `space`. Rows keep generation order, which
//! is what the train/test split relies on.
//!
//! On disk the table is a CSV file with a leading unnamed index column and
//! booleans written `True`/`False`. Files without the index column, or with
//! booleans in another case, load as well.

use std::path::Path;

use vary_ir::types::{Configuration, ConfigurationSchema, Value, VariableKind};

/// One observation: a configuration and what its render measured.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub config: Configuration,
    pub nb_pages: u32,
    pub space: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("column mismatch: expected [{}], found [{}]", .expected.join(", "), .found.join(", "))]
    ColumnMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("sample has no value for column '{column}'")]
    MissingColumn { column: String },

    #[error("row {row}: invalid value '{value}' in column '{column}'")]
    InvalidCell {
        row: usize,
        column: String,
        value: String,
    },
}

#[derive(Debug, Clone)]
pub struct SampleStore {
    schema: ConfigurationSchema,
    columns: Vec<String>,
    samples: Vec<Sample>,
}

impl SampleStore {
    /// Empty store for `schema`.
    pub fn create(schema: &ConfigurationSchema) -> Self {
        Self {
            schema: schema.clone(),
            columns: schema.variable_columns(),
            samples: Vec::new(),
        }
    }

    /// Load a table previously exported for `schema`.
    pub fn load(path: &Path, schema: &ConfigurationSchema) -> Result<Self, StoreError> {
        let mut reader = csv::ReaderBuilder::new().from_path(path)?;
        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        let indexed = headers.first().is_some_and(|h| h.is_empty());
        let offset = usize::from(indexed);
        let found = headers[offset..].to_vec();
        let expected = schema.table_columns();
        if found != expected {
            return Err(StoreError::ColumnMismatch { expected, found });
        }

        let mut store = Self::create(schema);
        let n_vars = store.columns.len();
        for (row, record) in reader.records().enumerate() {
            let record = record?;
            let cell = |i: usize| record.get(i + offset).unwrap_or("");
            let invalid = |column: &str, value: &str| StoreError::InvalidCell {
                row,
                column: column.to_string(),
                value: value.to_string(),
            };

            let mut config = Configuration::new();
            for (i, column) in store.columns.iter().enumerate() {
                let raw = cell(i);
                let value = parse_cell(schema, column, raw).ok_or_else(|| invalid(column, raw))?;
                config.insert(column.clone(), value);
            }

            let pages = cell(n_vars);
            let nb_pages = parse_pages(pages).ok_or_else(|| invalid(&expected[n_vars], pages))?;
            let space = cell(n_vars + 1);
            let space = space
                .trim()
                .parse::<f64>()
                .map_err(|_| invalid(&expected[n_vars + 1], space))?;

            store.samples.push(Sample {
                config,
                nb_pages,
                space,
            });
        }
        log::debug!("loaded {} samples from {}", store.len(), path.display());
        Ok(store)
    }

    /// Fresh store when `reset` is set or nothing exists at `path`,
    /// otherwise the table stored there.
    pub fn open(path: &Path, schema: &ConfigurationSchema, reset: bool) -> Result<Self, StoreError> {
        if reset || !path.exists() {
            log::info!("starting a new sample table at {}", path.display());
            Ok(Self::create(schema))
        } else {
            Self::load(path, schema)
        }
    }

    /// Append one observation. Every configuration column must be set.
    pub fn append(&mut self, sample: Sample) -> Result<(), StoreError> {
        if let Some(column) = self.columns.iter().find(|c| !sample.config.contains(c)) {
            return Err(StoreError::MissingColumn {
                column: column.clone(),
            });
        }
        self.samples.push(sample);
        Ok(())
    }

    /// Write the whole table to `path`.
    pub fn export(&self, path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = csv::WriterBuilder::new().from_path(path)?;

        let mut header = vec![String::new()];
        header.extend(self.schema.table_columns());
        writer.write_record(&header)?;

        for (index, sample) in self.samples.iter().enumerate() {
            let mut record = Vec::with_capacity(header.len());
            record.push(index.to_string());
            for column in &self.columns {
                record.push(sample.config.get(column).map(format_cell).unwrap_or_default());
            }
            record.push(sample.nb_pages.to_string());
            record.push(sample.space.to_string());
            writer.write_record(&record)?;
        }
        writer.flush()?;
        log::debug!("exported {} samples to {}", self.len(), path.display());
        Ok(())
    }

    pub fn schema(&self) -> &ConfigurationSchema {
        &self.schema
    }

    /// Configuration columns, without `nbPages` and `space`.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

fn format_cell(value: &Value) -> String {
    match value {
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        other => other.to_string(),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("true") || raw == "1" {
        Some(true)
    } else if raw.eq_ignore_ascii_case("false") || raw == "0" {
        Some(false)
    } else {
        None
    }
}

fn parse_cell(schema: &ConfigurationSchema, column: &str, raw: &str) -> Option<Value> {
    match schema.kind_of(column)? {
        VariableKind::Boolean | VariableKind::ChoiceMember => parse_bool(raw).map(Value::Bool),
        VariableKind::Number => raw.trim().parse::<f64>().ok().map(Value::Number),
        VariableKind::Enum => Some(Value::Text(raw.to_string())),
    }
}

/// Page counts may have been written as floats (`3.0`).
fn parse_pages(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    raw.parse::<u32>().ok().or_else(|| {
        let pages = raw.parse::<f64>().ok()?;
        (pages.fract() == 0.0 && pages >= 0.0 && pages <= u32::MAX as f64).then_some(pages as u32)
    })
}
