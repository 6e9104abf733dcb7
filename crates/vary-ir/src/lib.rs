//! Declarative description of a document's variability: the configuration
//! schema, concrete configurations and the schema file helpers.

pub mod merge;
pub mod parse;
pub mod types;

pub use parse::{load_schema, parse_schema, SchemaError};
pub use types::{Configuration, ConfigurationSchema, EnumDomain, NumberDomain, Value, VariableKind};
