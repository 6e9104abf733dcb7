//! Command-line interface.
//!
//! ```bash
//! vary generate -g 50 --reset
//! vary train --max-pages 4 --train-size 70
//! vary predict --max-pages 4 '{"ACK": true}'
//! vary render '{"ACK": false, "size": 0.8}'
//! vary instrument --graphics --itemsep
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use vary_explore::space::SpaceSource;
use vary_ir::types::Configuration;

use crate::config::VaryConfig;

/// Explore the configuration space of a parameterized LaTeX document.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "vary")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// JSON configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Document source directory
    #[arg(short, long, global = true)]
    pub source: Option<PathBuf>,

    /// Output directory
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// Main file of the document, with or without `.tex`
    #[arg(short = 'f', long, global = true)]
    pub main_file: Option<String>,

    /// Subprocess deadline in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Render random configurations and extend the sample table
    Generate(GenerateArgs),

    /// Train the decision tree on the sample table
    Train(TrainArgs),

    /// Probabilities of meeting the page constraint around a partial configuration
    Predict(PredictArgs),

    /// Render a single configuration
    Render(RenderArgs),

    /// Turn graphics sizes and item spacing into variables
    Instrument(InstrumentArgs),
}

#[derive(Parser, Debug, Clone, PartialEq)]
pub struct GenerateArgs {
    /// Number of configurations to render
    #[arg(short, long)]
    pub generations: Option<usize>,

    /// Start a new sample table
    #[arg(long)]
    pub reset: bool,

    /// Render on all cores
    #[arg(long)]
    pub parallel: bool,

    /// geometry, geometry-no-page-number or tex-indicator
    #[arg(long)]
    pub space_source: Option<SpaceSource>,

    /// Values every configuration keeps, as a JSON object
    #[arg(long)]
    pub fixed: Option<String>,
}

#[derive(Parser, Debug, Clone, PartialEq)]
pub struct TrainArgs {
    /// Maximum acceptable page count
    #[arg(short = 'p', long)]
    pub max_pages: Option<u32>,

    /// Percentage of samples used for training
    #[arg(short = 't', long)]
    pub train_size: Option<f64>,
}

#[derive(Parser, Debug, Clone, PartialEq)]
pub struct PredictArgs {
    /// Maximum acceptable page count
    #[arg(short = 'p', long)]
    pub max_pages: Option<u32>,

    /// Partial configuration as a JSON object
    #[arg(value_name = "CONFIG", default_value = "{}")]
    pub partial: String,
}

#[derive(Parser, Debug, Clone, PartialEq)]
pub struct RenderArgs {
    /// Configuration as a JSON object
    #[arg(value_name = "CONFIG")]
    pub configuration: String,
}

#[derive(Parser, Debug, Clone, PartialEq)]
pub struct InstrumentArgs {
    #[arg(long)]
    pub graphics: bool,

    #[arg(long)]
    pub itemsep: bool,
}

pub fn parse_args<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(args)
}

/// Parse a configuration given as a JSON object.
pub fn parse_configuration(json: &str) -> Result<Configuration, serde_json::Error> {
    serde_json::from_str(json)
}

/// Apply command-line overrides on top of a file or default configuration.
pub fn apply_overrides(config: &mut VaryConfig, cli: &Cli) {
    if let Some(source) = &cli.source {
        config.source_dir = source.clone();
    }
    if let Some(output) = &cli.output {
        config.output_dir = output.clone();
    }
    if let Some(main_file) = &cli.main_file {
        config.render.main_file = main_file.trim_end_matches(".tex").to_string();
    }
    if let Some(timeout) = cli.timeout {
        config.render.timeout_secs = timeout;
    }

    match &cli.command {
        Command::Generate(args) => {
            if let Some(generations) = args.generations {
                config.generations = generations;
            }
            config.reset |= args.reset;
            config.parallel |= args.parallel;
            if let Some(source) = args.space_source {
                config.space_source = source;
            }
        }
        Command::Train(args) => {
            if args.max_pages.is_some() {
                config.max_pages = args.max_pages;
            }
            if let Some(train_size) = args.train_size {
                config.train_size = train_size;
            }
        }
        Command::Predict(args) => {
            if args.max_pages.is_some() {
                config.max_pages = args.max_pages;
            }
        }
        Command::Render(_) | Command::Instrument(_) => {}
    }
}
