use anyhow::Context;
use clap::Parser;
use log::info;

use vary_core::cli::{apply_overrides, parse_configuration, Cli, Command};
use vary_core::config::VaryConfig;
use vary_core::session::{instrument, Session};
use vary_ir::types::Configuration;

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => VaryConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => VaryConfig::default(),
    };
    apply_overrides(&mut config, &cli);
    config.validate()?;

    match &cli.command {
        Command::Instrument(args) => {
            let added = instrument(&config, args.graphics, args.itemsep)?;
            for domain in &added {
                info!("{}: [{}, {}] precision {}", domain.name, domain.min, domain.max, domain.precision);
            }
            println!("{} variables added to {}", added.len(), config.schema_path().display());
        }
        Command::Generate(args) => {
            let fixed = match &args.fixed {
                Some(json) => parse_configuration(json).context("parsing --fixed")?,
                None => Configuration::new(),
            };
            let session = Session::open(config)?;
            let report = session.generate(&fixed)?;
            println!(
                "{} of {} samples generated ({} timed out, {} degenerate, {} failed)",
                report.generated, report.requested, report.timeouts, report.degenerate, report.failed
            );
        }
        Command::Train(_) => {
            let session = Session::open(config)?;
            let model = session.train()?;
            match model.accuracy {
                Some(accuracy) => println!("Accuracy : {accuracy}"),
                None => println!("trained on {} samples", model.train_rows),
            }
        }
        Command::Predict(args) => {
            let partial = parse_configuration(&args.partial).context("parsing configuration")?;
            let session = Session::open(config)?;
            let report = session.predict(&partial)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Render(args) => {
            let configuration = parse_configuration(&args.configuration).context("parsing configuration")?;
            let session = Session::open(config)?;
            let pdf = session.render(&configuration)?;
            println!("{}", pdf.display());
        }
    }
    Ok(())
}
