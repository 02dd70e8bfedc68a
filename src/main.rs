use anyhow::Context;
use clap::Parser;
use log::info;

use utm2code::config::{Cli, GeneratorConfig};
use utm2code::{Generator, HttpSource};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = GeneratorConfig::resolve(Cli::parse(), |var| std::env::var(var).ok())?;
    let source = HttpSource::new(&config.endpoint, config.credentials, config.insecure)?;
    let report = Generator::new(source, config.target, &config.output)
        .with_debug(config.debug)
        .run()
        .with_context(|| format!("Generating from {} failed", config.endpoint))?;

    info!(
        "Wrote {} files to {}",
        report.files.len(),
        report.root.display()
    );
    Ok(())
}
