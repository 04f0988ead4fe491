use anyhow::Context;
use azure_genai::cli::{run, Args};
use clap::Parser;
use log::LevelFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut logger = env_logger::Builder::from_default_env();
    if args.debug {
        logger.filter_level(LevelFilter::Debug);
    }
    logger.init();

    let command = args.command.name();
    run(args)
        .await
        .with_context(|| format!("{command} failed"))
}
