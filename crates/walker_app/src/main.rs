//! `walker`: resumable traversal of a paginated category table.

mod cli;
mod config;
mod platform;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::Parser;
use engine_logging::{engine_error, engine_info};
use walker_engine::{CheckpointStore, OutputStore, WalkSummary, Walker, WebDriverSource};

use crate::cli::{Cli, LogTarget};
use crate::platform::logging::{self, level_for};
use crate::platform::progress::LogProgressSink;

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::initialize(cli.log.into(), level_for(cli.verbose));

    match run(&cli) {
        Ok(summary) => {
            engine_info!(
                "Done: {} categories, {} rows written",
                summary.stats.categories_recorded,
                summary.stats.rows_written
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            engine_error!("{:#}", err);
            if cli.log == LogTarget::File {
                eprintln!("walker: {err:#}");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<WalkSummary> {
    let config = config::resolve(cli)?;
    engine_info!(
        "Output {:?}, checkpoint {:?}",
        config.output,
        config.checkpoint
    );

    let runtime = tokio::runtime::Runtime::new().context("could not start the async runtime")?;
    runtime.block_on(async move {
        let source = WebDriverSource::connect(&config.webdriver)
            .await
            .with_context(|| {
                format!(
                    "could not open a browser session via {}",
                    config.webdriver.webdriver_url
                )
            })?;
        let walker = Walker::new(
            Arc::new(source),
            config.walker,
            CheckpointStore::new(config.checkpoint),
            OutputStore::new(config.output),
            Arc::new(LogProgressSink),
        );
        walker.run().await.context("traversal aborted")
    })
}
