mod cli;
mod config;
mod logging;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use log::LevelFilter;
use review_core::{apply, ConfigurationError, ReviewSet};
use review_engine::{
    export_keywords, export_reviews, keyword_report, validate_domain, ExportFormat, HarvestError,
    HarvestRequest, Harvester, LogProgressSink, ReqwestFetcher, ReviewPageExtractor,
};
use review_logging::{review_error, review_info, review_warn};
use tokio_util::sync::CancellationToken;

use crate::cli::Cli;
use crate::config::{ConfigError, HarvestConfig};
use crate::logging::LogDestination;

const EXIT_CONFIGURATION: u8 = 2;
const EXIT_INCOMPLETE: u8 = 3;
const EXIT_DISALLOWED: u8 = 4;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let destination = if cli.log_file {
        LogDestination::Both
    } else {
        LogDestination::Terminal
    };
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        review_logging::default_level()
    };
    logging::initialize(destination, level);

    match run(&cli).await {
        Ok(set) if set.complete => ExitCode::SUCCESS,
        Ok(set) => {
            review_warn!(
                "Results are incomplete ({}); exported what was collected",
                set.stop_reason
                    .map(|r| r.to_string())
                    .unwrap_or_else(|| "unknown reason".into())
            );
            ExitCode::from(EXIT_INCOMPLETE)
        }
        Err(err) => {
            review_error!("{:#}", err);
            exit_code_for(&err)
        }
    }
}

async fn run(cli: &Cli) -> anyhow::Result<ReviewSet> {
    let mut config = match &cli.config {
        Some(path) => config::load(path)?,
        None => HarvestConfig::default(),
    };
    cli.apply_overrides(&mut config);

    let filters = cli.filters()?;
    let sort = cli.sort()?;
    let format: ExportFormat = config.output.parse()?;
    let domain = validate_domain(&cli.domain)?;
    // Date windows are evaluated against the day the run started.
    let reference = Utc::now().date_naive();

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            review_warn!("Interrupted; stopping after the current page");
            on_interrupt.cancel();
        }
    });

    let harvester = Harvester::new(
        Arc::new(ReqwestFetcher::new(config.fetch_settings())),
        Box::new(ReviewPageExtractor::new()),
        config.harvest_settings(),
    );
    let request = HarvestRequest {
        domain: domain.clone(),
        filters: filters.clone(),
    };
    let set = harvester.run(&request, &cancel, &LogProgressSink).await?;
    if set.dropped_records > 0 || set.duplicate_records > 0 {
        review_info!(
            "Skipped {} unusable and {} repeated review blocks",
            set.dropped_records,
            set.duplicate_records
        );
    }

    let selected = apply(&set.reviews, &filters, sort, reference);
    review_info!(
        "{} of {} collected reviews match the filters",
        selected.len(),
        set.reviews.len()
    );

    let summary = export_reviews(&config.output_dir, &domain, &selected, format)
        .with_context(|| format!("exporting reviews to {:?}", config.output_dir))?;
    for path in &summary.paths {
        review_info!("Wrote {}", path.display());
    }

    if cli.analyze {
        let report = keyword_report(&selected, config.keyword_min_len);
        let path = export_keywords(&config.output_dir, &domain, &report)
            .context("exporting keyword report")?;
        review_info!("Wrote {} keywords to {}", report.len(), path.display());
    }

    Ok(set)
}

fn exit_code_for(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<HarvestError>() {
        Some(HarvestError::Disallowed(_)) => return ExitCode::from(EXIT_DISALLOWED),
        Some(HarvestError::Configuration(_)) => return ExitCode::from(EXIT_CONFIGURATION),
        None => {}
    }
    if err.downcast_ref::<ConfigurationError>().is_some()
        || err.downcast_ref::<ConfigError>().is_some()
    {
        return ExitCode::from(EXIT_CONFIGURATION);
    }
    ExitCode::FAILURE
}
