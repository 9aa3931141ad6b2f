//! `carto` command-line front end.

mod cli;

use carto_engine::GdalCliEngine;
use carto_features::ReqwestClient;
use carto_model::{CartoConfig, LayerRegistry, FEATURE_CATEGORIES};
use carto_runner::{
    progress_channel, spawn_worker, CancelToken, Pipeline, PipelineError, ProgressEvent,
};
use clap::Parser;
use cli::{Cli, Command};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const RUN_RECORD_FILE: &str = "run.yaml";

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();
    carto_metrics::describe_metrics();

    if let Command::Categories = cli.command {
        print_categories();
        return ExitCode::SUCCESS;
    }

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(cli, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, config: CartoConfig) -> Result<(), PipelineError> {
    let engine = GdalCliEngine::from_config(&config.engine);
    let http = ReqwestClient::from_config(&config.overpass)
        .map_err(|e| PipelineError::InputMissing(format!("HTTP client unavailable: {}", e)))?;

    let (reporter, events) = progress_channel();
    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        if let Err(e) = ctrlc::set_handler(move || {
            eprintln!("\nStopping after the current stage...");
            cancel.cancel();
        }) {
            warn!("Could not install Ctrl+C handler: {}", e);
        }
    }

    std::fs::create_dir_all(&config.output_dir)?;
    let mut registry = LayerRegistry::load_or_new(&config.output_dir)?;
    let mut pipeline = Pipeline::new(config.clone(), Arc::new(engine), Arc::new(http))
        .with_progress(reporter)
        .with_cancel_token(cancel);

    info!(
        run = %pipeline.run_record().id,
        output = %config.output_dir.display(),
        target = %config.target_crs,
        "Starting"
    );

    let worker = spawn_worker(move || {
        let result = execute(&mut pipeline, &mut registry, &cli.command, &config);
        let result = result.and_then(|message| {
            pipeline.save_project(&registry)?;
            Ok(message)
        });
        match &result {
            Ok(message) => pipeline.finish(true, message.clone()),
            Err(e) => pipeline.finish(false, e.to_string()),
        }
        write_run_record(&pipeline);
        result
    })?;

    for event in events.iter() {
        match event {
            // Status messages are already logged by the reporter.
            ProgressEvent::Status { .. } => {}
            ProgressEvent::Progress { stage, percent } => println!("[{}] {}%", stage, percent),
            ProgressEvent::Finished { success, message } => {
                let mark = if success { "done" } else { "failed" };
                println!("{}: {}", mark, message);
            }
        }
    }

    worker.join()?.map(|_| ())
}

fn execute(
    pipeline: &mut Pipeline,
    registry: &mut LayerRegistry,
    command: &Command,
    config: &CartoConfig,
) -> Result<String, PipelineError> {
    match command {
        Command::Run { extent, .. } => {
            let summary = pipeline.run_all(registry, extent.source(config)?)?;
            Ok(format!(
                "{} layers, {} of {} feature categories fetched, {} styled",
                registry.len(),
                summary.acquisition.fetched(),
                summary.acquisition.categories.len(),
                summary.styling.styled.len()
            ))
        }
        Command::Extent { extent } => {
            let source = extent.source(config)?.ok_or_else(|| {
                PipelineError::InputMissing(
                    "give --bbox, --extent-file or --from-dem".to_string(),
                )
            })?;
            let extent = pipeline.define_extent(registry, source)?;
            let bbox = extent.bbox();
            Ok(format!(
                "Extent ({}, {}, {}, {}) in {}",
                bbox.min_x,
                bbox.min_y,
                bbox.max_x,
                bbox.max_y,
                extent.crs()
            ))
        }
        Command::Dem { .. } => {
            let report = pipeline.process_dem(registry)?;
            Ok(format!(
                "{} of {} elevation stages completed",
                report.completed(),
                report.stages.len()
            ))
        }
        Command::Features { .. } => {
            let report = pipeline.acquire_features(registry)?;
            Ok(format!(
                "{} categories fetched, {} placeholders",
                report.fetched(),
                report.placeholders()
            ))
        }
        Command::Reproject => {
            let report = pipeline.reproject_layers(registry)?;
            Ok(format!(
                "{} reprojected, {} unchanged, {} failed",
                report.reprojected.len(),
                report.unchanged.len(),
                report.failed.len()
            ))
        }
        Command::Style => {
            let report = pipeline.style_layers(registry)?;
            Ok(format!(
                "{} styled, {} without a rule, {} failed",
                report.styled.len(),
                report.unstyled.len(),
                report.failed.len()
            ))
        }
        Command::Categories => Ok(String::new()),
    }
}

fn write_run_record(pipeline: &Pipeline) {
    let path = pipeline.output_dir().join(RUN_RECORD_FILE);
    let written = pipeline
        .run_record()
        .to_yaml()
        .map_err(|e| e.to_string())
        .and_then(|yaml| std::fs::write(&path, yaml).map_err(|e| e.to_string()));
    if let Err(e) = written {
        warn!(path = %path.display(), error = %e, "Could not write run record");
    }
}

fn print_categories() {
    println!("{:<10} {:<10} {:<8} Values", "Layer", "Tag", "Geometry");
    for category in &FEATURE_CATEGORIES {
        println!(
            "{:<10} {:<10} {:<8} {}",
            category.layer_name,
            category.tag,
            category.geometry_kind.to_string(),
            category.values.join(", ")
        );
    }
}
