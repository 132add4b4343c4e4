use std::path::{Path, PathBuf};

use clap::{command, value_parser, Arg, ArgAction};
use human_bytes::human_bytes;
use log::Level;
use logging_timer::stimer;
use memory_stats::memory_stats;
use serde_json::Value;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use twelf::Layer;

use es_fluent::{debug_if, AuditBuilder, Client, Config, EsError, ReindexJob, Result};

fn config_layer(path: &Path) -> Layer {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => Layer::Toml(path.to_path_buf()),
        Some("json") => Layer::Json(path.to_path_buf()),
        _ => Layer::Yaml(path.to_path_buf()),
    }
}

fn log_memory_usage(stage: &str) {
    if let Some(usage) = memory_stats() {
        info!(
            "Memory usage {}: physical {}, virtual {}",
            stage,
            human_bytes(usage.physical_mem as f64),
            human_bytes(usage.virtual_mem as f64)
        );
    } else {
        warn!("Couldn't get the current memory usage :(");
    }
}

async fn connect(config: &Config, name: &str) -> Result<Client> {
    let endpoint = config
        .find_endpoint(name)
        .ok_or_else(|| EsError::InvalidArgument(format!("unknown endpoint {:?}", name)))?;
    let mut client = Client::from_endpoint(endpoint.clone()).await?;
    client.discover_version().await?;
    Ok(client)
}

async fn run_job(
    config: &Config,
    job: &ReindexJob,
    no_dry_run: bool,
    audit: Option<&PathBuf>,
) -> Result<()> {
    let _tmr = stimer!(Level::Info; "REINDEX", "{} -> {}", job.get_index(), job.get_index_of_copy());

    let query: Option<Value> = match job.get_query() {
        Some(raw) => Some(serde_json::from_str(raw)?),
        None => None,
    };

    let source = connect(config, job.get_from()).await?;
    let mut count = source.count([job.get_index().as_str()]);
    if let Some(query) = &query {
        count = count.query(query.clone());
    }
    let total = count.execute().await?;

    if !no_dry_run {
        info!(
            "Dry run: {} documents of {} ({}) would be copied into {} ({})",
            total,
            job.get_index(),
            job.get_from(),
            job.get_index_of_copy(),
            job.get_to()
        );
        return Ok(());
    }

    let target = connect(config, job.get_to()).await?;
    let step = job.get_bulk_size().max(1) as u64;
    let mut reindexer = source
        .reindex(job.get_index().as_str(), job.get_index_of_copy().as_str())
        .target_client(target)
        .bulk_size(job.get_bulk_size())
        .keep_alive(job.get_keep_alive().as_str())
        .stats_only(job.is_stats_only())
        .progress(move |current, total| {
            if current % step == 0 || current == total {
                info!("Copied {}/{} documents", current, total);
            }
        });
    if let Some(query) = query {
        reindexer = reindexer.query(query);
    }
    if let Some(size) = job.get_scroll_size() {
        reindexer = reindexer.size(size);
    }
    if let Some(path) = audit {
        reindexer = reindexer.audit(AuditBuilder::new(&path.to_string_lossy()).await);
    }

    match reindexer.execute().await {
        Ok(response) => {
            info!(
                "Copied {} into {}: {} succeeded, {} failed, {} bulk requests",
                job.get_index(),
                job.get_index_of_copy(),
                response.success,
                response.failed,
                response.commits
            );
            for item in &response.errors {
                warn!(
                    "Failed to copy {}/{} (status {}): {:?}",
                    item.index, item.id, item.status, item.error
                );
            }
            Ok(())
        }
        Err(err) => {
            error!("{}", err);
            Err(err.source)
        }
    }
}

#[tokio::main]
async fn main() {
    let matches = command!() // requires `cargo` feature
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help("Sets a config file (YAML, TOML or JSON)")
                .value_parser(value_parser!(PathBuf))
                .required(true),
        )
        .arg(
            Arg::new("debug")
                .short('d')
                .long("debug")
                .help("Enable debug mode")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-dry-run")
                .short('n')
                .long("no-dry-run")
                .help("Disable dry run only")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("audit")
                .short('a')
                .long("audit")
                .help("Appends a JSON-lines audit trail of every bulk request to this file")
                .value_parser(value_parser!(PathBuf)),
        )
        .get_matches();

    let debug_mode = matches.get_flag("debug");
    let no_dry_run = matches.get_flag("no-dry-run");
    let audit = matches.get_one::<PathBuf>("audit");

    let default_filter = if debug_mode { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_file(true)
        .with_line_number(true)
        .init();

    info!("Application started!");

    let Some(config_path) = matches.get_one::<PathBuf>("config") else {
        error!("Config path must be set!");
        std::process::exit(2);
    };

    info!(
        "Args debug={:?}, no-dry-run={:?}, config_path={:?}, audit={:?}",
        debug_mode, no_dry_run, config_path, audit
    );

    let config = match Config::with_layers(&[config_layer(config_path)]) {
        Ok(config) => config,
        Err(err) => {
            error!("Failed to load config file {:?}: {}", config_path, err);
            std::process::exit(2);
        }
    };

    debug_if!(debug_mode, "Config file loaded correctly ... {:#?}", config);
    log_memory_usage("at start");

    let mut failures = 0;
    for job in config.get_jobs() {
        if let Err(err) = run_job(&config, job, no_dry_run, audit).await {
            error!(
                "Job {} -> {} failed: {}",
                job.get_index(),
                job.get_index_of_copy(),
                err
            );
            failures += 1;
        }
        log_memory_usage(&format!("after {}", job.get_index()));
    }

    if failures > 0 {
        error!("{} of {} jobs failed", failures, config.get_jobs().len());
        std::process::exit(1);
    }
    info!("Application finished!");
}
