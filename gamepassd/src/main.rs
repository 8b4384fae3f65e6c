use aggregator::metrics_defs::{ALL_METRICS, MetricType};
use clap::Parser;
use metrics_exporter_statsd::StatsdBuilder;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod config;

use config::{Config, MetricsConfig};

#[derive(Parser)]
#[command(about = "Gamepass aggregation service")]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(long, short)]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = match Config::from_file(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Failed to load config: {err}. Exiting process.");
            std::process::exit(1);
        }
    };

    if let Err(err) = config.aggregator.validate() {
        eprintln!("Invalid config: {err}. Exiting process.");
        std::process::exit(1);
    }

    if let Some(metrics) = &config.common.metrics {
        install_statsd_recorder(metrics);
    }

    if let Err(err) = aggregator::api::serve(config.aggregator).await {
        eprintln!("Server error: {err}. Exiting process.");
        std::process::exit(1);
    }
}

/// Metrics are best-effort: a recorder that fails to install is logged and
/// the service runs without one.
fn install_statsd_recorder(config: &MetricsConfig) {
    let recorder = match StatsdBuilder::from(config.statsd_host.as_str(), config.statsd_port)
        .build(Some("gamepassd"))
    {
        Ok(recorder) => recorder,
        Err(err) => {
            tracing::warn!("could not build statsd recorder: {err}");
            return;
        }
    };

    if let Err(err) = metrics::set_global_recorder(recorder) {
        tracing::warn!("could not install statsd recorder: {err}");
        return;
    }

    for def in ALL_METRICS {
        match def.metric_type {
            MetricType::Counter => metrics::describe_counter!(def.name, def.description),
            MetricType::Histogram => metrics::describe_histogram!(def.name, def.description),
        }
    }
}
