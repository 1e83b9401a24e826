/*
 * 5D Labs Namespace Reaper
 * Copyright (C) 2025 5D Labs
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published
 * by the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 */

//! Namespace Reaper - deletes namespaces whose expiry annotation has passed
//!
//! Runs a cleanup cycle immediately and then once per interval until SIGINT or
//! SIGTERM. With `--once` a single cycle runs and the process exits.

use anyhow::{Context, Result};
use clap::Parser;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use namespace_reaper::config::{ANNOTATION_KEY_ENV, NAMESPACES_REGEX_ENV};
use namespace_reaper::telemetry::{self, LogFormat};
use namespace_reaper::{KubeNamespaces, ReaperSettings, Scheduler};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Deletes Kubernetes namespaces whose expiry annotation has passed
#[derive(Parser, Debug)]
#[command(name = "namespace-reaper")]
#[command(version, about)]
struct Cli {
    /// Path to the kubeconfig file (optional, in-cluster config is used otherwise)
    #[arg(long)]
    kubeconfig: Option<PathBuf>,

    /// Enable dry run mode
    #[arg(long, env = "DRY_RUN")]
    dry_run: bool,

    /// Annotation holding the expiry timestamp (unix seconds)
    #[arg(long, env = ANNOTATION_KEY_ENV, default_value = "")]
    annotation_key: String,

    /// Seconds between cleanup cycles
    #[arg(
        long,
        env = "CLEANUP_INTERVAL_SECONDS",
        default_value_t = 3600,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    interval_seconds: u64,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Json)]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    telemetry::init(cli.log_format).context("unable to start logging system")?;

    info!(
        "Starting Namespace Reaper v{}",
        env!("CARGO_PKG_VERSION")
    );

    let settings = ReaperSettings::new(cli.annotation_key.trim(), cli.dry_run);
    if !settings.has_annotation_key() {
        warn!(
            "{} is not set, no namespace will be considered expired",
            ANNOTATION_KEY_ENV
        );
    }
    if settings.dry_run {
        info!("Dry run enabled, expired namespaces will only be logged");
    }

    let client = match build_client(cli.kubeconfig.as_deref()).await {
        Ok(client) => client,
        Err(e) => {
            error!(error = %format!("{e:#}"), "Error creating Kubernetes client");
            return Ok(ExitCode::FAILURE);
        }
    };
    info!("Connected to Kubernetes cluster");

    let namespaces = Arc::new(KubeNamespaces::new(client));
    let scheduler = Scheduler::new(namespaces.clone(), namespaces, settings)
        .with_interval(Duration::from_secs(cli.interval_seconds));

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            shutdown_signal().await;
            cancel.cancel();
        }
    });

    if cli.once {
        return Ok(match scheduler.run_once(&cancel).await {
            Ok(_) => ExitCode::SUCCESS,
            Err(e) => {
                error!(error = %e, "Error cleaning up namespaces");
                ExitCode::FAILURE
            }
        });
    }

    info!(
        interval_seconds = cli.interval_seconds,
        pattern_env = NAMESPACES_REGEX_ENV,
        "Running cleanup cycles"
    );
    scheduler.run(cancel).await;

    Ok(ExitCode::SUCCESS)
}

/// Explicit kubeconfig when given, in-cluster service account otherwise.
async fn build_client(kubeconfig: Option<&Path>) -> Result<Client> {
    let config = match kubeconfig {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path)
                .with_context(|| format!("Error loading kubeconfig {}", path.display()))?;
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .context("Error loading kubeconfig")?
        }
        None => Config::incluster().context("Error loading in-cluster config")?,
    };

    Client::try_from(config).context("Error creating Kubernetes client")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully");
        },
        () = terminate => {
            info!("Received SIGTERM, shutting down gracefully");
        },
    }
}
