//! Runtime assembly and execution for the CLI.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use onair::bus::BusMessage;
use onair::config::{config_file_path, Settings};
use onair::diagnostics::DIAGNOSTICS_TOPIC;
use onair::runtime::RuntimeBuilder;

use crate::error::CliError;
use crate::synthetic::{SyntheticAdapter, SyntheticDetector};

fn resolve_path(config: Option<PathBuf>) -> PathBuf {
    config.unwrap_or_else(config_file_path)
}

/// Run the companion until interrupted.
pub async fn run(config: Option<PathBuf>, synthetic: bool) -> Result<(), CliError> {
    let path = resolve_path(config);
    let settings = Settings::load_required(&path)?;

    let _logging_guard = onair::logging::init_logging(
        onair::logging::default_log_dir(),
        onair::logging::default_log_file(),
    )
    .map_err(|error| CliError::LoggingInit(error.to_string()))?;

    info!(
        version = onair::VERSION,
        config = %path.display(),
        "starting onair"
    );

    let enabled = settings.enabled_platforms();
    if enabled.is_empty() {
        warn!("no platform section is enabled; only the overlay effector will run");
    }

    let mut builder = RuntimeBuilder::new(settings);
    if synthetic {
        info!("synthetic mode: scripted events stand in for platform adapters");
        for platform in &enabled {
            builder = builder.with_adapter(
                SyntheticAdapter::new(*platform),
                Arc::new(SyntheticDetector),
            );
        }
    }

    let runtime = builder.build();

    // Background-task failures surface on the diagnostics topic.
    let _diagnostics = runtime.bus().subscribe(DIAGNOSTICS_TOPIC, |message| {
        if let BusMessage::Diagnostic(event) = message {
            warn!(
                component = %event.component,
                "diagnostic: {}",
                event.message
            );
        }
        Ok(())
    });

    let shutdown = runtime.shutdown_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received; shutting down");
            shutdown.cancel();
        }
    });

    runtime.run().await?;
    Ok(())
}

/// Validate the configuration and print the effective settings.
pub fn check_config(config: Option<PathBuf>) -> Result<(), CliError> {
    let path = resolve_path(config);
    let settings = Settings::load_required(&path)?;

    println!("Configuration OK: {}", path.display());
    println!();
    for platform in onair::envelope::Platform::ALL {
        let p = settings.platform(platform);
        println!(
            "  [{platform}] enabled={} username={:?} notifications={} gifts={}",
            p.enabled, p.username, p.notifications_enabled, p.gifts_enabled
        );
    }
    println!(
        "  [obs] enabled={} address={} password={}",
        settings.obs.enabled,
        settings.obs.address,
        if settings.obs.password.is_some() {
            "<redacted>"
        } else {
            "<none>"
        }
    );
    println!(
        "  [tts] enabled={} provider={} only_for_gifts={}",
        settings.tts.enabled_raw, settings.tts.provider, settings.tts.only_for_gifts
    );
    println!(
        "  [general] gifts={} messages={} suppression={} dedup_ttl_ms={}",
        settings.general.gifts_enabled,
        settings.general.messages_enabled,
        settings.general.suppression_enabled,
        settings.general.dedup_ttl_ms
    );

    Ok(())
}
