//! Underrated artist radar.
//!
//! Finds emerging artists through listening-stats charts, links them to
//! their photo and video platform profiles, merges everything into one table
//! and ranks artists whose audience looks smaller than their reach.

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub mod actions;
pub mod collector;
pub mod config;
pub mod error;
pub mod matching;
pub mod merge;
pub mod repository;
pub mod scoring;
pub mod services;

/// Log to stdout and append a plain-text copy to `log_file`.
/// `RUST_LOG` overrides the default filter.
pub fn init_tracing(log_file: &Path) -> anyhow::Result<()> {
    if let Some(parent) = log_file.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,radar_ingestion=debug")),
        )
        .try_init()?;
    Ok(())
}
