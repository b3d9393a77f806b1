// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0

//! Default [`tracing`] setup for hosts and tests of Trellis.
//!
//! Events go to stderr with a short UTC timestamp and no target.
//! The filter defaults to [`DEBUG`](tracing::Level::DEBUG) in debug builds and
//! [`INFO`](tracing::Level::INFO) in release builds, and can be overridden with `RUST_LOG`.
//!
//! In debug builds, every event is also written to `trellis-<timestamp>-dense.log` in the
//! temporary directory, regardless of the filter. Pass tracing (see
//! [`PassTracing`](crate::app::PassTracing)) emits a lot of `trace` events, which is where
//! the file is most useful.
//!
//! An already configured global subscriber is never replaced.

use std::error::Error;
use std::fmt;
use std::fs::File;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use time::macros::format_description;
use tracing::Subscriber;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::prelude::*;

type RecoverableError = Box<dyn Error>;

/// Builds the subscriber described in the module docs, with `default_level` as the filter
/// used when `RUST_LOG` is unset.
///
/// Also returns the first recoverable error met, such as an unparsable `RUST_LOG` or a log
/// file which couldn't be created. Logging still works in that case, but degraded.
pub fn default_tracing_subscriber(
    default_level: LevelFilter,
) -> (impl Subscriber, Option<RecoverableError>) {
    let filter_builder = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .with_env_var("RUST_LOG");
    let mut error: Option<RecoverableError> = filter_builder
        .from_env()
        .err()
        .map(|err| format!("failed to parse RUST_LOG environment variable: {err:#}").into());
    let env_filter = filter_builder.from_env_lossy();

    // Time of day with millisecond precision; the `Z` marks it as UTC.
    let timer = UtcTime::new(format_description!(
        "[hour repr:24]:[minute]:[second].[subsecond digits:3]Z"
    ));
    let console_layer = tracing_subscriber::fmt::layer()
        .with_timer(timer.clone())
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(env_filter);

    // Skipped in release builds for performance.
    let log_file_layer = if cfg!(debug_assertions) {
        match create_log_file() {
            Ok((path, file)) => {
                #[allow(clippy::print_stderr, reason = "Tracing isn't set up yet")]
                {
                    eprintln!("Writing full logs to {}", path.display());
                }
                // Unfiltered.
                Some(
                    tracing_subscriber::fmt::layer()
                        .with_timer(timer)
                        .with_writer(file)
                        .with_ansi(false),
                )
            }
            Err(err) => {
                if error.is_none() {
                    error = Some(err);
                }
                None
            }
        }
    } else {
        None
    };

    let registry = tracing_subscriber::registry()
        .with(console_layer)
        .with(log_file_layer);
    (registry, error)
}

fn create_log_file() -> Result<(PathBuf, File), RecoverableError> {
    let timestamp = SystemTime::now().duration_since(UNIX_EPOCH)?.as_millis();
    let path = std::env::temp_dir().join(format!("trellis-{timestamp:016}-dense.log"));
    let file = File::create(&path)
        .map_err(|err| format!("failed to create log file {}: {err}", path.display()))?;
    Ok((path, file))
}

/// An error indicating that a global tracing subscriber has been set before.
#[derive(Debug)]
pub struct TracingSubscriberHasBeenSetError;

impl fmt::Display for TracingSubscriberHasBeenSetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad("A tracing subscriber has been set before.")
    }
}

impl Error for TracingSubscriberHasBeenSetError {}

fn install(default_level: LevelFilter) -> Result<(), TracingSubscriberHasBeenSetError> {
    // `has_been_set` is doc(hidden), but `tracing` itself relies on it for the 0.1 series.
    if tracing_core::dispatcher::has_been_set() {
        return Err(TracingSubscriberHasBeenSetError);
    }

    let (subscriber, error) = default_tracing_subscriber(default_level);
    // Can only fail if another thread won the race, which is as good as success.
    let _ = tracing::subscriber::set_global_default(subscriber);
    if let Some(error) = error {
        tracing::error!("Initialising logging encountered recoverable error: {error}");
    }
    Ok(())
}

/// Installs the default subscriber for a test.
///
/// Only warnings and errors reach the console, to keep test output readable.
pub fn try_init_test_tracing() -> Result<(), TracingSubscriberHasBeenSetError> {
    install(LevelFilter::WARN)
}

/// Installs the default subscriber for a host application.
pub fn try_init_tracing() -> Result<(), TracingSubscriberHasBeenSetError> {
    // DEBUG logs a few lines per pass. INFO only logs noteworthy things.
    let default_level = if cfg!(debug_assertions) {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    install(default_level)
}
