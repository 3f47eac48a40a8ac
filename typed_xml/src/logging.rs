//! Opt-in tracing output
//!
//! The library only emits `tracing` events. Applications that have no subscriber of
//! their own can install this one: events from this crate go to stderr, filtered by a
//! level that can be changed at runtime.

use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};

use error_stack::Report;
use tracing::{Level, Subscriber};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Layer, Registry};

use crate::error::{Error, Result};

static CURRENT_LEVEL: AtomicU8 = AtomicU8::new(1); // warn

/// Filter that checks each event against the process-wide [`TracingLevel`]
#[derive(Clone)]
pub struct DynamicFilter;

impl<S> Layer<S> for DynamicFilter
where
    S: Subscriber,
{
    fn enabled(
        &self,
        metadata: &tracing::Metadata<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) -> bool {
        if !metadata.target().starts_with(env!("CARGO_CRATE_NAME")) {
            return *metadata.level() <= Level::WARN;
        }
        TracingLevel::from_level(*metadata.level()).as_u8() <= CURRENT_LEVEL.load(Ordering::Relaxed)
    }
}

/// Tracing levels that can be set at runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracingLevel {
    /// Failures only
    Error,
    /// Failures and warnings
    Warn,
    /// Codec construction and cache policy changes
    Info,
    /// Cache hits and insertions
    Debug,
    /// Everything
    Trace,
}

impl FromStr for TracingLevel {
    type Err = Report<Error>;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(Report::new(Error::invalid(
                "tracing level",
                format!("'{s}', valid levels are: error, warn, info, debug, trace"),
            ))),
        }
    }
}

impl TracingLevel {
    const fn as_u8(self) -> u8 {
        match self {
            Self::Error => 0,
            Self::Warn => 1,
            Self::Info => 2,
            Self::Debug => 3,
            Self::Trace => 4,
        }
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Error,
            2 => Self::Info,
            3 => Self::Debug,
            4 => Self::Trace,
            _ => Self::Warn,
        }
    }

    fn from_level(level: Level) -> Self {
        match level {
            Level::ERROR => Self::Error,
            Level::WARN => Self::Warn,
            Level::INFO => Self::Info,
            Level::DEBUG => Self::Debug,
            Level::TRACE => Self::Trace,
        }
    }

    /// Lowercase name of the level
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

/// Install a stderr subscriber filtered by the current [`TracingLevel`]
///
/// Fails if a global subscriber is already set.
pub fn try_init_tracing() -> Result<()> {
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(true)
        .with_thread_names(true);

    Registry::default()
        .with(DynamicFilter)
        .with(stderr_layer)
        .try_init()
        .map_err(|e| Report::new(Error::InvalidState(format!("tracing already initialized: {e}"))))
}

/// Set the level used by [`DynamicFilter`]
pub fn set_tracing_level(level: TracingLevel) {
    CURRENT_LEVEL.store(level.as_u8(), Ordering::Relaxed);
    tracing::info!("Tracing level set to: {}", level.as_str());
}

/// Level currently used by [`DynamicFilter`]
pub fn current_tracing_level() -> TracingLevel {
    TracingLevel::from_u8(CURRENT_LEVEL.load(Ordering::Relaxed))
}
