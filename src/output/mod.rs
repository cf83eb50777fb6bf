//! Report output: human-readable text or JSON envelopes on stdout.

mod envelope;
pub mod progress;
mod table;

pub use envelope::{
    ErrorPayload, EventType, JsonEnvelope, ResultPayload, ResultType, SPEC_VERSION,
};
pub use table::Table;

use crate::error::{Error, Result};
use serde::Serialize;
use std::io::{self, Write};

/// How results are written to stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputMode {
    /// Aligned text tables.
    #[default]
    Human,
    /// One JSON envelope per command.
    Json,
}

impl OutputMode {
    /// Whether spinners may be drawn.
    pub fn shows_progress(self) -> bool {
        self == Self::Human
    }
}

/// Write a command result to stdout.
///
/// `human` renders the text form and is only called in human mode.
pub fn emit<T: Serialize>(
    mode: OutputMode,
    result_type: ResultType,
    data: &T,
    human: impl FnOnce(&T) -> String,
) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_result(&mut out, mode, result_type, data, human)
}

/// Write a command result to `out`.
pub fn write_result<W: Write, T: Serialize>(
    out: &mut W,
    mode: OutputMode,
    result_type: ResultType,
    data: &T,
    human: impl FnOnce(&T) -> String,
) -> Result<()> {
    match mode {
        OutputMode::Human => {
            let text = human(data);
            write!(out, "{text}")?;
            if !text.ends_with('\n') {
                writeln!(out)?;
            }
        }
        OutputMode::Json => {
            let envelope = JsonEnvelope::new(EventType::Result, ResultPayload { result_type, data });
            let json = serde_json::to_string_pretty(&envelope)
                .map_err(|e| Error::OutputSerialize { source: e })?;
            writeln!(out, "{json}")?;
        }
    }
    out.flush()?;
    Ok(())
}

/// Write an error envelope to stdout (JSON mode only).
pub fn emit_error(mode: OutputMode, error: &Error) {
    if mode != OutputMode::Json {
        return;
    }
    let envelope = JsonEnvelope::new(EventType::Error, ErrorPayload::from_error(error));
    if let Ok(json) = serde_json::to_string_pretty(&envelope) {
        println!("{json}");
    }
}
