use std::io::{self, Write};

use serde::Serialize;
use tracing::debug;

use crate::app::{ProgressEvent, ProgressSink};
use crate::export::ExportResult;
use crate::import::ImportResult;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Console,
    Json,
}

/// Progress lines on stdout, as they happen.
pub struct ConsoleOutput;

impl ProgressSink for ConsoleOutput {
    fn event(&self, event: ProgressEvent) {
        // a closed stdout must not abort the transfer
        if let Err(err) = write_progress(&mut io::stdout().lock(), &event) {
            debug!(error = %err, "progress line not written");
        }
    }
}

fn write_progress<W: Write>(out: &mut W, event: &ProgressEvent) -> io::Result<()> {
    match event.elapsed {
        Some(elapsed) => writeln!(out, "{} ({:.1}s)", event.message, elapsed.as_secs_f64()),
        None => writeln!(out, "{}", event.message),
    }
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_export(result: &ExportResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_import(result: &ImportResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}
