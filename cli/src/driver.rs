use std::{io::Write, sync::Arc};

use async_std::io::{BufRead, prelude::BufReadExt};
use core_types::CleanupRecord;
use instruction_writer::{InstructionWriter, bus::BatchHandle, record_store::RecordStore};

use crate::input::{DriverInput, parse_line};

/// Feeds input lines to `writer` until EOF and returns the handles of every
/// batch it dispatched.
///
/// Lines that are not UTF-8 or not valid input are logged and skipped. A read
/// error ends the input early; batches already dispatched are still returned.
pub async fn read_input<R>(mut reader: R, writer: &InstructionWriter) -> Vec<BatchHandle>
where
    R: BufRead + Unpin,
{
    let mut handles = Vec::new();
    let mut buf = Vec::new();
    let mut line_number = 0usize;

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => line_number += 1,
            Err(e) => {
                tracing::error!(error = %e, line_number, "Failed to read input, stopping");
                break;
            }
        }

        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, line_number, "skipping input line that is not UTF-8");
                continue;
            }
        };

        match parse_line(line) {
            Ok(Some(input)) => handle_input(writer, input, &mut handles),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, line_number, "skipping malformed input line"),
        }
    }

    handles
}

fn handle_input(writer: &InstructionWriter, input: DriverInput, handles: &mut Vec<BatchHandle>) {
    if let Some(signal) = input.control_signal() {
        writer.signal(signal);
        return;
    }

    match input {
        DriverInput::Instruction(batch) => {
            if let Some(handle) = writer.dispatch(batch) {
                handles.push(handle);
            }
        }
        DriverInput::Describe => match serde_json::to_string(&writer.describe()) {
            Ok(description) => tracing::info!(%description, "describe"),
            Err(e) => tracing::error!(error = %e, "failed to serialize description"),
        },
        DriverInput::Pause | DriverInput::Resume | DriverInput::Shutdown => {}
    }
}

/// Writes each cleanup set to `out` as one JSON line until the channel closes.
/// The driver stands in for the upstream store here, so written records are no
/// longer tracked.
pub async fn write_cleanup<W: Write>(
    rx: flume::Receiver<Vec<CleanupRecord>>,
    records: Arc<RecordStore>,
    mut out: W,
) -> W {
    while let Ok(cleaned) = rx.recv_async().await {
        let written = serde_json::to_string(&cleaned)
            .map_err(|e| e.to_string())
            .and_then(|line| {
                writeln!(out, "{}", line)
                    .and_then(|()| out.flush())
                    .map_err(|e| e.to_string())
            });
        if let Err(e) = written {
            // records stay tracked, the producer redelivers them
            tracing::error!(error = %e, count = cleaned.len(), "Failed to write cleanup records");
            continue;
        }
        for record in &cleaned {
            records.forget(&record.key);
        }
    }
    out
}
