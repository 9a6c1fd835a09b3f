//! Final per-task report on stdout.

use std::io::Write;

use anyhow::{Context, Result};
use litefetch_core::{TaskSnapshot, TaskStatus};

/// Writes one line per task, or the snapshots as a JSON array.
pub(crate) fn write_summary(
    out: &mut impl Write,
    snapshots: &[TaskSnapshot],
    json: bool,
) -> Result<()> {
    if json {
        serde_json::to_writer_pretty(&mut *out, snapshots)
            .context("Failed to serialize task snapshots")?;
        writeln!(out)?;
        return Ok(());
    }

    for snapshot in snapshots {
        match snapshot.status {
            TaskStatus::Complete => writeln!(
                out,
                "{}  {}  -> {}",
                snapshot.id,
                snapshot.status_line(),
                snapshot.destination.display()
            )?,
            _ => writeln!(out, "{}  {}  ({})", snapshot.id, snapshot.status_line(), snapshot.url)?,
        }
        if let Some(advisory) = &snapshot.probe_advisory {
            writeln!(out, "    note: {advisory}")?;
        }
    }
    Ok(())
}
