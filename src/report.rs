use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use tracing::info;

use crate::pools::PoolKind;
use crate::scheduler::{ProbeResultSet, Responsive};

pub fn csv_filename(pool: PoolKind, now: DateTime<Local>) -> String {
    format!("responsive_ips_{}_{}.csv", pool, now.format("%Y%m%d_%H%M%S"))
}

pub fn write_csv<W: Write>(writer: W, responsive: &[Responsive]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["ip", "response_time_s"])?;
    for r in responsive {
        wtr.write_record([
            r.address.to_string(),
            format!("{:.2}", r.elapsed.as_secs_f64()),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Print responders and save them as CSV under `output_dir`.
/// Nothing is written when no address responded.
pub fn emit(
    pool: PoolKind,
    results: &ProbeResultSet,
    timeout_secs: f64,
    output_dir: &Path,
) -> Result<Option<PathBuf>> {
    info!(
        "{}/{} probes finished: {} responsive, {} timed out",
        results.completed(),
        results.total,
        results.responsive.len(),
        results.timed_out
    );

    if results.responsive.is_empty() {
        println!("\nNo IPs responded within {} second(s).", timeout_secs);
        return Ok(None);
    }

    println!("\nResponsive IPs and timings:");
    for r in &results.responsive {
        println!("{}, {:.2}s", r.address, r.elapsed.as_secs_f64());
    }

    let path = output_dir.join(csv_filename(pool, Local::now()));
    let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
    write_csv(BufWriter::new(file), &results.responsive)
        .with_context(|| format!("writing {}", path.display()))?;
    println!("\nSaved responsive IPs to {}", path.display());
    Ok(Some(path))
}
