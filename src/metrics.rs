use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use once_cell::sync::Lazy;
use std::path::Path;
use anyhow::{Context, Result};

use crate::scheduler::ProbeResultSet;

static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

static OUTCOME_COUNTER: Lazy<IntCounterVec> = Lazy::new(|| {
    let opts = Opts::new("cdn_probe_outcomes_total", "Probe outcomes by pool");
    let ctr = IntCounterVec::new(opts, &["pool", "outcome"]).unwrap();
    REGISTRY.register(Box::new(ctr.clone())).unwrap();
    ctr
});

static RESPONSE_HIST: Lazy<HistogramVec> = Lazy::new(|| {
    let opts = HistogramOpts::new("cdn_probe_response_seconds", "Time until a responsive address terminated")
        .buckets(vec![0.01, 0.025, 0.05, 0.1, 0.2, 0.35, 0.5, 0.75, 1.0, 2.0, 5.0, 10.0]);
    let hist = HistogramVec::new(opts, &["pool"]).unwrap();
    REGISTRY.register(Box::new(hist.clone())).unwrap();
    hist
});

pub fn record_batch(pool: &str, results: &ProbeResultSet) {
    let responded = results.responsive.len() as u64;
    OUTCOME_COUNTER.with_label_values(&[pool, "responded"]).inc_by(responded);
    OUTCOME_COUNTER.with_label_values(&[pool, "timeout"]).inc_by(results.timed_out as u64);

    let hist = RESPONSE_HIST.with_label_values(&[pool]);
    for r in &results.responsive {
        hist.observe(r.elapsed.as_secs_f64());
    }
}

pub fn render() -> Result<String> {
    let encoder = TextEncoder::new();
    let mf = REGISTRY.gather();
    let mut buf = Vec::new();
    encoder.encode(&mf, &mut buf)?;
    Ok(String::from_utf8(buf)?)
}

/// Text exposition dump for a node-exporter textfile collector.
pub fn write_textfile(path: &Path) -> Result<()> {
    let body = render()?;
    // write-then-rename so a scraper never sees a partial file
    let tmp = path.with_extension("prom.tmp");
    std::fs::write(&tmp, body).with_context(|| format!("writing {}", tmp.display()))?;
    std::fs::rename(&tmp, path).with_context(|| format!("renaming to {}", path.display()))?;
    Ok(())
}
