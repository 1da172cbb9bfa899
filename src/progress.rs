use std::io::{self, Write};

use anyhow::Result;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Bar that stays invisible until `show` is called, so log lines written
/// through it before the run (or during prompts) are not interleaved with a bar.
pub fn hidden_bar() -> ProgressBar {
    ProgressBar::with_draw_target(None, ProgressDrawTarget::hidden())
}

pub fn show(bar: &ProgressBar) -> Result<()> {
    let style = ProgressStyle::with_template(
        "Testing IPs {bar:40.cyan/blue} {pos}/{len} [{elapsed_precise}<{eta_precise}] {msg}",
    )?
    .progress_chars("=> ");
    bar.set_style(style);
    bar.set_draw_target(ProgressDrawTarget::stderr());
    Ok(())
}

/// Log sink that clears the bar, writes to stderr and redraws.
#[derive(Clone)]
pub struct ProgressWriter(pub ProgressBar);

impl Write for ProgressWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.suspend(|| io::stderr().write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}
