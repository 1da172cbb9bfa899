use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::Deserialize;
use tracing::warn;

use crate::error::InputError;
use crate::pools::PoolKind;
use crate::prober::http::DEFAULT_PORT;
use crate::provider::{BUNNY_EDGE_LIST, DEFAULT_FETCH_TIMEOUT_SECS};

pub const CONFIG_ENV: &str = "CDN_PROBE_CONFIG";
pub const DEFAULT_TIMEOUT_SECS: f64 = 1.0;

/// Sample addresses from a CDN's ranges and find the ones answering HTTP.
///
/// Pool and count are prompted for when omitted and stdin is a terminal.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "cdn-probe", version)]
pub struct Cli {
    /// Pool to sample: fastly, cloudflare or bunny
    #[arg(long, short = 'p')]
    pub pool: Option<String>,

    /// Number of addresses to probe
    #[arg(long, short = 'n', allow_negative_numbers = true)]
    pub count: Option<String>,

    /// Concurrent probes [default: CPU cores]
    #[arg(long, short = 'w', allow_negative_numbers = true)]
    pub workers: Option<String>,

    /// Per-probe timeout in seconds [default: 1]
    #[arg(long, short = 't', allow_negative_numbers = true)]
    pub timeout: Option<String>,

    /// Port probed on every address
    #[arg(long)]
    pub port: Option<u16>,

    /// Seed for reproducible sampling
    #[arg(long)]
    pub seed: Option<u64>,

    /// Directory the CSV report is written to
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Bunny edge server list endpoint
    #[arg(long)]
    pub bunny_endpoint: Option<String>,

    /// Write Prometheus text exposition here after the run
    #[arg(long)]
    pub metrics_file: Option<PathBuf>,

    /// JSON config file (also read from CDN_PROBE_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// trace, debug, info, warn or error
    #[arg(long)]
    pub log_level: Option<String>,

    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Optional defaults loaded from JSON; the command line wins over these.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub workers: Option<i64>,
    pub timeout_secs: Option<f64>,
    pub port: Option<u16>,
    pub output_dir: Option<PathBuf>,
    pub bunny_endpoint: Option<String>,
    pub fetch_timeout_secs: Option<f64>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub metrics_file: Option<PathBuf>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Config file not readable: {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("Config file malformed: {}", path.display()))?;
        Ok(config)
    }
}

/// Command line merged with the config file, before anything is asked.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub cli: Cli,
    pub file: FileConfig,
}

/// Everything a run needs, fully resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub pool: PoolKind,
    pub count: usize,
    pub workers: usize,
    pub timeout_secs: f64,
    pub port: u16,
    pub seed: Option<u64>,
    pub output_dir: PathBuf,
    pub bunny_endpoint: String,
    pub fetch_timeout: Duration,
    pub metrics_file: Option<PathBuf>,
}

impl RunConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_secs)
    }
}

impl Settings {
    pub fn load(cli: Cli) -> Result<Self> {
        let path = cli
            .config
            .clone()
            .or_else(|| std::env::var(CONFIG_ENV).ok().map(PathBuf::from));
        let file = match path {
            Some(path) => FileConfig::load(&path)?,
            None => FileConfig::default(),
        };
        Ok(Self { cli, file })
    }

    pub fn log_level(&self) -> &str {
        self.cli
            .log_level
            .as_deref()
            .or(self.file.log_level.as_deref())
            .unwrap_or("info")
    }

    pub fn log_format(&self) -> LogFormat {
        self.cli.log_format.or(self.file.log_format).unwrap_or_default()
    }

    /// Get the log level as a tracing::Level
    pub fn get_tracing_level(&self) -> Result<tracing::Level> {
        match self.log_level().to_lowercase().as_str() {
            "trace" => Ok(tracing::Level::TRACE),
            "debug" => Ok(tracing::Level::DEBUG),
            "info" => Ok(tracing::Level::INFO),
            "warn" | "warning" => Ok(tracing::Level::WARN),
            "error" => Ok(tracing::Level::ERROR),
            _ => Err(anyhow::anyhow!("Invalid log level: {}. Valid levels are: trace, debug, info, warn, error", self.log_level()))
        }
    }

    /// Fill in the run. `ask` is consulted for values given nowhere else and
    /// returns None when nobody can answer.
    pub fn resolve<A>(&self, mut ask: A) -> Result<RunConfig>
    where
        A: FnMut(&str) -> Option<String>,
    {
        let interactive = self.cli.pool.is_none() || self.cli.count.is_none();

        let pool = match &self.cli.pool {
            Some(p) => p.clone(),
            None => ask("Which network to test? [fastly/cloudflare/bunny]: ")
                .ok_or(InputError::Missing("pool"))?,
        };
        let pool: PoolKind = pool.parse()?;

        let count = match &self.cli.count {
            Some(c) => c.clone(),
            None => ask("Enter number of IPs to check: ").ok_or(InputError::Missing("count"))?,
        };
        let count = parse_count(&count)?;

        let recommended = default_workers();
        let workers = self
            .cli
            .workers
            .clone()
            .or_else(|| self.file.workers.map(|w| w.to_string()))
            .or_else(|| {
                interactive
                    .then(|| ask(&format!("Enter number of worker threads [recommended {recommended}]: ")))
                    .flatten()
            });
        let workers = parse_workers(workers.as_deref(), recommended);

        let timeout = self
            .cli
            .timeout
            .clone()
            .or_else(|| self.file.timeout_secs.map(|t| t.to_string()))
            .or_else(|| {
                interactive
                    .then(|| ask("Enter timeout in seconds [default 1]: "))
                    .flatten()
            });
        let timeout_secs = parse_timeout(timeout.as_deref());

        let fetch_timeout_secs = match self.file.fetch_timeout_secs {
            Some(t) if usable_secs(t) => t,
            Some(t) => {
                warn!("Invalid fetch timeout {}; using default of {} seconds.", t, DEFAULT_FETCH_TIMEOUT_SECS);
                DEFAULT_FETCH_TIMEOUT_SECS
            }
            None => DEFAULT_FETCH_TIMEOUT_SECS,
        };

        Ok(RunConfig {
            pool,
            count,
            workers,
            timeout_secs,
            port: self.cli.port.or(self.file.port).unwrap_or(DEFAULT_PORT),
            seed: self.cli.seed,
            output_dir: self
                .cli
                .output_dir
                .clone()
                .or_else(|| self.file.output_dir.clone())
                .unwrap_or_else(|| PathBuf::from(".")),
            bunny_endpoint: self
                .cli
                .bunny_endpoint
                .clone()
                .or_else(|| self.file.bunny_endpoint.clone())
                .unwrap_or_else(|| BUNNY_EDGE_LIST.to_string()),
            fetch_timeout: Duration::from_secs_f64(fetch_timeout_secs),
            metrics_file: self
                .cli
                .metrics_file
                .clone()
                .or_else(|| self.file.metrics_file.clone()),
        })
    }
}

/// Prompt on the controlling terminal; None when stdin is not one.
pub fn ask_terminal(question: &str) -> Option<String> {
    let stdin = io::stdin();
    if !stdin.is_terminal() {
        return None;
    }
    print!("{}", question);
    io::stdout().flush().ok()?;
    let mut line = String::new();
    stdin.lock().read_line(&mut line).ok()?;
    Some(line.trim().to_string())
}

pub fn default_workers() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

/// Positive and representable as a Duration.
fn usable_secs(secs: f64) -> bool {
    Duration::try_from_secs_f64(secs).is_ok_and(|d| !d.is_zero())
}

fn parse_count(text: &str) -> Result<usize, InputError> {
    match text.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(InputError::InvalidCount(text.trim().to_string())),
    }
}

fn parse_workers(text: Option<&str>, recommended: usize) -> usize {
    let text = match text.map(str::trim) {
        None | Some("") => return recommended,
        Some(t) => t,
    };
    match text.parse::<usize>() {
        Ok(n) if n > 0 => n,
        _ => {
            warn!("Invalid worker count {:?}; using recommended value {}.", text, recommended);
            recommended
        }
    }
}

fn parse_timeout(text: Option<&str>) -> f64 {
    let text = match text.map(str::trim) {
        None | Some("") => return DEFAULT_TIMEOUT_SECS,
        Some(t) => t,
    };
    match text.parse::<f64>() {
        Ok(t) if usable_secs(t) => t,
        _ => {
            warn!("Invalid timeout {:?}; using default of {} second(s).", text, DEFAULT_TIMEOUT_SECS);
            DEFAULT_TIMEOUT_SECS
        }
    }
}
