mod config;
mod error;
mod metrics;
mod pools;
mod prober;
mod progress;
mod provider;
mod report;
mod sampler;
mod scheduler;
#[cfg(test)]
mod testutil;

use clap::Parser;
use config::{ask_terminal, Cli, LogFormat, RunConfig, Settings};
use pools::AddressPool;
use prober::http::HttpProber;
use progress::ProgressWriter;
use scheduler::Scheduler;

use anyhow::bail;
use indicatif::ProgressBar;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    // Load config first to get log level
    let settings = Settings::load(Cli::parse())?;
    let log_level = settings.get_tracing_level()?;

    let bar = progress::hidden_bar();
    init_tracing(log_level, settings.log_format(), bar.clone())?;

    let config = settings.resolve(ask_terminal)?;
    info!(
        "pool={} count={} workers={} timeout={}s port={}",
        config.pool, config.count, config.workers, config.timeout_secs, config.port
    );

    let pool = load_pool(&config).await?;

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let addresses = sampler::sample(&pool, config.count, &mut rng)?;
    info!("sampled {} addresses from {} {} entries", addresses.len(), pool.len(), config.pool);

    let prober = HttpProber::new(config.timeout(), config.port)?;
    let scheduler = Scheduler::new(config.workers)?;
    info!("probing with {} workers", scheduler.workers());

    progress::show(&bar)?;
    let results = scheduler
        .run(
            addresses,
            move |ip| {
                let prober = prober.clone();
                async move { prober.probe(ip).await }
            },
            &bar,
        )
        .await?;
    bar.finish();

    metrics::record_batch(config.pool.as_str(), &results);
    report::emit(config.pool, &results, config.timeout_secs, &config.output_dir)?;
    if let Some(path) = &config.metrics_file {
        metrics::write_textfile(path)?;
        info!("metrics written to {}", path.display());
    }

    Ok(())
}

fn init_tracing(level: tracing::Level, format: LogFormat, bar: ProgressBar) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(format!("cdn_probe={}", level.as_str().to_lowercase()).parse()?);
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(move || ProgressWriter(bar.clone()));
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
    Ok(())
}

async fn load_pool(config: &RunConfig) -> anyhow::Result<AddressPool> {
    if let Some(cidrs) = config.pool.cidrs() {
        return Ok(AddressPool::from_cidrs(cidrs)?);
    }

    println!("Fetching Bunny CDN IP addresses...");
    let ips = provider::fetch_edge_list(&config.bunny_endpoint, config.fetch_timeout).await?;
    if ips.is_empty() {
        bail!("Failed to fetch Bunny CDN IPs: {} returned no addresses", config.bunny_endpoint);
    }
    println!("Fetched {} Bunny CDN IP addresses.", ips.len());
    let pool = AddressPool::from_strings(ips);
    if pool.is_empty() {
        bail!("Failed to fetch Bunny CDN IPs: no usable IPv4 addresses in the edge list");
    }
    Ok(pool)
}
