use std::future::Future;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use indicatif::ProgressBar;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::error::ScheduleError;
use crate::prober::{classify, ProbeOutcome, Termination};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Responsive {
    pub address: Ipv4Addr,
    pub elapsed: Duration,
}

/// Responders in completion order, plus batch counters.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProbeResultSet {
    pub responsive: Vec<Responsive>,
    pub total: usize,
    pub timed_out: usize,
}

impl ProbeResultSet {
    fn record(&mut self, outcome: ProbeOutcome, progress: &ProgressBar) {
        match outcome {
            ProbeOutcome::Responded { address, elapsed } => {
                self.responsive.push(Responsive { address, elapsed });
                progress.set_message(format!("{} {:.2}s", address, elapsed.as_secs_f64()));
            }
            ProbeOutcome::TimedOut { address } => {
                self.timed_out += 1;
                progress.set_message(format!("{} timeout", address));
            }
        }
        progress.inc(1);
    }

    pub fn completed(&self) -> usize {
        self.responsive.len() + self.timed_out
    }
}

/// Fixed pool of probe workers over a batch of addresses.
pub struct Scheduler {
    workers: usize,
}

impl Scheduler {
    pub fn new(workers: usize) -> Result<Self, ScheduleError> {
        if workers == 0 {
            return Err(ScheduleError::NoWorkers);
        }
        Ok(Self { workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// probe: async closure run once per address
    ///
    /// At most `workers` probes are in flight. Workers forward outcomes over a
    /// channel to this task, which alone owns the result set and drives
    /// `progress`. Returns once every address has a terminal outcome.
    pub async fn run<P, F>(
        &self,
        addresses: Vec<Ipv4Addr>,
        probe: P,
        progress: &ProgressBar,
    ) -> Result<ProbeResultSet, ScheduleError>
    where
        P: Fn(Ipv4Addr) -> F + Clone + Send + 'static,
        F: Future<Output = ProbeOutcome> + Send + 'static,
    {
        let total = addresses.len();
        progress.set_length(total as u64);
        progress.set_position(0);

        let queue: Arc<[Ipv4Addr]> = addresses.into();
        let cursor = Arc::new(AtomicUsize::new(0));
        let (tx, mut rx) = mpsc::channel::<ProbeOutcome>(self.workers);

        let mut workers = JoinSet::new();
        for id in 0..self.workers.min(total) {
            let queue = queue.clone();
            let cursor = cursor.clone();
            let tx = tx.clone();
            let probe = probe.clone();
            workers.spawn(async move {
                loop {
                    let next = cursor.fetch_add(1, Ordering::Relaxed);
                    let Some(&address) = queue.get(next) else {
                        break;
                    };
                    let outcome = isolate(address, probe.clone()).await;
                    if tx.send(outcome).await.is_err() {
                        break;
                    }
                }
                debug!("probe worker {} drained", id);
            });
        }
        drop(tx);

        let mut results = ProbeResultSet {
            total,
            ..Default::default()
        };
        while let Some(outcome) = rx.recv().await {
            results.record(outcome, progress);
        }
        while let Some(joined) = workers.join_next().await {
            joined?;
        }
        Ok(results)
    }
}

/// Runs one probe on its own task, closure call included; a probe that dies
/// instead of returning is still a non-timeout termination.
async fn isolate<P, F>(address: Ipv4Addr, probe: P) -> ProbeOutcome
where
    P: Fn(Ipv4Addr) -> F + Send + 'static,
    F: Future<Output = ProbeOutcome> + Send + 'static,
{
    let start = Instant::now();
    match tokio::spawn(async move { probe(address).await }).await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!("probe of {} aborted: {}", address, e);
            classify(address, Termination::Failure, start.elapsed())
        }
    }
}
