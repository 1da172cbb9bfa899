use std::net::Ipv4Addr;

use reqwest::{Client, redirect};
use tokio::time::{timeout, Duration, Instant};
use tracing::{debug, trace};

use super::{classify, ProbeOutcome, Termination};

pub const DEFAULT_PORT: u16 = 80;

/// Plain-HTTP GET against a literal address, one attempt, hard deadline.
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: Client,
    timeout: Duration,
    port: u16,
}

impl HttpProber {
    /// The client is shared by every probe; with no idle pool each probe
    /// still opens and owns its own connection.
    pub fn new(timeout: Duration, port: u16) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .pool_max_idle_per_host(0)
            .redirect(redirect::Policy::none())
            .no_proxy()
            .build()?;
        debug!("http prober ready: port={} timeout={:?}", port, timeout);
        Ok(Self { client, timeout, port })
    }

    /// Elapsed runs until the whole response body is in, or the request fails.
    pub async fn probe(&self, address: Ipv4Addr) -> ProbeOutcome {
        let url = format!("http://{}:{}/", address, self.port);

        let start = Instant::now();
        let attempt = async {
            let resp = self.client.get(&url).send().await?;
            trace!("http probe {} answered {}", url, resp.status());
            resp.bytes().await
        };
        let termination = match timeout(self.timeout, attempt).await {
            Err(_) => Termination::Deadline,
            Ok(Err(e)) if e.is_timeout() => Termination::Deadline,
            Ok(Err(e)) => {
                trace!("http probe {} failed: {:?}", url, e);
                Termination::Failure
            }
            Ok(Ok(_)) => Termination::Response,
        };
        classify(address, termination, start.elapsed())
    }
}
