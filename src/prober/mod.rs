use std::net::Ipv4Addr;
use std::time::Duration;

pub mod http;

/// Terminal state of a single probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Responded { address: Ipv4Addr, elapsed: Duration },
    TimedOut { address: Ipv4Addr },
}

/// How a request attempt ended, before classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Any HTTP response, whatever the status.
    Response,
    /// Refused, reset, protocol error, panic, anything but a timeout.
    Failure,
    /// The deadline passed first.
    Deadline,
}

/// The one rule: every termination other than the deadline counts as the
/// address being reachable, and its wall-clock time is kept.
pub fn classify(address: Ipv4Addr, termination: Termination, elapsed: Duration) -> ProbeOutcome {
    match termination {
        Termination::Deadline => ProbeOutcome::TimedOut { address },
        Termination::Response | Termination::Failure => ProbeOutcome::Responded { address, elapsed },
    }
}
