//! Air-gap precaution.
//!
//! The issuer's key should only be loaded while the machine is offline, and
//! funding and broadcasting need the network. Before each of those phases
//! the batch runner asks the operator to switch the connection and polls a
//! probe until it reports the expected state.

use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::confirmation::{Clock, DEFAULT_POLL_INTERVAL};
use crate::IssuerError;

/// Reports whether the machine can reach the network.
pub trait ConnectivityProbe: Send + Sync {
    fn is_online(&self) -> bool;
}

/// Probes connectivity by opening a TCP connection to a well-known host.
#[derive(Clone, Debug)]
pub struct TcpProbe {
    target: String,
    timeout: Duration,
}

impl TcpProbe {
    /// # Arguments
    /// * `target` - `host:port` to connect to.
    /// * `timeout` - Per-address connect timeout.
    pub fn new(target: impl Into<String>, timeout: Duration) -> Self {
        TcpProbe {
            target: target.into(),
            timeout,
        }
    }
}

impl Default for TcpProbe {
    fn default() -> Self {
        TcpProbe::new("8.8.8.8:53", Duration::from_secs(3))
    }
}

impl ConnectivityProbe for TcpProbe {
    fn is_online(&self) -> bool {
        let addrs = match self.target.to_socket_addrs() {
            Ok(addrs) => addrs,
            Err(e) => {
                tracing::debug!(target = %self.target, error = %e, "cannot resolve probe target");
                return false;
            }
        };
        addrs
            .into_iter()
            .any(|addr| TcpStream::connect_timeout(&addr, self.timeout).is_ok())
    }
}

/// Polls a probe until the machine is on the expected side of the air gap.
#[derive(Clone)]
pub struct ConnectivityWaiter {
    clock: Arc<dyn Clock>,
    poll_interval: Duration,
    timeout: Option<Duration>,
    cancel: CancellationToken,
}

impl ConnectivityWaiter {
    pub fn new(clock: Arc<dyn Clock>, cancel: CancellationToken) -> Self {
        ConnectivityWaiter {
            clock,
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: None,
            cancel,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Block until `probe` reports `expected_online`.
    ///
    /// The operator is prompted once, then the probe is asked again every
    /// poll interval.
    ///
    /// # Returns
    /// The time spent waiting, `AirGap` once the timeout has passed, or
    /// `Cancelled`.
    pub fn wait_for(
        &self,
        probe: &dyn ConnectivityProbe,
        expected_online: bool,
    ) -> Result<Duration, IssuerError> {
        let start = self.clock.now();
        let mut prompted = false;
        loop {
            if self.cancel.is_cancelled() {
                return Err(IssuerError::Cancelled);
            }
            let elapsed = self.clock.now().saturating_sub(start);
            if probe.is_online() == expected_online {
                if prompted {
                    tracing::info!(online = expected_online, ?elapsed, "connectivity changed");
                }
                return Ok(elapsed);
            }

            if !prompted {
                if expected_online {
                    tracing::warn!("network required: turn the connection back on");
                } else {
                    tracing::warn!("turn off the network connection before the issuing key is loaded");
                }
                prompted = true;
            } else {
                tracing::info!(expected_online, ?elapsed, "still waiting for connectivity change");
            }

            if let Some(timeout) = self.timeout {
                if elapsed >= timeout {
                    tracing::error!(expected_online, ?elapsed, "air gap check timed out");
                    return Err(IssuerError::AirGap { expected_online });
                }
            }
            self.clock.sleep(self.poll_interval, &self.cancel);
        }
    }
}
