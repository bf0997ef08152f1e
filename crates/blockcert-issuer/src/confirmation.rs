//! Waiting for an address's balance to confirm.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::backend::FundingService;
use crate::IssuerError;

/// Default delay between balance samples.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Time source for polling loops.
pub trait Clock: Send + Sync {
    /// Time elapsed since an arbitrary fixed origin.
    fn now(&self) -> Duration;

    /// Sleep for `duration`, returning early if `cancel` fires.
    fn sleep(&self, duration: Duration, cancel: &CancellationToken);
}

/// Wall-clock time.
#[derive(Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        SystemClock {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration, cancel: &CancellationToken) {
        const SLICE: Duration = Duration::from_millis(200);
        let deadline = Instant::now() + duration;
        while !cancel.is_cancelled() {
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                break;
            }
            std::thread::sleep(left.min(SLICE));
        }
    }
}

/// A clock that only moves when slept on. Sleeping is instantaneous.
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, duration: Duration) {
        self.millis
            .fetch_add(duration.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_millis(self.millis.load(Ordering::SeqCst))
    }

    fn sleep(&self, duration: Duration, _cancel: &CancellationToken) {
        self.advance(duration);
    }
}

/// Polls until an address's pending balance has fully confirmed.
#[derive(Clone)]
pub struct ConfirmationWaiter {
    clock: Arc<dyn Clock>,
    poll_interval: Duration,
    timeout: Option<Duration>,
    cancel: CancellationToken,
}

impl ConfirmationWaiter {
    pub fn new(clock: Arc<dyn Clock>, cancel: CancellationToken) -> Self {
        ConfirmationWaiter {
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

    /// Block until the unconfirmed and confirmed balances of `address` are
    /// equal and both nonzero.
    ///
    /// Each sample asks the service for the balance with zero and with one
    /// confirmation. Service errors are returned at once.
    ///
    /// # Returns
    /// The time spent waiting, `ConfirmationTimeout` once the timeout has
    /// passed, or `Cancelled`.
    pub fn wait(&self, funding: &dyn FundingService, address: &str) -> Result<Duration, IssuerError> {
        tracing::info!(address, "waiting for pending transactions to confirm");
        let start = self.clock.now();
        loop {
            if self.cancel.is_cancelled() {
                return Err(IssuerError::Cancelled);
            }

            let pending = funding.balance(address, 0)?;
            let confirmed = funding.balance(address, 1)?;
            let elapsed = self.clock.now().saturating_sub(start);
            if let (Some(p), Some(c)) = (pending, confirmed) {
                if p != 0 && p == c {
                    tracing::info!(address, ?elapsed, balance = c, "balance confirmed");
                    return Ok(elapsed);
                }
            }
            tracing::info!(address, ?elapsed, ?pending, ?confirmed, "not yet confirmed");

            if let Some(timeout) = self.timeout {
                if elapsed >= timeout {
                    return Err(IssuerError::ConfirmationTimeout {
                        address: address.to_string(),
                        elapsed,
                    });
                }
            }
            if self.cancel.is_cancelled() {
                return Err(IssuerError::Cancelled);
            }
            self.clock.sleep(self.poll_interval, &self.cancel);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Replays scripted `(pending, confirmed)` samples; the last one repeats.
    struct ScriptedBalances {
        samples: Mutex<Vec<(Option<u64>, Option<u64>)>>,
        calls: AtomicU64,
        fail: bool,
    }

    impl ScriptedBalances {
        fn new(samples: Vec<(Option<u64>, Option<u64>)>) -> Self {
            ScriptedBalances {
                samples: Mutex::new(samples),
                calls: AtomicU64::new(0),
                fail: false,
            }
        }

        fn current(&self) -> (Option<u64>, Option<u64>) {
            let samples = self.samples.lock().unwrap();
            samples[0]
        }
    }

    impl FundingService for ScriptedBalances {
        fn login(&self, _: &str) -> Result<(), IssuerError> {
            Ok(())
        }
        fn balance(&self, _: &str, confirmations: u32) -> Result<Option<u64>, IssuerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(IssuerError::collaborator("address_balance", "wallet locked"));
            }
            let (pending, confirmed) = self.current();
            if confirmations == 0 {
                Ok(pending)
            } else {
                let mut samples = self.samples.lock().unwrap();
                if samples.len() > 1 {
                    samples.remove(0);
                }
                Ok(confirmed)
            }
        }
        fn new_address(&self, _: &str) -> Result<String, IssuerError> {
            unimplemented!()
        }
        fn send_many(&self, _: &str, _: &[(String, u64)], _: u64) -> Result<String, IssuerError> {
            unimplemented!()
        }
        fn pay(&self, _: &str, _: &str, _: u64, _: u64) -> Result<String, IssuerError> {
            unimplemented!()
        }
        fn archive(&self, _: &str) -> Result<(), IssuerError> {
            unimplemented!()
        }
    }

    fn waiter(clock: Arc<ManualClock>) -> ConfirmationWaiter {
        ConfirmationWaiter::new(clock, CancellationToken::new())
    }

    #[test]
    fn test_settles_on_first_equal_nonzero_sample() {
        let clock = Arc::new(ManualClock::new());
        let balances = ScriptedBalances::new(vec![(Some(500), Some(500))]);
        let elapsed = waiter(clock.clone()).wait(&balances, "addr").unwrap();
        assert_eq!(elapsed, Duration::ZERO);
        assert_eq!(balances.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_polls_until_confirmed() {
        let clock = Arc::new(ManualClock::new());
        let balances = ScriptedBalances::new(vec![
            (None, None),
            (Some(0), Some(0)),
            (Some(900), Some(400)),
            (Some(900), Some(900)),
        ]);
        let elapsed = waiter(clock.clone()).wait(&balances, "addr").unwrap();
        assert_eq!(elapsed, DEFAULT_POLL_INTERVAL * 3);
        assert_eq!(balances.calls.load(Ordering::SeqCst), 8);
    }

    #[test]
    fn test_times_out() {
        let clock = Arc::new(ManualClock::new());
        let balances = ScriptedBalances::new(vec![(Some(900), Some(400))]);
        let err = waiter(clock)
            .with_poll_interval(Duration::from_secs(10))
            .with_timeout(Some(Duration::from_secs(35)))
            .wait(&balances, "addr")
            .unwrap_err();
        match err {
            IssuerError::ConfirmationTimeout { address, elapsed } => {
                assert_eq!(address, "addr");
                assert_eq!(elapsed, Duration::from_secs(40));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_honors_cancellation() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let balances = ScriptedBalances::new(vec![(Some(900), Some(400))]);
        let err = ConfirmationWaiter::new(Arc::new(ManualClock::new()), cancel)
            .wait(&balances, "addr")
            .unwrap_err();
        assert!(matches!(err, IssuerError::Cancelled));
        assert_eq!(balances.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_collaborator_error_is_not_retried() {
        let mut balances = ScriptedBalances::new(vec![(Some(1), Some(1))]);
        balances.fail = true;
        let err = waiter(Arc::new(ManualClock::new()))
            .wait(&balances, "addr")
            .unwrap_err();
        assert!(matches!(err, IssuerError::Collaborator { .. }));
        assert_eq!(balances.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_system_clock_sleep_stops_on_cancel() {
        let clock = SystemClock::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let before = clock.now();
        clock.sleep(Duration::from_secs(60), &cancel);
        assert!(clock.now() - before < Duration::from_secs(5));
    }
}
