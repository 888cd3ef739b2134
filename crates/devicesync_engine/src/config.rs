//! Configuration for the synchronization engine.

use std::time::Duration;
use tracing::warn;

/// Shortest allowed syncer interval.
pub const MIN_SYNC_INTERVAL: Duration = Duration::from_secs(5);

/// Configuration for the whole engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Pool this instance owns. Records of other pools are ignored.
    pub node_pool: String,
    /// Store namespace records live in.
    pub namespace: String,
    /// Periodic syncer settings.
    pub syncer: SyncerConfig,
    /// Event-driven controller settings.
    pub controller: ControllerConfig,
}

impl EngineConfig {
    /// Creates a configuration for a pool.
    pub fn new(node_pool: impl Into<String>) -> Self {
        Self {
            node_pool: node_pool.into(),
            namespace: "default".to_string(),
            syncer: SyncerConfig::default(),
            controller: ControllerConfig::default(),
        }
    }

    /// Sets the namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Sets the syncer configuration.
    pub fn with_syncer(mut self, syncer: SyncerConfig) -> Self {
        self.syncer = syncer;
        self
    }

    /// Sets the controller configuration.
    pub fn with_controller(mut self, controller: ControllerConfig) -> Self {
        self.controller = controller;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new("")
    }
}

/// Configuration for the periodic full-scan syncer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncerConfig {
    /// Time between rounds. Never below `MIN_SYNC_INTERVAL`.
    pub interval: Duration,
}

impl SyncerConfig {
    /// Creates a configuration, raising `interval` to the minimum if needed.
    pub fn new(interval: Duration) -> Self {
        if interval < MIN_SYNC_INTERVAL {
            warn!(
                requested = ?interval,
                minimum = ?MIN_SYNC_INTERVAL,
                "sync interval below minimum, using minimum"
            );
        }
        Self {
            interval: interval.max(MIN_SYNC_INTERVAL),
        }
    }

    /// Creates a configuration from whole seconds.
    pub fn from_secs(secs: u64) -> Self {
        Self::new(Duration::from_secs(secs))
    }
}

impl Default for SyncerConfig {
    fn default() -> Self {
        Self {
            interval: MIN_SYNC_INTERVAL,
        }
    }
}

/// Configuration for the event-driven controllers.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Concurrent workers per kind.
    pub workers: usize,
    /// Every record is re-queued this often.
    pub resync_period: Duration,
    /// Backoff for failed reconciliations.
    pub retry: RetryConfig,
}

impl ControllerConfig {
    /// Creates a configuration with `workers` workers.
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            resync_period: Duration::from_secs(600),
            retry: RetryConfig::default(),
        }
    }

    /// Sets the resync period.
    pub fn with_resync_period(mut self, period: Duration) -> Self {
        self.resync_period = period;
        self
    }

    /// Sets the retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::new(2)
    }
}

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Initial delay between retries.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
    /// Whether to add jitter to delays.
    pub add_jitter: bool,
}

impl RetryConfig {
    /// Creates a new retry configuration.
    pub fn new() -> Self {
        Self {
            initial_delay: Duration::from_millis(5),
            max_delay: Duration::from_secs(300),
            backoff_multiplier: 2.0,
            add_jitter: true,
        }
    }

    /// Sets the initial delay.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier.
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Disables jitter.
    pub fn without_jitter(mut self) -> Self {
        self.add_jitter = false;
        self
    }

    /// Calculates the delay for a given attempt (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let base_delay = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        let delay_secs = base_delay.min(self.max_delay.as_secs_f64());

        if self.add_jitter {
            // Up to 25% jitter
            let jitter = delay_secs * 0.25 * rand_jitter();
            Duration::from_secs_f64(delay_secs + jitter)
        } else {
            Duration::from_secs_f64(delay_secs)
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Cheap time-derived jitter in `[0, 1)`.
fn rand_jitter() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    (nanos % 1000) as f64 / 1000.0
}
