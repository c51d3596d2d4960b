//! POP3 server configuration

use std::time::Duration;

/// Idle deadline applied between client commands when none is configured
pub(crate) const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// POP3 server configuration
///
/// # Example
///
/// ```
/// use pop3_rs::Config;
/// use std::time::Duration;
///
/// let config = Config::new("127.0.0.1:110").with_idle_timeout(Duration::from_secs(30));
/// assert_eq!(config.bind, "127.0.0.1:110");
/// ```
#[must_use]
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Address the listener binds, e.g. "0.0.0.0:110"
    pub bind: String,

    /// How long a session may sit idle between commands before it is
    /// disconnected
    ///
    /// The deadline is re-armed after every command, so it bounds idle time,
    /// not total session length. Default: one minute.
    #[cfg_attr(feature = "serde", serde(default = "default_idle_timeout"))]
    pub idle_timeout: Duration,
}

#[cfg(feature = "serde")]
fn default_idle_timeout() -> Duration {
    DEFAULT_IDLE_TIMEOUT
}

impl Config {
    /// Create a configuration listening on the given address with the
    /// default idle timeout
    pub fn new(bind: impl Into<String>) -> Self {
        Self {
            bind: bind.into(),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }

    /// Override the idle deadline
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }
}
