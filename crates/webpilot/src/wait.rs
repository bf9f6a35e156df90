//! Polling assertion layer.
//!
//! UI state changes asynchronously relative to the test thread, so every
//! observation of an action's effect goes through a bounded retry loop:
//!
//! - [`eventually`]: evaluate an accessor until a [`Matcher`] accepts its
//!   value, then return that value, on the default budget
//! - [`eventually_with`]: the same with explicit [`WaitOptions`];
//!   [`Session::eventually`](crate::Session::eventually) uses the session's
//!
//! A timeout is fatal to the scenario and reports the last observed value.

use crate::config::{PilotConfig, DEFAULT_POLL_INTERVAL_MS, DEFAULT_TIMEOUT_MS};
use crate::matcher::Matcher;
use crate::result::{PilotError, PilotResult};
use std::fmt::Debug;
use std::time::{Duration, Instant};

// =============================================================================
// WAIT OPTIONS
// =============================================================================

/// Options for wait operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The session's `eventually` budget
    #[must_use]
    pub const fn from_config(config: &PilotConfig) -> Self {
        Self {
            timeout_ms: config.timeout_ms,
            poll_interval_ms: config.poll_interval_ms,
        }
    }

    /// The session's page-load budget
    #[must_use]
    pub const fn page_load(config: &PilotConfig) -> Self {
        Self {
            timeout_ms: config.page_load_timeout_ms,
            poll_interval_ms: config.poll_interval_ms,
        }
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

// =============================================================================
// EVENTUALLY
// =============================================================================

/// Errors that mean "not there yet" rather than "broken": the node may
/// still be created, or a replacement may appear.
const fn is_transient(err: &PilotError) -> bool {
    matches!(
        err,
        PilotError::NotFound { .. } | PilotError::Ambiguous { .. } | PilotError::StaleNode { .. }
    )
}

/// Poll `accessor` until `matcher` accepts its value, with the default
/// budget. Inside a scenario prefer
/// [`Session::eventually`](crate::Session::eventually), which honors the
/// configured timeouts.
pub fn eventually<T, A, M>(accessor: A, matcher: M) -> PilotResult<T>
where
    T: Debug,
    A: FnMut() -> PilotResult<T>,
    M: Matcher<T>,
{
    eventually_with(&WaitOptions::default(), accessor, matcher)
}

/// Poll `accessor` until `matcher` accepts its value.
///
/// The accessor always runs at least once. Not-found, ambiguous and stale
/// errors are retried; any other error ends the wait immediately.
///
/// # Errors
///
/// `AssertionTimeout` carrying the matcher description and the last
/// observed value (or the last transient error).
pub fn eventually_with<T, A, M>(options: &WaitOptions, mut accessor: A, matcher: M) -> PilotResult<T>
where
    T: Debug,
    A: FnMut() -> PilotResult<T>,
    M: Matcher<T>,
{
    let start = Instant::now();
    let timeout = options.timeout();
    let poll_interval = options.poll_interval();

    let last_observed = loop {
        let observed = match accessor() {
            Ok(value) if matcher.matches(&value) => return Ok(value),
            Ok(value) => format!("{value:?}"),
            Err(err) if is_transient(&err) => format!("error: {err}"),
            Err(err) => return Err(err),
        };
        if start.elapsed() >= timeout {
            break observed;
        }
        std::thread::sleep(poll_interval);
    };

    let description = matcher.describe();
    tracing::debug!(%description, %last_observed, ms = options.timeout_ms, "eventually timed out");
    Err(PilotError::AssertionTimeout {
        description,
        last_observed,
        ms: options.timeout_ms,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::matcher::{equals, is_true};
    use std::cell::Cell;

    fn fast() -> WaitOptions {
        WaitOptions::new().with_timeout(100).with_poll_interval(5)
    }

    mod wait_options_tests {
        use super::*;

        #[test]
        fn test_default() {
            let opts = WaitOptions::default();
            assert_eq!(opts.timeout_ms, DEFAULT_TIMEOUT_MS);
            assert_eq!(opts.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
        }

        #[test]
        fn test_from_config() {
            let config = PilotConfig::default()
                .with_timeout(123)
                .with_page_load_timeout(456)
                .with_poll_interval(7);
            assert_eq!(WaitOptions::from_config(&config).timeout_ms, 123);
            let page = WaitOptions::page_load(&config);
            assert_eq!(page.timeout_ms, 456);
            assert_eq!(page.poll_interval(), Duration::from_millis(7));
        }
    }

    mod eventually_tests {
        use super::*;

        #[test]
        fn test_returns_matching_value() {
            let calls = Cell::new(0);
            let value = eventually_with(
                &fast(),
                || {
                    calls.set(calls.get() + 1);
                    Ok(calls.get())
                },
                equals(3),
            )
            .unwrap();
            assert_eq!(value, 3);
        }

        #[test]
        fn test_timeout_reports_last_observed() {
            let err = eventually_with(&fast(), || Ok("CANCEL".to_string()), equals("OK")).unwrap_err();
            match err {
                PilotError::AssertionTimeout {
                    description,
                    last_observed,
                    ms,
                } => {
                    assert!(description.contains("OK"));
                    assert_eq!(last_observed, "\"CANCEL\"");
                    assert_eq!(ms, 100);
                }
                other => panic!("unexpected {other:?}"),
            }
        }

        #[test]
        fn test_transient_errors_are_retried() {
            let calls = Cell::new(0);
            let value = eventually_with(
                &fast(),
                || {
                    calls.set(calls.get() + 1);
                    if calls.get() < 3 {
                        Err(PilotError::NotFound {
                            query: "//Dialog".into(),
                        })
                    } else {
                        Ok(true)
                    }
                },
                is_true(),
            )
            .unwrap();
            assert!(value);
        }

        #[test]
        fn test_transient_error_shows_in_timeout() {
            let err = eventually_with(
                &fast(),
                || -> PilotResult<bool> { Err(PilotError::StaleNode { id: 5 }) },
                is_true(),
            )
            .unwrap_err();
            assert!(err.to_string().contains("Node 5 no longer exists"));
        }

        #[test]
        fn test_fatal_errors_propagate_immediately() {
            let calls = Cell::new(0);
            let err = eventually_with(
                &fast(),
                || -> PilotResult<bool> {
                    calls.set(calls.get() + 1);
                    Err(PilotError::transport("connection reset"))
                },
                is_true(),
            )
            .unwrap_err();
            assert!(matches!(err, PilotError::Transport { .. }));
            assert_eq!(calls.get(), 1);
        }

        #[test]
        fn test_zero_timeout_evaluates_once() {
            let opts = WaitOptions::new().with_timeout(0);
            assert_eq!(eventually_with(&opts, || Ok(1), equals(1)).unwrap(), 1);
        }
    }
}
