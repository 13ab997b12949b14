//! Expiration Policy Module
//!
//! Expire-after-access and expire-after-write timers.

use std::time::Duration;

use crate::cache::Entry;
use crate::error::{CacheError, Result};

// == Expiration Policy ==
/// Two independent, optional staleness timers in nanoseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ExpirationPolicy {
    expire_after_access: Option<u64>,
    expire_after_write: Option<u64>,
}

impl ExpirationPolicy {
    // == Constructor ==
    /// Builds a policy, rejecting zero durations.
    pub fn new(
        expire_after_access: Option<Duration>,
        expire_after_write: Option<Duration>,
    ) -> Result<Self> {
        Ok(Self {
            expire_after_access: positive_nanos("expire_after_access", expire_after_access)?,
            expire_after_write: positive_nanos("expire_after_write", expire_after_write)?,
        })
    }

    // == Is Timed ==
    /// Returns true if at least one timer is enabled.
    ///
    /// When false the cache never needs to read its clock.
    pub fn is_timed(&self) -> bool {
        self.expire_after_access.is_some() || self.expire_after_write.is_some()
    }

    // == Is Expired ==
    /// Checks whether `entry` is stale at time `now`.
    ///
    /// The boundary is strict: an entry exactly `ttl` old is still fresh.
    pub fn is_expired<K, V>(&self, entry: &Entry<K, V>, now: u64) -> bool {
        let accessed_too_long_ago = self
            .expire_after_access
            .is_some_and(|ttl| now.saturating_sub(entry.access_time()) > ttl);
        let written_too_long_ago = self
            .expire_after_write
            .is_some_and(|ttl| now.saturating_sub(entry.write_time()) > ttl);
        accessed_too_long_ago || written_too_long_ago
    }
}

fn positive_nanos(name: &str, duration: Option<Duration>) -> Result<Option<u64>> {
    match duration {
        None => Ok(None),
        Some(d) if d.is_zero() => Err(CacheError::InvalidConfig(format!(
            "{} must be positive",
            name
        ))),
        Some(d) => Ok(Some(u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))),
    }
}
