//! Outcome of every network fetch, keyed by normalised URI.
//!
//! Discovery consults the cache to fetch each locator at most once per build cycle. The
//! recorded metadata backs the administrative URI listings.

use crate::constants::NO_PROTOCOL;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use time::OffsetDateTime;

/// One recorded fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriCacheEntry {
    /// Normalised URI.
    pub uri: String,
    /// HTTP status code, 0 when no response was received.
    pub status: u16,
    /// Protocol version, [`NO_PROTOCOL`] when no response was received.
    pub protocol: String,
    /// Reason phrase or error text.
    pub reason: String,
    /// Response body size in bytes.
    pub bytes: usize,
    /// Time to complete the request.
    pub response_time: Duration,
    /// When the fetch completed.
    pub last_checked: OffsetDateTime,
    /// Earliest instant a refetch is useful, from `Cache-Control`.
    pub next_update: OffsetDateTime,
}

impl UriCacheEntry {
    /// Records a fetch that never produced a response.
    pub fn failure(uri: &str, error: impl ToString, elapsed: Duration) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            uri: uri.to_string(),
            status: 0,
            protocol: NO_PROTOCOL.to_string(),
            reason: error.to_string(),
            bytes: 0,
            response_time: elapsed,
            last_checked: now,
            next_update: now,
        }
    }

    /// Returns `true` for a 2xx response.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Computes the next update instant from a `Cache-Control` header value.
///
/// `max-age=N` yields `now + N` seconds, with `N` capped at 2^31 (RFC 9111 §1.2.2);
/// `no-cache`, `no-store`, an unparsable or missing header yield `now`.
pub fn next_update_from_cache_control(
    cache_control: Option<&str>,
    now: OffsetDateTime,
) -> OffsetDateTime {
    let Some(value) = cache_control else {
        return now;
    };
    let directives: Vec<String> = value
        .split(',')
        .map(|directive| directive.trim().to_ascii_lowercase())
        .collect();
    if directives
        .iter()
        .any(|directive| directive == "no-cache" || directive == "no-store")
    {
        return now;
    }
    directives
        .iter()
        .find_map(|directive| max_age_seconds(directive.strip_prefix("max-age=")?))
        .filter(|seconds| *seconds > 0)
        .map_or(now, |seconds| now.checked_add(time::Duration::seconds(seconds)).unwrap_or(now))
}

const MAX_DELTA_SECONDS: i64 = 1 << 31;

fn max_age_seconds(value: &str) -> Option<i64> {
    let digits = value.trim_matches('"');
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(
        digits
            .parse::<i64>()
            .map_or(MAX_DELTA_SECONDS, |seconds| seconds.min(MAX_DELTA_SECONDS)),
    )
}

/// Concurrent map of fetch outcomes.
#[derive(Debug, Default)]
pub struct UriCache {
    entries: RwLock<HashMap<String, UriCacheEntry>>,
}

impl UriCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `entry`, replacing any earlier outcome for the same URI.
    pub fn record(&self, entry: UriCacheEntry) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(entry.uri.clone(), entry);
    }

    /// Returns `true` if `uri` has been fetched, successfully or not.
    pub fn contains(&self, uri: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(uri)
    }

    /// The recorded outcome for `uri`.
    pub fn get(&self, uri: &str) -> Option<UriCacheEntry> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(uri)
            .cloned()
    }

    /// All outcomes, ordered by URI.
    pub fn entries(&self) -> Vec<UriCacheEntry> {
        self.filtered(|_| true)
    }

    /// Successful outcomes, ordered by URI.
    pub fn successful(&self) -> Vec<UriCacheEntry> {
        self.filtered(UriCacheEntry::is_success)
    }

    /// Failed outcomes, ordered by URI.
    pub fn failed(&self) -> Vec<UriCacheEntry> {
        self.filtered(|entry| !entry.is_success())
    }

    fn filtered(&self, keep: impl Fn(&UriCacheEntry) -> bool) -> Vec<UriCacheEntry> {
        let mut entries: Vec<UriCacheEntry> = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|entry| keep(entry))
            .cloned()
            .collect();
        entries.sort_by(|a, b| a.uri.cmp(&b.uri));
        entries
    }

    /// Number of recorded URIs.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forgets every outcome.
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(uri: &str, status: u16) -> UriCacheEntry {
        let now = OffsetDateTime::now_utc();
        UriCacheEntry {
            uri: uri.to_string(),
            status,
            protocol: "HTTP/1.1".to_string(),
            reason: "OK".to_string(),
            bytes: 10,
            response_time: Duration::from_millis(5),
            last_checked: now,
            next_update: now,
        }
    }

    #[test]
    fn test_cache_control_max_age() {
        let now = OffsetDateTime::UNIX_EPOCH;
        assert_eq!(
            next_update_from_cache_control(Some("public, max-age=3600"), now),
            now + time::Duration::hours(1)
        );
        assert_eq!(next_update_from_cache_control(Some("no-cache, max-age=60"), now), now);
        assert_eq!(next_update_from_cache_control(Some("max-age=abc"), now), now);
        assert_eq!(next_update_from_cache_control(None, now), now);
    }

    #[test]
    fn test_cache_control_huge_max_age_is_capped() {
        let now = OffsetDateTime::UNIX_EPOCH;
        let capped = now + time::Duration::seconds(MAX_DELTA_SECONDS);
        for header in [
            "max-age=9223372036854775807",
            "max-age=99999999999999999999999",
            "max-age=\"2147483649\"",
        ] {
            assert_eq!(next_update_from_cache_control(Some(header), now), capped);
        }
        assert_eq!(next_update_from_cache_control(Some("max-age=-5"), now), now);
    }

    #[test]
    fn test_views_split_on_status() {
        let cache = UriCache::new();
        cache.record(entry("http://b.test/ok", 200));
        cache.record(entry("http://a.test/missing", 404));
        cache.record(UriCacheEntry::failure(
            "http://c.test/down",
            "connection refused",
            Duration::ZERO,
        ));

        assert_eq!(cache.len(), 3);
        assert!(cache.contains("http://b.test/ok"));
        assert_eq!(cache.successful().len(), 1);

        let failed: Vec<_> = cache.failed().into_iter().map(|e| e.uri).collect();
        assert_eq!(failed, vec!["http://a.test/missing", "http://c.test/down"]);

        let down = cache.get("http://c.test/down").unwrap();
        assert_eq!(down.protocol, NO_PROTOCOL);
        assert_eq!(down.status, 0);
    }
}
