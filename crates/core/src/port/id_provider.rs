// ID Provider Port (for deterministic testing)

use rand::distributions::Alphanumeric;
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};

/// ID provider interface (allows deterministic IDs in tests)
pub trait IdProvider: Send + Sync {
    /// Generate a new unique entity ID
    fn generate_id(&self) -> String;
}

/// UUID v4 provider (production default)
pub struct UuidProvider;

impl IdProvider for UuidProvider {
    fn generate_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Current time in milliseconds followed by a short random suffix,
/// e.g. `1718000000000k3f9q2`.
///
/// Neither monotonic nor collision-proof; kept for callers that depend on
/// this id shape.
pub struct TimestampIdProvider;

const SUFFIX_LEN: usize = 5;

impl IdProvider for TimestampIdProvider {
    fn generate_id(&self) -> String {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SUFFIX_LEN)
            .map(|b| char::from(b).to_ascii_lowercase())
            .collect();
        format!("{}{}", chrono::Utc::now().timestamp_millis(), suffix)
    }
}

/// Sequential ids with a fixed prefix (tests)
pub struct SequenceIdProvider {
    prefix: String,
    next: AtomicU64,
}

impl SequenceIdProvider {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl IdProvider for SequenceIdProvider {
    fn generate_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}{}", self.prefix, n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_id_shape() {
        let id = TimestampIdProvider.generate_id();
        let (millis, suffix) = id.split_at(id.len() - SUFFIX_LEN);
        assert!(millis.parse::<i64>().is_ok());
        assert!(suffix.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_sequence_ids() {
        let ids = SequenceIdProvider::new("e-");
        assert_eq!(ids.generate_id(), "e-1");
        assert_eq!(ids.generate_id(), "e-2");
    }
}
