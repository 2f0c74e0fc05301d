use std::sync::atomic::{AtomicU64, Ordering};

/// Per-process request ids: a random 128-bit seed mixed with a counter, so
/// ids are unique within the process and unpredictable across restarts.
pub(crate) struct RequestIdGenerator {
    seed: u128,
    counter: AtomicU64,
}

impl RequestIdGenerator {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self::with_seed((u128::from(fastrand::u64(..)) << 64) | u128::from(fastrand::u64(..)))
    }

    #[must_use]
    pub(crate) fn with_seed(seed: u128) -> Self {
        Self {
            seed,
            counter: AtomicU64::new(1),
        }
    }

    pub(crate) fn next_seq(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::Relaxed)
    }

    #[must_use]
    pub(crate) fn request_uuid(&self, request_seq: u64) -> uuid::Uuid {
        uuid::Uuid::from_u128(self.seed ^ u128::from(request_seq))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_starts_at_one() {
        let ids = RequestIdGenerator::with_seed(0);
        assert_eq!(ids.next_seq(), 1);
        assert_eq!(ids.next_seq(), 2);
        assert_eq!(ids.request_uuid(2), uuid::Uuid::from_u128(2));
    }
}
