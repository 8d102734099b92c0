use std::sync::atomic::{AtomicU64, Ordering};

use rand::Rng;
use skyserve_core::reference::{
    BOOKING_REFERENCE_ALPHABET, BOOKING_REFERENCE_PREFIX, BOOKING_REFERENCE_SUFFIX_LEN,
};

/// Source of booking references. Uniqueness is not checked.
pub trait ReferenceGenerator: Send + Sync {
    fn generate(&self) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RandomReferenceGenerator;

impl ReferenceGenerator for RandomReferenceGenerator {
    fn generate(&self) -> String {
        let mut rng = rand::rng();
        let suffix = (0..BOOKING_REFERENCE_SUFFIX_LEN)
            .map(|_| {
                let idx = rng.random_range(0..BOOKING_REFERENCE_ALPHABET.len());
                BOOKING_REFERENCE_ALPHABET[idx] as char
            })
            .collect::<String>();
        format!("{BOOKING_REFERENCE_PREFIX}{suffix}")
    }
}

/// Deterministic `SK000001`, `SK000002`, ... for tests and demos.
#[derive(Debug, Default)]
pub struct SequentialReferenceGenerator {
    next: AtomicU64,
}

impl ReferenceGenerator for SequentialReferenceGenerator {
    fn generate(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{BOOKING_REFERENCE_PREFIX}{:06}", n % 1_000_000)
    }
}
