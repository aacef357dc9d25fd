//! Exponential backoff with jitter

use rand::Rng;
use std::time::Duration;

/// Upper bound on any computed retry delay
pub const MAX_DELAY_MS: u64 = 30_000;

/// Delay before retry `attempt` (1-based): `min(cap, 2^attempt * base + U[0, base))`
pub fn delay(attempt: u32, base_ms: u64) -> Duration {
    Duration::from_millis(delay_ms(attempt, base_ms, &mut rand::thread_rng()))
}

/// Same as [`delay`] with an explicit RNG, in whole milliseconds
pub fn delay_ms<R: Rng + ?Sized>(attempt: u32, base_ms: u64, rng: &mut R) -> u64 {
    let jitter = if base_ms == 0 {
        0
    } else {
        rng.gen_range(0..base_ms)
    };
    // 2^31 * base already exceeds the cap for any base >= 1
    let factor = 1u64 << attempt.min(31);
    factor
        .saturating_mul(base_ms)
        .saturating_add(jitter)
        .min(MAX_DELAY_MS)
}
