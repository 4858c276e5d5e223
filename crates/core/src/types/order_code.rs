//! Customer-facing order codes.
//!
//! A code is the UTC creation time at second granularity followed by a
//! per-second sequence number, e.g. `20261016093015-0002`. The sequence makes
//! codes unique even when several checkouts land in the same second.

use core::fmt;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Externally visible, immutable order identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderCode(String);

impl OrderCode {
    /// Wrap an existing code (e.g. one read back from the database).
    #[must_use]
    pub const fn new(code: String) -> Self {
        Self(code)
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Generates unique [`OrderCode`]s.
///
/// One generator is owned by the application state and shared by all
/// requests. If the clock steps backwards the generator keeps counting within
/// the last second it issued, so codes never repeat.
#[derive(Debug, Default)]
pub struct OrderCodeGenerator {
    state: Mutex<GeneratorState>,
}

#[derive(Debug, Default)]
struct GeneratorState {
    second: i64,
    sequence: u32,
}

impl OrderCodeGenerator {
    /// Create a new generator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next code for a checkout happening at `now`.
    pub fn next_code(&self, now: DateTime<Utc>) -> OrderCode {
        let (second, sequence) = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            let now_second = now.timestamp();
            if now_second > state.second {
                state.second = now_second;
                state.sequence = 1;
            } else {
                state.sequence = state.sequence.saturating_add(1);
            }
            (state.second, state.sequence)
        };

        let stamp = DateTime::<Utc>::from_timestamp(second, 0).unwrap_or(now);
        OrderCode(format!("{}-{sequence:04}", stamp.format("%Y%m%d%H%M%S")))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use chrono::TimeZone;

    use super::*;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, h, m, s).unwrap()
    }

    #[test]
    fn test_code_format() {
        let generator = OrderCodeGenerator::new();
        let code = generator.next_code(at(9, 30, 15));
        assert_eq!(code.as_str(), "20261016093015-0001");
    }

    #[test]
    fn test_same_second_gets_increasing_sequence() {
        let generator = OrderCodeGenerator::new();
        let a = generator.next_code(at(9, 30, 15));
        let b = generator.next_code(at(9, 30, 15));
        assert_eq!(b.as_str(), "20261016093015-0002");
        assert_ne!(a, b);
    }

    #[test]
    fn test_new_second_resets_sequence() {
        let generator = OrderCodeGenerator::new();
        generator.next_code(at(9, 30, 15));
        generator.next_code(at(9, 30, 15));
        let code = generator.next_code(at(9, 30, 16));
        assert_eq!(code.as_str(), "20261016093016-0001");
    }

    #[test]
    fn test_clock_going_backwards_stays_unique() {
        let generator = OrderCodeGenerator::new();
        let a = generator.next_code(at(9, 30, 16));
        let b = generator.next_code(at(9, 30, 10));
        assert_ne!(a, b);
        assert_eq!(b.as_str(), "20261016093016-0002");
    }

    #[test]
    fn test_concurrent_generation_is_unique() {
        let generator = Arc::new(OrderCodeGenerator::new());
        let now = at(12, 0, 0);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let generator = Arc::clone(&generator);
                std::thread::spawn(move || {
                    (0..100)
                        .map(|_| generator.next_code(now))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for code in handle.join().unwrap() {
                assert!(seen.insert(code), "duplicate order code");
            }
        }
        assert_eq!(seen.len(), 800);
    }
}
