//src/store/push_id.rs
//! Chronologically sortable child ids.
//!
//! An id is 8 characters of encoded epoch milliseconds followed by 12 random
//! characters. The alphabet is in ASCII order, so plain string comparison
//! orders ids by creation time. Two ids generated in the same millisecond
//! increment the random tail instead of re-rolling it, which keeps them
//! ordered too.

use chrono::Utc;
use rand::Rng;
use std::sync::{Mutex, PoisonError};

const PUSH_CHARS: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";
const RANDOM_LEN: usize = 12;
const TIME_LEN: usize = 8;

#[derive(Debug, Default)]
struct State {
    last_ms: u64,
    last_random: [u8; RANDOM_LEN],
}

#[derive(Debug, Default)]
pub struct PushIdGenerator {
    state: Mutex<State>,
}

impl PushIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> String {
        self.next_at(u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0))
    }

    pub(crate) fn next_at(&self, now_ms: u64) -> String {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        // never step backwards if the wall clock does
        let now_ms = now_ms.max(state.last_ms);

        if now_ms == state.last_ms && state.last_ms != 0 {
            for slot in state.last_random.iter_mut().rev() {
                if *slot == 63 {
                    *slot = 0;
                } else {
                    *slot += 1;
                    break;
                }
            }
        } else {
            let mut rng = rand::thread_rng();
            for slot in &mut state.last_random {
                *slot = rng.gen_range(0..64);
            }
            state.last_ms = now_ms;
        }

        let mut time_part = [0u8; TIME_LEN];
        let mut remaining = now_ms;
        for slot in time_part.iter_mut().rev() {
            *slot = PUSH_CHARS[(remaining % 64) as usize];
            remaining /= 64;
        }

        let mut id = String::with_capacity(TIME_LEN + RANDOM_LEN);
        id.extend(time_part.iter().map(|&b| b as char));
        id.extend(
            state
                .last_random
                .iter()
                .map(|&i| PUSH_CHARS[i as usize] as char),
        );
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_have_fixed_length_and_alphabet() {
        let id = PushIdGenerator::new().next_id();
        assert_eq!(id.len(), 20);
        assert!(id.bytes().all(|b| PUSH_CHARS.contains(&b)));
    }

    #[test]
    fn ids_sort_by_creation_time() {
        let generator = PushIdGenerator::new();
        let earlier = generator.next_at(1_700_000_000_000);
        let later = generator.next_at(1_700_000_000_001);
        assert!(earlier < later);
    }

    #[test]
    fn same_millisecond_ids_stay_ordered() {
        let generator = PushIdGenerator::new();
        let ids: Vec<String> = (0..50).map(|_| generator.next_at(1_700_000_000_000)).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
        sorted.dedup();
        assert_eq!(sorted.len(), 50);
    }

    #[test]
    fn clock_going_backwards_does_not_reorder() {
        let generator = PushIdGenerator::new();
        let first = generator.next_at(1_700_000_000_500);
        let second = generator.next_at(1_700_000_000_000);
        assert!(first < second);
    }
}
