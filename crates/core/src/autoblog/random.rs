use std::time::{SystemTime, UNIX_EPOCH};

pub trait RandomSource: Send + Sync {
    fn next_u64(&self) -> u64;
}

/// OS entropy, falling back to the sub-second clock if the OS source fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn next_u64(&self) -> u64 {
        getrandom::u64().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "OS random source unavailable; using clock");
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| u64::from(d.subsec_nanos()) ^ d.as_secs())
                .unwrap_or_default()
        })
    }
}

/// Uniform pick over `items`; `None` when empty.
pub fn choose<'a, T>(rng: &dyn RandomSource, items: &'a [T]) -> Option<&'a T> {
    if items.is_empty() {
        return None;
    }
    let idx = (rng.next_u64() % items.len() as u64) as usize;
    items.get(idx)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::RandomSource;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays a fixed sequence, wrapping around.
    #[derive(Debug)]
    pub struct SequenceRandom {
        values: Vec<u64>,
        next: AtomicUsize,
    }

    impl SequenceRandom {
        pub fn new(values: Vec<u64>) -> Self {
            Self {
                values,
                next: AtomicUsize::new(0),
            }
        }
    }

    impl RandomSource for SequenceRandom {
        fn next_u64(&self) -> u64 {
            let i = self.next.fetch_add(1, Ordering::SeqCst);
            self.values[i % self.values.len()]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::SequenceRandom;
    use super::*;

    #[test]
    fn choose_maps_value_onto_index() {
        let items = ["a", "b", "c", "d"];
        let rng = SequenceRandom::new(vec![0, 5, 11]);
        assert_eq!(choose(&rng, &items), Some(&"a"));
        assert_eq!(choose(&rng, &items), Some(&"b"));
        assert_eq!(choose(&rng, &items), Some(&"d"));
    }

    #[test]
    fn choose_on_empty_is_none() {
        let items: [String; 0] = [];
        assert_eq!(choose(&OsRandom, &items), None);
    }

    #[test]
    fn os_random_covers_every_item_eventually() {
        let items = [0usize, 1, 2];
        let mut seen = [false; 3];
        for _ in 0..300 {
            if let Some(i) = choose(&OsRandom, &items) {
                seen[*i] = true;
            }
        }
        assert!(seen.iter().all(|s| *s));
    }
}
