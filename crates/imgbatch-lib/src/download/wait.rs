use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

/// Inclusive bounds for the pause between batches. `min <= max` always holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WaitRange {
    min: Duration,
    max: Duration,
}

impl WaitRange {
    pub fn new(min: Duration, max: Duration) -> Option<Self> {
        (min <= max).then_some(Self { min, max })
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }
}

pub struct WaitTimeGenerator {
    range: WaitRange,
    rng: StdRng,
}

impl WaitTimeGenerator {
    /// A fixed `seed` makes the sequence of waits reproducible.
    pub fn new(range: WaitRange, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { range, rng }
    }

    /// Uniformly distributed in `[min, max]`, sampled at nanosecond resolution.
    pub fn next_wait(&mut self) -> Duration {
        let min = duration_nanos(self.range.min);
        let max = duration_nanos(self.range.max);
        if min == max {
            return self.range.min;
        }
        Duration::from_nanos(self.rng.gen_range(min..=max))
    }
}

fn duration_nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}
