use crate::ids::RunId;

/// A linear congruential generator seeded from a [`RunId`], used anywhere the engine needs
/// "randomness" that must still reproduce bit-for-bit under replay — retry jitter, primarily.
///
/// `rand::thread_rng` (or any wall-clock-seeded source) must never appear inside decision
/// logic: two replay runs over the same captured event log would then diverge. This generator
/// is the only sanctioned source of pseudo-randomness in the order-execution core.
///
/// Constants are the ones from Numerical Recipes' `ranqd1`; they're unremarkable, but they do
/// need to match between a run and its replay, so they live in exactly one place.
#[derive(Debug, Clone)]
pub struct DeterministicRng {
    state: u64,
}

const MULTIPLIER: u64 = 1_664_525;
const INCREMENT: u64 = 1_013_904_223;

impl DeterministicRng {
    /// Seeds the generator from a run identifier. Two `DeterministicRng`s built from the same
    /// `RunId` produce the identical sequence.
    pub fn from_run_id(run_id: RunId) -> Self {
        let (hi, lo) = run_id.0.as_u64_pair();
        Self {
            state: hi ^ lo.rotate_left(32),
        }
    }

    /// Advances the generator and returns the next raw `u32`.
    fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(MULTIPLIER).wrapping_add(INCREMENT);
        (self.state >> 32) as u32
    }

    /// Returns a jitter duration, uniformly distributed in `[0, max)`.
    pub fn jitter(&mut self, max: std::time::Duration) -> std::time::Duration {
        if max.is_zero() {
            return std::time::Duration::ZERO;
        }
        let max_nanos = max.as_nanos().min(u128::from(u32::MAX)) as u32;
        let draw = self.next_u32() % max_nanos.max(1);
        std::time::Duration::from_nanos(u64::from(draw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_run_id_reproduces_sequence() {
        let run_id = RunId::generate();
        let mut a = DeterministicRng::from_run_id(run_id);
        let mut b = DeterministicRng::from_run_id(run_id);
        let max = std::time::Duration::from_millis(250);
        for _ in 0..16 {
            assert_eq!(a.jitter(max), b.jitter(max));
        }
    }

    #[test]
    fn different_run_ids_diverge() {
        let mut a = DeterministicRng::from_run_id(RunId::generate());
        let mut b = DeterministicRng::from_run_id(RunId::generate());
        let max = std::time::Duration::from_millis(250);
        let sequence_a: Vec<_> = (0..8).map(|_| a.jitter(max)).collect();
        let sequence_b: Vec<_> = (0..8).map(|_| b.jitter(max)).collect();
        assert_ne!(sequence_a, sequence_b);
    }

    #[test]
    fn zero_max_is_always_zero() {
        let mut rng = DeterministicRng::from_run_id(RunId::generate());
        assert_eq!(rng.jitter(std::time::Duration::ZERO), std::time::Duration::ZERO);
    }
}
