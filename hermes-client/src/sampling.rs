use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

/// Probabilistic admission of events.
#[derive(Clone, Debug)]
pub struct Sampler {
    rng: Pcg32,
}

impl Sampler {
    /// Creates a sampler seeded from the operating system.
    pub fn new() -> Self {
        Self::seeded(rand::random())
    }

    /// Creates a deterministic sampler.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    /// Decides whether an event passes the sample rate.
    ///
    /// Draws a uniform value in `[0, 1)` and admits the event if it is below `rate`. Without a
    /// rate, every event is admitted.
    pub fn admit(&mut self, rate: Option<f64>) -> bool {
        let Some(rate) = rate else {
            return true;
        };

        let draw = self.rng.random::<f64>();
        let admitted = draw < rate;
        hermes_log::trace!(rate, draw, admitted, "sampling decision");
        admitted
    }
}

impl Default for Sampler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_zero_rejects() {
        let mut sampler = Sampler::seeded(7);
        assert!((0..1000).all(|_| !sampler.admit(Some(0.0))));
    }

    #[test]
    fn test_rate_one_admits() {
        let mut sampler = Sampler::seeded(7);
        assert!((0..1000).all(|_| sampler.admit(Some(1.0))));
    }

    #[test]
    fn test_disabled_admits() {
        let mut sampler = Sampler::new();
        assert!((0..100).all(|_| sampler.admit(None)));
    }

    #[test]
    fn test_rate_half() {
        let mut sampler = Sampler::seeded(42);
        let admitted = (0..10_000).filter(|_| sampler.admit(Some(0.5))).count();
        assert!((4_000..6_000).contains(&admitted), "admitted {admitted}");
    }

    #[test]
    fn test_seeded_deterministic() {
        let mut a = Sampler::seeded(3);
        let mut b = Sampler::seeded(3);
        let a: Vec<_> = (0..50).map(|_| a.admit(Some(0.3))).collect();
        let b: Vec<_> = (0..50).map(|_| b.admit(Some(0.3))).collect();
        assert_eq!(a, b);
    }
}
