use parking_lot::Mutex;
use rand::{Rng as _, RngCore, SeedableRng as _};
use rand_xoshiro::Xoshiro256StarStar;

/// Outcome of a sampling decision for one batch of metrics.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Sampling {
    /// The batch is sent as-is, without a rate annotation.
    Unsampled,

    /// The batch is sent, with every line annotated with the given rate.
    Sampled(f64),

    /// Nothing from the batch is sent.
    Dropped,
}

/// Batch-level random sampler.
///
/// A single generator is seeded once and shared by every sampling decision made through the client. Callers that need
/// reproducible decisions can supply their own generator.
pub(crate) struct Sampler {
    rng: Mutex<Box<dyn RngCore + Send>>,
}

impl Sampler {
    /// Creates a `Sampler` backed by a fast generator seeded from the thread-local RNG.
    pub fn new() -> Self {
        Self::from_rng(Xoshiro256StarStar::from_rng(&mut rand::rng()))
    }

    /// Creates a `Sampler` backed by the given generator.
    pub fn from_rng<R>(rng: R) -> Self
    where
        R: RngCore + Send + 'static,
    {
        Self { rng: Mutex::new(Box::new(rng)) }
    }

    /// Decides whether a batch reported at `sample_rate` should be sent.
    ///
    /// Rates of 1.0 or more are always sent unannotated and never consume randomness. Rates of zero or below, or NaN,
    /// are always dropped. Anything in between draws exactly one value in `[0, 1)` and sends the batch when that value
    /// is less than or equal to the rate.
    pub fn decide(&self, sample_rate: f64) -> Sampling {
        if sample_rate >= 1.0 {
            return Sampling::Unsampled;
        }

        if sample_rate.is_nan() || sample_rate <= 0.0 {
            return Sampling::Dropped;
        }

        let draw: f64 = self.rng.lock().random();
        if draw <= sample_rate {
            Sampling::Sampled(sample_rate)
        } else {
            Sampling::Dropped
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use rand::{RngCore, SeedableRng as _};
    use rand_xoshiro::Xoshiro256StarStar;

    use super::{Sampler, Sampling};

    /// Generator that always yields the same word.
    pub(crate) struct ConstantRng(pub u64);

    impl ConstantRng {
        /// Produces draws as close to 1.0 as `f64` allows.
        pub(crate) fn high() -> Self {
            Self(u64::MAX)
        }

        /// Produces draws of exactly 0.0.
        pub(crate) fn low() -> Self {
            Self(0)
        }
    }

    impl RngCore for ConstantRng {
        fn next_u32(&mut self) -> u32 {
            (self.0 >> 32) as u32
        }

        fn next_u64(&mut self) -> u64 {
            self.0
        }

        fn fill_bytes(&mut self, dst: &mut [u8]) {
            for (dst, src) in dst.iter_mut().zip(self.0.to_le_bytes().iter().cycle()) {
                *dst = *src;
            }
        }
    }

    /// Generator that fails the test if it is ever consulted.
    struct UntouchableRng;

    impl RngCore for UntouchableRng {
        fn next_u32(&mut self) -> u32 {
            panic!("generator should not be consulted");
        }

        fn next_u64(&mut self) -> u64 {
            panic!("generator should not be consulted");
        }

        fn fill_bytes(&mut self, _: &mut [u8]) {
            panic!("generator should not be consulted");
        }
    }

    #[test]
    fn full_rate_skips_generator() {
        let sampler = Sampler::from_rng(UntouchableRng);
        assert_eq!(sampler.decide(1.0), Sampling::Unsampled);
        assert_eq!(sampler.decide(2.5), Sampling::Unsampled);
    }

    #[test]
    fn non_positive_rate_skips_generator() {
        let sampler = Sampler::from_rng(UntouchableRng);
        assert_eq!(sampler.decide(0.0), Sampling::Dropped);
        assert_eq!(sampler.decide(-0.5), Sampling::Dropped);
        assert_eq!(sampler.decide(f64::NAN), Sampling::Dropped);
    }

    #[test]
    fn draw_compared_inclusively() {
        let low = Sampler::from_rng(ConstantRng::low());
        assert_eq!(low.decide(0.25), Sampling::Sampled(0.25));

        let high = Sampler::from_rng(ConstantRng::high());
        assert_eq!(high.decide(0.25), Sampling::Dropped);
        assert_eq!(high.decide(0.999), Sampling::Dropped);
    }

    #[test]
    fn sent_fraction_converges_to_rate() {
        const ITERATIONS: usize = 100_000;

        for rate in [0.01, 0.2, 0.5, 0.9] {
            let sampler = Sampler::from_rng(Xoshiro256StarStar::seed_from_u64(0x5eed));

            let sent = (0..ITERATIONS)
                .filter(|_| matches!(sampler.decide(rate), Sampling::Sampled(_)))
                .count();
            let observed = sent as f64 / ITERATIONS as f64;

            assert!((observed - rate).abs() < 0.01, "rate {rate}: observed {observed}");
        }
    }

    #[test]
    fn default_sampler_is_usable() {
        let sampler = Sampler::new();
        let decisions = (0..1_000).map(|_| sampler.decide(0.5)).collect::<Vec<_>>();

        assert!(decisions.iter().any(|d| *d == Sampling::Sampled(0.5)));
        assert!(decisions.iter().any(|d| *d == Sampling::Dropped));
    }

    #[test]
    fn seeded_samplers_agree() {
        let a = Sampler::from_rng(Xoshiro256StarStar::seed_from_u64(42));
        let b = Sampler::from_rng(Xoshiro256StarStar::seed_from_u64(42));

        for _ in 0..256 {
            assert_eq!(a.decide(0.3), b.decide(0.3));
        }
    }

    #[test]
    fn generator_is_not_reseeded_per_draw() {
        let sampler = Sampler::from_rng(Xoshiro256StarStar::seed_from_u64(7));

        let outcomes = (0..64).map(|_| sampler.decide(0.5)).collect::<Vec<_>>();
        assert!(outcomes.windows(2).any(|w| w[0] != w[1]));
    }
}
