use rand::{Rng, SeedableRng, rngs::StdRng};
use rand_distr::{Distribution, StandardNormal};
use rayon::prelude::*;

use super::ParamGen;

/// Values generated by a single rng before the work is split.
const CHUNK_SIZE: usize = 100_000;

/// Standard normal noise, a fresh draw on every fill.
///
/// The snapshot is split in chunks filled in parallel, each by its own rng
/// seeded from the master one, so the output only depends on the seed and
/// the number of previous fills.
pub struct NoiseParamGen {
    rng: StdRng,
}

impl NoiseParamGen {
    /// Creates a new `NoiseParamGen` parameter generator.
    ///
    /// # Arguments
    /// * `seed` - Seed of the master rng.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl ParamGen for NoiseParamGen {
    fn fill(&mut self, out: &mut [f64]) {
        let seeds: Vec<u64> = (0..out.len().div_ceil(CHUNK_SIZE))
            .map(|_| self.rng.random())
            .collect();

        out.par_chunks_mut(CHUNK_SIZE)
            .zip(seeds)
            .for_each(|(chunk, seed)| {
                let mut rng = StdRng::seed_from_u64(seed);
                for x in chunk {
                    *x = StandardNormal.sample(&mut rng);
                }
            });
    }
}
