use rayon::prelude::*;

use super::ParamGen;

/// Generates `out[i] = i`, handy to spot misplaced or truncated values.
pub struct RampParamGen;

impl ParamGen for RampParamGen {
    fn fill(&mut self, out: &mut [f64]) {
        out.par_iter_mut()
            .enumerate()
            .for_each(|(i, x)| *x = i as f64);
    }
}
