/// A `ParamGen` produces the values of a parameter snapshot.
pub trait ParamGen: Send {
    /// Should overwrite every value of `out`.
    ///
    /// # Arguments
    /// * `out` - The snapshot to fill, its length is the parameter count.
    fn fill(&mut self, out: &mut [f64]);
}
