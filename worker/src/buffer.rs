use std::ops::Deref;

/// A snapshot of the remote source's parameters.
///
/// Never mutated once handed to the caller, take ownership of the values
/// with `into_vec` to change them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParameterBuffer {
    values: Vec<f64>,
}

impl ParameterBuffer {
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.values
    }
}

impl Deref for ParameterBuffer {
    type Target = [f64];

    fn deref(&self) -> &Self::Target {
        &self.values
    }
}

impl From<Vec<f64>> for ParameterBuffer {
    fn from(values: Vec<f64>) -> Self {
        Self { values }
    }
}

impl PartialEq<[f64]> for ParameterBuffer {
    fn eq(&self, other: &[f64]) -> bool {
        self.values == other
    }
}

impl<const N: usize> PartialEq<[f64; N]> for ParameterBuffer {
    fn eq(&self, other: &[f64; N]) -> bool {
        self.values == other
    }
}
