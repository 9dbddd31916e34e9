//! Cosine similarity between embedding vectors.
//!
//! All arithmetic is done in `f64`. Norms are computed with the scaled
//! sum-of-squares used by BLAS `nrm2`, so tiny vectors do not underflow to
//! zero and huge ones do not overflow. Results are clamped to `[-1, 1]`
//! to absorb rounding overshoot (e.g. `1.0000000000000002` for a vector
//! compared with itself).

use crate::error::{Error, Result};

/// Cosine similarity of `a` and `b`.
///
/// Fails with [`Error::DegenerateVector`] when either vector has zero norm
/// or contains a non-finite component, and with
/// [`Error::DimensionMismatch`] when the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f64> {
    Reference::new(a)?.score(b)
}

/// Euclidean norm computed with scaling.
///
/// Returns `None` for empty vectors and vectors with non-finite
/// components.
pub fn l2_norm(v: &[f32]) -> Option<f64> {
    let mut scale = 0.0_f64;
    for &x in v {
        let x = f64::from(x);
        if !x.is_finite() {
            return None;
        }
        scale = scale.max(x.abs());
    }
    if v.is_empty() {
        return None;
    }
    if scale == 0.0 {
        return Some(0.0);
    }

    let sum_sq: f64 = v
        .iter()
        .map(|&x| {
            let r = f64::from(x) / scale;
            r * r
        })
        .sum();
    Some(scale * sum_sq.sqrt())
}

/// A vector that many others are scored against.
///
/// Holds the precomputed norm so the job description is measured once per
/// request instead of once per candidate.
#[derive(Debug, Clone)]
pub struct Reference {
    vector: Vec<f32>,
    norm: f64,
}

impl Reference {
    pub fn new(vector: &[f32]) -> Result<Self> {
        let norm = nonzero_norm(vector)?;
        Ok(Self {
            vector: vector.to_vec(),
            norm,
        })
    }

    pub fn dimension(&self) -> usize {
        self.vector.len()
    }

    /// Cosine similarity between this reference and `other`.
    pub fn score(&self, other: &[f32]) -> Result<f64> {
        if other.len() != self.vector.len() {
            return Err(Error::DimensionMismatch {
                left: self.vector.len(),
                right: other.len(),
            });
        }
        let other_norm = nonzero_norm(other)?;

        let dot: f64 = self
            .vector
            .iter()
            .zip(other)
            .map(|(&x, &y)| f64::from(x) * f64::from(y))
            .sum();

        // Divide by each norm separately; their product can overflow.
        let cosine = (dot / self.norm) / other_norm;
        if !cosine.is_finite() {
            return Err(Error::DegenerateVector);
        }
        Ok(cosine.clamp(-1.0, 1.0))
    }
}

fn nonzero_norm(v: &[f32]) -> Result<f64> {
    match l2_norm(v) {
        Some(n) if n > 0.0 && n.is_finite() => Ok(n),
        _ => Err(Error::DegenerateVector),
    }
}
