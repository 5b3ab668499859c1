use std::cmp::Ordering;

use faqdb_core::error::{Error, Result};
use faqdb_core::traits::VectorIndex;
use faqdb_core::types::SearchHit;

/// Scales `v` to unit length in place. A zero vector is left as is.
pub fn normalize_l2(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Brute-force inner-product index stored as one contiguous row-major buffer.
///
/// Vectors are normalized on insert so inner product equals cosine similarity.
#[derive(Debug, Clone)]
pub struct FlatIpIndex {
    dim: usize,
    data: Vec<f32>,
}

impl FlatIpIndex {
    pub fn new(dim: usize) -> Self {
        Self { dim, data: Vec::new() }
    }

    fn check_dim(&self, got: usize) -> Result<()> {
        if got != self.dim {
            return Err(Error::DimensionMismatch { expected: self.dim, got });
        }
        Ok(())
    }

    fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.dim..(i + 1) * self.dim]
    }
}

impl VectorIndex for FlatIpIndex {
    fn dim(&self) -> usize {
        self.dim
    }

    fn len(&self) -> usize {
        if self.dim == 0 { 0 } else { self.data.len() / self.dim }
    }

    fn add(&mut self, vectors: &[Vec<f32>]) -> Result<()> {
        // Validate the whole batch first so a bad row leaves the index untouched.
        for v in vectors {
            self.check_dim(v.len())?;
        }
        self.data.reserve(vectors.len() * self.dim);
        for v in vectors {
            let start = self.data.len();
            self.data.extend_from_slice(v);
            normalize_l2(&mut self.data[start..]);
        }
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        self.check_dim(query.len())?;
        let mut q = query.to_vec();
        normalize_l2(&mut q);

        let mut hits: Vec<SearchHit> = (0..self.len())
            .map(|index| {
                let score = self.row(index).iter().zip(&q).map(|(a, b)| a * b).sum::<f32>();
                SearchHit { index, score: score.clamp(-1.0, 1.0) }
            })
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then(a.index.cmp(&b.index))
        });
        hits.truncate(k);
        Ok(hits)
    }
}
