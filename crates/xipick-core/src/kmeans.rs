// Seeded k-means archetypes on top of linfa-clustering.
//
// Centers are frozen once fitted; new points are assigned to the nearest
// center with `predict` and never refit.

use linfa::prelude::*;
use linfa_clustering::KMeans as LinfaKMeans;
use linfa_nn::distance::L2Dist;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use tracing::debug;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq)]
pub enum ClusterError {
    #[error("number of clusters must be greater than 0")]
    InvalidK,

    #[error("cannot fit {k} clusters on {samples} samples")]
    TooFewSamples { samples: usize, k: usize },

    #[error("row {row} contains a non-finite value")]
    NonFinite { row: usize },

    #[error("point has {found} features but centers have {expected}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("k-means fit failed: {message}")]
    Fit { message: String },
}

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// Fitting parameters, passed through to linfa's k-means++ / Lloyd solver.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansParams {
    pub k: usize,
    pub seed: u64,
    pub n_init: usize,
    pub max_iter: usize,
    pub tolerance: f64,
}

impl Default for KMeansParams {
    fn default() -> Self {
        Self {
            k: 5,
            seed: 42,
            n_init: 10,
            max_iter: 300,
            tolerance: 1e-4,
        }
    }
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// A fitted set of cluster centers.
#[derive(Debug, Clone)]
pub struct KMeans {
    model: LinfaKMeans<f64, L2Dist>,
    inertia: f64,
}

/// Result of a fit: the frozen model plus the label of every training row.
#[derive(Debug, Clone)]
pub struct KMeansFit {
    pub model: KMeans,
    pub labels: Vec<usize>,
}

impl KMeans {
    /// Fit `params.k` centers on the rows of `data`. linfa keeps the best of
    /// `n_init` runs, all drawn from one ChaCha8 stream seeded by `params.seed`.
    pub fn fit(data: &Array2<f64>, params: &KMeansParams) -> Result<KMeansFit, ClusterError> {
        if params.k == 0 {
            return Err(ClusterError::InvalidK);
        }
        if data.nrows() < params.k {
            return Err(ClusterError::TooFewSamples {
                samples: data.nrows(),
                k: params.k,
            });
        }
        if let Some(row) = data
            .outer_iter()
            .position(|point| !point.iter().all(|v| v.is_finite()))
        {
            return Err(ClusterError::NonFinite { row });
        }

        let dataset = DatasetBase::from(data.clone());
        let model = LinfaKMeans::params_with_rng(params.k, ChaCha8Rng::seed_from_u64(params.seed))
            .n_runs(params.n_init.max(1))
            .max_n_iterations(params.max_iter as u64)
            .tolerance(params.tolerance)
            .fit(&dataset)
            .map_err(|e| ClusterError::Fit {
                message: e.to_string(),
            })?;

        let labels: Array1<usize> = model.predict(data);
        let inertia = inertia(data.view(), model.centroids().view(), &labels);
        debug!(k = params.k, rows = data.nrows(), inertia, "k-means fitted");

        Ok(KMeansFit {
            model: KMeans { model, inertia },
            labels: labels.to_vec(),
        })
    }

    /// Index of the nearest frozen center.
    pub fn predict(&self, point: ArrayView1<f64>) -> Result<usize, ClusterError> {
        if point.len() != self.dim() {
            return Err(ClusterError::DimensionMismatch {
                expected: self.dim(),
                found: point.len(),
            });
        }
        let batch = point.insert_axis(Axis(0));
        let labels: Array1<usize> = self.model.predict(&batch);
        labels.get(0).copied().ok_or(ClusterError::Fit {
            message: "no label returned for point".to_string(),
        })
    }

    pub fn k(&self) -> usize {
        self.model.centroids().nrows()
    }

    pub fn dim(&self) -> usize {
        self.model.centroids().ncols()
    }

    pub fn centers(&self) -> &Array2<f64> {
        self.model.centroids()
    }

    /// Sum of squared distances from each training row to its center.
    pub fn inertia(&self) -> f64 {
        self.inertia
    }
}

fn inertia(data: ArrayView2<f64>, centers: ArrayView2<f64>, labels: &Array1<usize>) -> f64 {
    data.outer_iter()
        .zip(labels.iter())
        .map(|(point, &label)| {
            let center = centers.row(label);
            point
                .iter()
                .zip(center.iter())
                .map(|(a, b)| (a - b) * (a - b))
                .sum::<f64>()
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    fn blobs() -> Array2<f64> {
        let mut data = Vec::new();
        for (cx, cy) in [(0.0, 0.0), (50.0, 50.0), (100.0, 0.0)] {
            for i in 0..10 {
                let jitter = i as f64 * 0.1;
                data.extend_from_slice(&[cx + jitter, cy - jitter]);
            }
        }
        Array2::from_shape_vec((30, 2), data).unwrap()
    }

    fn params(k: usize) -> KMeansParams {
        KMeansParams {
            k,
            ..KMeansParams::default()
        }
    }

    #[test]
    fn separates_well_spaced_blobs() {
        let data = blobs();
        let fit = KMeans::fit(&data, &params(3)).unwrap();
        assert_eq!(fit.labels.len(), 30);
        for blob in 0..3 {
            let first = fit.labels[blob * 10];
            assert!(fit.labels[blob * 10..blob * 10 + 10].iter().all(|&l| l == first));
        }
        assert_ne!(fit.labels[0], fit.labels[10]);
        assert_ne!(fit.labels[10], fit.labels[20]);
        assert_ne!(fit.labels[0], fit.labels[20]);
        assert_eq!(fit.model.k(), 3);
        assert_eq!(fit.model.dim(), 2);
    }

    #[test]
    fn identical_input_gives_identical_labels() {
        let data = blobs();
        let a = KMeans::fit(&data, &params(5)).unwrap();
        let b = KMeans::fit(&data, &params(5)).unwrap();
        assert_eq!(a.labels, b.labels);
        assert_eq!(a.model.centers(), b.model.centers());
    }

    #[test]
    fn predict_uses_frozen_centers() {
        let data = blobs();
        let fit = KMeans::fit(&data, &params(3)).unwrap();
        assert_eq!(fit.model.predict(array![99.0, 1.0].view()).unwrap(), fit.labels[20]);
        assert_eq!(fit.model.predict(array![0.5, 0.5].view()).unwrap(), fit.labels[0]);
    }

    #[test]
    fn training_labels_match_predict() {
        let data = blobs();
        let fit = KMeans::fit(&data, &params(5)).unwrap();
        for (p, &l) in data.outer_iter().zip(&fit.labels) {
            assert_eq!(fit.model.predict(p).unwrap(), l);
        }
    }

    #[test]
    fn inertia_is_small_for_tight_blobs() {
        let fit = KMeans::fit(&blobs(), &params(3)).unwrap();
        assert!(fit.model.inertia() < 10.0, "inertia = {}", fit.model.inertia());
    }

    #[test]
    fn too_few_samples_rejected() {
        let data = array![[1.0], [2.0]];
        assert_eq!(
            KMeans::fit(&data, &params(5)).unwrap_err(),
            ClusterError::TooFewSamples { samples: 2, k: 5 }
        );
    }

    #[test]
    fn non_finite_rows_rejected() {
        let data = array![[1.0, 2.0], [f64::NAN, 1.0]];
        assert_eq!(
            KMeans::fit(&data, &params(1)).unwrap_err(),
            ClusterError::NonFinite { row: 1 }
        );
    }

    #[test]
    fn predict_dimension_checked() {
        let fit = KMeans::fit(&blobs(), &params(2)).unwrap();
        assert_eq!(
            fit.model.predict(array![1.0].view()).unwrap_err(),
            ClusterError::DimensionMismatch {
                expected: 2,
                found: 1
            }
        );
    }
}
