// Random forests for regression and classification, backed by smartcore.
//
// Feature matrices arrive as ndarray views and are copied into smartcore's
// `DenseMatrix`. Every tree is grown from a bootstrap sample drawn from the
// forest's seed, so a refit on identical input reproduces the same trees.

use ndarray::{ArrayView1, ArrayView2};
use smartcore::ensemble::random_forest_classifier::{
    RandomForestClassifier as ForestClassifier, RandomForestClassifierParameters,
};
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor as ForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;
use std::fmt;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq)]
pub enum ForestError {
    #[error("cannot fit a forest on zero rows")]
    Empty,

    #[error("forest needs at least one tree")]
    NoTrees,

    #[error("{field} = {value} is out of range for the forest")]
    OutOfRange { field: &'static str, value: usize },

    #[error("{rows} feature rows but {targets} targets")]
    LengthMismatch { rows: usize, targets: usize },

    #[error("row {row} contains a non-finite value")]
    NonFinite { row: usize },

    #[error("class label {value} at row {row} is not a non-negative integer")]
    InvalidLabel { row: usize, value: f64 },

    #[error("point has {found} features but the forest was fitted on {expected}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("forest {stage} failed: {message}")]
    Backend { stage: &'static str, message: String },
}

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ForestParams {
    pub n_trees: usize,
    pub seed: u64,
    pub max_depth: Option<usize>,
    pub min_samples_leaf: usize,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            seed: 42,
            max_depth: None,
            min_samples_leaf: 1,
        }
    }
}

type Matrix = DenseMatrix<f64>;

// ---------------------------------------------------------------------------
// Regressor
// ---------------------------------------------------------------------------

/// Averages the predictions of its trees. Every feature is a split candidate.
pub struct RandomForestRegressor {
    model: ForestRegressor<f64, f64, Matrix, Vec<f64>>,
    n_features: usize,
    n_trees: usize,
}

impl RandomForestRegressor {
    pub fn fit(
        x: ArrayView2<f64>,
        y: ArrayView1<f64>,
        params: &ForestParams,
    ) -> Result<Self, ForestError> {
        let matrix = validate(x, y.len(), params)?;
        if let Some(row) = y.iter().position(|v| !v.is_finite()) {
            return Err(ForestError::NonFinite { row });
        }

        let mut p = RandomForestRegressorParameters::default()
            .with_n_trees(params.n_trees.try_into().map_err(|_| ForestError::OutOfRange {
                field: "n_trees",
                value: params.n_trees,
            })?)
            .with_min_samples_leaf(params.min_samples_leaf)
            .with_m(x.ncols())
            .with_seed(params.seed);
        if let Some(depth) = params.max_depth {
            p = p.with_max_depth(depth.try_into().map_err(|_| ForestError::OutOfRange {
                field: "max_depth",
                value: depth,
            })?);
        }

        let model = ForestRegressor::fit(&matrix, &y.to_vec(), p).map_err(backend("fit"))?;
        Ok(Self {
            model,
            n_features: x.ncols(),
            n_trees: params.n_trees,
        })
    }

    pub fn predict(&self, point: &[f64]) -> Result<f64, ForestError> {
        let matrix = single_row(point, self.n_features)?;
        let predicted = self.model.predict(&matrix).map_err(backend("predict"))?;
        predicted.first().copied().ok_or(ForestError::Backend {
            stage: "predict",
            message: "empty prediction".to_string(),
        })
    }

    pub fn n_trees(&self) -> usize {
        self.n_trees
    }
}

impl fmt::Debug for RandomForestRegressor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RandomForestRegressor")
            .field("n_trees", &self.n_trees)
            .field("n_features", &self.n_features)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

/// Majority vote over its trees. Integral `f64` labels go in and come back
/// out, so callers can treat counts such as wickets as classes.
pub struct RandomForestClassifier {
    model: ForestClassifier<f64, u32, Matrix, Vec<u32>>,
    classes: Vec<f64>,
    n_features: usize,
    n_trees: usize,
}

impl RandomForestClassifier {
    pub fn fit(
        x: ArrayView2<f64>,
        y: ArrayView1<f64>,
        params: &ForestParams,
    ) -> Result<Self, ForestError> {
        let matrix = validate(x, y.len(), params)?;
        let mut labels = Vec::with_capacity(y.len());
        for (row, &value) in y.iter().enumerate() {
            if !value.is_finite() || value < 0.0 || value.fract() != 0.0 || value > f64::from(u32::MAX) {
                return Err(ForestError::InvalidLabel { row, value });
            }
            labels.push(value as u32);
        }
        let mut classes: Vec<f64> = labels.iter().map(|&l| f64::from(l)).collect();
        classes.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        classes.dedup();

        let mut p = RandomForestClassifierParameters::default()
            .with_n_trees(params.n_trees.try_into().map_err(|_| ForestError::OutOfRange {
                field: "n_trees",
                value: params.n_trees,
            })?)
            .with_min_samples_leaf(params.min_samples_leaf)
            .with_seed(params.seed);
        if let Some(depth) = params.max_depth {
            p = p.with_max_depth(depth.try_into().map_err(|_| ForestError::OutOfRange {
                field: "max_depth",
                value: depth,
            })?);
        }

        let model = ForestClassifier::fit(&matrix, &labels, p).map_err(backend("fit"))?;
        Ok(Self {
            model,
            classes,
            n_features: x.ncols(),
            n_trees: params.n_trees,
        })
    }

    /// Most voted class label.
    pub fn predict(&self, point: &[f64]) -> Result<f64, ForestError> {
        let matrix = single_row(point, self.n_features)?;
        let predicted = self.model.predict(&matrix).map_err(backend("predict"))?;
        predicted
            .first()
            .map(|&label| f64::from(label))
            .ok_or(ForestError::Backend {
                stage: "predict",
                message: "empty prediction".to_string(),
            })
    }

    /// Distinct training labels, ascending.
    pub fn classes(&self) -> &[f64] {
        &self.classes
    }

    pub fn n_trees(&self) -> usize {
        self.n_trees
    }
}

impl fmt::Debug for RandomForestClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RandomForestClassifier")
            .field("n_trees", &self.n_trees)
            .field("n_features", &self.n_features)
            .field("classes", &self.classes)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn backend(stage: &'static str) -> impl Fn(smartcore::error::Failed) -> ForestError {
    move |e| ForestError::Backend {
        stage,
        message: e.to_string(),
    }
}

/// Check shapes and values, then copy the rows into a `DenseMatrix`.
fn validate(x: ArrayView2<f64>, targets: usize, params: &ForestParams) -> Result<Matrix, ForestError> {
    if params.n_trees == 0 {
        return Err(ForestError::NoTrees);
    }
    if x.nrows() == 0 {
        return Err(ForestError::Empty);
    }
    if x.nrows() != targets {
        return Err(ForestError::LengthMismatch {
            rows: x.nrows(),
            targets,
        });
    }
    if let Some(row) = x
        .outer_iter()
        .position(|point| !point.iter().all(|v| v.is_finite()))
    {
        return Err(ForestError::NonFinite { row });
    }
    let rows: Vec<Vec<f64>> = x.outer_iter().map(|r| r.to_vec()).collect();
    Ok(DenseMatrix::from_2d_vec(&rows))
}

fn single_row(point: &[f64], expected: usize) -> Result<Matrix, ForestError> {
    if point.len() != expected {
        return Err(ForestError::DimensionMismatch {
            expected,
            found: point.len(),
        });
    }
    Ok(DenseMatrix::from_2d_vec(&vec![point.to_vec()]))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
