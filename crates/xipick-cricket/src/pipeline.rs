// Fit-once prediction pipeline.
//
// `FittedPipeline::fit` freezes the opponent vocabulary, the batting and
// bowling archetype centers and one model per archetype. Every later call
// only reads from it.

use ndarray::{Array1, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info, warn};
use xipick_core::encoding::EncodingError;
use xipick_core::forest::{ForestError, ForestParams, RandomForestClassifier, RandomForestRegressor};
use xipick_core::kmeans::{ClusterError, KMeans, KMeansParams};

use crate::aggregate::{averages_by_player, PlayerAverages};
use crate::features::{FeatureBuilder, Role, TrainingSet};
use crate::records::HistoricalRecord;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no historical rows to fit on")]
    EmptyTrainingSet,

    #[error("opponent encoding failed: {0}")]
    Encoding(#[from] EncodingError),

    #[error("{role:?} clustering failed: {source}")]
    Cluster { role: Role, source: ClusterError },

    #[error("{role:?} model for archetype {archetype} failed: {source}")]
    Model {
        role: Role,
        archetype: usize,
        source: ForestError,
    },

    #[error("no {role:?} model for archetype {archetype} ({available} models fitted)")]
    MissingArchetypeModel {
        role: Role,
        archetype: usize,
        available: usize,
    },
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// How the per-archetype wicket models treat their target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WicketModel {
    /// Wickets as discrete classes; predictions are observed wicket counts.
    #[default]
    Classifier,
    /// Wickets as a continuous quantity; predictions are forest means.
    Regressor,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub clustering: KMeansParams,
    pub forest: ForestParams,
    /// Archetypes with fewer training rows fall back to a constant model.
    pub min_archetype_rows: usize,
    pub wicket_model: WicketModel,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            clustering: KMeansParams::default(),
            forest: ForestParams::default(),
            min_archetype_rows: 2,
            wicket_model: WicketModel::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Per-archetype models
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ArchetypeModel {
    Regressor(RandomForestRegressor),
    Classifier(RandomForestClassifier),
    /// Used for degenerate archetypes: the global mean (regression) or the
    /// globally most frequent value (classification) of the target.
    Fallback { value: f64, rows: usize },
}

impl ArchetypeModel {
    pub fn predict(&self, x: ArrayView1<f64>) -> Result<f64, ForestError> {
        match self {
            ArchetypeModel::Regressor(f) => f.predict(&x.to_vec()),
            ArchetypeModel::Classifier(f) => f.predict(&x.to_vec()),
            ArchetypeModel::Fallback { value, .. } => Ok(*value),
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, ArchetypeModel::Fallback { .. })
    }
}

/// Frozen clustering plus one model per archetype for a single role.
#[derive(Debug)]
pub struct RoleModel {
    role: Role,
    clusterer: KMeans,
    models: Vec<ArchetypeModel>,
    training_labels: Vec<usize>,
}

impl RoleModel {
    fn fit(
        role: Role,
        training: &TrainingSet,
        settings: &PipelineSettings,
    ) -> Result<Self, PipelineError> {
        let fit = KMeans::fit(&training.rows, &settings.clustering)
            .map_err(|source| PipelineError::Cluster { role, source })?;
        info!(
            "{} archetypes fitted: k={}, inertia={:.2}",
            role.label(),
            fit.model.k(),
            fit.model.inertia()
        );
        debug!(role = role.label(), centers = ?fit.model.centers(), "archetype centers");

        let classify = role == Role::Bowling && settings.wicket_model == WicketModel::Classifier;
        let targets = training.targets.as_slice().unwrap_or(&[]);
        let fallback_value = if classify {
            most_frequent(targets)
        } else {
            mean(targets)
        };

        let mut models = Vec::with_capacity(fit.model.k());
        for archetype in 0..fit.model.k() {
            let members: Vec<usize> = fit
                .labels
                .iter()
                .enumerate()
                .filter(|(_, &l)| l == archetype)
                .map(|(i, _)| i)
                .collect();

            if members.len() < settings.min_archetype_rows.max(1) {
                warn!(
                    "{} archetype {} has {} rows (< {}); using constant fallback {:.3}",
                    role.label(),
                    archetype,
                    members.len(),
                    settings.min_archetype_rows,
                    fallback_value
                );
                models.push(ArchetypeModel::Fallback {
                    value: fallback_value,
                    rows: members.len(),
                });
                continue;
            }

            let x = training.rows.select(Axis(0), &members);
            let y = training.targets.select(Axis(0), &members);
            let model_error = |source| PipelineError::Model {
                role,
                archetype,
                source,
            };
            let model = if classify {
                let forest = RandomForestClassifier::fit(x.view(), y.view(), &settings.forest)
                    .map_err(model_error)?;
                debug!(
                    role = role.label(),
                    archetype,
                    rows = members.len(),
                    trees = forest.n_trees(),
                    classes = ?forest.classes(),
                    "archetype classifier fitted"
                );
                ArchetypeModel::Classifier(forest)
            } else {
                let forest = RandomForestRegressor::fit(x.view(), y.view(), &settings.forest)
                    .map_err(model_error)?;
                debug!(
                    role = role.label(),
                    archetype,
                    rows = members.len(),
                    trees = forest.n_trees(),
                    "archetype regressor fitted"
                );
                ArchetypeModel::Regressor(forest)
            };
            models.push(model);
        }

        let fallbacks = models.iter().filter(|m| m.is_fallback()).count();
        if fallbacks > 0 {
            info!(
                "{} archetypes: {} of {} use a constant fallback",
                role.label(),
                fallbacks,
                models.len()
            );
        }

        Ok(Self {
            role,
            clusterer: fit.model,
            models,
            training_labels: fit.labels,
        })
    }

    /// Nearest frozen center for a prediction vector.
    pub fn archetype(&self, x: ArrayView1<f64>) -> Result<usize, PipelineError> {
        self.clusterer
            .predict(x)
            .map_err(|source| PipelineError::Cluster {
                role: self.role,
                source,
            })
    }

    /// Archetype label and the prediction of that archetype's model.
    pub fn predict(&self, x: &Array1<f64>) -> Result<(usize, f64), PipelineError> {
        let x = x.view();
        let archetype = self.archetype(x)?;
        let model = self
            .models
            .get(archetype)
            .ok_or(PipelineError::MissingArchetypeModel {
                role: self.role,
                archetype,
                available: self.models.len(),
            })?;
        let value = model.predict(x).map_err(|source| PipelineError::Model {
            role: self.role,
            archetype,
            source,
        })?;
        Ok((archetype, value))
    }

    pub fn models(&self) -> &[ArchetypeModel] {
        &self.models
    }

    /// Archetype assigned to each training row, in record order.
    pub fn training_labels(&self) -> &[usize] {
        &self.training_labels
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Most frequent value; the smallest value wins ties.
fn most_frequent(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mut best = (0.0, 0usize);
    let mut i = 0;
    while i < sorted.len() {
        let mut j = i;
        while j < sorted.len() && sorted[j] == sorted[i] {
            j += 1;
        }
        if j - i > best.1 {
            best = (sorted[i], j - i);
        }
        i = j;
    }
    best.0
}

// ---------------------------------------------------------------------------
// Predictions
// ---------------------------------------------------------------------------

/// Per-player prediction. Runs come straight from regression and are not
/// clamped, so they can be negative or implausibly large. Everything is
/// `None` when the player has no history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub player: String,
    pub runs: Option<f64>,
    pub wickets: Option<f64>,
    pub batting_archetype: Option<usize>,
    pub bowling_archetype: Option<usize>,
}

impl PredictionResult {
    fn missing(player: &str) -> Self {
        Self {
            player: player.to_string(),
            runs: None,
            wickets: None,
            batting_archetype: None,
            bowling_archetype: None,
        }
    }

    pub fn has_data(&self) -> bool {
        self.runs.is_some() && self.wickets.is_some()
    }
}

// ---------------------------------------------------------------------------
// Fitted pipeline
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct FittedPipeline {
    features: FeatureBuilder,
    batting: RoleModel,
    bowling: RoleModel,
    history: HashMap<String, PlayerAverages>,
}

impl FittedPipeline {
    /// Fit the encoder, both clusterers and every archetype model.
    pub fn fit(
        records: &[HistoricalRecord],
        settings: &PipelineSettings,
    ) -> Result<Self, PipelineError> {
        if records.is_empty() {
            return Err(PipelineError::EmptyTrainingSet);
        }
        let features = FeatureBuilder::fit(records)?;
        info!(
            "Opponent vocabulary: {} teams (reference `{}`)",
            features.encoder().categories().len(),
            features.encoder().reference()
        );

        for role in Role::ALL {
            debug!(role = role.label(), columns = ?features.column_names(role), "feature space");
        }

        let bat = features.training_set(records, Role::Batting)?;
        let batting = RoleModel::fit(Role::Batting, &bat, settings)?;

        let bowl = features.training_set(records, Role::Bowling)?;
        let bowling = RoleModel::fit(Role::Bowling, &bowl, settings)?;

        let history = averages_by_player(records);
        info!("Pipeline fitted on {} rows, {} players", records.len(), history.len());

        Ok(Self {
            features,
            batting,
            bowling,
            history,
        })
    }

    pub fn features(&self) -> &FeatureBuilder {
        &self.features
    }

    pub fn role(&self, role: Role) -> &RoleModel {
        match role {
            Role::Batting => &self.batting,
            Role::Bowling => &self.bowling,
        }
    }

    /// Historical per-match averages, if the player appears in training data.
    pub fn averages(&self, player: &str) -> Option<&PlayerAverages> {
        self.history.get(player)
    }

    /// Predict runs and wickets for one player against `opponent`.
    ///
    /// The opponent is validated even for players without history, so an
    /// unknown team fails the whole roster instead of only some players.
    pub fn predict_player(
        &self,
        player: &str,
        opponent: &str,
    ) -> Result<PredictionResult, PipelineError> {
        if !self.features.encoder().contains(opponent) {
            return Err(PipelineError::Encoding(EncodingError::UnseenCategory {
                value: opponent.to_string(),
                known: self.features.encoder().categories().len(),
            }));
        }
        let Some(averages) = self.history.get(player) else {
            debug!(player, "no historical rows; prediction skipped");
            return Ok(PredictionResult::missing(player));
        };

        let bat_x = self.features.player_vector(averages, Role::Batting, opponent)?;
        let (batting_archetype, runs) = self.batting.predict(&bat_x)?;

        let bowl_x = self.features.player_vector(averages, Role::Bowling, opponent)?;
        let (bowling_archetype, wickets) = self.bowling.predict(&bowl_x)?;

        Ok(PredictionResult {
            player: player.to_string(),
            runs: Some(runs),
            wickets: Some(wickets),
            batting_archetype: Some(batting_archetype),
            bowling_archetype: Some(bowling_archetype),
        })
    }

    /// Predict a whole roster, preserving roster order.
    pub fn predict_roster<S: AsRef<str>>(
        &self,
        players: &[S],
        opponent: &str,
    ) -> Result<Vec<PredictionResult>, PipelineError> {
        players
            .iter()
            .map(|p| self.predict_player(p.as_ref(), opponent))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
