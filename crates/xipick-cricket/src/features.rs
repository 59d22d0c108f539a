// Feature vectors for the batting and bowling spaces.
//
// Training rows use each record's own counts and its own opponent. Prediction
// rows use the player's all-opponent averages and the upcoming opponent.
// Both share the same column order: five base columns, then the opponent
// one-hot.

use ndarray::{aview1, Array1, Array2};
use serde::{Deserialize, Serialize};
use xipick_core::encoding::{EncodingError, OneHotEncoder};

use crate::aggregate::PlayerAverages;
use crate::records::HistoricalRecord;

/// Which half of a player's game a feature space describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Predicts runs from balls faced, boundaries and milestones.
    Batting,
    /// Predicts wickets from balls delivered, runs conceded and fielding.
    Bowling,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Batting, Role::Bowling];

    pub fn label(&self) -> &'static str {
        match self {
            Role::Batting => "batting",
            Role::Bowling => "bowling",
        }
    }

    /// Names of the base (non-encoded) columns, in vector order.
    pub fn base_columns(&self) -> [&'static str; 5] {
        match self {
            Role::Batting => ["ball_faced", "4s", "6s", "50s", "100s"],
            Role::Bowling => ["ball_delivered", "run_given", "catch", "stump", "run_out"],
        }
    }

    fn row_values(&self, r: &HistoricalRecord) -> [f64; 5] {
        match self {
            Role::Batting => [
                f64::from(r.balls_faced),
                f64::from(r.fours),
                f64::from(r.sixes),
                f64::from(r.fifties),
                f64::from(r.hundreds),
            ],
            Role::Bowling => [
                f64::from(r.balls_delivered),
                f64::from(r.runs_conceded),
                f64::from(r.catches),
                f64::from(r.stumpings),
                f64::from(r.run_outs),
            ],
        }
    }

    fn average_values(&self, a: &PlayerAverages) -> [f64; 5] {
        match self {
            Role::Batting => [a.balls_faced, a.fours, a.sixes, a.fifties, a.hundreds],
            Role::Bowling => [
                a.balls_delivered,
                a.runs_conceded,
                a.catches,
                a.stumpings,
                a.run_outs,
            ],
        }
    }

    /// Supervised target: runs for batting, wickets for bowling.
    pub fn target(&self, r: &HistoricalRecord) -> f64 {
        match self {
            Role::Batting => f64::from(r.runs_scored),
            Role::Bowling => f64::from(r.wickets),
        }
    }
}

/// Training inputs for one role: one matrix row per record.
#[derive(Debug, Clone)]
pub struct TrainingSet {
    pub rows: Array2<f64>,
    pub targets: Array1<f64>,
}

/// Builds feature vectors against an opponent vocabulary frozen at fit time.
#[derive(Debug, Clone)]
pub struct FeatureBuilder {
    encoder: OneHotEncoder,
}

impl FeatureBuilder {
    /// Fix the opponent vocabulary from the training records.
    pub fn fit(records: &[HistoricalRecord]) -> Result<Self, EncodingError> {
        let encoder = OneHotEncoder::fit(records.iter().map(|r| r.against_team.as_str()))?;
        Ok(Self { encoder })
    }

    pub fn encoder(&self) -> &OneHotEncoder {
        &self.encoder
    }

    /// Vector width for either role.
    pub fn width(&self) -> usize {
        5 + self.encoder.width()
    }

    pub fn column_names(&self, role: Role) -> Vec<String> {
        role.base_columns()
            .iter()
            .map(|c| c.to_string())
            .chain(
                self.encoder.categories()[1..]
                    .iter()
                    .map(|team| format!("against_team_{team}")),
            )
            .collect()
    }

    /// One row per record, encoded against the record's own opponent.
    pub fn training_set(
        &self,
        records: &[HistoricalRecord],
        role: Role,
    ) -> Result<TrainingSet, EncodingError> {
        let mut rows = Array2::zeros((records.len(), self.width()));
        let mut targets = Array1::zeros(records.len());
        let mut buffer = Vec::with_capacity(self.width());
        for (i, r) in records.iter().enumerate() {
            buffer.clear();
            buffer.extend_from_slice(&role.row_values(r));
            self.encoder.encode_into(&r.against_team, &mut buffer)?;
            rows.row_mut(i).assign(&aview1(&buffer));
            targets[i] = role.target(r);
        }
        Ok(TrainingSet { rows, targets })
    }

    /// Prediction vector from a player's averages and the upcoming opponent.
    pub fn player_vector(
        &self,
        averages: &PlayerAverages,
        role: Role,
        opponent: &str,
    ) -> Result<Array1<f64>, EncodingError> {
        let mut row = Vec::with_capacity(self.width());
        row.extend_from_slice(&role.average_values(averages));
        self.encoder.encode_into(opponent, &mut row)?;
        Ok(Array1::from_vec(row))
    }
}
