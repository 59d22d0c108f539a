// Fantasy points and impact score.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::aggregate::PlayerAverages;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq)]
pub enum PointsError {
    #[error("points value for `{category}` must be finite, got {value}")]
    NonFinitePoints { category: &'static str, value: f64 },

    #[error("economy bracket {index}: {message}")]
    InvalidBracket { index: usize, message: String },
}

// ---------------------------------------------------------------------------
// Points table
// ---------------------------------------------------------------------------

/// Every category the points table assigns a value to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScoringCategory {
    Run,
    Four,
    Six,
    HalfCentury,
    Century,
    Wicket,
    Catch,
    Stumping,
    RunOut,
}

impl ScoringCategory {
    pub const ALL: [ScoringCategory; 9] = [
        ScoringCategory::Run,
        ScoringCategory::Four,
        ScoringCategory::Six,
        ScoringCategory::HalfCentury,
        ScoringCategory::Century,
        ScoringCategory::Wicket,
        ScoringCategory::Catch,
        ScoringCategory::Stumping,
        ScoringCategory::RunOut,
    ];

    /// Key used in `points.toml`.
    pub fn key(&self) -> &'static str {
        match self {
            ScoringCategory::Run => "run",
            ScoringCategory::Four => "four",
            ScoringCategory::Six => "six",
            ScoringCategory::HalfCentury => "half_century",
            ScoringCategory::Century => "century",
            ScoringCategory::Wicket => "wicket",
            ScoringCategory::Catch => "catch",
            ScoringCategory::Stumping => "stumping",
            ScoringCategory::RunOut => "run_out",
        }
    }
}

/// Point delta per category. Unknown keys are rejected at load time.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PointValues {
    pub run: f64,
    pub four: f64,
    pub six: f64,
    pub half_century: f64,
    pub century: f64,
    pub wicket: f64,
    pub catch: f64,
    pub stumping: f64,
    pub run_out: f64,
}

impl PointValues {
    pub fn get(&self, category: ScoringCategory) -> f64 {
        match category {
            ScoringCategory::Run => self.run,
            ScoringCategory::Four => self.four,
            ScoringCategory::Six => self.six,
            ScoringCategory::HalfCentury => self.half_century,
            ScoringCategory::Century => self.century,
            ScoringCategory::Wicket => self.wicket,
            ScoringCategory::Catch => self.catch,
            ScoringCategory::Stumping => self.stumping,
            ScoringCategory::RunOut => self.run_out,
        }
    }
}

impl Default for PointValues {
    fn default() -> Self {
        Self {
            run: 1.0,
            four: 1.0,
            six: 2.0,
            half_century: 4.0,
            century: 8.0,
            wicket: 25.0,
            catch: 8.0,
            stumping: 12.0,
            run_out: 6.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    AtMost,
    AtLeast,
}

/// Economy-rate bonus or penalty, in runs conceded per six balls.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EconomyBracket {
    pub comparison: Comparison,
    pub bound: f64,
    pub points: f64,
}

impl EconomyBracket {
    fn matches(&self, economy: f64) -> bool {
        match self.comparison {
            Comparison::AtMost => economy <= self.bound,
            Comparison::AtLeast => economy >= self.bound,
        }
    }
}

fn bracket(comparison: Comparison, bound: f64, points: f64) -> EconomyBracket {
    EconomyBracket {
        comparison,
        bound,
        points,
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PointsTable {
    pub points: PointValues,
    #[serde(default)]
    pub economy: Vec<EconomyBracket>,
    /// Economy brackets are validated either way but only scored when set.
    #[serde(default)]
    pub apply_economy: bool,
}

impl Default for PointsTable {
    fn default() -> Self {
        Self {
            points: PointValues::default(),
            economy: vec![
                bracket(Comparison::AtMost, 5.0, 6.0),
                bracket(Comparison::AtMost, 6.0, 4.0),
                bracket(Comparison::AtMost, 7.0, 2.0),
                bracket(Comparison::AtLeast, 10.0, -2.0),
                bracket(Comparison::AtLeast, 11.0, -4.0),
                bracket(Comparison::AtLeast, 12.0, -6.0),
            ],
            apply_economy: false,
        }
    }
}

impl PointsTable {
    /// Check every category value and the economy brackets.
    pub fn validate(&self) -> Result<(), PointsError> {
        for category in ScoringCategory::ALL {
            let value = self.points.get(category);
            if !value.is_finite() {
                return Err(PointsError::NonFinitePoints {
                    category: category.key(),
                    value,
                });
            }
        }

        let mut highest_at_most = f64::NEG_INFINITY;
        let mut lowest_at_least = f64::INFINITY;
        for (index, b) in self.economy.iter().enumerate() {
            if !b.bound.is_finite() || b.bound < 0.0 {
                return Err(PointsError::InvalidBracket {
                    index,
                    message: format!("bound must be a finite non-negative rate, got {}", b.bound),
                });
            }
            if !b.points.is_finite() {
                return Err(PointsError::InvalidBracket {
                    index,
                    message: format!("points must be finite, got {}", b.points),
                });
            }
            let duplicate = self.economy[..index]
                .iter()
                .any(|o| o.comparison == b.comparison && o.bound == b.bound);
            if duplicate {
                return Err(PointsError::InvalidBracket {
                    index,
                    message: format!("duplicate {:?} bound {}", b.comparison, b.bound),
                });
            }
            match b.comparison {
                Comparison::AtMost => highest_at_most = highest_at_most.max(b.bound),
                Comparison::AtLeast => lowest_at_least = lowest_at_least.min(b.bound),
            }
        }
        if highest_at_most >= lowest_at_least {
            return Err(PointsError::InvalidBracket {
                index: self.economy.len().saturating_sub(1),
                message: format!(
                    "at_most bound {highest_at_most} overlaps at_least bound {lowest_at_least}"
                ),
            });
        }
        Ok(())
    }

    /// Points for an economy rate: the smallest `at_most` bound it meets,
    /// otherwise the largest `at_least` bound it reaches, otherwise 0.
    pub fn economy_points(&self, economy: f64) -> f64 {
        if !economy.is_finite() {
            return 0.0;
        }
        let at_most = self
            .economy
            .iter()
            .filter(|b| b.comparison == Comparison::AtMost && b.matches(economy))
            .min_by(|a, b| a.bound.total_cmp(&b.bound));
        let at_least = self
            .economy
            .iter()
            .filter(|b| b.comparison == Comparison::AtLeast && b.matches(economy))
            .max_by(|a, b| a.bound.total_cmp(&b.bound));
        at_most.or(at_least).map_or(0.0, |b| b.points)
    }
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Per-category contributions to one player's total.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PointsBreakdown {
    pub runs: f64,
    pub boundaries: f64,
    pub milestones: f64,
    pub wickets: f64,
    pub fielding: f64,
    pub economy: f64,
}

impl PointsBreakdown {
    pub fn total(&self) -> f64 {
        self.runs + self.boundaries + self.milestones + self.wickets + self.fielding + self.economy
    }
}

/// Contributions for a player with both predictions and a history.
/// `None` when anything is missing.
pub fn points_breakdown(
    runs: Option<f64>,
    wickets: Option<f64>,
    averages: Option<&PlayerAverages>,
    table: &PointsTable,
) -> Option<PointsBreakdown> {
    let (runs, wickets, avg) = (runs?, wickets?, averages?);
    let p = &table.points;

    let mut milestones = 0.0;
    if runs >= 50.0 {
        milestones += p.half_century;
    }
    if runs >= 100.0 {
        milestones += p.century;
    }

    let economy = match (table.apply_economy, avg.economy()) {
        (true, Some(rate)) => table.economy_points(rate),
        _ => 0.0,
    };

    Some(PointsBreakdown {
        runs: runs * p.run,
        boundaries: avg.fours * p.four + avg.sixes * p.six,
        milestones,
        wickets: wickets * p.wicket,
        fielding: avg.catches * p.catch + avg.stumpings * p.stumping + avg.run_outs * p.run_out,
        economy,
    })
}

/// Total fantasy points. Exactly 0 unless both predictions and the
/// player's averages are present.
pub fn fantasy_points(
    runs: Option<f64>,
    wickets: Option<f64>,
    averages: Option<&PlayerAverages>,
    table: &PointsTable,
) -> f64 {
    points_breakdown(runs, wickets, averages, table).map_or(0.0, |b| b.total())
}

/// Ranking-only blend of predicted runs and wickets.
pub fn impact_score(runs: Option<f64>, wickets: Option<f64>) -> Option<f64> {
    Some(0.6 * runs? + 0.4 * wickets?)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
