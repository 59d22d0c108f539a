// Leaderboards per roster and their text/JSON rendering.

use serde::{Deserialize, Serialize};
use std::fmt::Write;
use thiserror::Error;
use tracing::info;
use xipick_core::ranking::{rank_descending, rank_optional, RankedEntry};

use crate::head_to_head::HeadToHeadScore;
use crate::pipeline::{FittedPipeline, PipelineError, PredictionResult};
use crate::roster::Roster;
use crate::scoring::{fantasy_points, impact_score, PointsTable};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Leaderboard<V> {
    pub title: String,
    pub unit: &'static str,
    pub entries: Vec<RankedEntry<V>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RosterReport {
    pub team: String,
    pub opponent: String,
    pub points: Leaderboard<f64>,
    pub runs: Leaderboard<Option<f64>>,
    pub wickets: Leaderboard<Option<f64>>,
    pub impact: Leaderboard<Option<f64>>,
    pub predictions: Vec<PredictionResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeadToHeadReport {
    pub scores: Vec<HeadToHeadScore>,
    pub best: Leaderboard<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchReport {
    pub rosters: Vec<RosterReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head_to_head: Option<HeadToHeadReport>,
}

// ---------------------------------------------------------------------------
// Building
// ---------------------------------------------------------------------------

/// Predict, score and rank one roster against its upcoming opponent.
pub fn build_roster_report(
    pipeline: &FittedPipeline,
    roster: &Roster,
    table: &PointsTable,
) -> Result<RosterReport, PipelineError> {
    let predictions = pipeline.predict_roster(&roster.players, &roster.opponent)?;
    let missing = predictions.iter().filter(|p| !p.has_data()).count();
    info!(
        "{} vs {}: {} players predicted, {} without history",
        roster.name,
        roster.opponent,
        predictions.len() - missing,
        missing
    );

    let points = rank_descending(predictions.iter().map(|p| {
        let total = fantasy_points(p.runs, p.wickets, pipeline.averages(&p.player), table);
        (p.player.clone(), total)
    }));
    let runs = rank_optional(predictions.iter().map(|p| (p.player.clone(), p.runs)));
    let wickets = rank_optional(predictions.iter().map(|p| (p.player.clone(), p.wickets)));
    let impact = rank_optional(
        predictions
            .iter()
            .map(|p| (p.player.clone(), impact_score(p.runs, p.wickets))),
    );

    Ok(RosterReport {
        team: roster.name.clone(),
        opponent: roster.opponent.clone(),
        points: Leaderboard {
            title: format!("Fantasy points - {}", roster.name),
            unit: "points",
            entries: points,
        },
        runs: Leaderboard {
            title: format!("Predicted runs - {}", roster.name),
            unit: "runs",
            entries: runs,
        },
        wickets: Leaderboard {
            title: format!("Predicted wickets - {}", roster.name),
            unit: "wickets",
            entries: wickets,
        },
        impact: Leaderboard {
            title: format!("Impact score - {}", roster.name),
            unit: "impact",
            entries: impact,
        },
        predictions,
    })
}

pub fn build_head_to_head_report(
    scores: Vec<HeadToHeadScore>,
    best: Vec<RankedEntry<f64>>,
) -> HeadToHeadReport {
    HeadToHeadReport {
        scores,
        best: Leaderboard {
            title: format!("Top {} players - head to head", best.len()),
            unit: "points",
            entries: best,
        },
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

trait EntryValue {
    fn fmt_value(&self, unit: &str) -> String;
}

impl EntryValue for f64 {
    fn fmt_value(&self, unit: &str) -> String {
        format!("{self:.2} {unit}")
    }
}

impl EntryValue for Option<f64> {
    fn fmt_value(&self, unit: &str) -> String {
        match self {
            Some(v) => v.fmt_value(unit),
            None => "No data available".to_string(),
        }
    }
}

fn write_board<V: EntryValue>(out: &mut String, board: &Leaderboard<V>) {
    let _ = writeln!(out, "{}:", board.title);
    if board.entries.is_empty() {
        let _ = writeln!(out, "  (no players)");
    }
    for e in &board.entries {
        let _ = writeln!(out, "{}. {}: {}", e.rank, e.name, e.value.fmt_value(board.unit));
    }
    out.push('\n');
}

pub fn render_text(report: &MatchReport) -> String {
    let mut out = String::new();
    for r in &report.rosters {
        write_board(&mut out, &r.points);
        write_board(&mut out, &r.runs);
        write_board(&mut out, &r.wickets);
        write_board(&mut out, &r.impact);
    }
    if let Some(h2h) = &report.head_to_head {
        write_board(&mut out, &h2h.best);
    }
    out
}

pub fn render(report: &MatchReport, format: ReportFormat) -> Result<String, ReportError> {
    match format {
        ReportFormat::Text => Ok(render_text(report)),
        ReportFormat::Json => Ok(serde_json::to_string_pretty(report)?),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
