// Grouped aggregation over typed records: per-player averages, per-opponent
// totals and batsman-vs-bowler matchups.

use std::collections::{HashMap, HashSet};

use crate::records::{BallByBallRecord, HistoricalRecord};

// ---------------------------------------------------------------------------
// Per-player averages
// ---------------------------------------------------------------------------

/// Arithmetic means of every counting column over all of a player's rows,
/// regardless of opponent. `rows` is always at least 1: players without
/// history have no `PlayerAverages` at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerAverages {
    pub rows: usize,
    pub balls_faced: f64,
    pub runs_scored: f64,
    pub balls_delivered: f64,
    pub runs_conceded: f64,
    pub wickets: f64,
    pub fours: f64,
    pub sixes: f64,
    pub fifties: f64,
    pub hundreds: f64,
    pub catches: f64,
    pub stumpings: f64,
    pub run_outs: f64,
}

impl PlayerAverages {
    /// Runs conceded per six legal balls, if the player has bowled.
    pub fn economy(&self) -> Option<f64> {
        if self.balls_delivered > 0.0 {
            Some(self.runs_conceded / self.balls_delivered * 6.0)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Totals {
    rows: usize,
    balls_faced: u64,
    runs_scored: u64,
    balls_delivered: u64,
    runs_conceded: u64,
    wickets: u64,
    fours: u64,
    sixes: u64,
    fifties: u64,
    hundreds: u64,
    catches: u64,
    stumpings: u64,
    run_outs: u64,
}

impl Totals {
    fn add(&mut self, r: &HistoricalRecord) {
        self.rows += 1;
        self.balls_faced += u64::from(r.balls_faced);
        self.runs_scored += u64::from(r.runs_scored);
        self.balls_delivered += u64::from(r.balls_delivered);
        self.runs_conceded += u64::from(r.runs_conceded);
        self.wickets += u64::from(r.wickets);
        self.fours += u64::from(r.fours);
        self.sixes += u64::from(r.sixes);
        self.fifties += u64::from(r.fifties);
        self.hundreds += u64::from(r.hundreds);
        self.catches += u64::from(r.catches);
        self.stumpings += u64::from(r.stumpings);
        self.run_outs += u64::from(r.run_outs);
    }

    fn averages(&self) -> Option<PlayerAverages> {
        if self.rows == 0 {
            return None;
        }
        let n = self.rows as f64;
        Some(PlayerAverages {
            rows: self.rows,
            balls_faced: self.balls_faced as f64 / n,
            runs_scored: self.runs_scored as f64 / n,
            balls_delivered: self.balls_delivered as f64 / n,
            runs_conceded: self.runs_conceded as f64 / n,
            wickets: self.wickets as f64 / n,
            fours: self.fours as f64 / n,
            sixes: self.sixes as f64 / n,
            fifties: self.fifties as f64 / n,
            hundreds: self.hundreds as f64 / n,
            catches: self.catches as f64 / n,
            stumpings: self.stumpings as f64 / n,
            run_outs: self.run_outs as f64 / n,
        })
    }
}

/// Averages for every player present in `records`, keyed by player name.
pub fn averages_by_player(records: &[HistoricalRecord]) -> HashMap<String, PlayerAverages> {
    let mut totals: HashMap<&str, Totals> = HashMap::new();
    for r in records {
        totals.entry(r.player.as_str()).or_default().add(r);
    }
    totals
        .into_iter()
        .filter_map(|(name, t)| t.averages().map(|a| (name.to_string(), a)))
        .collect()
}

// ---------------------------------------------------------------------------
// Performance against a team
// ---------------------------------------------------------------------------

/// Totals for one player across all rows against one opposing team.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TeamPerformance {
    pub matches_played: usize,
    pub runs: u64,
    pub wickets: u64,
    pub fours: u64,
    pub sixes: u64,
    pub fifties: u64,
    pub hundreds: u64,
    pub catches: u64,
    pub stumpings: u64,
    pub run_outs: u64,
}

pub fn performance_against_team(
    records: &[HistoricalRecord],
    player: &str,
    team: &str,
) -> TeamPerformance {
    let mut matches = HashSet::new();
    let mut perf = TeamPerformance::default();
    for r in records
        .iter()
        .filter(|r| r.player == player && r.against_team == team)
    {
        matches.insert(r.match_id.as_str());
        perf.runs += u64::from(r.runs_scored);
        perf.wickets += u64::from(r.wickets);
        perf.fours += u64::from(r.fours);
        perf.sixes += u64::from(r.sixes);
        perf.fifties += u64::from(r.fifties);
        perf.hundreds += u64::from(r.hundreds);
        perf.catches += u64::from(r.catches);
        perf.stumpings += u64::from(r.stumpings);
        perf.run_outs += u64::from(r.run_outs);
    }
    perf.matches_played = matches.len();
    perf
}

// ---------------------------------------------------------------------------
// Batsman vs bowler
// ---------------------------------------------------------------------------

/// Ball-by-ball totals for one batsman facing one bowler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchupPerformance {
    pub deliveries: u64,
    pub runs: u64,
    pub dismissals: u64,
}

/// Deliveries grouped by (batsman, bowler), built once and queried per pair.
#[derive(Debug, Clone, Default)]
pub struct MatchupIndex {
    pairs: HashMap<(String, String), MatchupPerformance>,
}

impl MatchupIndex {
    pub fn build(balls: &[BallByBallRecord]) -> Self {
        let mut pairs: HashMap<(String, String), MatchupPerformance> = HashMap::new();
        for ball in balls {
            let entry = pairs
                .entry((ball.batsman.clone(), ball.bowler.clone()))
                .or_default();
            entry.deliveries += 1;
            entry.runs += u64::from(ball.batsman_runs);
            if ball.is_wicket {
                entry.dismissals += 1;
            }
        }
        Self { pairs }
    }

    /// Totals for `batsman` facing `bowler`; all zero if they never met.
    pub fn between(&self, batsman: &str, bowler: &str) -> MatchupPerformance {
        self.pairs
            .get(&(batsman.to_string(), bowler.to_string()))
            .copied()
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
