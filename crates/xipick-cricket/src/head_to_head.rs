// Head-to-head scoring: history against the opposing team plus ball-by-ball
// history against each opposing player, pooled into a best-eleven pick.

use serde::{Deserialize, Serialize};
use tracing::debug;
use xipick_core::ranking::{pick_top, RankedEntry};

use crate::aggregate::{performance_against_team, MatchupIndex, TeamPerformance};
use crate::records::HistoricalRecord;
use crate::roster::Roster;
use crate::scoring::PointsTable;

/// Which deliveries count as a player's wickets against an opposing player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WicketSource {
    /// Deliveries the player faced that dismissed them, the same rows that
    /// supply the player's runs.
    #[default]
    BatsmanDismissals,
    /// Deliveries the player bowled that dismissed an opposing batsman.
    BowlerDismissals,
}

/// How team-level and player-level history combine. The two sources are on
/// different scales; the default weights simply add them.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct HeadToHeadBlend {
    pub team_weight: f64,
    pub player_weight: f64,
    pub wicket_source: WicketSource,
    /// Add team-history catches, stumpings and run-outs to the points.
    pub include_fielding: bool,
}

impl Default for HeadToHeadBlend {
    fn default() -> Self {
        Self {
            team_weight: 1.0,
            player_weight: 1.0,
            wicket_source: WicketSource::default(),
            include_fielding: false,
        }
    }
}

/// Summed ball-by-ball history of one player against a whole opposing roster.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OpponentPlayerPerformance {
    /// Runs off the bat facing the opposing bowlers.
    pub runs: u64,
    /// Dismissals counted according to the configured `WicketSource`.
    pub wickets: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeadToHeadScore {
    pub player: String,
    pub team: String,
    pub matches_played: usize,
    pub against_players: OpponentPlayerPerformance,
    pub blended_runs: f64,
    pub blended_wickets: f64,
    pub points: f64,
}

pub fn against_players(
    player: &str,
    opposing: &[String],
    matchups: &MatchupIndex,
    source: WicketSource,
) -> OpponentPlayerPerformance {
    let mut perf = OpponentPlayerPerformance::default();
    for other in opposing {
        let faced = matchups.between(player, other);
        perf.runs += faced.runs;
        perf.wickets += match source {
            WicketSource::BatsmanDismissals => faced.dismissals,
            WicketSource::BowlerDismissals => matchups.between(other, player).dismissals,
        };
    }
    perf
}

fn points(
    team: &TeamPerformance,
    runs: f64,
    wickets: f64,
    include_fielding: bool,
    table: &PointsTable,
) -> f64 {
    let p = &table.points;
    let batting = runs * p.run
        + team.fours as f64 * p.four
        + team.sixes as f64 * p.six
        + team.fifties as f64 * p.half_century
        + team.hundreds as f64 * p.century;
    let fielding = if include_fielding {
        team.catches as f64 * p.catch
            + team.stumpings as f64 * p.stumping
            + team.run_outs as f64 * p.run_out
    } else {
        0.0
    };
    batting + wickets * p.wicket + fielding
}

/// Score every player of `roster` against `opposing`, in roster order.
pub fn score_roster(
    roster: &Roster,
    opposing: &Roster,
    records: &[HistoricalRecord],
    matchups: &MatchupIndex,
    blend: &HeadToHeadBlend,
    table: &PointsTable,
) -> Vec<HeadToHeadScore> {
    roster
        .players
        .iter()
        .map(|player| {
            let team = performance_against_team(records, player, &roster.opponent);
            let vs = against_players(player, &opposing.players, matchups, blend.wicket_source);
            let blended_runs =
                blend.team_weight * team.runs as f64 + blend.player_weight * vs.runs as f64;
            let blended_wickets =
                blend.team_weight * team.wickets as f64 + blend.player_weight * vs.wickets as f64;
            let points = points(
                &team,
                blended_runs,
                blended_wickets,
                blend.include_fielding,
                table,
            );
            debug!(
                player = player.as_str(),
                matches = team.matches_played,
                points,
                "head-to-head scored"
            );
            HeadToHeadScore {
                player: player.clone(),
                team: roster.name.clone(),
                matches_played: team.matches_played,
                against_players: vs,
                blended_runs,
                blended_wickets,
                points,
            }
        })
        .collect()
}

/// Pool both sides and keep the best `n` by points.
pub fn pick_best(
    first: &[HeadToHeadScore],
    second: &[HeadToHeadScore],
    n: usize,
) -> Vec<RankedEntry<f64>> {
    pick_top(
        first
            .iter()
            .chain(second)
            .map(|s| (s.player.clone(), s.points)),
        n,
    )
}
