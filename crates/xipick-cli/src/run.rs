// One batch run: load the CSVs named in the config, fit the pipeline and
// build the report for the configured fixture.

use anyhow::Context;
use std::path::Path;
use tracing::info;
use xipick_cricket::aggregate::MatchupIndex;
use xipick_cricket::head_to_head::{pick_best, score_roster};
use xipick_cricket::pipeline::FittedPipeline;
use xipick_cricket::records::{load_ball_by_ball, load_historical};
use xipick_cricket::report::{build_head_to_head_report, build_roster_report, MatchReport};

use crate::config::Config;

/// Build the full match report. Data paths are resolved against `base_dir`.
pub fn build_match_report(config: &Config, base_dir: &Path) -> anyhow::Result<MatchReport> {
    let historical_path = base_dir.join(&config.data.historical);
    let records = load_historical(&historical_path)
        .with_context(|| format!("failed to load {}", historical_path.display()))?;

    let pipeline = FittedPipeline::fit(&records, &config.pipeline_settings())
        .context("failed to fit prediction pipeline")?;

    let mut rosters = Vec::with_capacity(config.teams.len());
    for team in &config.teams {
        let report = build_roster_report(&pipeline, team, &config.points)
            .with_context(|| format!("failed to predict {} vs {}", team.name, team.opponent))?;
        rosters.push(report);
    }

    let head_to_head = match (&config.data.ball_by_ball, config.teams.as_slice()) {
        (Some(path), [first, second]) => {
            let balls_path = base_dir.join(path);
            let balls = load_ball_by_ball(&balls_path)
                .with_context(|| format!("failed to load {}", balls_path.display()))?;
            let matchups = MatchupIndex::build(&balls);
            info!("Indexed {} batsman/bowler pairs", matchups.len());

            let blend = config.blend();
            let a = score_roster(first, second, &records, &matchups, &blend, &config.points);
            let b = score_roster(second, first, &records, &matchups, &blend, &config.points);
            let best = pick_best(&a, &b, config.head_to_head.top_n);
            let mut scores = a;
            scores.extend(b);
            Some(build_head_to_head_report(scores, best))
        }
        _ => None,
    };

    Ok(MatchReport {
        rosters,
        head_to_head,
    })
}
