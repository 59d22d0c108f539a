// End-to-end tests over the CSV fixtures: load, fit, predict, score, rank
// and render.

use std::path::PathBuf;

use xipick_core::forest::ForestParams;
use xipick_cricket::aggregate::MatchupIndex;
use xipick_cricket::head_to_head::{pick_best, score_roster, HeadToHeadBlend};
use xipick_cricket::pipeline::{FittedPipeline, PipelineError, PipelineSettings, WicketModel};
use xipick_cricket::records::{load_ball_by_ball, load_historical, HistoricalRecord};
use xipick_cricket::report::{build_roster_report, render, MatchReport, ReportFormat};
use xipick_cricket::roster::Roster;
use xipick_cricket::scoring::PointsTable;

// ===========================================================================
// Helpers
// ===========================================================================

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn history() -> Vec<HistoricalRecord> {
    load_historical(&fixture("historical.csv")).expect("fixture should load")
}

fn settings() -> PipelineSettings {
    PipelineSettings {
        forest: ForestParams {
            n_trees: 20,
            ..ForestParams::default()
        },
        ..PipelineSettings::default()
    }
}

fn side(prefix: &str) -> Vec<String> {
    "ABCDEFGHIJK"
        .chars()
        .map(|c| format!("{prefix} {c}"))
        .collect()
}

/// Ten known Ants plus one player with no history, listed last.
fn ants_with_debutant() -> Roster {
    let mut players = side("Ant");
    players.truncate(10);
    players.push("Debutant".to_string());
    Roster {
        name: "Ants".into(),
        opponent: "Bees".into(),
        players,
    }
}

fn bees() -> Roster {
    Roster {
        name: "Bees".into(),
        opponent: "Ants".into(),
        players: side("Bee"),
    }
}

// ===========================================================================
// Loading
// ===========================================================================

#[test]
fn fixtures_load_with_extra_columns_ignored() {
    let records = history();
    assert_eq!(records.len(), 176);
    assert!(records.iter().all(|r| r.against_team != "IPL"));

    let balls = load_ball_by_ball(&fixture("ball_by_ball.csv")).unwrap();
    assert_eq!(balls.len(), 240);
    assert!(!MatchupIndex::build(&balls).is_empty());
}

// ===========================================================================
// Prediction and scoring
// ===========================================================================

#[test]
fn roster_with_absent_player() {
    let pipeline = FittedPipeline::fit(&history(), &settings()).unwrap();
    let report = build_roster_report(&pipeline, &ants_with_debutant(), &PointsTable::default())
        .unwrap();

    let predicted: Vec<_> = report.predictions.iter().filter(|p| p.has_data()).collect();
    assert_eq!(predicted.len(), 10);

    let points = &report.points.entries;
    assert_eq!(points.len(), 11);
    let last = points.last().unwrap();
    assert_eq!(last.name, "Debutant");
    assert_eq!(last.value, 0.0);
    assert!(points.windows(2).all(|w| w[0].value >= w[1].value));

    let runs = &report.runs.entries;
    assert_eq!(runs.last().unwrap().name, "Debutant");
    assert_eq!(runs.last().unwrap().value, None);
    assert!(runs[..10].iter().all(|e| e.value.is_some()));
}

#[test]
fn unseen_opponent_is_an_error() {
    let pipeline = FittedPipeline::fit(&history(), &settings()).unwrap();
    let roster = Roster::new("Ants", "Hornets", &["Ant A"]);
    let err = build_roster_report(&pipeline, &roster, &PointsTable::default()).unwrap_err();
    assert!(matches!(err, PipelineError::Encoding(_)));
    assert!(err.to_string().contains("Hornets"));
}

#[test]
fn refits_produce_identical_reports() {
    let records = history();
    let table = PointsTable::default();
    for wicket_model in [WicketModel::Classifier, WicketModel::Regressor] {
        let s = PipelineSettings {
            wicket_model,
            ..settings()
        };
        let a = FittedPipeline::fit(&records, &s).unwrap();
        let b = FittedPipeline::fit(&records, &s).unwrap();
        assert_eq!(
            build_roster_report(&a, &bees(), &table).unwrap(),
            build_roster_report(&b, &bees(), &table).unwrap()
        );
    }
}

#[test]
fn text_report_marks_missing_players() {
    let pipeline = FittedPipeline::fit(&history(), &settings()).unwrap();
    let table = PointsTable::default();
    let report = MatchReport {
        rosters: vec![
            build_roster_report(&pipeline, &ants_with_debutant(), &table).unwrap(),
            build_roster_report(&pipeline, &bees(), &table).unwrap(),
        ],
        head_to_head: None,
    };
    let text = render(&report, ReportFormat::Text).unwrap();
    assert!(text.contains("11. Debutant: 0.00 points"));
    assert!(text.contains("11. Debutant: No data available"));
    assert!(text.contains("Fantasy points - Bees:"));
}

// ===========================================================================
// Head to head
// ===========================================================================

#[test]
fn pooled_top_eleven() {
    let records = history();
    let balls = load_ball_by_ball(&fixture("ball_by_ball.csv")).unwrap();
    let matchups = MatchupIndex::build(&balls);
    let table = PointsTable::default();
    let blend = HeadToHeadBlend::default();

    let ants = Roster {
        name: "Ants".into(),
        opponent: "Bees".into(),
        players: side("Ant"),
    };
    let bees = bees();
    let a = score_roster(&ants, &bees, &records, &matchups, &blend, &table);
    let b = score_roster(&bees, &ants, &records, &matchups, &blend, &table);
    assert_eq!(a.len(), 11);
    assert_eq!(b.len(), 11);

    let best = pick_best(&a, &b, 11);
    assert_eq!(best.len(), 11);
    let floor = best.last().unwrap().value;
    let chosen: Vec<&str> = best.iter().map(|e| e.name.as_str()).collect();
    for s in a.iter().chain(&b) {
        if !chosen.contains(&s.player.as_str()) {
            assert!(s.points <= floor, "{} ({}) excluded above {floor}", s.player, s.points);
        }
    }
}
