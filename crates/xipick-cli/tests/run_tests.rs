// End-to-end runs of the CLI library against the cricket fixtures, with
// config files written into a temp directory.

use std::fs;
use std::path::{Path, PathBuf};

use xipick_cli::config::{ensure_config_files, load_config_from};
use xipick_cli::run::build_match_report;
use xipick_cricket::report::{render, ReportFormat};

// ===========================================================================
// Helpers
// ===========================================================================

fn cricket_fixtures() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../xipick-cricket/tests/fixtures")
}

fn side(prefix: &str) -> String {
    "ABCDEFGHIJK"
        .chars()
        .map(|c| format!("\"{prefix} {c}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Temp workspace with `data/` CSVs and a config tuned for fast fits.
fn workspace(name: &str, with_balls: bool) -> PathBuf {
    let tmp = std::env::temp_dir().join(name);
    let _ = fs::remove_dir_all(&tmp);
    fs::create_dir_all(tmp.join("data")).unwrap();
    fs::create_dir_all(tmp.join("config")).unwrap();
    for csv in ["historical.csv", "ball_by_ball.csv"] {
        fs::copy(cricket_fixtures().join(csv), tmp.join("data").join(csv)).unwrap();
    }

    let balls = if with_balls {
        "ball_by_ball = \"data/ball_by_ball.csv\"\n"
    } else {
        ""
    };
    write(
        &tmp,
        "pipeline.toml",
        &format!(
            "[data]\nhistorical = \"data/historical.csv\"\n{balls}\n\
             [models]\nn_trees = 15\n"
        ),
    );
    let defaults = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("defaults");
    fs::copy(defaults.join("points.toml"), tmp.join("config/points.toml")).unwrap();
    write(
        &tmp,
        "fixture.toml",
        &format!(
            "[[teams]]\nname = \"Ants\"\nopponent = \"Bees\"\nplayers = [{}]\n\n\
             [[teams]]\nname = \"Bees\"\nopponent = \"Ants\"\nplayers = [{}]\n",
            side("Ant"),
            side("Bee")
        ),
    );
    tmp
}

fn write(base: &Path, file: &str, text: &str) {
    fs::write(base.join("config").join(file), text).unwrap();
}

// ===========================================================================
// Tests
// ===========================================================================

#[test]
fn report_without_ball_by_ball_has_no_head_to_head() {
    let tmp = workspace("xipick_run_plain", false);
    let config = load_config_from(&tmp).unwrap();
    let report = build_match_report(&config, &tmp).unwrap();

    assert_eq!(report.rosters.len(), 2);
    assert!(report.head_to_head.is_none());
    for roster in &report.rosters {
        assert_eq!(roster.points.entries.len(), 11);
        assert!(roster.predictions.iter().all(|p| p.has_data()));
    }
    let _ = fs::remove_dir_all(&tmp);
}

#[test]
fn head_to_head_picks_top_eleven() {
    let tmp = workspace("xipick_run_h2h", true);
    let config = load_config_from(&tmp).unwrap();
    let report = build_match_report(&config, &tmp).unwrap();

    let h2h = report.head_to_head.as_ref().expect("ball-by-ball configured");
    assert_eq!(h2h.scores.len(), 22);
    assert_eq!(h2h.best.entries.len(), 11);

    let text = render(&report, ReportFormat::Text).unwrap();
    assert!(text.contains("Top 11 players - head to head:"));

    let json = render(&report, ReportFormat::Json).unwrap();
    let v: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(v["head_to_head"]["best"]["entries"].as_array().unwrap().len(), 11);
    let _ = fs::remove_dir_all(&tmp);
}

#[test]
fn missing_csv_names_the_path() {
    let tmp = workspace("xipick_run_missing_csv", false);
    fs::remove_file(tmp.join("data/historical.csv")).unwrap();
    let config = load_config_from(&tmp).unwrap();
    let err = build_match_report(&config, &tmp).unwrap_err();
    assert!(format!("{err:#}").contains("historical.csv"));
    let _ = fs::remove_dir_all(&tmp);
}

#[test]
fn shipped_defaults_load() {
    let tmp = std::env::temp_dir().join("xipick_run_defaults");
    let _ = fs::remove_dir_all(&tmp);
    fs::create_dir_all(&tmp).unwrap();
    let defaults = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("defaults");
    fs::create_dir_all(tmp.join("defaults")).unwrap();
    for file in ["pipeline.toml", "points.toml", "fixture.toml"] {
        fs::copy(defaults.join(file), tmp.join("defaults").join(file)).unwrap();
    }

    let copied = ensure_config_files(&tmp).unwrap();
    assert_eq!(copied.len(), 3);
    let config = load_config_from(&tmp).unwrap();
    assert_eq!(config.teams.len(), 2);
    let _ = fs::remove_dir_all(&tmp);
}
