// Typed loading of the two tabular inputs: per-match player aggregates and
// ball-by-ball deliveries.
//
// Both loaders fail fast: a missing column, a non-numeric cell or a count that
// is negative or fractional aborts the load with the file, line and column.
// Extra columns are ignored.

use serde::Deserialize;
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// One player's aggregate for one match against one opposing team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoricalRecord {
    pub player: String,
    pub against_team: String,
    pub match_id: String,
    pub balls_faced: u32,
    pub runs_scored: u32,
    pub balls_delivered: u32,
    pub runs_conceded: u32,
    pub wickets: u32,
    pub fours: u32,
    pub sixes: u32,
    pub fifties: u32,
    pub hundreds: u32,
    pub catches: u32,
    pub stumpings: u32,
    pub run_outs: u32,
}

/// One delivery. Only used for batsman-vs-bowler aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BallByBallRecord {
    pub batsman: String,
    pub bowler: String,
    pub batsman_runs: u32,
    pub is_wicket: bool,
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("{path}: missing required column `{column}`")]
    MissingColumn { path: String, column: &'static str },

    #[error("{path} line {line}: malformed row: {message}")]
    Malformed {
        path: String,
        line: u64,
        message: String,
    },

    #[error("{path} line {line}: column `{column}` is invalid: {message}")]
    InvalidCell {
        path: String,
        line: u64,
        column: String,
        message: String,
    },

    #[error("{path} line {line}: column `{column}` must be a non-negative integer, got {value}")]
    InvalidCount {
        path: String,
        line: u64,
        column: &'static str,
        value: f64,
    },

    #[error("{path} line {line}: column `{column}` is empty")]
    EmptyName {
        path: String,
        line: u64,
        column: &'static str,
    },
}

// ---------------------------------------------------------------------------
// Raw CSV serde structs (private)
// ---------------------------------------------------------------------------

pub const HISTORICAL_COLUMNS: [&str; 15] = [
    "player",
    "against_team",
    "match_id",
    "ball_faced",
    "run_scored",
    "ball_delivered",
    "run_given",
    "wicket",
    "4s",
    "6s",
    "50s",
    "100s",
    "catch",
    "stump",
    "run_out",
];

pub const BALL_BY_BALL_COLUMNS: [&str; 4] = ["batsman", "bowler", "batsman_runs", "is_wicket"];

/// Counting columns are read as f64 so that "12.0" and "12" are both
/// accepted; anything non-integral is rejected afterwards.
#[derive(Debug, Deserialize)]
struct RawHistoricalRow {
    player: String,
    against_team: String,
    match_id: String,
    ball_faced: f64,
    run_scored: f64,
    ball_delivered: f64,
    run_given: f64,
    wicket: f64,
    #[serde(rename = "4s")]
    fours: f64,
    #[serde(rename = "6s")]
    sixes: f64,
    #[serde(rename = "50s")]
    fifties: f64,
    #[serde(rename = "100s")]
    hundreds: f64,
    catch: f64,
    stump: f64,
    run_out: f64,
}

#[derive(Debug, Deserialize)]
struct RawDelivery {
    batsman: String,
    bowler: String,
    batsman_runs: f64,
    is_wicket: f64,
}

// ---------------------------------------------------------------------------
// Row validation helpers
// ---------------------------------------------------------------------------

struct RowContext<'a> {
    source: &'a str,
    line: u64,
}

impl RowContext<'_> {
    fn count(&self, column: &'static str, value: f64) -> Result<u32, DataError> {
        if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= u32::MAX as f64 {
            Ok(value as u32)
        } else {
            Err(DataError::InvalidCount {
                path: self.source.to_string(),
                line: self.line,
                column,
                value,
            })
        }
    }

    fn name(&self, column: &'static str, value: &str) -> Result<String, DataError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(DataError::EmptyName {
                path: self.source.to_string(),
                line: self.line,
                column,
            });
        }
        Ok(trimmed.to_string())
    }
}

fn check_headers(
    headers: &csv::StringRecord,
    required: &[&'static str],
    source: &str,
) -> Result<(), DataError> {
    let present: HashSet<&str> = headers.iter().map(str::trim).collect();
    for &column in required {
        if !present.contains(column) {
            return Err(DataError::MissingColumn {
                path: source.to_string(),
                column,
            });
        }
    }
    Ok(())
}

fn csv_error(source: &str, e: csv::Error) -> DataError {
    DataError::Csv {
        path: source.to_string(),
        source: e,
    }
}

/// Name the offending column when csv can point at a field.
fn row_error(source: &str, line: u64, headers: &csv::StringRecord, e: csv::Error) -> DataError {
    if let csv::ErrorKind::Deserialize { err, .. } = e.kind() {
        let column = err
            .field()
            .and_then(|idx| usize::try_from(idx).ok())
            .and_then(|idx| headers.get(idx));
        if let Some(column) = column {
            return DataError::InvalidCell {
                path: source.to_string(),
                line,
                column: column.to_string(),
                message: err.kind().to_string(),
            };
        }
    }
    DataError::Malformed {
        path: source.to_string(),
        line,
        message: e.to_string(),
    }
}

/// Read every data row of `rdr`, deserializing each into `T` and handing it
/// to `convert` together with its line number.
fn read_rows<R, T, F, O>(
    rdr: R,
    source: &str,
    required: &[&'static str],
    mut convert: F,
) -> Result<Vec<O>, DataError>
where
    R: Read,
    T: serde::de::DeserializeOwned,
    F: FnMut(T, &RowContext<'_>) -> Result<O, DataError>,
{
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(rdr);
    let headers = reader.headers().map_err(|e| csv_error(source, e))?.clone();
    check_headers(&headers, required, source)?;

    let mut out = Vec::new();
    let mut record = csv::StringRecord::new();
    while reader
        .read_record(&mut record)
        .map_err(|e| csv_error(source, e))?
    {
        let ctx = RowContext {
            source,
            line: record.position().map_or(0, |p| p.line()),
        };
        let raw: T = record
            .deserialize(Some(&headers))
            .map_err(|e| row_error(source, ctx.line, &headers, e))?;
        out.push(convert(raw, &ctx)?);
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Reader-based loaders
// ---------------------------------------------------------------------------

/// Parse historical aggregate rows. `source` names the input in errors.
pub fn load_historical_from_reader<R: Read>(
    rdr: R,
    source: &str,
) -> Result<Vec<HistoricalRecord>, DataError> {
    let records = read_rows(rdr, source, &HISTORICAL_COLUMNS, |raw: RawHistoricalRow, ctx| {
        Ok(HistoricalRecord {
            player: ctx.name("player", &raw.player)?,
            against_team: ctx.name("against_team", &raw.against_team)?,
            match_id: ctx.name("match_id", &raw.match_id)?,
            balls_faced: ctx.count("ball_faced", raw.ball_faced)?,
            runs_scored: ctx.count("run_scored", raw.run_scored)?,
            balls_delivered: ctx.count("ball_delivered", raw.ball_delivered)?,
            runs_conceded: ctx.count("run_given", raw.run_given)?,
            wickets: ctx.count("wicket", raw.wicket)?,
            fours: ctx.count("4s", raw.fours)?,
            sixes: ctx.count("6s", raw.sixes)?,
            fifties: ctx.count("50s", raw.fifties)?,
            hundreds: ctx.count("100s", raw.hundreds)?,
            catches: ctx.count("catch", raw.catch)?,
            stumpings: ctx.count("stump", raw.stump)?,
            run_outs: ctx.count("run_out", raw.run_out)?,
        })
    })?;

    let duplicates = count_duplicate_appearances(&records);
    if duplicates > 0 {
        warn!(
            "{}: {} rows repeat an existing (player, match) pair",
            source, duplicates
        );
    }
    Ok(records)
}

/// Parse ball-by-ball deliveries. `is_wicket` must be 0 or 1.
pub fn load_ball_by_ball_from_reader<R: Read>(
    rdr: R,
    source: &str,
) -> Result<Vec<BallByBallRecord>, DataError> {
    read_rows(rdr, source, &BALL_BY_BALL_COLUMNS, |raw: RawDelivery, ctx| {
        let wicket_flag = ctx.count("is_wicket", raw.is_wicket)?;
        if wicket_flag > 1 {
            return Err(DataError::InvalidCount {
                path: source.to_string(),
                line: ctx.line,
                column: "is_wicket",
                value: raw.is_wicket,
            });
        }
        Ok(BallByBallRecord {
            batsman: ctx.name("batsman", &raw.batsman)?,
            bowler: ctx.name("bowler", &raw.bowler)?,
            batsman_runs: ctx.count("batsman_runs", raw.batsman_runs)?,
            is_wicket: wicket_flag == 1,
        })
    })
}

fn count_duplicate_appearances(records: &[HistoricalRecord]) -> usize {
    let mut seen = HashSet::with_capacity(records.len());
    records
        .iter()
        .filter(|r| !seen.insert((r.player.as_str(), r.match_id.as_str())))
        .count()
}

// ---------------------------------------------------------------------------
// Public path-based loaders
// ---------------------------------------------------------------------------

/// Load the historical aggregate CSV.
pub fn load_historical(path: &Path) -> Result<Vec<HistoricalRecord>, DataError> {
    let file = std::fs::File::open(path).map_err(|e| DataError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let records = load_historical_from_reader(file, &path.display().to_string())?;
    info!("Loaded {} historical rows from {}", records.len(), path.display());
    Ok(records)
}

/// Load the ball-by-ball CSV.
pub fn load_ball_by_ball(path: &Path) -> Result<Vec<BallByBallRecord>, DataError> {
    let file = std::fs::File::open(path).map_err(|e| DataError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let balls = load_ball_by_ball_from_reader(file, &path.display().to_string())?;
    info!("Loaded {} deliveries from {}", balls.len(), path.display());
    Ok(balls)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "player,against_team,match_id,ball_faced,run_scored,ball_delivered,run_given,wicket,4s,6s,50s,100s,catch,stump,run_out";

    fn parse(body: &str) -> Result<Vec<HistoricalRecord>, DataError> {
        load_historical_from_reader(format!("{HEADER}\n{body}").as_bytes(), "test.csv")
    }

    // -- Happy path --

    #[test]
    fn historical_rows_parse() {
        let rows = parse(
            "SV Samson,Sunrisers Hyderabad,1001,30,48,0,0,0,4,3,0,0,1,0,0\n\
             TA Boult,Sunrisers Hyderabad,1001,2,1,24,31,2,0,0,0,0,0,0,1",
        )
        .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].player, "SV Samson");
        assert_eq!(rows[0].runs_scored, 48);
        assert_eq!(rows[0].fours, 4);
        assert_eq!(rows[0].sixes, 3);
        assert_eq!(rows[0].catches, 1);
        assert_eq!(rows[1].balls_delivered, 24);
        assert_eq!(rows[1].runs_conceded, 31);
        assert_eq!(rows[1].wickets, 2);
        assert_eq!(rows[1].run_outs, 1);
    }

    #[test]
    fn integral_floats_accepted() {
        let rows = parse("A,B,7,12.0,20.0,0,0,0,1,0,0,0,0,0,0").unwrap();
        assert_eq!(rows[0].balls_faced, 12);
        assert_eq!(rows[0].runs_scored, 20);
    }

    #[test]
    fn names_trimmed_and_extra_columns_ignored() {
        let text = format!("{HEADER},season\n  R Parag  , Gujarat Titans ,9,1,1,0,0,0,0,0,0,0,0,0,0,2024");
        let rows = load_historical_from_reader(text.as_bytes(), "t").unwrap();
        assert_eq!(rows[0].player, "R Parag");
        assert_eq!(rows[0].against_team, "Gujarat Titans");
    }

    // -- Fail-fast policy --

    #[test]
    fn non_numeric_cell_names_line_and_column() {
        let err = parse(
            "A,B,1,10,10,0,0,0,0,0,0,0,0,0,0\n\
             C,D,2,ten,10,0,0,0,0,0,0,0,0,0,0",
        )
        .unwrap_err();
        match &err {
            DataError::InvalidCell {
                path, line, column, ..
            } => {
                assert_eq!(path, "test.csv");
                assert_eq!(*line, 3);
                assert_eq!(column, "ball_faced");
            }
            other => panic!("expected InvalidCell, got: {other}"),
        }
        assert!(err.to_string().contains("column `ball_faced`"), "{err}");
    }

    #[test]
    fn fractional_count_rejected() {
        let err = parse("A,B,1,10,10.5,0,0,0,0,0,0,0,0,0,0").unwrap_err();
        match err {
            DataError::InvalidCount { column, line, .. } => {
                assert_eq!(column, "run_scored");
                assert_eq!(line, 2);
            }
            other => panic!("expected InvalidCount, got: {other}"),
        }
    }

    #[test]
    fn negative_count_rejected() {
        let err = parse("A,B,1,10,10,0,0,-1,0,0,0,0,0,0,0").unwrap_err();
        assert!(matches!(
            err,
            DataError::InvalidCount { column: "wicket", .. }
        ));
    }

    #[test]
    fn missing_column_rejected_before_rows() {
        let text = "player,against_team,match_id\nA,B,1";
        let err = load_historical_from_reader(text.as_bytes(), "short.csv").unwrap_err();
        assert!(matches!(
            err,
            DataError::MissingColumn { column: "ball_faced", .. }
        ));
    }

    #[test]
    fn empty_player_name_rejected() {
        let err = parse("  ,B,1,10,10,0,0,0,0,0,0,0,0,0,0").unwrap_err();
        assert!(matches!(err, DataError::EmptyName { column: "player", .. }));
    }

    #[test]
    fn header_only_is_empty() {
        assert!(parse("").unwrap().is_empty());
    }

    #[test]
    fn duplicate_player_match_pairs_counted() {
        let rows = parse(
            "A,B,1,10,10,0,0,0,0,0,0,0,0,0,0\n\
             A,B,1,3,3,0,0,0,0,0,0,0,0,0,0\n\
             A,B,2,3,3,0,0,0,0,0,0,0,0,0,0",
        )
        .unwrap();
        assert_eq!(count_duplicate_appearances(&rows), 1);
    }

    // -- Ball by ball --

    #[test]
    fn deliveries_parse() {
        let text = "id,batsman,bowler,batsman_runs,is_wicket\n\
                    1,MS Dhoni,Rashid Khan,6,0\n\
                    1,MS Dhoni,Rashid Khan,0,1";
        let balls = load_ball_by_ball_from_reader(text.as_bytes(), "bbb.csv").unwrap();
        assert_eq!(balls.len(), 2);
        assert_eq!(balls[0].batsman_runs, 6);
        assert!(!balls[0].is_wicket);
        assert!(balls[1].is_wicket);
    }

    #[test]
    fn wicket_flag_must_be_binary() {
        let text = "batsman,bowler,batsman_runs,is_wicket\nA,B,1,2";
        let err = load_ball_by_ball_from_reader(text.as_bytes(), "bbb.csv").unwrap_err();
        assert!(matches!(
            err,
            DataError::InvalidCount { column: "is_wicket", .. }
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_historical(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, DataError::Io { .. }));
    }
}
