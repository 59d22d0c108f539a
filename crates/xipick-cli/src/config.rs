// Configuration loading and parsing (pipeline.toml, points.toml, fixture.toml).

use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;
use xipick_core::forest::ForestParams;
use xipick_core::kmeans::KMeansParams;
use xipick_cricket::head_to_head::{HeadToHeadBlend, WicketSource};
use xipick_cricket::pipeline::{PipelineSettings, WicketModel};
use xipick_cricket::report::ReportFormat;
use xipick_cricket::roster::Roster;
use xipick_cricket::scoring::PointsTable;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub data: DataPaths,
    pub clustering: ClusteringConfig,
    pub models: ModelsConfig,
    pub head_to_head: HeadToHeadConfig,
    pub report: ReportConfig,
    pub points: PointsTable,
    pub teams: Vec<Roster>,
}

impl Config {
    /// Fit-time settings for the prediction pipeline.
    pub fn pipeline_settings(&self) -> PipelineSettings {
        let c = &self.clustering;
        let m = &self.models;
        PipelineSettings {
            clustering: KMeansParams {
                k: c.k,
                seed: c.seed,
                n_init: c.n_init,
                max_iter: c.max_iter,
                tolerance: c.tolerance,
            },
            forest: ForestParams {
                n_trees: m.n_trees,
                seed: m.seed,
                max_depth: m.max_depth,
                min_samples_leaf: m.min_samples_leaf,
            },
            min_archetype_rows: m.min_archetype_rows,
            wicket_model: m.wicket_model,
        }
    }

    pub fn blend(&self) -> HeadToHeadBlend {
        HeadToHeadBlend {
            team_weight: self.head_to_head.team_weight,
            player_weight: self.head_to_head.player_weight,
            wicket_source: self.head_to_head.wicket_source,
            include_fielding: self.head_to_head.include_fielding,
        }
    }
}

// ---------------------------------------------------------------------------
// pipeline.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire pipeline.toml file.
#[derive(Debug, Clone, Deserialize)]
struct PipelineFile {
    data: DataPaths,
    #[serde(default)]
    clustering: ClusteringConfig,
    #[serde(default)]
    models: ModelsConfig,
    #[serde(default)]
    head_to_head: HeadToHeadConfig,
    #[serde(default)]
    report: ReportConfig,
}

/// Input CSV paths, relative to the working directory.
#[derive(Debug, Clone, Deserialize)]
pub struct DataPaths {
    pub historical: String,
    /// Enables the head-to-head pick when present.
    #[serde(default)]
    pub ball_by_ball: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    pub k: usize,
    pub seed: u64,
    pub n_init: usize,
    pub max_iter: usize,
    pub tolerance: f64,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        let p = KMeansParams::default();
        Self {
            k: p.k,
            seed: p.seed,
            n_init: p.n_init,
            max_iter: p.max_iter,
            tolerance: p.tolerance,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub n_trees: usize,
    pub seed: u64,
    pub max_depth: Option<usize>,
    pub min_samples_leaf: usize,
    pub min_archetype_rows: usize,
    pub wicket_model: WicketModel,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        let f = ForestParams::default();
        let s = PipelineSettings::default();
        Self {
            n_trees: f.n_trees,
            seed: f.seed,
            max_depth: f.max_depth,
            min_samples_leaf: f.min_samples_leaf,
            min_archetype_rows: s.min_archetype_rows,
            wicket_model: s.wicket_model,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HeadToHeadConfig {
    pub team_weight: f64,
    pub player_weight: f64,
    pub wicket_source: WicketSource,
    pub include_fielding: bool,
    pub top_n: usize,
}

impl Default for HeadToHeadConfig {
    fn default() -> Self {
        let b = HeadToHeadBlend::default();
        Self {
            team_weight: b.team_weight,
            player_weight: b.player_weight,
            wicket_source: b.wicket_source,
            include_fielding: b.include_fielding,
            top_n: 11,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub format: ReportFormat,
}

// ---------------------------------------------------------------------------
// fixture.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
struct FixtureFile {
    teams: Vec<Roster>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/pipeline.toml`,
/// `config/points.toml` and `config/fixture.toml`, all relative to the given
/// `base_dir`.
///
/// This is the lower-level loading primitive that does not auto-copy defaults.
/// Prefer `load_config()` which handles default initialization automatically.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    let pipeline: PipelineFile = parse_file(&config_dir.join(PIPELINE_FILE))?;
    let points: PointsTable = parse_file(&config_dir.join(POINTS_FILE))?;
    let fixture: FixtureFile = parse_file(&config_dir.join(FIXTURE_FILE))?;

    let config = Config {
        data: pipeline.data,
        clustering: pipeline.clustering,
        models: pipeline.models,
        head_to_head: pipeline.head_to_head,
        report: pipeline.report,
        points,
        teams: fixture.teams,
    };

    validate(&config)?;

    Ok(config)
}

/// Files that make up a configuration, in load order.
pub const CONFIG_FILES: [&str; 3] = [PIPELINE_FILE, POINTS_FILE, FIXTURE_FILE];

const PIPELINE_FILE: &str = "pipeline.toml";
const POINTS_FILE: &str = "points.toml";
const FIXTURE_FILE: &str = "fixture.toml";

/// Seed `config/` from `defaults/`: each of `CONFIG_FILES` missing from
/// `config/` is copied over, and edited files are never replaced. Returns the
/// files that were written.
///
/// A file absent from both directories is an error, so a broken checkout
/// fails here instead of as a bare "not found" during loading.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.is_dir() && !config_dir.is_dir() {
        return Err(ConfigError::DefaultsCopyError {
            message: format!(
                "neither defaults/ nor config/ found in {}; run xipick from the project root",
                base_dir.display()
            ),
        });
    }

    let mut copied = Vec::new();
    for name in CONFIG_FILES {
        let target = config_dir.join(name);
        if target.is_file() {
            continue;
        }
        let source = defaults_dir.join(name);
        if !source.is_file() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "{name} is missing from config/ and there is no default at {}",
                    source.display()
                ),
            });
        }
        if copy_if_absent(&source, &target)? {
            info!("Copied default {} to {}", name, target.display());
            copied.push(target);
        }
    }

    Ok(copied)
}

/// Copy `source` to `target` unless `target` appears in the meantime.
fn copy_if_absent(source: &Path, target: &Path) -> Result<bool, ConfigError> {
    let copy_error = |action: &str, path: &Path, e: std::io::Error| ConfigError::DefaultsCopyError {
        message: format!("failed to {action} {}: {e}", path.display()),
    };

    if let Some(dir) = target.parent() {
        fs::create_dir_all(dir).map_err(|e| copy_error("create", dir, e))?;
    }
    let mut dest = match fs::OpenOptions::new().write(true).create_new(true).open(target) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(copy_error("create", target, e)),
    };
    let mut src = fs::File::open(source).map_err(|e| copy_error("open", source, e))?;
    io::copy(&mut src, &mut dest).map_err(|e| copy_error("write", target, e))?;
    Ok(true)
}

/// Loads config relative to the current working directory, copying defaults
/// first.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let text = fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })?;
    toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}

fn invalid(field: impl Into<String>, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.data.historical.trim().is_empty() {
        return Err(invalid("data.historical", "must not be empty"));
    }

    let counts: &[(&str, usize)] = &[
        ("clustering.k", config.clustering.k),
        ("clustering.n_init", config.clustering.n_init),
        ("clustering.max_iter", config.clustering.max_iter),
        ("models.n_trees", config.models.n_trees),
        ("models.min_samples_leaf", config.models.min_samples_leaf),
        ("models.min_archetype_rows", config.models.min_archetype_rows),
        ("head_to_head.top_n", config.head_to_head.top_n),
    ];
    for (name, val) in counts {
        if *val == 0 {
            return Err(invalid(*name, "must be > 0"));
        }
    }
    if let Some(depth) = config.models.max_depth {
        if depth == 0 || depth > usize::from(u16::MAX) {
            return Err(invalid(
                "models.max_depth",
                format!("must be between 1 and {} when set, got {depth}", u16::MAX),
            ));
        }
    }

    let tol = config.clustering.tolerance;
    if !tol.is_finite() || tol < 0.0 {
        return Err(invalid(
            "clustering.tolerance",
            format!("must be a finite value >= 0, got {tol}"),
        ));
    }

    let weights: &[(&str, f64)] = &[
        ("head_to_head.team_weight", config.head_to_head.team_weight),
        ("head_to_head.player_weight", config.head_to_head.player_weight),
    ];
    for (name, val) in weights {
        if !val.is_finite() || *val < 0.0 {
            return Err(invalid(*name, format!("must be a finite value >= 0, got {val}")));
        }
    }

    config
        .points
        .validate()
        .map_err(|e| invalid("points", e.to_string()))?;

    if config.teams.len() != 2 {
        return Err(invalid(
            "teams",
            format!("exactly two teams are required, got {}", config.teams.len()),
        ));
    }
    for (i, team) in config.teams.iter().enumerate() {
        if team.name.trim().is_empty() {
            return Err(invalid(format!("teams[{i}].name"), "must not be empty"));
        }
        if team.opponent.trim().is_empty() {
            return Err(invalid(format!("teams[{i}].opponent"), "must not be empty"));
        }
        if team.is_empty() {
            return Err(invalid(format!("teams[{i}].players"), "must list at least one player"));
        }
        let repeated = team.duplicates();
        if !repeated.is_empty() {
            return Err(invalid(
                format!("teams[{i}].players"),
                format!("players listed more than once: {}", repeated.join(", ")),
            ));
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
