// xipick entry point.
//
// Startup sequence:
// 1. Initialize tracing (stderr, so stdout carries only the report)
// 2. Load config
// 3. Load history, fit the pipeline, predict and score both rosters
// 4. Print the report

use anyhow::Context;
use tracing::info;
use xipick_cli::config;
use xipick_cli::run;
use xipick_cricket::report::render;

fn main() -> anyhow::Result<()> {
    init_tracing()?;
    info!("xipick starting up");

    let config = config::load_config().context("failed to load configuration")?;
    let fixture: Vec<&str> = config.teams.iter().map(|t| t.name.as_str()).collect();
    info!(
        "Config loaded: {}, k={}, {} trees, wicket model {:?}",
        fixture.join(" vs "),
        config.clustering.k,
        config.models.n_trees,
        config.models.wicket_model
    );

    let cwd = std::env::current_dir().context("failed to read working directory")?;
    let report = run::build_match_report(&config, &cwd)?;

    let output = render(&report, config.report.format).context("failed to render report")?;
    print!("{output}");

    info!("Done");
    Ok(())
}

fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("xipick=info,warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
