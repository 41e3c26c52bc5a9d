//! greengrid-sim entry point: CLI wiring, headless run, and optional surfaces.

use std::process;

use anyhow::Context;
use clap::Parser;

use greengrid_sim::cli::Cli;
use greengrid_sim::io::export::{export_csv, export_log_csv};
use greengrid_sim::live::LiveFeed;
use greengrid_sim::logging::{self, LogTarget};
use greengrid_sim::narration::{build_narrator, summary_or_fallback};
use greengrid_sim::runner::run_headless;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    #[cfg(feature = "tui")]
    let log_target = if cli.tui {
        cli.log_file
            .clone()
            .map_or(LogTarget::Discard, LogTarget::File)
    } else {
        LogTarget::Stderr
    };
    #[cfg(not(feature = "tui"))]
    let log_target = LogTarget::Stderr;
    logging::init(&log_target).context("failed to open log file")?;

    let scenario = match cli.load_scenario() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };

    let errors = scenario.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    let narrator = build_narrator(
        scenario.narration.narrator,
        &scenario.narration.model,
        cli.gemini_key.clone(),
    );

    let mut feed = LiveFeed::new(
        scenario.live.source,
        scenario.live.zone.clone(),
        scenario.live.eia_respondent.clone(),
        cli.api_keys(),
    );

    #[cfg(feature = "tui")]
    if cli.tui {
        greengrid_sim::tui::run(scenario, narrator.into(), Some(feed))
            .context("dashboard failed")?;
        return Ok(());
    }

    let result = run_headless(&scenario, narrator.as_ref(), &mut feed);

    for s in &result.samples {
        println!("{s}");
    }
    if !result.logs.is_empty() {
        println!("\n--- Agent Log ---");
        for l in &result.logs {
            println!("{l}");
        }
    }
    println!("\n{}", result.kpi);

    if cli.esg_report {
        if let Some(last) = result.samples.last() {
            println!("\n--- ESG Compliance Report ---");
            println!("{}", summary_or_fallback(narrator.as_ref(), last));
        }
    }

    if let Some(path) = &cli.telemetry_out {
        export_csv(&result.samples, path)
            .with_context(|| format!("failed to write CSV to {}", path.display()))?;
        eprintln!("Telemetry written to {}", path.display());
    }

    if let Some(path) = &cli.log_out {
        export_log_csv(&result.logs, path)
            .with_context(|| format!("failed to write agent log to {}", path.display()))?;
        eprintln!("Agent log written to {}", path.display());
    }

    #[cfg(feature = "api")]
    if cli.serve {
        use std::net::SocketAddr;
        use std::sync::Arc;

        let state = Arc::new(greengrid_sim::api::AppState::from_run(scenario, result));
        let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
        let rt = tokio::runtime::Runtime::new().context("failed to create tokio runtime")?;
        rt.block_on(greengrid_sim::api::serve(state, addr))
            .with_context(|| format!("API server on {addr} failed"))?;
    }

    Ok(())
}
