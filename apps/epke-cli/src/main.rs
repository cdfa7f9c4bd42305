use clap::{Parser, Subcommand};
use epke_app::{
    AppResult, RunOptions, RunProgressEvent, RunRequest, Series, project_service, query,
    run_service,
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "epke-cli")]
#[command(about = "EPKE CLI - exponential point-kinetics transient solver", long_about = None)]
struct Cli {
    /// Print a wall-clock timing summary after runs
    #[arg(long, global = true)]
    timing: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate project file syntax and values
    Validate {
        /// Path to the project YAML or JSON file
        project_path: PathBuf,
    },
    /// Solve a project and store the result
    Run {
        /// Path to the project YAML or JSON file
        project_path: PathBuf,
        /// Skip cache and force re-run
        #[arg(long)]
        no_cache: bool,
    },
    /// List cached runs for a project
    Runs {
        /// Path to the project YAML or JSON file
        project_path: PathBuf,
    },
    /// Show details of a cached run
    ShowRun {
        /// Path to the project YAML or JSON file
        project_path: PathBuf,
        /// Run ID to display
        run_id: String,
    },
    /// Export one time series from a run as CSV
    ExportSeries {
        /// Path to the project YAML or JSON file
        project_path: PathBuf,
        /// Run ID
        run_id: String,
        /// Series name: power, rho, or concentration:<group>
        series: String,
        /// Output CSV file path (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> AppResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    if cli.timing {
        epke_core::timing::enable_timing();
    }

    match cli.command {
        Commands::Validate { project_path } => cmd_validate(&project_path),
        Commands::Run {
            project_path,
            no_cache,
        } => cmd_run(&project_path, !no_cache),
        Commands::Runs { project_path } => cmd_runs(&project_path),
        Commands::ShowRun {
            project_path,
            run_id,
        } => cmd_show_run(&project_path, &run_id),
        Commands::ExportSeries {
            project_path,
            run_id,
            series,
            output,
        } => cmd_export_series(&project_path, &run_id, &series, output.as_deref()),
    }
}

fn cmd_validate(project_path: &Path) -> AppResult<()> {
    println!("Validating project: {}", project_path.display());
    let project = project_service::load_project(project_path)?;
    project_service::validate_project(&project)?;
    println!("✓ Project '{}' is valid", project.name);
    Ok(())
}

fn cmd_run(project_path: &Path, use_cache: bool) -> AppResult<()> {
    println!("Running project: {}", project_path.display());

    let request = RunRequest {
        project_path,
        options: RunOptions {
            use_cache,
            ..RunOptions::default()
        },
    };

    let response =
        run_service::ensure_run_with_progress(&request, Some(&mut render_cli_progress))?;
    clear_progress_line();

    if response.loaded_from_cache {
        println!("✓ Loaded from cache: {}", response.run_id);
    } else {
        println!("✓ Solve completed: {}", response.run_id);
    }

    let stats = &response.manifest.stats;
    println!("  Time points: {}", response.manifest.points);
    println!(
        "  Steps: {} quadratic, {} linear, {} transforms rejected",
        stats.quadratic_steps, stats.linear_steps, stats.rejected_transformations
    );
    if response.manifest.fine_solvers > 0 {
        println!(
            "  Fine solvers: {} ({} failed)",
            response.manifest.fine_solvers, response.manifest.failed_fine_solvers
        );
    }

    let (_manifest, records) = run_service::load_run(project_path, &response.run_id)?;
    let summary = query::get_run_summary(&records)?;
    println!(
        "  Peak power: {:.6e} at t = {} s",
        summary.peak_power, summary.peak_time_s
    );
    println!("  Final power: {:.6e}", summary.final_power);

    if let Some(text) = response.perf.summary() {
        println!("\n{text}");
    }
    Ok(())
}

fn render_cli_progress(event: RunProgressEvent) {
    let mut line = format!(
        "\r{:<22} elapsed={:.2}s",
        event.stage.label(),
        event.elapsed_wall_s
    );
    if let Some(msg) = &event.message {
        line.push_str(&format!("  {msg}"));
    }
    print!("{line}");
    let _ = io::stdout().flush();
}

fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(80));
    let _ = io::stdout().flush();
}

fn cmd_runs(project_path: &Path) -> AppResult<()> {
    let runs = run_service::list_runs(project_path)?;

    if runs.is_empty() {
        println!("No cached runs found for: {}", project_path.display());
    } else {
        println!("Cached runs for '{}':", runs[0].project_name);
        for manifest in runs {
            println!(
                "  {} ({}, solver {})",
                manifest.run_id, manifest.timestamp, manifest.solver_version
            );
        }
    }
    Ok(())
}

fn cmd_show_run(project_path: &Path, run_id: &str) -> AppResult<()> {
    println!("Loading run: {}", run_id);

    let (manifest, records) = run_service::load_run(project_path, run_id)?;
    let summary = query::get_run_summary(&records)?;

    println!("\nRun Summary:");
    println!("  Project: {}", manifest.project_name);
    println!("  Created: {}", manifest.timestamp);
    println!("  Time points: {}", summary.record_count);
    println!(
        "  Time range: {} - {} s",
        summary.time_range.0, summary.time_range.1
    );
    println!("  Precursor groups: {}", summary.precursor_groups);
    println!(
        "  Peak power: {:.12e} at t = {} s",
        summary.peak_power, summary.peak_time_s
    );
    println!("  Final power: {:.12e}", summary.final_power);
    println!("  Final reactivity: {:.12e}", summary.final_rho);
    println!(
        "  Fine solvers: {} ({} failed), corrected: {}",
        manifest.fine_solvers, manifest.failed_fine_solvers, manifest.corrected
    );

    Ok(())
}

fn cmd_export_series(
    project_path: &Path,
    run_id: &str,
    series: &str,
    output: Option<&Path>,
) -> AppResult<()> {
    let (_manifest, records) = run_service::load_run(project_path, run_id)?;
    let series: Series = series.parse()?;
    let data = query::extract_series(&records, series)?;

    let mut csv = String::from("time_s,value\n");
    for (t, val) in &data {
        csv.push_str(&format!("{},{}\n", t, val));
    }

    if let Some(path) = output {
        std::fs::write(path, csv)?;
        println!("✓ Exported {} data points to {}", data.len(), path.display());
    } else {
        print!("{}", csv);
    }

    Ok(())
}
