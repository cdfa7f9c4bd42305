//! Run execution and caching service.

use std::path::Path;
use std::time::Instant;

use epke_core::timing::{PerfStats, Timer};
use epke_parareal::{ChildStatus, SolverTree};
use epke_project::schema::Project;
use epke_results::{RunManifest, RunStats, RunStore, TimeseriesRecord, build_records};
use tracing::info;

use crate::compile::{self, CompiledProject};
use crate::error::AppResult;
use crate::progress::{RunProgressEvent, RunStage};
use crate::project_service;

/// Options for running a project.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub use_cache: bool,
    pub solver_version: String,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            solver_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Request to execute a run.
pub struct RunRequest<'a> {
    pub project_path: &'a Path,
    pub options: RunOptions,
}

/// Response from a run execution.
#[derive(Debug, Clone)]
pub struct RunResponse {
    pub run_id: String,
    pub manifest: RunManifest,
    pub loaded_from_cache: bool,
    pub perf: PerfStats,
}

fn emit_progress(
    progress_cb: &mut Option<&mut dyn FnMut(RunProgressEvent)>,
    stage: RunStage,
    started: Instant,
    message: &str,
) {
    if let Some(cb) = progress_cb.as_deref_mut() {
        cb(RunProgressEvent::stage(
            stage,
            started.elapsed().as_secs_f64(),
            Some(message.to_string()),
        ));
    }
}

/// Execute or load a run based on request.
pub fn ensure_run(request: &RunRequest) -> AppResult<RunResponse> {
    ensure_run_with_progress(request, None)
}

/// Execute or load a run and stream progress events.
pub fn ensure_run_with_progress(
    request: &RunRequest,
    mut progress_cb: Option<&mut dyn FnMut(RunProgressEvent)>,
) -> AppResult<RunResponse> {
    let started = Instant::now();
    let mut perf = PerfStats::default();

    emit_progress(&mut progress_cb, RunStage::LoadingProject, started, "Loading project");
    let load = Timer::start("load");
    let project = project_service::load_project(request.project_path)?;
    perf.load_time_s = load.elapsed_s();

    emit_progress(&mut progress_cb, RunStage::CheckingCache, started, "Checking run cache");
    let run_id = epke_results::compute_run_id(&project, &request.options.solver_version);
    let store = RunStore::for_project(request.project_path)?;

    if request.options.use_cache && store.has_run(&run_id) {
        emit_progress(
            &mut progress_cb,
            RunStage::LoadingCachedResult,
            started,
            "Loading cached run",
        );
        let manifest = store.load_manifest(&run_id)?;
        info!(run_id = %run_id, "loaded cached run");
        emit_progress(&mut progress_cb, RunStage::Completed, started, "Loaded cached run");
        return Ok(RunResponse {
            run_id,
            manifest,
            loaded_from_cache: true,
            perf,
        });
    }

    let manifest = execute_run(
        &project,
        &store,
        &run_id,
        &request.options.solver_version,
        &mut progress_cb,
        started,
        &mut perf,
    )?;

    emit_progress(&mut progress_cb, RunStage::Completed, started, "Run completed");
    Ok(RunResponse {
        run_id,
        manifest,
        loaded_from_cache: false,
        perf,
    })
}

fn execute_run(
    project: &Project,
    store: &RunStore,
    run_id: &str,
    solver_version: &str,
    progress_cb: &mut Option<&mut dyn FnMut(RunProgressEvent)>,
    started: Instant,
    perf: &mut PerfStats,
) -> AppResult<RunManifest> {
    emit_progress(progress_cb, RunStage::Compiling, started, "Compiling project");
    let compiled = compile::compile_project(project)?;
    let params = compiled.params.clone();

    emit_progress(progress_cb, RunStage::CoarseSolve, started, "Solving coarse grid");
    let coarse = Timer::start("coarse solve");
    let mut tree = SolverTree::new(compiled.solver()?);
    tree.advance()?;
    perf.coarse_solve_time_s = coarse.elapsed_s();
    perf.steps = tree.solver().stats().accepted_steps();

    if !compiled.refinements.is_empty() {
        emit_progress(progress_cb, RunStage::FineSolves, started, "Solving fine children");
        let fine = Timer::start("fine solves");
        spawn_children(&mut tree, &compiled)?;
        tree.solve_children(compiled.policy)?;
        perf.fine_solve_time_s = fine.elapsed_s();
        perf.fine_solvers = tree.num_descendants();
    }

    emit_progress(progress_cb, RunStage::SavingResults, started, "Saving results");
    let save = Timer::start("save");
    let output = tree.assemble_global_output()?;
    let history = &output.history;
    let columns: Vec<&[f64]> = (0..history.num_precursors())
        .map(|k| history.concentrations(k))
        .collect();
    let records = build_records(
        params.times(),
        &history.normalized_power(&params),
        history.rhos(),
        &columns,
    )?;

    let stats = tree.solver().stats();
    let manifest = RunManifest {
        run_id: run_id.to_string(),
        project_name: project.name.clone(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        solver_version: solver_version.to_string(),
        points: params.num_time_steps(),
        precursor_groups: params.num_precursors(),
        stats: RunStats {
            quadratic_steps: stats.quadratic_steps,
            linear_steps: stats.linear_steps,
            rejected_transformations: stats.rejected_transformations,
            alpha_fallbacks: stats.alpha_fallbacks,
        },
        fine_solvers: tree.num_descendants(),
        failed_fine_solvers: count_failed(&tree),
        corrected: output.corrected,
    };
    store.save_run(&manifest, &records)?;
    perf.save_time_s = save.elapsed_s();

    info!(
        run_id = %run_id,
        points = manifest.points,
        fine_solvers = manifest.fine_solvers,
        "run saved"
    );
    Ok(manifest)
}

fn spawn_children(tree: &mut SolverTree, compiled: &CompiledProject) -> AppResult<()> {
    for &(coarse_index, substeps) in &compiled.refinements {
        tree.refine(coarse_index, substeps)?;
    }
    Ok(())
}

fn count_failed(tree: &SolverTree) -> usize {
    tree.children()
        .iter()
        .map(|child| {
            let own = usize::from(matches!(child.status(), ChildStatus::Failed(_)));
            own + count_failed(child)
        })
        .sum()
}

/// Runs stored for a project, most recent first.
pub fn list_runs(project_path: &Path) -> AppResult<Vec<RunManifest>> {
    let project = project_service::load_project(project_path)?;
    let store = RunStore::for_project(project_path)?;

    let mut runs = store.list_runs(&project.name)?;
    runs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    Ok(runs)
}

pub fn load_run(
    project_path: &Path,
    run_id: &str,
) -> AppResult<(RunManifest, Vec<TimeseriesRecord>)> {
    let store = RunStore::for_project(project_path)?;

    let manifest = store.load_manifest(run_id)?;
    let records = store.load_timeseries(run_id)?;

    Ok((manifest, records))
}
