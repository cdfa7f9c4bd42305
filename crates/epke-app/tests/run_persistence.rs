//! End-to-end runs through the service layer on the demo projects.

use std::path::PathBuf;

use epke_app::{
    AppError, RunOptions, RunRequest, RunStage, Series, extract_series, get_run_summary,
    run_service,
};

fn demo(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.pop(); // crates
    path.pop(); // repo root
    path.push("demos");
    path.push("projects");
    path.push(name);
    path
}

/// Copy a demo project into a fresh directory so runs land in a private store.
fn staged(name: &str, dir: &str) -> PathBuf {
    let temp_dir = std::env::temp_dir().join(dir);
    let _ = std::fs::remove_dir_all(&temp_dir);
    std::fs::create_dir_all(&temp_dir).unwrap();
    let target = temp_dir.join(name);
    std::fs::copy(demo(name), &target).unwrap();
    target
}

#[test]
fn step_run_is_cached_on_second_request() {
    let project_path = staged("step_insertion.yaml", "epke_app_step_run");
    let request = RunRequest {
        project_path: &project_path,
        options: RunOptions::default(),
    };

    let mut stages = Vec::new();
    let mut on_progress = |event: epke_app::RunProgressEvent| stages.push(event.stage);
    let first = run_service::ensure_run_with_progress(&request, Some(&mut on_progress)).unwrap();
    assert!(!first.loaded_from_cache);
    assert_eq!(stages.first(), Some(&RunStage::LoadingProject));
    assert!(stages.contains(&RunStage::CoarseSolve));
    assert!(!stages.contains(&RunStage::FineSolves));
    assert_eq!(stages.last(), Some(&RunStage::Completed));

    assert_eq!(first.manifest.points, 51);
    assert_eq!(first.manifest.stats.linear_steps, 50);
    assert_eq!(first.perf.steps, 50);
    assert!(!first.manifest.corrected);

    let second = run_service::ensure_run(&request).unwrap();
    assert!(second.loaded_from_cache);
    assert_eq!(second.run_id, first.run_id);
    assert_eq!(second.manifest, first.manifest);

    let (_, records) = run_service::load_run(&project_path, &first.run_id).unwrap();
    assert_eq!(records.len(), 51);
    assert_eq!(records[1].time_s, 0.01);
    assert!((records[1].power - 1.30782052778).abs() < 1e-10);

    let summary = get_run_summary(&records).unwrap();
    assert_eq!(summary.time_range, (0.0, 0.5));
    assert_eq!(summary.precursor_groups, 1);
    assert_eq!(summary.peak_time_s, 0.5);

    let runs = run_service::list_runs(&project_path).unwrap();
    assert_eq!(runs.len(), 1);
}

#[test]
fn refined_run_records_children() {
    let project_path = staged("refined_step.yaml", "epke_app_refined_run");
    let request = RunRequest {
        project_path: &project_path,
        options: RunOptions {
            use_cache: false,
            ..RunOptions::default()
        },
    };

    let response = run_service::ensure_run(&request).unwrap();
    assert_eq!(response.manifest.fine_solvers, 2);
    assert_eq!(response.manifest.failed_fine_solvers, 0);
    assert_eq!(response.perf.fine_solvers, 2);
    assert!(!response.manifest.corrected);

    // The stored series is the coarse one
    let (_, records) = run_service::load_run(&project_path, &response.run_id).unwrap();
    assert_eq!(records.len(), 21);
    let power = extract_series(&records, Series::Power).unwrap();
    assert!(power.windows(2).all(|w| w[1].1 > w[0].1));
}

#[test]
fn rod_ejection_demo_reproduces_reference_peak() {
    let project_path = staged("rod_ejection_feedback.yaml", "epke_app_rod_run");
    let request = RunRequest {
        project_path: &project_path,
        options: RunOptions::default(),
    };

    let response = run_service::ensure_run(&request).unwrap();
    assert_eq!(response.manifest.precursor_groups, 6);
    assert_eq!(response.manifest.stats.quadratic_steps, 40);

    let (_, records) = run_service::load_run(&project_path, &response.run_id).unwrap();
    let summary = get_run_summary(&records).unwrap();
    assert_eq!(summary.peak_time_s, 0.1);
    assert!((summary.peak_power - 2.361328406648).abs() < 1e-6);
    assert!(summary.final_rho < 0.0);
}

#[test]
fn missing_project_is_a_read_error() {
    let project_path = std::env::temp_dir().join("epke_app_missing").join("nope.yaml");
    let request = RunRequest {
        project_path: &project_path,
        options: RunOptions::default(),
    };
    assert!(matches!(
        run_service::ensure_run(&request),
        Err(AppError::ProjectFileRead { .. })
    ));
}
