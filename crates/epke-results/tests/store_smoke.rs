use epke_results::*;

fn manifest(run_id: &str, project_name: &str, timestamp: &str) -> RunManifest {
    RunManifest {
        run_id: run_id.to_string(),
        project_name: project_name.to_string(),
        timestamp: timestamp.to_string(),
        solver_version: "v1".to_string(),
        points: 2,
        precursor_groups: 1,
        stats: RunStats::default(),
        fine_solvers: 0,
        failed_fine_solvers: 0,
        corrected: false,
    }
}

#[test]
fn save_and_load_run() {
    let temp_dir = std::env::temp_dir().join("epke_results_test");
    let _ = std::fs::remove_dir_all(&temp_dir);

    let store = RunStore::new(temp_dir.clone()).unwrap();

    let mut manifest = manifest("test_run_123", "step", "2026-02-25T12:00:00Z");
    manifest.stats.linear_steps = 1;

    let c0 = [0.08125, 0.0813];
    let records = build_records(&[0.0, 0.001], &[1.0, 1.001], &[0.001, 0.001], &[&c0]).unwrap();

    assert!(!store.has_run("test_run_123"));
    store.save_run(&manifest, &records).unwrap();
    assert!(store.has_run("test_run_123"));

    let loaded_manifest = store.load_manifest("test_run_123").unwrap();
    assert_eq!(loaded_manifest, manifest);

    let loaded_records = store.load_timeseries("test_run_123").unwrap();
    assert_eq!(loaded_records, records);
    assert_eq!(loaded_records[1].time_s, 0.001);
    assert_eq!(loaded_records[1].concentrations, vec![0.0813]);

    store.delete_run("test_run_123").unwrap();
    assert!(matches!(
        store.load_manifest("test_run_123"),
        Err(ResultsError::RunNotFound { .. })
    ));
}

#[test]
fn list_runs_by_project() {
    let temp_dir = std::env::temp_dir().join("epke_results_test_list");
    let _ = std::fs::remove_dir_all(&temp_dir);

    let store = RunStore::new(temp_dir.clone()).unwrap();

    store
        .save_run(&manifest("run2", "step", "2026-02-25T13:00:00Z"), &[])
        .unwrap();
    store
        .save_run(&manifest("run1", "step", "2026-02-25T12:00:00Z"), &[])
        .unwrap();
    store
        .save_run(&manifest("run3", "rod", "2026-02-25T14:00:00Z"), &[])
        .unwrap();

    let step_runs = store.list_runs("step").unwrap();
    assert_eq!(step_runs.len(), 2);
    assert_eq!(step_runs[0].run_id, "run1");

    assert_eq!(store.list_runs("rod").unwrap().len(), 1);
    assert!(store.list_runs("missing").unwrap().is_empty());
}

#[test]
fn store_for_project_lives_next_to_file() {
    let temp_dir = std::env::temp_dir().join("epke_results_test_project");
    let _ = std::fs::remove_dir_all(&temp_dir);
    std::fs::create_dir_all(&temp_dir).unwrap();

    let store = RunStore::for_project(&temp_dir.join("step.yaml")).unwrap();
    assert_eq!(store.root_dir(), temp_dir.join(".epke").join("runs"));
    assert!(store.root_dir().exists());
}
