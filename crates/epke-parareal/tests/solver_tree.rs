//! Integration tests for coarse/fine solver trees.

use std::sync::Arc;

use epke_parareal::{ChildStatus, FailurePolicy, SolverTree, TreeError};
use epke_solver::{
    Feedback, History, ParameterTables, Parameters, SolverError, SolverOptions, StepSolver,
};

fn step_insertion(n: usize) -> Parameters {
    let time = (0..n).map(|i| i as f64 * 0.01).collect();
    let mut tables = ParameterTables::constant(time, &[(0.1, 0.0065)], 2e-5);
    tables.rho_imp = vec![0.002; n];
    Parameters::new(tables).expect("valid parameters")
}

fn solved_tree(n: usize) -> SolverTree {
    let solver = StepSolver::from_equilibrium(step_insertion(n), 1.0, SolverOptions::default())
        .expect("solver");
    let mut tree = SolverTree::new(solver);
    tree.advance().expect("coarse solve");
    tree
}

#[test]
fn child_prefix_equals_parent_solution() {
    let mut tree = solved_tree(11);
    let coarse = tree.solver().history().clone();

    for idx in 1..=10 {
        let child = tree.refine(idx, 2).expect("child");
        let fine = child.solver().history();
        assert_eq!(fine.num_time_steps(), idx);
        assert_eq!(child.solver().precomputed_len(), idx);
        assert_eq!(fine.powers(), &coarse.powers()[..idx]);
        assert_eq!(fine.rhos(), &coarse.rhos()[..idx]);
        assert_eq!(fine.concentrations(0), &coarse.concentrations(0)[..idx]);
    }
    assert_eq!(tree.children().len(), 10);
}

#[test]
fn siblings_solve_in_parallel_and_track_the_coarse_solution() {
    let mut tree = solved_tree(41);
    for idx in [5, 15, 25, 35] {
        tree.refine(idx, 4).expect("child");
    }
    tree.solve_children(FailurePolicy::FailTree)
        .expect("children solve");

    let coarse = tree.solver().history().clone();
    for child in tree.children() {
        assert_eq!(child.status(), &ChildStatus::Solved);
        let idx = child.coarse_index().expect("seeded child");
        let fine = child.solver().history();
        assert!(child.solver().is_complete());

        // Coarse point j >= idx - 1 sits at fine position idx - 1 + 4(j - idx + 1)
        assert_eq!(fine.num_time_steps(), idx + 4 * (41 - idx));
        for j in idx..41 {
            let expected = coarse.power(j);
            let got = fine.power(idx - 1 + 4 * (j - idx + 1));
            assert!(
                ((got - expected) / expected).abs() < 2e-3,
                "child {idx}, coarse point {j}: {got} vs {expected}"
            );
        }
    }
}

#[test]
fn grandchildren_solve_after_their_parent() {
    let mut tree = solved_tree(21);
    let child = tree.refine(5, 2).expect("child");
    // The child knows only its prefix until solved, so seed inside it
    let grandchild = child.refine(3, 2).expect("grandchild");
    assert_eq!(grandchild.coarse_index(), Some(3));

    tree.solve_children(FailurePolicy::FailTree).expect("solve");
    let child = &tree.children()[0];
    assert_eq!(child.status(), &ChildStatus::Solved);
    let grandchild = &child.children()[0];
    assert_eq!(grandchild.status(), &ChildStatus::Solved);
    assert!(grandchild.solver().is_complete());
    assert_eq!(tree.num_descendants(), 2);
}

/// A parent whose whole history is given, with feedback that makes any new
/// step fail. Children seeded before the end must step and therefore fail.
fn tree_with_failing_child() -> SolverTree {
    let time = vec![0.0, 1.0, 2.0, 3.0];
    let mut tables = ParameterTables::constant(time.clone(), &[(0.08, 0.0065)], 1e-3);
    tables.feedback = Feedback {
        gamma_d: 0.05,
        eta: 0.0,
        lambda_h: 0.0,
    };
    let params = Arc::new(Parameters::new(tables).expect("valid parameters"));
    let prefix = History::new(vec![1.0; 4], vec![0.0; 4], vec![vec![0.08125; 4]])
        .expect("history");
    let solver = StepSolver::new(params, prefix, SolverOptions::default()).expect("solver");

    let mut tree = SolverTree::new(solver);
    tree.create_child(&time, 4).expect("complete child");
    tree.refine(2, 2).expect("failing child");
    tree
}

#[test]
fn fail_tree_policy_propagates_child_error() {
    let mut tree = tree_with_failing_child();
    let err = tree
        .solve_children(FailurePolicy::FailTree)
        .expect_err("child must fail");
    match err {
        TreeError::ChildFailed {
            coarse_index,
            source,
        } => {
            assert_eq!(coarse_index, 2);
            assert!(matches!(source, SolverError::InvalidCoefficient { index: 2, .. }));
        }
        other => panic!("expected ChildFailed, got {other:?}"),
    }
    assert_eq!(tree.children()[0].status(), &ChildStatus::Solved);
    assert!(matches!(tree.children()[1].status(), ChildStatus::Failed(_)));
}

#[test]
fn isolate_child_policy_records_failure_only() {
    let mut tree = tree_with_failing_child();
    tree.solve_children(FailurePolicy::IsolateChild)
        .expect("failures stay on the child");

    assert_eq!(tree.children()[0].status(), &ChildStatus::Solved);
    match tree.children()[1].status() {
        ChildStatus::Failed(message) => {
            assert!(message.contains("Invalid quadratic coefficient"), "{message}");
        }
        other => panic!("expected a failed child, got {other:?}"),
    }
    // The coarse solution is still available
    let out = tree.assemble_global_output().expect("assemble");
    assert!(!out.corrected);
    assert_eq!(out.history.num_time_steps(), 4);
}
