//! Solver tree: a coarse solver plus owned fine children.

use std::sync::Arc;

use epke_core::Real;
use epke_solver::{History, StepSolver};
use rayon::prelude::*;
use tracing::{info, warn};

use crate::error::{TreeError, TreeResult};

/// What a failing child does to the rest of the tree.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// The first failing child fails [`SolverTree::solve_children`].
    #[default]
    FailTree,
    /// Failures are recorded on the child; siblings still report success.
    IsolateChild,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChildStatus {
    Pending,
    Solved,
    Failed(String),
}

/// Result of [`SolverTree::assemble_global_output`].
#[derive(Clone, Debug, PartialEq)]
pub struct AssembledOutput {
    pub history: History,
    /// Whether fine-solve corrections were folded in. Always `false`: the
    /// coarse solution is returned as is.
    pub corrected: bool,
}

/// A solver node. Children are exclusively owned and hold no reference back
/// to their parent, only the coarse index that seeded them.
#[derive(Debug)]
pub struct SolverTree {
    solver: StepSolver,
    coarse_index: Option<usize>,
    status: ChildStatus,
    children: Vec<SolverTree>,
}

impl SolverTree {
    pub fn new(solver: StepSolver) -> Self {
        Self {
            solver,
            coarse_index: None,
            status: ChildStatus::Pending,
            children: Vec::new(),
        }
    }

    pub fn solver(&self) -> &StepSolver {
        &self.solver
    }

    /// Index into the parent grid that seeded this node; `None` at the root.
    pub fn coarse_index(&self) -> Option<usize> {
        self.coarse_index
    }

    pub fn status(&self) -> &ChildStatus {
        &self.status
    }

    pub fn children(&self) -> &[SolverTree] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut [SolverTree] {
        &mut self.children
    }

    /// Number of nodes below this one.
    pub fn num_descendants(&self) -> usize {
        self.children
            .iter()
            .map(|child| 1 + child.num_descendants())
            .sum()
    }

    /// Solve this node's own solver. Children are left untouched.
    pub fn advance(&mut self) -> TreeResult<&History> {
        match self.solver.advance() {
            Ok(_) => {
                self.status = ChildStatus::Solved;
                Ok(self.solver.history())
            }
            Err(err) => {
                self.status = ChildStatus::Failed(err.to_string());
                Err(err.into())
            }
        }
    }

    /// Seed a child on `fine_grid` from this node's solution at indices
    /// `0..coarse_index`. The fine grid must start with exactly those points
    /// and stay inside this node's time range.
    pub fn create_child(
        &mut self,
        fine_grid: &[Real],
        coarse_index: usize,
    ) -> TreeResult<&mut SolverTree> {
        let filled = self.solver.history().num_time_steps();
        if coarse_index == 0 || coarse_index > filled {
            return Err(TreeError::InvalidCoarseIndex {
                index: coarse_index,
                filled,
            });
        }
        let params = self.solver.params();
        if fine_grid.len() < coarse_index.max(2) {
            return Err(TreeError::InvalidFineGrid {
                what: format!(
                    "{} points cannot hold a {coarse_index}-point prefix",
                    fine_grid.len()
                ),
            });
        }
        if fine_grid[..coarse_index] != params.times()[..coarse_index] {
            return Err(TreeError::InvalidFineGrid {
                what: format!("first {coarse_index} points differ from the coarse grid"),
            });
        }

        let fine_params = Arc::new(params.interpolate(fine_grid)?);
        let prefix = self.solver.history().truncated(coarse_index)?;
        let solver = StepSolver::new(fine_params, prefix, self.solver.options())?;

        let index = self.children.len();
        self.children.push(SolverTree {
            solver,
            coarse_index: Some(coarse_index),
            status: ChildStatus::Pending,
            children: Vec::new(),
        });
        Ok(&mut self.children[index])
    }

    /// [`create_child`](Self::create_child) on this node's grid up to
    /// `coarse_index`, followed by `substeps` equal sub-steps over every later
    /// interval.
    pub fn refine(&mut self, coarse_index: usize, substeps: usize) -> TreeResult<&mut SolverTree> {
        if substeps == 0 {
            return Err(TreeError::InvalidFineGrid {
                what: "substeps must be at least 1".to_string(),
            });
        }
        let times = self.solver.params().times();
        if coarse_index == 0 || coarse_index > times.len() {
            return Err(TreeError::InvalidCoarseIndex {
                index: coarse_index,
                filled: self.solver.history().num_time_steps(),
            });
        }

        let mut grid = times[..coarse_index].to_vec();
        for pair in times[coarse_index - 1..].windows(2) {
            let dt = (pair[1] - pair[0]) / substeps as Real;
            grid.extend((1..substeps).map(|j| pair[0] + j as Real * dt));
            grid.push(pair[1]);
        }
        self.create_child(&grid, coarse_index)
    }

    /// Solve every direct child concurrently, then recurse into each solved
    /// child's own children.
    pub fn solve_children(&mut self, policy: FailurePolicy) -> TreeResult<()> {
        let results: Vec<TreeResult<()>> = self
            .children
            .par_iter_mut()
            .map(|child| child.solve_subtree(policy))
            .collect();
        results.into_iter().collect()
    }

    fn solve_subtree(&mut self, policy: FailurePolicy) -> TreeResult<()> {
        let coarse_index = self.coarse_index.unwrap_or(0);
        info!(
            coarse_index,
            points = self.solver.params().num_time_steps(),
            "solving fine child"
        );
        match self.solver.advance() {
            Ok(history) => {
                info!(
                    coarse_index,
                    final_power = history.power(history.num_time_steps() - 1),
                    "fine child solved"
                );
                self.status = ChildStatus::Solved;
            }
            Err(source) => {
                warn!(coarse_index, error = %source, "fine child failed");
                self.status = ChildStatus::Failed(source.to_string());
                return match policy {
                    FailurePolicy::FailTree => Err(TreeError::ChildFailed {
                        coarse_index,
                        source,
                    }),
                    FailurePolicy::IsolateChild => Ok(()),
                };
            }
        }
        self.solve_children(policy)
    }

    /// Combine the tree into one time series on this node's grid.
    ///
    /// Only the coarse solution is returned; no parareal correction from the
    /// children is applied, and `corrected` reports as much.
    pub fn assemble_global_output(&self) -> TreeResult<AssembledOutput> {
        let history = self.solver.history();
        let expected = self.solver.params().num_time_steps();
        if history.num_time_steps() != expected {
            return Err(epke_solver::SolverError::IncompleteHistory {
                requested: expected,
                filled: history.num_time_steps(),
            }
            .into());
        }
        if !self.children.is_empty() {
            info!(
                children = self.children.len(),
                "assembling coarse solution without fine corrections"
            );
        }
        Ok(AssembledOutput {
            history: history.clone(),
            corrected: false,
        })
    }
}
