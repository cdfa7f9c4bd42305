//! Compile input definitions into solver objects.

use std::sync::Arc;

use epke_parareal::FailurePolicy;
use epke_project::schema::{
    FailurePolicyDef, InitialDef, ParametersDef, Project, RefinementDef, SolverDef,
};
use epke_solver::{
    Feedback, History, ParameterTables, Parameters, PrecursorGroup, SolverOptions, StepSolver,
};

use crate::error::AppResult;

/// Everything needed to start a solve.
#[derive(Debug, Clone)]
pub struct CompiledProject {
    pub params: Arc<Parameters>,
    pub prefix: History,
    pub options: SolverOptions,
    pub policy: FailurePolicy,
    /// `(coarse_index, substeps)` of each fine child, in input order.
    pub refinements: Vec<(usize, usize)>,
}

impl CompiledProject {
    pub fn solver(&self) -> AppResult<StepSolver> {
        Ok(StepSolver::new(
            self.params.clone(),
            self.prefix.clone(),
            self.options,
        )?)
    }
}

pub fn compile_project(project: &Project) -> AppResult<CompiledProject> {
    epke_project::validate_project(project)?;

    let params = Arc::new(compile_parameters(&project.parameters)?);
    let prefix = compile_initial(&project.initial, &params)?;
    let (policy, refinements) = compile_refinement(project.refinement.as_ref());

    Ok(CompiledProject {
        params,
        prefix,
        options: compile_options(&project.solver),
        policy,
        refinements,
    })
}

pub fn compile_parameters(def: &ParametersDef) -> AppResult<Parameters> {
    let n = epke_project::validate_parameters(def)?;

    let tables = ParameterTables {
        time: def.time.points(),
        groups: def
            .precursors
            .iter()
            .map(|group| PrecursorGroup {
                decay_constant: group.decay_constant_per_s.expand(n),
                delayed_fraction: group.delayed_fraction.expand(n),
            })
            .collect(),
        gen_time: def.gen_time_s.expand(n),
        pow_norm: def.pow_norm.expand(n),
        rho_imp: def.rho_imp.expand(n),
        beta_eff: def.beta_eff.as_ref().map(|series| series.expand(n)),
        theta: def.theta,
        feedback: Feedback {
            gamma_d: def.gamma_d,
            eta: def.eta,
            lambda_h: def.lambda_h_per_s,
        },
    };
    Ok(Parameters::new(tables)?)
}

pub fn compile_initial(def: &InitialDef, params: &Parameters) -> AppResult<History> {
    let history = match def {
        InitialDef::Equilibrium { power } => History::equilibrium(params, *power)?,
        InitialDef::Precomputed {
            power,
            rho,
            concentrations,
        } => History::new(power.clone(), rho.clone(), concentrations.clone())?,
    };
    Ok(history)
}

pub fn compile_options(def: &SolverDef) -> SolverOptions {
    SolverOptions {
        transformation_acceptance_test: def.transformation_acceptance_test,
    }
}

fn compile_refinement(def: Option<&RefinementDef>) -> (FailurePolicy, Vec<(usize, usize)>) {
    let Some(def) = def else {
        return (FailurePolicy::default(), Vec::new());
    };
    let policy = match def.failure_policy {
        FailurePolicyDef::FailTree => FailurePolicy::FailTree,
        FailurePolicyDef::IsolateChild => FailurePolicy::IsolateChild,
    };
    let children = def
        .children
        .iter()
        .map(|child| (child.coarse_index, child.substeps))
        .collect();
    (policy, children)
}
