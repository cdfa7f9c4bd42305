//! Input file schema definitions.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub version: u32,
    pub name: String,
    pub parameters: ParametersDef,
    #[serde(default)]
    pub initial: InitialDef,
    #[serde(default)]
    pub solver: SolverDef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refinement: Option<RefinementDef>,
}

/// Kinetics constants on a time grid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParametersDef {
    pub time: TimeGridDef,
    #[serde(default = "default_theta")]
    pub theta: f64,
    pub gen_time_s: SeriesDef,
    #[serde(default = "default_pow_norm")]
    pub pow_norm: SeriesDef,
    #[serde(default = "default_rho_imp")]
    pub rho_imp: SeriesDef,
    /// Defaults to the sum of the group delayed fractions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beta_eff: Option<SeriesDef>,
    #[serde(default)]
    pub gamma_d: f64,
    #[serde(default)]
    pub eta: f64,
    #[serde(default)]
    pub lambda_h_per_s: f64,
    pub precursors: Vec<PrecursorDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrecursorDef {
    pub decay_constant_per_s: SeriesDef,
    pub delayed_fraction: SeriesDef,
}

/// Time grid: explicit points or a uniform subdivision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum TimeGridDef {
    Points(Vec<f64>),
    Uniform {
        t_start_s: f64,
        t_end_s: f64,
        steps: usize,
    },
}

impl TimeGridDef {
    pub fn len(&self) -> usize {
        match self {
            TimeGridDef::Points(points) => points.len(),
            TimeGridDef::Uniform { steps, .. } => steps + 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn points(&self) -> Vec<f64> {
        match self {
            TimeGridDef::Points(points) => points.clone(),
            TimeGridDef::Uniform {
                t_start_s,
                t_end_s,
                steps,
            } => {
                let dt = (t_end_s - t_start_s) / *steps as f64;
                (0..=*steps)
                    .map(|i| {
                        if i == *steps {
                            *t_end_s
                        } else {
                            t_start_s + i as f64 * dt
                        }
                    })
                    .collect()
            }
        }
    }
}

/// A per-step quantity: constant in time, or one value per grid point.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum SeriesDef {
    Constant(f64),
    Values(Vec<f64>),
}

impl SeriesDef {
    /// Expand to exactly `n` values. A list is returned as-is.
    pub fn expand(&self, n: usize) -> Vec<f64> {
        match self {
            SeriesDef::Constant(v) => vec![*v; n],
            SeriesDef::Values(values) => values.clone(),
        }
    }

    pub fn fits(&self, n: usize) -> bool {
        match self {
            SeriesDef::Constant(_) => true,
            SeriesDef::Values(values) => values.len() == n,
        }
    }

    pub fn values(&self) -> Box<dyn Iterator<Item = f64> + '_> {
        match self {
            SeriesDef::Constant(v) => Box::new(std::iter::once(*v)),
            SeriesDef::Values(values) => Box::new(values.iter().copied()),
        }
    }
}

/// How index 0 (and possibly a longer prefix) of the history is supplied.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum InitialDef {
    /// Steady precursor levels at the given power.
    Equilibrium {
        #[serde(default = "default_initial_power")]
        power: f64,
    },
    /// History already computed elsewhere, e.g. by a coarser solve.
    Precomputed {
        power: Vec<f64>,
        rho: Vec<f64>,
        concentrations: Vec<Vec<f64>>,
    },
}

impl Default for InitialDef {
    fn default() -> Self {
        InitialDef::Equilibrium {
            power: default_initial_power(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SolverDef {
    #[serde(default)]
    pub transformation_acceptance_test: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RefinementDef {
    #[serde(default)]
    pub failure_policy: FailurePolicyDef,
    #[serde(default)]
    pub children: Vec<ChildDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChildDef {
    pub coarse_index: usize,
    pub substeps: usize,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicyDef {
    #[default]
    FailTree,
    IsolateChild,
}

fn default_theta() -> f64 {
    1.0
}

fn default_pow_norm() -> SeriesDef {
    SeriesDef::Constant(1.0)
}

fn default_rho_imp() -> SeriesDef {
    SeriesDef::Constant(0.0)
}

fn default_initial_power() -> f64 {
    1.0
}
