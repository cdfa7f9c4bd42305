//! Input validation logic.

use crate::schema::{InitialDef, ParametersDef, Project, SeriesDef, TimeGridDef};

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Length mismatch: {field} has {found} entries, expected {expected}")]
    LengthMismatch {
        field: String,
        expected: usize,
        found: usize,
    },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

fn invalid(field: impl Into<String>, value: f64, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.into(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

pub fn validate_project(project: &Project) -> Result<(), ValidationError> {
    if project.version == 0 || project.version > crate::LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: project.version,
        });
    }

    let n = validate_parameters(&project.parameters)?;
    let groups = project.parameters.precursors.len();

    match &project.initial {
        InitialDef::Equilibrium { power } => {
            if !(power.is_finite() && *power > 0.0) {
                return Err(invalid("initial.power", *power, "must be positive"));
            }
        }
        InitialDef::Precomputed {
            power,
            rho,
            concentrations,
        } => {
            let m = power.len();
            if m == 0 || m > n {
                return Err(ValidationError::InvalidValue {
                    field: "initial.power".to_string(),
                    value: m.to_string(),
                    reason: format!("precomputed length must be in 1..={n}"),
                });
            }
            check_len("initial.rho", rho.len(), m)?;
            check_len("initial.concentrations", concentrations.len(), groups)?;
            for (k, conc) in concentrations.iter().enumerate() {
                check_len(format!("initial.concentrations[{k}]"), conc.len(), m)?;
            }
            if let Some(p) = power.iter().find(|p| !p.is_finite()) {
                return Err(invalid("initial.power", *p, "must be finite"));
            }
        }
    }

    if let Some(refinement) = &project.refinement {
        for (i, child) in refinement.children.iter().enumerate() {
            if child.coarse_index == 0 || child.coarse_index >= n {
                return Err(ValidationError::InvalidValue {
                    field: format!("refinement.children[{i}].coarse_index"),
                    value: child.coarse_index.to_string(),
                    reason: format!("must be in 1..{n}"),
                });
            }
            if child.substeps == 0 {
                return Err(ValidationError::InvalidValue {
                    field: format!("refinement.children[{i}].substeps"),
                    value: "0".to_string(),
                    reason: "must be at least 1".to_string(),
                });
            }
        }
    }

    Ok(())
}

/// Validate kinetics constants; returns the number of time points.
pub fn validate_parameters(params: &ParametersDef) -> Result<usize, ValidationError> {
    let n = validate_time(&params.time)?;

    if !(0.0..=1.0).contains(&params.theta) {
        return Err(invalid("parameters.theta", params.theta, "must be in [0, 1]"));
    }

    check_series("parameters.gen_time_s", &params.gen_time_s, n, |v| v > 0.0)?;
    check_series("parameters.pow_norm", &params.pow_norm, n, |_| true)?;
    check_series("parameters.rho_imp", &params.rho_imp, n, |_| true)?;
    if let Some(beta_eff) = &params.beta_eff {
        check_series("parameters.beta_eff", beta_eff, n, |v| v >= 0.0)?;
    }

    for (field, v) in [
        ("parameters.gamma_d", params.gamma_d),
        ("parameters.eta", params.eta),
    ] {
        if !v.is_finite() {
            return Err(invalid(field, v, "must be finite"));
        }
    }
    if !(params.lambda_h_per_s.is_finite() && params.lambda_h_per_s >= 0.0) {
        return Err(invalid(
            "parameters.lambda_h_per_s",
            params.lambda_h_per_s,
            "must be non-negative",
        ));
    }

    if params.precursors.is_empty() {
        return Err(ValidationError::LengthMismatch {
            field: "parameters.precursors".to_string(),
            expected: 1,
            found: 0,
        });
    }
    for (k, group) in params.precursors.iter().enumerate() {
        check_series(
            &format!("parameters.precursors[{k}].decay_constant_per_s"),
            &group.decay_constant_per_s,
            n,
            |v| v > 0.0,
        )?;
        check_series(
            &format!("parameters.precursors[{k}].delayed_fraction"),
            &group.delayed_fraction,
            n,
            |v| v >= 0.0,
        )?;
    }

    Ok(n)
}

fn validate_time(time: &TimeGridDef) -> Result<usize, ValidationError> {
    if let TimeGridDef::Uniform {
        t_start_s,
        t_end_s,
        steps,
    } = time
    {
        if *steps == 0 {
            return Err(ValidationError::InvalidValue {
                field: "parameters.time.steps".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if !(t_end_s > t_start_s) {
            return Err(invalid(
                "parameters.time.t_end_s",
                *t_end_s,
                "must exceed t_start_s",
            ));
        }
    }

    let points = time.points();
    if points.len() < 2 {
        return Err(ValidationError::LengthMismatch {
            field: "parameters.time".to_string(),
            expected: 2,
            found: points.len(),
        });
    }
    for (i, pair) in points.windows(2).enumerate() {
        if !(pair[1] > pair[0]) {
            return Err(invalid(
                format!("parameters.time[{}]", i + 1),
                pair[1],
                "time points must be strictly increasing",
            ));
        }
    }
    Ok(points.len())
}

fn check_len(field: impl Into<String>, found: usize, expected: usize) -> Result<(), ValidationError> {
    if found != expected {
        return Err(ValidationError::LengthMismatch {
            field: field.into(),
            expected,
            found,
        });
    }
    Ok(())
}

fn check_series(
    field: &str,
    series: &SeriesDef,
    n: usize,
    accept: impl Fn(f64) -> bool,
) -> Result<(), ValidationError> {
    if let SeriesDef::Values(values) = series {
        check_len(field, values.len(), n)?;
    }
    if let Some(bad) = series.values().find(|v| !v.is_finite() || !accept(*v)) {
        return Err(invalid(field, bad, "out of range"));
    }
    Ok(())
}
