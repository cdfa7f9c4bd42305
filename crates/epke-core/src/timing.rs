//! Lightweight performance timing utilities.
//!
//! Measures where a run spends its wall-clock time (input loading, coarse
//! solve, fine solves, result writing). Enabled programmatically or through
//! the `EPKE_TIMING` environment variable.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

static ENABLED: AtomicBool = AtomicBool::new(false);

/// Enable performance timing globally.
pub fn enable_timing() {
    ENABLED.store(true, Ordering::Relaxed);
}

/// Disable performance timing globally.
pub fn disable_timing() {
    ENABLED.store(false, Ordering::Relaxed);
}

/// Check if timing is enabled.
pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed) || std::env::var("EPKE_TIMING").is_ok()
}

/// Wall-clock stopwatch. Always measures; reporting is gated by [`is_enabled`].
pub struct Timer {
    label: &'static str,
    start: Instant,
}

impl Timer {
    /// Create and start a new timer with the given label.
    pub fn start(label: &'static str) -> Self {
        Self {
            label,
            start: Instant::now(),
        }
    }

    /// Seconds elapsed since [`Timer::start`].
    pub fn elapsed_s(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    pub fn label(&self) -> &'static str {
        self.label
    }
}

/// Per-run phase timings.
#[derive(Clone, Debug, Default)]
pub struct PerfStats {
    pub load_time_s: f64,
    pub coarse_solve_time_s: f64,
    pub fine_solve_time_s: f64,
    pub save_time_s: f64,
    pub steps: usize,
    pub fine_solvers: usize,
}

impl PerfStats {
    pub fn total_s(&self) -> f64 {
        self.load_time_s + self.coarse_solve_time_s + self.fine_solve_time_s + self.save_time_s
    }

    /// Render a formatted summary, or `None` when timing is disabled.
    pub fn summary(&self) -> Option<String> {
        if !is_enabled() {
            return None;
        }

        let mut out = String::from("=== Performance Summary ===\n");
        out.push_str(&format!("Load time:          {:.3}s\n", self.load_time_s));
        out.push_str(&format!(
            "Coarse solve:       {:.3}s ({} steps)\n",
            self.coarse_solve_time_s, self.steps
        ));
        if self.fine_solvers > 0 {
            out.push_str(&format!(
                "Fine solves:        {:.3}s ({} solvers)\n",
                self.fine_solve_time_s, self.fine_solvers
            ));
        }
        out.push_str(&format!("Save time:          {:.3}s\n", self.save_time_s));
        out.push_str(&format!("Total:              {:.3}s\n", self.total_s()));
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_measures_forward() {
        let t = Timer::start("noop");
        assert_eq!(t.label(), "noop");
        assert!(t.elapsed_s() >= 0.0);
    }

    #[test]
    fn summary_respects_switch() {
        let stats = PerfStats {
            load_time_s: 0.5,
            coarse_solve_time_s: 1.0,
            steps: 10,
            ..Default::default()
        };
        assert!((stats.total_s() - 1.5).abs() < 1e-12);

        enable_timing();
        let text = stats.summary().expect("timing enabled");
        assert!(text.contains("10 steps"));
        assert!(!text.contains("Fine solves"));
        disable_timing();
    }
}
