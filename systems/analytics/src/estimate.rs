use gem_replay_core::GEM_TTL;

/// Gem statistics recovered by inverting the scoring model.
///
/// The scoring model awards `GEM_TTL - time_since_spawn_at_capture` points
/// per captured gem, so working backward from a score and a utilization
/// percentage yields an estimate of how many gems spawned and what the
/// average capture was worth. This is a heuristic approximation, not an
/// exact count; the formulas are preserved exactly for compatibility with
/// historical analytics output.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GemEstimate {
    /// Estimated number of gems spawned during the scored interval.
    pub estimated_gems: i64,
    /// Estimated mean score per captured gem.
    pub mean_gem_score: f64,
    /// Estimated mean ticks from gem spawn to capture.
    pub capture_mean_ticks: f64,
}

/// Runs the inverse estimator for a score and utilization percentage.
///
/// A zero utilization estimates zero gems; a zero gem estimate yields a
/// zero mean score. No input divides by zero.
#[must_use]
pub fn estimate_gems(score: i64, utilization: f64) -> GemEstimate {
    let ttl = f64::from(GEM_TTL);
    let estimated_gems = if utilization == 0.0 {
        0
    } else {
        (score as f64 / utilization * 100.0 / ttl).round() as i64
    };
    let mean_gem_score = if estimated_gems == 0 {
        0.0
    } else {
        round2(score as f64 / estimated_gems as f64)
    };
    let capture_mean_ticks = round2(ttl - mean_gem_score);

    GemEstimate {
        estimated_gems,
        mean_gem_score,
        capture_mean_ticks,
    }
}

/// Converts an optional nanosecond reading to milliseconds, rounded to two
/// decimals. Missing readings count as zero before conversion.
#[must_use]
pub fn nanos_to_millis(nanos: Option<u64>) -> f64 {
    round2(nanos.unwrap_or(0) as f64 / 1_000_000.0)
}

/// Rounds to two decimal places, half away from zero.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
