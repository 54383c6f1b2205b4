#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Derived analytics over session and round records.
//!
//! Everything here is a pure function of the loaded trace: no state, no
//! mutation, no dependency on the replay cursor. Three reports make up the
//! query surface (the session overview, one report per round, and the
//! cross-round summary), and each carries a `Display` rendering that
//! produces the text block shown to operators.
//!
//! Degenerate inputs (zero rounds, zero utilization, zero estimated gems)
//! resolve to defined defaults; no formula in this crate divides by zero.

mod estimate;

use std::fmt;

use chrono::DateTime;
use gem_replay_core::{RoundRecord, SessionRecord};

pub use estimate::{estimate_gems, nanos_to_millis, round2, GemEstimate};

/// Session identity and headline statistics.
#[derive(Clone, Debug, PartialEq)]
pub struct OverviewReport {
    /// Unix timestamp the session was recorded at.
    pub timestamp: i64,
    /// The timestamp rendered as a UTC civil date-time.
    pub timestamp_utc: String,
    /// Machine-readable stage identifier.
    pub stage_key: String,
    /// Human-readable stage title.
    pub stage_title: String,
    /// Session seed.
    pub seed: i64,
    /// Bot display name.
    pub name: String,
    /// Bot emoji badge.
    pub emoji: String,
    /// Sum of all round scores.
    pub total_score: i64,
    /// Session-level utilization statistics, when the runner computed them.
    pub utilization: Option<UtilizationSummary>,
    /// Git revision of the producing runner.
    pub git_hash: String,
}

/// Session-level utilization statistics, rounded to two decimals.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UtilizationSummary {
    /// Mean gem utilization percentage across rounds.
    pub gem_utilization_mean: f64,
    /// Coefficient of variation of gem utilization across rounds.
    pub gem_utilization_cv: f64,
    /// Mean floor coverage percentage across rounds.
    pub floor_coverage_mean: f64,
}

/// Builds the overview report for a loaded session.
#[must_use]
pub fn overview(session: &SessionRecord) -> OverviewReport {
    let utilization = session
        .gem_utilization_cv
        .map(|cv| UtilizationSummary {
            gem_utilization_mean: round2(session.gem_utilization_mean.unwrap_or(0.0)),
            gem_utilization_cv: round2(cv),
            floor_coverage_mean: round2(session.floor_coverage_mean.unwrap_or(0.0)),
        });

    OverviewReport {
        timestamp: session.timestamp,
        timestamp_utc: format_timestamp(session.timestamp),
        stage_key: session.stage_key.clone(),
        stage_title: session.stage_title.clone(),
        seed: session.seed,
        name: session.name.clone(),
        emoji: session.emoji.clone(),
        total_score: session.total_score,
        utilization,
        git_hash: session.git_hash.clone(),
    }
}

impl fmt::Display for OverviewReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.timestamp_utc)?;
        writeln!(f, "{} {}", self.stage_key, self.stage_title)?;
        writeln!(f)?;
        writeln!(f, "Seed: {}", self.seed)?;
        writeln!(f, "Name: {} [{}]", self.name, self.emoji)?;
        writeln!(f, "Score: {}", self.total_score)?;
        if let Some(utilization) = &self.utilization {
            writeln!(f, "GU mean: {}%", utilization.gem_utilization_mean)?;
            writeln!(f, "GU cv: {}", utilization.gem_utilization_cv)?;
            writeln!(f, "Floor Coverage: {}%", utilization.floor_coverage_mean)?;
        }
        write!(f, "Git Hash: {}", self.git_hash)
    }
}

/// Per-round statistics with response times converted to milliseconds.
#[derive(Clone, Debug, PartialEq)]
pub struct RoundReport {
    /// Zero-based index of the round within the session.
    pub index: usize,
    /// Round seed.
    pub seed: i64,
    /// Final round score.
    pub score: i64,
    /// Gem utilization percentage, when reported.
    pub gem_utilization: Option<f64>,
    /// Floor coverage percentage, when reported.
    pub floor_coverage: Option<f64>,
    /// Tick of the first capture, when one occurred.
    pub ticks_to_first_capture: Option<u64>,
    /// Disqualification reason, when the bot was disqualified.
    pub disqualified_for: Option<String>,
    /// Response-time statistics in milliseconds, rounded to two decimals.
    pub response_times_ms: ResponseTimesMs,
    /// Inverse gem estimate, present only when the round reported a
    /// non-zero utilization.
    pub gem_estimate: Option<GemEstimate>,
}

/// Round response times in milliseconds. Missing readings count as zero.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ResponseTimesMs {
    /// Response time of the first tick.
    pub first: f64,
    /// Fastest observed response.
    pub min: f64,
    /// Median observed response.
    pub median: f64,
    /// Slowest observed response.
    pub max: f64,
}

/// Builds the report for one round.
#[must_use]
pub fn round_report(index: usize, round: &RoundRecord) -> RoundReport {
    let stats = round.response_time_stats;
    let gem_estimate = round
        .gem_utilization
        .filter(|utilization| *utilization != 0.0)
        .map(|utilization| estimate_gems(round.score, utilization));

    RoundReport {
        index,
        seed: round.seed,
        score: round.score,
        gem_utilization: round.gem_utilization,
        floor_coverage: round.floor_coverage,
        ticks_to_first_capture: round.ticks_to_first_capture,
        disqualified_for: round.disqualified_for.clone(),
        response_times_ms: ResponseTimesMs {
            first: nanos_to_millis(stats.first),
            min: nanos_to_millis(stats.min),
            median: nanos_to_millis(stats.median),
            max: nanos_to_millis(stats.max),
        },
        gem_estimate,
    }
}

impl fmt::Display for RoundReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Round {}", self.index + 1)?;
        writeln!(f)?;
        writeln!(f, "Seed: {}", self.seed)?;
        writeln!(f, "Score: {}", self.score)?;
        if let Some(utilization) = self.gem_utilization {
            writeln!(f, "GU: {utilization}%")?;
        }
        if let Some(coverage) = self.floor_coverage {
            writeln!(f, "Floor Coverage: {coverage}%")?;
        }
        match self.ticks_to_first_capture {
            Some(tick) => writeln!(f, "First capture: tick {tick}")?,
            None => writeln!(f, "First capture: none")?,
        }
        if let Some(reason) = &self.disqualified_for {
            writeln!(f, "Disqualified for: {reason}")?;
        }
        writeln!(f)?;
        writeln!(f, "Response times:")?;
        writeln!(f, "first: {} ms", self.response_times_ms.first)?;
        writeln!(f, "min: {} ms", self.response_times_ms.min)?;
        writeln!(f, "median: {} ms", self.response_times_ms.median)?;
        write!(f, "max: {} ms", self.response_times_ms.max)?;
        if let Some(estimate) = &self.gem_estimate {
            writeln!(f)?;
            writeln!(f)?;
            writeln!(f, "Gems spawned: {}", estimate.estimated_gems)?;
            writeln!(f, "Mean gem score: {}", estimate.mean_gem_score)?;
            write!(f, "Capture mean: {} ticks", estimate.capture_mean_ticks)?;
        }
        Ok(())
    }
}

/// Cross-round summary statistics.
#[derive(Clone, Debug, PartialEq)]
pub struct CrossRoundReport {
    /// Sum of all round scores.
    pub total_score: i64,
    /// Aggregate statistics, present only when the session has at least
    /// two rounds.
    pub stats: Option<CrossRoundStats>,
}

/// Aggregate statistics over all rounds of a session.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CrossRoundStats {
    /// Mean round score.
    pub mean_score: f64,
    /// Median round score.
    pub median_score: f64,
    /// Estimated total gems spawned across the session.
    pub total_gems: i64,
    /// Estimated mean score per captured gem.
    pub mean_gem_score: f64,
    /// Estimated mean ticks from gem spawn to capture.
    pub capture_mean_ticks: f64,
}

/// Builds the cross-round summary for a loaded session.
///
/// Sessions with fewer than two rounds report only the total score. The gem
/// figures reuse the inverse estimator over the session totals, defaulting
/// the utilization mean to 1 when the runner did not record one.
#[must_use]
pub fn cross_round(session: &SessionRecord) -> CrossRoundReport {
    if session.rounds.len() < 2 {
        return CrossRoundReport {
            total_score: session.total_score,
            stats: None,
        };
    }

    let mean_score = session.total_score as f64 / session.rounds.len() as f64;
    let median_score = median(session.rounds.iter().map(|round| round.score).collect());

    let utilization_mean = session.gem_utilization_mean.unwrap_or(1.0);
    let estimate = estimate_gems(session.total_score, utilization_mean);

    CrossRoundReport {
        total_score: session.total_score,
        stats: Some(CrossRoundStats {
            mean_score,
            median_score,
            total_gems: estimate.estimated_gems,
            mean_gem_score: estimate.mean_gem_score,
            capture_mean_ticks: estimate.capture_mean_ticks,
        }),
    }
}

impl fmt::Display for CrossRoundReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Score: {}", self.total_score)?;
        if let Some(stats) = &self.stats {
            writeln!(f)?;
            writeln!(f)?;
            writeln!(f, "Mean: {}", stats.mean_score)?;
            writeln!(f, "Median: {}", stats.median_score)?;
            writeln!(f, "Total gems: {}", stats.total_gems)?;
            writeln!(f, "Mean gem score: {}", stats.mean_gem_score)?;
            write!(f, "Capture mean: {} ticks", stats.capture_mean_ticks)?;
        }
        Ok(())
    }
}

/// Median of the given scores.
///
/// Averaging the two middle indices `(n - 1) / 2` and `n / 2` is correct
/// for both parities: for odd `n` they coincide, so the formula degenerates
/// to the single middle value without a separate branch.
fn median(mut scores: Vec<i64>) -> f64 {
    scores.sort_unstable();
    let n = scores.len();
    (scores[(n - 1) / 2] + scores[n / 2]) as f64 / 2.0
}

fn format_timestamp(timestamp: i64) -> String {
    match DateTime::from_timestamp(timestamp, 0) {
        Some(moment) => moment.format("%a %b %e %H:%M:%S %Y").to_string(),
        None => timestamp.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{format_timestamp, median};

    #[test]
    fn median_of_odd_count_is_the_middle_value() {
        assert_eq!(median(vec![30, 10, 20]), 20.0);
    }

    #[test]
    fn median_of_even_count_averages_the_middle_pair() {
        assert_eq!(median(vec![40, 10, 30, 20]), 25.0);
    }

    #[test]
    fn timestamps_render_as_utc_civil_time() {
        assert_eq!(format_timestamp(0), "Thu Jan  1 00:00:00 1970");
    }

    #[test]
    fn unrepresentable_timestamps_fall_back_to_the_raw_value() {
        assert_eq!(format_timestamp(i64::MAX), i64::MAX.to_string());
    }
}
