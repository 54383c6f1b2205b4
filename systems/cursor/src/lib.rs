#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Replay navigation over aggregated rounds.
//!
//! The [`ReplayCursor`] holds the current `(round, tick)` position. Round
//! selection re-runs the aggregator from the raw protocol, so round state
//! is rebuilt from scratch rather than incrementally patched, and every
//! seek recomputes the bot trail in full. Trace lengths are small (hundreds to
//! low thousands of ticks), so the full recomputation keeps seeking
//! random-access correct without any incremental bookkeeping.

use gem_replay_core::{GridPos, SessionRecord, TickFrame, WorldKnowledge};
use gem_replay_system_aggregation::aggregate_round;

/// Seekable position within a loaded session's rounds and ticks.
#[derive(Debug, Default)]
pub struct ReplayCursor {
    round_index: usize,
    tick_index: usize,
    frames: Vec<TickFrame>,
    knowledge: WorldKnowledge,
    trail: Vec<GridPos>,
}

impl ReplayCursor {
    /// Creates a cursor positioned on the session's first round.
    ///
    /// A session without rounds yields an empty cursor that still answers
    /// every query with its defined empty value.
    #[must_use]
    pub fn new(session: &SessionRecord) -> Self {
        let mut cursor = Self::default();
        cursor.select_round(session, 0);
        cursor
    }

    /// Selects a round and rebuilds its replay state from scratch.
    ///
    /// Out-of-range indices are ignored: the cursor keeps its current
    /// round, tick, and trail untouched.
    pub fn select_round(&mut self, session: &SessionRecord, index: usize) {
        let Some(round) = session.rounds.get(index) else {
            return;
        };

        let (knowledge, frames) = aggregate_round(round).into_parts();
        self.round_index = index;
        self.knowledge = knowledge;
        self.frames = frames;
        self.tick_index = 0;
        self.rebuild_trail();
    }

    /// Seeks to a tick index, clamping into the valid range.
    ///
    /// Accepts a signed index so both under- and overshooting callers are
    /// clamped instead of failing; an empty round always resolves to 0.
    pub fn seek_tick(&mut self, index: i64) {
        if self.frames.is_empty() {
            self.tick_index = 0;
            self.trail.clear();
            return;
        }

        let last = (self.frames.len() - 1) as i64;
        self.tick_index = index.clamp(0, last) as usize;
        self.rebuild_trail();
    }

    /// The canonical frame at the current position, `None` when the round
    /// has no frames.
    #[must_use]
    pub fn current_frame(&self) -> Option<&TickFrame> {
        self.frames.get(self.tick_index)
    }

    /// Tick number of the current frame, when one exists.
    #[must_use]
    pub fn current_tick(&self) -> Option<u64> {
        self.current_frame().map(|frame| frame.tick)
    }

    /// Ordered known bot positions from the round start through the
    /// current tick. Frames without a position contribute nothing; the
    /// trail is not padded for gaps.
    #[must_use]
    pub fn trail(&self) -> &[GridPos] {
        &self.trail
    }

    /// World knowledge accumulated for the selected round.
    #[must_use]
    pub fn knowledge(&self) -> &WorldKnowledge {
        &self.knowledge
    }

    /// Index of the selected round.
    #[must_use]
    pub const fn round_index(&self) -> usize {
        self.round_index
    }

    /// Index of the current tick within the selected round.
    #[must_use]
    pub const fn tick_index(&self) -> usize {
        self.tick_index
    }

    /// Number of canonical frames in the selected round.
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    fn rebuild_trail(&mut self) {
        self.trail.clear();
        let Some(prefix) = self.frames.get(..=self.tick_index) else {
            return;
        };
        for frame in prefix {
            if let Some(cell) = frame.bot_position {
                self.trail.push(cell);
            }
        }
    }
}
