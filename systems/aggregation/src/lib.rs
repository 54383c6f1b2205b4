#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Order-independent aggregation of raw protocol entries.
//!
//! A round's protocol is redundant: entries arrive unsorted, several entries
//! may describe the same tick, and world facts (walls, visits) are scattered
//! across all of them. The aggregator folds the whole list once into an
//! ordered map keyed by tick number and accumulates the monotonic
//! [`WorldKnowledge`] on the side, then emits one canonical [`TickFrame`]
//! per tick in ascending order.
//!
//! Re-running the fold over any permutation of the same entries yields the
//! same knowledge and the same frame sequence, with one deliberate
//! exception: when several entries carry a bot position for the same tick,
//! the last one in raw entry order wins.

use std::collections::BTreeMap;

use gem_replay_core::{
    DebugExtra, GridPos, ProtocolEntry, RoundRecord, TickFrame, WireCoord, WorldKnowledge,
};

/// Result of folding one round's raw protocol.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AggregatedRound {
    knowledge: WorldKnowledge,
    frames: Vec<TickFrame>,
}

impl AggregatedRound {
    /// Monotonic world facts accumulated from every entry of the round.
    #[must_use]
    pub fn knowledge(&self) -> &WorldKnowledge {
        &self.knowledge
    }

    /// Canonical frames sorted ascending by tick, one per tick number.
    #[must_use]
    pub fn frames(&self) -> &[TickFrame] {
        &self.frames
    }

    /// Number of canonical frames in the round.
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Consumes the aggregate, yielding knowledge and frames.
    #[must_use]
    pub fn into_parts(self) -> (WorldKnowledge, Vec<TickFrame>) {
        (self.knowledge, self.frames)
    }
}

/// Folds a round's raw protocol into world knowledge and canonical frames.
#[must_use]
pub fn aggregate_round(round: &RoundRecord) -> AggregatedRound {
    aggregate_entries(&round.debug_protocol)
}

/// Folds raw protocol entries into world knowledge and canonical frames.
///
/// A round with zero entries yields an empty frame list, zero walls, and
/// unresolved dimensions.
#[must_use]
pub fn aggregate_entries(entries: &[ProtocolEntry]) -> AggregatedRound {
    let mut knowledge = WorldKnowledge::new();
    let mut accumulators: BTreeMap<u64, TickFrame> = BTreeMap::new();

    for entry in entries {
        if let Some(config) = entry.bots.data.config {
            knowledge.resolve_dimensions(config.width, config.height);
        }

        for wall in &entry.bots.data.wall {
            if let Some(cell) = wall.unpack() {
                knowledge.record_wall(cell);
            }
        }

        let frame = accumulators.entry(entry.tick).or_default();

        if let Some(cell) = entry.bots.data.bot.as_ref().and_then(WireCoord::unpack) {
            frame.bot_position = Some(cell);
            knowledge.record_visit(cell);
        }

        let gems: Vec<GridPos> = entry
            .all_gems
            .iter()
            .filter_map(|gem| gem.position.as_ref()?.unpack())
            .collect();
        if !gems.is_empty() {
            frame.gems = gems;
        }

        if !entry.fov.is_empty() {
            frame.fov = entry.fov.iter().filter_map(WireCoord::unpack).collect();
        }

        if let Some(field) = &entry.influence {
            frame.influence = Some(field.clone());
        }
        if let Some(field) = &entry.gem_prediction {
            frame.gem_prediction = Some(field.clone());
        }

        if let Some(raw) = &entry.bots.debug_json {
            if let Some(extra) = DebugExtra::parse(raw) {
                frame.debug_extra = Some(extra);
            }
        }
    }

    let frames = accumulators
        .into_iter()
        .map(|(tick, mut frame)| {
            frame.tick = tick;
            frame
        })
        .collect();

    AggregatedRound { knowledge, frames }
}

#[cfg(test)]
mod tests {
    use super::aggregate_entries;
    use gem_replay_core::{BotData, GridConfig, GridPos, ProtocolEntry, WireCoord};

    fn entry_at(tick: u64, x: u32, y: u32) -> ProtocolEntry {
        ProtocolEntry {
            tick,
            bots: gem_replay_core::BotBlock {
                data: BotData {
                    bot: Some(WireCoord::Pair(vec![x, y])),
                    ..BotData::default()
                },
                debug_json: None,
            },
            ..ProtocolEntry::default()
        }
    }

    #[test]
    fn zero_entries_yield_an_empty_round() {
        let aggregate = aggregate_entries(&[]);
        assert!(aggregate.frames().is_empty());
        assert_eq!(aggregate.knowledge().wall_count(), 0);
        assert_eq!(aggregate.knowledge().width(), None);
        assert_eq!(aggregate.knowledge().height(), None);
    }

    #[test]
    fn frames_are_emitted_sorted_by_tick() {
        let entries = vec![entry_at(9, 1, 1), entry_at(2, 2, 2), entry_at(5, 3, 3)];
        let aggregate = aggregate_entries(&entries);

        let ticks: Vec<u64> = aggregate.frames().iter().map(|frame| frame.tick).collect();
        assert_eq!(ticks, vec![2, 5, 9]);
    }

    #[test]
    fn dimensions_resolve_from_the_first_config_block() {
        let mut first = entry_at(0, 0, 0);
        first.bots.data.config = Some(GridConfig {
            width: Some(19),
            height: Some(21),
        });
        let mut second = entry_at(1, 0, 1);
        second.bots.data.config = Some(GridConfig {
            width: Some(99),
            height: Some(99),
        });

        let aggregate = aggregate_entries(&[first, second]);
        assert_eq!(aggregate.knowledge().width(), Some(19));
        assert_eq!(aggregate.knowledge().height(), Some(21));
    }

    #[test]
    fn packed_wall_coordinates_are_unpacked_at_the_boundary() {
        let mut entry = entry_at(0, 0, 0);
        entry.bots.data.wall = vec![WireCoord::Packed((7 << 16) | 3), WireCoord::Pair(vec![1, 2])];

        let aggregate = aggregate_entries(&[entry]);
        assert!(aggregate.knowledge().is_wall(GridPos::new(3, 7)));
        assert!(aggregate.knowledge().is_wall(GridPos::new(1, 2)));
        assert_eq!(aggregate.knowledge().wall_count(), 2);
    }
}
