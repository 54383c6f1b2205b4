#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Gem Replay engine.
//!
//! This crate defines the two data models the rest of the workspace is built
//! on. The *raw* model ([`SessionRecord`], [`RoundRecord`], [`ProtocolEntry`])
//! mirrors the trace document exactly as the external simulation runner
//! writes it, including its redundancies: a round's protocol may contain
//! several entries for the same tick, entries arrive unsorted, and most
//! fields are optional. The *canonical* model ([`TickFrame`], [`DebugExtra`],
//! [`WorldKnowledge`]) is what systems derive from the raw model: one frame
//! per tick, monotonic world facts, explicit `(x, y)` coordinates.
//!
//! Coordinates may appear on the wire either as `[x, y]` pairs or as a
//! single integer packing `y << 16 | x`. Both forms decode into [`GridPos`]
//! at this boundary so nothing downstream reasons about bit-packed values.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Deserializer, Serialize};

/// Number of ticks a gem persists after spawning before it expires.
///
/// The analytics estimator inverts the scoring model around this constant,
/// so it must match the value the recorded simulation ran with.
pub const GEM_TTL: u32 = 300;

/// Location of a single maze cell expressed as explicit x/y coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPos {
    x: u32,
    y: u32,
}

impl GridPos {
    /// Creates a new grid position.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Horizontal cell index, increasing to the right.
    #[must_use]
    pub const fn x(&self) -> u32 {
        self.x
    }

    /// Vertical cell index, increasing downward.
    #[must_use]
    pub const fn y(&self) -> u32 {
        self.y
    }

    /// Unpacks a coordinate stored as `y << 16 | x`.
    #[must_use]
    pub const fn from_packed(packed: u32) -> Self {
        Self {
            x: packed & 0xFFFF,
            y: packed >> 16,
        }
    }
}

/// Coordinate exactly as it appears on the wire.
///
/// The runner emits most coordinates as `[x, y]` pairs but some surfaces
/// (visibility sets, floor tiles) as packed integers. Extra elements after
/// the first two of a pair are tolerated and ignored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireCoord {
    /// Explicit `[x, y, ..]` pair form.
    Pair(Vec<u32>),
    /// Packed `y << 16 | x` single-integer form.
    Packed(u32),
}

impl WireCoord {
    /// Resolves the wire value into an explicit grid position.
    ///
    /// Returns `None` for pairs with fewer than two elements.
    #[must_use]
    pub fn unpack(&self) -> Option<GridPos> {
        match self {
            Self::Pair(values) => match (values.first(), values.get(1)) {
                (Some(&x), Some(&y)) => Some(GridPos::new(x, y)),
                _ => None,
            },
            Self::Packed(packed) => Some(GridPos::from_packed(*packed)),
        }
    }
}

/// Row-major grid of per-cell scalar values copied through from the trace.
pub type ScalarField = Vec<Vec<f64>>;

fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    let value = Option::<T>::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}

/// One recorded multi-round simulation run, exactly as loaded from disk.
///
/// Every field degrades to a null/zero/empty default when absent so that
/// traces from the baseline runner (which omits most of them) still load.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionRecord {
    /// Unix timestamp (seconds) at which the session was recorded.
    #[serde(deserialize_with = "null_default")]
    pub timestamp: i64,
    /// Machine-readable identifier of the stage preset that was run.
    #[serde(deserialize_with = "null_default")]
    pub stage_key: String,
    /// Human-readable title of the stage preset.
    #[serde(deserialize_with = "null_default")]
    pub stage_title: String,
    /// Seed the session was launched with.
    #[serde(deserialize_with = "null_default")]
    pub seed: i64,
    /// Display name of the recorded bot.
    #[serde(deserialize_with = "null_default")]
    pub name: String,
    /// Emoji badge the bot registered with.
    #[serde(deserialize_with = "null_default")]
    pub emoji: String,
    /// Sum of all round scores.
    #[serde(deserialize_with = "null_default")]
    pub total_score: i64,
    /// Mean gem utilization percentage across rounds, when the runner
    /// computed session-level statistics.
    pub gem_utilization_mean: Option<f64>,
    /// Coefficient of variation of gem utilization across rounds.
    pub gem_utilization_cv: Option<f64>,
    /// Mean floor coverage percentage across rounds.
    pub floor_coverage_mean: Option<f64>,
    /// Git revision of the simulation runner that produced the trace.
    #[serde(deserialize_with = "null_default")]
    pub git_hash: String,
    /// Per-round records in play order.
    #[serde(deserialize_with = "null_default")]
    pub rounds: Vec<RoundRecord>,
}

/// One round of the recorded session.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoundRecord {
    /// Seed the round was played with.
    #[serde(deserialize_with = "null_default")]
    pub seed: i64,
    /// Final score of the round.
    #[serde(deserialize_with = "null_default")]
    pub score: i64,
    /// Gem utilization percentage, when the runner reported it.
    pub gem_utilization: Option<f64>,
    /// Floor coverage percentage, when the runner reported it.
    pub floor_coverage: Option<f64>,
    /// Tick of the first gem capture, when one occurred.
    pub ticks_to_first_capture: Option<u64>,
    /// Disqualification reason, when the bot was disqualified.
    pub disqualified_for: Option<String>,
    /// Bot response-time statistics in nanoseconds.
    #[serde(deserialize_with = "null_default")]
    pub response_time_stats: ResponseTimeStats,
    /// Unprocessed per-tick log emitted by the enhanced runner. Empty for
    /// baseline-runner traces. Entries are unsorted and several may carry
    /// the same tick number.
    #[serde(deserialize_with = "null_default")]
    pub debug_protocol: Vec<ProtocolEntry>,
}

/// Bot response-time statistics for one round, in nanoseconds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseTimeStats {
    /// Response time of the first tick.
    pub first: Option<u64>,
    /// Fastest observed response.
    pub min: Option<u64>,
    /// Median observed response.
    pub median: Option<u64>,
    /// Slowest observed response.
    pub max: Option<u64>,
}

/// One raw per-tick record as emitted by the runner.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolEntry {
    /// Tick number the record describes.
    #[serde(deserialize_with = "null_default")]
    pub tick: u64,
    /// Bot-visible state captured for this record.
    #[serde(deserialize_with = "null_default")]
    pub bots: BotBlock,
    /// Snapshot of every live gem at this tick, when the runner emitted one.
    #[serde(deserialize_with = "null_default")]
    pub all_gems: Vec<GemSnapshot>,
    /// Cells within the bot's field of view.
    #[serde(deserialize_with = "null_default")]
    pub fov: Vec<WireCoord>,
    /// Gem influence map, when the runner emitted one.
    pub influence: Option<ScalarField>,
    /// Gem spawn prediction map, when the runner emitted one.
    pub gem_prediction: Option<ScalarField>,
}

/// Bot-visible portion of a protocol entry.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotBlock {
    /// Structured bot observation data.
    #[serde(deserialize_with = "null_default")]
    pub data: BotData,
    /// Nested debug payload encoded as a JSON string. May be absent or
    /// malformed; decoding it must never abort processing of the round.
    pub debug_json: Option<String>,
}

/// Structured observation data inside a protocol entry.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotData {
    /// Maze dimensions, present on at least the first entry of a round.
    pub config: Option<GridConfig>,
    /// Bot position at this tick, when known.
    pub bot: Option<WireCoord>,
    /// Wall cells discovered by this record.
    #[serde(deserialize_with = "null_default")]
    pub wall: Vec<WireCoord>,
}

/// Maze dimensions carried by a protocol entry's config block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Number of cell columns in the maze.
    pub width: Option<u32>,
    /// Number of cell rows in the maze.
    pub height: Option<u32>,
}

/// Position and remaining lifetime of one live gem.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GemSnapshot {
    /// Cell the gem occupies.
    pub position: Option<WireCoord>,
    /// Remaining ticks before the gem expires.
    pub ttl: Option<u32>,
}

/// Nested debug payload as decoded from a [`BotBlock::debug_json`] string.
///
/// This is a wire type; [`DebugExtra`] is its canonical counterpart.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugPayload {
    /// Highlight directives: `[x, y]` or `[x, y, color]` arrays.
    #[serde(deserialize_with = "null_default")]
    pub highlight: Vec<serde_json::Value>,
    /// Cells the bot's internal state gained and lost this tick.
    pub state_delta: Option<StateDeltaPayload>,
    /// Free-form description of the decision the bot took.
    pub decision: Option<String>,
    /// Route the bot planned to follow.
    #[serde(deserialize_with = "null_default")]
    pub path: Vec<WireCoord>,
    /// Arbitrary memory dump attached by the bot.
    pub memory: Option<serde_json::Value>,
}

/// Wire form of a state delta inside the nested debug payload.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateDeltaPayload {
    /// Cells added to the bot's internal state.
    #[serde(deserialize_with = "null_default")]
    pub added: Vec<WireCoord>,
    /// Cells removed from the bot's internal state.
    #[serde(deserialize_with = "null_default")]
    pub removed: Vec<WireCoord>,
}

/// Canonical, deduplicated per-tick snapshot of world-visible state.
///
/// Exactly one frame exists per tick number within a round. Fields reflect
/// only raw entries for that exact tick: a `None` bot position means no
/// entry for the tick carried one, never that a neighboring tick's value
/// was carried forward.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickFrame {
    /// Tick number the frame describes.
    pub tick: u64,
    /// Bot position at this tick, when any raw entry carried one.
    pub bot_position: Option<GridPos>,
    /// Live gems at this tick. Empty when no entry carried a snapshot.
    pub gems: Vec<GridPos>,
    /// Cells within the bot's field of view at this tick.
    pub fov: Vec<GridPos>,
    /// Gem influence map copied through from the trace.
    pub influence: Option<ScalarField>,
    /// Gem spawn prediction map copied through from the trace.
    pub gem_prediction: Option<ScalarField>,
    /// Decoded debug payload. `None` when the payload was absent or
    /// malformed for every entry of this tick.
    pub debug_extra: Option<DebugExtra>,
}

/// Canonical decoded form of the nested debug payload.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DebugExtra {
    /// Cells to highlight, each with an optional color string.
    pub highlight: Vec<HighlightCell>,
    /// Cells the bot's internal state gained and lost this tick.
    pub state_delta: Option<StateDelta>,
    /// Free-form description of the decision the bot took.
    pub decision: Option<String>,
    /// Route the bot planned to follow.
    pub path: Vec<GridPos>,
    /// Arbitrary memory dump attached by the bot.
    pub memory: Option<serde_json::Value>,
}

impl DebugExtra {
    /// Decodes a nested debug payload string.
    ///
    /// This is the single point where the payload is parsed. Returns `None`
    /// on any parse failure so a malformed payload costs exactly one tick's
    /// debug annotations and nothing else.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let payload: DebugPayload = serde_json::from_str(raw).ok()?;
        Some(Self::from_payload(payload))
    }

    /// Converts the wire payload into its canonical form, dropping
    /// coordinates that cannot be resolved.
    #[must_use]
    pub fn from_payload(payload: DebugPayload) -> Self {
        let highlight = payload
            .highlight
            .iter()
            .filter_map(highlight_cell)
            .collect();
        let state_delta = payload.state_delta.map(|delta| StateDelta {
            added: unpack_all(&delta.added),
            removed: unpack_all(&delta.removed),
        });

        Self {
            highlight,
            state_delta,
            decision: payload.decision,
            path: unpack_all(&payload.path),
            memory: payload.memory,
        }
    }
}

fn unpack_all(coords: &[WireCoord]) -> Vec<GridPos> {
    coords.iter().filter_map(WireCoord::unpack).collect()
}

fn highlight_cell(value: &serde_json::Value) -> Option<HighlightCell> {
    let items = value.as_array()?;
    let x = u32::try_from(items.first()?.as_u64()?).ok()?;
    let y = u32::try_from(items.get(1)?.as_u64()?).ok()?;
    let color = items
        .get(2)
        .and_then(serde_json::Value::as_str)
        .map(str::to_owned);

    Some(HighlightCell {
        cell: GridPos::new(x, y),
        color,
    })
}

/// One highlight directive: a cell plus an optional color string.
#[derive(Clone, Debug, PartialEq)]
pub struct HighlightCell {
    /// Cell to highlight.
    pub cell: GridPos,
    /// Color requested by the payload, uninterpreted. Resolution to an
    /// actual color (including the fallback for invalid values) belongs to
    /// the render projection.
    pub color: Option<String>,
}

/// Cells the bot's internal state gained and lost within one tick.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StateDelta {
    /// Cells added to the bot's internal state.
    pub added: Vec<GridPos>,
    /// Cells removed from the bot's internal state.
    pub removed: Vec<GridPos>,
}

/// Monotonic world facts accumulated from every raw entry of a round.
///
/// Walls and visit counts only ever grow while a round's entries are folded,
/// and they are independent of which tick is currently selected. Dimensions
/// resolve once from the first entry carrying a config block and are never
/// overwritten afterward.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WorldKnowledge {
    walls: HashSet<GridPos>,
    visits: HashMap<GridPos, u32>,
    width: Option<u32>,
    height: Option<u32>,
}

impl WorldKnowledge {
    /// Creates empty world knowledge with unresolved dimensions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves the maze dimensions if they are still unknown.
    ///
    /// Each axis latches independently on its first non-`None` value;
    /// later calls never overwrite a resolved axis.
    pub fn resolve_dimensions(&mut self, width: Option<u32>, height: Option<u32>) {
        if self.width.is_none() {
            self.width = width;
        }
        if self.height.is_none() {
            self.height = height;
        }
    }

    /// Records a discovered wall cell. The wall set never shrinks.
    pub fn record_wall(&mut self, cell: GridPos) {
        let _ = self.walls.insert(cell);
    }

    /// Increments the visit count for a cell the bot occupied.
    pub fn record_visit(&mut self, cell: GridPos) {
        *self.visits.entry(cell).or_insert(0) += 1;
    }

    /// Reports whether the cell is a known wall.
    #[must_use]
    pub fn is_wall(&self, cell: GridPos) -> bool {
        self.walls.contains(&cell)
    }

    /// Number of distinct wall cells discovered so far.
    #[must_use]
    pub fn wall_count(&self) -> usize {
        self.walls.len()
    }

    /// Iterator over the discovered wall cells in unspecified order.
    pub fn walls(&self) -> impl Iterator<Item = &GridPos> {
        self.walls.iter()
    }

    /// Number of entries in which the bot occupied the cell.
    #[must_use]
    pub fn visit_count(&self, cell: GridPos) -> u32 {
        self.visits.get(&cell).copied().unwrap_or(0)
    }

    /// Highest visit count across all cells, or zero when nothing was
    /// visited.
    #[must_use]
    pub fn max_visits(&self) -> u32 {
        self.visits.values().copied().max().unwrap_or(0)
    }

    /// Resolved maze width in cells, when a config block has been seen.
    #[must_use]
    pub const fn width(&self) -> Option<u32> {
        self.width
    }

    /// Resolved maze height in cells, when a config block has been seen.
    #[must_use]
    pub const fn height(&self) -> Option<u32> {
        self.height
    }
}

#[cfg(test)]
mod tests {
    use super::{
        DebugExtra, GridPos, ProtocolEntry, ResponseTimeStats, SessionRecord, WireCoord,
        WorldKnowledge,
    };
    use serde::{de::DeserializeOwned, Serialize};

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn grid_pos_round_trips_through_bincode() {
        assert_round_trip(&GridPos::new(7, 11));
    }

    #[test]
    fn response_time_stats_round_trip_through_bincode() {
        let stats = ResponseTimeStats {
            first: Some(1_500_000),
            min: Some(900_000),
            median: Some(1_200_000),
            max: None,
        };
        assert_round_trip(&stats);
    }

    #[test]
    fn packed_coordinate_unpacks_into_x_and_y() {
        let packed = (9 << 16) | 4;
        assert_eq!(GridPos::from_packed(packed), GridPos::new(4, 9));
    }

    #[test]
    fn wire_coord_accepts_pair_and_packed_forms() {
        let pair: WireCoord = serde_json::from_str("[3, 5]").expect("pair form");
        assert_eq!(pair.unpack(), Some(GridPos::new(3, 5)));

        let packed: WireCoord = serde_json::from_str("327683").expect("packed form");
        assert_eq!(packed.unpack(), Some(GridPos::new(3, 5)));
    }

    #[test]
    fn wire_coord_pair_tolerates_extra_elements() {
        let coord: WireCoord = serde_json::from_str("[2, 6, 99]").expect("long pair");
        assert_eq!(coord.unpack(), Some(GridPos::new(2, 6)));
    }

    #[test]
    fn wire_coord_short_pair_unpacks_to_none() {
        let coord: WireCoord = serde_json::from_str("[2]").expect("short pair parses");
        assert_eq!(coord.unpack(), None);
    }

    #[test]
    fn session_record_defaults_every_missing_field() {
        let session: SessionRecord = serde_json::from_str("{}").expect("empty object");
        assert_eq!(session.total_score, 0);
        assert!(session.rounds.is_empty());
        assert!(session.gem_utilization_cv.is_none());
        assert!(session.stage_key.is_empty());
    }

    #[test]
    fn protocol_entry_tolerates_null_lists() {
        let entry: ProtocolEntry =
            serde_json::from_str(r#"{"tick": 3, "all_gems": null, "fov": null, "bots": null}"#)
                .expect("nulls degrade to defaults");
        assert_eq!(entry.tick, 3);
        assert!(entry.all_gems.is_empty());
        assert!(entry.fov.is_empty());
        assert!(entry.bots.debug_json.is_none());
    }

    #[test]
    fn debug_extra_parse_rejects_malformed_payloads() {
        assert_eq!(DebugExtra::parse("{not json"), None);
        assert_eq!(DebugExtra::parse(""), None);
    }

    #[test]
    fn debug_extra_parse_decodes_full_payload() {
        let raw = r#"{
            "highlight": [[1, 2, "#ff0000"], [3, 4], "bogus", [5]],
            "state_delta": {"added": [[1, 1]], "removed": [131074]},
            "decision": "seek",
            "path": [[0, 0], [0, 1]],
            "memory": {"visited": 12}
        }"#;
        let extra = DebugExtra::parse(raw).expect("payload decodes");

        assert_eq!(extra.highlight.len(), 2);
        assert_eq!(extra.highlight[0].cell, GridPos::new(1, 2));
        assert_eq!(extra.highlight[0].color.as_deref(), Some("#ff0000"));
        assert_eq!(extra.highlight[1].color, None);

        let delta = extra.state_delta.expect("delta decodes");
        assert_eq!(delta.added, vec![GridPos::new(1, 1)]);
        assert_eq!(delta.removed, vec![GridPos::new(2, 2)]);

        assert_eq!(extra.decision.as_deref(), Some("seek"));
        assert_eq!(extra.path, vec![GridPos::new(0, 0), GridPos::new(0, 1)]);
        assert!(extra.memory.is_some());
    }

    #[test]
    fn world_knowledge_dimensions_latch_on_first_resolution() {
        let mut knowledge = WorldKnowledge::new();
        knowledge.resolve_dimensions(Some(19), None);
        knowledge.resolve_dimensions(Some(40), Some(21));

        assert_eq!(knowledge.width(), Some(19));
        assert_eq!(knowledge.height(), Some(21));
    }

    #[test]
    fn world_knowledge_counts_repeat_visits() {
        let mut knowledge = WorldKnowledge::new();
        knowledge.record_visit(GridPos::new(2, 2));
        knowledge.record_visit(GridPos::new(2, 2));
        knowledge.record_visit(GridPos::new(3, 2));

        assert_eq!(knowledge.visit_count(GridPos::new(2, 2)), 2);
        assert_eq!(knowledge.visit_count(GridPos::new(3, 2)), 1);
        assert_eq!(knowledge.visit_count(GridPos::new(9, 9)), 0);
        assert_eq!(knowledge.max_visits(), 2);
    }
}
