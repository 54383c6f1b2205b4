use gem_replay_core::{
    BotBlock, BotData, GemSnapshot, GridConfig, GridPos, ProtocolEntry, WireCoord,
};
use gem_replay_system_aggregation::aggregate_entries;

fn bare_entry(tick: u64) -> ProtocolEntry {
    ProtocolEntry {
        tick,
        ..ProtocolEntry::default()
    }
}

fn bot_entry(tick: u64, x: u32, y: u32) -> ProtocolEntry {
    ProtocolEntry {
        tick,
        bots: BotBlock {
            data: BotData {
                bot: Some(WireCoord::Pair(vec![x, y])),
                ..BotData::default()
            },
            debug_json: None,
        },
        ..ProtocolEntry::default()
    }
}

fn walled(mut entry: ProtocolEntry, walls: &[(u32, u32)]) -> ProtocolEntry {
    entry.bots.data.wall = walls
        .iter()
        .map(|&(x, y)| WireCoord::Pair(vec![x, y]))
        .collect();
    entry
}

fn with_payload(mut entry: ProtocolEntry, payload: &str) -> ProtocolEntry {
    entry.bots.debug_json = Some(payload.to_owned());
    entry
}

fn sample_round() -> Vec<ProtocolEntry> {
    let mut first = bot_entry(0, 1, 1);
    first.bots.data.config = Some(GridConfig {
        width: Some(9),
        height: Some(7),
    });
    let first = walled(first, &[(0, 0), (0, 1)]);

    let second = walled(bot_entry(1, 1, 2), &[(0, 1), (0, 2)]);
    let third = with_payload(
        bot_entry(2, 2, 2),
        r#"{"decision": "collect", "path": [[2, 2], [3, 2]]}"#,
    );

    let mut fourth = bot_entry(3, 3, 2);
    fourth.all_gems = vec![
        GemSnapshot {
            position: Some(WireCoord::Pair(vec![5, 5])),
            ttl: Some(120),
        },
        GemSnapshot {
            position: None,
            ttl: None,
        },
    ];

    vec![first, second, third, fourth]
}

#[test]
fn aggregation_is_independent_of_entry_order() {
    let entries = sample_round();
    let baseline = aggregate_entries(&entries);

    let mut reversed = entries.clone();
    reversed.reverse();
    let mut rotated = entries.clone();
    rotated.rotate_left(2);

    for permutation in [reversed, rotated] {
        let aggregate = aggregate_entries(&permutation);
        assert_eq!(aggregate.knowledge(), baseline.knowledge());
        assert_eq!(aggregate.frames(), baseline.frames());
    }
}

#[test]
fn rerunning_aggregation_is_idempotent() {
    let entries = sample_round();
    assert_eq!(aggregate_entries(&entries), aggregate_entries(&entries));
}

#[test]
fn wall_set_never_shrinks_as_entries_fold() {
    let entries = sample_round();
    let mut previous = 0;

    for prefix in 1..=entries.len() {
        let walls = aggregate_entries(&entries[..prefix]).knowledge().wall_count();
        assert!(walls >= previous, "wall set shrank at prefix {prefix}");
        previous = walls;
    }
    assert_eq!(previous, 3);
}

#[test]
fn duplicate_ticks_merge_with_last_writer_winning() {
    let mut gems_only = bare_entry(4);
    gems_only.all_gems = vec![GemSnapshot {
        position: Some(WireCoord::Pair(vec![6, 6])),
        ttl: None,
    }];

    let entries = vec![bot_entry(4, 1, 1), gems_only, bot_entry(4, 2, 1)];
    let aggregate = aggregate_entries(&entries);

    assert_eq!(aggregate.frame_count(), 1);
    let frame = &aggregate.frames()[0];
    assert_eq!(frame.tick, 4);
    assert_eq!(frame.bot_position, Some(GridPos::new(2, 1)));
    assert_eq!(frame.gems, vec![GridPos::new(6, 6)]);

    // Both positioned entries count as visits even though they share a tick.
    assert_eq!(aggregate.knowledge().visit_count(GridPos::new(1, 1)), 1);
    assert_eq!(aggregate.knowledge().visit_count(GridPos::new(2, 1)), 1);
}

#[test]
fn bot_position_is_never_carried_across_ticks() {
    let entries = vec![bot_entry(0, 1, 1), bare_entry(1), bot_entry(2, 1, 3)];
    let aggregate = aggregate_entries(&entries);

    let positions: Vec<Option<GridPos>> = aggregate
        .frames()
        .iter()
        .map(|frame| frame.bot_position)
        .collect();
    assert_eq!(
        positions,
        vec![Some(GridPos::new(1, 1)), None, Some(GridPos::new(1, 3))]
    );
}

#[test]
fn gems_reflect_only_entries_for_that_exact_tick() {
    let mut with_gems = bot_entry(0, 1, 1);
    with_gems.all_gems = vec![GemSnapshot {
        position: Some(WireCoord::Pair(vec![4, 4])),
        ttl: Some(300),
    }];

    let aggregate = aggregate_entries(&[with_gems, bare_entry(1)]);
    assert_eq!(aggregate.frames()[0].gems, vec![GridPos::new(4, 4)]);
    assert!(aggregate.frames()[1].gems.is_empty());
}

#[test]
fn malformed_payload_voids_only_its_own_tick() {
    let entries = vec![
        with_payload(bot_entry(0, 1, 1), r#"{"decision": "north"}"#),
        with_payload(bot_entry(1, 1, 2), r#"{"decision": "north"}"#),
        with_payload(bot_entry(2, 1, 3), "{broken payload"),
        with_payload(bot_entry(3, 1, 4), r#"{"decision": "south"}"#),
        with_payload(bot_entry(4, 1, 5), r#"{"decision": "south"}"#),
    ];

    let aggregate = aggregate_entries(&entries);
    assert_eq!(aggregate.frame_count(), 5);

    let frames = aggregate.frames();
    assert!(frames[2].debug_extra.is_none());
    for index in [0, 1, 3, 4] {
        let extra = frames[index]
            .debug_extra
            .as_ref()
            .unwrap_or_else(|| panic!("frame {index} should keep its payload"));
        assert!(extra.decision.is_some());
    }
    assert_eq!(frames[2].bot_position, Some(GridPos::new(1, 3)));
}

#[test]
fn fov_and_scalar_fields_copy_through() {
    let mut entry = bot_entry(0, 2, 2);
    entry.fov = vec![WireCoord::Pair(vec![2, 2]), WireCoord::Packed((3 << 16) | 2)];
    entry.influence = Some(vec![vec![0.0, 0.5], vec![1.0, 0.25]]);
    entry.gem_prediction = Some(vec![vec![0.1, 0.2], vec![0.3, 0.4]]);

    let aggregate = aggregate_entries(&[entry]);
    let frame = &aggregate.frames()[0];

    assert_eq!(frame.fov, vec![GridPos::new(2, 2), GridPos::new(2, 3)]);
    assert!(frame.influence.is_some());
    assert!(frame.gem_prediction.is_some());
}
