//! Map-delta round trips.
//!
//! Random cell updates are written with the inverse of the `map2` grammar
//! and fed back through the decoder, which must reproduce the same deltas
//! in the same order.

use cfclient_protocol::{COORD_OFFSET, Command, Decoder, MapDelta, NUM_LAYERS, decode_map2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// One sub-record of a tile cell.
#[derive(Debug, Clone)]
enum CellOp {
    Clear,
    Darkness(u8),
    Layer {
        layer: u8,
        value: u16,
        speed: Option<u8>,
        smooth: Option<u8>,
    },
}

#[derive(Debug, Clone)]
enum Record {
    Scroll { dx: i8, dy: i8 },
    Cell { x: i8, y: i8, ops: Vec<CellOp> },
}

fn coord_word(x: i8, y: i8, kind: u16) -> [u8; 2] {
    let word = (((x + COORD_OFFSET) as u16) << 10) | (((y + COORD_OFFSET) as u16) << 4) | kind;
    word.to_be_bytes()
}

/// Writes records using the wire grammar and returns the deltas a decoder
/// should produce for them.
fn encode(records: &[Record]) -> (Vec<u8>, Vec<MapDelta>) {
    let mut out = Vec::new();
    let mut expected = Vec::new();

    for record in records {
        match *record {
            Record::Scroll { dx, dy } => {
                out.extend_from_slice(&coord_word(dx, dy, 1));
                expected.push(MapDelta::Scroll { dx, dy });
            }
            Record::Cell { x, y, ref ops } => {
                out.extend_from_slice(&coord_word(x, y, 0));
                for op in ops {
                    match *op {
                        CellOp::Clear => {
                            out.push(0x00);
                            expected.push(MapDelta::Clear { x, y });
                        }
                        CellOp::Darkness(darkness) => {
                            out.extend_from_slice(&[0x21, darkness]);
                            expected.push(MapDelta::Darkness { x, y, darkness });
                        }
                        CellOp::Layer { layer, value, speed, smooth } => {
                            let animated = value & 0x8000 != 0;
                            let extra: Vec<u8> = match (speed, smooth) {
                                (Some(s), Some(m)) => vec![s, m],
                                (Some(s), None) => vec![s],
                                (None, Some(m)) => vec![m],
                                (None, None) => vec![],
                            };
                            let len = 2 + extra.len() as u8;
                            out.push((len << 5) | (0x10 + layer));
                            out.extend_from_slice(&value.to_be_bytes());
                            out.extend_from_slice(&extra);

                            if animated {
                                expected.push(MapDelta::Animation {
                                    x,
                                    y,
                                    layer,
                                    animation: value & 0x1FFF,
                                    anim_type: ((value >> 13) & 0x3) as u8,
                                });
                            } else {
                                expected.push(MapDelta::Face { x, y, layer, face: value });
                            }
                            if let Some(speed) = speed {
                                expected.push(MapDelta::AnimationSpeed { x, y, layer, speed });
                            }
                            if let Some(smooth) = smooth {
                                expected.push(MapDelta::Smooth { x, y, layer, smooth });
                            }
                        }
                    }
                }
                out.push(0xFF);
            }
        }
    }
    (out, expected)
}

fn random_op(rng: &mut StdRng) -> CellOp {
    match rng.random_range(0..3) {
        0 => CellOp::Clear,
        1 => CellOp::Darkness(rng.random()),
        _ => {
            let layer = rng.random_range(0..NUM_LAYERS);
            let animated = rng.random_bool(0.5);
            let value = if animated {
                0x8000 | (rng.random_range(0..4u16) << 13) | rng.random_range(1..0x2000u16)
            } else {
                rng.random_range(0..0x8000u16)
            };
            // Trailing bytes are only legal for non-empty faces, and a
            // length of 3 carries speed for animations, smoothing otherwise.
            let (speed, smooth) = if value == 0 {
                (None, None)
            } else {
                match (rng.random_range(0..3), animated) {
                    (0, _) => (None, None),
                    (1, true) => (Some(rng.random()), None),
                    (1, false) => (None, Some(rng.random())),
                    _ => (Some(rng.random()), Some(rng.random())),
                }
            };
            CellOp::Layer { layer, value, speed, smooth }
        }
    }
}

fn random_records(rng: &mut StdRng, count: usize) -> Vec<Record> {
    (0..count)
        .map(|_| {
            let x = rng.random_range(-15..=48i8);
            let y = rng.random_range(-15..=48i8);
            if rng.random_bool(0.1) {
                Record::Scroll { dx: x, dy: y }
            } else {
                let ops = (0..rng.random_range(0..5)).map(|_| random_op(rng)).collect();
                Record::Cell { x, y, ops }
            }
        })
        .collect()
}

#[test]
fn test_random_deltas_round_trip() {
    let mut rng = StdRng::seed_from_u64(0x6d61_7032);
    for _ in 0..500 {
        let count = rng.random_range(0..20);
        let records = random_records(&mut rng, count);
        let (payload, expected) = encode(&records);
        assert_eq!(decode_map2(&payload).unwrap(), expected, "records {records:?}");
    }
}

#[test]
fn test_round_trip_through_command_decoder() {
    let records = vec![
        Record::Cell {
            x: 0,
            y: 0,
            ops: vec![
                CellOp::Clear,
                CellOp::Darkness(128),
                CellOp::Layer { layer: 0, value: 42, speed: None, smooth: Some(3) },
                CellOp::Layer { layer: 1, value: 0xA001, speed: Some(2), smooth: Some(4) },
            ],
        },
        Record::Scroll { dx: 1, dy: -1 },
    ];
    let (payload, expected) = encode(&records);
    let mut message = b"map2 ".to_vec();
    message.extend_from_slice(&payload);

    assert_eq!(Decoder::default().decode(&message).unwrap(), Command::Map2(expected));
}

#[test]
fn test_every_truncation_of_a_cell_is_rejected() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..50 {
        let ops = (0..rng.random_range(1..5)).map(|_| random_op(&mut rng)).collect();
        let (payload, _) = encode(&[Record::Cell { x: 2, y: 3, ops }]);
        for cut in 1..payload.len() {
            assert!(
                decode_map2(&payload[..cut]).is_err(),
                "truncation at {cut} of {payload:?} decoded"
            );
        }
    }
}
