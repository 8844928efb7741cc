//! Truncating a valid message must never produce a command.
//!
//! Each case is a complete, valid message plus the payload lengths at which
//! a shorter message is itself valid (for example a `stats` with no pairs).
//! Every other truncation must be rejected with an error, and the decoder
//! must not panic on any of them.

use cfclient_protocol::{Capabilities, Decoder, ProtocolError};

struct Case {
    message: Vec<u8>,
    /// Payload lengths (after `keyword `) that are valid on their own.
    valid_prefixes: &'static [usize],
}

fn msg(keyword: &str, parts: &[&[u8]]) -> Vec<u8> {
    let mut out = keyword.as_bytes().to_vec();
    out.push(b' ');
    for part in parts {
        out.extend_from_slice(part);
    }
    out
}

fn cases() -> Vec<Case> {
    vec![
        Case {
            message: msg("tick", &[&42u32.to_be_bytes()]),
            valid_prefixes: &[],
        },
        Case {
            message: msg("comc", &[&7u16.to_be_bytes(), &100u32.to_be_bytes()]),
            valid_prefixes: &[],
        },
        Case {
            message: msg("smooth", &[&5u16.to_be_bytes(), &6u16.to_be_bytes()]),
            valid_prefixes: &[],
        },
        Case {
            message: msg(
                "player",
                &[
                    &1u32.to_be_bytes(),
                    &2u32.to_be_bytes(),
                    &3u32.to_be_bytes(),
                    b"\x06Zelgar",
                ],
            ),
            valid_prefixes: &[],
        },
        Case {
            message: msg("sound2", &[b"\x01\x02\x03\x04\x05", b"\x04step", b"\x03orc"]),
            valid_prefixes: &[],
        },
        Case {
            message: msg(
                "image2",
                &[&9u32.to_be_bytes(), b"\x00", &3u32.to_be_bytes(), b"PNG"],
            ),
            valid_prefixes: &[],
        },
        Case {
            message: msg(
                "upditem",
                &[b"\x1C", &5u32.to_be_bytes(), &10u32.to_be_bytes(), &11u32.to_be_bytes(), b"\x03axe"],
            ),
            valid_prefixes: &[],
        },
        Case {
            message: msg(
                "item2",
                &[
                    &1u32.to_be_bytes(),
                    &2u32.to_be_bytes(),
                    &3u32.to_be_bytes(),
                    &4u32.to_be_bytes(),
                    &5u32.to_be_bytes(),
                    b"\x0Aring\0rings",
                    &0u16.to_be_bytes(),
                    b"\x00",
                    &1u32.to_be_bytes(),
                    &8u16.to_be_bytes(),
                ],
            ),
            // Location alone is an empty item list.
            valid_prefixes: &[4],
        },
        Case {
            message: msg(
                "addspell",
                &[
                    &77u32.to_be_bytes(),
                    &[0, 1, 0, 2, 0, 3, 0, 4, 0, 5],
                    b"\x09",
                    &6u32.to_be_bytes(),
                    &7u32.to_be_bytes(),
                    b"\x0Amagic bolt",
                    &4u16.to_be_bytes(),
                    b"zap!",
                ],
            ),
            valid_prefixes: &[0],
        },
        Case {
            message: msg("stats", &[&[1, 0, 10, 11, 0, 0, 1, 0, 20, 2, b'h', b'i']]),
            valid_prefixes: &[0, 3, 8],
        },
        Case {
            message: msg("anim", &[&5u16.to_be_bytes(), &0u16.to_be_bytes(), &9u16.to_be_bytes()]),
            valid_prefixes: &[],
        },
        Case {
            message: msg("map2", &[&[0x3C, 0xF0, 0x00, 0x21, 0x80, 0x70, 0x12, 0x34, 0x05, 0xFF]]),
            valid_prefixes: &[0],
        },
        Case {
            message: msg(
                "replyinfo",
                &[b"exp_table\n", &3u16.to_be_bytes(), &100u64.to_be_bytes(), &900u64.to_be_bytes()],
            ),
            // A cut inside the type name is a different, ignored reply type.
            valid_prefixes: &[0, 1, 2, 3, 4, 5, 6, 7, 8],
        },
        Case {
            message: msg("version", &[b"1023 1027 server"]),
            // Once both numbers are complete the info text may be empty.
            valid_prefixes: &[10, 11, 12, 13, 14, 15, 16],
        },
    ]
}

/// A decoder after a setup echo that enabled every optional command.
fn negotiated() -> Decoder {
    Decoder::new(Capabilities { spellmon: true, ..Capabilities::default() })
}

#[test]
fn test_full_messages_decode() {
    let decoder = negotiated();
    for case in cases() {
        let result = decoder.decode(&case.message);
        assert!(result.is_ok(), "{:?}: {result:?}", String::from_utf8_lossy(&case.message));
    }
}

#[test]
fn test_every_truncation_is_an_error() {
    let decoder = negotiated();
    for case in cases() {
        let keyword_len = case.message.iter().position(|&b| b == b' ').expect("keyword") + 1;
        for cut in keyword_len..case.message.len() {
            let payload_len = cut - keyword_len;
            if case.valid_prefixes.contains(&payload_len) {
                continue;
            }
            let result = decoder.decode(&case.message[..cut]);
            assert!(
                matches!(
                    result,
                    Err(ProtocolError::Truncated { .. } | ProtocolError::Malformed { .. })
                ),
                "{:?} cut at payload length {payload_len} gave {result:?}",
                String::from_utf8_lossy(&case.message)
            );
        }
    }
}

#[test]
fn test_garbage_never_panics() {
    let decoder = negotiated();
    let keywords = ["stats ", "map2 ", "item2 ", "upditem ", "replyinfo ", "magicmap ", "anim "];
    let mut state = 0x2545_F491_u32;
    for keyword in keywords {
        for len in 0..64 {
            let mut message = keyword.as_bytes().to_vec();
            for _ in 0..len {
                // xorshift keeps this deterministic without a dependency.
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                message.push(state as u8);
            }
            let _ = decoder.decode(&message);
        }
    }
}
