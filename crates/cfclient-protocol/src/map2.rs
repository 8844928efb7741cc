//! The `map2` sub-format: incremental updates to the visible map.
//!
//! A `map2` payload is a sequence of records, each introduced by a 2-byte
//! coordinate word:
//!
//! ```text
//!  15         10 9          4 3      0
//! ┌─────────────┬─────────────┬────────┐
//! │ x + 15 (6b) │ y + 15 (6b) │ kind   │
//! └─────────────┴─────────────┴────────┘
//! ```
//!
//! Kind 1 is a scroll by `(x, y)` with no further payload. Kind 0 is
//! followed by tile sub-records, each introduced by a length/type byte
//! (`len` in the top 3 bits, `type` in the low 5), until a `0xFF`
//! terminator:
//!
//! | type | len | payload |
//! |---|---|---|
//! | 0x00 | 0 | clear the cell |
//! | 0x01 | 1 | darkness byte |
//! | 0x10–0x19 | 2 | face/animation for layer `type - 0x10` |
//! | 0x10–0x19 | 3 | ... + smoothing byte (face) or speed byte (animation) |
//! | 0x10–0x19 | 4 | ... + speed byte, then smoothing byte |
//!
//! A face value with bit 15 set is an animation: the low 13 bits are the
//! animation id and bits 13–14 its type.
//!
//! Decoding produces the complete list of deltas first. Nothing is handed
//! to a consumer unless the whole payload was valid.

use crate::ProtocolError;
use crate::packet::PacketReader;

/// Bias added to x and y on the wire.
pub const COORD_OFFSET: i8 = 15;
/// Number of map layers addressable by a tile record.
pub const NUM_LAYERS: u8 = 10;

const COORD_TYPE_TILES: u16 = 0;
const COORD_TYPE_SCROLL: u16 = 1;

const TYPE_CLEAR: u8 = 0x00;
const TYPE_DARKNESS: u8 = 0x01;
const TYPE_LAYER0: u8 = 0x10;
const END_OF_CELL: u8 = 0xFF;

const FACE_ANIMATION: u16 = 0x8000;
const ANIM_MASK: u16 = 0x1FFF;
const ANIM_TYPE_SHIFT: u16 = 13;
const ANIM_TYPE_MASK: u16 = 0x3;

/// One decoded map change. Coordinates are relative to the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapDelta {
    Clear { x: i8, y: i8 },
    Darkness { x: i8, y: i8, darkness: u8 },
    /// A static face. Face 0 empties the layer.
    Face { x: i8, y: i8, layer: u8, face: u16 },
    Animation { x: i8, y: i8, layer: u8, animation: u16, anim_type: u8 },
    AnimationSpeed { x: i8, y: i8, layer: u8, speed: u8 },
    Smooth { x: i8, y: i8, layer: u8, smooth: u8 },
    /// The view moved; existing cells shift by `(-dx, -dy)`.
    Scroll { dx: i8, dy: i8 },
}

/// Decodes a complete `map2` payload.
///
/// # Errors
/// [`ProtocolError::Truncated`] if a record runs past the end of the
/// payload, [`ProtocolError::Malformed`] for an unknown coordinate kind,
/// unknown sub-type or inconsistent sub-record length.
pub fn decode_map2(payload: &[u8]) -> Result<Vec<MapDelta>, ProtocolError> {
    let mut r = PacketReader::new("map2", payload);
    let mut deltas = Vec::new();

    while r.has_remaining() {
        let coord = r.u16()?;
        let x = ((coord >> 10) & 0x3F) as i8 - COORD_OFFSET;
        let y = ((coord >> 4) & 0x3F) as i8 - COORD_OFFSET;
        match coord & 0xF {
            COORD_TYPE_TILES => decode_cell(&mut r, x, y, &mut deltas)?,
            COORD_TYPE_SCROLL => deltas.push(MapDelta::Scroll { dx: x, dy: y }),
            other => return Err(r.malformed(format!("unexpected coordinate type {other}"))),
        }
    }

    Ok(deltas)
}

fn decode_cell(
    r: &mut PacketReader<'_>,
    x: i8,
    y: i8,
    deltas: &mut Vec<MapDelta>,
) -> Result<(), ProtocolError> {
    loop {
        let len_type = r.u8()?;
        if len_type == END_OF_CELL {
            return Ok(());
        }
        let len = (len_type >> 5) & 0x7;
        let kind = len_type & 0x1F;

        match kind {
            TYPE_CLEAR => {
                if len != 0 {
                    return Err(r.malformed(format!("clear with length {len}")));
                }
                deltas.push(MapDelta::Clear { x, y });
            }
            TYPE_DARKNESS => {
                if len != 1 {
                    return Err(r.malformed(format!("darkness with length {len}")));
                }
                deltas.push(MapDelta::Darkness { x, y, darkness: r.u8()? });
            }
            k if (TYPE_LAYER0..TYPE_LAYER0 + NUM_LAYERS).contains(&k) => {
                decode_layer(r, x, y, k - TYPE_LAYER0, len, deltas)?;
            }
            other => return Err(r.malformed(format!("unknown tile type {other:#04x}"))),
        }
    }
}

fn decode_layer(
    r: &mut PacketReader<'_>,
    x: i8,
    y: i8,
    layer: u8,
    len: u8,
    deltas: &mut Vec<MapDelta>,
) -> Result<(), ProtocolError> {
    if !(2..=4).contains(&len) {
        return Err(r.malformed(format!("image with length {len}")));
    }

    let face = r.u16()?;
    let animated = face & FACE_ANIMATION != 0;
    if animated {
        deltas.push(MapDelta::Animation {
            x,
            y,
            layer,
            animation: face & ANIM_MASK,
            anim_type: ((face >> ANIM_TYPE_SHIFT) & ANIM_TYPE_MASK) as u8,
        });
    } else {
        deltas.push(MapDelta::Face { x, y, layer, face });
    }

    if len > 2 && face == 0 {
        return Err(r.malformed("smoothing or animation information for empty face"));
    }

    match len {
        3 if animated => deltas.push(MapDelta::AnimationSpeed { x, y, layer, speed: r.u8()? }),
        3 => deltas.push(MapDelta::Smooth { x, y, layer, smooth: r.u8()? }),
        4 => {
            deltas.push(MapDelta::AnimationSpeed { x, y, layer, speed: r.u8()? });
            deltas.push(MapDelta::Smooth { x, y, layer, smooth: r.u8()? });
        }
        _ => {}
    }
    Ok(())
}
