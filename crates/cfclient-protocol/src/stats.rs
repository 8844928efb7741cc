//! The `stats` command.
//!
//! A `stats` payload is a self-describing stream of `(tag, value)` pairs.
//! The tag byte alone decides how wide the value is:
//!
//! | tags | value |
//! |---|---|
//! | 1–10, 12–16, 18, 22–25, 32–54 | 2 bytes, signed |
//! | 11, 17, 19, 26, 29–31 | 4 bytes, signed |
//! | 28 | 8 bytes, signed |
//! | 20, 21 | 1-byte length + string |
//! | 100–117 (resistances) | 2 bytes, signed |
//! | 140–189 (skills) | level: 1 byte, experience: 8 bytes |
//!
//! Any other tag is a malformed message: the width of its value is unknown,
//! so the rest of the stream cannot be parsed.

use crate::ProtocolError;
use crate::packet::PacketReader;

/// Stat tags that have a name of their own.
pub mod tag {
    pub const HP: u8 = 1;
    pub const MAXHP: u8 = 2;
    pub const SP: u8 = 3;
    pub const MAXSP: u8 = 4;
    pub const STR: u8 = 5;
    pub const INT: u8 = 6;
    pub const WIS: u8 = 7;
    pub const DEX: u8 = 8;
    pub const CON: u8 = 9;
    pub const CHA: u8 = 10;
    pub const EXP: u8 = 11;
    pub const LEVEL: u8 = 12;
    pub const WC: u8 = 13;
    pub const AC: u8 = 14;
    pub const DAM: u8 = 15;
    pub const ARMOUR: u8 = 16;
    pub const SPEED: u8 = 17;
    pub const FOOD: u8 = 18;
    pub const WEAP_SP: u8 = 19;
    pub const RANGE: u8 = 20;
    pub const TITLE: u8 = 21;
    pub const POW: u8 = 22;
    pub const GRACE: u8 = 23;
    pub const MAXGRACE: u8 = 24;
    pub const FLAGS: u8 = 25;
    pub const WEIGHT_LIM: u8 = 26;
    pub const EXP64: u8 = 28;
    pub const SPELL_ATTUNE: u8 = 29;
    pub const SPELL_REPEL: u8 = 30;
    pub const SPELL_DENY: u8 = 31;
    pub const RACE_STR: u8 = 32;
    pub const GOLEM_MAXHP: u8 = 54;
    /// First resistance tag.
    pub const RESIST_START: u8 = 100;
    /// Number of resistance tags.
    pub const RESIST_TYPES: u8 = 18;
    /// First skill tag.
    pub const SKILL_START: u8 = 140;
    /// Number of skill tags.
    pub const NUM_SKILLS: u8 = 50;
}

/// How a tag's value is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatKind {
    Int2,
    Int4,
    Int8,
    Text,
    Resistance,
    Skill,
}

impl StatKind {
    /// Classifies `tag`, or returns `None` for a tag with no known width.
    pub fn of(tag: u8) -> Option<Self> {
        use self::tag::*;
        Some(match tag {
            HP..=CHA | LEVEL..=ARMOUR | FOOD | POW..=FLAGS | RACE_STR..=GOLEM_MAXHP => Self::Int2,
            EXP | SPEED | WEAP_SP | WEIGHT_LIM | SPELL_ATTUNE..=SPELL_DENY => Self::Int4,
            EXP64 => Self::Int8,
            RANGE | TITLE => Self::Text,
            t if (RESIST_START..RESIST_START + RESIST_TYPES).contains(&t) => Self::Resistance,
            t if (SKILL_START..SKILL_START + NUM_SKILLS).contains(&t) => Self::Skill,
            _ => return None,
        })
    }
}

/// A decoded stat value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatValue {
    Int2(i16),
    Int4(i32),
    Int8(i64),
    Text(String),
    Resistance(i16),
    Skill { level: u8, experience: i64 },
}

/// One `(tag, value)` pair of a `stats` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stat {
    pub tag: u8,
    pub value: StatValue,
}

/// Decodes the whole pair stream of a `stats` payload.
pub(crate) fn decode_stats(r: &mut PacketReader<'_>) -> Result<Vec<Stat>, ProtocolError> {
    let mut stats = Vec::new();
    while r.has_remaining() {
        let tag = r.u8()?;
        let kind = StatKind::of(tag).ok_or_else(|| r.malformed(format!("unknown stat tag {tag}")))?;
        let value = match kind {
            StatKind::Int2 => StatValue::Int2(r.i16()?),
            StatKind::Int4 => StatValue::Int4(r.i32()?),
            StatKind::Int8 => StatValue::Int8(r.i64()?),
            StatKind::Text => StatValue::Text(r.string8()?),
            StatKind::Resistance => StatValue::Resistance(r.i16()?),
            StatKind::Skill => StatValue::Skill {
                level: r.u8()?,
                experience: r.i64()?,
            },
        };
        stats.push(Stat { tag, value });
    }
    Ok(stats)
}
