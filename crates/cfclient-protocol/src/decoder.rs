//! The command decoder.
//!
//! [`Decoder::decode`] turns one message payload into one [`Command`]. It
//! is a pure function of the message and the negotiated [`Capabilities`]:
//! it performs no I/O, holds no locks, and either returns the complete
//! command or an error. There is no partially decoded state for a caller
//! to observe.

use crate::command::{
    Command, ItemAdd, ItemName, ItemUpdate, ReplyInfo, SkillEntry, Spell, SpellUpdate, upd_item,
    upd_spell,
};
use crate::keyword::{Keyword, KeywordTrie, printable_prefix};
use crate::map2::decode_map2;
use crate::packet::PacketReader;
use crate::stats::{decode_stats, tag};
use crate::types::Capabilities;
use crate::ProtocolError;

/// Decodes inbound messages according to the negotiated capabilities.
#[derive(Debug, Clone, Default)]
pub struct Decoder {
    caps: Capabilities,
}

impl Decoder {
    pub fn new(caps: Capabilities) -> Self {
        Self { caps }
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    /// Replaces the negotiated parameters, typically once the setup echo
    /// has been accepted.
    pub fn set_capabilities(&mut self, caps: Capabilities) {
        self.caps = caps;
    }

    pub fn capabilities_mut(&mut self) -> &mut Capabilities {
        &mut self.caps
    }

    /// Decodes one complete message payload (without the length prefix).
    ///
    /// # Errors
    /// - [`ProtocolError::UnknownCommand`] if the keyword is not recognized.
    /// - [`ProtocolError::Truncated`] / [`ProtocolError::Malformed`] if the
    ///   arguments do not match the command's grammar.
    /// - [`ProtocolError::InactiveRevision`] for a command whose revision
    ///   was not negotiated.
    pub fn decode(&self, message: &[u8]) -> Result<Command, ProtocolError> {
        let Some((keyword, start)) = KeywordTrie::global().lookup(message) else {
            return Err(ProtocolError::UnknownCommand {
                prefix: printable_prefix(message),
            });
        };

        let mut r = PacketReader::new(keyword.as_str(), &message[start..]);
        let command = self.decode_args(keyword, &mut r)?;
        tracing::trace!(command = keyword.as_str(), len = message.len(), "decoded");
        Ok(command)
    }

    fn decode_args(
        &self,
        keyword: Keyword,
        r: &mut PacketReader<'_>,
    ) -> Result<Command, ProtocolError> {
        let command = match keyword {
            Keyword::AddmeFailed => Command::AddmeFailed,
            Keyword::AddmeSuccess => Command::AddmeSuccess,
            Keyword::AddSpell => {
                self.require_spellmon(r)?;
                Command::AddSpell(addspell(r)?)
            }
            Keyword::Anim => anim(r)?,
            Keyword::Comc => {
                let packet = r.u16()?;
                let time = r.u32()?;
                r.finish()?;
                Command::Comc { packet, time }
            }
            Keyword::DelInv => Command::DelInv { tag: r.trailing_decimal()? },
            Keyword::DelItem => {
                if r.remaining() % 4 != 0 {
                    return Err(r.malformed("length is not a multiple of 4"));
                }
                let mut tags = Vec::with_capacity(r.remaining() / 4);
                while r.has_remaining() {
                    tags.push(r.u32()?);
                }
                Command::DelItem { tags }
            }
            Keyword::DelSpell => {
                self.require_spellmon(r)?;
                let tag = r.u32()?;
                r.finish()?;
                Command::DelSpell { tag }
            }
            Keyword::DrawExtInfo => Command::DrawExtInfo {
                color: r.decimal()?,
                kind: r.decimal()?,
                subtype: r.decimal()?,
                message: r.rest_string(),
            },
            Keyword::DrawInfo => Command::DrawInfo {
                color: r.decimal()?,
                text: r.rest_string(),
            },
            Keyword::ExtendedInfoSet => Command::ExtendedInfoSet { words: words(r) },
            Keyword::ExtendedTextSet => Command::ExtendedTextSet { types: words(r) },
            Keyword::Face2 => Command::Face2 {
                face: r.u16()?,
                face_set: r.u8()?,
                checksum: r.u32()?,
                name: r.rest_string(),
            },
            Keyword::Failure => {
                let full = r.rest_string();
                let (command, message) = match full.split_once(' ') {
                    Some((c, m)) => (c.to_string(), m.to_string()),
                    None => (full, String::new()),
                };
                Command::Failure { command, message }
            }
            Keyword::Goodbye => {
                r.finish()?;
                Command::Goodbye
            }
            Keyword::Image2 => {
                let face = r.u32()?;
                let face_set = r.u8()?;
                let len = r.u32()? as usize;
                let data = r.take(len)?.to_vec();
                r.finish()?;
                Command::Image2 { face, face_set, data }
            }
            Keyword::Item2 => item2(r)?,
            Keyword::MagicMap => magicmap(r)?,
            Keyword::Map2 => Command::Map2(decode_map2(r.rest())?),
            Keyword::Music => Command::Music { name: r.rest_string() },
            Keyword::NewMap => {
                r.finish()?;
                Command::NewMap(self.caps.map_size)
            }
            Keyword::Pickup => {
                let flags = r.u32()?;
                r.finish()?;
                Command::Pickup { flags }
            }
            Keyword::Player => {
                let tag = r.u32()?;
                let weight = r.u32()?;
                let face = r.u32()?;
                let name = r.string8()?;
                r.finish()?;
                Command::Player { tag, weight, face, name }
            }
            Keyword::Query => Command::Query {
                flags: r.decimal()?,
                text: r.rest_string(),
            },
            Keyword::ReplyInfo => Command::ReplyInfo(replyinfo(r)?),
            Keyword::Setup => setup(r)?,
            Keyword::Smooth => {
                let face = r.u16()?;
                let smooth_face = r.u16()?;
                r.finish()?;
                Command::Smooth { face, smooth_face }
            }
            Keyword::Sound => {
                if !self.caps.sound.accepts_v1() {
                    return Err(ProtocolError::InactiveRevision { command: r.command() });
                }
                let command = Command::Sound {
                    x: r.i8()?,
                    y: r.i8()?,
                    num: r.u16()?,
                    kind: r.u8()?,
                };
                r.finish()?;
                command
            }
            Keyword::Sound2 => {
                if !self.caps.sound.accepts_v2() {
                    return Err(ProtocolError::InactiveRevision { command: r.command() });
                }
                let command = Command::Sound2 {
                    x: r.i8()?,
                    y: r.i8()?,
                    dir: r.i8()?,
                    volume: r.u8()?,
                    kind: r.u8()?,
                    action: r.string8()?,
                    name: r.string8()?,
                };
                r.finish()?;
                command
            }
            Keyword::Stats => Command::Stats(decode_stats(r)?),
            Keyword::Tick => {
                let tick = r.u32()?;
                r.finish()?;
                Command::Tick { tick }
            }
            Keyword::UpdItem => Command::UpdItem(upditem(r)?),
            Keyword::UpdSpell => {
                self.require_spellmon(r)?;
                Command::UpdSpell(updspell(r)?)
            }
            Keyword::Version => Command::Version {
                client: r.decimal()?,
                server: r.decimal()?,
                info: r.rest_string(),
            },
        };
        Ok(command)
    }

    fn require_spellmon(&self, r: &PacketReader<'_>) -> Result<(), ProtocolError> {
        if self.caps.spellmon {
            Ok(())
        } else {
            Err(ProtocolError::InactiveRevision { command: r.command() })
        }
    }
}

// ---------------------------------------------------------------------------
// Per-command grammars
// ---------------------------------------------------------------------------

fn addspell(r: &mut PacketReader<'_>) -> Result<Vec<Spell>, ProtocolError> {
    let mut spells = Vec::new();
    while r.has_remaining() {
        spells.push(Spell {
            tag: r.u32()?,
            level: r.u16()?,
            casting_time: r.u16()?,
            mana: r.u16()?,
            grace: r.u16()?,
            damage: r.u16()?,
            skill: r.u8()?,
            path: r.u32()?,
            face: r.u32()?,
            name: r.string8()?,
            message: r.string16()?,
        });
    }
    Ok(spells)
}

fn anim(r: &mut PacketReader<'_>) -> Result<Command, ProtocolError> {
    let id = r.u16()?;
    let flags = r.u16()?;
    if r.remaining() < 2 {
        return Err(r.malformed("no faces"));
    }
    if r.remaining() % 2 != 0 {
        return Err(r.malformed("odd number of face bytes"));
    }
    if id & !0x1FFF != 0 {
        return Err(r.malformed(format!("invalid animation id {id}")));
    }
    let mut faces = Vec::with_capacity(r.remaining() / 2);
    while r.has_remaining() {
        faces.push(r.u16()?);
    }
    Ok(Command::Anim { id, flags, faces })
}

fn item2(r: &mut PacketReader<'_>) -> Result<Command, ProtocolError> {
    let location = r.u32()?;
    let mut items = Vec::new();
    while r.has_remaining() {
        let tag = r.u32()?;
        let flags = r.u32()?;
        let weight = r.u32()?;
        let face = r.u32()?;
        let name_len = r.u8()? as usize;
        let name = ItemName::from_wire(r.take(name_len)?);
        items.push(ItemAdd {
            tag,
            flags,
            weight,
            face,
            name,
            anim: r.u16()?,
            anim_speed: r.u8()?,
            count: r.u32()?,
            kind: r.u16()?,
        });
    }
    Ok(Command::Item2 { location, items })
}

fn upditem(r: &mut PacketReader<'_>) -> Result<ItemUpdate, ProtocolError> {
    let mask = r.u8()?;
    let tag = r.u32()?;
    let has = |bit: u8| mask & bit != 0;

    let location = if has(upd_item::LOCATION) { Some(r.u32()?) } else { None };
    let flags = if has(upd_item::FLAGS) { Some(r.u32()?) } else { None };
    let weight = if has(upd_item::WEIGHT) { Some(r.u32()?) } else { None };
    let face = if has(upd_item::FACE) { Some(r.u32()?) } else { None };
    let name = if has(upd_item::NAME) {
        let len = r.u8()? as usize;
        Some(ItemName::from_wire(r.take(len)?))
    } else {
        None
    };
    let anim = if has(upd_item::ANIM) { Some(r.u16()?) } else { None };
    let anim_speed = if has(upd_item::ANIMSPEED) { Some(r.u8()?) } else { None };
    let count = if has(upd_item::NROF) { Some(r.u32()?) } else { None };
    r.finish()?;

    Ok(ItemUpdate {
        mask,
        tag,
        location,
        flags,
        weight,
        face,
        name,
        anim,
        anim_speed,
        count,
    })
}

fn updspell(r: &mut PacketReader<'_>) -> Result<SpellUpdate, ProtocolError> {
    let mask = r.u8()?;
    let tag = r.u32()?;
    let mana = if mask & upd_spell::MANA != 0 { Some(r.u16()?) } else { None };
    let grace = if mask & upd_spell::GRACE != 0 { Some(r.u16()?) } else { None };
    let damage = if mask & upd_spell::DAMAGE != 0 { Some(r.u16()?) } else { None };
    r.finish()?;
    Ok(SpellUpdate { mask, tag, mana, grace, damage })
}

fn magicmap(r: &mut PacketReader<'_>) -> Result<Command, ProtocolError> {
    let width = r.signed_decimal()?;
    let height = r.signed_decimal()?;
    let px = r.signed_decimal()?;
    let py = r.signed_decimal()?;

    let (Ok(w), Ok(h)) = (usize::try_from(width), usize::try_from(height)) else {
        return Err(r.malformed(format!("negative size {width}x{height}")));
    };
    let expected = w
        .checked_mul(h)
        .ok_or_else(|| r.malformed(format!("size {width}x{height} overflows")))?;
    if r.remaining() < expected {
        return Err(r.truncated());
    }
    if r.remaining() > expected {
        return Err(r.malformed(format!(
            "{} data bytes for a {width}x{height} map",
            r.remaining()
        )));
    }
    let data = r.rest().to_vec();
    Ok(Command::MagicMap { width, height, px, py, data })
}

fn setup(r: &mut PacketReader<'_>) -> Result<Command, ProtocolError> {
    let text = r.rest_string();
    let tokens: Vec<&str> = text.split(' ').filter(|t| !t.is_empty()).collect();
    if tokens.len() % 2 != 0 {
        return Err(r.malformed("odd number of arguments"));
    }
    let pairs = tokens
        .chunks_exact(2)
        .map(|pair| (pair[0].to_string(), pair[1].to_string()))
        .collect();
    Ok(Command::Setup(pairs))
}

fn words(r: &mut PacketReader<'_>) -> Vec<String> {
    r.rest_string()
        .split(' ')
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

// ---------------------------------------------------------------------------
// replyinfo
// ---------------------------------------------------------------------------

fn replyinfo(r: &mut PacketReader<'_>) -> Result<ReplyInfo, ProtocolError> {
    let mut kind = Vec::new();
    while let Some(b) = r.peek() {
        if b == b'\n' || b == b' ' {
            break;
        }
        kind.push(r.u8()?);
    }
    if r.has_remaining() {
        r.u8()?;
    }
    let kind = String::from_utf8_lossy(&kind).into_owned();

    match kind.as_str() {
        "image_info" => image_info(r),
        "skill_info" => Ok(ReplyInfo::SkillInfo(skill_info(r))),
        "exp_table" => exp_table(r),
        _ => {
            tracing::warn!(kind = %kind, "ignoring unexpected replyinfo type");
            r.rest();
            Ok(ReplyInfo::Other { kind })
        }
    }
}

fn image_info(r: &mut PacketReader<'_>) -> Result<ReplyInfo, ProtocolError> {
    let text = r.rest_string();
    let first = text.lines().next().ok_or_else(|| r.truncated())?;
    let faces = first
        .trim()
        .parse()
        .map_err(|_| r.malformed(format!("invalid image_info face count {first:?}")))?;
    Ok(ReplyInfo::ImageInfo { faces })
}

/// Parses `id:name[:face]` lines. Lines that cannot be used are skipped
/// with a warning; the server's list is advisory.
fn skill_info(r: &mut PacketReader<'_>) -> Vec<SkillEntry> {
    let skill_range = u32::from(tag::SKILL_START)..u32::from(tag::SKILL_START + tag::NUM_SKILLS);
    let text = r.rest_string();
    let mut skills = Vec::new();

    for line in text.lines().filter(|l| !l.is_empty()) {
        let sep = if line.contains(':') { ':' } else { '.' };
        let mut parts = line.splitn(3, sep);
        let (Some(id), Some(name)) = (parts.next(), parts.next()) else {
            tracing::warn!(line, "ignoring invalid skill definition");
            continue;
        };
        let Ok(id) = id.trim().parse::<u32>() else {
            tracing::warn!(line, "ignoring skill definition with invalid id");
            continue;
        };
        if !skill_range.contains(&id) {
            tracing::warn!(line, id, "ignoring skill definition with out-of-range id");
            continue;
        }
        let face = match parts.next() {
            Some(f) => match f.trim().parse() {
                Ok(face) => Some(face),
                Err(_) => {
                    tracing::warn!(line, "ignoring skill definition with invalid face");
                    continue;
                }
            },
            None => None,
        };
        skills.push(SkillEntry {
            id: id as u8,
            name: name.to_string(),
            face,
        });
    }
    skills
}

/// `count:2` followed by the thresholds for levels `1..count`. Level 0
/// needs no experience and is not transmitted.
fn exp_table(r: &mut PacketReader<'_>) -> Result<ReplyInfo, ProtocolError> {
    let count = r.u16()? as usize;
    let mut table = Vec::with_capacity(count);
    if count > 0 {
        table.push(0);
    }
    for _ in 1..count {
        table.push(r.u64()?);
    }
    if r.has_remaining() {
        tracing::warn!(excess = r.remaining(), "ignoring excess data at end of exp_table");
        r.rest();
    }
    Ok(ReplyInfo::ExpTable(table))
}
