//! Decoded inbound commands.
//!
//! [`Command`] is a closed variant type: one variant per keyword, each
//! carrying exactly the fields its wire grammar defines. A consumer handles
//! whatever subset of variants it cares about with a single `match`.

use crate::map2::MapDelta;
use crate::stats::Stat;
use crate::types::MapSize;

// ---------------------------------------------------------------------------
// Payload records
// ---------------------------------------------------------------------------

/// An item name with its plural form.
///
/// On the wire both forms share one string, separated by a NUL byte. When
/// the plural is missing (or empty) it defaults to the singular.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemName {
    pub singular: String,
    pub plural: String,
}

impl ItemName {
    pub(crate) fn from_wire(raw: &[u8]) -> Self {
        let (singular, plural) = match raw.iter().position(|&b| b == 0) {
            Some(nul) => (&raw[..nul], &raw[nul + 1..]),
            None => (raw, &raw[raw.len()..]),
        };
        let singular = String::from_utf8_lossy(singular).into_owned();
        let plural = if plural.is_empty() {
            singular.clone()
        } else {
            String::from_utf8_lossy(plural).into_owned()
        };
        Self { singular, plural }
    }
}

/// One record of an `item2` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemAdd {
    pub tag: u32,
    pub flags: u32,
    pub weight: u32,
    pub face: u32,
    pub name: ItemName,
    pub anim: u16,
    pub anim_speed: u8,
    pub count: u32,
    /// The item's client type, used for sorting.
    pub kind: u16,
}

/// Field selectors of an `upditem` command.
pub mod upd_item {
    pub const LOCATION: u8 = 0x01;
    pub const FLAGS: u8 = 0x02;
    pub const WEIGHT: u8 = 0x04;
    pub const FACE: u8 = 0x08;
    pub const NAME: u8 = 0x10;
    pub const ANIM: u8 = 0x20;
    pub const ANIMSPEED: u8 = 0x40;
    pub const NROF: u8 = 0x80;
}

/// An `upditem` command. Only fields selected by `mask` are present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemUpdate {
    pub mask: u8,
    pub tag: u32,
    pub location: Option<u32>,
    pub flags: Option<u32>,
    pub weight: Option<u32>,
    pub face: Option<u32>,
    pub name: Option<ItemName>,
    pub anim: Option<u16>,
    pub anim_speed: Option<u8>,
    pub count: Option<u32>,
}

/// Field selectors of an `updspell` command.
pub mod upd_spell {
    pub const MANA: u8 = 0x01;
    pub const GRACE: u8 = 0x02;
    pub const DAMAGE: u8 = 0x04;
}

/// One record of an `addspell` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spell {
    pub tag: u32,
    pub level: u16,
    pub casting_time: u16,
    pub mana: u16,
    pub grace: u16,
    pub damage: u16,
    pub skill: u8,
    pub path: u32,
    pub face: u32,
    pub name: String,
    pub message: String,
}

/// An `updspell` command. Only fields selected by `mask` are present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpellUpdate {
    pub mask: u8,
    pub tag: u32,
    pub mana: Option<u16>,
    pub grace: Option<u16>,
    pub damage: Option<u16>,
}

/// One line of a `replyinfo skill_info` reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillEntry {
    /// The stats tag this skill reports under (140..190).
    pub id: u8,
    pub name: String,
    pub face: Option<u32>,
}

/// Typed payload of a `replyinfo` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyInfo {
    /// Number of faces the server knows.
    ImageInfo { faces: u32 },
    SkillInfo(Vec<SkillEntry>),
    /// Experience needed for each level. Index 0 is always 0.
    ExpTable(Vec<u64>),
    /// A reply type this engine does not interpret.
    Other { kind: String },
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

/// One decoded server-to-client message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    AddmeFailed,
    AddmeSuccess,
    AddSpell(Vec<Spell>),
    Anim {
        id: u16,
        flags: u16,
        faces: Vec<u16>,
    },
    Comc {
        packet: u16,
        time: u32,
    },
    DelInv {
        tag: u32,
    },
    DelItem {
        tags: Vec<u32>,
    },
    DelSpell {
        tag: u32,
    },
    DrawExtInfo {
        color: u32,
        kind: u32,
        subtype: u32,
        message: String,
    },
    DrawInfo {
        color: u32,
        text: String,
    },
    ExtendedInfoSet {
        words: Vec<String>,
    },
    ExtendedTextSet {
        types: Vec<String>,
    },
    Face2 {
        face: u16,
        face_set: u8,
        checksum: u32,
        name: String,
    },
    /// The server rejected a client command.
    Failure {
        command: String,
        message: String,
    },
    Goodbye,
    Image2 {
        face: u32,
        face_set: u8,
        data: Vec<u8>,
    },
    Item2 {
        location: u32,
        items: Vec<ItemAdd>,
    },
    MagicMap {
        width: i32,
        height: i32,
        px: i32,
        py: i32,
        /// `height` rows of `width` bytes.
        data: Vec<u8>,
    },
    /// Map deltas in wire order. Delivered to consumers as a
    /// begin/delta/end bracket, never as a bare command.
    Map2(Vec<MapDelta>),
    Music {
        name: String,
    },
    /// The player changed maps; carries the currently negotiated view size.
    NewMap(MapSize),
    Pickup {
        flags: u32,
    },
    Player {
        tag: u32,
        weight: u32,
        face: u32,
        name: String,
    },
    Query {
        flags: u32,
        text: String,
    },
    ReplyInfo(ReplyInfo),
    /// Option/value pairs echoed by the server.
    Setup(Vec<(String, String)>),
    Smooth {
        face: u16,
        smooth_face: u16,
    },
    Sound {
        x: i8,
        y: i8,
        num: u16,
        kind: u8,
    },
    Sound2 {
        x: i8,
        y: i8,
        dir: i8,
        volume: u8,
        kind: u8,
        action: String,
        name: String,
    },
    Stats(Vec<Stat>),
    Tick {
        tick: u32,
    },
    UpdItem(ItemUpdate),
    UpdSpell(SpellUpdate),
    Version {
        client: u32,
        server: u32,
        info: String,
    },
}

impl Command {
    /// The wire keyword of this command, for logging.
    pub fn keyword(&self) -> &'static str {
        match self {
            Command::AddmeFailed => "addme_failed",
            Command::AddmeSuccess => "addme_success",
            Command::AddSpell(_) => "addspell",
            Command::Anim { .. } => "anim",
            Command::Comc { .. } => "comc",
            Command::DelInv { .. } => "delinv",
            Command::DelItem { .. } => "delitem",
            Command::DelSpell { .. } => "delspell",
            Command::DrawExtInfo { .. } => "drawextinfo",
            Command::DrawInfo { .. } => "drawinfo",
            Command::ExtendedInfoSet { .. } => "ExtendedInfoSet",
            Command::ExtendedTextSet { .. } => "ExtendedTextSet",
            Command::Face2 { .. } => "face2",
            Command::Failure { .. } => "failure",
            Command::Goodbye => "goodbye",
            Command::Image2 { .. } => "image2",
            Command::Item2 { .. } => "item2",
            Command::MagicMap { .. } => "magicmap",
            Command::Map2(_) => "map2",
            Command::Music { .. } => "music",
            Command::NewMap(_) => "newmap",
            Command::Pickup { .. } => "pickup",
            Command::Player { .. } => "player",
            Command::Query { .. } => "query",
            Command::ReplyInfo(_) => "replyinfo",
            Command::Setup(_) => "setup",
            Command::Smooth { .. } => "smooth",
            Command::Sound { .. } => "sound",
            Command::Sound2 { .. } => "sound2",
            Command::Stats(_) => "stats",
            Command::Tick { .. } => "tick",
            Command::UpdItem(_) => "upditem",
            Command::UpdSpell(_) => "updspell",
            Command::Version { .. } => "version",
        }
    }
}
