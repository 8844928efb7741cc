//! Negotiated protocol parameters.
//!
//! The server and client agree on a handful of parameters during the setup
//! exchange. The decoder consults them to interpret commands whose meaning
//! depends on what was negotiated, so a single decoder serves every
//! protocol revision instead of one decoder per revision.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// MapSize
// ---------------------------------------------------------------------------

/// Width and height of the visible map area, in tiles.
///
/// Both dimensions must be odd (the player stands in the center tile) and
/// lie in `3..=63`. The fields are checked by [`MapSize::new`] and by
/// [`MapSize::is_valid`] for values that arrive through deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MapSize {
    width: u8,
    height: u8,
}

impl MapSize {
    /// Smallest allowed dimension.
    pub const MIN: u8 = 3;
    /// Largest allowed dimension.
    pub const MAX: u8 = 63;
    /// The view size requested when nothing else is configured.
    pub const DEFAULT: MapSize = MapSize { width: 17, height: 13 };

    /// Returns `None` unless both dimensions are odd and in range.
    pub fn new(width: u8, height: u8) -> Option<Self> {
        let size = Self { width, height };
        size.is_valid().then_some(size)
    }

    pub fn width(&self) -> u8 {
        self.width
    }

    pub fn height(&self) -> u8 {
        self.height
    }

    /// Checks the odd/range constraint.
    pub fn is_valid(&self) -> bool {
        let ok = |v: u8| (Self::MIN..=Self::MAX).contains(&v) && v % 2 == 1;
        ok(self.width) && ok(self.height)
    }
}

impl Default for MapSize {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Formats as `WxH`, the form used by `setup mapsize`.
impl fmt::Display for MapSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Parses the `WxH` form. Range checking is left to the caller: a server
/// may echo a size the client would never request.
impl FromStr for MapSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once('x')
            .ok_or_else(|| format!("map size {s:?} is not of the form WxH"))?;
        let width = w.parse().map_err(|_| format!("invalid map width {w:?}"))?;
        let height = h.parse().map_err(|_| format!("invalid map height {h:?}"))?;
        Ok(Self { width, height })
    }
}

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Which `sound` command revisions the server agreed to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SoundRevision {
    /// Sound was declined.
    None,
    /// Only the first-revision `sound` command.
    V1,
    /// Only `sound2`.
    V2,
    /// Both are accepted. This is the state before setup completes.
    #[default]
    Both,
}

impl SoundRevision {
    /// Combines the echoed `sound` and `sound2` setup values.
    pub fn from_flags(v1: bool, v2: bool) -> Self {
        match (v1, v2) {
            (false, false) => Self::None,
            (true, false) => Self::V1,
            (false, true) => Self::V2,
            (true, true) => Self::Both,
        }
    }

    pub fn accepts_v1(self) -> bool {
        matches!(self, Self::V1 | Self::Both)
    }

    pub fn accepts_v2(self) -> bool {
        matches!(self, Self::V2 | Self::Both)
    }
}

/// Parameters negotiated with the server.
///
/// Until the setup echo has been processed, every sound revision is
/// accepted but the spell commands are refused: the server only sends them
/// once it has agreed to `spellmon`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    /// The view size currently in effect.
    pub map_size: MapSize,
    pub sound: SoundRevision,
    /// Whether the spell commands (`addspell`, `updspell`, `delspell`) are
    /// enabled.
    pub spellmon: bool,
    /// Server protocol 1029 and newer report weapon speed without the
    /// legacy scaling.
    pub simple_weapon_speed: bool,
    /// Number of objects the server shows in the ground view.
    pub num_look_objects: u32,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            map_size: MapSize::DEFAULT,
            sound: SoundRevision::Both,
            spellmon: false,
            simple_weapon_speed: false,
            num_look_objects: 50,
        }
    }
}
