//! Wire protocol for the cfclient engine.
//!
//! This crate knows how to read and write the messages a game server and
//! client exchange. It does not know about sockets or handshakes:
//!
//! - **Decoding** ([`Decoder`], [`Command`]): one message payload in, one
//!   typed command out. Keywords are matched with a trie; every field read
//!   is bounds-checked.
//! - **Map updates** ([`decode_map2`], [`MapDelta`], [`RedrawLock`]): the
//!   dense `map2` sub-format and the lock that keeps a renderer from seeing
//!   half an update.
//! - **Encoding** ([`CommandEncoder`], [`OutgoingRequest`]): typed
//!   requests out.
//! - **Negotiated parameters** ([`Capabilities`], [`MapSize`]): what the
//!   setup exchange agreed on; the decoder consults them.
//!
//! ```text
//! Transport (frames) → Protocol (Command) → Session (handshake) → consumers
//! ```

mod command;
mod decoder;
mod encoder;
mod error;
mod keyword;
mod map2;
mod packet;
mod redraw;
mod stats;
mod types;

pub use command::{
    Command, ItemAdd, ItemName, ItemUpdate, ReplyInfo, SkillEntry, Spell, SpellUpdate, upd_item,
    upd_spell,
};
pub use decoder::Decoder;
pub use encoder::{CommandEncoder, OutgoingRequest};
pub use error::ProtocolError;
pub use keyword::Keyword;
pub use map2::{COORD_OFFSET, MapDelta, NUM_LAYERS, decode_map2};
pub use redraw::{MapUpdate, RedrawLock};
pub use stats::{Stat, StatKind, StatValue, tag as stat_tag};
pub use types::{Capabilities, MapSize, SoundRevision};
