//! Keyword recognition.
//!
//! Every inbound message starts with an ASCII keyword, followed either by a
//! single space and the arguments or by the end of the message. Keywords
//! are matched byte by byte against a trie that is built once on first use;
//! the decoder never compares whole strings.

use std::sync::OnceLock;

/// The commands this engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    AddmeFailed,
    AddmeSuccess,
    AddSpell,
    Anim,
    Comc,
    DelInv,
    DelItem,
    DelSpell,
    DrawExtInfo,
    DrawInfo,
    ExtendedInfoSet,
    ExtendedTextSet,
    Face2,
    Failure,
    Goodbye,
    Image2,
    Item2,
    MagicMap,
    Map2,
    Music,
    NewMap,
    Pickup,
    Player,
    Query,
    ReplyInfo,
    Setup,
    Smooth,
    Sound,
    Sound2,
    Stats,
    Tick,
    UpdItem,
    UpdSpell,
    Version,
}

impl Keyword {
    /// Every keyword, in no particular order.
    pub const ALL: [Keyword; 34] = [
        Keyword::AddmeFailed,
        Keyword::AddmeSuccess,
        Keyword::AddSpell,
        Keyword::Anim,
        Keyword::Comc,
        Keyword::DelInv,
        Keyword::DelItem,
        Keyword::DelSpell,
        Keyword::DrawExtInfo,
        Keyword::DrawInfo,
        Keyword::ExtendedInfoSet,
        Keyword::ExtendedTextSet,
        Keyword::Face2,
        Keyword::Failure,
        Keyword::Goodbye,
        Keyword::Image2,
        Keyword::Item2,
        Keyword::MagicMap,
        Keyword::Map2,
        Keyword::Music,
        Keyword::NewMap,
        Keyword::Pickup,
        Keyword::Player,
        Keyword::Query,
        Keyword::ReplyInfo,
        Keyword::Setup,
        Keyword::Smooth,
        Keyword::Sound,
        Keyword::Sound2,
        Keyword::Stats,
        Keyword::Tick,
        Keyword::UpdItem,
        Keyword::UpdSpell,
        Keyword::Version,
    ];

    /// The keyword as it appears on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::AddmeFailed => "addme_failed",
            Keyword::AddmeSuccess => "addme_success",
            Keyword::AddSpell => "addspell",
            Keyword::Anim => "anim",
            Keyword::Comc => "comc",
            Keyword::DelInv => "delinv",
            Keyword::DelItem => "delitem",
            Keyword::DelSpell => "delspell",
            Keyword::DrawExtInfo => "drawextinfo",
            Keyword::DrawInfo => "drawinfo",
            Keyword::ExtendedInfoSet => "ExtendedInfoSet",
            Keyword::ExtendedTextSet => "ExtendedTextSet",
            Keyword::Face2 => "face2",
            Keyword::Failure => "failure",
            Keyword::Goodbye => "goodbye",
            Keyword::Image2 => "image2",
            Keyword::Item2 => "item2",
            Keyword::MagicMap => "magicmap",
            Keyword::Map2 => "map2",
            Keyword::Music => "music",
            Keyword::NewMap => "newmap",
            Keyword::Pickup => "pickup",
            Keyword::Player => "player",
            Keyword::Query => "query",
            Keyword::ReplyInfo => "replyinfo",
            Keyword::Setup => "setup",
            Keyword::Smooth => "smooth",
            Keyword::Sound => "sound",
            Keyword::Sound2 => "sound2",
            Keyword::Stats => "stats",
            Keyword::Tick => "tick",
            Keyword::UpdItem => "upditem",
            Keyword::UpdSpell => "updspell",
            Keyword::Version => "version",
        }
    }
}

// ---------------------------------------------------------------------------
// Trie
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Node {
    /// Outgoing edges, sorted by byte.
    children: Vec<(u8, u32)>,
    keyword: Option<Keyword>,
}

/// A byte trie over all keywords.
///
/// Nodes live in one flat `Vec` and refer to each other by index, which
/// keeps the structure a single allocation-friendly table.
#[derive(Debug)]
pub(crate) struct KeywordTrie {
    nodes: Vec<Node>,
}

impl KeywordTrie {
    fn build(keywords: &[Keyword]) -> Self {
        let mut nodes = vec![Node::default()];
        for &keyword in keywords {
            let mut at = 0usize;
            for &b in keyword.as_str().as_bytes() {
                at = match nodes[at].children.binary_search_by_key(&b, |&(c, _)| c) {
                    Ok(i) => nodes[at].children[i].1 as usize,
                    Err(i) => {
                        let next = nodes.len();
                        nodes.push(Node::default());
                        nodes[at].children.insert(i, (b, next as u32));
                        next
                    }
                };
            }
            nodes[at].keyword = Some(keyword);
        }
        Self { nodes }
    }

    /// The shared trie over [`Keyword::ALL`].
    pub(crate) fn global() -> &'static KeywordTrie {
        static TRIE: OnceLock<KeywordTrie> = OnceLock::new();
        TRIE.get_or_init(|| KeywordTrie::build(&Keyword::ALL))
    }

    /// Matches the keyword at the start of `message`.
    ///
    /// Returns the keyword and the offset where its arguments begin (just
    /// past the delimiting space, or the message length if there is none).
    pub(crate) fn lookup(&self, message: &[u8]) -> Option<(Keyword, usize)> {
        let mut at = 0usize;
        for (i, &b) in message.iter().enumerate() {
            if b == b' ' {
                return self.nodes[at].keyword.map(|k| (k, i + 1));
            }
            let node = &self.nodes[at];
            let idx = node.children.binary_search_by_key(&b, |&(c, _)| c).ok()?;
            at = node.children[idx].1 as usize;
        }
        self.nodes[at].keyword.map(|k| (k, message.len()))
    }
}

/// The printable leading bytes of an unrecognized message, for diagnostics.
pub(crate) fn printable_prefix(message: &[u8]) -> String {
    let end = message
        .iter()
        .position(|b| !(0x21..0x7F).contains(b))
        .unwrap_or(message.len());
    String::from_utf8_lossy(&message[..end]).into_owned()
}
