//! The setup option batch and evaluation of the server's echo.
//!
//! The server answers `setup` by echoing every option it recognized with
//! the value it actually applied. Some options are load-bearing: the
//! decoder cannot interpret the stream correctly unless the server agreed
//! to exactly what was asked. Others only tune optional behavior and may be
//! declined.

use cfclient_protocol::{Capabilities, MapSize, SoundRevision};
use tracing::{debug, warn};

use crate::{SessionConfig, SessionError};

/// Highest extended text message type this client understands.
pub const MSG_TYPE_LAST: u8 = 19;

/// Options whose echo must match the requested value exactly.
pub const REQUIRED_OPTIONS: &[(&str, &str)] = &[
    ("map2cmd", "1"),
    ("newmapcmd", "1"),
    ("facecache", "1"),
    ("extendedTextInfos", "1"),
    ("itemcmd", "2"),
    ("spellmon", "1"),
    ("tick", "1"),
];

/// Options the server may decline without consequence.
const INFORMATIONAL_OPTIONS: &[&str] = &["faceset", "exp64", "darkness"];

/// The full option batch sent once the server's version is known.
pub fn setup_options(config: &SessionConfig) -> Vec<(String, String)> {
    let mut options: Vec<(String, String)> = [
        ("faceset", "0"),
        ("sound", "1"),
        ("sound2", "3"),
        ("exp64", "1"),
    ]
    .iter()
    .chain(REQUIRED_OPTIONS)
    .chain(&[("darkness", "1")])
    .map(|(option, value)| (option.to_string(), value.to_string()))
    .collect();
    options.push(("mapsize".into(), config.map_size.to_string()));
    options.push(("num_look_objects".into(), config.num_look_objects.to_string()));
    options
}

/// Every extended text type, for `toggleextendedtext`.
pub fn extended_text_types() -> Vec<u8> {
    (1..=MSG_TYPE_LAST).collect()
}

/// Checks the full setup echo and derives the negotiated capabilities.
///
/// # Errors
/// [`SessionError::Incompatible`] if a required option or the map size was
/// echoed with a different value. Options missing from the echo are
/// logged and left at their previous value: sound revisions are only
/// narrowed by an explicit decline, and the spell commands stay disabled
/// until `spellmon` is echoed.
pub fn evaluate_echo(
    echo: &[(String, String)],
    config: &SessionConfig,
    base: &Capabilities,
) -> Result<Capabilities, SessionError> {
    let mut caps = base.clone();
    let mut sound_v1 = base.sound.accepts_v1();
    let mut sound_v2 = base.sound.accepts_v2();

    for (option, value) in echo {
        let option = option.as_str();
        if let Some((_, expected)) = REQUIRED_OPTIONS.iter().find(|(name, _)| *name == option) {
            if value != expected {
                return Err(incompatible(option, expected, value));
            }
            if option == "spellmon" {
                caps.spellmon = true;
            }
            continue;
        }

        match option {
            "mapsize" => caps.map_size = exact_map_size(value, config.map_size)?,
            "num_look_objects" => {
                caps.num_look_objects = echoed_look_objects(value, config.num_look_objects)
            }
            "sound" => sound_v1 = is_enabled(value),
            "sound2" => sound_v2 = is_enabled(value),
            name if INFORMATIONAL_OPTIONS.contains(&name) => {
                if !is_enabled(value) {
                    debug!(option = name, "server declined optional setup option");
                }
            }
            other => warn!(option = other, value = %value, "ignoring unknown setup option"),
        }
    }

    for (name, _) in REQUIRED_OPTIONS {
        if !echo.iter().any(|(option, _)| option == name) {
            warn!(option = *name, "server did not echo required setup option");
        }
    }

    caps.sound = SoundRevision::from_flags(sound_v1, sound_v2);
    Ok(caps)
}

/// Parses a `mapsize` echo and requires it to equal `requested`.
pub fn exact_map_size(value: &str, requested: MapSize) -> Result<MapSize, SessionError> {
    match value.parse::<MapSize>() {
        Ok(size) if size == requested => Ok(size),
        _ => Err(incompatible("mapsize", &requested.to_string(), value)),
    }
}

/// Parses a `num_look_objects` echo. A declined or different value is not
/// fatal; the server's value wins when it gave one.
pub fn echoed_look_objects(value: &str, requested: u32) -> u32 {
    match value.parse::<u32>() {
        Ok(n) if n == requested => n,
        Ok(n) => {
            warn!(requested, echoed = n, "server changed num_look_objects");
            n
        }
        Err(_) => {
            warn!(requested, echoed = %value, "server rejected num_look_objects");
            requested
        }
    }
}

fn is_enabled(value: &str) -> bool {
    value != "FALSE" && value != "0"
}

fn incompatible(option: &str, expected: &str, actual: &str) -> SessionError {
    SessionError::Incompatible {
        option: option.to_string(),
        expected: expected.to_string(),
        actual: actual.to_string(),
    }
}
