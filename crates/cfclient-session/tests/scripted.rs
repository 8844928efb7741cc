//! Runs the handshake against scripted server bytes, decoding each reply
//! with the capabilities the handshake has negotiated so far.

use cfclient_protocol::{
    Command, CommandEncoder, Decoder, OutgoingRequest, ProtocolError, SoundRevision,
};
use cfclient_session::{Action, ConnectionState, Handshake, SessionConfig, SessionError};

struct Harness {
    handshake: Handshake,
    decoder: Decoder,
    encoder: CommandEncoder,
    sent: Vec<String>,
    states: Vec<ConnectionState>,
}

impl Harness {
    fn new() -> Self {
        let handshake = Handshake::new(SessionConfig::default()).unwrap();
        let decoder = Decoder::new(handshake.capabilities().clone());
        Self {
            handshake,
            decoder,
            encoder: CommandEncoder::new(),
            sent: Vec::new(),
            states: vec![ConnectionState::Connecting],
        }
    }

    fn apply(&mut self, actions: Vec<Action>) {
        for action in actions {
            match action {
                Action::Send(request) => {
                    let (bytes, _) = self.encoder.encode_to_vec(&request);
                    self.sent.push(String::from_utf8_lossy(&bytes).into_owned());
                }
                Action::StateChanged { to, .. } => self.states.push(to),
                Action::Capabilities(caps) => self.decoder.set_capabilities(caps),
                Action::MapResized(_) => {}
            }
        }
    }

    fn server(&mut self, message: &[u8]) -> Result<(), SessionError> {
        let command = self.decoder.decode(message).unwrap();
        let actions = self.handshake.on_command(&command)?;
        self.apply(actions);
        Ok(())
    }
}

const SETUP_ECHO: &[u8] = b"setup faceset 0 sound FALSE sound2 3 exp64 1 map2cmd 1 darkness 1 \
newmapcmd 1 facecache 1 extendedTextInfos 1 itemcmd 2 spellmon 1 tick 1 mapsize 17x13 \
num_look_objects 50";

#[test]
fn test_full_handshake() {
    let mut h = Harness::new();
    let actions = h.handshake.on_connected();
    h.apply(actions);
    assert!(h.sent[0].starts_with("version 1023 1027 cfclient"));

    h.server(b"version 1023 1029 Crossfire Server").unwrap();
    assert!(h.sent[1].starts_with("setup faceset 0 sound 1 sound2 3"));
    assert!(h.sent[1].contains(" itemcmd 2 "));
    assert!(h.sent[1].ends_with("mapsize 17x13 num_look_objects 50"));
    assert!(h.sent[2].starts_with("toggleextendedtext 1 2 3"));
    assert!(h.sent[2].ends_with(" 19"));

    h.server(SETUP_ECHO).unwrap();
    assert_eq!(
        &h.sent[3..6],
        ["requestinfo image_info", "requestinfo skill_info", "requestinfo exp_table"]
    );
    assert_eq!(h.decoder.capabilities().sound, SoundRevision::V2);
    assert!(h.decoder.capabilities().simple_weapon_speed);

    h.server(b"replyinfo image_info\n4000\n0:png:0x0:standard\n").unwrap();
    h.server(b"replyinfo exp_table \x00\x03\x00\x00\x00\x00\x00\x00\x03\xe8\x00\x00\x00\x00\x00\x00\x07\xd0")
        .unwrap();
    assert_eq!(h.sent.last().unwrap(), "addme");

    h.server(b"addme_success").unwrap();
    assert_eq!(h.handshake.state(), ConnectionState::Connected);
    assert_eq!(
        h.states,
        [
            ConnectionState::Connecting,
            ConnectionState::Version,
            ConnectionState::Setup,
            ConnectionState::RequestInfo,
            ConnectionState::AddMe,
            ConnectionState::Connected,
        ]
    );
}

#[test]
fn test_sound_v1_is_rejected_after_decline() {
    let mut h = Harness::new();
    let actions = h.handshake.on_connected();
    h.apply(actions);
    h.server(b"version 1023 1027 srv").unwrap();
    // Before the echo every revision is accepted.
    assert!(h.decoder.decode(b"sound \x01\x02\x00\x05\x01").is_ok());
    h.server(SETUP_ECHO).unwrap();
    assert!(h.decoder.decode(b"sound \x01\x02\x00\x05\x01").is_err());
}

#[test]
fn test_required_mismatch_aborts_without_advancing() {
    let mut h = Harness::new();
    let actions = h.handshake.on_connected();
    h.apply(actions);
    h.server(b"version 1023 1027 srv").unwrap();
    let sent = h.sent.len();

    let err = h.server(b"setup itemcmd 1 mapsize 17x13").unwrap_err();
    assert!(err.is_fatal());
    assert!(matches!(err, SessionError::Incompatible { ref option, .. } if option == "itemcmd"));
    assert_eq!(h.handshake.state(), ConnectionState::Setup);
    assert_eq!(h.sent.len(), sent, "nothing is sent after a rejected echo");
}

#[test]
fn test_different_map_size_echo_aborts_before_addme() {
    let mut h = Harness::new();
    let actions = h.handshake.on_connected();
    h.apply(actions);
    h.server(b"version 1023 1027 srv").unwrap();
    assert!(h.sent[1].contains(" mapsize 17x13 "));
    let sent = h.sent.len();

    let echo = String::from_utf8_lossy(SETUP_ECHO).replace("mapsize 17x13", "mapsize 19x13");
    let err = h.server(echo.as_bytes()).unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(
        err,
        SessionError::Incompatible {
            option: "mapsize".into(),
            expected: "17x13".into(),
            actual: "19x13".into(),
        }
    );
    assert!(h.handshake.state() < ConnectionState::AddMe);
    assert_eq!(h.handshake.state(), ConnectionState::Setup);
    assert_eq!(h.sent.len(), sent, "no requestinfo or addme after a rejected echo");
    assert!(!h.sent.iter().any(|m| m == "addme"));
}

#[test]
fn test_spell_commands_enabled_by_setup_echo() {
    let mut h = Harness::new();
    let actions = h.handshake.on_connected();
    h.apply(actions);
    h.server(b"version 1023 1027 srv").unwrap();
    assert!(matches!(
        h.decoder.decode(b"delspell \x00\x00\x00\x07"),
        Err(ProtocolError::InactiveRevision { command: "delspell" })
    ));

    h.server(SETUP_ECHO).unwrap();
    assert_eq!(
        h.decoder.decode(b"delspell \x00\x00\x00\x07").unwrap(),
        Command::DelSpell { tag: 7 }
    );

    let actions = h.handshake.reset();
    h.apply(actions);
    assert!(h.decoder.decode(b"addspell ").is_err(), "a reset forgets spellmon");
}

#[test]
fn test_ncom_after_handshake_uses_fresh_counter() {
    let h = Harness::new();
    let (bytes, id) = h
        .encoder
        .encode_to_vec(&OutgoingRequest::Ncom { repeat: 0, command: "look".into() });
    assert_eq!(id, Some(1));
    assert!(bytes.starts_with(b"ncom "));
}
