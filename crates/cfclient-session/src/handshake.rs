//! The handshake driver.
//!
//! [`Handshake`] owns the connection state and the negotiated
//! capabilities. It does no I/O: the connection feeds it the socket
//! events and decoded commands, and it answers with [`Action`]s (requests
//! to send, state changes, new capabilities) that the connection carries
//! out in order.
//!
//! ```text
//!   socket up      → Version     → send version
//!   version        → Setup       → send setup batch, toggleextendedtext
//!   setup echo     → RequestInfo → send requestinfo image_info/skill_info/exp_table
//!   exp_table      → AddMe       → send addme
//!   addme_success  → Connected
//! ```

use cfclient_protocol::{Capabilities, Command, MapSize, OutgoingRequest, ReplyInfo};
use tracing::{debug, info, warn};

use crate::setup::{self, evaluate_echo, echoed_look_objects, exact_map_size};
use crate::{ConnectionState, SessionConfig, SessionError};

/// Server protocol version from which weapon speed is reported unscaled.
pub const SIMPLE_WEAPON_SPEED_VERSION: u32 = 1029;

/// `requestinfo` types sent after setup, in order.
const REQUEST_INFO_KINDS: &[&str] = &["image_info", "skill_info", "exp_table"];

/// Something the connection must do on behalf of the handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Send a request to the server.
    Send(OutgoingRequest),
    /// The connection state moved. Listeners are told about it.
    StateChanged {
        from: ConnectionState,
        to: ConnectionState,
    },
    /// The negotiated parameters changed. The decoder must use them for
    /// every message that follows.
    Capabilities(Capabilities),
    /// A renegotiated view size took effect.
    MapResized(MapSize),
}

/// Drives one connection from socket-up to [`ConnectionState::Connected`].
#[derive(Debug)]
pub struct Handshake {
    config: SessionConfig,
    state: ConnectionState,
    caps: Capabilities,
    /// Map size requested after setup and not yet echoed.
    pending_map_size: Option<MapSize>,
    /// Look object count requested after setup and not yet echoed.
    pending_look_objects: Option<u32>,
}

impl Handshake {
    /// Creates a driver in [`ConnectionState::Connecting`].
    ///
    /// # Errors
    /// [`SessionError::InvalidConfig`] if `config` fails validation.
    pub fn new(config: SessionConfig) -> Result<Self, SessionError> {
        config.validate()?;
        Ok(Self {
            caps: initial_capabilities(&config),
            config,
            state: ConnectionState::Connecting,
            pending_map_size: None,
            pending_look_objects: None,
        })
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The socket is connected; announce our version.
    pub fn on_connected(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();
        self.advance(ConnectionState::Version, &mut actions);
        let (client, server) = self.config.client_protocol;
        actions.push(Action::Send(OutgoingRequest::Version {
            client,
            server,
            info: self.config.client_version.clone(),
        }));
        actions
    }

    /// Feeds a decoded command to the handshake.
    ///
    /// Commands that play no part in the handshake produce no actions.
    ///
    /// # Errors
    /// [`SessionError::Incompatible`] (fatal) if the setup echo rejects a
    /// required option; the state does not advance.
    /// [`SessionError::UnexpectedReply`] (not fatal) for a renegotiation
    /// echo that could not be used.
    pub fn on_command(&mut self, command: &Command) -> Result<Vec<Action>, SessionError> {
        let mut actions = Vec::new();
        match command {
            Command::Version { server, info, .. } => self.on_version(*server, info, &mut actions),
            Command::Setup(options) => self.on_setup(options, &mut actions)?,
            Command::ReplyInfo(ReplyInfo::ExpTable(_)) => {
                self.advance(ConnectionState::AddMe, &mut actions);
                if self.state == ConnectionState::AddMe {
                    actions.push(Action::Send(OutgoingRequest::AddMe));
                }
            }
            Command::AddmeSuccess => {
                self.advance(ConnectionState::Connected, &mut actions);
            }
            Command::AddmeFailed => warn!(state = %self.state, "server refused addme"),
            Command::Query { .. } if self.state == ConnectionState::AddMe => {
                // Some servers skip addme_success and go straight to the
                // login prompt.
                debug!("query before addme_success, assuming the join succeeded");
                self.advance(ConnectionState::Connected, &mut actions);
            }
            _ => {}
        }
        Ok(actions)
    }

    /// Asks the server for a different view size.
    ///
    /// Only possible once the initial setup has been answered. A request
    /// while another one is outstanding, or for the size already in effect,
    /// sends nothing.
    ///
    /// # Errors
    /// [`SessionError::InvalidConfig`] if `size` is not a valid view size.
    pub fn request_map_size(&mut self, size: MapSize) -> Result<Vec<Action>, SessionError> {
        if !size.is_valid() {
            return Err(SessionError::InvalidConfig(format!("invalid map size {size}")));
        }
        self.config.map_size = size;
        if self.state <= ConnectionState::Setup
            || self.pending_map_size.is_some()
            || self.caps.map_size == size
        {
            return Ok(Vec::new());
        }
        self.pending_map_size = Some(size);
        Ok(vec![setup_request("mapsize", size.to_string())])
    }

    /// Asks the server for a different number of ground objects.
    ///
    /// # Errors
    /// [`SessionError::InvalidConfig`] if `count` is zero.
    pub fn request_num_look_objects(&mut self, count: u32) -> Result<Vec<Action>, SessionError> {
        if count == 0 {
            return Err(SessionError::InvalidConfig(
                "num_look_objects must be at least 1".into(),
            ));
        }
        self.config.num_look_objects = count;
        if self.state <= ConnectionState::Setup
            || self.pending_look_objects.is_some()
            || self.caps.num_look_objects == count
        {
            return Ok(Vec::new());
        }
        self.pending_look_objects = Some(count);
        Ok(vec![setup_request("num_look_objects", count.to_string())])
    }

    /// The connection was dropped. Everything negotiated is forgotten.
    pub fn reset(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();
        self.caps = initial_capabilities(&self.config);
        self.pending_map_size = None;
        self.pending_look_objects = None;
        if self.state != ConnectionState::Connecting {
            actions.push(Action::StateChanged {
                from: self.state,
                to: ConnectionState::Connecting,
            });
            self.state = ConnectionState::Connecting;
        }
        actions.push(Action::Capabilities(self.caps.clone()));
        actions
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn on_version(&mut self, server: u32, info: &str, actions: &mut Vec<Action>) {
        info!(server, server_info = info, "server version");
        self.advance(ConnectionState::Setup, actions);
        if self.state != ConnectionState::Setup {
            return;
        }

        let simple_weapon_speed = server >= SIMPLE_WEAPON_SPEED_VERSION;
        if self.caps.simple_weapon_speed != simple_weapon_speed {
            self.caps.simple_weapon_speed = simple_weapon_speed;
            actions.push(Action::Capabilities(self.caps.clone()));
        }
        actions.push(Action::Send(OutgoingRequest::Setup {
            options: setup::setup_options(&self.config),
        }));
        actions.push(Action::Send(OutgoingRequest::ToggleExtendedText {
            types: setup::extended_text_types(),
        }));
    }

    fn on_setup(
        &mut self,
        options: &[(String, String)],
        actions: &mut Vec<Action>,
    ) -> Result<(), SessionError> {
        match self.state {
            ConnectionState::Setup => {
                let caps = evaluate_echo(options, &self.config, &self.caps)?;
                info!(map_size = %caps.map_size, sound = ?caps.sound, "setup accepted");
                self.caps = caps;
                actions.push(Action::Capabilities(self.caps.clone()));
                self.advance(ConnectionState::RequestInfo, actions);
                for kind in REQUEST_INFO_KINDS {
                    actions.push(Action::Send(OutgoingRequest::RequestInfo {
                        kind: (*kind).to_string(),
                    }));
                }
                Ok(())
            }
            ConnectionState::Connecting | ConnectionState::Version => {
                warn!(state = %self.state, "setup echo before setup was sent, ignoring");
                Ok(())
            }
            _ => self.on_renegotiation(options, actions),
        }
    }

    /// Handles echoes of `mapsize`/`num_look_objects` sent after setup.
    fn on_renegotiation(
        &mut self,
        options: &[(String, String)],
        actions: &mut Vec<Action>,
    ) -> Result<(), SessionError> {
        let mut caps = self.caps.clone();
        let mut resized = None;
        let mut rejected = None;

        for (option, value) in options {
            match option.as_str() {
                "mapsize" => {
                    let Some(requested) = self.pending_map_size.take() else {
                        warn!(value = %value, "unsolicited mapsize echo");
                        continue;
                    };
                    match exact_map_size(value, requested) {
                        Ok(size) => {
                            caps.map_size = size;
                            resized = Some(size);
                        }
                        Err(err) => {
                            warn!(%err, current = %caps.map_size, "keeping current map size");
                            rejected = Some(format!("mapsize {value}"));
                        }
                    }
                }
                "num_look_objects" => {
                    let Some(requested) = self.pending_look_objects.take() else {
                        warn!(value = %value, "unsolicited num_look_objects echo");
                        continue;
                    };
                    caps.num_look_objects = echoed_look_objects(value, requested);
                }
                other => warn!(option = other, "unexpected option in setup echo"),
            }
        }

        if caps != self.caps {
            self.caps = caps;
            actions.push(Action::Capabilities(self.caps.clone()));
        }
        if let Some(size) = resized {
            info!(map_size = %size, "map size changed");
            actions.push(Action::MapResized(size));
        }
        match rejected {
            Some(reply) => Err(SessionError::UnexpectedReply(reply)),
            None => Ok(()),
        }
    }

    /// Moves to `to`, which should directly follow the current state.
    ///
    /// Skipping states is protocol drift: it is logged and the transition
    /// happens anyway, as long as it moves forward. A transition that would
    /// move backwards is ignored.
    fn advance(&mut self, to: ConnectionState, actions: &mut Vec<Action>) {
        let from = self.state;
        if to <= from {
            warn!(state = %from, target = %to, "ignoring backward state transition");
            return;
        }
        if !from.can_transition_to(to) {
            warn!(state = %from, target = %to, "protocol drift");
        }
        debug!(from = %from, to = %to, "connection state changed");
        self.state = to;
        actions.push(Action::StateChanged { from, to });
    }
}

fn initial_capabilities(config: &SessionConfig) -> Capabilities {
    Capabilities {
        map_size: config.map_size,
        num_look_objects: config.num_look_objects,
        ..Capabilities::default()
    }
}

fn setup_request(option: &str, value: String) -> Action {
    Action::Send(OutgoingRequest::Setup {
        options: vec![(option.to_string(), value)],
    })
}
