//! Room lifecycle state machine and synchronization protocol.
//!
//! A [`Session`] is the local peer's view of one room: membership, the
//! elected host, the lifecycle phase, and the game state (authoritative on
//! the host, a shadow copy on the guest). It performs no I/O: channel events
//! are fed in, and every operation returns the `GameEvent`s the caller must
//! broadcast, so each host-local transition pairs with exactly one broadcast
//! and the two peers' state machines converge.
//!
//! The guest side is a pure follower: the only transitions it takes on its
//! own are the ones driven by received broadcasts.

use crate::channel::ChannelEvent;
use crate::election::elect_host;
use crate::sim;
use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{clamp_paddle_y, GameEvent, GameState, Member, COUNTDOWN_START, WIN_SCORE};
use std::collections::BTreeMap;
use thiserror::Error;

/// Lifecycle phase of the room, advancing forward only, except for the
/// host-driven restart edge and the pause-on-disconnect fallback to Waiting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomPhase {
    Connecting,
    Waiting,
    Starting,
    Playing,
    GameOver { winner: String },
}

/// Local command rejections. None of these mutate state or send a message;
/// they surface as a user-facing notice.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("waiting for another player to join")]
    NoOpponent,
    #[error("only the host can do that")]
    NotHost,
    #[error("not possible right now")]
    WrongPhase,
}

pub struct Session {
    room_id: String,
    local: Member,
    /// Keyed by member id, so iteration order is already election order.
    members: BTreeMap<String, Member>,
    host_id: Option<String>,
    opponent: Option<Member>,
    phase: RoomPhase,
    game: GameState,
    rng: StdRng,
}

impl Session {
    /// Creates a session for one peer in one room. The local member identity
    /// is an explicit input: it is created once per device by the caller and
    /// never regenerated here.
    pub fn new(room_id: impl Into<String>, local: Member) -> Self {
        Self::with_seed(room_id, local, rand::random())
    }

    /// Like [`Session::new`] with a fixed simulation seed, for deterministic
    /// replays and tests.
    pub fn with_seed(room_id: impl Into<String>, local: Member, seed: u64) -> Self {
        Self {
            room_id: room_id.into(),
            local,
            members: BTreeMap::new(),
            host_id: None,
            opponent: None,
            phase: RoomPhase::Connecting,
            game: GameState::initial(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn local(&self) -> &Member {
        &self.local
    }

    pub fn phase(&self) -> &RoomPhase {
        &self.phase
    }

    pub fn game(&self) -> &GameState {
        &self.game
    }

    pub fn opponent(&self) -> Option<&Member> {
        self.opponent.as_ref()
    }

    pub fn host_id(&self) -> Option<&str> {
        self.host_id.as_deref()
    }

    /// Whether this peer currently runs the authoritative simulation.
    pub fn is_host(&self) -> bool {
        self.host_id.as_deref() == Some(self.local.id.as_str())
    }

    /// Feeds one presence or message event from the channel. Never fails:
    /// unexpected or malformed input degrades to a stale remote view, it
    /// never takes down the local loop.
    pub fn handle_channel_event(&mut self, event: ChannelEvent) {
        match event {
            ChannelEvent::SubscriptionSucceeded { members } => {
                self.members = members.into_iter().map(|m| (m.id.clone(), m)).collect();
                self.members
                    .entry(self.local.id.clone())
                    .or_insert_with(|| self.local.clone());
                self.refresh_roles();
                self.phase = RoomPhase::Waiting;
                info!(
                    "joined room {} as {} ({} member(s) present)",
                    self.room_id,
                    self.local.name,
                    self.members.len()
                );
            }
            ChannelEvent::MemberAdded { member } => {
                if member.id != self.local.id {
                    info!("{} joined room {}", member.name, self.room_id);
                }
                self.members.insert(member.id.clone(), member);
                self.refresh_roles();
            }
            ChannelEvent::MemberRemoved { member } => {
                self.members.remove(&member.id);
                let was_host = self.is_host();
                self.refresh_roles();

                // Pause on disconnect, not abort: scores survive so the
                // match can resume when the opponent comes back.
                if !matches!(self.phase, RoomPhase::Connecting | RoomPhase::GameOver { .. }) {
                    self.phase = RoomPhase::Waiting;
                    self.game.playing = false;
                    info!(
                        "{} left room {}; waiting for a player (score {}-{})",
                        member.name, self.room_id, self.game.score_host, self.game.score_guest
                    );
                }
                if !was_host && self.is_host() {
                    // Promotion: authority resumes from the last shadow
                    // snapshot this peer observed.
                    info!("promoted to host of room {}", self.room_id);
                }
            }
            ChannelEvent::Message { sender_id, payload } => {
                self.handle_message(&sender_id, &payload);
            }
        }
    }

    fn handle_message(&mut self, sender_id: &str, payload: &str) {
        if sender_id == self.local.id {
            return;
        }
        let Some(event) = GameEvent::decode(payload) else {
            warn!(
                "ignoring malformed message from {} in room {}",
                sender_id, self.room_id
            );
            return;
        };

        match event {
            // Optimistic preview of the other side's paddle; at most once
            // per message, healed by the next snapshot anyway.
            GameEvent::PaddleMove { member_id, paddle_y } => {
                if member_id == self.local.id {
                    return;
                }
                let y = clamp_paddle_y(paddle_y);
                if self.host_id.as_deref() == Some(member_id.as_str()) {
                    self.game.paddle_host_y = y;
                } else {
                    self.game.paddle_guest_y = y;
                }
            }
            // Everything below is a host broadcast. The host itself ignores
            // stray copies rather than let them touch authoritative state.
            _ if self.is_host() => {
                warn!(
                    "host ignoring host-only event from {} in room {}",
                    sender_id, self.room_id
                );
            }
            GameEvent::CountdownTick { value } => {
                self.phase = RoomPhase::Starting;
                self.game.countdown = value;
            }
            GameEvent::GameStart => {
                self.game.countdown = 0;
                self.game.playing = true;
                self.phase = RoomPhase::Playing;
            }
            GameEvent::GameStateSync(snapshot) => {
                // Wholesale replacement, last-write-wins; no merging means a
                // late snapshot can only show a stale-but-consistent frame.
                self.game = snapshot;
                if self.game.playing && self.phase != RoomPhase::Playing {
                    self.phase = RoomPhase::Playing;
                }
            }
            GameEvent::GameOver { winner } => {
                self.game.playing = false;
                info!("{} wins in room {}", winner, self.room_id);
                self.phase = RoomPhase::GameOver { winner };
            }
            GameEvent::Restart => {
                self.game = GameState::initial();
                self.phase = RoomPhase::Starting;
            }
        }
    }

    fn refresh_roles(&mut self) {
        self.host_id = elect_host(self.members.values()).map(|m| m.id.clone());
        self.opponent = self
            .members
            .values()
            .find(|m| m.id != self.local.id)
            .cloned();
    }

    /// Host-only: begins the pre-match countdown. The first tick is
    /// broadcast immediately; the caller paces the remaining ticks at one
    /// per second via [`Session::countdown_tick`].
    pub fn start_match(&mut self) -> Result<Vec<GameEvent>, SessionError> {
        if !self.is_host() {
            return Err(SessionError::NotHost);
        }
        if self.opponent.is_none() {
            return Err(SessionError::NoOpponent);
        }
        if self.phase != RoomPhase::Waiting {
            return Err(SessionError::WrongPhase);
        }

        self.game.playing = false;
        self.game.countdown = COUNTDOWN_START;
        self.phase = RoomPhase::Starting;
        info!("starting countdown in room {}", self.room_id);
        Ok(vec![GameEvent::CountdownTick {
            value: COUNTDOWN_START,
        }])
    }

    /// One second of countdown. No-op unless this peer is the host and the
    /// room is in Starting, so the caller can run its timer unconditionally.
    pub fn countdown_tick(&mut self) -> Vec<GameEvent> {
        if !self.is_host() || self.phase != RoomPhase::Starting {
            return Vec::new();
        }

        self.game.countdown = self.game.countdown.saturating_sub(1);
        if self.game.countdown > 0 {
            vec![GameEvent::CountdownTick {
                value: self.game.countdown,
            }]
        } else {
            self.game.playing = true;
            self.phase = RoomPhase::Playing;
            info!("match started in room {}", self.room_id);
            vec![GameEvent::GameStart]
        }
    }

    /// Host-only, from GameOver: resets the game and re-enters the
    /// countdown. The guest resets on the paired `Restart` broadcast.
    pub fn restart(&mut self) -> Result<Vec<GameEvent>, SessionError> {
        if !self.is_host() {
            return Err(SessionError::NotHost);
        }
        if !matches!(self.phase, RoomPhase::GameOver { .. }) {
            return Err(SessionError::WrongPhase);
        }

        self.game = GameState::initial();
        self.phase = RoomPhase::Starting;
        info!("restarting match in room {}", self.room_id);
        Ok(vec![
            GameEvent::Restart,
            GameEvent::CountdownTick {
                value: COUNTDOWN_START,
            },
        ])
    }

    /// Moves this peer's own paddle: applied locally first (optimistic
    /// echo), then broadcast so the remote screen tracks it between
    /// snapshots.
    pub fn move_paddle(&mut self, delta: f32) -> Vec<GameEvent> {
        if self.phase != RoomPhase::Playing {
            return Vec::new();
        }

        let paddle_y = if self.is_host() {
            &mut self.game.paddle_host_y
        } else {
            &mut self.game.paddle_guest_y
        };
        *paddle_y = clamp_paddle_y(*paddle_y + delta);
        let paddle_y = *paddle_y;

        vec![GameEvent::PaddleMove {
            member_id: self.local.id.clone(),
            paddle_y,
        }]
    }

    /// One rendering frame. On the host while Playing this advances the
    /// simulation and returns the snapshot to broadcast (plus `GameOver`
    /// when a score first reaches the win threshold). On the guest it is a
    /// no-op: the guest renders, it does not simulate.
    pub fn frame(&mut self) -> Vec<GameEvent> {
        if !self.is_host() || self.phase != RoomPhase::Playing || !self.game.playing {
            return Vec::new();
        }

        sim::step(&mut self.game, &mut self.rng);

        let winner = self.winner_if_decided();
        if let Some(winner) = &winner {
            self.game.playing = false;
            self.phase = RoomPhase::GameOver {
                winner: winner.clone(),
            };
            info!("{} wins in room {}", winner, self.room_id);
        }

        let mut out = vec![GameEvent::GameStateSync(self.game)];
        if let Some(winner) = winner {
            out.push(GameEvent::GameOver { winner });
        }
        out
    }

    /// Maps the winning logical side back to a display name. Only meaningful
    /// on the host, which is the only peer that decides matches.
    fn winner_if_decided(&self) -> Option<String> {
        if self.game.score_host >= WIN_SCORE {
            Some(self.local.name.clone())
        } else if self.game.score_guest >= WIN_SCORE {
            Some(
                self.opponent
                    .as_ref()
                    .map(|m| m.name.clone())
                    .unwrap_or_else(|| "Opponent".to_string()),
            )
        } else {
            None
        }
    }
}
