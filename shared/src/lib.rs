use serde::{Deserialize, Serialize};

pub const CANVAS_WIDTH: f32 = 800.0;
pub const CANVAS_HEIGHT: f32 = 500.0;
pub const PADDLE_WIDTH: f32 = 15.0;
pub const PADDLE_HEIGHT: f32 = 100.0;
pub const BALL_SIZE: f32 = 15.0;
pub const PADDLE_SPEED: f32 = 10.0;
pub const INITIAL_BALL_SPEED: f32 = 5.0;
pub const MAX_VERTICAL_SPEED: f32 = 10.0;
pub const COUNTDOWN_START: u32 = 3;
pub const WIN_SCORE: u32 = 5;

/// A peer subscribed to a room's presence channel.
///
/// The `id` is an opaque per-device identity handed to the session at
/// creation; it is never generated inside the engine. Host election orders
/// members lexicographically by `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    pub name: String,
}

impl Member {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Full game snapshot.
///
/// The authoritative copy lives on the elected host and is advanced once per
/// frame. The guest only ever holds a shadow copy, replaced wholesale by each
/// received `GameEvent::GameStateSync`.
///
/// Paddle sides are logical: `paddle_host_y` is always the left paddle owned
/// by whichever peer is currently host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub ball_x: f32,
    pub ball_y: f32,
    pub ball_vx: f32,
    pub ball_vy: f32,
    pub paddle_host_y: f32,
    pub paddle_guest_y: f32,
    pub score_host: u32,
    pub score_guest: u32,
    pub playing: bool,
    pub countdown: u32,
}

impl GameState {
    /// State at the start of a fresh match: ball centered on the first serve,
    /// paddles centered, scores zeroed.
    pub fn initial() -> Self {
        Self {
            ball_x: CANVAS_WIDTH / 2.0,
            ball_y: CANVAS_HEIGHT / 2.0,
            ball_vx: INITIAL_BALL_SPEED,
            ball_vy: INITIAL_BALL_SPEED,
            paddle_host_y: CANVAS_HEIGHT / 2.0 - PADDLE_HEIGHT / 2.0,
            paddle_guest_y: CANVAS_HEIGHT / 2.0 - PADDLE_HEIGHT / 2.0,
            score_host: 0,
            score_guest: 0,
            playing: false,
            countdown: COUNTDOWN_START,
        }
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::initial()
    }
}

/// Clamps a paddle position so the paddle stays fully on the canvas.
pub fn clamp_paddle_y(y: f32) -> f32 {
    y.clamp(0.0, CANVAS_HEIGHT - PADDLE_HEIGHT)
}

/// Protocol messages exchanged over the room channel.
///
/// One closed variant per message kind; the payload shape of each kind is
/// fixed. Presence joins and leaves are not in here because the channel
/// itself reports them as member events.
///
/// All variants except `PaddleMove` are only ever sent by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum GameEvent {
    /// Unauthoritative preview of the sender's own paddle position, applied
    /// immediately on the remote screen and healed by the next snapshot.
    PaddleMove { member_id: String, paddle_y: f32 },
    /// One step of the pre-match countdown.
    CountdownTick { value: u32 },
    /// Countdown finished; both peers enter Playing.
    GameStart,
    /// Full authoritative snapshot, replacing the guest's shadow state.
    #[serde(rename = "game-state")]
    GameStateSync(GameState),
    /// A score reached the win threshold.
    GameOver { winner: String },
    /// Host reset the match; guests reset their shadow state and re-enter
    /// the countdown.
    Restart,
}

impl GameEvent {
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Total, non-throwing parse: anything that does not match a known
    /// message shape yields `None` and is ignored by the receiver.
    pub fn decode(payload: &str) -> Option<GameEvent> {
        serde_json::from_str(payload).ok()
    }
}
