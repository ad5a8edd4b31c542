//! Cooperative tick driver for one peer.
//!
//! The browser's animation-frame loop is reframed here as a single event
//! loop: a frame interval paces simulation (host) or redraw (guest), a
//! one-second interval paces the countdown, channel events and local
//! commands arrive over channels, and everything interleaves at callback
//! granularity inside one `select!` — the session is owned by this task, so
//! no locking is needed.
//!
//! Teardown is paired by construction: the loop owns the channel
//! subscription, and every exit path (explicit leave, command stream closed,
//! channel closed) unsubscribes and stops requesting ticks together, so no
//! broadcast can outlive membership.

use crate::channel::{ChannelEvent, PresenceChannel};
use crate::session::{RoomPhase, Session};
use log::{info, warn};
use shared::GameEvent;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, MissedTickBehavior};

/// Frame pacing of the simulation/redraw tick.
pub const FRAME_RATE_HZ: u32 = 60;

/// Local player intents, fed to the loop from whatever input surface the
/// embedding provides.
#[derive(Debug, Clone, PartialEq)]
pub enum PeerCommand {
    StartMatch,
    Restart,
    MovePaddle(f32),
    Leave,
}

/// Render-ready summary of the session, published after every loop
/// iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub phase: RoomPhase,
    pub is_host: bool,
    pub has_opponent: bool,
    pub score_host: u32,
    pub score_guest: u32,
    pub countdown: u32,
    pub ball_y: f32,
    /// This peer's own paddle.
    pub paddle_y: f32,
}

/// Handle for steering and observing a running peer loop.
#[derive(Clone)]
pub struct PeerHandle {
    pub commands: mpsc::UnboundedSender<PeerCommand>,
    pub view: watch::Receiver<SessionView>,
}

pub struct PeerRuntime<C: PresenceChannel> {
    session: Session,
    channel: C,
    events: mpsc::UnboundedReceiver<ChannelEvent>,
    commands: mpsc::UnboundedReceiver<PeerCommand>,
    view_tx: watch::Sender<SessionView>,
}

impl<C: PresenceChannel> PeerRuntime<C> {
    /// Pairs a session with its live channel subscription. The subscription
    /// is owned by the runtime from here on; it is released when `run`
    /// returns, never earlier.
    pub fn new(
        session: Session,
        channel: C,
        events: mpsc::UnboundedReceiver<ChannelEvent>,
    ) -> (Self, PeerHandle) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(view_of(&session));

        let runtime = Self {
            session,
            channel,
            events,
            commands: command_rx,
            view_tx,
        };
        let handle = PeerHandle {
            commands: command_tx,
            view: view_rx,
        };
        (runtime, handle)
    }

    /// Runs the peer until it leaves the room or the channel closes.
    pub async fn run(mut self) {
        let mut frame = interval(Duration::from_secs_f32(1.0 / FRAME_RATE_HZ as f32));
        frame.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut countdown = interval(Duration::from_secs(1));
        countdown.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                event = self.events.recv() => {
                    let Some(event) = event else {
                        info!("presence channel closed for room {}", self.session.room_id());
                        break;
                    };
                    self.session.handle_channel_event(event);
                }
                command = self.commands.recv() => {
                    match command {
                        None | Some(PeerCommand::Leave) => {
                            info!("leaving room {}", self.session.room_id());
                            break;
                        }
                        Some(PeerCommand::StartMatch) => match self.session.start_match() {
                            Ok(out) => {
                                countdown.reset();
                                self.publish_all(out);
                            }
                            Err(err) => warn!("start rejected: {}", err),
                        },
                        Some(PeerCommand::Restart) => match self.session.restart() {
                            Ok(out) => {
                                countdown.reset();
                                self.publish_all(out);
                            }
                            Err(err) => warn!("restart rejected: {}", err),
                        },
                        Some(PeerCommand::MovePaddle(delta)) => {
                            let out = self.session.move_paddle(delta);
                            self.publish_all(out);
                        }
                    }
                }
                _ = countdown.tick() => {
                    let out = self.session.countdown_tick();
                    self.publish_all(out);
                }
                _ = frame.tick() => {
                    let out = self.session.frame();
                    self.publish_all(out);
                }
            }

            self.view_tx.send_replace(view_of(&self.session));
        }

        // Unsubscribe and tick cancellation happen together: dropping out of
        // the loop stops all ticks, and the subscription is released here
        // (and again in its Drop, which is idempotent, for panic paths).
        self.channel.unsubscribe();
    }

    /// Best-effort broadcasting: a failed publish costs the remote peer a
    /// frame of freshness, it never stops the local loop.
    fn publish_all(&self, events: Vec<GameEvent>) {
        for event in events {
            let payload = match event.encode() {
                Ok(payload) => payload,
                Err(err) => {
                    warn!("failed to encode {:?}: {}", event, err);
                    continue;
                }
            };
            if let Err(err) = self.channel.publish(payload) {
                warn!(
                    "publish failed in room {}: {}",
                    self.session.room_id(),
                    err
                );
            }
        }
    }
}

fn view_of(session: &Session) -> SessionView {
    let game = session.game();
    SessionView {
        phase: session.phase().clone(),
        is_host: session.is_host(),
        has_opponent: session.opponent().is_some(),
        score_host: game.score_host,
        score_guest: game.score_guest,
        countdown: game.countdown,
        ball_y: game.ball_y,
        paddle_y: if session.is_host() {
            game.paddle_host_y
        } else {
            game.paddle_guest_y
        },
    }
}
