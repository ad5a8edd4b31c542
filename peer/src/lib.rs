//! # Peer-Synchronized Pong Engine
//!
//! This library implements one peer of a two-player networked Pong game
//! whose only transport is a presence pub/sub channel: there is no
//! authoritative backend, so one of the two browsers has to be the server.
//!
//! ## Architecture Overview
//!
//! ### Host Election (`election`)
//! Exactly one peer runs the authoritative simulation. The host is a pure
//! function of the presence member set (smallest member id), so both peers
//! agree on it without exchanging a single election message, and a host
//! disconnect promotes the survivor automatically.
//!
//! ### Session (`session`)
//! The room lifecycle state machine
//! (`Connecting → Waiting → Starting → Playing → GameOver`) plus the
//! synchronization protocol. The host's state machine drives itself and
//! pairs every transition with a broadcast; the guest's is a pure follower
//! of those broadcasts. All operations are sans-I/O: they return the events
//! to publish.
//!
//! ### Simulation (`sim`)
//! The per-frame physics stepper, executed only on the host. The guest never
//! simulates; it renders the last received full snapshot (last-write-wins),
//! plus the optimistic echo of its own paddle.
//!
//! ### Channel (`channel`)
//! The presence transport contract the engine depends on, and an in-process
//! hub implementing it for the demo binary and tests. The hosted provider's
//! adapter lives outside this crate.
//!
//! ### Runtime (`runtime`)
//! The cooperative tick loop tying the above together: frame and countdown
//! pacing, channel events, and local commands interleaved in one task, with
//! channel unsubscription guaranteed on every exit path.

pub mod channel;
pub mod election;
pub mod runtime;
pub mod session;
pub mod sim;
