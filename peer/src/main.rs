//! Demo binary: two peers in one process play a full match over the
//! in-process presence hub, each driving its paddle toward the ball.

use clap::Parser;
use log::info;
use peer::channel::LocalHub;
use peer::runtime::{PeerCommand, PeerHandle, PeerRuntime, SessionView};
use peer::session::{RoomPhase, Session};
use shared::{Member, PADDLE_HEIGHT, PADDLE_SPEED};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::interval;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Room identifier (any URL-safe string)
    #[arg(short, long, default_value = "demo")]
    room: String,

    /// Display name of the first player (smallest id, so elected host)
    #[arg(long, default_value = "Alice")]
    first: String,

    /// Display name of the second player
    #[arg(long, default_value = "Bob")]
    second: String,

    /// Simulation seed of the elected host
    #[arg(long, default_value = "42")]
    seed: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let hub = LocalHub::new();

    info!("starting demo match in room {}", args.room);
    let (task_a, handle_a) = spawn_peer(
        &hub,
        &args.room,
        Member::new("p1", &args.first),
        args.seed,
    );
    let (task_b, handle_b) = spawn_peer(
        &hub,
        &args.room,
        Member::new("p2", &args.second),
        args.seed + 1,
    );

    // "p1" sorts first, so that peer is the host and may start the match
    // once it sees an opponent.
    wait_for(&handle_a, |view| {
        view.phase == RoomPhase::Waiting && view.has_opponent
    })
    .await?;
    handle_a.commands.send(PeerCommand::StartMatch)?;

    let paddles_a = tokio::spawn(drive_paddles(handle_a.clone()));
    let paddles_b = tokio::spawn(drive_paddles(handle_b.clone()));

    let final_view = wait_for(&handle_a, |view| {
        matches!(view.phase, RoomPhase::GameOver { .. })
    })
    .await?;
    if let RoomPhase::GameOver { winner } = &final_view.phase {
        println!(
            "{} wins {}-{}",
            winner,
            final_view.score_host.max(final_view.score_guest),
            final_view.score_host.min(final_view.score_guest)
        );
    }

    handle_a.commands.send(PeerCommand::Leave)?;
    handle_b.commands.send(PeerCommand::Leave)?;
    let _ = tokio::join!(task_a, task_b, paddles_a, paddles_b);
    Ok(())
}

fn spawn_peer(
    hub: &LocalHub,
    room: &str,
    member: Member,
    seed: u64,
) -> (JoinHandle<()>, PeerHandle) {
    let (subscription, events) = hub.subscribe(room, member.clone());
    let session = Session::with_seed(room, member, seed);
    let (runtime, handle) = PeerRuntime::new(session, subscription, events);
    (tokio::spawn(runtime.run()), handle)
}

/// Waits until the peer's published view satisfies `predicate`.
async fn wait_for(
    handle: &PeerHandle,
    predicate: impl Fn(&SessionView) -> bool,
) -> Result<SessionView, tokio::sync::watch::error::RecvError> {
    let mut view = handle.view.clone();
    loop {
        if predicate(&view.borrow()) {
            return Ok(view.borrow().clone());
        }
        view.changed().await?;
    }
}

/// Stand-in for keyboard input: nudges the peer's paddle toward the ball
/// every frame. The guest steers by its shadow snapshot, exactly as a
/// rendering client would.
async fn drive_paddles(handle: PeerHandle) {
    // Deliberately slower than the frame rate so the paddles miss sometimes
    // and the match actually ends.
    let mut ticks = interval(Duration::from_millis(40));
    loop {
        ticks.tick().await;
        let view = handle.view.borrow().clone();
        match view.phase {
            RoomPhase::GameOver { .. } => break,
            RoomPhase::Playing => {
                let center = view.paddle_y + PADDLE_HEIGHT / 2.0;
                let delta = if view.ball_y > center {
                    PADDLE_SPEED
                } else {
                    -PADDLE_SPEED
                };
                if handle.commands.send(PeerCommand::MovePaddle(delta)).is_err() {
                    break;
                }
            }
            _ => {}
        }
    }
}
