//! Authoritative physics stepper, run only by the elected host.
//!
//! The guest never executes any of this; it renders the last received
//! snapshot. One call to [`step`] corresponds to one rendering frame.

use rand::Rng;
use shared::{
    GameState, CANVAS_HEIGHT, CANVAS_WIDTH, INITIAL_BALL_SPEED, MAX_VERTICAL_SPEED, PADDLE_HEIGHT,
    PADDLE_WIDTH,
};

/// Which logical side took the point during a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scored {
    Host,
    Guest,
}

/// Advances the ball/paddle/score state by one frame.
///
/// Fixed order: integrate the ball, reflect off the horizontal walls, test
/// both paddles, then score on either goal line. The vertical velocity clamp
/// runs every step so perturbation from paddle hits can never accumulate past
/// the speed cap.
pub fn step(state: &mut GameState, rng: &mut impl Rng) -> Option<Scored> {
    state.ball_x += state.ball_vx;
    state.ball_y += state.ball_vy;

    if state.ball_y <= 0.0 || state.ball_y >= CANVAS_HEIGHT {
        state.ball_vy = -state.ball_vy;
    }

    // Host defends the left goal line.
    if state.ball_x <= PADDLE_WIDTH
        && state.ball_y >= state.paddle_host_y
        && state.ball_y <= state.paddle_host_y + PADDLE_HEIGHT
    {
        state.ball_vx = state.ball_vx.abs();
        state.ball_vy += perturbation(rng);
    }

    if state.ball_x >= CANVAS_WIDTH - PADDLE_WIDTH
        && state.ball_y >= state.paddle_guest_y
        && state.ball_y <= state.paddle_guest_y + PADDLE_HEIGHT
    {
        state.ball_vx = -state.ball_vx.abs();
        state.ball_vy += perturbation(rng);
    }

    let scored = if state.ball_x < 0.0 {
        state.score_guest += 1;
        reset_ball(state, rng);
        Some(Scored::Guest)
    } else if state.ball_x > CANVAS_WIDTH {
        state.score_host += 1;
        reset_ball(state, rng);
        Some(Scored::Host)
    } else {
        None
    };

    state.ball_vy = state
        .ball_vy
        .clamp(-MAX_VERTICAL_SPEED, MAX_VERTICAL_SPEED);

    scored
}

/// Small bounded random delta applied to the vertical velocity on a paddle
/// hit, so rallies never become perfectly periodic.
fn perturbation(rng: &mut impl Rng) -> f32 {
    (rng.gen::<f32>() * 2.0 - 1.0) * 0.5
}

/// Returns the ball to center for a fresh serve: random horizontal sign at
/// serve speed, vertical component smaller than the opening serve.
pub fn reset_ball(state: &mut GameState, rng: &mut impl Rng) {
    state.ball_x = CANVAS_WIDTH / 2.0;
    state.ball_y = CANVAS_HEIGHT / 2.0;
    state.ball_vx = if rng.gen_bool(0.5) {
        INITIAL_BALL_SPEED
    } else {
        -INITIAL_BALL_SPEED
    };
    state.ball_vy = rng.gen_range(-2.0..2.0);
}
