//! Idle-server decision engine
//!
//! Decides, for one server and one tick, whether to leave it alone, rotate it
//! back to its desired map, or shut it down. Everything here is a pure
//! function of its inputs; wall-clock time is passed in as `NaiveDateTime`.

use chrono::{NaiveDateTime, Timelike};

/// Idle-shutdown settings. `kill_on_empty` and `kill_after_hour` are
/// mutually exclusive once the config has been normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KillPolicy {
    pub kill_on_empty: bool,
    /// Local hour after which an empty server is shut down, -1 = disabled
    pub kill_after_hour: i32,
}

impl KillPolicy {
    /// Neither kill rule active.
    pub const NONE: KillPolicy = KillPolicy {
        kill_on_empty: false,
        kill_after_hour: -1,
    };
}

/// What to do with a server this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    None,
    ChangeMap,
    Shutdown,
}

/// Inputs to [`decide`] for one server.
#[derive(Debug, Clone, Copy)]
pub struct Decision<'a> {
    pub player_count: u32,
    pub current_map: &'a str,
    pub desired_map: &'a str,
    pub now: NaiveDateTime,
    pub time_started: NaiveDateTime,
    pub policy: KillPolicy,
    pub kill_threshold_offset: i32,
}

/// Extra hours added to `kill_after_hour`, fixed for the life of a controller.
///
/// A controller started in the afternoon with a kill hour in the early
/// morning (0..=12) must wait for the *next* morning, so the kill hour is
/// pushed into the next day.
pub fn kill_threshold_offset(time_started: NaiveDateTime, policy: &KillPolicy) -> i32 {
    if time_started.hour() >= 12 && (0..=12).contains(&policy.kill_after_hour) {
        24
    } else {
        0
    }
}

/// Steps 1-3 of the decision: is an empty server due for shutdown?
pub fn shutdown_due(
    player_count: u32,
    now: NaiveDateTime,
    time_started: NaiveDateTime,
    policy: &KillPolicy,
    kill_threshold_offset: i32,
) -> bool {
    if player_count > 0 {
        return false;
    }
    if policy.kill_on_empty {
        return true;
    }
    if policy.kill_after_hour == -1 {
        return false;
    }

    let day_offset = if now.date() != time_started.date() { 24 } else { 0 };
    let threshold = policy.kill_after_hour + kill_threshold_offset;

    now.hour() as i32 + day_offset > threshold
}

/// Pick the single action for this tick.
pub fn decide(input: &Decision<'_>) -> Action {
    if input.player_count > 0 {
        return Action::None;
    }

    if shutdown_due(
        input.player_count,
        input.now,
        input.time_started,
        &input.policy,
        input.kill_threshold_offset,
    ) {
        return Action::Shutdown;
    }

    if input.current_map != input.desired_map {
        Action::ChangeMap
    } else {
        Action::None
    }
}
