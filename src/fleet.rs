//! Fleet controller
//!
//! One [`FleetController::run_tick`] walks every active server in config
//! order: make sure we are logged in, read the player count, then shut the
//! server down or rotate its map if the idle policy says so. Servers are
//! checked one after another; a failure on one server only counts against
//! that server.

use anyhow::Result;
use chrono::{Local, NaiveDateTime};
use url::Url;

use crate::config::{FleetConfig, GameMode};
use crate::console::{AdminConsole, ConsoleError};
use crate::lifecycle::{FailureOutcome, ServerLifecycle, UNREACHABLE_THRESHOLD};
use crate::policy::{self, Action, Decision, KillPolicy};

/// One managed server and its lifecycle.
#[derive(Debug, Clone)]
pub struct ServerTarget {
    pub name: String,
    /// Scheme, host and WebAdmin port, path `/`
    pub root: Url,
    pub desired_map: String,
    pub game_mode: GameMode,
    pub config_subfolder: String,
    pub lifecycle: ServerLifecycle,
}

impl ServerTarget {
    pub fn new(
        name: String,
        root: Url,
        desired_map: String,
        game_mode: GameMode,
        config_subfolder: String,
        disabled: bool,
    ) -> Self {
        let lifecycle = if disabled {
            ServerLifecycle::disabled()
        } else {
            ServerLifecycle::new()
        };

        Self {
            name,
            root,
            desired_map,
            game_mode,
            config_subfolder,
            lifecycle,
        }
    }
}

/// WebAdmin login shared by every server.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Per-tick values shared by every server check.
struct TickContext<'a> {
    now: NaiveDateTime,
    time_started: NaiveDateTime,
    policy: KillPolicy,
    kill_threshold_offset: i32,
    credentials: &'a Credentials,
}

pub struct FleetController<C> {
    console: C,
    targets: Vec<ServerTarget>,
    credentials: Credentials,
    policy: KillPolicy,
    time_started: NaiveDateTime,
    kill_threshold_offset: i32,
}

impl<C: AdminConsole> FleetController<C> {
    pub fn new(
        console: C,
        targets: Vec<ServerTarget>,
        credentials: Credentials,
        policy: KillPolicy,
        time_started: NaiveDateTime,
    ) -> Self {
        let kill_threshold_offset = policy::kill_threshold_offset(time_started, &policy);
        if kill_threshold_offset != 0 {
            tracing::info!(
                "[fleet] [kill_policy] started after noon, kill hour {} applies to the next day",
                policy.kill_after_hour
            );
        }

        Self {
            console,
            targets,
            credentials,
            policy,
            time_started,
            kill_threshold_offset,
        }
    }

    /// Controller for the servers in `config`, started now.
    pub fn from_config(console: C, config: &FleetConfig) -> Result<Self> {
        let credentials = Credentials {
            username: config.username.clone(),
            password: config.password.clone(),
        };

        Ok(Self::new(
            console,
            config.targets()?,
            credentials,
            config.kill_policy(),
            Local::now().naive_local(),
        ))
    }

    pub fn targets(&self) -> &[ServerTarget] {
        &self.targets
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    pub fn console_mut(&mut self) -> &mut C {
        &mut self.console
    }

    pub fn kill_threshold_offset(&self) -> i32 {
        self.kill_threshold_offset
    }

    /// True once every server is inactive; nothing is left to manage.
    pub fn should_exit(&self) -> bool {
        self.targets.iter().all(|t| t.lifecycle.is_inactive())
    }

    /// Check every active server once, at the current local time.
    pub async fn run_tick(&mut self) -> Result<(), ConsoleError> {
        self.run_tick_at(Local::now().naive_local()).await
    }

    /// Check every active server once, as if it were `now`.
    ///
    /// Per-server errors are logged and counted against that server. Only a
    /// fatal console error ends the tick early and is returned.
    pub async fn run_tick_at(&mut self, now: NaiveDateTime) -> Result<(), ConsoleError> {
        let active = self.targets.iter().filter(|t| !t.lifecycle.is_inactive()).count();
        tracing::info!("[fleet] [tick] checking {} of {} servers", active, self.targets.len());

        let ctx = TickContext {
            now,
            time_started: self.time_started,
            policy: self.policy,
            kill_threshold_offset: self.kill_threshold_offset,
            credentials: &self.credentials,
        };

        for target in self.targets.iter_mut() {
            if target.lifecycle.is_inactive() {
                continue;
            }

            tracing::info!("[fleet] [check] server={} root={}", target.name, target.root);

            match check_server(&mut self.console, target, &ctx).await {
                Ok(()) => {}
                Err(err) if err.is_fatal() => {
                    tracing::error!("[fleet] [fatal] server={} error={}", target.name, err);
                    return Err(err);
                }
                Err(err) => record_failure(target, &err),
            }
        }

        Ok(())
    }
}

fn record_failure(target: &mut ServerTarget, err: &ConsoleError) {
    tracing::warn!("[fleet] [check_failed] server={} error={}", target.name, err);

    match target.lifecycle.record_failure() {
        FailureOutcome::Counted(count) => tracing::warn!(
            "[fleet] [unreachable] server={} count={}/{}",
            target.name,
            count,
            UNREACHABLE_THRESHOLD
        ),
        FailureOutcome::Retired => tracing::info!(
            "[fleet] [retired] server={} unreachable {} times in a row, no longer checking it",
            target.name,
            UNREACHABLE_THRESHOLD
        ),
        FailureOutcome::Ignored => {}
    }
}

async fn check_server<C: AdminConsole>(
    console: &mut C,
    target: &mut ServerTarget,
    ctx: &TickContext<'_>,
) -> Result<(), ConsoleError> {
    let root = target.root.clone();

    if !console.probe_session(&root).await? {
        tracing::info!("[fleet] [login] server={} not authenticated, logging in", target.name);
        console
            .login(&root, &ctx.credentials.username, &ctx.credentials.password)
            .await?;
    }

    let players = console.player_count(&root).await?;
    target.lifecycle.record_success();

    if players > 0 {
        tracing::info!("[fleet] [busy] server={} players={}, doing nothing", target.name, players);
        return Ok(());
    }

    let action = if policy::shutdown_due(
        players,
        ctx.now,
        ctx.time_started,
        &ctx.policy,
        ctx.kill_threshold_offset,
    ) {
        Action::Shutdown
    } else {
        let current_map = console.current_map(&root).await?;
        target.lifecycle.set_last_known_map(current_map.as_str());
        policy::decide(&Decision {
            player_count: players,
            current_map: &current_map,
            desired_map: &target.desired_map,
            now: ctx.now,
            time_started: ctx.time_started,
            policy: ctx.policy,
            kill_threshold_offset: ctx.kill_threshold_offset,
        })
    };

    match action {
        Action::None => {
            tracing::info!(
                "[fleet] [idle] server={} empty and on {}, doing nothing",
                target.name,
                target.desired_map
            );
        }
        Action::ChangeMap => {
            tracing::info!(
                "[fleet] [change_map] server={} empty on {}, switching to {}",
                target.name,
                target.lifecycle.last_known_map().unwrap_or("?"),
                target.desired_map
            );
            console
                .change_map(&root, target.game_mode, &target.config_subfolder, &target.desired_map)
                .await?;
        }
        Action::Shutdown => {
            tracing::info!("[fleet] [shutdown] server={} empty, shutting it down", target.name);
            console.shutdown(&root).await?;
            target.lifecycle.mark_shut_down();
            tracing::info!("[fleet] [shutdown] server={} is down, no longer checking it", target.name);
        }
    }

    Ok(())
}
