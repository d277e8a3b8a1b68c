//! Fleet scheduler
//!
//! Runs one fleet check per interval until every server is inactive, a
//! fatal console error occurs, or the process is interrupted. The first check
//! runs immediately.

use std::future::Future;
use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};

use crate::console::{AdminConsole, ConsoleError};
use crate::fleet::FleetController;

/// Why [`run_fleet`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Every server is inactive
    FleetRetired,
    /// The stop future resolved (Ctrl-C in the binary)
    Interrupted,
}

/// Tick the controller every `period` until it has nothing left to manage.
///
/// `stop` is polled while waiting between ticks, never in the middle of one.
pub async fn run_fleet<C, S>(
    controller: &mut FleetController<C>,
    period: Duration,
    stop: S,
) -> Result<StopReason, ConsoleError>
where
    C: AdminConsole,
    S: Future<Output = ()>,
{
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(stop);

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = &mut stop => {
                tracing::info!("[scheduler] [stop] interrupted, exiting");
                return Ok(StopReason::Interrupted);
            }
        }

        controller.run_tick().await?;

        if controller.should_exit() {
            tracing::info!("[scheduler] [stop] all servers are inactive, exiting");
            return Ok(StopReason::FleetRetired);
        }

        tracing::info!("[scheduler] [wait] next check in {}s", period.as_secs());
    }
}

/// Resolves on Ctrl-C. If the handler cannot be installed it never resolves.
pub async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("[scheduler] [signal] cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
