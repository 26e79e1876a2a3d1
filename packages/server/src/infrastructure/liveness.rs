//! Background liveness sweep.
//!
//! Started once at service start-up and stopped at shutdown. Every
//! `interval` it asks the registry to probe connections that have been
//! silent for longer than `stale_after`.

use std::{sync::Arc, time::Duration};

use ordertalk_shared::time::Clock;
use tokio::{sync::watch, task::JoinHandle, time::MissedTickBehavior};

use crate::{
    domain::{ConnectionRegistry, Timestamp},
    infrastructure::dto::websocket::PingMessage,
};

/// Sweep timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LivenessConfig {
    pub interval: Duration,
    pub stale_after: Duration,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            stale_after: Duration::from_secs(30),
        }
    }
}

/// Handle to the running sweep task.
pub struct LivenessSweep {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl LivenessSweep {
    /// Spawn the sweep task.
    pub fn start(
        registry: Arc<dyn ConnectionRegistry>,
        clock: Arc<dyn Clock>,
        config: LivenessConfig,
    ) -> Self {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run_sweep(registry, clock, config, shutdown_rx));
        tracing::info!(
            "Liveness sweep started (interval {:?}, stale after {:?})",
            config.interval,
            config.stale_after
        );
        Self { shutdown, handle }
    }

    /// Signal the task to exit and wait for it.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.handle.await {
            tracing::warn!("Liveness sweep ended abnormally: {}", e);
        }
        tracing::info!("Liveness sweep stopped");
    }
}

async fn run_sweep(
    registry: Arc<dyn ConnectionRegistry>,
    clock: Arc<dyn Clock>,
    config: LivenessConfig,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // the first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
        }

        let probe = match serde_json::to_string(&PingMessage::new()) {
            Ok(probe) => probe,
            Err(e) => {
                tracing::error!("Failed to encode liveness probe: {}", e);
                continue;
            }
        };

        // Run each cycle in its own task so a panic ends the cycle, not the sweep.
        let cycle_registry = registry.clone();
        let now = Timestamp::new(clock.now_millis());
        let cycle = tokio::spawn(async move {
            cycle_registry
                .sweep_stale(now, config.stale_after, &probe)
                .await
        });

        match cycle.await {
            Ok(report) if report.evicted > 0 => {
                tracing::info!(
                    "Liveness sweep probed {} and evicted {} connection(s)",
                    report.probed,
                    report.evicted
                );
            }
            Ok(report) => {
                tracing::debug!("Liveness sweep probed {} connection(s)", report.probed);
            }
            Err(e) => {
                tracing::error!("Liveness sweep cycle failed: {}", e);
            }
        }
    }
}
