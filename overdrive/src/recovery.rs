//! Automatic restart after a vehicle loses track of its own position.

use crate::vehicle::{Vehicle, VehicleEvent, DEFAULT_ACCELERATION};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};

/// How long the vehicle must go without a delocalization notification before
/// it is driven again.
pub const DELOCALIZATION_GRACE: Duration = Duration::from_secs(2);

/// Watch `vehicle` for delocalization events. The first one starts a monitor
/// that stops the vehicle, waits for [`DELOCALIZATION_GRACE`] of silence and
/// then restores the last commanded speed (or `recovery_speed` when given).
/// Further events while the monitor runs reset its wait window instead of
/// starting a second monitor. The watcher ends when the session disconnects.
pub fn recover_delocalization(vehicle: Vehicle, recovery_speed: Option<u16>) -> JoinHandle<()> {
    // subscribe before spawning so no event can slip past the watcher
    let events = vehicle.events();
    tokio::spawn(async move {
        let mut events = events;
        let (last_seen_tx, last_seen_rx) = watch::channel(Instant::now());
        let mut monitor: Option<JoinHandle<()>> = None;
        loop {
            match events.recv().await {
                Ok(VehicleEvent::Delocalized) => {
                    last_seen_tx.send_replace(Instant::now());
                    if monitor.as_ref().map_or(true, JoinHandle::is_finished) {
                        tracing::warn!(
                            "Vehicle {} delocalized, starting recovery",
                            vehicle.id()
                        );
                        monitor = Some(tokio::spawn(monitor_vehicle(
                            vehicle.clone(),
                            last_seen_rx.clone(),
                            recovery_speed,
                        )));
                    }
                }
                Ok(VehicleEvent::Disconnected) | Err(broadcast::error::RecvError::Closed) => break,
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(_)) => {}
            }
        }
        if let Some(monitor) = monitor {
            monitor.abort();
        }
    })
}

async fn monitor_vehicle(
    vehicle: Vehicle,
    last_seen: watch::Receiver<Instant>,
    recovery_speed: Option<u16>,
) {
    // read the speed to restore before the stop overwrites it
    let speed = recovery_speed.unwrap_or_else(|| vehicle.speed());
    if let Err(error) = vehicle.stop().await {
        tracing::warn!("Recovery could not stop vehicle {}: {error}", vehicle.id());
        return;
    }
    tracing::debug!("Recovery stopped vehicle {}", vehicle.id());
    loop {
        let elapsed = last_seen.borrow().elapsed();
        if elapsed >= DELOCALIZATION_GRACE {
            break;
        }
        sleep(DELOCALIZATION_GRACE - elapsed).await;
    }
    match vehicle.set_speed(speed, DEFAULT_ACCELERATION).await {
        Ok(()) => tracing::debug!(
            "Recovery restarted vehicle {} at {speed} mm/s",
            vehicle.id()
        ),
        Err(error) => {
            tracing::warn!("Recovery could not restart vehicle {}: {error}", vehicle.id());
        }
    }
}
