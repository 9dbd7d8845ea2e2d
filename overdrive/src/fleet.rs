use crate::error::{Error, Result};
use crate::scanner::{ScanStrategy, Scanner, TrackMap};
use crate::transport::{Device, VehicleAdapter};
use crate::vehicle::{Vehicle, DEFAULT_ACCELERATION};
use futures::future;
use overdrive_codecs::advertisement::Advertisement;
use overdrive_codecs::track::TrackPieceType;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;

pub const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(10);
const AUTO_ID_BASE: u16 = 1;
/// Pause after pre-scan alignment so motion fully settles.
const SETTLE_DELAY: Duration = Duration::from_secs(1);
/// Head start granted to the scanner before other vehicles align behind it.
const STAGGER_DELAY: Duration = Duration::from_secs(1);
const NUDGE_SPEED: u16 = 150;
const NUDGE_DURATION: Duration = Duration::from_secs(1);

/// Admission filter: the advertisement must decode and the vehicle must not
/// sit on a charger.
pub fn is_supported_vehicle(device: &Device) -> bool {
    match device.local_name.parse::<Advertisement>() {
        Ok(advertisement) => !advertisement.battery.on_charger,
        Err(_) => false,
    }
}

#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Vehicle to drive the scan lap; picked arbitrarily when `None`.
    pub scan_vehicle: Option<u16>,
    /// Align every vehicle to the start line before scanning, so they may
    /// begin anywhere on the track. When `false`, vehicles must already sit
    /// between START and FINISH and the others align while the scan runs.
    pub align_pre_scan: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            scan_vehicle: None,
            align_pre_scan: true,
        }
    }
}

/// Owns vehicle discovery, connection lifecycle, id allocation and the
/// one-time scan that publishes a shared [`TrackMap`] to every session.
pub struct Fleet {
    adapter: Arc<dyn VehicleAdapter>,
    discovery_timeout: Duration,
    vehicles: HashMap<u16, Vehicle>,
    map: Option<TrackMap>,
    departed_tx: mpsc::UnboundedSender<u16>,
    departed_rx: mpsc::UnboundedReceiver<u16>,
}

impl Fleet {
    pub fn new(adapter: Arc<dyn VehicleAdapter>) -> Self {
        let (departed_tx, departed_rx) = mpsc::unbounded_channel();
        Self {
            adapter,
            discovery_timeout: DEFAULT_DISCOVERY_TIMEOUT,
            vehicles: HashMap::new(),
            map: None,
            departed_tx,
            departed_rx,
        }
    }

    pub fn with_discovery_timeout(mut self, timeout: Duration) -> Self {
        self.discovery_timeout = timeout;
        self
    }

    pub fn map(&self) -> Option<&TrackMap> {
        self.map.as_ref()
    }

    pub fn vehicles(&self) -> impl Iterator<Item = &Vehicle> {
        self.vehicles.values().filter(|vehicle| vehicle.is_connected())
    }

    pub fn vehicle(&self, id: u16) -> Option<&Vehicle> {
        self.vehicles.get(&id)
    }

    /// Drop sessions whose notification stream has ended.
    fn prune_departed(&mut self) {
        while let Ok(id) = self.departed_rx.try_recv() {
            if self.vehicles.remove(&id).is_some() {
                tracing::info!("Vehicle {id} left the fleet");
            }
        }
    }

    fn allocate_id(&self, requested: Option<u16>) -> Result<u16> {
        match requested {
            Some(id) if self.vehicles.contains_key(&id) => Err(Error::DuplicateVehicleId(id)),
            Some(id) => Ok(id),
            None => {
                let mut id = AUTO_ID_BASE;
                while self.vehicles.contains_key(&id) {
                    id += 1;
                }
                Ok(id)
            }
        }
    }

    async fn discover(&self, address: Option<&str>) -> Result<Device> {
        let filter = move |device: &Device| {
            is_supported_vehicle(device)
                && address.map_or(true, |address| device.address == address)
        };
        match self
            .adapter
            .discover(&filter, self.discovery_timeout)
            .await?
        {
            Some(device) => Ok(device),
            None => Err(Error::VehicleNotFound),
        }
    }

    async fn admit(&mut self, id: u16, device: &Device) -> Result<Vehicle> {
        let link = self.adapter.connect(device).await?;
        let vehicle =
            Vehicle::connect(id, link, self.map.clone(), self.departed_tx.clone()).await?;
        tracing::info!("Connected vehicle {id} at {}", device.address);
        self.vehicles.insert(id, vehicle.clone());
        Ok(vehicle)
    }

    /// Connect to one non-charging vehicle.
    pub async fn connect_one(&mut self, vehicle_id: Option<u16>) -> Result<Vehicle> {
        self.prune_departed();
        let id = self.allocate_id(vehicle_id)?;
        let device = self.discover(None).await?;
        self.admit(id, &device).await
    }

    /// Connect to the vehicle with a specific address.
    pub async fn connect_specific(
        &mut self,
        address: &str,
        vehicle_id: Option<u16>,
    ) -> Result<Vehicle> {
        self.prune_departed();
        let id = self.allocate_id(vehicle_id)?;
        let device = self.discover(Some(address)).await?;
        self.admit(id, &device).await
    }

    /// Connect `count` vehicles, one after another; concurrent connection
    /// attempts are unreliable on this class of device. A failure part-way
    /// leaves the vehicles connected so far in the fleet.
    pub async fn connect_many(
        &mut self,
        count: usize,
        vehicle_ids: Option<Vec<Option<u16>>>,
    ) -> Result<Vec<Vehicle>> {
        let ids = vehicle_ids.unwrap_or_else(|| vec![None; count]);
        if ids.len() != count {
            return Err(Error::VehicleIdCountMismatch {
                requested: count,
                provided: ids.len(),
            });
        }
        let mut connected = Vec::with_capacity(count);
        for id in ids {
            connected.push(self.connect_one(id).await?);
        }
        Ok(connected)
    }

    /// Disconnect every vehicle concurrently; safe once connections exist.
    pub async fn disconnect_all(&mut self) -> Result<()> {
        self.prune_departed();
        let vehicles: Vec<Vehicle> = self.vehicles.values().cloned().collect();
        let results = future::join_all(vehicles.iter().map(|vehicle| vehicle.disconnect())).await;
        self.vehicles.clear();
        let mut first_error = None;
        for (vehicle, result) in vehicles.iter().zip(results) {
            if let Err(error) = result {
                tracing::warn!("Vehicle {} failed to disconnect: {error}", vehicle.id());
                first_error.get_or_insert(error);
            }
        }
        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Reconstruct the track with the default [`Scanner`] and publish the
    /// map into every session. One-time: a second call fails with
    /// [`Error::DuplicateScan`] and leaves the existing map untouched.
    pub async fn scan(&mut self, options: ScanOptions) -> Result<TrackMap> {
        if self.map.is_some() {
            return Err(Error::DuplicateScan);
        }
        let scan_vehicle = self.select_scan_vehicle(options.scan_vehicle)?;
        let mut scanner = Scanner::new(scan_vehicle.clone());
        self.scan_with(&mut scanner, scan_vehicle, options.align_pre_scan)
            .await
    }

    /// Like [`Fleet::scan`] with a caller-chosen [`ScanStrategy`].
    pub async fn scan_with(
        &mut self,
        scanner: &mut dyn ScanStrategy,
        scan_vehicle: Vehicle,
        align_pre_scan: bool,
    ) -> Result<TrackMap> {
        if self.map.is_some() {
            return Err(Error::DuplicateScan);
        }
        self.prune_departed();
        if !self.vehicles.contains_key(&scan_vehicle.id()) {
            return Err(Error::UnknownVehicle(scan_vehicle.id()));
        }

        if align_pre_scan {
            // everyone walks back to the start line first, so placement on
            // the track does not matter
            future::try_join_all(
                self.vehicles
                    .values()
                    .map(|vehicle| vehicle.align(TrackPieceType::Finish)),
            )
            .await?;
            sleep(SETTLE_DELAY).await;
        }

        // creep forward so the scanner does not re-trigger the start/finish
        // boundary from a standing start
        scan_vehicle.set_speed(NUDGE_SPEED, DEFAULT_ACCELERATION).await?;
        sleep(NUDGE_DURATION).await;
        scan_vehicle.stop().await?;

        let mut align_tasks = Vec::new();
        if !align_pre_scan {
            for vehicle in self.vehicles.values() {
                if vehicle.id() == scan_vehicle.id() {
                    continue;
                }
                let vehicle = vehicle.clone();
                align_tasks.push(tokio::spawn(async move {
                    // stay out of the scanner's readings
                    sleep(STAGGER_DELAY).await;
                    vehicle.align(TrackPieceType::Finish).await
                }));
            }
        }

        let map = scanner.scan().await?;
        for task in align_tasks {
            task.await??;
        }

        self.map = Some(map.clone());
        for vehicle in self.vehicles.values() {
            vehicle.publish_map(map.clone());
            let position = if vehicle.id() == scan_vehicle.id() {
                0
            } else {
                // one piece behind the scanner
                map.len() - 1
            };
            vehicle.set_position(position);
        }
        tracing::info!("Published a {} piece map to the fleet", map.len());
        Ok(map)
    }

    fn select_scan_vehicle(&mut self, requested: Option<u16>) -> Result<Vehicle> {
        self.prune_departed();
        match requested {
            Some(id) => self
                .vehicles
                .get(&id)
                .cloned()
                .ok_or(Error::UnknownVehicle(id)),
            None => self
                .vehicles
                .values()
                .next()
                .cloned()
                .ok_or(Error::VehicleNotFound),
        }
    }
}
