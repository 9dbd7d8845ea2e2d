//! Contract to the wireless transport. The crate never talks to a radio
//! directly; a [`VehicleAdapter`] implementation (typically backed by a BLE
//! client library) is handed in by the caller.

use crate::error::ConnectionError;
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use tokio::sync::mpsc;

pub use overdrive_codecs::{READ_CHARACTERISTIC_UUID, SERVICE_UUID, WRITE_CHARACTERISTIC_UUID};

/// A discovered peripheral: its address and the advertised local name the
/// vehicle packs its battery state, firmware version and name into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub address: String,
    pub local_name: String,
}

pub type DeviceFilter<'a> = &'a (dyn Fn(&Device) -> bool + Send + Sync);

#[async_trait]
pub trait VehicleAdapter: Send + Sync {
    /// Scan for a peripheral matching `filter` for up to `timeout`.
    /// `Ok(None)` means nothing matched in time.
    async fn discover(
        &self,
        filter: DeviceFilter<'_>,
        timeout: Duration,
    ) -> Result<Option<Device>, ConnectionError>;

    async fn connect(&self, device: &Device) -> Result<Box<dyn VehicleLink>, ConnectionError>;
}

/// One open connection to a vehicle.
#[async_trait]
pub trait VehicleLink: Send {
    async fn write_characteristic(
        &mut self,
        characteristic: &str,
        frame: &[u8],
    ) -> Result<(), ConnectionError>;

    /// Subscribe to notifications on `characteristic`. Each received `Bytes`
    /// is exactly one wire frame; the channel closes on disconnect.
    async fn subscribe(
        &mut self,
        characteristic: &str,
    ) -> Result<mpsc::Receiver<Bytes>, ConnectionError>;

    /// Returns whether the peripheral is now disconnected.
    async fn disconnect(&mut self) -> Result<bool, ConnectionError>;
}
