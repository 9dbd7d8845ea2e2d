//! Client for small radio controlled vehicles that speak a fixed binary
//! packet protocol over a BLE-style transport. Decodes vehicle telemetry
//! into live position state and reconstructs the topology of an unknown
//! closed loop track by driving one vehicle around it.
//!
//! The radio itself is supplied by the caller through the
//! [`transport::VehicleAdapter`] contract; this crate only encodes and
//! decodes bytes and drives that contract.

pub mod error;
pub mod fleet;
pub mod lane;
pub mod recovery;
pub mod scanner;
pub mod transport;
pub mod vehicle;

pub use error::{ConnectionError, Error, Result};
pub use fleet::{Fleet, ScanOptions};
pub use scanner::{ScanStrategy, Scanner, TrackMap};
pub use vehicle::{Vehicle, VehicleEvent};

pub use overdrive_codecs as codecs;
