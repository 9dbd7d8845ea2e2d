use overdrive_codecs::error::ProtocolError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Transport-level failures, split by kind so callers can retry a timeout
/// but abort on a bus or generic failure.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("connection attempt timed out")]
    Timeout,

    #[error("data bus failure: {0}")]
    Bus(String),

    #[error("connection failed: {0}")]
    Failed(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("no supported vehicle was found within the discovery timeout")]
    VehicleNotFound,

    #[error("vehicle id {0} is already in use")]
    DuplicateVehicleId(u16),

    #[error("{provided} vehicle ids were provided for {requested} requested connections")]
    VehicleIdCountMismatch { requested: usize, provided: usize },

    #[error("no connected vehicle with id {0}")]
    UnknownVehicle(u16),

    #[error("the track has already been scanned")]
    DuplicateScan,

    #[error("the vehicle is disconnected")]
    Disconnected,

    #[error("the vehicle did not disconnect cleanly")]
    DisconnectFailed,

    #[error("{0} is not functional on this hardware")]
    Unsupported(&'static str),

    #[error("scanned sequence has no start/finish boundary")]
    InvalidTrack,

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
