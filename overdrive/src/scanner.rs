use crate::error::{Error, Result};
use crate::vehicle::{Vehicle, VehicleEvent, DEFAULT_ACCELERATION};
use async_trait::async_trait;
use itertools::Itertools;
use overdrive_codecs::track::{TrackPiece, TrackPieceType};
use std::collections::{HashSet, VecDeque};
use std::ops::Deref;
use std::sync::Arc;
use tokio::sync::broadcast;

pub const SCAN_SPEED: u16 = 300;

/// The reconstructed track: an ordered piece sequence starting on START and
/// ending on FINISH. Immutable once built; clones share one allocation, so
/// every session reads the same map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackMap {
    pieces: Arc<[TrackPiece]>,
}

impl TrackMap {
    /// Build a map from a scanned piece sequence, rotating it into canonical
    /// START..FINISH order first.
    pub fn from_pieces(pieces: Vec<TrackPiece>) -> Result<Self> {
        let pieces = canonicalize(pieces)?;
        Ok(Self {
            pieces: pieces.into(),
        })
    }
}

impl Deref for TrackMap {
    type Target = [TrackPiece];

    fn deref(&self) -> &Self::Target {
        &self.pieces
    }
}

/// Rotate the tail of `pieces` to the front until the sequence starts with
/// START and ends with FINISH. The collected sequence is a rotation of the
/// true cyclic order and START/FINISH are a unique adjacent pair in that
/// cycle, so this recovers the canonical order without knowing where the
/// scan began.
pub fn canonicalize(pieces: Vec<TrackPiece>) -> Result<Vec<TrackPiece>> {
    let mut pieces = VecDeque::from(pieces);
    for _ in 0..pieces.len() {
        let starts = pieces
            .front()
            .is_some_and(|piece| piece.piece_type == TrackPieceType::Start);
        let finishes = pieces
            .back()
            .is_some_and(|piece| piece.piece_type == TrackPieceType::Finish);
        if starts && finishes {
            return Ok(pieces.into());
        }
        if let Some(last) = pieces.pop_back() {
            pieces.push_front(last);
        }
    }
    Err(Error::InvalidTrack)
}

/// A strategy that can reconstruct the track with one vehicle and bring
/// others to a reference point. Callers pick the implementation.
#[async_trait]
pub trait ScanStrategy: Send {
    async fn scan(&mut self) -> Result<TrackMap>;

    async fn align(&self, vehicle: &Vehicle, target_previous: TrackPieceType) -> Result<()> {
        vehicle.align(target_previous).await
    }
}

/// Drives one vehicle a full lap and records the pieces it crosses.
pub struct Scanner {
    vehicle: Vehicle,
}

impl Scanner {
    pub fn new(vehicle: Vehicle) -> Self {
        Self { vehicle }
    }
}

#[async_trait]
impl ScanStrategy for Scanner {
    /// Blocks until the lap closes; if the vehicle never reports a decodable
    /// piece this never returns, so impose an external deadline.
    async fn scan(&mut self) -> Result<TrackMap> {
        let mut events = self.vehicle.events();
        self.vehicle.set_speed(SCAN_SPEED, DEFAULT_ACCELERATION).await?;

        let mut pieces = Vec::new();
        let mut seen = HashSet::new();
        loop {
            match events.recv().await {
                Ok(VehicleEvent::TrackPieceChange(Some(piece))) => {
                    pieces.push(piece);
                    seen.insert(piece.piece_type);
                    // both boundary pieces seen: the loop is closed
                    if seen.contains(&TrackPieceType::Start)
                        && seen.contains(&TrackPieceType::Finish)
                    {
                        break;
                    }
                }
                Ok(VehicleEvent::TrackPieceChange(None)) => {}
                Ok(VehicleEvent::Disconnected) => return Err(Error::Disconnected),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Scan reader lagged by {skipped} events");
                }
                Err(broadcast::error::RecvError::Closed) => return Err(Error::Disconnected),
            }
        }
        self.vehicle.stop().await?;

        let map = TrackMap::from_pieces(pieces)?;
        tracing::info!(
            "Scanned {} pieces: {}",
            map.len(),
            map.iter().map(|piece| piece.piece_type).join(" -> ")
        );
        Ok(map)
    }
}
