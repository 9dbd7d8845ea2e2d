//! Notifications a vehicle pushes to the controller.

use crate::battery::BatteryState;
use crate::error::ProtocolError;
use crate::packet::Packet;
use crate::track::TrackPiece;
use bytes::Buf;

pub mod decoder;

pub const PONG: u8 = 0x17;
pub const VERSION_RESPONSE: u8 = 0x19;
pub const TRACK_PIECE_UPDATE: u8 = 0x27;
pub const TRACK_PIECE_CHANGE: u8 = 0x29;
pub const DELOCALIZED: u8 = 0x2b;
pub const CHARGER_INFO: u8 = 0x3f;

pub fn is_message_type(msg_type: u8) -> bool {
    matches!(
        msg_type,
        PONG | VERSION_RESPONSE | TRACK_PIECE_UPDATE | TRACK_PIECE_CHANGE | DELOCALIZED
            | CHARGER_INFO
    )
}

#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    TrackPieceUpdate(TrackUpdate),
    TrackPieceChange,
    ChargerInfo(BatteryState),
    Delocalized,
    Pong,
    VersionResponse(u16),
}

/// Raw telemetry from a track piece update. The piece code is kept raw so a
/// failed classification does not discard the offset and speed readings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackUpdate {
    pub loc: u8,
    pub piece_code: u8,
    pub road_offset: f32,
    pub speed: u16,
    pub clockwise_raw: u8,
}

impl TrackUpdate {
    pub fn piece(&self) -> Result<TrackPiece, ProtocolError> {
        TrackPiece::from_raw(self.loc, self.piece_code, self.clockwise_raw)
    }
}

impl Notification {
    pub fn from_packet(packet: &Packet) -> Result<Self, ProtocolError> {
        let mut payload = packet.payload.clone();
        let ensure = |expected: usize| {
            if packet.payload.len() < expected {
                Err(ProtocolError::TruncatedPayload {
                    msg_type: packet.msg_type,
                    expected,
                    actual: packet.payload.len(),
                })
            } else {
                Ok(())
            }
        };
        match packet.msg_type {
            TRACK_PIECE_UPDATE => {
                ensure(9)?;
                Ok(Self::TrackPieceUpdate(TrackUpdate {
                    loc: payload.get_u8(),
                    piece_code: payload.get_u8(),
                    road_offset: payload.get_f32_le(),
                    speed: payload.get_u16_le(),
                    clockwise_raw: payload.get_u8(),
                }))
            }
            TRACK_PIECE_CHANGE => Ok(Self::TrackPieceChange),
            CHARGER_INFO => {
                ensure(4)?;
                let on_charger = payload.get_u8() != 0;
                let charging = payload.get_u8() != 0;
                let full_battery = payload.get_u8() != 0;
                Ok(Self::ChargerInfo(BatteryState::from_charger_info(
                    on_charger,
                    charging,
                    full_battery,
                )))
            }
            DELOCALIZED => Ok(Self::Delocalized),
            PONG => Ok(Self::Pong),
            VERSION_RESPONSE => {
                ensure(2)?;
                Ok(Self::VersionResponse(payload.get_u16_le()))
            }
            other => Err(ProtocolError::UnrecognizedMessage(other)),
        }
    }
}
