//! Messages sent from the controller to a vehicle.

use crate::packet::Packet;
use bytes::{BufMut, Bytes, BytesMut};

pub mod encoder;

pub const DISCONNECT: u8 = 0x0d;
pub const PING: u8 = 0x16;
pub const VERSION_REQUEST: u8 = 0x18;
pub const SET_LIGHTS: u8 = 0x1d;
pub const SET_SPEED: u8 = 0x24;
pub const CHANGE_LANE: u8 = 0x25;
pub const CANCEL_LANE_CHANGE: u8 = 0x26;
pub const TURN: u8 = 0x32;
pub const LIGHT_PATTERN: u8 = 0x33;
pub const SET_SDK_MODE: u8 = 0x90;

pub fn is_message_type(msg_type: u8) -> bool {
    matches!(
        msg_type,
        DISCONNECT
            | PING
            | VERSION_REQUEST
            | SET_LIGHTS
            | SET_SPEED
            | CHANGE_LANE
            | CANCEL_LANE_CHANGE
            | TURN
            | LIGHT_PATTERN
            | SET_SDK_MODE
    )
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetSpeed {
        speed: i16,
        acceleration: i16,
    },
    ChangeLane {
        horizontal_speed: u16,
        horizontal_acceleration: u16,
        road_center_offset: f32,
        hop_intent: u8,
        tag: u8,
    },
    CancelLaneChange,
    Turn {
        turn_type: u8,
        trigger: u8,
    },
    SetSdkMode {
        enabled: bool,
        flags: u8,
    },
    SetLights(u8),
    LightPattern {
        red: u8,
        green: u8,
        blue: u8,
    },
    Ping,
    VersionRequest,
    Disconnect,
}

impl Command {
    pub fn msg_type(&self) -> u8 {
        match self {
            Self::SetSpeed { .. } => SET_SPEED,
            Self::ChangeLane { .. } => CHANGE_LANE,
            Self::CancelLaneChange => CANCEL_LANE_CHANGE,
            Self::Turn { .. } => TURN,
            Self::SetSdkMode { .. } => SET_SDK_MODE,
            Self::SetLights(_) => SET_LIGHTS,
            Self::LightPattern { .. } => LIGHT_PATTERN,
            Self::Ping => PING,
            Self::VersionRequest => VERSION_REQUEST,
            Self::Disconnect => DISCONNECT,
        }
    }

    pub fn payload(&self) -> Bytes {
        let mut payload = BytesMut::new();
        match *self {
            Self::SetSpeed {
                speed,
                acceleration,
            } => {
                payload.put_i16_le(speed);
                payload.put_i16_le(acceleration);
            }
            Self::ChangeLane {
                horizontal_speed,
                horizontal_acceleration,
                road_center_offset,
                hop_intent,
                tag,
            } => {
                payload.put_u16_le(horizontal_speed);
                payload.put_u16_le(horizontal_acceleration);
                payload.put_f32_le(road_center_offset);
                payload.put_u8(hop_intent);
                payload.put_u8(tag);
            }
            Self::Turn { turn_type, trigger } => {
                payload.put_u8(turn_type);
                payload.put_u8(trigger);
            }
            Self::SetSdkMode { enabled, flags } => {
                payload.put_u8(if enabled { 0xff } else { 0x00 });
                payload.put_u8(flags);
            }
            Self::SetLights(mask) => payload.put_u8(mask),
            Self::LightPattern { red, green, blue } => {
                payload.put_slice(&[
                    3, 0, 0, red, red, 0, 3, 0, green, green, 0, 2, 0, blue, blue, 0,
                ]);
            }
            Self::CancelLaneChange | Self::Ping | Self::VersionRequest | Self::Disconnect => {}
        }
        payload.freeze()
    }

    pub fn to_packet(&self) -> Packet {
        Packet {
            msg_type: self.msg_type(),
            payload: self.payload(),
        }
    }

    /// Full wire frame, ready for one characteristic write.
    pub fn to_frame(&self) -> Bytes {
        self.to_packet().to_frame()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn set_speed_layout() {
        let frame = Command::SetSpeed {
            speed: 300,
            acceleration: 500,
        }
        .to_frame();
        assert_eq!(&frame[..], &[0x05, 0x24, 0x2c, 0x01, 0xf4, 0x01]);
    }

    #[test]
    fn sdk_mode_layout() {
        let frame = Command::SetSdkMode {
            enabled: true,
            flags: 0x01,
        }
        .to_frame();
        assert_eq!(&frame[..], &[0x03, 0x90, 0xff, 0x01]);
    }

    #[test]
    fn change_lane_layout() {
        let frame = Command::ChangeLane {
            horizontal_speed: 300,
            horizontal_acceleration: 300,
            road_center_offset: -60.0,
            hop_intent: 0,
            tag: 0,
        }
        .to_frame();
        assert_eq!(
            &frame[..],
            &[0x0b, 0x25, 0x2c, 0x01, 0x2c, 0x01, 0x00, 0x00, 0x70, 0xc2, 0x00, 0x00]
        );
    }

    #[test]
    fn every_payload_fits_a_packet() {
        let commands = [
            Command::SetSpeed {
                speed: -100,
                acceleration: 1000,
            },
            Command::ChangeLane {
                horizontal_speed: 300,
                horizontal_acceleration: 300,
                road_center_offset: 23.5,
                hop_intent: 0,
                tag: 0,
            },
            Command::CancelLaneChange,
            Command::Turn {
                turn_type: 3,
                trigger: 0,
            },
            Command::SetSdkMode {
                enabled: false,
                flags: 0,
            },
            Command::SetLights(0x02),
            Command::LightPattern {
                red: 255,
                green: 0,
                blue: 127,
            },
            Command::Ping,
            Command::VersionRequest,
            Command::Disconnect,
        ];
        for command in commands {
            assert!(command.payload().len() <= crate::MAX_PAYLOAD);
            assert!(is_message_type(command.msg_type()));
        }
    }
}
