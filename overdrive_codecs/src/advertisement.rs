use crate::battery::BatteryState;
use crate::error::ProtocolError;
use crate::FirmwareVersion;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Facts a vehicle packs into its advertised local name: byte 0 is the
/// battery bitmask, bytes 1..3 the firmware version, bytes 8.. the device
/// name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advertisement {
    pub battery: BatteryState,
    pub firmware_version: FirmwareVersion,
    pub name: String,
}

impl Advertisement {
    pub fn parse(local_name: &str) -> Result<Self, ProtocolError> {
        let bytes = local_name.as_bytes();
        if bytes.is_empty() {
            return Err(ProtocolError::InvalidAdvertisement("local name is empty"));
        }
        if bytes.len() < 3 {
            return Err(ProtocolError::InvalidAdvertisement(
                "local name too short for battery state and version",
            ));
        }
        let battery = BatteryState::from_advertisement_mask(bytes[0]);
        let firmware_version = u16::from_le_bytes([bytes[1], bytes[2]]);
        let name = match bytes.get(8..) {
            Some(name) => std::str::from_utf8(name)
                .map_err(|_| ProtocolError::InvalidAdvertisement("device name is not valid UTF-8"))?
                .to_string(),
            None => String::new(),
        };
        Ok(Self {
            battery,
            firmware_version,
            name,
        })
    }
}

impl FromStr for Advertisement {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
