use serde::{Deserialize, Serialize};

pub const FULL_BATTERY_BIT: u8 = 4;
pub const LOW_BATTERY_BIT: u8 = 5;
pub const ON_CHARGER_BIT: u8 = 6;

/// Battery and charger facts about a vehicle. The advertisement bitmask and
/// the in-session charger info message each report a different subset, so the
/// fields the current source cannot know are `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatteryState {
    pub full_battery: bool,
    pub low_battery: Option<bool>,
    pub on_charger: bool,
    pub charging: Option<bool>,
}

impl BatteryState {
    /// Coarse state from the first byte of the advertised local name.
    pub fn from_advertisement_mask(mask: u8) -> Self {
        Self {
            full_battery: mask & (1 << FULL_BATTERY_BIT) != 0,
            low_battery: Some(mask & (1 << LOW_BATTERY_BIT) != 0),
            on_charger: mask & (1 << ON_CHARGER_BIT) != 0,
            charging: None,
        }
    }

    /// Precise state from a charger info notification.
    pub fn from_charger_info(on_charger: bool, charging: bool, full_battery: bool) -> Self {
        Self {
            full_battery,
            low_battery: None,
            on_charger,
            charging: Some(charging),
        }
    }
}
