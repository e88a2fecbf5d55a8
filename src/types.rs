use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Lowest accepted target temperature, in Celsius.
pub const MIN_TARGET_C: f64 = 18.0;
/// Highest accepted target temperature, in Celsius.
pub const MAX_TARGET_C: f64 = 28.0;

/// Operating mode of the evaporative cooler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Off,
    Cool,
    FanOnly,
    Auto,
}

impl Mode {
    /// Every mode the presentation layer may offer.
    pub const ALL: [Mode; 4] = [Mode::Off, Mode::Cool, Mode::FanOnly, Mode::Auto];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Off => "off",
            Mode::Cool => "cool",
            Mode::FanOnly => "fan_only",
            Mode::Auto => "auto",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "off" => Some(Mode::Off),
            "cool" => Some(Mode::Cool),
            "fan_only" => Some(Mode::FanOnly),
            "auto" => Some(Mode::Auto),
            _ => None,
        }
    }

    pub fn is_on(&self) -> bool {
        !matches!(self, Mode::Off)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fan level 1-16, carried on the wire as a two-digit code ("01".."16").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct FanLevel(u8);

impl FanLevel {
    pub const MIN: FanLevel = FanLevel(1);
    pub const MAX: FanLevel = FanLevel(16);

    pub fn new(level: u8) -> Result<Self> {
        if (Self::MIN.0..=Self::MAX.0).contains(&level) {
            Ok(FanLevel(level))
        } else {
            Err(Error::InvalidFanLevel(level))
        }
    }

    pub fn get(&self) -> u8 {
        self.0
    }

    pub fn wire_code(&self) -> String {
        format!("{:02}", self.0)
    }

    pub fn from_wire_code(code: &str) -> Option<Self> {
        code.trim().parse::<u8>().ok().and_then(|v| Self::new(v).ok())
    }
}

impl TryFrom<u8> for FanLevel {
    type Error = Error;

    fn try_from(level: u8) -> Result<Self> {
        FanLevel::new(level)
    }
}

impl From<FanLevel> for u8 {
    fn from(level: FanLevel) -> u8 {
        level.0
    }
}

impl fmt::Display for FanLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.wire_code())
    }
}

/// Local mirror of the unit's state.
///
/// Mutated only by the reconciliation engine (from observed status frames)
/// and by the sensor bridge (`current_temperature` only). Readers get
/// snapshots, never mutable access.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceState {
    pub mode: Mode,
    pub fan_level: FanLevel,
    /// Target temperature in Celsius, whole-degree steps within
    /// [`MIN_TARGET_C`, `MAX_TARGET_C`].
    pub target_temperature: f64,
    /// Last non-Off mode observed; survives Off transitions.
    pub last_on_mode: Option<Mode>,
    /// Sourced exclusively from the external sensor, never from the unit.
    pub current_temperature: Option<f64>,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            mode: Mode::Off,
            fan_level: FanLevel::MIN,
            target_temperature: MIN_TARGET_C,
            last_on_mode: None,
            current_temperature: None,
        }
    }
}

/// Mode/fan values persisted by the host across restarts, replayed into the
/// mirror at startup via [`crate::TouchClient::restore`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoredState {
    pub mode: Mode,
    pub fan_level: FanLevel,
    #[serde(default)]
    pub last_on_mode: Option<Mode>,
}
