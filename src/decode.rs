//! Interpretation of single byte register payloads.

/// Supply voltage above which an arm is the externally powered follower.
pub const FOLLOWER_ABOVE_VOLTS: f32 = 8.0;
/// Temperature at which a motor is flagged as running hot.
pub const TEMPERATURE_WARNING_CELSIUS: u8 = 55;

/// Present voltage is reported in tenths of a volt.
pub fn decode_voltage(raw: u8) -> f32 {
    raw as f32 / 10.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmRole {
    /// USB powered, around 5V.
    Leader,
    /// External supply, around 12V.
    Follower,
}

impl ArmRole {
    /// Fixed threshold without hysteresis: readings close to it may flip
    /// between roles from one run to the next.
    pub fn classify(volts: f32, follower_above: f32) -> ArmRole {
        if volts > follower_above {
            ArmRole::Follower
        } else {
            ArmRole::Leader
        }
    }
}

impl std::fmt::Display for ArmRole {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ArmRole::Leader => write!(f, "leader (low-voltage/USB supply)"),
            ArmRole::Follower => write!(f, "follower (high-voltage supply)"),
        }
    }
}

/// Present temperature, in whole degrees Celsius.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemperatureReading {
    celsius: u8,
    overheated: bool,
}

impl TemperatureReading {
    pub fn new(raw: u8, warn_at: u8) -> TemperatureReading {
        TemperatureReading {
            celsius: raw,
            overheated: raw >= warn_at,
        }
    }

    pub fn celsius(&self) -> u8 {
        self.celsius
    }

    pub fn overheated(&self) -> bool {
        self.overheated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voltage_is_tenths() {
        for raw in 0..=u8::MAX {
            assert_eq!(decode_voltage(raw), raw as f32 / 10.0);
        }
        assert_eq!(decode_voltage(120), 12.0);
        assert_eq!(decode_voltage(50), 5.0);
    }

    #[test]
    fn follower_only_above_threshold() {
        for raw in 0..=u8::MAX {
            let role = ArmRole::classify(decode_voltage(raw), FOLLOWER_ABOVE_VOLTS);
            let expected = if raw > 80 {
                ArmRole::Follower
            } else {
                ArmRole::Leader
            };
            assert_eq!(role, expected, "raw voltage {}", raw);
        }
    }

    #[test]
    fn threshold_boundary() {
        assert_eq!(ArmRole::classify(decode_voltage(80), FOLLOWER_ABOVE_VOLTS), ArmRole::Leader);
        assert_eq!(ArmRole::classify(decode_voltage(81), FOLLOWER_ABOVE_VOLTS), ArmRole::Follower);
    }

    #[test]
    fn temperature_warning() {
        for raw in 0..=u8::MAX {
            let reading = TemperatureReading::new(raw, TEMPERATURE_WARNING_CELSIUS);
            assert_eq!(reading.celsius(), raw);
            assert_eq!(reading.overheated(), raw >= 55);
        }
        assert!(!TemperatureReading::new(54, TEMPERATURE_WARNING_CELSIUS).overheated());
        assert!(TemperatureReading::new(55, TEMPERATURE_WARNING_CELSIUS).overheated());
    }

    #[test]
    fn role_names() {
        assert_eq!(ArmRole::Follower.to_string(), "follower (high-voltage supply)");
        assert_eq!(ArmRole::Leader.to_string(), "leader (low-voltage/USB supply)");
    }
}
