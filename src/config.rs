use crate::decode::{FOLLOWER_ABOVE_VOLTS, TEMPERATURE_WARNING_CELSIUS};

pub const DEFAULT_BAUD_RATE: u32 = 1_000_000;

// RAM table
pub const PRESENT_VOLTAGE: u8 = 62;
pub const PRESENT_TEMPERATURE: u8 = 63;

const DEFAULT_ARMS: [(&str, &str); 2] = [("Leader", "/dev/ttyACM0"), ("Follower", "/dev/ttyACM1")];

const DEFAULT_MOTORS: [&str; 6] = [
    "shoulder_pan",
    "shoulder_lift",
    "elbow_flex",
    "wrist_flex",
    "wrist_roll",
    "gripper",
];

/// A serial port with the arm expected behind it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArmPort {
    pub label: String,
    pub path: String,
}

impl ArmPort {
    pub fn new(label: impl Into<String>, path: impl Into<String>) -> ArmPort {
        ArmPort {
            label: label.into(),
            path: path.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Motor {
    pub name: String,
    pub id: u8,
}

impl Motor {
    pub fn new(name: impl Into<String>, id: u8) -> Motor {
        Motor {
            name: name.into(),
            id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registers {
    pub voltage: u8,
    pub temperature: u8,
}

impl Default for Registers {
    fn default() -> Self {
        Registers {
            voltage: PRESENT_VOLTAGE,
            temperature: PRESENT_TEMPERATURE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub follower_above_volts: f32,
    pub warn_at_celsius: u8,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            follower_above_volts: FOLLOWER_ABOVE_VOLTS,
            warn_at_celsius: TEMPERATURE_WARNING_CELSIUS,
        }
    }
}

/// Everything a probe run needs, fixed before the first port is opened.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeConfig {
    pub arms: Vec<ArmPort>,
    pub baud_rate: u32,
    pub registers: Registers,
    pub motors: Vec<Motor>,
    /// Motor whose supply voltage decides the arm role.
    pub role_motor: u8,
    pub thresholds: Thresholds,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        ProbeConfig {
            arms: DEFAULT_ARMS
                .iter()
                .map(|(label, path)| ArmPort::new(*label, *path))
                .collect(),
            baud_rate: DEFAULT_BAUD_RATE,
            registers: Registers::default(),
            motors: DEFAULT_MOTORS
                .iter()
                .zip(1..)
                .map(|(name, id)| Motor::new(*name, id))
                .collect(),
            role_motor: 1,
            thresholds: Thresholds::default(),
        }
    }
}

impl ProbeConfig {
    /// Replaces the arm list with unlabelled ports, in the given order.
    pub fn with_ports<I, S>(mut self, ports: I) -> ProbeConfig
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arms = ports
            .into_iter()
            .enumerate()
            .map(|(index, path)| ArmPort::new(format!("Arm {}", index + 1), path))
            .collect();
        self
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> ProbeConfig {
        self.baud_rate = baud_rate;
        self
    }
}
