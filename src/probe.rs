use tracing::info;

use crate::channel::{BusChannel, PortOpener, SerialOpener};
use crate::config::{ArmPort, ProbeConfig};
use crate::decode::{decode_voltage, ArmRole, TemperatureReading};
use crate::reader::{read_register, FailureCode};

/// One line of probe output.
#[derive(Debug, Clone, PartialEq)]
pub enum Finding {
    PortUnavailable {
        port: String,
    },
    RoleDetected {
        port: String,
        voltage: f32,
        role: ArmRole,
    },
    RoleReadFailed {
        port: String,
        code: FailureCode,
    },
    ArmHeader {
        label: String,
        port: String,
    },
    MotorTemperature {
        motor: String,
        reading: TemperatureReading,
    },
    MotorReadFailed {
        motor: String,
        code: FailureCode,
    },
}

impl std::fmt::Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Finding::PortUnavailable { port } => write!(f, "{}: cannot open", port),
            Finding::RoleDetected {
                port,
                voltage,
                role,
            } => write!(f, "{}: {:.1}V, {}", port, voltage, role),
            Finding::RoleReadFailed { port, code } => {
                write!(f, "{}: read error, code {}", port, code)
            }
            Finding::ArmHeader { label, port } => write!(f, "{} ({}):", label, port),
            Finding::MotorTemperature { motor, reading } => {
                write!(f, "  {:15} {}°C", motor, reading.celsius())?;
                if reading.overheated() {
                    write!(f, "  overheat warning")?;
                }
                Ok(())
            }
            Finding::MotorReadFailed { motor, code } => {
                write!(f, "  {:15} read error, code {}", motor, code)
            }
        }
    }
}

/// Walks the configured ports one at a time and reports what it reads.
///
/// Each port gets its own channel, which is closed before the next port is
/// opened. Findings are handed to the sink as soon as they are known.
pub struct Prober<O = SerialOpener> {
    config: ProbeConfig,
    opener: O,
}

impl Prober<SerialOpener> {
    pub fn new(config: ProbeConfig) -> Prober<SerialOpener> {
        Prober::with_opener(config, SerialOpener)
    }
}

impl<O: PortOpener> Prober<O> {
    pub fn with_opener(config: ProbeConfig, opener: O) -> Prober<O> {
        Prober { config, opener }
    }

    fn open(&self, arm: &ArmPort) -> Option<BusChannel> {
        let mut channel = BusChannel::new(arm.path.clone(), self.config.baud_rate);
        if channel.open_with(&self.opener) {
            Some(channel)
        } else {
            None
        }
    }

    /// Reads the supply voltage of the role motor on every port and
    /// classifies the arm behind it.
    pub async fn check_roles(&self, sink: &mut impl FnMut(Finding)) {
        for arm in &self.config.arms {
            let mut channel = match self.open(arm) {
                Some(channel) => channel,
                None => {
                    sink(Finding::PortUnavailable {
                        port: arm.path.clone(),
                    });
                    continue;
                }
            };
            let result = read_register(
                &mut channel,
                self.config.role_motor,
                self.config.registers.voltage,
                1,
            )
            .await;
            channel.close();

            let finding = match result {
                Ok(payload) => {
                    let voltage = decode_voltage(payload[0]);
                    let role = ArmRole::classify(voltage, self.config.thresholds.follower_above_volts);
                    info!(port = %arm.path, voltage, ?role, "arm classified");
                    Finding::RoleDetected {
                        port: arm.path.clone(),
                        voltage,
                        role,
                    }
                }
                Err(code) => Finding::RoleReadFailed {
                    port: arm.path.clone(),
                    code,
                },
            };
            sink(finding);
        }
    }

    /// Reads the temperature of every configured motor on every port.
    pub async fn check_temperatures(&self, sink: &mut impl FnMut(Finding)) {
        for arm in &self.config.arms {
            sink(Finding::ArmHeader {
                label: arm.label.clone(),
                port: arm.path.clone(),
            });
            let mut channel = match self.open(arm) {
                Some(channel) => channel,
                None => {
                    sink(Finding::PortUnavailable {
                        port: arm.path.clone(),
                    });
                    continue;
                }
            };
            for motor in &self.config.motors {
                let finding = match read_register(
                    &mut channel,
                    motor.id,
                    self.config.registers.temperature,
                    1,
                )
                .await
                {
                    Ok(payload) => Finding::MotorTemperature {
                        motor: motor.name.clone(),
                        reading: TemperatureReading::new(
                            payload[0],
                            self.config.thresholds.warn_at_celsius,
                        ),
                    },
                    Err(code) => Finding::MotorReadFailed {
                        motor: motor.name.clone(),
                        code,
                    },
                };
                sink(finding);
            }
            channel.close();
        }
    }
}
