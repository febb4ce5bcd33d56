//! Reads voltage and temperature registers from serial bus servos to tell a
//! USB powered leader arm from an externally powered follower, and to spot
//! motors running hot.

mod channel;
mod config;
mod decode;
mod instructions;
#[cfg(test)]
mod mock;
mod probe;
mod reader;
mod serial_driver;

pub use channel::{BusChannel, ChannelError, PortOpener, SerialOpener};
pub use config::{
    ArmPort, Motor, ProbeConfig, Registers, Thresholds, DEFAULT_BAUD_RATE, PRESENT_TEMPERATURE,
    PRESENT_VOLTAGE,
};
pub use decode::{
    decode_voltage, ArmRole, TemperatureReading, FOLLOWER_ABOVE_VOLTS,
    TEMPERATURE_WARNING_CELSIUS,
};
pub use instructions::{DeviceError, ReadInstruction, BROADCAST_ID, MAX_DEVICE_ID, MIN_DEVICE_ID};
pub use probe::{Finding, Prober};
pub use reader::{read_register, FailureCode, Payload, ReadRequest, ReadResult, MAX_READ_LENGTH};
pub use serial_driver::{FramedDriver, FramedSerialDriver, Status, TransportError, TIMEOUT};
