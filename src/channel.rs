use thiserror::Error;
use tracing::{info, warn};

use crate::serial_driver::{FramedDriver, FramedSerialDriver};

#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("cannot open {port} at {baud_rate} baud: {source}")]
    Open {
        port: String,
        baud_rate: u32,
        #[source]
        source: tokio_serial::Error,
    },
}

/// Acquires the transport behind a port path.
pub trait PortOpener {
    fn open(&self, port: &str, baud_rate: u32) -> Result<Box<dyn FramedDriver>, ChannelError>;
}

/// Opens real serial ports.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialOpener;

impl PortOpener for SerialOpener {
    fn open(&self, port: &str, baud_rate: u32) -> Result<Box<dyn FramedDriver>, ChannelError> {
        let driver = FramedSerialDriver::with_baud_rate(port, baud_rate).map_err(|source| {
            ChannelError::Open {
                port: port.to_owned(),
                baud_rate,
                source,
            }
        })?;
        Ok(Box::new(driver))
    }
}

/// One serial port with a fixed baud rate, either closed or open.
///
/// The underlying handle is released by [`BusChannel::close`] or, failing
/// that, when the channel is dropped.
pub struct BusChannel {
    port: String,
    baud_rate: u32,
    transport: Option<Box<dyn FramedDriver>>,
}

impl BusChannel {
    /// Creates a closed channel.
    pub fn new(port: impl Into<String>, baud_rate: u32) -> BusChannel {
        BusChannel {
            port: port.into(),
            baud_rate,
            transport: None,
        }
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    pub fn is_open(&self) -> bool {
        self.transport.is_some()
    }

    /// Opens the serial port. Must be called from within a tokio runtime.
    pub fn open(&mut self) -> bool {
        self.open_with(&SerialOpener)
    }

    /// Opens the channel through `opener`. Failure is logged and reported as
    /// `false`; an already open channel stays as it is.
    pub fn open_with(&mut self, opener: &dyn PortOpener) -> bool {
        if self.is_open() {
            return true;
        }
        match opener.open(&self.port, self.baud_rate) {
            Ok(transport) => {
                info!(port = %self.port, baud_rate = self.baud_rate, "channel open");
                self.transport = Some(transport);
                true
            }
            Err(err) => {
                warn!(port = %self.port, "{}", err);
                false
            }
        }
    }

    pub fn close(&mut self) {
        if self.transport.take().is_some() {
            info!(port = %self.port, "channel closed");
        }
    }

    pub(crate) fn transport_mut(&mut self) -> Option<&mut (dyn FramedDriver + 'static)> {
        self.transport.as_deref_mut()
    }
}

impl Drop for BusChannel {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for BusChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("BusChannel")
            .field("port", &self.port)
            .field("baud_rate", &self.baud_rate)
            .field("open", &self.is_open())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockBus, MockOpener};

    #[test]
    fn new_channel_is_closed() {
        let channel = BusChannel::new("/dev/ttyACM0", 1_000_000);
        assert!(!channel.is_open());
        assert_eq!(channel.port(), "/dev/ttyACM0");
        assert_eq!(channel.baud_rate(), 1_000_000);
    }

    #[test]
    fn open_known_port() {
        let opener = MockOpener::new().with_port("/dev/ttyACM0", MockBus::new());
        let mut channel = BusChannel::new("/dev/ttyACM0", 1_000_000);
        assert!(channel.open_with(&opener));
        assert!(channel.is_open());
        assert_eq!(opener.open_attempts(), vec![("/dev/ttyACM0".to_owned(), 1_000_000)]);
    }

    #[test]
    fn open_missing_port_returns_false() {
        let opener = MockOpener::new();
        let mut channel = BusChannel::new("/dev/ttyACM1", 1_000_000);
        assert!(!channel.open_with(&opener));
        assert!(!channel.is_open());
    }

    #[test]
    fn open_twice_keeps_transport() {
        let opener = MockOpener::new().with_port("/dev/ttyACM0", MockBus::new());
        let mut channel = BusChannel::new("/dev/ttyACM0", 1_000_000);
        assert!(channel.open_with(&opener));
        assert!(channel.open_with(&opener));
        assert_eq!(opener.open_attempts().len(), 1);
    }

    #[test]
    fn close_is_idempotent() {
        let opener = MockOpener::new().with_port("/dev/ttyACM0", MockBus::new());
        let mut channel = BusChannel::new("/dev/ttyACM0", 1_000_000);
        channel.close();
        assert!(channel.open_with(&opener));
        channel.close();
        channel.close();
        assert!(!channel.is_open());
    }

    #[test]
    fn drop_releases_transport() {
        let bus = MockBus::new();
        let opener = MockOpener::new().with_port("/dev/ttyACM0", bus.clone());
        {
            let mut channel = BusChannel::new("/dev/ttyACM0", 1_000_000);
            assert!(channel.open_with(&opener));
            assert_eq!(bus.live_handles(), 1);
        }
        assert_eq!(bus.live_handles(), 0);
    }
}
