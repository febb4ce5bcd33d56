use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::channel::{ChannelError, PortOpener};
use crate::instructions::ReadInstruction;
use crate::serial_driver::{FramedDriver, Status, TransportError};

/// How the mock bus answers a read of one (device, register) pair.
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Data(Vec<u8>),
    DeviceError(u8),
    FromDevice(u8, Vec<u8>),
    Corrupt,
}

#[derive(Default)]
struct BusState {
    registers: HashMap<(u8, u8), Reply>,
    written: Vec<Vec<u8>>,
    stale: VecDeque<Status>,
    live_handles: usize,
    failing_writes: bool,
}

/// In-memory servo bus. Clones share state, so a test can keep one clone to
/// inspect what the code under test wrote through another.
#[derive(Clone, Default)]
pub(crate) struct MockBus {
    state: Arc<Mutex<BusState>>,
}

impl MockBus {
    pub(crate) fn new() -> MockBus {
        MockBus::default()
    }

    pub(crate) fn with_register(self, device: u8, register: u8, reply: Reply) -> MockBus {
        self.state
            .lock()
            .unwrap()
            .registers
            .insert((device, register), reply);
        self
    }

    /// Queues a packet that arrives ahead of any answer, like a late reply
    /// to an earlier read.
    pub(crate) fn with_stale(self, status: Status) -> MockBus {
        self.state.lock().unwrap().stale.push_back(status);
        self
    }

    pub(crate) fn failing_writes(self) -> MockBus {
        self.state.lock().unwrap().failing_writes = true;
        self
    }

    pub(crate) fn written(&self) -> Vec<Vec<u8>> {
        self.state.lock().unwrap().written.clone()
    }

    pub(crate) fn live_handles(&self) -> usize {
        self.state.lock().unwrap().live_handles
    }

    fn handle(&self) -> MockSerialPort {
        self.state.lock().unwrap().live_handles += 1;
        MockSerialPort {
            state: self.state.clone(),
            pending: None,
        }
    }
}

struct MockSerialPort {
    state: Arc<Mutex<BusState>>,
    pending: Option<ReadInstruction>,
}

impl Drop for MockSerialPort {
    fn drop(&mut self) {
        self.state.lock().unwrap().live_handles -= 1;
    }
}

#[async_trait]
impl FramedDriver for MockSerialPort {
    async fn send(&mut self, instruction: ReadInstruction) -> Result<(), TransportError> {
        let mut state = self.state.lock().unwrap();
        if state.failing_writes {
            return Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "unplugged").into());
        }
        state.written.push(instruction.serialize());
        self.pending = Some(instruction);
        Ok(())
    }

    async fn receive(&mut self) -> Result<Status, TransportError> {
        let mut state = self.state.lock().unwrap();
        if let Some(status) = state.stale.pop_front() {
            return Ok(status);
        }
        let instruction = self.pending.take().ok_or(TransportError::Timeout)?;
        let reply = state
            .registers
            .get(&(instruction.id(), instruction.addr()))
            .cloned()
            .ok_or(TransportError::Timeout)?;
        match reply {
            Reply::Data(params) => Ok(Status::new(instruction.id(), 0, params)),
            Reply::DeviceError(flags) => Ok(Status::new(instruction.id(), flags, vec![0])),
            Reply::FromDevice(id, params) => Ok(Status::new(id, 0, params)),
            Reply::Corrupt => Err(TransportError::ChecksumError),
        }
    }
}

/// Opens mock buses by port path; any other path fails like a missing device.
#[derive(Default)]
pub(crate) struct MockOpener {
    ports: HashMap<String, MockBus>,
    attempts: Mutex<Vec<(String, u32)>>,
}

impl MockOpener {
    pub(crate) fn new() -> MockOpener {
        MockOpener::default()
    }

    pub(crate) fn with_port(mut self, port: &str, bus: MockBus) -> MockOpener {
        self.ports.insert(port.to_owned(), bus);
        self
    }

    pub(crate) fn open_attempts(&self) -> Vec<(String, u32)> {
        self.attempts.lock().unwrap().clone()
    }
}

impl PortOpener for MockOpener {
    fn open(&self, port: &str, baud_rate: u32) -> Result<Box<dyn FramedDriver>, ChannelError> {
        self.attempts
            .lock()
            .unwrap()
            .push((port.to_owned(), baud_rate));
        match self.ports.get(port) {
            Some(bus) => Ok(Box::new(bus.handle())),
            None => Err(ChannelError::Open {
                port: port.to_owned(),
                baud_rate,
                source: tokio_serial::Error::new(
                    tokio_serial::ErrorKind::NoDevice,
                    "No such file or directory",
                ),
            }),
        }
    }
}
