use tokio::time::{timeout_at, Duration, Instant};
use tracing::{debug, warn};

use crate::channel::BusChannel;
use crate::instructions::{DeviceError, ReadInstruction, MAX_DEVICE_ID, MIN_DEVICE_ID};
use crate::serial_driver::{FramedDriver, Status, TransportError, TIMEOUT};

/// Largest payload a single status packet can carry.
pub const MAX_READ_LENGTH: u8 = 253;

pub type Payload = Vec<u8>;

/// Outcome of one register read: the payload or the code of the failure.
pub type ReadResult = Result<Payload, FailureCode>;

/// Nonzero status of a failed read.
///
/// Negative codes follow the servo SDK's communication results. Positive
/// codes are the error byte the servo itself reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FailureCode(i32);

impl FailureCode {
    pub const TX_FAIL: FailureCode = FailureCode(-2);
    pub const RX_FAIL: FailureCode = FailureCode(-3);
    pub const RX_TIMEOUT: FailureCode = FailureCode(-6);
    pub const RX_CORRUPT: FailureCode = FailureCode(-7);
    pub const NOT_AVAILABLE: FailureCode = FailureCode(-9);

    /// Wraps a raw status. Zero is success and has no failure code.
    pub fn new(code: i32) -> Option<FailureCode> {
        if code == 0 {
            None
        } else {
            Some(FailureCode(code))
        }
    }

    pub fn code(self) -> i32 {
        self.0
    }

    /// Flags the servo reported, for codes that came from a status packet.
    pub fn device_error(self) -> Option<DeviceError> {
        u8::try_from(self.0).ok().and_then(DeviceError::from_flags)
    }

    fn description(self) -> Option<&'static str> {
        match self {
            FailureCode::TX_FAIL => Some("failed to transmit request"),
            FailureCode::RX_FAIL => Some("failed to receive response"),
            FailureCode::RX_TIMEOUT => Some("no response"),
            FailureCode::RX_CORRUPT => Some("corrupt response"),
            FailureCode::NOT_AVAILABLE => Some("channel not available"),
            _ => None,
        }
    }
}

impl From<TransportError> for FailureCode {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout => FailureCode::RX_TIMEOUT,
            TransportError::ChecksumError | TransportError::HeaderError => FailureCode::RX_CORRUPT,
            _ => FailureCode::RX_FAIL,
        }
    }
}

impl std::fmt::Display for FailureCode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)?;
        if let Some(description) = self.description() {
            write!(f, " ({})", description)
        } else if let Some(device_error) = self.device_error() {
            write!(f, " (device error: {})", device_error)
        } else {
            Ok(())
        }
    }
}

impl std::error::Error for FailureCode {}

/// A validated read of `length` bytes starting at `register` on `device`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadRequest {
    device: u8,
    register: u8,
    length: u8,
}

impl ReadRequest {
    pub fn new(device: u8, register: u8, length: u8) -> Result<ReadRequest, FailureCode> {
        if !(MIN_DEVICE_ID..=MAX_DEVICE_ID).contains(&device) {
            warn!(device, "device address out of range");
            return Err(FailureCode::NOT_AVAILABLE);
        }
        if length == 0 || length > MAX_READ_LENGTH {
            warn!(length, "invalid read length");
            return Err(FailureCode::NOT_AVAILABLE);
        }
        Ok(ReadRequest {
            device,
            register,
            length,
        })
    }

    fn instruction(&self) -> ReadInstruction {
        ReadInstruction::new(self.device, self.register, self.length)
    }

    fn accept(&self, status: Status) -> ReadResult {
        if let Some(code) = FailureCode::new(status.error() as i32) {
            return Err(code);
        }
        if status.params().len() != self.length as usize {
            warn!(
                expected = self.length,
                got = status.params().len(),
                "response has wrong payload length"
            );
            return Err(FailureCode::RX_CORRUPT);
        }
        Ok(status.into_params())
    }
}

/// Waits for the status packet of the addressed device. Packets from other
/// devices, such as late answers to an earlier timed out read, are dropped
/// until the deadline passes.
async fn receive_answer(
    transport: &mut dyn FramedDriver,
    request: &ReadRequest,
) -> Result<Status, TransportError> {
    let deadline = Instant::now() + Duration::from_millis(TIMEOUT);
    loop {
        let status = timeout_at(deadline, transport.receive())
            .await
            .map_err(|_| TransportError::Timeout)??;
        if status.id() == request.device {
            return Ok(status);
        }
        debug!(expected = request.device, got = status.id(), "dropping packet from other device");
    }
}

/// Reads `length` bytes from `register` of `device` with exactly one
/// request/response exchange. Nothing is sent when the channel is closed or
/// the request is invalid.
pub async fn read_register(
    channel: &mut BusChannel,
    device: u8,
    register: u8,
    length: u8,
) -> ReadResult {
    let request = ReadRequest::new(device, register, length)?;
    let port = channel.port().to_owned();
    let transport = match channel.transport_mut() {
        Some(transport) => transport,
        None => {
            warn!(%port, device, register, "read on closed channel");
            return Err(FailureCode::NOT_AVAILABLE);
        }
    };
    debug!(%port, device, register, length, "reading register");

    let result = match transport.send(request.instruction()).await {
        Ok(()) => match receive_answer(transport, &request).await {
            Ok(status) => request.accept(status),
            Err(err) => {
                debug!(%port, device, "receive failed: {}", err);
                Err(err.into())
            }
        },
        Err(err) => {
            debug!(%port, device, "send failed: {}", err);
            Err(FailureCode::TX_FAIL)
        }
    };
    if let Err(code) = result {
        warn!(%port, device, register, "read failed with code {}", code);
    }
    result
}
