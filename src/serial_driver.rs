use async_trait::async_trait;
use bytes::{Buf, BufMut, BytesMut};
use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::time::{timeout, Duration};
use tokio_serial::{ClearBuffer, SerialPort, SerialPortBuilderExt, SerialStream};
use tokio_util::codec::{Decoder, Encoder, Framed};
use tracing::trace;

use crate::instructions::{calc_checksum, ReadInstruction, HEADER};

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TransportError {
    #[error("connection timeout")]
    Timeout,
    #[error("checksum error on arriving packet")]
    ChecksumError,
    #[error("invalid header")]
    HeaderError,
    #[error("reading error")]
    ReadingError,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Status packet returned by a servo. The error byte is kept as received.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Status {
    id: u8,
    error: u8,
    params: Vec<u8>,
}

impl Status {
    pub fn new(id: u8, error: u8, params: Vec<u8>) -> Status {
        Status { id, error, params }
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn error(&self) -> u8 {
        self.error
    }

    pub fn params(&self) -> &[u8] {
        &self.params
    }

    pub(crate) fn into_params(self) -> Vec<u8> {
        self.params
    }
}

/// Codec for protocol 1 servo packets.
///
/// A corrupt frame is yielded as an `Err` item rather than a decoder error so
/// the framed stream stays usable for the next exchange on the same port.
pub(crate) struct ServoProtocol;

impl Decoder for ServoProtocol {
    type Item = Result<Status, TransportError>;
    type Error = TransportError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, TransportError> {
        loop {
            let start = src
                .windows(2)
                .position(|pair| pair[0] == HEADER && pair[1] == HEADER);
            let start = match start {
                Some(start) => start,
                None => {
                    // a trailing 0xFF may be the first half of the next header
                    let keep = usize::from(src.last() == Some(&HEADER));
                    let skipped = src.len() - keep;
                    if skipped > 0 {
                        trace!(skipped, "dropping bytes without header");
                        src.advance(skipped);
                    }
                    return Ok(None);
                }
            };
            if start > 0 {
                trace!(skipped = start, "dropping bytes before header");
                src.advance(start);
            }
            if src.len() < 3 {
                return Ok(None);
            }
            // 0xFF is never an ID, so the header starts one byte later
            if src[2] == HEADER {
                src.advance(1);
                continue;
            }
            break;
        }
        if src.len() < 4 {
            return Ok(None);
        }
        let id = src[2];
        let len = src[3] as usize;
        if len < 2 {
            src.advance(4);
            return Ok(Some(Err(TransportError::HeaderError)));
        }
        if src.len() < 4 + len {
            return Ok(None);
        }
        let message = src.split_to(4 + len);
        trace!(frame = ?&message[..], "received frame");

        let end = message.len() - 1;
        let checksum = calc_checksum(&message[2..end]);
        if checksum != message[end] {
            return Ok(Some(Err(TransportError::ChecksumError)));
        }
        let params = message[5..end].to_vec();
        Ok(Some(Ok(Status::new(id, message[4], params))))
    }
}

impl Encoder<ReadInstruction> for ServoProtocol {
    type Error = TransportError;

    fn encode(&mut self, data: ReadInstruction, buf: &mut BytesMut) -> Result<(), TransportError> {
        let msg = data.serialize();
        trace!(frame = ?msg, "sending frame");
        buf.reserve(msg.len());
        buf.put_slice(&msg);
        Ok(())
    }
}

/// Packet level access to one serial bus.
#[async_trait]
pub trait FramedDriver: Send {
    async fn send(&mut self, instruction: ReadInstruction) -> Result<(), TransportError>;
    async fn receive(&mut self) -> Result<Status, TransportError>;
}

/// Response timeout in milliseconds.
pub const TIMEOUT: u64 = 100;

pub struct FramedSerialDriver {
    framed_port: Framed<SerialStream, ServoProtocol>,
}

impl FramedSerialDriver {
    pub fn with_baud_rate(port: &str, baud_rate: u32) -> Result<FramedSerialDriver, tokio_serial::Error> {
        let serial_port = tokio_serial::new(port, baud_rate).open_native_async()?;
        Ok(FramedSerialDriver {
            framed_port: Framed::new(serial_port, ServoProtocol),
        })
    }
}

#[async_trait]
impl FramedDriver for FramedSerialDriver {
    async fn send(&mut self, instruction: ReadInstruction) -> Result<(), TransportError> {
        // leftovers from an earlier timed out exchange must not answer this one
        self.framed_port.read_buffer_mut().clear();
        SerialPort::clear(self.framed_port.get_mut(), ClearBuffer::Input)
            .map_err(std::io::Error::from)?;
        self.framed_port.send(instruction).await?;
        Ok(())
    }

    async fn receive(&mut self) -> Result<Status, TransportError> {
        let frame = timeout(Duration::from_millis(TIMEOUT), self.framed_port.next())
            .await
            .map_err(|_| TransportError::Timeout)?
            .ok_or(TransportError::ReadingError)??;
        frame
    }
}
