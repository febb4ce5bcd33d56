/// Broadcast ID. Every servo on the bus listens to it, so it is never a valid
/// target for a read.
pub const BROADCAST_ID: u8 = 0xFE;
pub const MIN_DEVICE_ID: u8 = 1;
pub const MAX_DEVICE_ID: u8 = 253;

pub(crate) const HEADER: u8 = 0xFF;
const READ: u8 = 0x02;

/// Flags carried in the error byte of a status packet.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub struct DeviceError {
    instruction_error: bool,
    overload_error: bool,
    checksum_error: bool,
    range_error: bool,
    overheating_error: bool,
    angle_limit_error: bool,
    input_voltage_error: bool,
}

impl DeviceError {
    /// Returns `None` when the servo reported no error.
    pub fn from_flags(flag: u8) -> Option<DeviceError> {
        if flag == 0 {
            return None;
        }
        Some(DeviceError {
            input_voltage_error: flag & (1 << 0) != 0,
            angle_limit_error: flag & (1 << 1) != 0,
            overheating_error: flag & (1 << 2) != 0,
            range_error: flag & (1 << 3) != 0,
            checksum_error: flag & (1 << 4) != 0,
            overload_error: flag & (1 << 5) != 0,
            instruction_error: flag & (1 << 6) != 0,
        })
    }
}

impl std::fmt::Display for DeviceError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let flags = [
            (self.input_voltage_error, "input_voltage_error"),
            (self.angle_limit_error, "angle_limit_error"),
            (self.overheating_error, "overheating_error"),
            (self.range_error, "range_error"),
            (self.checksum_error, "checksum_error"),
            (self.overload_error, "overload_error"),
            (self.instruction_error, "instruction_error"),
        ];
        let names: Vec<&str> = flags
            .iter()
            .filter(|(set, _)| *set)
            .map(|(_, name)| *name)
            .collect();
        if names.is_empty() {
            // only bit 7 set, which has no documented meaning
            return write!(f, "unknown_error");
        }
        write!(f, "{}", names.join(", "))
    }
}

pub(crate) fn calc_checksum(payload: &[u8]) -> u8 {
    let mut sum: u8 = 0;
    for b in payload {
        sum = sum.wrapping_add(*b);
    }
    !sum
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct ReadInstruction {
    id: u8,
    addr: u8,
    length: u8,
}

impl ReadInstruction {
    pub(crate) fn new(id: u8, addr: u8, length: u8) -> ReadInstruction {
        ReadInstruction { id, addr, length }
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn addr(&self) -> u8 {
        self.addr
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut data = vec![
            HEADER, // header
            HEADER,
            self.id, // ID
            0x04,    // Len
            READ,    // Instruction
            self.addr,
            self.length,
        ];
        let checksum = calc_checksum(&data[2..]);
        data.push(checksum);
        data
    }
}
