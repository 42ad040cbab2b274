use crate::error::MiniTelError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

pub const COMMAND_SIZE: usize = 1;
pub const NONCE_SIZE: usize = 4;
pub const HASH_SIZE: usize = 32;
pub const MAX_PAYLOAD_SIZE: usize = u16::MAX as usize;

/// Smallest binary frame: command, nonce and hash with an empty payload.
pub const MIN_FRAME_SIZE: usize = COMMAND_SIZE + NONCE_SIZE + HASH_SIZE;

/// Protocol command identifiers.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    Hello = 0x01,
    Dump = 0x02,
    StopCmd = 0x04,
    HelloAck = 0x81,
    DumpFailed = 0x82,
    DumpOk = 0x83,
    StopOk = 0x84,
}

impl Command {
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Whether the client is the sender of this command.
    pub fn is_client_command(self) -> bool {
        matches!(self, Command::Hello | Command::Dump | Command::StopCmd)
    }

    pub fn name(self) -> &'static str {
        match self {
            Command::Hello => "HELLO",
            Command::Dump => "DUMP",
            Command::StopCmd => "STOP_CMD",
            Command::HelloAck => "HELLO_ACK",
            Command::DumpFailed => "DUMP_FAILED",
            Command::DumpOk => "DUMP_OK",
            Command::StopOk => "STOP_OK",
        }
    }
}

impl TryFrom<u8> for Command {
    type Error = MiniTelError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0x01 => Ok(Command::Hello),
            0x02 => Ok(Command::Dump),
            0x04 => Ok(Command::StopCmd),
            0x81 => Ok(Command::HelloAck),
            0x82 => Ok(Command::DumpFailed),
            0x83 => Ok(Command::DumpOk),
            0x84 => Ok(Command::StopOk),
            _ => Err(MiniTelError::UnknownCommand { byte }),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One protocol message unit.
///
/// The hash always covers `command ‖ nonce ‖ payload`; `Frame::new` computes
/// it and the codec only yields frames whose hash has been verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    command: Command,
    nonce: u32,
    payload: Vec<u8>,
    hash: [u8; HASH_SIZE],
}

impl Frame {
    pub fn new(command: Command, nonce: u32, payload: Vec<u8>) -> Self {
        let hash = Self::compute_hash(command.to_byte(), nonce, &payload);
        Self {
            command,
            nonce,
            payload,
            hash,
        }
    }

    /// Build a frame with no payload.
    pub fn empty(command: Command, nonce: u32) -> Self {
        Self::new(command, nonce, Vec::new())
    }

    pub(crate) fn from_verified_parts(
        command: Command,
        nonce: u32,
        payload: Vec<u8>,
        hash: [u8; HASH_SIZE],
    ) -> Self {
        Self {
            command,
            nonce,
            payload,
            hash,
        }
    }

    /// SHA-256 over the command byte, the big-endian nonce and the payload.
    pub fn compute_hash(command: u8, nonce: u32, payload: &[u8]) -> [u8; HASH_SIZE] {
        let mut hasher = Sha256::new();
        hasher.update([command]);
        hasher.update(nonce.to_be_bytes());
        hasher.update(payload);
        hasher.finalize().into()
    }

    pub fn command(&self) -> Command {
        self.command
    }

    pub fn nonce(&self) -> u32 {
        self.nonce
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    pub fn hash(&self) -> &[u8; HASH_SIZE] {
        &self.hash
    }

    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }
}
