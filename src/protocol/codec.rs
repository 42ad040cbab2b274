//! Frame encoding and decoding.
//!
//! Outer framing:
//! ```text
//! +----------------+------------------------+
//! | LEN (2B BE)    | DATA_B64 (LEN bytes)   |
//! +----------------+------------------------+
//! ```
//!
//! Binary frame (after base64 decoding):
//! ```text
//! +---------+--------------+-------------------+-------------+
//! | CMD (1) | NONCE (4 BE) | PAYLOAD (0-65535) | HASH (32)   |
//! +---------+--------------+-------------------+-------------+
//! ```

use crate::error::{MiniTelError, Result};
use crate::protocol::types::{
    Command, Frame, COMMAND_SIZE, HASH_SIZE, MAX_PAYLOAD_SIZE, MIN_FRAME_SIZE, NONCE_SIZE,
};
use base64::{engine::general_purpose, Engine as _};
use tracing::{debug, error, instrument, trace};

pub const LENGTH_PREFIX_SIZE: usize = 2;

/// Largest base64 block the 16-bit length prefix can describe.
pub const MAX_ENCODED_SIZE: usize = u16::MAX as usize;

pub struct FrameCodec;

impl FrameCodec {
    /// Serialize a frame to `LEN ‖ base64(CMD ‖ NONCE ‖ PAYLOAD ‖ HASH)`.
    #[instrument(level = "trace", skip(frame), fields(command = %frame.command(), nonce = frame.nonce()))]
    pub fn encode(frame: &Frame) -> Result<Vec<u8>> {
        if frame.payload().len() > MAX_PAYLOAD_SIZE {
            return Err(MiniTelError::malformed(format!(
                "payload of {} bytes exceeds maximum of {} bytes",
                frame.payload().len(),
                MAX_PAYLOAD_SIZE
            )));
        }

        let binary = Self::encode_binary(frame);
        let encoded = general_purpose::STANDARD.encode(&binary);

        if encoded.len() > MAX_ENCODED_SIZE {
            return Err(MiniTelError::malformed(format!(
                "encoded frame of {} bytes does not fit the {}-byte length prefix",
                encoded.len(),
                LENGTH_PREFIX_SIZE
            )));
        }

        let mut wire = Vec::with_capacity(LENGTH_PREFIX_SIZE + encoded.len());
        wire.extend_from_slice(&(encoded.len() as u16).to_be_bytes());
        wire.extend_from_slice(encoded.as_bytes());

        trace!(wire_size = wire.len(), "Encoded frame");
        Ok(wire)
    }

    /// The binary frame before base64 encoding.
    pub fn encode_binary(frame: &Frame) -> Vec<u8> {
        let mut binary = Vec::with_capacity(MIN_FRAME_SIZE + frame.payload().len());
        binary.push(frame.command().to_byte());
        binary.extend_from_slice(&frame.nonce().to_be_bytes());
        binary.extend_from_slice(frame.payload());
        binary.extend_from_slice(frame.hash());
        binary
    }

    /// Parse a complete wire frame, verifying its integrity hash.
    ///
    /// Bytes after the length-prefixed block are ignored.
    #[instrument(level = "trace", skip(wire), fields(wire_size = wire.len()))]
    pub fn decode(wire: &[u8]) -> Result<Frame> {
        if wire.len() < LENGTH_PREFIX_SIZE {
            return Err(MiniTelError::malformed(format!(
                "frame too short to contain length prefix ({} bytes)",
                wire.len()
            )));
        }

        let declared = u16::from_be_bytes([wire[0], wire[1]]) as usize;
        let available = wire.len() - LENGTH_PREFIX_SIZE;
        if declared > available {
            return Err(MiniTelError::malformed(format!(
                "length prefix declares {} bytes but only {} are available",
                declared, available
            )));
        }

        let encoded = &wire[LENGTH_PREFIX_SIZE..LENGTH_PREFIX_SIZE + declared];
        let binary = general_purpose::STANDARD.decode(encoded).map_err(|e| {
            error!(error = %e, "Base64 decoding failed");
            MiniTelError::Encoding(e)
        })?;

        Self::decode_binary(&binary)
    }

    /// Parse a binary frame (already base64-decoded).
    pub fn decode_binary(binary: &[u8]) -> Result<Frame> {
        if binary.len() < MIN_FRAME_SIZE {
            return Err(MiniTelError::malformed(format!(
                "binary frame too short: expected at least {} bytes, got {}",
                MIN_FRAME_SIZE,
                binary.len()
            )));
        }

        let hash_start = binary.len() - HASH_SIZE;
        let command_byte = binary[0];
        let nonce = u32::from_be_bytes([binary[1], binary[2], binary[3], binary[4]]);
        let payload = &binary[COMMAND_SIZE + NONCE_SIZE..hash_start];

        let mut received = [0u8; HASH_SIZE];
        received.copy_from_slice(&binary[hash_start..]);

        let expected = Frame::compute_hash(command_byte, nonce, payload);
        if received != expected {
            error!(
                expected = %hex::encode(expected),
                received = %hex::encode(received),
                "Frame hash validation failed"
            );
            return Err(MiniTelError::Integrity {
                expected: hex::encode(expected),
                received: hex::encode(received),
            });
        }

        // Only trust the command byte once the hash has vouched for it.
        let command = Command::try_from(command_byte)?;

        debug!(
            command = %command,
            nonce = nonce,
            payload_size = payload.len(),
            "Decoded frame"
        );
        Ok(Frame::from_verified_parts(
            command,
            nonce,
            payload.to_vec(),
            received,
        ))
    }
}
