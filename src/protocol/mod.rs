pub mod codec;
pub mod nonce;
pub mod types;
pub mod wire;

pub use codec::{FrameCodec, LENGTH_PREFIX_SIZE, MAX_ENCODED_SIZE};
pub use nonce::NonceSequencer;
pub use types::{
    Command, Frame, COMMAND_SIZE, HASH_SIZE, MAX_PAYLOAD_SIZE, MIN_FRAME_SIZE, NONCE_SIZE,
};
pub use wire::{
    read_frame, write_frame, WireConfig, DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT,
    DEFAULT_WRITE_TIMEOUT,
};
