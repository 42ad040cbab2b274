use crate::error::{MiniTelError, Result};
use tracing::{error, trace};

/// Tracks the nonce counter shared by both directions of a session.
///
/// Every client frame takes the current value and advances the counter by
/// one; the matching server frame must carry exactly that value plus one,
/// which advances the counter again. A complete round trip therefore moves
/// the counter by two. No tolerance window, no resynchronization.
#[derive(Debug, Clone, Default)]
pub struct NonceSequencer {
    next: u32,
    last_client_nonce: Option<u32>,
}

impl NonceSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Nonce for the next client frame. Advances the counter.
    pub fn next_client_nonce(&mut self) -> u32 {
        let nonce = self.next;
        self.last_client_nonce = Some(nonce);
        self.next = nonce.wrapping_add(1);
        trace!(nonce, "Allocated client nonce");
        nonce
    }

    /// The value the next server frame must carry, if a client frame is outstanding.
    pub fn expected_server_nonce(&self) -> Option<u32> {
        self.last_client_nonce.map(|nonce| nonce.wrapping_add(1))
    }

    /// Accept a server nonce only if it is the last client nonce plus one.
    pub fn validate_server_nonce(&mut self, received: u32) -> Result<()> {
        let expected = self.expected_server_nonce();
        if expected != Some(received) {
            error!(?expected, received, "Server nonce mismatch");
            return Err(MiniTelError::Nonce { expected, received });
        }
        self.next = received.wrapping_add(1);
        trace!(received, next = self.next, "Server nonce accepted");
        Ok(())
    }

    /// The value the next client frame will use.
    pub fn current(&self) -> u32 {
        self.next
    }

    pub fn last_client_nonce(&self) -> Option<u32> {
        self.last_client_nonce
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
