//! FrameSource trait - upstream transport abstraction
//!
//! The connector only needs "connect, receive next frame, close". Real
//! transports (WebSocket) and scripted mocks implement the same trait so the
//! reconnect state machine is transport agnostic.

use crate::{ContractError, RawFrame};

/// Upstream frame source
///
/// A source is reused across reconnects: `connect` is called again after
/// every disconnect, and must replace any previous connection.
#[trait_variant::make(FrameSource: Send)]
pub trait LocalFrameSource {
    /// Human readable address, used in logs
    fn endpoint(&self) -> &str;

    /// Open a connection to the upstream
    ///
    /// # Errors
    /// `ContractError::UpstreamConnect` when the handshake fails
    async fn connect(&mut self) -> Result<(), ContractError>;

    /// Receive the next frame
    ///
    /// Returns `Ok(None)` when the server closed the connection normally.
    ///
    /// # Errors
    /// `ContractError::UpstreamRead` on transport failure
    async fn next_frame(&mut self) -> Result<Option<RawFrame>, ContractError>;

    /// Close the current connection (no-op when not connected)
    async fn close(&mut self);
}
