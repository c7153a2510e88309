//! Transport traits for simulator connections

use crate::Result;

/// An open, message-oriented connection to the simulator
///
/// Transports abstract over the websocket so the session logic can run against
/// an in-memory script in tests. A transport is only handed out once the
/// connection is open, so anything sent on it is sent after the open event.
#[async_trait::async_trait]
pub trait Transport: Send + 'static {
    /// Send one text message
    async fn send_text(&mut self, text: String) -> Result<()>;

    /// Wait for the next text message
    ///
    /// Returns:
    /// - `Ok(Some(text))` - Message received
    /// - `Ok(None)` - Connection closed (by either side)
    /// - `Err(e)` - Transport error
    ///
    /// Control frames (ping/pong) are handled internally and never returned.
    async fn next_message(&mut self) -> Result<Option<String>>;

    /// Close the connection from the client side
    async fn close(&mut self) -> Result<()>;
}

/// Opens transports to an endpoint
#[async_trait::async_trait]
pub trait Connector: Send + Sync + 'static {
    type Transport: Transport;

    /// Open a connection, resolving once it is established
    async fn connect(&self, endpoint: &str) -> Result<Self::Transport>;
}
