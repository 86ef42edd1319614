// ============================================
// File: crates/gameshard-server/src/handlers/dispatch.rs
// ============================================
//! # Packet Dispatch
//!
//! ## Creation Reason
//! Turns the raw byte stream of a connection into handler calls:
//! deframe, decrypt, look up the opcode, run the handler.
//!
//! ## Main Functionality
//! - `ClientPacketHandler`: One handler per client opcode
//! - `PacketDispatcher`: Immutable opcode table built at startup
//! - `InboundPipeline`: Frame decoding loop fed by the reader task
//!
//! ## Inbound Processing
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  1. Append socket bytes to the connection buffer            │
//! │  2. Decode one frame (stop if incomplete)                   │
//! │     ┌──────────┬────────┬───────────────────────────┐      │
//! │     │ len u16  │ opcode │ body                      │      │
//! │     └──────────┴────────┴───────────────────────────┘      │
//! │  3. Decrypt opcode + body if the decrypter is active        │
//! │  4. Dispatch by opcode; unknown opcodes are dropped         │
//! │  5. Repeat until the buffer is drained or the session closes│
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - A handler may switch on decryption; the very next frame in the same
//!   buffer must already be decrypted, so never decode ahead
//! - Handlers run on the reader task, keep them short
//!
//! ## Last Modified
//! v0.1.0 - Initial dispatcher

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bytes::{Buf, Bytes, BytesMut};
use tracing::{debug, trace, warn};

use gameshard_core::protocol::frame::LENGTH_FIELD_SIZE;
use gameshard_core::protocol::{ClientOpcode, FrameCodec};

use crate::error::Result;
use crate::services::Session;

// ============================================
// ClientPacketHandler
// ============================================

/// Handler for one client opcode.
pub trait ClientPacketHandler: Send + Sync {
    /// Handler name for logs.
    fn name(&self) -> &'static str;

    /// Handles a decrypted frame body (opcode already stripped).
    ///
    /// # Errors
    /// Errors for which [`ServerError::closes_connection`] holds end the
    /// connection; the rest are logged.
    ///
    /// [`ServerError::closes_connection`]: crate::error::ServerError::closes_connection
    fn handle(&self, session: &Arc<Session>, body: Bytes) -> Result<()>;
}

// ============================================
// PacketDispatcher
// ============================================

/// Opcode to handler table.
#[derive(Clone, Default)]
pub struct PacketDispatcher {
    handlers: HashMap<u8, Arc<dyn ClientPacketHandler>>,
}

impl PacketDispatcher {
    /// Starts an empty table.
    #[must_use]
    pub fn builder() -> PacketDispatcherBuilder {
        PacketDispatcherBuilder::default()
    }

    /// Returns `true` if a handler exists for `opcode`.
    #[must_use]
    pub fn handles(&self, opcode: u8) -> bool {
        self.handlers.contains_key(&opcode)
    }

    /// Dispatches one decrypted payload (opcode included).
    ///
    /// Unknown opcodes are counted, logged and discarded.
    ///
    /// # Errors
    /// Whatever the handler returns.
    pub fn dispatch(&self, session: &Arc<Session>, payload: BytesMut) -> Result<()> {
        let Some(&opcode) = payload.first() else {
            return Ok(());
        };

        let Some(handler) = self.handlers.get(&opcode) else {
            session.stats().record_unknown_opcode();
            warn!(
                connection = %session.id(),
                opcode = format_args!("{opcode:#04x}"),
                len = payload.len(),
                "Unknown opcode, frame discarded"
            );
            return Ok(());
        };

        trace!(connection = %session.id(), handler = handler.name(), "Dispatching frame");
        let mut body = payload.freeze();
        body.advance(1);
        handler.handle(session, body)
    }
}

impl fmt::Debug for PacketDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut table: Vec<_> = self
            .handlers
            .iter()
            .map(|(opcode, handler)| (*opcode, handler.name()))
            .collect();
        table.sort_unstable();
        f.debug_struct("PacketDispatcher")
            .field("handlers", &table)
            .finish()
    }
}

/// Builder for [`PacketDispatcher`].
#[derive(Default)]
pub struct PacketDispatcherBuilder {
    handlers: HashMap<u8, Arc<dyn ClientPacketHandler>>,
}

impl PacketDispatcherBuilder {
    /// Registers `handler` for `opcode`, replacing any earlier one.
    #[must_use]
    pub fn register(mut self, opcode: ClientOpcode, handler: Arc<dyn ClientPacketHandler>) -> Self {
        self.handlers.insert(opcode.as_byte(), handler);
        self
    }

    /// Freezes the table.
    #[must_use]
    pub fn build(self) -> PacketDispatcher {
        PacketDispatcher {
            handlers: self.handlers,
        }
    }
}

// ============================================
// InboundPipeline
// ============================================

/// Frame decoding and dispatch for one server.
#[derive(Debug, Clone)]
pub struct InboundPipeline {
    codec: FrameCodec,
    dispatcher: Arc<PacketDispatcher>,
}

impl InboundPipeline {
    /// Creates a pipeline over `dispatcher`.
    pub fn new(dispatcher: Arc<PacketDispatcher>) -> Self {
        Self {
            codec: FrameCodec::new(),
            dispatcher,
        }
    }

    /// Processes every complete frame in `buf`.
    ///
    /// Incomplete trailing bytes stay in `buf` for the next call.
    /// Returns the number of frames processed.
    ///
    /// # Errors
    /// Returns a connection-closing error (malformed frame, protocol
    /// violation). The caller closes the session.
    pub fn feed(&self, session: &Arc<Session>, buf: &mut BytesMut) -> Result<usize> {
        let mut frames = 0;

        while !session.is_closed() {
            let Some(mut payload) = self.codec.decode(buf)? else {
                break;
            };
            frames += 1;
            session.touch();
            session.stats().record_rx((payload.len() + LENGTH_FIELD_SIZE) as u64);
            session.decrypt_inbound(&mut payload);

            if let Err(e) = self.dispatcher.dispatch(session, payload) {
                if e.closes_connection() {
                    return Err(e);
                }
                debug!(connection = %session.id(), error = %e, "Handler failed");
            }
        }

        Ok(frames)
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use gameshard_common::types::ConnectionId;
    use gameshard_core::protocol::encode_frame;
    use gameshard_transport::MockTransport;
    use parking_lot::Mutex;

    use crate::error::ServerError;

    #[derive(Default)]
    struct Recorder {
        bodies: Mutex<Vec<Bytes>>,
    }

    impl ClientPacketHandler for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        fn handle(&self, session: &Arc<Session>, body: Bytes) -> Result<()> {
            if body.first() == Some(&0xff) {
                return Err(ServerError::unexpected_packet(session.id(), "poison"));
            }
            self.bodies.lock().push(body);
            Ok(())
        }
    }

    fn pipeline() -> (InboundPipeline, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let dispatcher = PacketDispatcher::builder()
            .register(ClientOpcode::CharacterAction, recorder.clone())
            .build();
        (InboundPipeline::new(Arc::new(dispatcher)), recorder)
    }

    fn session() -> (Arc<Session>, Arc<MockTransport>) {
        let transport = Arc::new(MockTransport::new());
        (Session::new(ConnectionId::next(), transport.clone()), transport)
    }

    fn stream(payloads: &[&[u8]]) -> Vec<u8> {
        payloads
            .iter()
            .flat_map(|p| encode_frame(p).unwrap().to_vec())
            .collect()
    }

    #[tokio::test]
    async fn test_unknown_opcode_is_discarded() {
        let (pipeline, recorder) = pipeline();
        let (session, transport) = session();
        let mut buf = BytesMut::from(&stream(&[&[0x7f, 1, 2], &[0x1f, 9]])[..]);

        assert_eq!(pipeline.feed(&session, &mut buf).unwrap(), 2);
        assert_eq!(session.stats().snapshot().unknown_opcodes, 1);
        assert_eq!(recorder.bodies.lock().as_slice(), &[Bytes::from_static(&[9])]);
        assert!(!session.is_closed());
        assert_eq!(transport.written_count(), 0);
    }

    #[tokio::test]
    async fn test_split_delivery_matches_whole() {
        let bytes = stream(&[&[0x1f, 1, 2, 3], &[0x1f], &[0x1f, 4, 5]]);

        let (whole, whole_rec) = pipeline();
        let (whole_session, _) = session();
        let mut buf = BytesMut::from(&bytes[..]);
        assert_eq!(whole.feed(&whole_session, &mut buf).unwrap(), 3);

        let (split, split_rec) = pipeline();
        let (split_session, _) = session();
        let mut buf = BytesMut::new();
        let mut frames = 0;
        for byte in &bytes {
            buf.extend_from_slice(&[*byte]);
            frames += split.feed(&split_session, &mut buf).unwrap();
        }

        assert_eq!(frames, 3);
        assert!(buf.is_empty());
        assert_eq!(*whole_rec.bodies.lock(), *split_rec.bodies.lock());
    }

    #[tokio::test]
    async fn test_malformed_frame_closes() {
        let (pipeline, _) = pipeline();
        let (session, _) = session();
        let mut buf = BytesMut::from(&[0x02u8, 0x00, 0x1f][..]);

        let err = pipeline.feed(&session, &mut buf).unwrap_err();
        assert!(err.closes_connection());
    }

    #[tokio::test]
    async fn test_protocol_violation_stops_feed() {
        let (pipeline, recorder) = pipeline();
        let (session, _) = session();
        let mut buf = BytesMut::from(&stream(&[&[0x1f, 0xff], &[0x1f, 1]])[..]);

        assert!(pipeline.feed(&session, &mut buf).is_err());
        assert!(recorder.bodies.lock().is_empty());
    }

    #[tokio::test]
    async fn test_closed_session_stops_feed() {
        let (pipeline, recorder) = pipeline();
        let (session, _) = session();
        session.close().await;
        let mut buf = BytesMut::from(&stream(&[&[0x1f, 1]])[..]);

        assert_eq!(pipeline.feed(&session, &mut buf).unwrap(), 0);
        assert!(recorder.bodies.lock().is_empty());
    }
}
