// ============================================
// File: crates/gameshard-server/src/handlers/protocol_version.rs
// ============================================
//! # Protocol Version Handler
//!
//! ## Creation Reason
//! First packet of every connection. The client declares its protocol
//! version; the server answers with the connection key and whether the
//! version is accepted.
//!
//! ## Handshake
//! ```text
//! Client                                   Server
//!   │ ── [0x00] version (u16 LE) ──────────► │ generate 128-bit key
//!   │                                        │ decrypter ON (inbound)
//!   │ ◄── [0x2e] key(16) accepted(u8) ────── │ plaintext
//!   │                                        │ ack:
//!   │                                        │   accepted → encrypter ON (key copy)
//!   │                                        │   rejected → close
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - The announcement must leave in plaintext; the encrypter is switched
//!   on by the writer only after its write completed
//! - Inbound and outbound ciphers evolve separately, the encrypter gets
//!   its own copy of the key
//!
//! ## Last Modified
//! v0.1.0 - Initial handshake

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, warn};

use gameshard_core::protocol::{ClientPacket, KeyAnnouncement, ProtocolVersion, ProtocolVersionRequest};

use super::ClientPacketHandler;
use crate::error::{Result, ServerError};
use crate::services::{AfterWrite, KeygenService, Session, SessionStage};

/// Handles the client protocol version packet.
#[derive(Debug)]
pub struct ProtocolVersionHandler {
    keygen: Arc<KeygenService>,
    supported: ProtocolVersion,
}

impl ProtocolVersionHandler {
    /// Creates the handler accepting exactly `supported`.
    pub fn new(keygen: Arc<KeygenService>, supported: ProtocolVersion) -> Self {
        Self { keygen, supported }
    }
}

impl ClientPacketHandler for ProtocolVersionHandler {
    fn name(&self) -> &'static str {
        "protocol_version"
    }

    fn handle(&self, session: &Arc<Session>, mut body: Bytes) -> Result<()> {
        let request = ProtocolVersionRequest::read(&mut body)?;
        if session.stage() >= SessionStage::Versioned {
            return Err(ServerError::unexpected_packet(
                session.id(),
                "protocol version already declared",
            ));
        }

        let key = self.keygen.connection_key()?;
        session.set_version(request.version);
        session.enable_decrypter(key.copy());

        if request.version.is_compatible_with(&self.supported) {
            debug!(
                connection = %session.id(),
                version = %request.version,
                "Protocol version accepted"
            );
            let outbound = key.copy();
            // The writer closes the session if this write fails
            drop(session.write_then(
                &KeyAnnouncement::new(key, true),
                AfterWrite::EnableEncrypter(outbound),
            ));
        } else {
            warn!(
                connection = %session.id(),
                version = %request.version,
                supported = %self.supported,
                "Protocol version rejected"
            );
            drop(session.write_then(&KeyAnnouncement::new(key, false), AfterWrite::Close));
        }

        Ok(())
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use bytes::{Buf, BytesMut};
    use parking_lot::Mutex;

    use gameshard_common::types::ConnectionId;
    use gameshard_core::protocol::{encode_frame, ClientOpcode, FrameCodec, DEFAULT_SUPPORTED_VERSION};
    use gameshard_core::{CryptographyKey, FrameCipher, SeededKeygen};
    use gameshard_transport::MockTransport;

    use crate::config::{KeygenConfig, KeygenMode};
    use crate::handlers::{InboundPipeline, PacketDispatcher};

    #[derive(Default)]
    struct Recorder(Mutex<Vec<Bytes>>);

    impl ClientPacketHandler for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        fn handle(&self, _session: &Arc<Session>, body: Bytes) -> Result<()> {
            self.0.lock().push(body);
            Ok(())
        }
    }

    struct Harness {
        pipeline: InboundPipeline,
        recorder: Arc<Recorder>,
        session: Arc<Session>,
        transport: Arc<MockTransport>,
    }

    fn harness() -> Harness {
        let keygen = Arc::new(KeygenService::from_config(&KeygenConfig {
            mode: KeygenMode::Pseudo,
            seed: Some(7),
        }));
        let recorder = Arc::new(Recorder::default());
        let dispatcher = PacketDispatcher::builder()
            .register(
                ClientOpcode::ProtocolVersion,
                Arc::new(ProtocolVersionHandler::new(keygen, DEFAULT_SUPPORTED_VERSION)),
            )
            .register(ClientOpcode::CharacterAction, recorder.clone())
            .build();
        let transport = Arc::new(MockTransport::new());
        Harness {
            pipeline: InboundPipeline::new(Arc::new(dispatcher)),
            recorder,
            session: Session::new(ConnectionId::next(), transport.clone()),
            transport,
        }
    }

    fn version_frame(version: u16) -> BytesMut {
        let [lo, hi] = version.to_le_bytes();
        encode_frame(&[0x00, lo, hi]).unwrap()
    }

    fn announcement(frame: &Bytes) -> KeyAnnouncement {
        let mut wire = BytesMut::from(&frame[..]);
        let payload = FrameCodec::new().decode(&mut wire).unwrap().unwrap();
        assert_eq!(payload[0], 0x2e, "key announcement opcode");
        let mut body = payload.freeze();
        body.advance(1);
        KeyAnnouncement::decode(&mut body).unwrap()
    }

    #[tokio::test]
    async fn test_accepted_handshake() {
        let h = harness();
        let mut buf = version_frame(216);
        h.pipeline.feed(&h.session, &mut buf).unwrap();

        assert!(h.session.is_decrypting(), "decrypter must be on right away");
        assert_eq!(h.session.stage(), SessionStage::Keyed);
        assert_eq!(h.session.version(), Some(ProtocolVersion::new(216)));

        // The announcement is readable without any key
        let written = h.transport.wait_for_writes(1).await;
        let announced = announcement(&written[0]);
        assert!(announced.accepted);

        // Server to client: later frames are encrypted with the announced key
        h.session
            .send_payload(&[0x2e, 1, 2, 3, 4], AfterWrite::Nothing)
            .wait()
            .await
            .unwrap();
        assert!(h.session.is_encrypting());
        let written = h.transport.written();
        let mut wire = BytesMut::from(&written[1][..]);
        let mut payload = FrameCodec::new().decode(&mut wire).unwrap().unwrap();
        FrameCipher::new(announced.key.copy()).decrypt(&mut payload);
        assert_eq!(&payload[..], &[0x2e, 1, 2, 3, 4]);

        // Client to server: frames encrypted with the announced key are decrypted
        let mut client = FrameCipher::new(announced.key.copy());
        let mut inbound = BytesMut::new();
        for body in [&[0x1f_u8, 10, 20][..], &[0x1f, 30][..]] {
            let mut frame = encode_frame(body).unwrap();
            client.encrypt(&mut frame[2..]);
            inbound.extend_from_slice(&frame);
        }
        assert_eq!(h.pipeline.feed(&h.session, &mut inbound).unwrap(), 2);
        assert_eq!(
            h.recorder.0.lock().as_slice(),
            &[Bytes::from_static(&[10, 20]), Bytes::from_static(&[30])]
        );
        assert!(!h.session.is_closed());
    }

    #[tokio::test]
    async fn test_encrypted_frame_in_same_read_as_version() {
        let h = harness();
        // Same seed as the handler's generator, so this is the key it will announce
        let expected = CryptographyKey::generate(&SeededKeygen::from_seed(7)).unwrap();

        let mut inbound = version_frame(216);
        let mut frame = encode_frame(&[0x1f, 42, 43]).unwrap();
        FrameCipher::new(expected.copy()).encrypt(&mut frame[2..]);
        inbound.extend_from_slice(&frame);

        assert_eq!(h.pipeline.feed(&h.session, &mut inbound).unwrap(), 2);
        assert!(inbound.is_empty());
        assert_eq!(h.recorder.0.lock().as_slice(), &[Bytes::from_static(&[42, 43])]);

        let announced = announcement(&h.transport.wait_for_writes(1).await[0]);
        assert_eq!(announced.key.as_bytes(), expected.as_bytes());
        assert!(!h.session.is_closed());
    }

    #[tokio::test]
    async fn test_rejected_handshake() {
        let h = harness();
        let mut buf = version_frame(152);
        h.pipeline.feed(&h.session, &mut buf).unwrap();

        // Queued behind the announcement, must never reach the wire
        let late = h.session.send_payload(&[0x2e, 0], AfterWrite::Nothing);

        h.session.closed().await;
        assert!(late.wait().await.is_err());

        let written = h.transport.written();
        assert_eq!(written.len(), 1, "nothing after the announcement");
        let announced = announcement(&written[0]);
        assert!(!announced.accepted);
        assert_eq!(h.transport.close_count(), 1);
        assert!(!h.session.is_encrypting());

        // Further input is ignored
        let mut buf = version_frame(216);
        assert_eq!(h.pipeline.feed(&h.session, &mut buf).unwrap(), 0);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(h.transport.written_count(), 1);
        assert_eq!(h.transport.close_count(), 1);
    }

    #[tokio::test]
    async fn test_rejected_close_waits_for_write() {
        let h = harness();
        h.transport.set_write_delay(Some(Duration::from_millis(50)));
        let mut buf = version_frame(1);
        h.pipeline.feed(&h.session, &mut buf).unwrap();

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(h.transport.close_count(), 0, "close must wait for the announcement");

        h.transport.wait_for_close().await;
        assert_eq!(h.transport.written_count(), 1);
    }

    #[tokio::test]
    async fn test_second_version_packet_rejected() {
        let h = harness();
        let mut buf = version_frame(216);
        h.pipeline.feed(&h.session, &mut buf).unwrap();
        let announced = announcement(&h.transport.wait_for_writes(1).await[0]);

        let mut frame = version_frame(216);
        FrameCipher::new(announced.key).encrypt(&mut frame[2..]);
        let err = h.pipeline.feed(&h.session, &mut frame).unwrap_err();
        assert!(err.closes_connection());
    }
}
