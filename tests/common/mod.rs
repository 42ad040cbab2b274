//! Shared helpers for the integration tests: frame builders and a scripted
//! MiniTel-Lite server listening on a local TCP port.

#![allow(dead_code)]

use base64::{engine::general_purpose, Engine as _};
use minitel::protocol::{read_frame, write_frame, Command, Frame, FrameCodec};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Encoded wire bytes for a frame.
pub fn wire(command: Command, nonce: u32, payload: &[u8]) -> Vec<u8> {
    FrameCodec::encode(&Frame::new(command, nonce, payload.to_vec())).expect("encodable frame")
}

/// Wire bytes for a frame whose last hash byte has been flipped.
pub fn tampered_wire(command: Command, nonce: u32, payload: &[u8]) -> Vec<u8> {
    let mut binary = FrameCodec::encode_binary(&Frame::new(command, nonce, payload.to_vec()));
    let last = binary.len() - 1;
    binary[last] ^= 0x01;
    let encoded = general_purpose::STANDARD.encode(&binary);
    let mut wire = (encoded.len() as u16).to_be_bytes().to_vec();
    wire.extend_from_slice(encoded.as_bytes());
    wire
}

/// How the fake server answers.
#[derive(Debug, Clone)]
pub struct ServerBehavior {
    /// DUMP_FAILED answers before the first DUMP_OK
    pub dump_failures: u32,
    pub secret: Vec<u8>,
    /// Added to every correct response nonce
    pub nonce_skew: u32,
}

impl Default for ServerBehavior {
    fn default() -> Self {
        Self {
            dump_failures: 1,
            secret: b"SECRET".to_vec(),
            nonce_skew: 0,
        }
    }
}

/// Start a server handling a single connection. The handle resolves to the
/// commands it received, in order.
pub async fn spawn_server(behavior: ServerBehavior) -> (u16, JoinHandle<Vec<Command>>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let port = listener.local_addr().expect("local addr").port();

    let handle = tokio::spawn(async move {
        let mut received = Vec::new();
        let (mut stream, _) = match listener.accept().await {
            Ok(conn) => conn,
            Err(_) => return received,
        };

        let mut failures_left = behavior.dump_failures;
        loop {
            let raw = match read_frame(&mut stream, TEST_TIMEOUT).await {
                Ok(raw) => raw,
                Err(_) => break,
            };
            let request = match FrameCodec::decode(&raw) {
                Ok(frame) => frame,
                Err(_) => break,
            };
            received.push(request.command());

            let nonce = request.nonce() + 1 + behavior.nonce_skew;
            let response = match request.command() {
                Command::Hello => Frame::empty(Command::HelloAck, nonce),
                Command::Dump if failures_left > 0 => {
                    failures_left -= 1;
                    Frame::empty(Command::DumpFailed, nonce)
                }
                Command::Dump => Frame::new(Command::DumpOk, nonce, behavior.secret.clone()),
                Command::StopCmd => Frame::empty(Command::StopOk, nonce),
                _ => break,
            };

            let encoded = FrameCodec::encode(&response).expect("encodable response");
            if write_frame(&mut stream, &encoded, TEST_TIMEOUT).await.is_err() {
                break;
            }
            if response.command() == Command::StopOk {
                break;
            }
        }
        received
    });

    (port, handle)
}
