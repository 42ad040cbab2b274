mod common;

use common::wire;
use minitel::network::{ProtocolSession, SessionConfig, SessionState};
use minitel::protocol::{Command, FrameCodec};
use minitel::recording::{Direction, Recording, SessionRecorder, SessionReplayer};
use minitel::MiniTelError;
use std::path::Path;
use tokio_test::io::Builder;

fn full_script() -> tokio_test::io::Mock {
    Builder::new()
        .write(&wire(Command::Hello, 0, b""))
        .read(&wire(Command::HelloAck, 1, b""))
        .write(&wire(Command::Dump, 2, b""))
        .read(&wire(Command::DumpFailed, 3, b""))
        .write(&wire(Command::Dump, 4, b""))
        .read(&wire(Command::DumpOk, 5, b"SECRET"))
        .write(&wire(Command::StopCmd, 6, b""))
        .read(&wire(Command::StopOk, 7, b""))
        .build()
}

fn json_files(dir: &Path) -> Vec<std::path::PathBuf> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| path.extension().map_or(false, |ext| ext == "json"))
        .collect()
}

#[tokio::test]
async fn test_full_session_is_recorded_and_replayable() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = ProtocolSession::new(
        SessionConfig::default(),
        SessionRecorder::enabled(dir.path()),
    );
    session.connect(full_script()).unwrap();
    session.hello().await.unwrap();
    session.retrieve_secret().await.unwrap();
    session.stop().await.unwrap();

    let path = session.recording_path().expect("recording saved").to_path_buf();
    assert_eq!(json_files(dir.path()), vec![path.clone()]);
    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("minitel_recording_"));

    let recording = Recording::load(&path).unwrap();
    assert!(recording.is_finished());
    assert_eq!(recording.events.len(), 8);
    assert!(recording.events.iter().all(|event| event.valid));

    let expected = [
        (Direction::Client, "HELLO", 0),
        (Direction::Server, "HELLO_ACK", 1),
        (Direction::Client, "DUMP", 2),
        (Direction::Server, "DUMP_FAILED", 3),
        (Direction::Client, "DUMP", 4),
        (Direction::Server, "DUMP_OK", 5),
        (Direction::Client, "STOP_CMD", 6),
        (Direction::Server, "STOP_OK", 7),
    ];
    for (event, (direction, command, nonce)) in recording.events.iter().zip(expected) {
        let frame = event.frame.as_ref().expect("valid events carry a frame");
        assert_eq!(event.direction, direction);
        assert_eq!(frame.command, command);
        assert_eq!(frame.nonce, nonce);
    }

    // Raw bytes are the exact wire frames and decode back to the same content.
    let secret_event = &recording.events[5];
    assert_eq!(secret_event.raw, wire(Command::DumpOk, 5, b"SECRET"));
    let decoded = FrameCodec::decode(&secret_event.raw).unwrap();
    assert_eq!(decoded.payload(), b"SECRET");

    let mut replayer = SessionReplayer::new(recording);
    assert_eq!(replayer.len(), 8);
    assert!(replayer.previous().is_some());
    assert_eq!(replayer.position(), 0);

    let mut steps = 1;
    while !replayer.is_at_end() {
        replayer.next();
        steps += 1;
    }
    assert_eq!(steps, 8);
    assert_eq!(replayer.position(), 7);

    replayer.next();
    assert_eq!(replayer.position(), 7);
    let last = replayer.current().unwrap();
    assert_eq!(last.frame.as_ref().unwrap().command, "STOP_OK");
}

#[tokio::test]
async fn test_nonce_failure_is_recorded_as_terminal_event() {
    let dir = tempfile::tempdir().unwrap();
    let mock = Builder::new()
        .write(&wire(Command::Hello, 0, b""))
        .read(&wire(Command::HelloAck, 1, b""))
        .write(&wire(Command::Dump, 2, b""))
        .read(&wire(Command::DumpFailed, 9, b""))
        .build();
    let mut session = ProtocolSession::new(
        SessionConfig::default(),
        SessionRecorder::enabled(dir.path()),
    );
    session.connect(mock).unwrap();
    session.hello().await.unwrap();

    let err = session.dump().await.unwrap_err();
    assert!(matches!(err, MiniTelError::Nonce { received: 9, .. }));
    assert_eq!(session.state(), SessionState::Disconnected);

    // The abort path saves the recording without an explicit stop.
    let path = session.recording_path().expect("recording saved on failure");
    let recording = Recording::load(path).unwrap();
    assert_eq!(recording.events.len(), 4);

    let last = recording.events.last().unwrap();
    assert_eq!(last.direction, Direction::Server);
    assert!(!last.valid);
    let rejected = last.frame.as_ref().expect("decoded frame kept on nonce failure");
    assert_eq!(rejected.command, "DUMP_FAILED");
    assert_eq!(rejected.nonce, 9);
    assert_eq!(last.error_kind.as_deref(), Some("NonceError"));
    assert_eq!(last.raw, wire(Command::DumpFailed, 9, b""));
    assert!(recording.events[..3].iter().all(|event| event.valid));
}

#[tokio::test]
async fn test_unexpected_command_is_recorded_with_its_frame() {
    let dir = tempfile::tempdir().unwrap();
    let mock = Builder::new()
        .write(&wire(Command::Hello, 0, b""))
        .read(&wire(Command::HelloAck, 1, b""))
        .write(&wire(Command::Dump, 2, b""))
        .read(&wire(Command::StopOk, 3, b"x"))
        .build();
    let mut session = ProtocolSession::new(
        SessionConfig::default(),
        SessionRecorder::enabled(dir.path()),
    );
    session.connect(mock).unwrap();
    session.hello().await.unwrap();

    assert!(matches!(
        session.dump().await,
        Err(MiniTelError::ProtocolViolation { .. })
    ));

    let path = session.recording_path().expect("recording saved on failure");
    let recording = Recording::load(path).unwrap();
    assert_eq!(recording.events.len(), 4);

    let last = recording.events.last().unwrap();
    assert!(!last.valid);
    assert_eq!(last.error_kind.as_deref(), Some("ProtocolViolationError"));
    let rejected = last.frame.as_ref().expect("decoded frame kept on violation");
    assert_eq!(rejected.command, "STOP_OK");
    assert_eq!(rejected.nonce, 3);
    assert_eq!(rejected.payload, b"x");
}

#[tokio::test]
async fn test_integrity_failure_is_recorded_without_frame() {
    let dir = tempfile::tempdir().unwrap();
    let mock = Builder::new()
        .write(&wire(Command::Hello, 0, b""))
        .read(&common::tampered_wire(Command::HelloAck, 1, b""))
        .build();
    let mut session = ProtocolSession::new(
        SessionConfig::default(),
        SessionRecorder::enabled(dir.path()),
    );
    session.connect(mock).unwrap();
    assert!(session.hello().await.is_err());

    let recording = Recording::load(session.recording_path().unwrap()).unwrap();
    assert_eq!(recording.events.len(), 2);
    let last = &recording.events[1];
    assert!(!last.valid);
    assert!(last.frame.is_none());
    assert_eq!(last.error_kind.as_deref(), Some("IntegrityError"));
}

#[tokio::test]
async fn test_recording_does_not_change_protocol_behavior() {
    let dir = tempfile::tempdir().unwrap();

    let mut plain = ProtocolSession::new(SessionConfig::default(), SessionRecorder::disabled());
    plain.connect(full_script()).unwrap();
    plain.hello().await.unwrap();
    let plain_secret = plain.retrieve_secret().await.unwrap();
    plain.stop().await.unwrap();

    let mut recorded = ProtocolSession::new(
        SessionConfig::default(),
        SessionRecorder::enabled(dir.path().join("recordings")),
    );
    recorded.connect(full_script()).unwrap();
    recorded.hello().await.unwrap();
    let recorded_secret = recorded.retrieve_secret().await.unwrap();
    recorded.stop().await.unwrap();

    assert_eq!(plain_secret, recorded_secret);
    assert_eq!(plain.state(), recorded.state());

    assert!(plain.recorded_events().is_empty());
    assert!(plain.recording_path().is_none());
    assert_eq!(recorded.recorded_events().len(), 8);
    assert_eq!(json_files(&dir.path().join("recordings")).len(), 1);
}

#[tokio::test]
async fn test_disabled_recording_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let recorder = SessionRecorder::from_config(false, dir.path());
    assert!(!recorder.is_enabled());

    let mut session = ProtocolSession::new(SessionConfig::default(), recorder);
    session.connect(full_script()).unwrap();
    session.hello().await.unwrap();
    session.retrieve_secret().await.unwrap();
    session.stop().await.unwrap();

    assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
}

#[tokio::test]
async fn test_each_session_gets_its_own_recording() {
    let dir = tempfile::tempdir().unwrap();
    let script = || {
        Builder::new()
            .write(&wire(Command::Hello, 0, b""))
            .read(&wire(Command::HelloAck, 1, b""))
            .write(&wire(Command::StopCmd, 2, b""))
            .read(&wire(Command::StopOk, 3, b""))
            .build()
    };
    let mut session = ProtocolSession::new(
        SessionConfig::default(),
        SessionRecorder::enabled(dir.path()),
    );

    let mut paths = Vec::new();
    for _ in 0..2 {
        session.connect(script()).unwrap();
        session.hello().await.unwrap();
        session.stop().await.unwrap();
        paths.push(session.recording_path().unwrap().to_path_buf());
        assert_eq!(session.recorded_events().len(), 4);
    }

    assert_ne!(paths[0], paths[1]);
    assert_eq!(json_files(dir.path()).len(), 2);
}
