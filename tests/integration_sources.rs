use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use fifteen_twenty::config::GameConfig;
use fifteen_twenty::error::SourceError;
use fifteen_twenty::input::{
    start_with_retry, EventSink, GestureEvent, GestureSource, SourceKind, TranscriptFilter,
    VoiceSource,
};
use fifteen_twenty::runtime::{ChannelEventSource, GameEvent, Runner};
use fifteen_twenty::{Command, GameSession, SessionEvent};

/// Replays one label forever until stopped.
struct ScriptedCamera {
    label: &'static str,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ScriptedCamera {
    fn new(label: &'static str) -> Self {
        Self {
            label,
            stop: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }
}

impl GestureSource for ScriptedCamera {
    fn start(&mut self, sink: EventSink) -> Result<(), SourceError> {
        let stop = Arc::clone(&self.stop);
        let label = self.label;
        self.handle = Some(thread::spawn(move || {
            while !stop.load(Ordering::Relaxed) {
                if !sink.gesture(GestureEvent::new(label, 0.8)) {
                    break;
                }
                thread::sleep(Duration::from_millis(1));
            }
        }));
        Ok(())
    }

    fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Streams a growing hypothesis the way a recognizer does; fails to open a
/// configurable number of times first.
struct ScriptedMicrophone {
    failures_left: u32,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ScriptedMicrophone {
    fn new(failures: u32) -> Self {
        Self {
            failures_left: failures,
            stop: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }
}

impl VoiceSource for ScriptedMicrophone {
    fn start(&mut self, sink: EventSink) -> Result<(), SourceError> {
        if self.failures_left > 0 {
            self.failures_left -= 1;
            return Err(SourceError::Unavailable {
                kind: SourceKind::Voice,
                reason: "device busy".into(),
            });
        }
        let stop = Arc::clone(&self.stop);
        self.handle = Some(thread::spawn(move || {
            let mut filter = TranscriptFilter::new();
            let chunks = ["", "我", "我猜", "我猜", "我猜五"];
            while !stop.load(Ordering::Relaxed) {
                for chunk in chunks {
                    if let Some(event) = filter.accept(chunk) {
                        if !sink.transcript(event) {
                            return;
                        }
                    }
                    thread::sleep(Duration::from_millis(1));
                }
                filter.reset();
            }
        }));
        Ok(())
    }

    fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[test]
fn scripted_sources_drive_a_full_session() {
    let config = GameConfig {
        target_valid_rounds: 1,
        ready_delay_ms: 1,
        round_timeout_ms: 2_000,
        stillness_ms: 3,
        result_pause_ms: 1,
        ..GameConfig::default()
    };
    let (tx, rx) = mpsc::channel();
    let (out_tx, out_rx) = mpsc::channel();
    let runner = Runner::new(
        ChannelEventSource::new(rx),
        GameSession::new(config).unwrap(),
        out_tx,
    );
    let game = thread::spawn(move || runner.run());

    let mut camera = ScriptedCamera::new("Open_Palm");
    let mut microphone = ScriptedMicrophone::new(2);
    let sink = EventSink::new(tx.clone());

    camera.start(sink.clone()).unwrap();
    start_with_retry(SourceKind::Voice, 3, Duration::ZERO, || {
        microphone.start(sink.clone())
    })
    .unwrap();
    sink.command(Command::Begin);

    let mut outcome = None;
    while let Ok(event) = out_rx.recv_timeout(Duration::from_secs(10)) {
        match event {
            SessionEvent::RoundResolved { outcome: o, .. } if outcome.is_none() => {
                outcome = Some(o)
            }
            SessionEvent::SessionFinished(_) => break,
            _ => {}
        }
    }

    camera.stop();
    microphone.stop();
    tx.send(GameEvent::Command(Command::Exit)).unwrap();
    game.join().unwrap();

    let outcome = outcome.expect("no round resolved");
    assert_eq!(outcome.player_gesture, 5);
    assert_eq!(outcome.player_call, 5);
    assert!(!outcome.auto_filled.any());
}

#[test]
fn unavailable_source_is_reported_and_game_still_plays() {
    let (tx, rx) = mpsc::channel();
    let (out_tx, out_rx) = mpsc::channel();
    let runner = Runner::new(
        ChannelEventSource::new(rx),
        GameSession::new(GameConfig {
            target_valid_rounds: 1,
            ready_delay_ms: 1,
            round_timeout_ms: 5,
            result_pause_ms: 1,
            ..GameConfig::default()
        })
        .unwrap(),
        out_tx,
    );
    let game = thread::spawn(move || runner.run());
    let sink = EventSink::new(tx.clone());

    let mut microphone = ScriptedMicrophone::new(5);
    let err = start_with_retry(SourceKind::Voice, 3, Duration::ZERO, || {
        microphone.start(sink.clone())
    })
    .unwrap_err();
    sink.error(err);
    sink.command(Command::Begin);

    // calls are auto-filled from the call domain, so nobody can win; stop after a few rounds
    let mut events = Vec::new();
    while let Ok(event) = out_rx.recv_timeout(Duration::from_secs(10)) {
        let resolved = matches!(event, SessionEvent::RoundResolved { .. });
        events.push(event);
        if resolved && events.len() > 6 {
            break;
        }
    }
    tx.send(GameEvent::Command(Command::Exit)).unwrap();
    game.join().unwrap();

    assert!(matches!(&events[0], SessionEvent::SourceError(msg) if msg.contains("voice")));
    assert!(events.iter().all(|e| match e {
        SessionEvent::RoundResolved { outcome, .. } => outcome.result.is_draw(),
        _ => true,
    }));
}
