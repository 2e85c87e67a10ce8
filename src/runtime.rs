use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CtEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use rand::rngs::StdRng;
use rand::Rng;

use crate::error::SourceError;
use crate::input::{EventSink, GestureEvent, SourceKind, TranscriptEvent};
use crate::session::{Command, GameSession, SessionEvent};

/// Everything producers can push into the session.
#[derive(Clone, Debug)]
pub enum GameEvent {
    Gesture(GestureEvent),
    Transcript(TranscriptEvent),
    Command(Command),
    SourceError(SourceError),
}

/// Inbound queue the runner consumes.
pub trait GameEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<GameEvent, RecvTimeoutError>;
}

/// Receiver end of the channel every producer's [`EventSink`] feeds.
pub struct ChannelEventSource {
    rx: Receiver<GameEvent>,
}

impl ChannelEventSource {
    pub fn new(rx: Receiver<GameEvent>) -> Self {
        Self { rx }
    }
}

impl GameEventSource for ChannelEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<GameEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Single consumer that owns the session.
///
/// Producers only ever send; every mutation of round and score state happens
/// on the thread calling [`Runner::step`]. Between events the runner sleeps
/// in `recv_timeout` no longer than the next armed timer.
pub struct Runner<E: GameEventSource, R: Rng = StdRng> {
    event_source: E,
    session: GameSession<R>,
    outbox: Sender<SessionEvent>,
    idle_wait: Duration,
}

impl<E: GameEventSource, R: Rng> Runner<E, R> {
    pub fn new(event_source: E, session: GameSession<R>, outbox: Sender<SessionEvent>) -> Self {
        Self {
            event_source,
            session,
            outbox,
            idle_wait: Duration::from_millis(250),
        }
    }

    /// Longest wait when no timer is armed.
    pub fn with_idle_wait(mut self, idle_wait: Duration) -> Self {
        self.idle_wait = idle_wait;
        self
    }

    pub fn session(&self) -> &GameSession<R> {
        &self.session
    }

    pub fn dispatch(&mut self, event: GameEvent, now: Instant) {
        match event {
            GameEvent::Gesture(gesture) => self.session.on_gesture(&gesture, now),
            GameEvent::Transcript(transcript) => self.session.on_transcript(&transcript, now),
            GameEvent::Command(command) => self.session.handle(command, now),
            GameEvent::SourceError(error) => self.session.on_source_error(&error),
        }
    }

    /// Waits for one event or the next timer. Returns false once the
    /// session has been exited.
    pub fn step(&mut self) -> bool {
        let now = Instant::now();
        self.session.advance(now);
        self.flush();
        if self.session.is_closed() {
            return false;
        }

        let wait = self
            .session
            .next_deadline()
            .map_or(self.idle_wait, |due| due.saturating_duration_since(now));

        match self.event_source.recv_timeout(wait) {
            Ok(event) => {
                let now = Instant::now();
                // timers that came due while waiting go first
                self.session.advance(now);
                self.dispatch(event, now);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => match self.session.next_deadline() {
                Some(due) => thread::sleep(due.saturating_duration_since(Instant::now())),
                None => {
                    log::info!("all producers gone, closing session");
                    self.session.exit();
                }
            },
        }

        self.session.advance(Instant::now());
        self.flush();
        !self.session.is_closed()
    }

    pub fn run(mut self) -> GameSession<R> {
        while self.step() {}
        self.session
    }

    fn flush(&mut self) {
        for event in self.session.drain_events() {
            if self.outbox.send(event).is_err() {
                log::debug!("no listener for session events");
            }
        }
    }
}

/// Maps a key press onto the event it stands in for.
///
/// `f`/`p` show a fist or a palm, digits are spoken calls, `s`/`c`/Enter
/// begin, `r` asks for the rules, `q`/Esc/Ctrl-C exit.
pub fn map_key(key: KeyEvent) -> Option<GameEvent> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(GameEvent::Command(Command::Exit));
    }
    let event = match key.code {
        KeyCode::Esc | KeyCode::Char('q') => GameEvent::Command(Command::Exit),
        KeyCode::Enter | KeyCode::Char('s') | KeyCode::Char('c') => {
            GameEvent::Command(Command::Begin)
        }
        KeyCode::Char('r') => GameEvent::Command(Command::RequestRules),
        KeyCode::Char('f') => GameEvent::Gesture(GestureEvent::new("Closed_Fist", 1.0)),
        KeyCode::Char('p') => GameEvent::Gesture(GestureEvent::new("Open_Palm", 1.0)),
        KeyCode::Char(c) if c.is_ascii_digit() => {
            GameEvent::Transcript(TranscriptEvent::new(c.to_string()))
        }
        _ => return None,
    };
    Some(event)
}

/// Keyboard stand-in for the camera and microphone.
pub struct TerminalInput {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl TerminalInput {
    const POLL: Duration = Duration::from_millis(50);

    pub fn start(sink: EventSink) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);

        let handle = thread::spawn(move || {
            while !flag.load(Ordering::Relaxed) {
                let ready = match event::poll(Self::POLL) {
                    Ok(ready) => ready,
                    Err(e) => {
                        report_disconnect(&sink, &e);
                        break;
                    }
                };
                if !ready {
                    continue;
                }
                match event::read() {
                    Ok(CtEvent::Key(key)) => {
                        if let Some(ev) = map_key(key) {
                            let delivered = match ev {
                                GameEvent::Gesture(g) => sink.gesture(g),
                                GameEvent::Transcript(t) => sink.transcript(t),
                                GameEvent::Command(c) => sink.command(c),
                                GameEvent::SourceError(e) => sink.error(e),
                            };
                            if !delivered {
                                break;
                            }
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        report_disconnect(&sink, &e);
                        break;
                    }
                }
            }
        });

        Self {
            stop,
            handle: Some(handle),
        }
    }

    /// Returns within one poll interval.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for TerminalInput {
    fn drop(&mut self) {
        self.stop();
    }
}

fn report_disconnect(sink: &EventSink, err: &std::io::Error) {
    log::warn!("terminal input failed: {}", err);
    for kind in [SourceKind::Gesture, SourceKind::Voice] {
        sink.error(SourceError::Disconnected { kind });
    }
}
