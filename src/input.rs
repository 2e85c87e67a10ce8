//! Contracts with the external gesture and voice collaborators.
//!
//! Recognition itself happens elsewhere; a source only has to push
//! [`GestureEvent`]s and [`TranscriptEvent`]s into an [`EventSink`] from
//! whatever thread it runs on.

use std::sync::mpsc::Sender;
use std::thread;
use std::time::Duration;

use crate::error::SourceError;
use crate::runtime::GameEvent;
use crate::session::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum SourceKind {
    #[strum(serialize = "gesture")]
    Gesture,
    #[strum(serialize = "voice")]
    Voice,
}

/// A classifier label with its score.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureEvent {
    pub label: String,
    pub confidence: f32,
}

impl GestureEvent {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEvent {
    pub text: String,
}

impl TranscriptEvent {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Maps classifier labels onto gesture values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureMapper {
    min_confidence: f32,
}

impl Default for GestureMapper {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl GestureMapper {
    pub const FIST: u32 = 0;
    pub const PALM: u32 = 5;
    /// Every value [`GestureMapper::map`] can produce.
    pub const VALUES: [u32; 2] = [Self::FIST, Self::PALM];

    pub fn new(min_confidence: f32) -> Self {
        Self { min_confidence }
    }

    /// Fist is 0, open palm is 5; anything else, or a low score, is no gesture.
    pub fn map(&self, event: &GestureEvent) -> Option<u32> {
        if event.confidence < self.min_confidence {
            return None;
        }
        match event.label.as_str() {
            "Closed_Fist" | "Fist" => Some(Self::FIST),
            "Open_Palm" | "Palm" => Some(Self::PALM),
            _ => None,
        }
    }
}

/// Drops blank transcripts and repeats of the previous one.
///
/// Streaming recognizers re-emit their running hypothesis on every chunk;
/// only a change carries new information.
#[derive(Debug, Clone, Default)]
pub struct TranscriptFilter {
    last: Option<String>,
}

impl TranscriptFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accept(&mut self, text: &str) -> Option<TranscriptEvent> {
        let text = text.trim();
        if text.is_empty() || self.last.as_deref() == Some(text) {
            return None;
        }
        self.last = Some(text.to_string());
        Some(TranscriptEvent::new(text))
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// Producer handle into the runtime's event queue.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: Sender<GameEvent>,
}

impl EventSink {
    pub fn new(tx: Sender<GameEvent>) -> Self {
        Self { tx }
    }

    /// Each send returns `false` once the runtime has gone away.
    pub fn gesture(&self, event: GestureEvent) -> bool {
        self.send(GameEvent::Gesture(event))
    }

    pub fn transcript(&self, event: TranscriptEvent) -> bool {
        self.send(GameEvent::Transcript(event))
    }

    pub fn command(&self, command: Command) -> bool {
        self.send(GameEvent::Command(command))
    }

    pub fn error(&self, error: SourceError) -> bool {
        self.send(GameEvent::SourceError(error))
    }

    fn send(&self, event: GameEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

pub trait GestureSource: Send {
    fn start(&mut self, sink: EventSink) -> Result<(), SourceError>;
    /// Must return within a bounded time.
    fn stop(&mut self);
}

pub trait VoiceSource: Send {
    fn start(&mut self, sink: EventSink) -> Result<(), SourceError>;
    fn stop(&mut self);
}

/// Calls `start` up to `attempts` times, pausing `backoff` between tries.
pub fn start_with_retry<F>(
    kind: SourceKind,
    attempts: u32,
    backoff: Duration,
    mut start: F,
) -> Result<(), SourceError>
where
    F: FnMut() -> Result<(), SourceError>,
{
    let mut last_reason = String::from("no start attempted");
    for attempt in 1..=attempts {
        match start() {
            Ok(()) => return Ok(()),
            Err(e) => {
                log::warn!(
                    "{} source failed to start (attempt {}/{}): {}",
                    kind,
                    attempt,
                    attempts,
                    e
                );
                last_reason = e.to_string();
                if attempt < attempts {
                    thread::sleep(backoff);
                }
            }
        }
    }
    Err(SourceError::Unavailable {
        kind,
        reason: last_reason,
    })
}
