//! Session lifecycle: `Waiting -> Playing -> Finished`.
//!
//! [`GameSession`] is a single-writer state machine. Every input, command and
//! timer firing goes through `&mut self` together with the instant it is
//! processed at, so the same code runs under the wall-clock runtime and in
//! tests that step time by hand.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Instant;

use crate::config::GameConfig;
use crate::error::{Result, SourceError};
use crate::input::{GestureEvent, GestureMapper, TranscriptEvent};
use crate::ledger::{ScoreLedger, SessionSummary};
use crate::number::NumberExtractor;
use crate::results_log::ResultsLog;
use crate::round::{RoundController, RoundOutcome, RoundRules, RoundState};
use crate::rules::rules_text;
use crate::timer::{Timer, TimerKind, TimerQueue, TimerTag};

const START_PHRASES: [&str; 2] = ["开始", "15 15"];
const EXIT_PHRASE: &str = "退出游戏";

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Phase {
    Waiting,
    Playing,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Begin,
    Exit,
    RequestRules,
}

/// What the presentation layer gets to see.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// `Begin` accepted; the first round opens after the ready delay.
    SessionStarted { target_valid_rounds: u32 },
    RoundStarted { round: u64 },
    RoundResolved {
        outcome: RoundOutcome,
        standing: SessionSummary,
        /// Summary lines of the most recent rounds, oldest first.
        history: Vec<String>,
    },
    SessionFinished(SessionSummary),
    SourceError(String),
    Rules(String),
}

#[derive(Debug)]
pub struct GameSession<R: Rng = StdRng> {
    config: GameConfig,
    phase: Phase,
    closed: bool,
    epoch: u64,
    controller: RoundController<R>,
    ledger: ScoreLedger,
    timers: TimerQueue,
    extractor: NumberExtractor,
    mapper: GestureMapper,
    results_log: Option<ResultsLog>,
    events: Vec<SessionEvent>,
}

impl GameSession<StdRng> {
    pub fn new(config: GameConfig) -> Result<Self> {
        Self::with_rng(config, StdRng::from_entropy())
    }
}

impl<R: Rng> GameSession<R> {
    pub fn with_rng(config: GameConfig, rng: R) -> Result<Self> {
        config.validate()?;
        let rules = RoundRules::from_config(&config)?;
        Ok(Self {
            phase: Phase::Waiting,
            closed: false,
            epoch: 0,
            controller: RoundController::new(rules, rng),
            ledger: ScoreLedger::new(config.history_len),
            timers: TimerQueue::new(),
            extractor: NumberExtractor::new(config.call_range),
            mapper: GestureMapper::new(config.gesture_confidence),
            results_log: None,
            events: Vec::new(),
            config,
        })
    }

    pub fn with_results_log(mut self, log: ResultsLog) -> Self {
        self.results_log = Some(log);
        self
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// True once `Exit` has been handled; the session never plays again.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn round_state(&self) -> RoundState {
        self.controller.state()
    }

    pub fn ledger(&self) -> &ScoreLedger {
        &self.ledger
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn handle(&mut self, command: Command, now: Instant) {
        match command {
            Command::Begin => self.begin(now),
            Command::Exit => self.exit(),
            Command::RequestRules => self.events.push(SessionEvent::Rules(rules_text(&self.config))),
        }
    }

    /// Starts (or restarts) play with fresh scores.
    pub fn begin(&mut self, now: Instant) {
        if self.closed {
            log::debug!("ignoring begin on a closed session");
            return;
        }
        if self.phase == Phase::Playing {
            log::debug!("ignoring begin while already playing");
            return;
        }

        self.controller.abort(&mut self.timers);
        self.timers.clear();
        self.ledger.reset();
        self.epoch += 1;
        self.phase = Phase::Playing;
        self.timers.arm(
            TimerTag::new(self.epoch, 0),
            TimerKind::Ready,
            now + self.config.ready_delay(),
        );
        log::info!(
            "session {} started, target {} valid rounds",
            self.epoch,
            self.config.target_valid_rounds
        );
        self.events.push(SessionEvent::SessionStarted {
            target_valid_rounds: self.config.target_valid_rounds,
        });
    }

    /// Ends the session from any phase, discarding an unresolved round.
    pub fn exit(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.controller.abort(&mut self.timers);
        self.timers.clear();
        if self.phase != Phase::Finished {
            self.phase = Phase::Finished;
            log::info!("session {} exited", self.epoch);
            self.events
                .push(SessionEvent::SessionFinished(self.ledger.summary()));
        }
    }

    pub fn on_gesture(&mut self, event: &GestureEvent, now: Instant) {
        if self.phase != Phase::Playing {
            log::debug!("dropping gesture {:?} while {}", event.label, self.phase);
            return;
        }
        let Some(value) = self.mapper.map(event) else {
            log::trace!("unrecognized gesture {:?}", event.label);
            return;
        };
        if let Some(outcome) = self.controller.on_gesture(value, now, &mut self.timers) {
            self.record(outcome, now);
        }
    }

    pub fn on_transcript(&mut self, event: &TranscriptEvent, now: Instant) {
        if self.config.voice_commands && self.voice_command(&event.text, now) {
            return;
        }
        if self.phase != Phase::Playing {
            log::debug!("dropping transcript {:?} while {}", event.text, self.phase);
            return;
        }
        let Some(call) = self.extractor.extract(&event.text) else {
            log::trace!("no call in transcript {:?}", event.text);
            return;
        };
        if let Some(outcome) = self.controller.on_call(call, now, &mut self.timers) {
            self.record(outcome, now);
        }
    }

    pub fn on_source_error(&mut self, error: &SourceError) {
        log::warn!("{}", error);
        self.events.push(SessionEvent::SourceError(error.to_string()));
    }

    /// Fires every timer due at `now`. Returns how many fired.
    pub fn advance(&mut self, now: Instant) -> usize {
        let mut fired = 0;
        while let Some(timer) = self.timers.pop_due(now) {
            fired += 1;
            // each timer is handled at its own deadline, not at the poll instant
            self.on_timer(timer, timer.due);
        }
        fired
    }

    fn voice_command(&mut self, text: &str, now: Instant) -> bool {
        if text.contains(EXIT_PHRASE) {
            self.exit();
            return true;
        }
        let can_begin = !self.closed && self.phase != Phase::Playing;
        if can_begin && START_PHRASES.iter().any(|p| text.contains(p)) {
            self.begin(now);
            return true;
        }
        false
    }

    fn on_timer(&mut self, timer: Timer, now: Instant) {
        if timer.tag.epoch != self.epoch || self.phase != Phase::Playing {
            log::debug!("stale {} timer for {:?}", timer.kind, timer.tag);
            return;
        }
        let outcome = match timer.kind {
            TimerKind::Ready => {
                self.start_round(now);
                None
            }
            TimerKind::Timeout => self.controller.on_timeout(timer.tag, now, &mut self.timers),
            TimerKind::Stillness => self.controller.on_stillness(timer.tag, now, &mut self.timers),
            TimerKind::Pause => {
                if self.ledger.valid_rounds >= self.config.target_valid_rounds {
                    self.finish();
                } else {
                    self.start_round(now);
                }
                None
            }
        };
        if let Some(outcome) = outcome {
            self.record(outcome, now);
        }
    }

    fn start_round(&mut self, now: Instant) {
        let tag = self.controller.start_round(self.epoch, now, &mut self.timers);
        self.events
            .push(SessionEvent::RoundStarted { round: tag.round });
    }

    fn record(&mut self, outcome: RoundOutcome, now: Instant) {
        self.ledger.record(&outcome);
        self.timers.arm(
            TimerTag::new(self.epoch, outcome.round),
            TimerKind::Pause,
            now + self.config.result_pause(),
        );
        self.events.push(SessionEvent::RoundResolved {
            outcome,
            standing: self.ledger.summary(),
            history: self.ledger.history_lines(),
        });
    }

    fn finish(&mut self) {
        self.phase = Phase::Finished;
        self.controller.abort(&mut self.timers);
        self.timers.clear();

        let summary = self.ledger.summary();
        log::info!(
            "session {} finished: {} - {} ({} draws)",
            self.epoch,
            summary.player_wins,
            summary.computer_wins,
            summary.draws
        );
        if let Some(results) = &self.results_log {
            if let Err(e) = results.append(&summary, self.config.target_valid_rounds) {
                log::warn!("could not record results: {}", e);
            }
        }
        self.events.push(SessionEvent::SessionFinished(summary));
    }
}
