//! Round resolution and input fusion.
//!
//! A [`RoundController`] owns the one live round. Gesture and call values
//! arrive through [`RoundController::on_gesture`] and
//! [`RoundController::on_call`] in any order; the round timeout fills
//! whatever is still missing. Resolution is gated twice: it never runs before
//! the stillness window has elapsed (an early attempt is re-armed for the end
//! of the window), and the `AwaitingInput -> Resolving` transition happens
//! at most once per round so late events, the timeout and the stillness timer
//! cannot score a round twice.

use rand::Rng;
use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};

use crate::config::GameConfig;
use crate::error::{GameError, Result};
use crate::timer::{TimerKind, TimerQueue, TimerTag};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum RoundState {
    Idle,
    AwaitingInput,
    Resolving,
    Resolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum_macros::Display)]
pub enum RoundResult {
    PlayerWin,
    ComputerWin,
    Draw,
}

impl RoundResult {
    /// Equal calls always draw, even when both match the total.
    pub fn judge(player_call: u32, computer_call: u32, total: u32) -> Self {
        if player_call == computer_call {
            RoundResult::Draw
        } else if player_call == total {
            RoundResult::PlayerWin
        } else if computer_call == total {
            RoundResult::ComputerWin
        } else {
            RoundResult::Draw
        }
    }

    pub fn is_draw(&self) -> bool {
        *self == RoundResult::Draw
    }
}

/// Non-empty set of values a side may play.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Domain(Vec<u32>);

impl Domain {
    pub fn new(values: Vec<u32>) -> Option<Self> {
        if values.is_empty() {
            None
        } else {
            Some(Self(values))
        }
    }

    pub fn contains(&self, value: u32) -> bool {
        self.0.contains(&value)
    }

    pub fn values(&self) -> &[u32] {
        &self.0
    }

    /// Uniform draw.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        self.0[rng.gen_range(0..self.0.len())]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoundRules {
    pub gesture_domain: Domain,
    pub call_domain: Domain,
    pub stillness: Duration,
    pub timeout: Duration,
}

impl RoundRules {
    pub fn from_config(config: &GameConfig) -> Result<Self> {
        let gesture_domain = Domain::new(config.gesture_domain.clone())
            .ok_or_else(|| GameError::Config("gesture_domain must not be empty".into()))?;
        let call_domain = Domain::new(config.call_domain.clone())
            .ok_or_else(|| GameError::Config("call_domain must not be empty".into()))?;
        Ok(Self {
            gesture_domain,
            call_domain,
            stillness: config.stillness(),
            timeout: config.round_timeout(),
        })
    }
}

/// Inputs collected for the live round. Each channel latches its first value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundInput {
    pub gesture: Option<u32>,
    pub call: Option<u32>,
    pub round_start: Instant,
}

impl RoundInput {
    fn new(round_start: Instant) -> Self {
        Self {
            gesture: None,
            call: None,
            round_start,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.gesture.is_some() && self.call.is_some()
    }
}

/// Which player inputs were substituted when the round timed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct AutoFill {
    pub gesture: bool,
    pub call: bool,
}

impl AutoFill {
    pub fn any(&self) -> bool {
        self.gesture || self.call
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundOutcome {
    pub round: u64,
    pub player_gesture: u32,
    pub player_call: u32,
    pub computer_gesture: u32,
    pub computer_call: u32,
    pub total: u32,
    pub result: RoundResult,
    pub reaction_time_secs: f64,
    pub auto_filled: AutoFill,
}

impl fmt::Display for RoundOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "player: gesture[{}], call[{}] | computer: gesture[{}], call[{}] | total: {} | result: {}",
            self.player_gesture,
            self.player_call,
            self.computer_gesture,
            self.computer_call,
            self.total,
            self.result
        )
    }
}

#[derive(Debug)]
pub struct RoundController<R: Rng> {
    state: RoundState,
    input: Option<RoundInput>,
    auto_filled: AutoFill,
    tag: TimerTag,
    rules: RoundRules,
    rng: R,
}

impl<R: Rng> RoundController<R> {
    pub fn new(rules: RoundRules, rng: R) -> Self {
        Self {
            state: RoundState::Idle,
            input: None,
            auto_filled: AutoFill::default(),
            tag: TimerTag::default(),
            rules,
            rng,
        }
    }

    pub fn state(&self) -> RoundState {
        self.state
    }

    pub fn input(&self) -> Option<&RoundInput> {
        self.input.as_ref()
    }

    /// Tag of the most recently started round.
    pub fn tag(&self) -> TimerTag {
        self.tag
    }

    pub fn rules(&self) -> &RoundRules {
        &self.rules
    }

    /// Opens a new round for session `epoch` and arms its timeout.
    pub fn start_round(&mut self, epoch: u64, now: Instant, timers: &mut TimerQueue) -> TimerTag {
        if self.state == RoundState::AwaitingInput {
            log::warn!("abandoning unresolved round {}", self.tag.round);
            timers.disarm(self.tag);
        }

        self.tag = TimerTag::new(epoch, self.tag.round + 1);
        self.input = Some(RoundInput::new(now));
        self.auto_filled = AutoFill::default();
        self.state = RoundState::AwaitingInput;
        timers.arm(self.tag, TimerKind::Timeout, now + self.rules.timeout);
        log::info!("round {} awaiting input", self.tag.round);
        self.tag
    }

    /// Drops the live round without resolving it.
    pub fn abort(&mut self, timers: &mut TimerQueue) {
        if self.state == RoundState::AwaitingInput {
            log::info!("round {} discarded", self.tag.round);
        }
        timers.disarm(self.tag);
        self.input = None;
        self.state = RoundState::Idle;
    }

    pub fn on_gesture(
        &mut self,
        value: u32,
        now: Instant,
        timers: &mut TimerQueue,
    ) -> Option<RoundOutcome> {
        if !self.rules.gesture_domain.contains(value) {
            log::debug!("ignoring gesture value {} outside the domain", value);
            return None;
        }
        let round = self.tag.round;
        let input = self.open_input("gesture")?;
        if input.gesture.is_some() {
            log::trace!("gesture already latched for round {}", round);
            return None;
        }
        input.gesture = Some(value);
        self.try_resolve(now, timers)
    }

    pub fn on_call(
        &mut self,
        value: u32,
        now: Instant,
        timers: &mut TimerQueue,
    ) -> Option<RoundOutcome> {
        let round = self.tag.round;
        let input = self.open_input("call")?;
        if input.call.is_some() {
            log::trace!("call already latched for round {}", round);
            return None;
        }
        input.call = Some(value);
        self.try_resolve(now, timers)
    }

    /// Round timeout: fills missing inputs by uniform draw and resolves.
    pub fn on_timeout(
        &mut self,
        tag: TimerTag,
        now: Instant,
        timers: &mut TimerQueue,
    ) -> Option<RoundOutcome> {
        if !self.is_live(tag) {
            log::debug!("stale timeout for round {}", tag.round);
            return None;
        }
        let gesture_domain = &self.rules.gesture_domain;
        let call_domain = &self.rules.call_domain;
        let input = self.input.as_mut()?;
        if input.gesture.is_none() {
            input.gesture = Some(gesture_domain.draw(&mut self.rng));
            self.auto_filled.gesture = true;
        }
        if input.call.is_none() {
            input.call = Some(call_domain.draw(&mut self.rng));
            self.auto_filled.call = true;
        }
        log::info!(
            "round {} timed out, auto-filled gesture={} call={}",
            tag.round,
            self.auto_filled.gesture,
            self.auto_filled.call
        );
        self.try_resolve(now, timers)
    }

    /// Deferred resolution armed by an attempt inside the stillness window.
    pub fn on_stillness(
        &mut self,
        tag: TimerTag,
        now: Instant,
        timers: &mut TimerQueue,
    ) -> Option<RoundOutcome> {
        if !self.is_live(tag) {
            log::debug!("stale stillness timer for round {}", tag.round);
            return None;
        }
        self.try_resolve(now, timers)
    }

    fn is_live(&self, tag: TimerTag) -> bool {
        self.state == RoundState::AwaitingInput && tag == self.tag
    }

    fn open_input(&mut self, channel: &str) -> Option<&mut RoundInput> {
        if self.state != RoundState::AwaitingInput {
            log::debug!("dropping {} event while {}", channel, self.state);
            return None;
        }
        self.input.as_mut()
    }

    fn try_resolve(&mut self, now: Instant, timers: &mut TimerQueue) -> Option<RoundOutcome> {
        if self.state != RoundState::AwaitingInput {
            return None;
        }
        let input = self.input?;
        let (player_gesture, player_call) = match (input.gesture, input.call) {
            (Some(g), Some(c)) => (g, c),
            _ => return None,
        };

        let ready_at = input.round_start + self.rules.stillness;
        if now < ready_at {
            if !timers.is_armed(self.tag, TimerKind::Stillness) {
                timers.arm(self.tag, TimerKind::Stillness, ready_at);
            }
            return None;
        }

        self.state = RoundState::Resolving;
        timers.disarm(self.tag);

        let computer_gesture = self.rules.gesture_domain.draw(&mut self.rng);
        let computer_call = self.rules.call_domain.draw(&mut self.rng);
        let total = player_gesture.saturating_add(computer_gesture);
        let outcome = RoundOutcome {
            round: self.tag.round,
            player_gesture,
            player_call,
            computer_gesture,
            computer_call,
            total,
            result: RoundResult::judge(player_call, computer_call, total),
            reaction_time_secs: now.duration_since(input.round_start).as_secs_f64(),
            auto_filled: self.auto_filled,
        };

        self.state = RoundState::Resolved;
        log::info!("round {} resolved: {}", self.tag.round, outcome);
        self.input = None;
        self.state = RoundState::Idle;
        Some(outcome)
    }
}
