use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;

use crate::round::{RoundOutcome, RoundResult};
use crate::util::{mean, std_dev};

/// End-of-session report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub player_wins: u32,
    pub computer_wins: u32,
    pub draws: u32,
    pub valid_rounds: u32,
    pub mean_reaction_secs: f64,
    pub reaction_std_dev: f64,
}

impl fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Game over!\nPlayer wins: {}\nComputer wins: {}\nDraws: {}\nAverage reaction time: {:.2}s",
            self.player_wins, self.computer_wins, self.draws, self.mean_reaction_secs
        )
    }
}

/// Cumulative scores for one session.
#[derive(Debug, Clone)]
pub struct ScoreLedger {
    pub score_player: u32,
    pub score_computer: u32,
    pub score_draws: u32,
    pub valid_rounds: u32,
    pub reaction_times: Vec<f64>,
    history: VecDeque<RoundOutcome>,
    history_len: usize,
}

impl Default for ScoreLedger {
    fn default() -> Self {
        Self::new(3)
    }
}

impl ScoreLedger {
    pub fn new(history_len: usize) -> Self {
        Self {
            score_player: 0,
            score_computer: 0,
            score_draws: 0,
            valid_rounds: 0,
            reaction_times: Vec::new(),
            history: VecDeque::with_capacity(history_len),
            history_len,
        }
    }

    pub fn record(&mut self, outcome: &RoundOutcome) {
        match outcome.result {
            RoundResult::PlayerWin => self.score_player += 1,
            RoundResult::ComputerWin => self.score_computer += 1,
            RoundResult::Draw => self.score_draws += 1,
        }
        if !outcome.result.is_draw() {
            self.valid_rounds += 1;
        }
        self.reaction_times.push(outcome.reaction_time_secs);

        self.history.push_back(outcome.clone());
        while self.history.len() > self.history_len {
            self.history.pop_front();
        }
    }

    /// Most recent outcomes, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &RoundOutcome> {
        self.history.iter()
    }

    pub fn history_lines(&self) -> Vec<String> {
        self.history.iter().map(ToString::to_string).collect()
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            player_wins: self.score_player,
            computer_wins: self.score_computer,
            draws: self.score_draws,
            valid_rounds: self.valid_rounds,
            mean_reaction_secs: mean(&self.reaction_times).unwrap_or(0.0),
            reaction_std_dev: std_dev(&self.reaction_times).unwrap_or(0.0),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.history_len);
    }
}
