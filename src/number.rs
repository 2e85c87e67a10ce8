//! Spoken-call extraction.
//!
//! Maps recognizer text to a single call value using a fixed table of digit
//! words. Only the first digit-like character is considered; if its value
//! falls outside the configured range the utterance carries no call.

use crate::config::CallRange;

/// Glyph rewrites applied before lookup.
const ALIASES: [(char, char); 2] = [('零', '0'), ('两', '二')];

fn digit_value(c: char) -> Option<u32> {
    let value = match c {
        '0'..='9' => c.to_digit(10)?,
        '一' => 1,
        '二' => 2,
        '三' => 3,
        '四' => 4,
        '五' => 5,
        '六' => 6,
        '七' => 7,
        '八' => 8,
        '九' => 9,
        '十' => 10,
        '百' => 100,
        '千' => 1000,
        '万' => 10000,
        _ => return None,
    };
    Some(value)
}

fn normalize(c: char) -> char {
    ALIASES
        .iter()
        .find(|(from, _)| *from == c)
        .map_or(c, |(_, to)| *to)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NumberExtractor {
    range: CallRange,
}

impl NumberExtractor {
    pub fn new(range: CallRange) -> Self {
        Self { range }
    }

    pub fn range(&self) -> CallRange {
        self.range
    }

    /// Returns the call carried by `text`, or `None` when there is no
    /// digit word or the first one is out of range.
    pub fn extract(&self, text: &str) -> Option<u32> {
        text.chars()
            .map(normalize)
            .find_map(digit_value)
            .filter(|value| self.range.contains(*value))
    }
}
