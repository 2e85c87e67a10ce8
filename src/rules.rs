use itertools::Itertools;

use crate::config::GameConfig;

/// Rules as shown to the player, with the configured numbers filled in.
pub fn rules_text(config: &GameConfig) -> String {
    let calls = config.call_domain.iter().join(" or ");
    [
        "Fifteen-Twenty rules:".to_string(),
        format!(
            "1. You play the computer until {} decisive rounds have been played; draws do not count.",
            config.target_valid_rounds
        ),
        "2. Show a gesture and call a number, in any order.".to_string(),
        "   - Gesture: a closed fist is 0, an open palm is 5.".to_string(),
        format!("   - Call: say a number (e.g. {}) as your guess of the total.", calls),
        format!(
            "3. Each round lasts at most {} second(s); hold still for {} second(s) before playing.",
            config.round_timeout().as_secs_f64(),
            config.stillness().as_secs_f64()
        ),
        "   Anything missing when time runs out is picked at random.".to_string(),
        "4. You win if your call equals both gestures added together and differs from the computer's call;"
            .to_string(),
        "   the computer wins the same way; everything else is a draw.".to_string(),
        "5. A report is shown at the end, and you can play again or exit.".to_string(),
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rules_mention_configured_numbers() {
        let text = rules_text(&GameConfig::default());
        assert!(text.contains("until 5 decisive rounds"));
        assert!(text.contains("15 or 20"));
        assert!(text.contains("at most 15 second(s)"));
        assert!(text.contains("hold still for 1 second(s)"));
    }

    #[test]
    fn rules_follow_config() {
        let cfg = GameConfig {
            target_valid_rounds: 3,
            call_domain: vec![0, 5, 10],
            ..GameConfig::default()
        };
        let text = rules_text(&cfg);
        assert!(text.contains("until 3 decisive rounds"));
        assert!(text.contains("0 or 5 or 10"));
    }

    #[test]
    fn fractional_seconds_are_not_truncated() {
        let cfg = GameConfig {
            round_timeout_ms: 1500,
            stillness_ms: 250,
            ..GameConfig::default()
        };
        let text = rules_text(&cfg);
        assert!(text.contains("at most 1.5 second(s)"));
        assert!(text.contains("hold still for 0.25 second(s)"));
    }
}
