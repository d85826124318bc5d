//! Odds of each rarity tier for a uniformly random digest

use amulet_crypto::DIGEST_HEX_LEN;

use crate::rarity::{Rarity, MAX_RUN};

/// Probability that a random digest of `DIGEST_HEX_LEN` hex digits
/// contains a run of at least `run` copies of one given digit.
pub fn run_probability(run: usize) -> f64 {
    if run == 0 {
        return 1.0;
    }
    if run > DIGEST_HEX_LEN {
        return 0.0;
    }

    let p = 1.0 / 16.0;
    // state[r] = probability of ending with a trailing run of r, having never reached `run`
    let mut state = vec![0.0f64; run];
    state[0] = 1.0;
    for _ in 0..DIGEST_HEX_LEN {
        let mut next = vec![0.0f64; run];
        for (r, &prob) in state.iter().enumerate() {
            next[0] += prob * (1.0 - p);
            if r + 1 < run {
                next[r + 1] += prob * p;
            }
        }
        state = next;
    }
    1.0 - state.iter().sum::<f64>()
}

/// Probability that a random digest lands exactly in `tier`
pub fn tier_probability(tier: Rarity) -> f64 {
    match tier.run_length() {
        Some(MAX_RUN) => run_probability(MAX_RUN),
        Some(len) => run_probability(len) - run_probability(len + 1),
        None => 1.0 - run_probability(crate::rarity::MIN_RUN),
    }
}

/// Expected attempts per hit of `tier` (infinite when unreachable)
pub fn expected_attempts(tier: Rarity) -> f64 {
    let p = tier_probability(tier);
    if p > 0.0 {
        1.0 / p
    } else {
        f64::INFINITY
    }
}

/// Format an attempt count as human-readable string
pub fn format_attempts(attempts: f64) -> String {
    if !attempts.is_finite() {
        "Infinity".to_string()
    } else if attempts >= 1e15 {
        format!("{:.2}P", attempts / 1e15)
    } else if attempts >= 1e12 {
        format!("{:.2}T", attempts / 1e12)
    } else if attempts >= 1e9 {
        format!("{:.2}G", attempts / 1e9)
    } else if attempts >= 1e6 {
        format!("{:.2}M", attempts / 1e6)
    } else if attempts >= 1e3 {
        format!("{:.2}K", attempts / 1e3)
    } else {
        format!("{:.0}", attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rarity::MIN_RUN;

    #[test]
    fn test_single_digit_probability() {
        // 1 - (15/16)^64
        let expected = 1.0 - (15.0f64 / 16.0).powi(64);
        assert!((run_probability(1) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_probabilities_shrink_with_run_length() {
        for run in MIN_RUN..MAX_RUN {
            assert!(run_probability(run) > run_probability(run + 1));
        }
        assert_eq!(run_probability(65), 0.0);
    }

    #[test]
    fn test_gate_odds_are_roughly_one_in_eleven_hundred() {
        let attempts = 1.0 / run_probability(MIN_RUN);
        assert!(attempts > 1_000.0 && attempts < 1_200.0, "{attempts}");
    }

    #[test]
    fn test_tier_probabilities_sum_to_one() {
        let total: f64 = Rarity::REPORTABLE
            .iter()
            .map(|t| tier_probability(*t))
            .sum::<f64>()
            + tier_probability(Rarity::NotAnAmulet);
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_expected_attempts_increase_with_rarity() {
        let attempts: Vec<f64> = Rarity::REPORTABLE.iter().map(|t| expected_attempts(*t)).collect();
        assert!(attempts.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_format_attempts() {
        assert_eq!(format_attempts(1000.0), "1.00K");
        assert_eq!(format_attempts(1500000.0), "1.50M");
        assert_eq!(format_attempts(1e12), "1.00T");
        assert_eq!(format_attempts(f64::INFINITY), "Infinity");
    }
}
