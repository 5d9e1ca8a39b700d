// Conversion between win probability (percent) and fractional odds.

/// Returned by [`probability_to_odds`] when no usable odds exist.
pub const NO_ODDS: &str = "N/A";

/// Scale between a unit fraction and a percentage.
pub const PERCENT_SCALE: f64 = 100.0;

/// Convert a win probability in percent to fractional odds.
///
/// Probabilities at or above 50% use the odds-on form `1/D`; below 50% the
/// odds-against form `N/1`. Both round half away from zero. Anything outside
/// the open interval (0, 100) yields [`NO_ODDS`].
pub fn probability_to_odds(probability: f64) -> String {
    if !(probability > 0.0 && probability < PERCENT_SCALE) {
        return NO_ODDS.to_string();
    }
    let profit = PERCENT_SCALE / probability - 1.0;
    if probability >= 50.0 {
        format!("1/{}", (1.0 / profit).round() as u64)
    } else {
        format!("{}/1", profit.round() as u64)
    }
}

/// Convert fractional odds `"N/D"` to a win probability in percent.
///
/// Returns 0.0 for [`NO_ODDS`], for strings without both a numerator and a
/// denominator, and for zero, negative or non-numeric parts.
pub fn odds_to_probability(odds: &str) -> f64 {
    let odds = odds.trim();
    if odds == NO_ODDS {
        return 0.0;
    }
    let mut parts = odds.split('/');
    let (Some(numerator), Some(denominator)) = (parse_part(parts.next()), parse_part(parts.next()))
    else {
        return 0.0;
    };
    let decimal = numerator / denominator + 1.0;
    PERCENT_SCALE / decimal
}

fn parse_part(part: Option<&str>) -> Option<f64> {
    let value: f64 = part?.trim().parse().ok()?;
    (value.is_finite() && value > 0.0).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    #[test]
    fn odds_against_below_fifty() {
        assert_eq!(probability_to_odds(20.0), "4/1");
        assert_eq!(probability_to_odds(25.0), "3/1");
        assert_eq!(probability_to_odds(1.0), "99/1");
    }

    #[test]
    fn odds_on_from_fifty() {
        assert_eq!(probability_to_odds(50.0), "1/1");
        assert_eq!(probability_to_odds(75.0), "1/3");
        assert_eq!(probability_to_odds(80.0), "1/4");
    }

    #[test]
    fn rounding_is_half_away_from_zero() {
        // 100/40 - 1 = 1.5
        assert_eq!(probability_to_odds(40.0), "2/1");
    }

    #[test]
    fn odds_on_half_boundary_follows_float_result() {
        // 1 / (100/60 - 1) evaluates to 1.4999999999999998, not 1.5.
        assert!(1.0 / (100.0 / 60.0 - 1.0) < 1.5);
        assert_eq!(probability_to_odds(60.0), "1/1");
    }

    #[test]
    fn boundaries_yield_sentinel() {
        assert_eq!(probability_to_odds(0.0), NO_ODDS);
        assert_eq!(probability_to_odds(100.0), NO_ODDS);
        assert_eq!(probability_to_odds(-5.0), NO_ODDS);
        assert_eq!(probability_to_odds(130.0), NO_ODDS);
        assert_eq!(probability_to_odds(f64::NAN), NO_ODDS);
    }

    #[test]
    fn parses_fractional_odds() {
        assert!(approx_eq(odds_to_probability("1/1"), 50.0, 1e-9));
        assert!(approx_eq(odds_to_probability("4/1"), 20.0, 1e-9));
        assert!(approx_eq(odds_to_probability("1/3"), 75.0, 1e-9));
        assert!(approx_eq(odds_to_probability("5/2"), 100.0 / 3.5, 1e-9));
        assert!(approx_eq(odds_to_probability(" 2 / 1 "), 100.0 / 3.0, 1e-9));
    }

    #[test]
    fn malformed_odds_degrade_to_zero() {
        assert_eq!(odds_to_probability(NO_ODDS), 0.0);
        assert_eq!(odds_to_probability("bad-string"), 0.0);
        assert_eq!(odds_to_probability(""), 0.0);
        assert_eq!(odds_to_probability("5"), 0.0);
        assert_eq!(odds_to_probability("0/1"), 0.0);
        assert_eq!(odds_to_probability("3/0"), 0.0);
        assert_eq!(odds_to_probability("a/b"), 0.0);
    }

    #[test]
    fn round_trip_stays_near_input() {
        for p in [20.0, 25.0, 50.0, 75.0, 80.0, 90.0] {
            let back = odds_to_probability(&probability_to_odds(p));
            assert!(approx_eq(back, p, 1e-9), "p={p} came back as {back}");
        }
        // Integer rounding of N/D makes other values lossy but close.
        for p in [5.0, 12.5, 33.0, 45.0, 55.0, 66.0, 95.0] {
            let back = odds_to_probability(&probability_to_odds(p));
            assert!(approx_eq(back, p, 10.0), "p={p} came back as {back}");
        }
    }
}
