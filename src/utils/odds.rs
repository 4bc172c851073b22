/// Fixed-vig wagering assumption used for ROI: stake 110 to win 100.
pub const VIG_STAKE: f64 = 110.0;
/// Total returned on a won fixed-vig bet (stake back plus winnings).
pub const VIG_RETURN: f64 = 210.0;

/// Convert American odds to implied probability.
/// Positive odds (+150) mean you win $150 on a $100 bet.
/// Negative odds (-150) mean you need to bet $150 to win $100.
pub fn american_to_probability(odds: i32) -> f64 {
    if odds > 0 {
        100.0 / (odds as f64 + 100.0)
    } else {
        let abs_odds = odds.abs() as f64;
        abs_odds / (abs_odds + 100.0)
    }
}

/// Convert a win probability to American odds. Probabilities are clamped
/// away from 0 and 1 so a lopsided projection still yields a finite price.
pub fn probability_to_american(prob: f64) -> i32 {
    let prob = prob.clamp(0.001, 0.999);
    if prob >= 0.5 {
        // Favorite (negative odds)
        -((prob / (1.0 - prob)) * 100.0).round() as i32
    } else {
        // Underdog (positive odds)
        (((1.0 - prob) / prob) * 100.0).round() as i32
    }
}

/// Pythagorean expectation: win probability for the away side given
/// projected points for each side.
pub fn pythagorean_win_pct(away_points: f64, home_points: f64, exponent: f64) -> f64 {
    let away = away_points.powf(exponent);
    let home = home_points.powf(exponent);
    away / (away + home)
}

/// Return on investment over a set of decided fixed-vig bets, as a
/// percentage of total staked. Zero decided bets is 0%, not a division
/// error.
pub fn fixed_vig_roi(wins: u32, losses: u32) -> f64 {
    let decided = (wins + losses) as f64;
    if decided == 0.0 {
        return 0.0;
    }
    let staked = decided * VIG_STAKE;
    let returned = wins as f64 * VIG_RETURN;
    100.0 * (returned - staked) / staked
}

/// Round to one decimal place, matching the precision stored in results
/// files.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
