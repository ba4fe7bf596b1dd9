//! Utility functions for the matchmaking service

use chrono::{DateTime, Utc};

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Calculate the absolute difference between two ratings
pub fn rating_difference(rating1: f64, rating2: f64) -> f64 {
    (rating1 - rating2).abs()
}

/// Distance of a predicted win probability from the desired target
pub fn probability_deviation(probability: f64, target: f64) -> f64 {
    (probability - target).abs()
}

/// Check if a deviation is inside the accepted band
pub fn within_tolerance(deviation: f64, tolerance: f64) -> bool {
    deviation <= tolerance
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_difference() {
        assert_eq!(rating_difference(1500.0, 1400.0), 100.0);
        assert_eq!(rating_difference(1400.0, 1500.0), 100.0);
        assert_eq!(rating_difference(1500.0, 1500.0), 0.0);
    }

    #[test]
    fn test_probability_deviation() {
        assert!((probability_deviation(0.52, 0.5) - 0.02).abs() < 1e-12);
        assert!((probability_deviation(0.3, 0.5) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_within_tolerance() {
        assert!(within_tolerance(0.05, 0.1));
        assert!(within_tolerance(0.0, 0.0));
        assert!(!within_tolerance(0.2, 0.1));
    }
}
