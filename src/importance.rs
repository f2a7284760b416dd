use tracing::debug;

use crate::error::{EngineError, Result};
use crate::TARGET_CLUSTERING;

/// Strips textual noise from a raw popularity value (thousands
/// separators, surrounding quote characters, whitespace) and parses it
/// as a number. Returns `None` for values that remain unparseable.
pub fn sanitize_popularity(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| *c != ',' && *c != '"' && *c != '\'')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Min-max rescales raw popularity values into the target range.
///
/// Unparseable entries stay `None` in the output; their presence does
/// not affect the scaling of the rest. If every value is missing, or
/// the present values have zero spread, normalization fails with
/// `DegenerateInput` and the caller decides the fallback.
pub fn normalize(raw_values: &[&str], range: (f64, f64)) -> Result<Vec<Option<f64>>> {
    let parsed: Vec<Option<f64>> = raw_values.iter().map(|raw| sanitize_popularity(raw)).collect();

    let present: Vec<f64> = parsed.iter().filter_map(|v| *v).collect();
    let Some(min) = present.iter().copied().reduce(f64::min) else {
        return Err(EngineError::DegenerateInput(
            "no numeric popularity values to normalize".to_string(),
        ));
    };
    let max = present.iter().copied().fold(min, f64::max);
    if max == min {
        return Err(EngineError::DegenerateInput(format!(
            "popularity values have zero variance (all {min})"
        )));
    }

    let (low, high) = range;
    let span = high - low;
    debug!(
        target: TARGET_CLUSTERING,
        "Normalizing popularity from [{min}, {max}] into [{low}, {high}]"
    );

    Ok(parsed
        .into_iter()
        .map(|value| value.map(|v| low + (v - min) * span / (max - min)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_separators_and_quotes() {
        assert_eq!(sanitize_popularity("\"1,234,567\""), Some(1_234_567.0));
        assert_eq!(sanitize_popularity("  42 "), Some(42.0));
        assert_eq!(sanitize_popularity("n/a"), None);
        assert_eq!(sanitize_popularity(""), None);
    }

    #[test]
    fn normalize_maps_extremes_to_range_bounds() {
        let values = normalize(&["0", "50", "100"], (5.0, 60.0)).unwrap();
        assert_eq!(values[0], Some(5.0));
        assert_eq!(values[1], Some(32.5));
        assert_eq!(values[2], Some(60.0));
    }

    #[test]
    fn normalize_supports_negative_target_ranges() {
        let values = normalize(&["0", "100"], (-10.0, 100.0)).unwrap();
        assert_eq!(values[0], Some(-10.0));
        assert_eq!(values[1], Some(100.0));
    }

    #[test]
    fn normalize_is_monotonic() {
        let values = normalize(&["3", "1", "7", "5"], (5.0, 60.0)).unwrap();
        let unwrapped: Vec<f64> = values.into_iter().map(|v| v.unwrap()).collect();
        assert!(unwrapped[1] < unwrapped[0]);
        assert!(unwrapped[0] < unwrapped[3]);
        assert!(unwrapped[3] < unwrapped[2]);
    }

    #[test]
    fn zero_variance_input_is_degenerate() {
        let err = normalize(&["1", "1", "1"], (5.0, 60.0)).unwrap_err();
        assert!(matches!(err, EngineError::DegenerateInput(_)));
    }

    #[test]
    fn all_missing_input_is_degenerate() {
        let err = normalize(&["", "n/a"], (5.0, 60.0)).unwrap_err();
        assert!(matches!(err, EngineError::DegenerateInput(_)));
    }

    #[test]
    fn missing_values_stay_unset_without_breaking_the_rest() {
        let values = normalize(&["10", "", "20"], (0.0, 1.0)).unwrap();
        assert_eq!(values[0], Some(0.0));
        assert_eq!(values[1], None);
        assert_eq!(values[2], Some(1.0));
    }
}
