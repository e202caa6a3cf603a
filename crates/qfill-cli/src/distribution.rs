//! Parsing of the `--distribution` flag.

use qfill_model::{Distribution, ResponseType};

/// Parse `positive=70,negative=15,partial=15` into a [`Distribution`].
///
/// Weights are relative, so percentages, fractions and counts all work.
/// Response names accept the same aliases as [`ResponseType`]'s `FromStr`.
pub fn parse_distribution(value: &str) -> Result<Distribution, String> {
    let mut weights = Vec::new();
    for part in value.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (name, weight) = part
            .split_once(['=', ':'])
            .ok_or_else(|| format!("expected TYPE=WEIGHT, got '{part}'"))?;
        let kind: ResponseType = name.parse().map_err(|e| format!("{e}"))?;
        let weight: f64 = weight
            .trim()
            .trim_end_matches('%')
            .parse()
            .map_err(|_| format!("invalid weight '{}' for {kind}", weight.trim()))?;
        weights.push((kind, weight));
    }
    if weights.is_empty() {
        return Err("distribution is empty".to_string());
    }
    Distribution::from_weights(weights).map_err(|e| e.to_string())
}
