//! Region statistics derived from the countries registry
//!
//! The derived fields (`countryCount`, `siteCount`, `smpteSite`) are written
//! on every build and never read back from the regions document.

use serde_json::{Number, Value as JsonValue};

use crate::registry::{Entry, Registry, RegistryKind};

/// Statistics for one region
#[derive(Debug, Clone, PartialEq)]
pub struct RegionStats {
    pub country_count: usize,
    pub site_count: f64,
    /// Mean `smpteSite`, rounded to 2 places; `None` when no country matched
    pub smpte_site: Option<f64>,
}

impl RegionStats {
    /// Summarize the countries whose `region` equals `region`
    pub fn compute(region: &str, countries: &[Entry]) -> Self {
        let matching: Vec<&Entry> = countries
            .iter()
            .filter(|c| c.get("region").and_then(JsonValue::as_str) == Some(region))
            .collect();

        let site_count = sum_field(&matching, "siteCount");
        let smpte_sum = sum_field(&matching, "smpteSite");

        let smpte_site = if matching.is_empty() {
            None
        } else {
            Some(round_half_away(smpte_sum / matching.len() as f64, 2))
        };

        Self {
            country_count: matching.len(),
            site_count,
            smpte_site,
        }
    }

    /// Write the statistics into a region entry, replacing stale values
    pub fn apply(&self, entry: &mut Entry) {
        entry.insert("countryCount".to_string(), JsonValue::from(self.country_count));
        entry.insert("siteCount".to_string(), number_value(self.site_count));
        entry.insert(
            "smpteSite".to_string(),
            self.smpte_site.map_or(JsonValue::Null, number_value),
        );
    }
}

/// Enrich every region entry in place and return the regions that matched
/// no country (their `smpteSite` is `null`)
pub fn aggregate_regions(regions: &mut Registry, countries: &Registry) -> Vec<String> {
    debug_assert_eq!(regions.kind, RegistryKind::Regions);

    let mut empty = Vec::new();
    for entry in regions.entries.iter_mut() {
        let Some(region) = entry.get("region").and_then(JsonValue::as_str) else {
            continue;
        };
        let region = region.to_string();
        let stats = RegionStats::compute(&region, &countries.entries);
        if stats.smpte_site.is_none() {
            empty.push(region);
        }
        stats.apply(entry);
    }
    empty
}

fn sum_field(entries: &[&Entry], field: &str) -> f64 {
    entries
        .iter()
        .filter_map(|e| e.get(field).and_then(JsonValue::as_f64))
        .sum()
}

/// Round to `decimals` places, halves away from zero.
///
/// The shift goes through the decimal text so that values like 1.005 round
/// the way they read rather than the way they are stored.
pub fn round_half_away(value: f64, decimals: i32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let shifted = format!("{}e{}", value, decimals)
        .parse::<f64>()
        .unwrap_or(value * 10f64.powi(decimals));
    let rounded = shifted.round();
    format!("{}e{}", rounded, -decimals)
        .parse::<f64>()
        .unwrap_or(rounded / 10f64.powi(decimals))
}

/// JSON number for `value`, using an integer when there is no fraction
pub fn number_value(value: f64) -> JsonValue {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        JsonValue::from(value as i64)
    } else {
        Number::from_f64(value).map_or(JsonValue::Null, JsonValue::Number)
    }
}
