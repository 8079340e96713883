//! Report patterns for each metric field.
//!
//! One rule per field: a regex whose first capture group holds the value, and
//! the conversion into the record's unit. Patterns target OpenROAD/OpenLane
//! style reports (yosys `stat`, `report_power`, `report_worst_slack`, magic
//! DRC summaries).

use super::types::{MetricField, MetricsRecord};
use once_cell::sync::Lazy;
use regex::Regex;

/// Extraction rule for a single metric field.
pub struct MetricRule {
    pub field: MetricField,
    pub pattern: Regex,
}

/// Why a rule did not resolve its field.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleMiss {
    /// The pattern does not occur in the text.
    NoMatch,
    /// The pattern matched but the capture is not a valid number.
    Unparseable(String),
}

impl MetricRule {
    fn new(field: MetricField, pattern: &str) -> Self {
        Self {
            field,
            pattern: Regex::new(pattern).expect("metric pattern must compile"),
        }
    }

    /// Look for the field in `text` and store it in `record` on success.
    pub fn apply(&self, text: &str, record: &mut MetricsRecord) -> Result<(), RuleMiss> {
        let captured = self
            .pattern
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .ok_or(RuleMiss::NoMatch)?;

        let unparseable = || RuleMiss::Unparseable(captured.to_string());
        match self.field {
            MetricField::AreaMm2 => {
                record.area_mm2 = captured.parse().map_err(|_| unparseable())?;
            }
            MetricField::PowerMw => {
                // Reports give watts.
                let watts: f64 = captured.parse().map_err(|_| unparseable())?;
                record.power_mw = watts * 1000.0;
            }
            MetricField::SlackNs => {
                record.slack_ns = captured.parse().map_err(|_| unparseable())?;
            }
            MetricField::DrcViolations => {
                record.drc_violations = captured.parse().map_err(|_| unparseable())?;
            }
        }
        Ok(())
    }
}

/// Rules in field order.
pub static METRIC_RULES: Lazy<Vec<MetricRule>> = Lazy::new(|| {
    vec![
        MetricRule::new(MetricField::AreaMm2, r"Chip area for module.*:\s*([\d\.]+)"),
        MetricRule::new(MetricField::PowerMw, r"Total Power\s*=\s*([\d\.e\-]+)\s*W"),
        MetricRule::new(MetricField::SlackNs, r"worst slack\s*([\d\.\-]+)"),
        MetricRule::new(MetricField::DrcViolations, r"violation count\s*(\d+)"),
    ]
});
