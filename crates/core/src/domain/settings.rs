use crate::time::clock::hours_between;
use anyhow::ensure;
use serde::{Deserialize, Serialize};

pub const DEFAULT_FREQUENCY_HOURS: f64 = 3.0;

pub const DEFAULT_TOPICS: [&str; 4] = [
    "Forex Major Pairs",
    "Gold (XAUUSD)",
    "Bitcoin & Ethereum",
    "Stock Market Open",
];

/// Singleton configuration for automated publishing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoBlogSettings {
    pub is_enabled: bool,
    pub frequency_hours: f64,
    /// Epoch milliseconds of the last successful automated run; 0 = never.
    pub last_run: i64,
    pub topics: Vec<String>,
}

impl Default for AutoBlogSettings {
    fn default() -> Self {
        Self {
            is_enabled: false,
            frequency_hours: DEFAULT_FREQUENCY_HOURS,
            last_run: 0,
            topics: DEFAULT_TOPICS.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl AutoBlogSettings {
    pub fn hours_since_last_run(&self, now_millis: i64) -> f64 {
        hours_between(self.last_run, now_millis)
    }

    pub fn is_due(&self, now_millis: i64) -> bool {
        self.hours_since_last_run(now_millis) >= self.frequency_hours
    }

    pub fn toggled(&self) -> Self {
        Self {
            is_enabled: !self.is_enabled,
            ..self.clone()
        }
    }

    /// Appends a topic. Returns `false` when it is already present.
    pub fn add_topic(&mut self, topic: &str) -> anyhow::Result<bool> {
        let topic = topic.trim();
        ensure!(!topic.is_empty(), "topic must be non-empty");
        if self.topics.iter().any(|t| t == topic) {
            return Ok(false);
        }
        self.topics.push(topic.to_string());
        Ok(true)
    }

    pub fn set_frequency_hours(&mut self, hours: f64) -> anyhow::Result<()> {
        validate_frequency_hours(hours)?;
        self.frequency_hours = hours;
        Ok(())
    }
}

pub fn validate_frequency_hours(hours: f64) -> anyhow::Result<()> {
    ensure!(
        hours.is_finite() && hours > 0.0,
        "frequency must be a positive number of hours (got {hours})"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_match_first_run_state() {
        let s = AutoBlogSettings::default();
        assert!(!s.is_enabled);
        assert_eq!(s.frequency_hours, 3.0);
        assert_eq!(s.last_run, 0);
        assert_eq!(s.topics.len(), 4);
        assert_eq!(s.topics[1], "Gold (XAUUSD)");
    }

    #[test]
    fn wire_format_is_camel_case() {
        let v = serde_json::to_value(AutoBlogSettings::default()).unwrap();
        assert_eq!(v["isEnabled"], json!(false));
        assert_eq!(v["frequencyHours"], json!(3.0));
        assert_eq!(v["lastRun"], json!(0));
    }

    #[test]
    fn reads_integer_frequency() {
        let s: AutoBlogSettings = serde_json::from_value(json!({
            "isEnabled": true,
            "frequencyHours": 1,
            "lastRun": 10,
            "topics": ["A"],
        }))
        .unwrap();
        assert_eq!(s.frequency_hours, 1.0);
    }

    #[test]
    fn due_when_elapsed_reaches_frequency() {
        let s = AutoBlogSettings {
            frequency_hours: 1.0,
            last_run: 0,
            ..Default::default()
        };
        assert!(!s.is_due(3_599_999));
        assert!(s.is_due(3_600_000));
    }

    #[test]
    fn add_topic_trims_and_dedups() {
        let mut s = AutoBlogSettings::default();
        assert!(s.add_topic("  Oil (WTI) ").unwrap());
        assert!(!s.add_topic("Oil (WTI)").unwrap());
        assert!(s.add_topic("   ").is_err());
        assert_eq!(s.topics.last().map(String::as_str), Some("Oil (WTI)"));
    }

    #[test]
    fn rejects_non_positive_frequency() {
        let mut s = AutoBlogSettings::default();
        assert!(s.set_frequency_hours(0.0).is_err());
        assert!(s.set_frequency_hours(f64::NAN).is_err());
        s.set_frequency_hours(0.5).unwrap();
        assert_eq!(s.frequency_hours, 0.5);
    }

    #[test]
    fn toggled_flips_only_enabled() {
        let s = AutoBlogSettings::default();
        let t = s.toggled();
        assert!(t.is_enabled);
        assert_eq!(t.topics, s.topics);
    }
}
