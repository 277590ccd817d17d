use chrono::{DateTime, Utc};

use crate::SiteId;

/// A profile only counts as matched when its confidence is strictly above this value.
pub const MATCH_THRESHOLD: f64 = 0.5;

/// Breakdown of how a confidence value was assembled.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DetectionSignals {
    pub url_score: f64,
    pub structural_score: f64,
    pub boost: f64,
}

impl DetectionSignals {
    pub fn total(&self) -> f64 {
        clamp_confidence(self.url_score + self.structural_score + self.boost)
    }
}

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct DetectionResult {
    pub site: Option<SiteId>,
    pub confidence: f64,
    pub url: String,
    pub detected_at: DateTime<Utc>,
    pub from_cache: bool,
    pub signals: DetectionSignals,
}

impl DetectionResult {
    pub fn no_match(url: impl Into<String>) -> Self {
        Self {
            site: None,
            confidence: 0.0,
            url: url.into(),
            detected_at: Utc::now(),
            from_cache: false,
            signals: DetectionSignals::default(),
        }
    }

    pub fn matched(url: impl Into<String>, site: SiteId, signals: DetectionSignals) -> Self {
        Self {
            site: Some(site),
            confidence: signals.total(),
            url: url.into(),
            detected_at: Utc::now(),
            from_cache: false,
            signals,
        }
    }

    pub fn is_match(&self) -> bool {
        self.site.is_some() && self.confidence > MATCH_THRESHOLD
    }

    /// Copy handed out on a cache hit.
    pub fn cached_copy(&self) -> Self {
        Self {
            from_cache: true,
            ..self.clone()
        }
    }
}

/// Clamp any score into `[0, 1]`; NaN collapses to zero.
pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_exclusive() {
        let signals = DetectionSignals {
            url_score: 0.5,
            ..Default::default()
        };
        let result = DetectionResult::matched("https://x/", SiteId::new("x"), signals);
        assert!(!result.is_match());
    }

    #[test]
    fn total_is_clamped() {
        let signals = DetectionSignals {
            url_score: 0.7,
            structural_score: 0.3,
            boost: 0.2,
        };
        assert_eq!(signals.total(), 1.0);
        assert_eq!(clamp_confidence(f64::NAN), 0.0);
        assert_eq!(clamp_confidence(-0.3), 0.0);
    }

    #[test]
    fn cached_copy_only_flips_flag() {
        let original = DetectionResult::no_match("https://x/");
        let copy = original.cached_copy();
        assert!(copy.from_cache);
        assert_eq!(copy.confidence, original.confidence);
        assert_eq!(copy.detected_at, original.detected_at);
    }

    #[test]
    fn detection_is_timestamped_when_made() {
        let before = Utc::now();
        let result = DetectionResult::matched(
            "https://x/",
            SiteId::new("x"),
            DetectionSignals {
                url_score: 0.7,
                ..Default::default()
            },
        );
        assert!(result.detected_at >= before);
        assert!(result.detected_at <= Utc::now());
    }

    #[cfg(feature = "serde-full")]
    #[test]
    fn timestamp_serializes_as_rfc3339() {
        let result = DetectionResult::no_match("https://x/");
        let json = serde_json::to_value(&result).unwrap();
        let stamp = json["detected_at"].as_str().unwrap();
        let parsed: DateTime<Utc> = stamp.parse().unwrap();
        assert_eq!(parsed, result.detected_at);

        let back: DetectionResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, result);
    }
}
