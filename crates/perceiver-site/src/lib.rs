pub mod cache;
pub mod detector;
pub mod errors;
pub mod metrics;
pub mod profile;

pub use cache::{DetectionCache, DEFAULT_DETECTION_TTL};
pub use detector::{
    score_profile, ConfidenceBoost, SiteDetector, MAX_BOOST, STRUCTURAL_WEIGHT, URL_WEIGHT,
};
pub use errors::ProfileError;
pub use profile::{EnvironmentProfile, MarkerCheck, ProfileBuilder, ProfileMetadata};
