use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("invalid url pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("profile '{profile}' has no url patterns")]
    NoPatterns { profile: String },
    #[error("profile '{profile}' is missing the {role} role spec")]
    MissingRole { profile: String, role: String },
}
