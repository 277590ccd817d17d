use anyhow::Result;
use serde::Serialize;

use super::context::CliContext;
use super::output::emit;

#[derive(Debug, Serialize)]
pub struct ProfileReport {
    pub id: String,
    pub display_name: String,
    pub vendor: Option<String>,
    pub homepage: Option<String>,
    pub url_patterns: Vec<String>,
    pub markers: Vec<String>,
    pub has_adapter: bool,
}

pub async fn cmd_profiles(ctx: &CliContext) -> Result<()> {
    let app = ctx.app_blank()?;
    let registry = app.registry();
    let reports: Vec<ProfileReport> = registry
        .detector()
        .profiles()
        .iter()
        .map(|profile| {
            let metadata = profile.metadata();
            ProfileReport {
                id: profile.id().to_string(),
                display_name: metadata.display_name.clone(),
                vendor: metadata.vendor.clone(),
                homepage: metadata.homepage.clone(),
                url_patterns: profile
                    .url_patterns()
                    .iter()
                    .map(|pattern| pattern.as_str().to_string())
                    .collect(),
                markers: profile.markers().iter().map(|marker| marker.describe()).collect(),
                has_adapter: registry.adapter(profile.id()).is_some(),
            }
        })
        .collect();

    emit(ctx.output(), &reports, |reports| {
        if reports.is_empty() {
            return "No profiles registered".to_string();
        }
        reports
            .iter()
            .map(|report| {
                format!(
                    "{:<10} {:<12} {}",
                    report.id,
                    report.display_name,
                    report.url_patterns.join(", ")
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    })
}
