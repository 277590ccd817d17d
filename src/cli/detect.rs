use anyhow::Result;
use serde::Serialize;
use sitelens_core_types::DetectionResult;

use super::commands::DetectArgs;
use super::context::CliContext;
use super::output::emit;

#[derive(Debug, Serialize)]
pub struct DetectReport {
    pub detection: DetectionResult,
    /// Adapter serving the matched profile
    pub adapter: Option<String>,
    /// Set when a profile matched but nothing serves it
    pub configuration_error: Option<String>,
}

pub async fn cmd_detect(args: DetectArgs, ctx: &CliContext) -> Result<()> {
    let app = ctx.app_for_page(&args.page).await?;
    let registry = app.registry();
    let detection = registry.detect_site(None);
    let (adapter, configuration_error) = match registry.get_adapter(None) {
        Ok(adapter) => (adapter.map(|adapter| adapter.site_id().to_string()), None),
        Err(err) => (None, Some(err.to_string())),
    };

    let report = DetectReport {
        detection,
        adapter,
        configuration_error,
    };
    emit(ctx.output(), &report, render_human)
}

fn render_human(report: &DetectReport) -> String {
    let detection = &report.detection;
    let mut out = String::new();
    match &detection.site {
        Some(site) => out.push_str(&format!(
            "Detected {} (confidence {:.2})\n",
            site, detection.confidence
        )),
        None => out.push_str(&format!(
            "No known environment (confidence {:.2})\n",
            detection.confidence
        )),
    }
    out.push_str(&format!("  url:        {}\n", detection.url));
    out.push_str(&format!(
        "  signals:    url {:.2}, structure {:.2}, boost {:.2}\n",
        detection.signals.url_score, detection.signals.structural_score, detection.signals.boost
    ));
    if let Some(adapter) = &report.adapter {
        out.push_str(&format!("  adapter:    {adapter}\n"));
    }
    if let Some(err) = &report.configuration_error {
        out.push_str(&format!("  error:      {err}\n"));
    }
    out
}
