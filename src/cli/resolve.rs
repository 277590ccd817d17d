use anyhow::{bail, Result};
use node_locator::{NodeResolution, NodeRole};
use serde::Serialize;
use site_adapters::SiteAdapter;
use tracing::warn;

use super::commands::ResolveArgs;
use super::context::CliContext;
use super::output::emit;

#[derive(Debug, Serialize)]
pub struct ErrorReport {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct RoleReport {
    pub role: NodeRole,
    pub description: String,
    pub found: bool,
    /// `primary` or the fallback index
    pub selector_used: Option<String>,
    pub selector: Option<String>,
    pub tag: Option<String>,
    pub elapsed_ms: u128,
    pub attempts: u32,
    pub error: Option<ErrorReport>,
}

#[derive(Debug, Serialize)]
pub struct ResolveReport {
    pub site: String,
    pub confidence: f64,
    pub roles: Vec<RoleReport>,
}

pub async fn cmd_resolve(args: ResolveArgs, ctx: &CliContext) -> Result<()> {
    let app = ctx.app_for_page(&args.page).await?;
    let Some(adapter) = app.registry().get_adapter(None)? else {
        let detection = app.registry().detect_site(None);
        bail!(
            "no known environment matched {} (confidence {:.2})",
            detection.url,
            detection.confidence
        );
    };

    if args.initialize {
        adapter.initialize().await?;
    }

    let roles = match args.role {
        Some(role) => vec![NodeRole::from(role)],
        None => NodeRole::all().to_vec(),
    };
    let mut reports = Vec::with_capacity(roles.len());
    for role in roles {
        let resolution = find(adapter.as_ref(), role).await;
        let description = adapter.profile().role(role).description.clone();
        reports.push(role_report(role, description, resolution));
    }

    if args.initialize {
        if let Err(err) = adapter.cleanup().await {
            warn!(%err, "adapter cleanup failed");
        }
    }

    let detection = app.registry().detect_site(None);
    let report = ResolveReport {
        site: adapter.site_id().to_string(),
        confidence: detection.confidence,
        roles: reports,
    };
    emit(ctx.output(), &report, render_human)
}

async fn find(adapter: &dyn SiteAdapter, role: NodeRole) -> NodeResolution {
    match role {
        NodeRole::Input => adapter.find_input_element().await,
        NodeRole::Submit => adapter.find_submit_element().await,
        NodeRole::Container => adapter.find_chat_container().await,
        NodeRole::InjectionPoint => adapter.find_injection_point().await,
    }
}

fn role_report(role: NodeRole, description: String, resolution: NodeResolution) -> RoleReport {
    RoleReport {
        role,
        description,
        found: resolution.is_valid,
        selector_used: resolution.selector_used.map(|used| used.to_string()),
        selector: resolution.selector,
        tag: resolution.node.map(|node| node.tag_name().to_string()),
        elapsed_ms: resolution.elapsed.as_millis(),
        attempts: resolution.attempts,
        error: resolution.error.map(|err| ErrorReport {
            code: err.code().to_string(),
            message: err.message,
        }),
    }
}

fn render_human(report: &ResolveReport) -> String {
    let mut out = format!("{} (confidence {:.2})\n", report.site, report.confidence);
    for role in &report.roles {
        if role.found {
            out.push_str(&format!(
                "  {:<16} <{}> via {} '{}' ({} attempt(s), {}ms)\n",
                role.role.to_string(),
                role.tag.as_deref().unwrap_or("?"),
                role.selector_used.as_deref().unwrap_or("?"),
                role.selector.as_deref().unwrap_or(""),
                role.attempts,
                role.elapsed_ms
            ));
        } else {
            let reason = role
                .error
                .as_ref()
                .map(|err| format!("{}: {}", err.code, err.message))
                .unwrap_or_default();
            out.push_str(&format!("  {:<16} not found ({reason})\n", role.role.to_string()));
        }
    }
    out
}
