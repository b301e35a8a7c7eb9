pub mod apply;
pub mod destroy;
pub mod import;
pub mod plan;
pub mod refresh;

use anyhow::Context;
use colored::Colorize;
use opcflow_compute::{
    ComputeClient, ComputeConfig, MANIFEST_FILE, Manifest, ProviderSettings, ResourceKind,
};
use opcflow_reconcile::{ActionType, ApplyResult, CallContext, FieldChange, Plan, StateManager};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Project directory with its manifest and state
pub struct Project {
    pub manifest_path: PathBuf,
    pub state: StateManager,
}

impl Project {
    pub fn open(root: &Path, manifest: Option<&Path>) -> Self {
        let manifest_path = match manifest {
            Some(path) => path.to_path_buf(),
            None => root.join(MANIFEST_FILE),
        };
        tracing::debug!("Project manifest: {}", manifest_path.display());
        Self {
            manifest_path,
            state: StateManager::new(root),
        }
    }

    pub fn load_manifest(&self) -> anyhow::Result<Manifest> {
        opcflow_compute::load_manifest(&self.manifest_path)
            .with_context(|| format!("failed to load {}", self.manifest_path.display()))
    }

    /// Provider settings from the manifest, or defaults when there is none
    pub fn provider_settings(&self) -> anyhow::Result<ProviderSettings> {
        if self.manifest_path.exists() {
            Ok(self.load_manifest()?.provider)
        } else {
            Ok(ProviderSettings::default())
        }
    }

    pub fn connect(&self, settings: &ProviderSettings) -> anyhow::Result<Arc<ComputeClient>> {
        let config = ComputeConfig::resolve(settings)?;
        println!(
            "{} {} ({})",
            "Connecting to".blue(),
            config.endpoint,
            config.qualified_user()
        );
        Ok(Arc::new(ComputeClient::new(config)?))
    }
}

/// Context for one CLI invocation
pub fn call_context() -> CallContext {
    CallContext::new().with_request_id(format!("opcflow-{}", std::process::id()))
}

pub fn parse_kind(kind: &str) -> anyhow::Result<ResourceKind> {
    ResourceKind::parse(kind).ok_or_else(|| {
        let known = ResourceKind::ALL
            .iter()
            .map(|k| k.manifest_name())
            .collect::<Vec<_>>()
            .join(", ");
        anyhow::anyhow!("unknown resource kind '{}' (expected one of: {})", kind, known)
    })
}

pub fn print_plan(plan: &Plan) {
    println!();
    for action in &plan.actions {
        let symbol = match action.action_type {
            ActionType::Create => "+".green(),
            ActionType::Update => "~".yellow(),
            ActionType::Replace => "-/+".magenta(),
            ActionType::Delete => "-".red(),
            ActionType::NoOp => continue,
        };
        println!("{} {}", symbol, action.description.bold());
        for change in &action.changes {
            print_change(change);
        }
    }

    if !plan.has_changes {
        println!("{}", "No changes. Resources match the manifest.".green());
        return;
    }

    println!();
    println!("{} {}", "Plan:".bold(), plan.summary());
}

fn print_change(change: &FieldChange) {
    println!("    {}", format_change(change));
}

fn format_change(change: &FieldChange) -> String {
    let plain = FieldChange {
        force_new: false,
        ..change.clone()
    };
    if change.force_new {
        format!("{} {}", plain, "(forces replacement)".red())
    } else {
        plain.to_string()
    }
}

/// Print the outcome; an error is returned when any action failed
pub fn report(result: &ApplyResult) -> anyhow::Result<()> {
    println!();
    for success in &result.succeeded {
        println!("  {} {}", "✓".green(), success.message);
    }
    for failure in &result.failed {
        println!(
            "  {} {}: {}",
            "✗".red(),
            failure.action_id,
            failure.error.as_deref().unwrap_or("unknown error")
        );
    }

    tracing::info!(
        "Apply finished: {} succeeded, {} failed in {} ms",
        result.succeeded.len(),
        result.failed.len(),
        result.duration_ms
    );

    println!();
    if result.is_success() {
        println!(
            "{} ({} changed, {} ms)",
            "Done.".green().bold(),
            result.succeeded.len(),
            result.duration_ms
        );
        Ok(())
    } else {
        anyhow::bail!(
            "{} of {} actions failed",
            result.failed.len(),
            result.failed.len() + result.succeeded.len()
        )
    }
}
