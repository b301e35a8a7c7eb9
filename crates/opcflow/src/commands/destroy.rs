use super::{Project, call_context, parse_kind, report};
use colored::Colorize;
use opcflow_compute::reconcile;
use opcflow_reconcile::ResourceKey;

pub async fn handle(
    project: &Project,
    kind: Option<&str>,
    name: Option<&str>,
    yes: bool,
) -> anyhow::Result<()> {
    let only = match (kind, name) {
        (Some(kind), Some(name)) => Some(ResourceKey::new(parse_kind(kind)?.as_str(), name)),
        _ => None,
    };

    let state = project.state.load().await?;
    let targets = state
        .keys()
        .into_iter()
        .filter(|key| only.as_ref().is_none_or(|o| o == key))
        .collect::<Vec<_>>();

    if targets.is_empty() {
        match &only {
            Some(key) => anyhow::bail!("{} is not managed", key),
            None => {
                println!("{}", "Nothing to destroy.".green());
                return Ok(());
            }
        }
    }

    println!("{}", "The following resources will be deleted:".red().bold());
    for key in &targets {
        println!("  - {}", key.to_string().cyan());
    }

    if !yes {
        println!();
        println!("Re-run with --yes to delete them");
        return Ok(());
    }

    let settings = project.provider_settings()?;
    let client = project.connect(&settings)?;

    let lock = project.state.acquire_lock().await?;
    let mut state = project.state.load().await?;
    let result = reconcile::destroy(&client, &call_context(), &mut state, only.as_ref()).await;
    project.state.save(&state).await?;
    lock.release().await?;

    report(&result)
}
