use super::{Project, call_context, parse_kind};
use colored::Colorize;
use opcflow_compute::reconcile;
use opcflow_reconcile::ResourceKey;

pub async fn handle(project: &Project, kind: &str, name: &str) -> anyhow::Result<()> {
    let kind = parse_kind(kind)?;
    let settings = project.provider_settings()?;
    let client = project.connect(&settings)?;

    let lock = project.state.acquire_lock().await?;
    let mut state = project.state.load().await?;

    let key = ResourceKey::new(kind.as_str(), name);
    if state.get_resource(&key).is_some() {
        anyhow::bail!("{} is already managed", key);
    }

    let record = reconcile::import(&client, &call_context(), &mut state, kind, name).await?;
    project.state.save(&state).await?;
    lock.release().await?;

    println!("{} {} {}", "Imported".green().bold(), kind, record.identity().cyan());
    for (field, value) in record.attributes() {
        println!("    {}: {}", field, value);
    }
    Ok(())
}
