use super::{Project, call_context};
use colored::Colorize;
use opcflow_compute::reconcile;

pub async fn handle(project: &Project) -> anyhow::Result<()> {
    let settings = project.provider_settings()?;
    let client = project.connect(&settings)?;

    let lock = project.state.acquire_lock().await?;
    let mut state = project.state.load().await?;

    let vanished = reconcile::refresh_all(&client, &call_context(), &mut state).await?;
    project.state.save(&state).await?;
    lock.release().await?;

    for key in &vanished {
        println!("  {} {} no longer exists", "-".red(), key);
    }
    println!(
        "{} {} resources in state",
        "Refreshed.".green().bold(),
        state.resources.len()
    );
    Ok(())
}
