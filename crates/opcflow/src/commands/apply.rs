use super::{Project, call_context, print_plan, report};
use colored::Colorize;
use opcflow_compute::reconcile;

pub async fn handle(project: &Project) -> anyhow::Result<()> {
    let manifest = project.load_manifest()?;
    let client = project.connect(&manifest.provider)?;
    let ctx = call_context();

    let lock = project.state.acquire_lock().await?;
    let mut state = project.state.load().await?;

    let plan = reconcile::plan(&client, &ctx, &mut state, &manifest).await?;
    print_plan(&plan);
    if !plan.has_changes {
        project.state.save(&state).await?;
        lock.release().await?;
        return Ok(());
    }

    println!();
    println!("{}", "Applying changes...".yellow().bold());
    // The plan is only shown; apply re-reads each resource right before acting on it
    let result = reconcile::apply(&client, &ctx, &mut state, &manifest).await;

    // State reflects every step that succeeded, even if others failed
    project.state.save(&state).await?;
    lock.release().await?;

    report(&result)
}
