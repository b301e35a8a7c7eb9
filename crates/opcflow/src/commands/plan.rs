use super::{Project, call_context, print_plan};
use colored::Colorize;
use opcflow_compute::reconcile;

pub async fn handle(project: &Project, json: bool) -> anyhow::Result<()> {
    let manifest = project.load_manifest()?;
    let client = project.connect(&manifest.provider)?;

    // Refreshed state is only used for planning and never written back
    let mut state = project.state.load().await?;
    println!("{}", "Refreshing state...".blue());
    let plan = reconcile::plan(&client, &call_context(), &mut state, &manifest).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        print_plan(&plan);
    }
    Ok(())
}
