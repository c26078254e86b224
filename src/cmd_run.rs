//! One-shot commands: `run` and `check-config`.

use anyhow::Context;
use tracing::{info, warn};

use avp_api::ProjectWorkflowManager;
use avp_config::{Config, ConfigValidator};
use avp_protocols::ProjectData;

/// Create a project, run its workflow and print the result as JSON.
pub(crate) async fn run_project(
    config: &Config,
    project_name: String,
    strategy: Option<String>,
    videos: Vec<String>,
) -> anyhow::Result<()> {
    let manager = ProjectWorkflowManager::from_config(config)
        .await
        .context("initializing workflow manager")?;

    let mut workflow = manager.default_configuration()?;
    if let Some(strategy) = strategy {
        workflow = workflow.with_strategy(
            strategy
                .parse()
                .with_context(|| format!("invalid strategy '{}'", strategy))?,
        );
    }

    let project = ProjectData::new(project_name).with_videos(videos);
    info!("Running {} workflow for {}", workflow.execution_strategy, project.name);

    let result = manager.create_project_workflow(project, workflow).await?;
    let status = manager.get_project_status(&result.project_id).await?;

    let output = serde_json::json!({
        "result": result,
        "status": status,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Validate the configuration and print errors and warnings.
pub(crate) fn check_config(config: &Config) -> anyhow::Result<()> {
    let result = ConfigValidator::validate(config);
    for warning in &result.warnings {
        warn!("{}: {}", warning.path, warning.message);
        println!("warning: {}: {}", warning.path, warning.message);
    }
    for error in &result.errors {
        println!("error: {}: {}", error.path, error.message);
    }

    if result.is_valid() {
        println!("Configuration is valid");
        Ok(())
    } else {
        anyhow::bail!("configuration has {} error(s)", result.errors.len())
    }
}
