use quarry_acquire::{CoreAcquirer, CoreSelector};
use quarry_core::error::{QuarryError, QuarryResult};
use std::path::Path;

use super::CommandContext;

pub async fn execute(
    selector: &str,
    source: Option<&Path>,
    dest: &Path,
    ctx: &CommandContext,
) -> QuarryResult<()> {
    let selector: CoreSelector = selector.parse()?;
    tokio::fs::create_dir_all(dest)
        .await
        .map_err(|e| QuarryError::io(format!("Failed to create {}", dest.display()), e))?;

    let acquirer = CoreAcquirer::from_settings(&ctx.settings)?;
    let sdist = acquirer.fetch(&selector, dest, source).await?;
    ctx.output.success(&format!("{} -> {}", selector, sdist.display()));
    Ok(())
}
