use quarry_acquire::CollectionAcquirer;
use quarry_core::error::QuarryResult;
use quarry_core::{CollectionName, VersionSpec};
use std::path::Path;

use super::CommandContext;

pub async fn execute(
    collection: &str,
    constraint: &str,
    allow_prerelease: bool,
    dest: Option<&Path>,
    ctx: &CommandContext,
) -> QuarryResult<()> {
    let name: CollectionName = collection.parse()?;
    let spec: VersionSpec = constraint.parse()?;

    match dest {
        Some(dest) => {
            let acquirer = CollectionAcquirer::from_settings(&ctx.settings, dest)?;
            let result = acquirer
                .fetch_latest_matching(&name, &spec, allow_prerelease)
                .await?;
            ctx.output.success(&format!(
                "{} {} -> {}",
                name,
                result.version,
                result.download_path.display()
            ));
        },
        None => {
            let version = ctx
                .galaxy()
                .await?
                .get_latest_matching(&name, &spec, allow_prerelease)
                .await?;
            ctx.output.plain(&version.to_string());
        },
    }
    Ok(())
}
