use quarry_core::error::QuarryResult;
use quarry_core::CollectionName;

use super::CommandContext;

pub async fn execute(collection: &str, ctx: &CommandContext) -> QuarryResult<()> {
    let name: CollectionName = collection.parse()?;
    let versions = ctx.galaxy().await?.get_versions(&name).await?;

    if versions.is_empty() {
        ctx.output.warn(&format!("{} has no published versions", name));
    }
    for version in versions {
        ctx.output.plain(&version);
    }
    Ok(())
}
