use quarry_core::error::{QuarryError, QuarryResult};
use quarry_core::CollectionName;

use super::CommandContext;

pub async fn execute(collection: &str, ctx: &CommandContext) -> QuarryResult<()> {
    let name: CollectionName = collection.parse()?;
    let info = ctx.galaxy().await?.get_info(&name).await?;

    let rendered = serde_json::to_string_pretty(&info)
        .map_err(|e| QuarryError::io(format!("Failed to render metadata of {}", name), e.into()))?;
    ctx.output.plain(&rendered);
    Ok(())
}
