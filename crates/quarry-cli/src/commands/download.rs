//! `quarry download`

use quarry_acquire::CollectionAcquirer;
use quarry_core::error::{QuarryError, QuarryResult};
use quarry_core::{CollectionName, Version};
use std::path::Path;

use super::CommandContext;

/// Parse `<namespace>.<name>:<version>`
pub fn parse_requirement(raw: &str) -> QuarryResult<(CollectionName, Version)> {
    let (name, version) = raw.split_once(':').ok_or_else(|| QuarryError::InvalidVersion {
        input: raw.to_string(),
        reason: "expected <namespace>.<name>:<version>".to_string(),
    })?;
    Ok((name.parse()?, version.parse()?))
}

pub async fn execute(requirements: &[String], dest: &Path, ctx: &CommandContext) -> QuarryResult<()> {
    let requests = requirements
        .iter()
        .map(|raw| parse_requirement(raw))
        .collect::<QuarryResult<Vec<_>>>()?;

    let acquirer = CollectionAcquirer::from_settings(&ctx.settings, dest)?;
    for result in acquirer.fetch_many(&requests).await? {
        ctx.output.success(&format!(
            "{} -> {}",
            result.version,
            result.download_path.display()
        ));
    }
    Ok(())
}
