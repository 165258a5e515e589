//! extract command - List the patches carried in a prepared tree

use std::path::Path;

use anyhow::{Context as _, Result};
use tracing::info;

use crate::cli::Context;
use crate::engine::PatchStackExtractor;
use crate::git::Git;
use crate::ui::output;

pub fn extract(
    ctx: &Context,
    prepared_tree: &Path,
    stable_update: u32,
    mbox: Option<&Path>,
) -> Result<()> {
    let prepared = Git::open(prepared_tree)
        .with_context(|| format!("cannot open prepared tree {}", prepared_tree.display()))?;

    let patches = PatchStackExtractor::new()
        .require_non_empty(ctx.config.require_patches())
        .extract_after(&prepared, stable_update)?;

    if let Some(path) = mbox {
        patches.write_mbox(path)?;
        info!(file = %path.display(), patches = patches.len(), "wrote patch series");
    }

    output::print(output::format_patch_set(&patches), ctx.verbosity);
    Ok(())
}
