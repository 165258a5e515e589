//! build command - Reconstruct the exploded tree for one build

use anyhow::{Context as _, Result};

use super::{pipeline_settings, Trees};
use crate::buildsys::{BuildLookup, BuildRef, KojiHub};
use crate::cli::Context;
use crate::engine::Pipeline;
use crate::packaging::Fedpkg;
use crate::ui::output;

/// Run the build command.
///
/// This is a synchronous wrapper that uses tokio to run the async implementation.
pub fn build(ctx: &Context, build: &str, fetch: bool) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(build_async(ctx, build, fetch))
}

async fn build_async(ctx: &Context, build: &str, fetch: bool) -> Result<()> {
    let hub = KojiHub::new(ctx.config.koji_hub()?);
    let identity = hub
        .lookup(&BuildRef::parse(build))
        .await
        .with_context(|| format!("cannot look up build {}", build))?;

    let trees = Trees::open(ctx)?;
    let _lock = trees.lock()?;

    let tool = Fedpkg::new(ctx.config.fedpkg());
    let pipeline = Pipeline::new(
        &trees.packaging,
        &trees.upstream,
        &tool,
        pipeline_settings(ctx, fetch),
    );
    let outcome = pipeline
        .create_tree(&identity)
        .with_context(|| format!("failed to create tree for {}", identity.nvr))?;

    output::print(output::format_outcome(&outcome), ctx.verbosity);
    Ok(())
}
