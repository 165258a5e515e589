//! listen command - Process build events from stdin

use anyhow::Result;
use tokio::io::BufReader;

use super::{pipeline_settings, Trees};
use crate::buildsys::{Dispatcher, EventFilter, KojiHub};
use crate::cli::Context;
use crate::engine::{Pipeline, PipelineOutcome};
use crate::packaging::Fedpkg;
use crate::ui::output;

/// Run the listen command until stdin ends.
pub fn listen(ctx: &Context, fetch: bool) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(listen_async(ctx, fetch))
}

async fn listen_async(ctx: &Context, fetch: bool) -> Result<()> {
    let hub = KojiHub::new(ctx.config.koji_hub()?);
    let trees = Trees::open(ctx)?;
    let tool = Fedpkg::new(ctx.config.fedpkg());
    let pipeline = Pipeline::new(
        &trees.packaging,
        &trees.upstream,
        &tool,
        pipeline_settings(ctx, fetch),
    );

    let filter = EventFilter::new(ctx.config.instance(), ctx.config.package());
    let dispatcher = Dispatcher::new(filter, &hub);

    let stats = dispatcher
        .run(BufReader::new(tokio::io::stdin()), |build| {
            let _lock = trees.lock()?;
            let outcome = pipeline.create_tree(build)?;
            output::print(output::format_outcome(&outcome), ctx.verbosity);
            Ok::<PipelineOutcome, anyhow::Error>(outcome)
        })
        .await?;

    output::print(
        format!(
            "{} event(s), {} build(s) processed, {} failure(s)",
            stats.events, stats.dispatched, stats.failed
        ),
        ctx.verbosity,
    );
    Ok(())
}
