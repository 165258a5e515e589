//! resolve command - Print the upstream base of a package description

use std::path::Path;

use anyhow::{Context as _, Result};

use crate::cli::Context;
use crate::kernel::base::read_gitrev;
use crate::kernel::{self, BaseReference, VersionMetadata};
use crate::ui::output;

/// Parse `spec`, resolve its base and print it.
///
/// The stored commit comes from `gitrev` if given, else from the `gitrev`
/// file next to the description.
pub fn resolve(ctx: &Context, spec: &Path, gitrev: Option<&Path>) -> Result<()> {
    let meta = VersionMetadata::from_file(spec)?;

    let stored = match gitrev {
        Some(path) => Some(
            std::fs::read_to_string(path)
                .with_context(|| format!("cannot read {}", path.display()))?,
        ),
        None => spec.parent().and_then(read_gitrev),
    };

    let base = kernel::resolve(&meta, stored.as_deref())?;

    let kind = match base {
        BaseReference::Tag(_) => "tag",
        BaseReference::Commit(_) => "commit",
    };
    output::print(
        format!(
            "{}.{} released={} rc={} gitrev={} stable={} -> {}",
            meta.major_version,
            meta.base_sublevel,
            meta.released_kernel,
            meta.rc_revision,
            meta.git_revision,
            meta.stable_update,
            kind
        ),
        ctx.verbosity,
    );
    println!("{}", base);
    Ok(())
}
