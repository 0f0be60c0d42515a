//! Execution of declared hook groups.

use futures::future::try_join_all;

use crate::error::DiResult;
use crate::provider::metadata::HookMetadata;

/// Runs every hook of a group concurrently and fails on the first error.
pub(crate) async fn run_all<C: Clone>(hooks: &[HookMetadata<C>], context: C) -> DiResult<()> {
    if hooks.is_empty() {
        return Ok(());
    }

    try_join_all(hooks.iter().map(|hook| {
        tracing::trace!(hook = %hook.label(), "running lifecycle hook");
        (hook.handler)(context.clone())
    }))
    .await
    .map_err(|error| {
        tracing::debug!("lifecycle hook failed: {error}");
        error
    })?;
    Ok(())
}
