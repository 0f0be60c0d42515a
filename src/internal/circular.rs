//! Cycle detection over dependency and alias graphs.
//!
//! Both walks are depth-first. Every branch carries its own copy of the
//! visited path, so sibling branches never share visited state and a token
//! reached twice through unrelated branches is not reported as a cycle.

use crate::container::Container;
use crate::error::{DiError, DiResult};
use crate::token::Token;

/// Token ids visited along one branch of a walk.
#[derive(Debug, Clone, Default)]
pub(crate) struct VisitPath {
    ids: Vec<String>,
}

impl VisitPath {
    /// Appends `token`; returns the closed cycle if it was already on the path.
    pub(crate) fn enter(&mut self, token: &Token) -> Result<(), Vec<String>> {
        let revisited = self.ids.iter().any(|id| id == token.id());
        self.ids.push(token.id().to_string());
        if revisited {
            Err(self.ids.clone())
        } else {
            Ok(())
        }
    }
}

/// Checks that registering `token` with `dependencies` closes no cycle.
///
/// Each dependency is followed to the providers visible from `container`,
/// continuing from the container that actually holds them.
pub(crate) fn check_dependencies(
    container: &Container,
    token: &Token,
    dependencies: &[Token],
    mut path: VisitPath,
) -> DiResult<()> {
    path.enter(token).map_err(DiError::CircularDependency)?;

    for dependency in dependencies {
        for (owner, provider) in container.visible_providers(dependency) {
            check_dependencies(&owner, dependency, &provider.dependencies(), path.clone())?;
        }
    }
    Ok(())
}

/// Checks that the alias chain starting at `token` never returns to a token
/// already on the chain.
pub(crate) fn check_mapping(container: &Container, token: &Token, mut path: VisitPath) -> DiResult<()> {
    path.enter(token).map_err(DiError::CircularMapping)?;

    if let Some((owner, targets)) = container.visible_targets(token) {
        for target in &targets {
            check_mapping(&owner, target, path.clone())?;
        }
    }
    Ok(())
}
