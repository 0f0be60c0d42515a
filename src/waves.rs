//! Dependency-wave scheduling.
//!
//! Entries name an owner and the owners they must run before or after.
//! [`plan_waves`] groups them into ordered waves with a single deterministic
//! pass over the input; [`run_waves`] executes the waves in order and the
//! members of each wave concurrently.
//!
//! Placement is best effort. Constraints naming owners that were not placed
//! yet are ignored, and conflicting constraints fall back to the wave right
//! before the earliest "before" target.

use std::future::Future;

use futures::future::try_join_all;

use crate::error::DiResult;
use crate::token::Token;

/// One schedulable item.
#[derive(Debug, Clone)]
pub struct WaveEntry<T> {
    pub owner: Token,
    /// Owners this entry must run before.
    pub before: Vec<Token>,
    /// Owners this entry must run after.
    pub after: Vec<Token>,
    pub item: T,
}

impl<T> WaveEntry<T> {
    pub fn new(owner: impl Into<Token>, item: T) -> Self {
        Self {
            owner: owner.into(),
            before: Vec::new(),
            after: Vec::new(),
            item,
        }
    }

    pub fn before<I>(mut self, owners: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Token>,
    {
        self.before.extend(owners.into_iter().map(Into::into));
        self
    }

    pub fn after<I>(mut self, owners: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Token>,
    {
        self.after.extend(owners.into_iter().map(Into::into));
        self
    }
}

/// Indexes of the waves holding any of `owners`.
fn wave_indexes<'a, T>(waves: &'a [Vec<WaveEntry<T>>], owners: &'a [Token]) -> impl Iterator<Item = usize> + 'a {
    owners.iter().filter_map(move |owner| {
        waves
            .iter()
            .position(|wave| wave.iter().any(|entry| entry.owner == *owner))
    })
}

/// Groups `entries` into ordered waves.
///
/// ```rust
/// use ferrous_ioc::waves::{plan_waves, WaveEntry};
///
/// let waves = plan_waves(vec![
///     WaveEntry::new("A", ()),
///     WaveEntry::new("B", ()).after(["A"]),
///     WaveEntry::new("C", ()).before(["A"]),
/// ]);
///
/// let owners: Vec<Vec<&str>> = waves
///     .iter()
///     .map(|wave| wave.iter().map(|entry| entry.owner.id()).collect())
///     .collect();
/// assert_eq!(owners, [["C"], ["A"], ["B"]]);
/// ```
pub fn plan_waves<T>(entries: impl IntoIterator<Item = WaveEntry<T>>) -> Vec<Vec<WaveEntry<T>>> {
    let mut waves: Vec<Vec<WaveEntry<T>>> = Vec::new();

    for entry in entries {
        if waves.is_empty() {
            waves.push(vec![entry]);
            continue;
        }

        let before_index = wave_indexes(&waves, &entry.before).min();
        let after_index = wave_indexes(&waves, &entry.after).max();

        match (before_index, after_index) {
            (Some(before), Some(after)) => {
                if before <= after {
                    if before == 0 {
                        waves.insert(0, vec![entry]);
                    } else {
                        waves[before - 1].push(entry);
                    }
                } else if before - 1 == after {
                    waves.insert(before, vec![entry]);
                } else {
                    waves[after + 1].push(entry);
                }
            }
            (Some(before), None) => {
                if before == 0 {
                    waves.insert(0, vec![entry]);
                } else {
                    waves[before - 1].push(entry);
                }
            }
            (None, Some(after)) => {
                if after + 1 >= waves.len() {
                    waves.push(vec![entry]);
                } else {
                    waves[after + 1].push(entry);
                }
            }
            (None, None) => waves[0].push(entry),
        }
    }

    waves
}

/// Runs `waves` in order, awaiting every member of a wave concurrently.
///
/// Stops at the first failing wave; later waves never start.
pub async fn run_waves<T, F, Fut>(waves: &[Vec<WaveEntry<T>>], run: F) -> DiResult<()>
where
    F: Fn(&WaveEntry<T>) -> Fut,
    Fut: Future<Output = DiResult<()>>,
{
    for (index, wave) in waves.iter().enumerate() {
        tracing::trace!(wave = index, members = wave.len(), "running wave");
        try_join_all(wave.iter().map(&run)).await?;
    }
    Ok(())
}
