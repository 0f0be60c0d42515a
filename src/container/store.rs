//! Per-container binding table.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::provider::Provider;
use crate::token::Token;

/// What a token is bound to inside one container.
///
/// A token is bound either to providers or to alias targets, never both, and
/// a single binding never silently turns into a list.
#[derive(Clone)]
pub enum Pointer {
    SingleProvider(Arc<dyn Provider>),
    ProviderList(Vec<Arc<dyn Provider>>),
    SingleAlias(Token),
    AliasList(Vec<Token>),
}

impl Pointer {
    pub fn is_provider(&self) -> bool {
        matches!(self, Pointer::SingleProvider(_) | Pointer::ProviderList(_))
    }

    pub fn is_alias(&self) -> bool {
        !self.is_provider()
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Pointer::ProviderList(_) | Pointer::AliasList(_))
    }

    /// Label used in error messages.
    pub fn describe(&self) -> &'static str {
        match self {
            Pointer::SingleProvider(_) => "a single provider",
            Pointer::ProviderList(_) => "a provider list",
            Pointer::SingleAlias(_) => "a single alias",
            Pointer::AliasList(_) => "an alias list",
        }
    }

    /// The bound providers, for provider pointers.
    pub fn providers(&self) -> Option<Vec<Arc<dyn Provider>>> {
        match self {
            Pointer::SingleProvider(provider) => Some(vec![provider.clone()]),
            Pointer::ProviderList(providers) => Some(providers.clone()),
            _ => None,
        }
    }

    /// The alias targets, for alias pointers.
    pub fn targets(&self) -> Option<Vec<Token>> {
        match self {
            Pointer::SingleAlias(target) => Some(vec![target.clone()]),
            Pointer::AliasList(targets) => Some(targets.clone()),
            _ => None,
        }
    }
}

impl fmt::Debug for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pointer::SingleProvider(provider) => f.debug_tuple("SingleProvider").field(provider).finish(),
            Pointer::ProviderList(providers) => f.debug_tuple("ProviderList").field(providers).finish(),
            Pointer::SingleAlias(target) => f.debug_tuple("SingleAlias").field(target).finish(),
            Pointer::AliasList(targets) => f.debug_tuple("AliasList").field(targets).finish(),
        }
    }
}

/// Insertion-ordered map from token to pointer.
#[derive(Default, Debug)]
pub(crate) struct Store {
    entries: IndexMap<Token, Pointer>,
}

impl Store {
    pub(crate) fn has_token(&self, token: &Token) -> bool {
        self.entries.contains_key(token)
    }

    pub(crate) fn get_token(&self, token: &Token) -> Option<&Pointer> {
        self.entries.get(token)
    }

    pub(crate) fn get_token_mut(&mut self, token: &Token) -> Option<&mut Pointer> {
        self.entries.get_mut(token)
    }

    pub(crate) fn set_token(&mut self, token: Token, pointer: Pointer) {
        self.entries.insert(token, pointer);
    }

    pub(crate) fn remove_token(&mut self, token: &Token) -> Option<Pointer> {
        self.entries.shift_remove(token)
    }

    /// Removes the given providers from a provider list, dropping the entry
    /// once the list is empty.
    pub(crate) fn retract_providers(&mut self, token: &Token, providers: &[Arc<dyn Provider>]) {
        let emptied = match self.entries.get_mut(token) {
            Some(Pointer::ProviderList(list)) => {
                list.retain(|bound| !providers.iter().any(|provider| Arc::ptr_eq(bound, provider)));
                list.is_empty()
            }
            _ => false,
        };
        if emptied {
            self.entries.shift_remove(token);
        }
    }

    pub(crate) fn tokens(&self) -> Vec<Token> {
        self.entries.keys().cloned().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}
