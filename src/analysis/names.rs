//! Name lookups over listed resources

use crate::error::Error;
use crate::resource::{RoutingTable, SecurityGroup, Vpc};
use serde::{Deserialize, Serialize};

/// A resource addressable by a human-chosen name
pub trait NamedResource {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
}

impl NamedResource for Vpc {
    fn id(&self) -> &str {
        &self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
}

impl NamedResource for RoutingTable {
    fn id(&self) -> &str {
        &self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
}

impl NamedResource for SecurityGroup {
    fn id(&self) -> &str {
        &self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
}

/// Outcome of a name lookup. Ambiguity is data, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "match", content = "resources", rename_all = "snake_case")]
pub enum NameMatch<T> {
    Exact(T),
    Ambiguous(Vec<T>),
    NotFound,
}

impl<T> NameMatch<T> {
    pub fn exact(&self) -> Option<&T> {
        match self {
            NameMatch::Exact(resource) => Some(resource),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, NameMatch::NotFound)
    }

    /// Number of resources carried by the outcome
    pub fn len(&self) -> usize {
        match self {
            NameMatch::Exact(_) => 1,
            NameMatch::Ambiguous(candidates) => candidates.len(),
            NameMatch::NotFound => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Resolve `query` against `candidates`.
///
/// Exactly one case-sensitive equal name is `Exact`. Anything else falls
/// back to a case-insensitive substring search, and every hit (even a
/// single one) is reported as `Ambiguous` in candidate order.
pub fn resolve<T: NamedResource + Clone>(candidates: &[T], query: &str) -> Result<NameMatch<T>, Error> {
    if query.trim().is_empty() {
        return Err(Error::validation("Name must not be empty"));
    }

    let mut exact = candidates.iter().filter(|c| c.name() == query);
    if let (Some(only), None) = (exact.next(), exact.next()) {
        return Ok(NameMatch::Exact(only.clone()));
    }

    let needle = query.to_lowercase();
    let similar: Vec<T> = candidates
        .iter()
        .filter(|c| c.name().to_lowercase().contains(&needle))
        .cloned()
        .collect();

    if similar.is_empty() {
        Ok(NameMatch::NotFound)
    } else {
        Ok(NameMatch::Ambiguous(similar))
    }
}
