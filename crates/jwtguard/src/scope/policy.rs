//! Scope matching policies

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Decides whether a token's scopes satisfy the required scopes
pub trait ScopePolicy: Send + Sync + 'static {
    /// Returns `true` if `candidates` satisfies `required`
    fn admits(&self, required: &[String], candidates: &[String]) -> bool;
}

impl<F> ScopePolicy for F
where
    F: Fn(&[String], &[String]) -> bool + Send + Sync + 'static,
{
    fn admits(&self, required: &[String], candidates: &[String]) -> bool {
        self(required, candidates)
    }
}

/// How the required scopes combine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Conjunction {
    /// Every required scope must be present
    #[default]
    All,
    /// At least one required scope must be present
    Any,
}

impl ScopePolicy for Conjunction {
    fn admits(&self, required: &[String], candidates: &[String]) -> bool {
        match self {
            Self::All => all_of(required, candidates),
            Self::Any => any_of(required, candidates),
        }
    }
}

/// `true` if every required scope is among the candidates
///
/// An empty `required` is satisfied by anything. Duplicates on either side do not matter.
pub fn all_of(required: &[String], candidates: &[String]) -> bool {
    if required.is_empty() {
        return true;
    }
    let present: HashSet<&str> = candidates.iter().map(String::as_str).collect();
    required.iter().all(|scope| present.contains(scope.as_str()))
}

/// `true` if at least one required scope is among the candidates
///
/// An empty `required` is satisfied by anything.
pub fn any_of(required: &[String], candidates: &[String]) -> bool {
    if required.is_empty() {
        return true;
    }
    let present: HashSet<&str> = candidates.iter().map(String::as_str).collect();
    required.iter().any(|scope| present.contains(scope.as_str()))
}
