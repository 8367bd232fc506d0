//! Network namespace (VRF) enumeration.

use std::collections::HashSet;

/// Name of the namespace commands run in without an `ip netns exec` wrapper.
pub const DEFAULT_VRF: &str = "default";

/// Returns true for the namespace that needs no exec wrapper.
pub fn is_default_vrf(vrf: &str) -> bool {
    vrf == DEFAULT_VRF
}

/// Removes namespaces that must not be queried, e.g. those created by a
/// simulator or virtualization platform for its own plumbing.
pub trait NamespaceFilter: Send + Sync {
    fn retain(&self, namespaces: Vec<String>) -> Vec<String>;
}

/// Drops namespaces whose name is in a fixed set.
#[derive(Debug, Clone, Default)]
pub struct ExcludeNamespaces {
    excluded: HashSet<String>,
}

impl ExcludeNamespaces {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            excluded: names.into_iter().map(Into::into).collect(),
        }
    }
}

impl NamespaceFilter for ExcludeNamespaces {
    fn retain(&self, namespaces: Vec<String>) -> Vec<String> {
        namespaces
            .into_iter()
            .filter(|ns| !self.excluded.contains(ns))
            .collect()
    }
}

/// Extracts namespace names from `ip netns list` output
/// (`blue (id: 0)` -> `blue`).
pub fn parse_netns_list<S: AsRef<str>>(lines: &[S]) -> Vec<String> {
    lines
        .iter()
        .filter_map(|line| line.as_ref().split_whitespace().next())
        .map(String::from)
        .collect()
}
