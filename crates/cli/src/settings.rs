//! Environment-driven settings, read once at startup.

use kard_resource::NamespaceLabels;

pub const ITEMS_PER_PAGE_VAR: &str = "KARD_ITEMS_PER_PAGE";
pub const SKIP_PROPAGATION_LABEL_VAR: &str = "KARD_SKIP_PROPAGATION_LABEL";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Settings {
    /// Page size for `ns ls` when no pagination flag is given; 0 lists everything.
    pub items_per_page: usize,
    pub skip_propagation_label: Option<String>,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let items_per_page = lookup(ITEMS_PER_PAGE_VAR)
            .and_then(|s| s.trim().parse::<usize>().ok())
            .unwrap_or(0);
        let skip_propagation_label = lookup(SKIP_PROPAGATION_LABEL_VAR)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        Self { items_per_page, skip_propagation_label }
    }

    pub fn namespace_labels(&self) -> NamespaceLabels {
        match &self.skip_propagation_label {
            Some(key) => NamespaceLabels::karmada().with_skip_auto_propagation_key(key.clone()),
            None => NamespaceLabels::karmada(),
        }
    }
}
