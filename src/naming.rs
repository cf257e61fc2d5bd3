//! Deterministic name and tag derivation for stack resources.
//!
//! Every resource name is the stack prefix joined to a role identifier;
//! per-zone resources additionally carry their zone index so names stay
//! unique within the stack. Tag maps always include a human-readable `Name`
//! and a fixed `Project` marker used for out-of-band resource-group
//! discovery.

use std::collections::BTreeMap;

/// Tag key holding the human-readable resource name.
pub const NAME_TAG_KEY: &str = "Name";

/// Tag key holding the project marker shared by every stack resource.
pub const PROJECT_TAG_KEY: &str = "Project";

/// Derives names and tags from a stack-wide prefix.
///
/// A `Namer` is a plain value passed explicitly into each builder; there is
/// no shared global state. All methods are pure, so equal inputs always
/// produce equal names and tags.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Namer {
    prefix: String,
    short_prefix: String,
    project: String,
}

impl Namer {
    /// Creates a namer, trimming the prefix, short prefix, and project
    /// marker. Emptiness is validated by the configuration layer before a
    /// namer is constructed.
    #[must_use]
    pub fn new(
        prefix: impl Into<String>,
        short_prefix: impl Into<String>,
        project: impl Into<String>,
    ) -> Self {
        Self {
            prefix: prefix.into().trim().to_owned(),
            short_prefix: short_prefix.into().trim().to_owned(),
            project: project.into().trim().to_owned(),
        }
    }

    /// Returns the stack-wide prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the length-constrained naming root used where the provider
    /// caps name length (for example target-group name prefixes).
    #[must_use]
    pub fn short_prefix(&self) -> &str {
        &self.short_prefix
    }

    /// Returns the project marker applied to every resource's tags.
    #[must_use]
    pub fn project(&self) -> &str {
        &self.project
    }

    /// Derives the name for a stack-singleton resource role.
    #[must_use]
    pub fn name(&self, role: &str) -> String {
        format!("{}-{role}", self.prefix)
    }

    /// Derives the name for a per-zone resource role. The zone index keeps
    /// names unique across zones; reusing a `(role, index)` pair is a caller
    /// programming error surfaced by the plan's duplicate detection.
    #[must_use]
    pub fn zone_name(&self, role: &str, index: u8) -> String {
        format!("{}-{role}-{index}", self.prefix)
    }

    /// Builds the tag map for a resource with the given derived name.
    #[must_use]
    pub fn tags(&self, name: &str) -> BTreeMap<String, String> {
        BTreeMap::from([
            (NAME_TAG_KEY.to_owned(), name.to_owned()),
            (PROJECT_TAG_KEY.to_owned(), self.project.clone()),
        ])
    }
}
