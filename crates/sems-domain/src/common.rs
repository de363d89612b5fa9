//! Shared traits and small value types used across the console domain.

use std::fmt;

/// Exposes the stable wire/UI key of an enumerated value.
pub trait Keyed: Sized + 'static {
    /// Every value, in presentation order.
    const ALL: &'static [Self];

    fn key(&self) -> &'static str;

    /// Resolves a key back into its value, ignoring case and surrounding
    /// whitespace.
    fn from_key(key: &str) -> Result<Self, UnknownKey>
    where
        Self: Copy,
    {
        let needle = key.trim();
        Self::ALL
            .iter()
            .find(|candidate| candidate.key().eq_ignore_ascii_case(needle))
            .copied()
            .ok_or_else(|| UnknownKey {
                kind: std::any::type_name::<Self>()
                    .rsplit("::")
                    .next()
                    .unwrap_or("value"),
                key: needle.to_string(),
                expected: Self::ALL.iter().map(Keyed::key).collect(),
            })
    }
}

/// Converts an entity into a user-facing display label.
pub trait Displayable {
    fn display_label(&self) -> String;
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Raised when a textual key does not name any known variant.
pub struct UnknownKey {
    pub kind: &'static str,
    pub key: String,
    pub expected: Vec<&'static str>,
}

impl fmt::Display for UnknownKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown {} `{}` (expected one of: {})",
            self.kind,
            self.key,
            self.expected.join(", ")
        )
    }
}

impl std::error::Error for UnknownKey {}
