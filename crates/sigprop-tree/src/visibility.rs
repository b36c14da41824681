//! Access levels
//!
//! Provides [`Visibility`], ordered from most to least restrictive, and
//! helpers to read and rewrite the keyword inside a modifier string.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Declared access level
///
/// Ordering follows accessibility: `Private < Package < Protected < Public`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Visible inside the top-level class only
    Private,
    /// Visible inside the package (no keyword)
    #[default]
    Package,
    /// Visible to the package and subclasses
    Protected,
    /// Visible everywhere
    Public,
}

impl Visibility {
    /// Keyword text, empty for package access
    #[inline]
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Package => "",
            Self::Protected => "protected",
            Self::Public => "public",
        }
    }

    /// Read visibility from a space separated modifier string
    #[must_use]
    pub fn from_modifiers(modifiers: &str) -> Self {
        modifiers
            .split_whitespace()
            .find_map(|word| match word {
                "private" => Some(Self::Private),
                "protected" => Some(Self::Protected),
                "public" => Some(Self::Public),
                _ => None,
            })
            .unwrap_or(Self::Package)
    }

    /// Rewrite the visibility keyword of a modifier string
    ///
    /// The keyword always leads; other modifiers keep their order.
    #[must_use]
    pub fn apply_to(self, modifiers: &str) -> String {
        let rest = modifiers
            .split_whitespace()
            .filter(|w| !matches!(*w, "private" | "protected" | "public"));
        std::iter::once(self.keyword())
            .chain(rest)
            .filter(|w| !w.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Check if `self` is strictly more restrictive than `other`
    #[inline]
    #[must_use]
    pub fn is_narrower_than(self, other: Self) -> bool {
        self < other
    }
}

impl Display for Visibility {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Package => f.write_str("package-private"),
            other => f.write_str(other.keyword()),
        }
    }
}
