//! Declaration fingerprints
//!
//! Provides [`Fingerprint`], a 32-byte Blake3 digest of a declaration's
//! rendered signature, used to detect that a declaration changed between
//! building a delta and applying it.

use crate::error::TreeError;
use crate::node::NodeId;
use crate::render::render_header;
use crate::shape::DeclarationShape;
use crate::tree::SyntaxTree;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// A 32-byte signature digest (Blake3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Create fingerprint from raw bytes
    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Raw digest bytes
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Compute Blake3 digest of arbitrary data
    #[inline]
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        Self::new(*blake3::hash(data).as_bytes())
    }

    /// Fingerprint of a declaration's current signature
    ///
    /// # Errors
    /// Returns error if `decl` is not a declaration.
    pub fn of_declaration<T: SyntaxTree + ?Sized>(tree: &T, decl: NodeId) -> Result<Self, TreeError> {
        DeclarationShape::read(tree, decl)?;
        Ok(Self::compute(render_header(tree, decl).as_bytes()))
    }

    /// First 16 hex characters, for log lines
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl Display for Fingerprint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}
