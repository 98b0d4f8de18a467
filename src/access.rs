//! The authentication boundary.
//!
//! Identity storage, login, and API-key checks live at the transport edge,
//! outside this crate.  The vault only ever sees their result: an
//! authenticated [`OwnerId`].  `AccessGate` is the seam those collaborators
//! implement; the vault trusts its output and never re-authenticates.

use crate::errors::Result;
use crate::vault::record::OwnerId;

/// Resolves a transport-level credential (session token, API key) to the
/// authenticated owner identity for one request.
///
/// Implementations must return [`VaultError::Forbidden`] for anything they
/// cannot attribute to an account — the vault never sees unauthenticated
/// traffic.
///
/// [`VaultError::Forbidden`]: crate::errors::VaultError::Forbidden
pub trait AccessGate {
    fn resolve(&self, token: &str) -> Result<OwnerId>;
}
