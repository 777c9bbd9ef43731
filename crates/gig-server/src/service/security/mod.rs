//! Bearer credential verification.

mod principal;
mod principal_keys;

pub use principal::Principal;
pub use principal_keys::PrincipalKeys;
