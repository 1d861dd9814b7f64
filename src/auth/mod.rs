//! Credential issuance and per-request validation.
//!
//! # Purpose
//! Groups the token issuer ([`token`]), the password hashing helpers
//! ([`password`]), and the bearer-token gate ([`identity`]) that every
//! protected route depends on.
pub mod identity;
pub mod password;
pub mod token;
