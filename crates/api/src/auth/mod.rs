//! Bearer-token authentication.
//!
//! Tokens are issued by the wider platform; this service only validates
//! them. [`jwt::generate_access_token`] exists for tooling and tests.

pub mod jwt;
