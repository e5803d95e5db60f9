//! Core business logic for novelhub.
//!
//! Services take repositories from `novelhub-db` and an explicit
//! [`AuthContext`] for every operation that depends on who is asking.

pub mod services;

pub use services::*;
