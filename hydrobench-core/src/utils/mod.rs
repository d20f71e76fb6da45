//! Numerical utilities shared across modules.

pub mod special;
