// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Crate-wide error type.
//!
//! Only constructor-time and configuration failures flow through this type.
//! The per-key outcomes of `insert`/`search`/`update`/`delete` are plain
//! booleans or optional values (see [`crate::btree::tree`]); there is no
//! exception channel for "key not found" or "duplicate key".

use std::fmt;

/// Result alias used throughout this crate.
pub type TreeResult<T> = Result<T, TreeError>;

/// Errors this crate can report.
///
/// Deliberately small: most failure modes in a B+tree are expressed as
/// `bool`/`Option` return values rather than errors (see §7 of the design).
#[derive(Debug, Clone)]
pub enum TreeError {
    /// `Order::new` was called with a value below the minimum fanout.
    InvalidOrder { order: u32, minimum: u32 },
    /// An I/O failure surfaced by a host layer wrapping this crate.
    ///
    /// Never constructed by this crate itself; kept so that callers which
    /// thread a single error type through a wider stack can convert into
    /// `TreeError` without a separate wrapper type.
    Io { reason: String },
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeError::InvalidOrder { order, minimum } => write!(
                f,
                "invalid order {order}: must be at least {minimum}"
            ),
            TreeError::Io { reason } => write!(f, "io error: {reason}"),
        }
    }
}

impl std::error::Error for TreeError {}

impl From<std::io::Error> for TreeError {
    fn from(err: std::io::Error) -> Self {
        TreeError::Io {
            reason: err.to_string(),
        }
    }
}
