//! Common types for domain models

use crate::error::{AppError, Result};

/// Generate a fresh entity identifier.
///
/// Identifiers are opaque strings; UUID v4 text keeps them unique across
/// every entity type and fits the `CHAR(36)` key columns.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Outcome of a point lookup against a store.
///
/// Creation paths use this to tell "does not exist, go ahead" apart from a
/// store failure without inspecting error kinds.
#[derive(Debug)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
    Failed(AppError),
}

impl<T> From<Result<Option<T>>> for Lookup<T> {
    fn from(result: Result<Option<T>>) -> Self {
        match result {
            Ok(Some(value)) => Lookup::Found(value),
            Ok(None) => Lookup::NotFound,
            // A store that reports absence as an error still means "absent".
            Err(AppError::NotFound(_)) => Lookup::NotFound,
            Err(err) => Lookup::Failed(err),
        }
    }
}
