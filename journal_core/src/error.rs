use serde::{Deserialize, Serialize};

/// Transport-independent classification of a failed operation.
///
/// Every service error maps onto one of these so callers can decide how to
/// surface it (permission denial, 404, 409, ...) without matching on each
/// service's own enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Caller lacks the role or membership the operation needs.
    Forbidden,
    /// Referenced entity does not exist in the caller's group scope.
    NotFound,
    /// Structurally invalid input.
    Validation,
    /// A uniqueness rule was violated.
    Conflict,
    /// The target entity is already in a terminal state.
    InvalidState,
    /// Storage failure.
    Infra,
}
