//! Substring-based classification of cluster errors.
//!
//! `kubectl` reports failures as free text on stderr, so transient and
//! ignorable conditions are recognised by the phrases the API server and the
//! client emit. Every predicate accepts anything that implements `Display`.

use std::fmt::Display;

fn contains_any(err: &impl Display, needles: &[&str]) -> bool {
    let text = err.to_string();
    needles.iter().any(|needle| text.contains(needle))
}

/// The object already exists.
pub fn is_already_exists(err: &impl Display) -> bool {
    contains_any(err, &["AlreadyExists", "already exists"])
}

/// The object (or its kind) does not exist.
pub fn is_not_found(err: &impl Display) -> bool {
    contains_any(err, &["NotFound", "not found"])
}

/// Optimistic-concurrency conflict on update.
pub fn is_conflict(err: &impl Display) -> bool {
    contains_any(err, &["Conflict", "the object has been modified"])
}

pub fn is_timeout(err: &impl Display) -> bool {
    contains_any(
        err,
        &["timeout", "timed out", "context deadline exceeded"],
    )
}

pub fn is_connection_error(err: &impl Display) -> bool {
    contains_any(
        err,
        &["connection refused", "i/o timeout", "network", "dial tcp"],
    )
}

/// Likely to succeed if retried.
pub fn is_transient(err: &impl Display) -> bool {
    is_timeout(err)
        || is_connection_error(err)
        || is_conflict(err)
        || contains_any(err, &["Internal error", "TooManyRequests", "ServerTimeout"])
}

/// Safe to ignore during setup or teardown.
pub fn is_ignorable(err: &impl Display) -> bool {
    is_already_exists(err) || is_not_found(err)
}
