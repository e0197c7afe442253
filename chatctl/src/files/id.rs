//! File identifier classification and canonical id assignment.
//!
//! Two id namespaces coexist: server-generated UUIDs for internally stored
//! files, and provider-issued ids (prefixed `file-`) for foreign files. The
//! prefix is checked before the UUID shape, so a provider id never parses as
//! internal.

use uuid::Uuid;

/// Prefix carried by provider-issued file identifiers
pub const FOREIGN_ID_PREFIX: &str = "file-";

/// Classification of a file identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdClass {
    /// Provider-issued id, starts with `file-`
    Foreign,
    /// Canonical hyphenated UUID issued by this service
    Internal,
    /// Neither namespace
    Invalid,
}

/// Classify a file identifier.
///
/// Foreign wins over Internal: an id starting with `file-` is Foreign even
/// if the remainder happens to be UUID-shaped. Internal requires the
/// canonical 36-character hyphenated form; braced, simple or URN forms are
/// rejected.
pub fn classify(id: &str) -> IdClass {
    if id.starts_with(FOREIGN_ID_PREFIX) {
        return IdClass::Foreign;
    }
    if id.len() == 36 && Uuid::try_parse(id).is_ok() {
        return IdClass::Internal;
    }
    IdClass::Invalid
}

/// Outcome of substituting the client-supplied upload id with the server's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalId {
    /// The client's id, echoed back so it can reconcile its optimistic state
    pub temp_file_id: String,
    /// The server-generated id the file is stored under
    pub file_id: String,
}

/// Replace the client-supplied upload id with the server-generated one.
///
/// The client id was already validated as a strict UUID; it survives only as
/// `temp_file_id` in the response. All persisted state uses `file_id`.
pub fn assign_canonical_id(client_id: &str, server_id: Uuid) -> CanonicalId {
    CanonicalId {
        temp_file_id: client_id.to_string(),
        file_id: server_id.to_string(),
    }
}
