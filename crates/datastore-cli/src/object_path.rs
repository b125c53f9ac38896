//! Object paths.
//!
//! Clients address objects as `/org/laptop/sugar/DataStore/Object/<uid>`.
//! Responses that name objects (`get`, `create`, `find`) return paths, and
//! object-scoped requests take one.

use datastore_core::Uid;

/// Prefix shared by every object path.
pub const OBJECT_PATH_PREFIX: &str = "/org/laptop/sugar/DataStore/Object";

/// Path addressing `uid`.
pub fn object_path(uid: Uid) -> String {
    format!("{OBJECT_PATH_PREFIX}/{uid}")
}

/// Extract the uid from an object path.
pub fn uid_from_path(path: &str) -> Option<Uid> {
    path.strip_prefix(OBJECT_PATH_PREFIX)?
        .strip_prefix('/')?
        .parse()
        .ok()
}

/// Accept either a bare uid or an object path.
pub fn parse_object_ref(input: &str) -> Option<Uid> {
    input.parse().ok().or_else(|| uid_from_path(input))
}
