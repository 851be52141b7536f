//! Database layer (Firestore).

pub mod firestore;

pub use firestore::FirestoreDb;

/// Collection names as constants.
pub mod collections {
    /// User profiles (keyed by uid)
    pub const USERS: &str = "users";
    /// Per-user chat index (keyed by uid)
    pub const CHATS: &str = "chats";
}
