//! The crate-wide entity identifier.
//!
//! Every scoped entity is keyed by a `uuid::Uuid`, serialized on the wire
//! and in MongoDB as its canonical dashed string form (spec: "ids as
//! canonical UUID-style strings").

use uuid::Uuid;

pub type Id = Uuid;

pub fn new_id() -> Id {
    Uuid::new_v4()
}
