//! # Country storage types
//!
//! [`CountryRecord`] is the document written to the store for each
//! `CreateCountry` call. It is built from the wire [`Country`] without an
//! identifier so the store assigns `_id` on insert; the assigned value is then
//! read back with [`object_id_hex`].
//!
//! Stored documents have the shape:
//!
//! ```json
//! { "_id": ObjectId(..), "code": "..", "name": "..", "region": "..", "sub_region": ".." }
//! ```

use crate::{Error, Result, proto::Country};
use mongodb::bson::{Bson, oid::ObjectId};
use serde::{Deserialize, Serialize};

/// A country as persisted in the document store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryRecord {
    /// Omitted on insert so the store generates it.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub code: String,
    pub name: String,
    pub region: String,
    pub sub_region: String,
}

impl From<&Country> for CountryRecord {
    /// Copies the four descriptive fields. Any client supplied `id` is dropped.
    fn from(country: &Country) -> Self {
        Self {
            id: None,
            code: country.code.clone(),
            name: country.name.clone(),
            region: country.region.clone(),
            sub_region: country.sub_region.clone(),
        }
    }
}

/// Interprets a store-generated identifier as an [`ObjectId`] and renders it as
/// lowercase hex.
///
/// # Errors
///
/// Returns [`Error::InvalidIdentifier`] if `id` is any other BSON type.
pub fn object_id_hex(id: &Bson) -> Result<String> {
    match id {
        Bson::ObjectId(oid) => Ok(oid.to_hex()),
        other => Err(Error::InvalidIdentifier {
            context: other.to_string(),
        }),
    }
}
