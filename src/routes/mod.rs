//! API route handlers.
//!
//! Deliberately plain CRUD: validation, a store round-trip, a response
//! type per route. Anything stateful (connection gating, auth, order
//! event fan-out) lives in the subsystems these handlers call.

pub mod auth;
pub mod health;
pub mod orders;
pub mod products;
pub mod users;

use mongodb::bson::oid::ObjectId;

use crate::http::error::ApiError;

/// Parse a path id, mapping garbage to a 400 instead of a store error.
pub(crate) fn parse_object_id(id: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(id).map_err(|_| ApiError::BadRequest(format!("invalid id: {id}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_object_id_accepts_hex() {
        assert!(parse_object_id("6567aa0000000000000000ab").is_ok());
    }

    #[test]
    fn parse_object_id_rejects_garbage() {
        assert!(matches!(
            parse_object_id("not-an-id"),
            Err(ApiError::BadRequest(_))
        ));
    }
}
