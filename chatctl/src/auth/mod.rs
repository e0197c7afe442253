//! Session authentication.
//!
//! The service trusts a JWT session token issued by the login service that
//! shares our `secret_key`. Handlers take a [`CurrentUser`] argument; the
//! extractor rejects requests without a valid token with 401.

pub mod current_user;
pub mod session;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::types::UserId;

/// The authenticated caller, decoded from the session token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CurrentUser {
    #[schema(value_type = String, format = "uuid")]
    pub id: UserId,
    pub email: String,
    pub username: String,
}
