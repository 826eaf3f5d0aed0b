//! Identity projections returned alongside issued tokens

use serde_json::{Value, json};

use crate::models::User;

/// Produces the public view of a user
pub trait UserProjection: Send + Sync {
    fn project(&self, user: &User) -> Value;
}

/// `{ "id", "username" }`
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityProjection;

impl UserProjection for IdentityProjection {
    fn project(&self, user: &User) -> Value {
        json!({
            "id": user.id,
            "username": user.username,
        })
    }
}
