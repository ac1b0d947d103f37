use uuid::Uuid;

use crate::auth::domain::AuthUser;

/// The authenticated caller of a service operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub is_staff: bool,
}

impl Actor {
    pub fn member(user_id: Uuid) -> Self { Self { user_id, is_staff: false } }

    pub fn staff(user_id: Uuid) -> Self { Self { user_id, is_staff: true } }
}

impl From<&AuthUser> for Actor {
    fn from(u: &AuthUser) -> Self { Self { user_id: u.id, is_staff: u.is_staff } }
}
