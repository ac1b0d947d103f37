//! Login sessions. The row id travels in the JWT `sid` claim.
use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{entity::prelude::*, ConnectionTrait, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{errors::ModelError, user};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "session")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTimeWithTimeZone,
    pub expires_at: DateTimeWithTimeZone,
    pub revoked_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { User }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::User => Entity::belongs_to(user::Entity)
                .from(Column::UserId)
                .to(user::Column::Id)
                .into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_live_at(&self, now: DateTime<FixedOffset>) -> bool {
        self.revoked_at.is_none() && self.expires_at > now
    }
}

pub async fn create<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    expires_at: DateTime<FixedOffset>,
) -> Result<Model, ModelError> {
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        created_at: Set(Utc::now().into()),
        expires_at: Set(expires_at),
        revoked_at: Set(None),
    };
    am.insert(db).await.map_err(ModelError::from)
}

/// Mark the session revoked. Revoking twice keeps the first timestamp.
pub async fn revoke<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<(), ModelError> {
    let found = Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ModelError::Validation("session not found".into()))?;
    if found.revoked_at.is_some() {
        return Ok(());
    }
    let mut am: ActiveModel = found.into();
    am.revoked_at = Set(Some(Utc::now().into()));
    am.update(db).await?;
    Ok(())
}
