use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{entity::prelude::*, ConnectionTrait, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ModelError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, Default)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    #[sea_orm(string_value = "active")]
    #[default]
    Active,
    #[sea_orm(string_value = "banned")]
    Banned,
    #[sea_orm(string_value = "suspended")]
    Suspended,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub is_staff: bool,
    pub status: UserStatus,
    pub suspended_until: Option<DateTimeWithTimeZone>,
    pub moderation_note: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        panic!("no relations defined here")
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Banned, or suspended until an instant after `now`.
    pub fn is_restricted_at(&self, now: DateTime<FixedOffset>) -> bool {
        match self.status {
            UserStatus::Active => false,
            UserStatus::Banned => true,
            UserStatus::Suspended => self.suspended_until.map(|until| until > now).unwrap_or(false),
        }
    }

    pub fn is_restricted(&self) -> bool {
        self.is_restricted_at(Utc::now().into())
    }
}

pub async fn create<C: ConnectionTrait>(
    db: &C,
    email: &str,
    name: &str,
    is_staff: bool,
) -> Result<Model, ModelError> {
    if !email.contains('@') { return Err(ModelError::Validation("invalid email".into())); }
    if name.trim().is_empty() { return Err(ModelError::Validation("name required".into())); }
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        name: Set(name.to_string()),
        is_staff: Set(is_staff),
        status: Set(UserStatus::Active),
        suspended_until: Set(None),
        moderation_note: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    };
    am.insert(db).await.map_err(ModelError::from)
}

pub async fn find_by_email<C: ConnectionTrait>(db: &C, email: &str) -> Result<Option<Model>, ModelError> {
    Entity::find()
        .filter(Column::Email.eq(email))
        .one(db)
        .await
        .map_err(ModelError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn user(status: UserStatus, until: Option<DateTime<FixedOffset>>) -> Model {
        let now: DateTime<FixedOffset> = Utc::now().into();
        Model {
            id: Uuid::new_v4(),
            email: "a@b.c".into(),
            name: "A".into(),
            is_staff: false,
            status,
            suspended_until: until,
            moderation_note: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn restriction_follows_status_and_expiry() {
        let now: DateTime<FixedOffset> = Utc::now().into();
        assert!(!user(UserStatus::Active, None).is_restricted_at(now));
        assert!(user(UserStatus::Banned, None).is_restricted_at(now));
        assert!(user(UserStatus::Suspended, Some(now + Duration::days(1))).is_restricted_at(now));
        assert!(!user(UserStatus::Suspended, Some(now - Duration::seconds(1))).is_restricted_at(now));
        assert!(!user(UserStatus::Suspended, None).is_restricted_at(now));
    }
}
