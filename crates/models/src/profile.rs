use chrono::Utc;
use sea_orm::{entity::prelude::*, ConnectionTrait, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ModelError;

/// Public profile, one per user, created on first access.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "profile")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: Uuid,
    pub display_name: String,
    #[sea_orm(column_type = "Text")]
    pub bio: String,
    pub avatar_url: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Comma separated language codes.
    #[serde(skip)]
    pub preferred_languages: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { User }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::User => Entity::belongs_to(crate::user::Entity)
                .from(Column::UserId)
                .to(crate::user::Column::Id)
                .into(),
        }
    }
}

impl Related<crate::user::Entity> for Entity {
    fn to() -> RelationDef { Relation::User.def() }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn languages(&self) -> Vec<String> {
        split_languages(&self.preferred_languages)
    }
}

pub fn split_languages(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|l| !l.is_empty()).map(str::to_string).collect()
}

pub fn join_languages(langs: &[String]) -> String {
    let mut out: Vec<String> = Vec::with_capacity(langs.len());
    for l in langs.iter().map(|l| l.trim().to_lowercase()).filter(|l| !l.is_empty()) {
        if !out.contains(&l) {
            out.push(l);
        }
    }
    out.join(",")
}

pub async fn get_or_create<C: ConnectionTrait>(db: &C, user_id: Uuid) -> Result<Model, ModelError> {
    if let Some(existing) = Entity::find_by_id(user_id).one(db).await? {
        return Ok(existing);
    }
    let now = Utc::now();
    let am = ActiveModel {
        user_id: Set(user_id),
        display_name: Set(String::new()),
        bio: Set(String::new()),
        avatar_url: Set(String::new()),
        latitude: Set(None),
        longitude: Set(None),
        preferred_languages: Set(String::new()),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };
    am.insert(db).await.map_err(ModelError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn languages_are_normalised_and_deduplicated() {
        let joined = join_languages(&[" EN".into(), "tr".into(), "en".into(), "".into()]);
        assert_eq!(joined, "en,tr");
        assert_eq!(split_languages(&joined), vec!["en".to_string(), "tr".to_string()]);
        assert!(split_languages("").is_empty());
    }
}
