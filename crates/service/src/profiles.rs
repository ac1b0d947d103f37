//! Member profiles. A profile row is created the first time it is read.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use models::{
    profile::{self, join_languages},
    user::{self, UserStatus},
};

use crate::{actor::Actor, errors::ServiceError, ledger, users};

const MAX_DISPLAY_NAME: usize = 120;
const MAX_BIO: usize = 2000;
const MAX_AVATAR_URL: usize = 500;
const MAX_LANGUAGES: usize = 10;

/// What any signed-in member may see about another.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    pub user_id: Uuid,
    pub name: String,
    pub display_name: String,
    pub bio: String,
    pub avatar_url: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub preferred_languages: Vec<String>,
}

/// The caller's own profile with account details.
#[derive(Debug, Clone, Serialize)]
pub struct MeView {
    #[serde(flatten)]
    pub profile: ProfileView,
    pub email: String,
    pub is_staff: bool,
    pub status: UserStatus,
    pub balance_minutes: i64,
}

/// Fields left `None` are kept. An empty string clears a text field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub preferred_languages: Option<Vec<String>>,
}

impl ProfileUpdate {
    fn validate(&self) -> Result<(), ServiceError> {
        let too_long = |v: &Option<String>, max: usize| v.as_deref().map(|s| s.trim().chars().count() > max).unwrap_or(false);
        if too_long(&self.display_name, MAX_DISPLAY_NAME) {
            return Err(ServiceError::Validation(format!("display_name is limited to {} characters", MAX_DISPLAY_NAME)));
        }
        if too_long(&self.bio, MAX_BIO) {
            return Err(ServiceError::Validation(format!("bio is limited to {} characters", MAX_BIO)));
        }
        if too_long(&self.avatar_url, MAX_AVATAR_URL) {
            return Err(ServiceError::Validation("avatar_url is too long".into()));
        }
        if let Some(url) = self.avatar_url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(ServiceError::Validation("avatar_url must be an http(s) URL".into()));
            }
        }
        if matches!(self.latitude, Some(v) if !(-90.0..=90.0).contains(&v))
            || matches!(self.longitude, Some(v) if !(-180.0..=180.0).contains(&v))
        {
            return Err(ServiceError::Validation("location out of range".into()));
        }
        if let Some(langs) = &self.preferred_languages {
            if langs.len() > MAX_LANGUAGES {
                return Err(ServiceError::Validation(format!("at most {} languages", MAX_LANGUAGES)));
            }
            if langs.iter().any(|l| l.contains(',') || l.trim().len() > 35) {
                return Err(ServiceError::Validation("invalid language code".into()));
            }
        }
        Ok(())
    }
}

fn view(u: &user::Model, p: profile::Model) -> ProfileView {
    let preferred_languages = p.languages();
    ProfileView {
        user_id: u.id,
        name: u.name.clone(),
        display_name: p.display_name,
        bio: p.bio,
        avatar_url: p.avatar_url,
        latitude: p.latitude,
        longitude: p.longitude,
        preferred_languages,
    }
}

#[derive(Clone)]
pub struct Profiles {
    db: DatabaseConnection,
}

impl Profiles {
    pub fn new(db: DatabaseConnection) -> Self { Self { db } }

    pub async fn me(&self, actor: &Actor) -> Result<MeView, ServiceError> {
        let u = users::get_user(&self.db, actor.user_id).await?;
        let p = profile::get_or_create(&self.db, u.id).await?;
        let balance_minutes = ledger::account_of(&self.db, u.id).await?.map(|a| a.balance).unwrap_or(0);
        Ok(MeView {
            email: u.email.clone(),
            is_staff: u.is_staff,
            status: u.status,
            balance_minutes,
            profile: view(&u, p),
        })
    }

    #[instrument(skip(self, input), fields(user_id = %actor.user_id))]
    pub async fn update_me(&self, actor: &Actor, input: ProfileUpdate) -> Result<MeView, ServiceError> {
        input.validate()?;
        let txn = self.db.begin().await?;
        let u = users::get_user(&txn, actor.user_id).await?;
        let current = profile::get_or_create(&txn, u.id).await?;
        let mut am: profile::ActiveModel = current.into();
        if let Some(v) = input.display_name { am.display_name = Set(v.trim().to_string()); }
        if let Some(v) = input.bio { am.bio = Set(v.trim().to_string()); }
        if let Some(v) = input.avatar_url { am.avatar_url = Set(v.trim().to_string()); }
        if let Some(v) = input.latitude { am.latitude = Set(Some(v)); }
        if let Some(v) = input.longitude { am.longitude = Set(Some(v)); }
        if let Some(langs) = input.preferred_languages { am.preferred_languages = Set(join_languages(&langs)); }
        am.updated_at = Set(Utc::now().into());
        am.update(&txn).await?;
        txn.commit().await?;
        info!(event = "profile_updated");
        self.me(actor).await
    }

    /// Public view of any member, banned ones included.
    pub async fn get(&self, user_id: Uuid) -> Result<ProfileView, ServiceError> {
        let u = users::get_user(&self.db, user_id).await?;
        let p = profile::get_or_create(&self.db, user_id).await?;
        Ok(view(&u, p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{member, memory_db};

    #[tokio::test]
    async fn profile_is_created_on_first_read_and_updated_in_place() -> Result<(), anyhow::Error> {
        let db = memory_db().await?;
        let u = member(&db, "Lea", false).await?;
        let profiles = Profiles::new(db.clone());
        let actor = Actor::member(u.id);

        let fresh = profiles.me(&actor).await?;
        assert_eq!(fresh.profile.display_name, "");
        assert!(fresh.profile.preferred_languages.is_empty());
        assert_eq!(fresh.balance_minutes, 180);

        let updated = profiles
            .update_me(
                &actor,
                ProfileUpdate {
                    display_name: Some(" Lea K. ".into()),
                    bio: Some("Bikes and bread".into()),
                    preferred_languages: Some(vec!["EN".into(), "tr".into(), "en".into()]),
                    latitude: Some(41.0),
                    longitude: Some(29.0),
                    ..ProfileUpdate::default()
                },
            )
            .await?;
        assert_eq!(updated.profile.display_name, "Lea K.");
        assert_eq!(updated.profile.preferred_languages, vec!["en".to_string(), "tr".to_string()]);

        let partial = profiles
            .update_me(&actor, ProfileUpdate { bio: Some(String::new()), ..ProfileUpdate::default() })
            .await?;
        assert_eq!(partial.profile.bio, "");
        assert_eq!(partial.profile.display_name, "Lea K.");

        let public = profiles.get(u.id).await?;
        assert_eq!(public.name, "Lea");
        assert_eq!(public.latitude, Some(41.0));
        assert!(matches!(profiles.get(Uuid::new_v4()).await, Err(ServiceError::NotFound(_))));
        Ok(())
    }

    #[tokio::test]
    async fn invalid_profile_fields_are_rejected() -> Result<(), anyhow::Error> {
        let db = memory_db().await?;
        let u = member(&db, "Max", false).await?;
        let profiles = Profiles::new(db.clone());
        let actor = Actor::member(u.id);

        let bad = [
            ProfileUpdate { display_name: Some("x".repeat(MAX_DISPLAY_NAME + 1)), ..ProfileUpdate::default() },
            ProfileUpdate { avatar_url: Some("javascript:alert(1)".into()), ..ProfileUpdate::default() },
            ProfileUpdate { latitude: Some(91.0), ..ProfileUpdate::default() },
            ProfileUpdate { preferred_languages: Some(vec!["en,tr".into()]), ..ProfileUpdate::default() },
        ];
        for update in bad {
            assert!(matches!(profiles.update_me(&actor, update).await, Err(ServiceError::Validation(_))));
        }
        assert_eq!(profiles.me(&actor).await?.profile.display_name, "");
        Ok(())
    }
}
