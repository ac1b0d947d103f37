use anyhow::Result;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use super::setup_test_db;
use crate::{report, service, session, tag, user, user_credentials};

#[tokio::test]
async fn user_crud_and_lookup_by_email() -> Result<()> {
    let db = setup_test_db().await?;

    let created = user::create(&db, "bob@example.com", "Bob", false).await?;
    assert_eq!(created.status, user::UserStatus::Active);
    assert!(!created.is_restricted());

    let found = user::find_by_email(&db, "bob@example.com").await?.expect("user by email");
    assert_eq!(found.id, created.id);

    let err = user::create(&db, "not-an-email", "Bob", false).await.unwrap_err();
    assert!(matches!(err, crate::errors::ModelError::Validation(_)));

    // Unique email
    assert!(user::create(&db, "bob@example.com", "Other", false).await.is_err());
    Ok(())
}

#[tokio::test]
async fn credentials_upsert_replaces_hash() -> Result<()> {
    let db = setup_test_db().await?;
    let u = user::create(&db, "carol@example.com", "Carol", false).await?;

    user_credentials::upsert_password(&db, u.id, "hash-1".into(), "argon2id").await?;
    user_credentials::upsert_password(&db, u.id, "hash-2".into(), "argon2id").await?;
    assert_eq!(user_credentials::find_hash(&db, u.id).await?, Some("hash-2".to_string()));

    let rows = user_credentials::Entity::find()
        .filter(user_credentials::Column::UserId.eq(u.id))
        .all(&db)
        .await?;
    assert_eq!(rows.len(), 1);
    Ok(())
}

#[tokio::test]
async fn session_revoke_is_idempotent() -> Result<()> {
    let db = setup_test_db().await?;
    let u = user::create(&db, "dan@example.com", "Dan", false).await?;
    let expires = (Utc::now() + chrono::Duration::hours(1)).into();
    let s = session::create(&db, u.id, expires).await?;
    assert!(s.is_live_at(Utc::now().into()));

    session::revoke(&db, s.id).await?;
    let first = session::Entity::find_by_id(s.id).one(&db).await?.expect("session");
    session::revoke(&db, s.id).await?;
    let second = session::Entity::find_by_id(s.id).one(&db).await?.expect("session");
    assert!(first.revoked_at.is_some());
    assert_eq!(first.revoked_at, second.revoked_at);
    assert!(!second.is_live_at(Utc::now().into()));
    Ok(())
}

#[tokio::test]
async fn typed_enums_round_trip_through_storage() -> Result<()> {
    let db = setup_test_db().await?;
    let owner = user::create(&db, "erin@example.com", "Erin", false).await?;
    let now = Utc::now();

    let svc = service::ActiveModel {
        id: Set(Uuid::new_v4()),
        owner_id: Set(owner.id),
        service_type: Set(service::ServiceType::Need),
        title: Set("Fix a bike".into()),
        description: Set("Flat tyre".into()),
        status: Set(service::ServiceStatus::Active),
        estimated_hours: Set(Some(2)),
        capacity: Set(1),
        latitude: Set(Some(41.0)),
        longitude: Set(Some(29.0)),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        deleted_at: Set(None),
    }
    .insert(&db)
    .await?;

    let needs = service::Entity::find()
        .filter(service::Column::ServiceType.eq(service::ServiceType::Need))
        .all(&db)
        .await?;
    assert_eq!(needs.len(), 1);
    assert_eq!(needs[0].id, svc.id);

    let r = report::ActiveModel {
        id: Set(Uuid::new_v4()),
        reporter_id: Set(owner.id),
        content_type: Set(report::ContentType::Service),
        object_id: Set(svc.id),
        target_user_id: Set(Some(owner.id)),
        reason: Set(report::ReportReason::Misinformation),
        description: Set(String::new()),
        evidence_url: Set(None),
        reporter_ip: Set(None),
        status: Set(report::ReportStatus::UnderReview),
        resolution: Set(None),
        resolved_by: Set(None),
        resolved_at: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&db)
    .await?;
    let loaded = report::Entity::find_by_id(r.id).one(&db).await?.expect("report");
    assert_eq!(loaded.status, report::ReportStatus::UnderReview);
    assert!(loaded.status.is_open());
    Ok(())
}

#[tokio::test]
async fn tags_are_found_by_slug() -> Result<()> {
    let db = setup_test_db().await?;
    let a = tag::find_or_create(&db, "Home Repair").await?;
    let b = tag::find_or_create(&db, "home repair").await?;
    assert_eq!(a.id, b.id);
    assert_eq!(a.slug, "home-repair");
    Ok(())
}
