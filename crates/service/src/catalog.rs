//! Service offers and needs, with tags and an optional location, plus the
//! tag directory.

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use common::pagination::Pagination;
use models::{
    service::{self, ServiceStatus, ServiceType},
    service_tag, tag,
};

use crate::{actor::Actor, errors::ServiceError, users};

const KM_PER_DEGREE: f64 = 111.0;
pub const POPULAR_TAG_LIMIT: usize = 20;

#[derive(Debug, Clone, Deserialize)]
pub struct NewService {
    pub service_type: ServiceType,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub estimated_hours: Option<i32>,
    pub capacity: Option<i32>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<ServiceStatus>,
    pub estimated_hours: Option<i32>,
    pub capacity: Option<i32>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceFilter {
    pub service_type: Option<ServiceType>,
    pub status: Option<ServiceStatus>,
    /// Tag slug.
    pub tag: Option<String>,
    pub owner_id: Option<Uuid>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub radius_km: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceView {
    #[serde(flatten)]
    pub service: service::Model,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TagCount {
    #[serde(flatten)]
    pub tag: tag::Model,
    pub service_count: u64,
}

fn validate_hours_and_capacity(estimated_hours: Option<i32>, capacity: Option<i32>) -> Result<(), ServiceError> {
    if matches!(estimated_hours, Some(h) if h < 1) {
        return Err(ServiceError::Validation("estimated_hours must be at least 1".into()));
    }
    if matches!(capacity, Some(c) if c < 1) {
        return Err(ServiceError::Validation("capacity must be at least 1".into()));
    }
    Ok(())
}

fn validate_location(lat: Option<f64>, lng: Option<f64>) -> Result<(), ServiceError> {
    if matches!(lat, Some(v) if !(-90.0..=90.0).contains(&v)) || matches!(lng, Some(v) if !(-180.0..=180.0).contains(&v)) {
        return Err(ServiceError::Validation("coordinates out of range".into()));
    }
    Ok(())
}

/// Search window around a point. Longitude may need two ranges when the
/// window crosses the antimeridian.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoBox {
    pub lat: (f64, f64),
    pub lng: Vec<(f64, f64)>,
}

pub fn bounding_box(lat: f64, lng: f64, radius_km: f64) -> GeoBox {
    let dlat = radius_km / KM_PER_DEGREE;
    let cos = lat.to_radians().cos().abs().max(0.01);
    let dlng = radius_km / (KM_PER_DEGREE * cos);
    let lat_span = ((lat - dlat).max(-90.0), (lat + dlat).min(90.0));
    let (lo, hi) = (lng - dlng, lng + dlng);

    let lng_spans = if dlng >= 180.0 || lat_span.0 <= -90.0 || lat_span.1 >= 90.0 {
        vec![(-180.0, 180.0)]
    } else if lo < -180.0 {
        vec![(lo + 360.0, 180.0), (-180.0, hi)]
    } else if hi > 180.0 {
        vec![(lo, 180.0), (-180.0, hi - 360.0)]
    } else {
        vec![(lo, hi)]
    };
    GeoBox { lat: lat_span, lng: lng_spans }
}

async fn replace_tags<C: ConnectionTrait>(db: &C, service_id: Uuid, names: &[String]) -> Result<Vec<String>, ServiceError> {
    service_tag::Entity::delete_many()
        .filter(service_tag::Column::ServiceId.eq(service_id))
        .exec(db)
        .await?;
    let mut slugs: Vec<String> = Vec::new();
    for name in names.iter().filter(|n| !n.trim().is_empty()) {
        let t = tag::find_or_create(db, name).await?;
        if slugs.contains(&t.slug) {
            continue;
        }
        service_tag::ActiveModel {
            id: Set(Uuid::new_v4()),
            service_id: Set(service_id),
            tag_id: Set(t.id),
        }
        .insert(db)
        .await?;
        slugs.push(t.slug);
    }
    Ok(slugs)
}

async fn tags_for<C: ConnectionTrait>(db: &C, ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<String>>, ServiceError> {
    let mut out: HashMap<Uuid, Vec<String>> = HashMap::new();
    if ids.is_empty() {
        return Ok(out);
    }
    let rows = service_tag::Entity::find()
        .filter(service_tag::Column::ServiceId.is_in(ids.to_vec()))
        .find_also_related(tag::Entity)
        .all(db)
        .await?;
    for (link, t) in rows {
        if let Some(t) = t {
            out.entry(link.service_id).or_default().push(t.slug);
        }
    }
    Ok(out)
}

#[derive(Clone)]
pub struct Catalog {
    db: DatabaseConnection,
}

impl Catalog {
    pub fn new(db: DatabaseConnection) -> Self { Self { db } }

    #[instrument(skip(self, input), fields(user_id = %actor.user_id))]
    pub async fn create_service(&self, actor: &Actor, input: NewService) -> Result<ServiceView, ServiceError> {
        if input.title.trim().is_empty() {
            return Err(ServiceError::Validation("title required".into()));
        }
        validate_hours_and_capacity(input.estimated_hours, input.capacity)?;
        validate_location(input.latitude, input.longitude)?;

        let txn = self.db.begin().await?;
        users::ensure_unrestricted(&txn, actor.user_id).await?;
        let now = Utc::now();
        let created = service::ActiveModel {
            id: Set(Uuid::new_v4()),
            owner_id: Set(actor.user_id),
            service_type: Set(input.service_type),
            title: Set(input.title.trim().to_string()),
            description: Set(input.description),
            status: Set(ServiceStatus::Active),
            estimated_hours: Set(input.estimated_hours),
            capacity: Set(input.capacity.unwrap_or(1)),
            latitude: Set(input.latitude),
            longitude: Set(input.longitude),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            deleted_at: Set(None),
        }
        .insert(&txn)
        .await?;
        let tags = replace_tags(&txn, created.id, &input.tags).await?;
        txn.commit().await?;

        info!(event = "service_created", service_id = %created.id);
        Ok(ServiceView { service: created, tags })
    }

    /// Owner only; fields left `None` are kept.
    #[instrument(skip(self, input), fields(user_id = %actor.user_id))]
    pub async fn update_service(&self, actor: &Actor, id: Uuid, input: ServiceUpdate) -> Result<ServiceView, ServiceError> {
        validate_hours_and_capacity(input.estimated_hours, input.capacity)?;
        validate_location(input.latitude, input.longitude)?;
        let txn = self.db.begin().await?;
        let svc = service::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .filter(|s| !s.is_deleted())
            .ok_or_else(|| ServiceError::not_found("service"))?;
        if svc.owner_id != actor.user_id {
            return Err(ServiceError::PermissionDenied("only the owner may edit a service".into()));
        }

        let mut am: service::ActiveModel = svc.into();
        if let Some(title) = input.title {
            if title.trim().is_empty() {
                return Err(ServiceError::Validation("title required".into()));
            }
            am.title = Set(title.trim().to_string());
        }
        if let Some(description) = input.description { am.description = Set(description); }
        if let Some(status) = input.status { am.status = Set(status); }
        if let Some(h) = input.estimated_hours { am.estimated_hours = Set(Some(h)); }
        if let Some(c) = input.capacity { am.capacity = Set(c); }
        if let Some(lat) = input.latitude { am.latitude = Set(Some(lat)); }
        if let Some(lng) = input.longitude { am.longitude = Set(Some(lng)); }
        am.updated_at = Set(Utc::now().into());
        let updated = am.update(&txn).await?;

        let tags = match input.tags {
            Some(names) => replace_tags(&txn, id, &names).await?,
            None => tags_for(&txn, &[id]).await?.remove(&id).unwrap_or_default(),
        };
        txn.commit().await?;
        Ok(ServiceView { service: updated, tags })
    }

    pub async fn get_service(&self, id: Uuid) -> Result<ServiceView, ServiceError> {
        let svc = service::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .filter(|s| !s.is_deleted())
            .ok_or_else(|| ServiceError::not_found("service"))?;
        let tags = tags_for(&self.db, &[id]).await?.remove(&id).unwrap_or_default();
        Ok(ServiceView { service: svc, tags })
    }

    /// Tags by name, optionally narrowed to names or slugs containing `search`.
    pub async fn list_tags(&self, search: Option<&str>, page: Pagination) -> Result<Vec<tag::Model>, ServiceError> {
        let mut q = tag::Entity::find().order_by_asc(tag::Column::Name);
        if let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) {
            let mut cond = Condition::any().add(tag::Column::Name.contains(term));
            let slug = tag::slugify(term);
            if !slug.is_empty() {
                cond = cond.add(tag::Column::Slug.contains(slug.as_str()));
            }
            q = q.filter(cond);
        }
        let (page_idx, per_page) = page.normalize();
        Ok(q.paginate(&self.db, per_page).fetch_page(page_idx).await?)
    }

    /// The most used tags across live services. Unused tags are left out;
    /// ties go to the alphabetically first name.
    pub async fn popular_tags(&self) -> Result<Vec<TagCount>, ServiceError> {
        let links: Vec<Uuid> = service_tag::Entity::find()
            .select_only()
            .column(service_tag::Column::TagId)
            .inner_join(service::Entity)
            .filter(service::Column::DeletedAt.is_null())
            .into_tuple()
            .all(&self.db)
            .await?;
        let mut counts: HashMap<Uuid, u64> = HashMap::new();
        for tag_id in links {
            *counts.entry(tag_id).or_default() += 1;
        }
        if counts.is_empty() {
            return Ok(Vec::new());
        }
        let tags = tag::Entity::find()
            .filter(tag::Column::Id.is_in(counts.keys().copied().collect::<Vec<_>>()))
            .all(&self.db)
            .await?;
        let mut ranked: Vec<TagCount> = tags
            .into_iter()
            .map(|t| {
                let service_count = counts.get(&t.id).copied().unwrap_or(0);
                TagCount { tag: t, service_count }
            })
            .collect();
        ranked.sort_by(|a, b| b.service_count.cmp(&a.service_count).then_with(|| a.tag.name.cmp(&b.tag.name)));
        ranked.truncate(POPULAR_TAG_LIMIT);
        Ok(ranked)
    }

    /// Newest first; soft-deleted services never appear.
    pub async fn list_services(&self, filter: ServiceFilter, page: Pagination) -> Result<Vec<ServiceView>, ServiceError> {
        let mut q = service::Entity::find()
            .filter(service::Column::DeletedAt.is_null())
            .order_by_desc(service::Column::CreatedAt);
        if let Some(t) = filter.service_type { q = q.filter(service::Column::ServiceType.eq(t)); }
        if let Some(s) = filter.status { q = q.filter(service::Column::Status.eq(s)); }
        if let Some(owner) = filter.owner_id { q = q.filter(service::Column::OwnerId.eq(owner)); }
        if let Some(slug) = filter.tag.as_deref() {
            let Some(t) = tag::Entity::find().filter(tag::Column::Slug.eq(slug)).one(&self.db).await? else {
                return Ok(Vec::new());
            };
            let ids: Vec<Uuid> = service_tag::Entity::find()
                .select_only()
                .column(service_tag::Column::ServiceId)
                .filter(service_tag::Column::TagId.eq(t.id))
                .into_tuple()
                .all(&self.db)
                .await?;
            q = q.filter(service::Column::Id.is_in(ids));
        }
        if let (Some(lat), Some(lng), Some(radius)) = (filter.lat, filter.lng, filter.radius_km) {
            if radius <= 0.0 || !radius.is_finite() {
                return Err(ServiceError::Validation("radius_km must be positive".into()));
            }
            let area = bounding_box(lat, lng, radius);
            let lng_match = area
                .lng
                .iter()
                .fold(Condition::any(), |c, (lo, hi)| c.add(service::Column::Longitude.between(*lo, *hi)));
            q = q
                .filter(service::Column::Latitude.between(area.lat.0, area.lat.1))
                .filter(lng_match);
        }

        let (page_idx, per_page) = page.normalize();
        let services = q.paginate(&self.db, per_page).fetch_page(page_idx).await?;
        let ids: Vec<Uuid> = services.iter().map(|s| s.id).collect();
        let mut tags = tags_for(&self.db, &ids).await?;
        Ok(services
            .into_iter()
            .map(|s| {
                let t = tags.remove(&s.id).unwrap_or_default();
                ServiceView { service: s, tags: t }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{member, memory_db};
    use models::user;

    fn offer(title: &str, tags: &[&str], at: Option<(f64, f64)>) -> NewService {
        NewService {
            service_type: ServiceType::Offer,
            title: title.into(),
            description: String::new(),
            estimated_hours: Some(2),
            capacity: None,
            latitude: at.map(|p| p.0),
            longitude: at.map(|p| p.1),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[test]
    fn bounding_box_widens_longitude_away_from_equator() {
        let area = bounding_box(60.0, 10.0, 11.1);
        assert!((area.lat.1 - area.lat.0 - 0.2).abs() < 1e-9);
        assert_eq!(area.lng.len(), 1);
        assert!(area.lng[0].1 - area.lng[0].0 > 0.39);
    }

    #[test]
    fn bounding_box_splits_at_the_antimeridian() {
        let east = bounding_box(-17.7, 179.9, 50.0);
        assert_eq!(east.lng.len(), 2);
        assert_eq!(east.lng[0].1, 180.0);
        assert_eq!(east.lng[1].0, -180.0);
        assert!(east.lng[1].1 > -179.9 && east.lng[1].1 < -179.0);

        let west = bounding_box(-17.7, -179.9, 50.0);
        assert_eq!(west.lng.len(), 2);
        assert!(west.lng[0].0 > 179.0 && west.lng[0].0 < 179.9);

        let polar = bounding_box(89.9, 0.0, 50.0);
        assert_eq!(polar.lng, vec![(-180.0, 180.0)]);
        assert_eq!(polar.lat.1, 90.0);
    }

    #[tokio::test]
    async fn create_filter_and_update() -> Result<(), anyhow::Error> {
        let db = memory_db().await?;
        let owner = member(&db, "Hal", false).await?;
        let other = member(&db, "Ivy", false).await?;
        let catalog = Catalog::new(db.clone());
        let actor = Actor::member(owner.id);

        let garden = catalog.create_service(&actor, offer("Garden", &["Gardening", "Outdoor"], Some((41.01, 28.97)))).await?;
        assert_eq!(garden.service.capacity, 1);
        assert_eq!(garden.tags, vec!["gardening".to_string(), "outdoor".to_string()]);
        catalog.create_service(&actor, offer("Math tutoring", &["Education"], Some((39.93, 32.86)))).await?;

        let tagged = catalog
            .list_services(ServiceFilter { tag: Some("outdoor".into()), ..ServiceFilter::default() }, Pagination::default())
            .await?;
        assert_eq!(tagged.len(), 1);

        let near = catalog
            .list_services(
                ServiceFilter { lat: Some(41.0), lng: Some(29.0), radius_km: Some(10.0), ..ServiceFilter::default() },
                Pagination::default(),
            )
            .await?;
        assert_eq!(near.len(), 1);
        assert_eq!(near[0].service.id, garden.service.id);

        let fiji = catalog.create_service(&actor, offer("Boat repair", &[], Some((-16.8, -179.95)))).await?;
        let across = catalog
            .list_services(
                ServiceFilter { lat: Some(-16.8), lng: Some(179.95), radius_km: Some(25.0), ..ServiceFilter::default() },
                Pagination::default(),
            )
            .await?;
        assert_eq!(across.iter().map(|v| v.service.id).collect::<Vec<_>>(), vec![fiji.service.id]);

        let err = catalog
            .update_service(&Actor::member(other.id), garden.service.id, ServiceUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::PermissionDenied(_)));

        let updated = catalog
            .update_service(
                &actor,
                garden.service.id,
                ServiceUpdate { capacity: Some(3), tags: Some(vec!["Outdoor".into()]), ..ServiceUpdate::default() },
            )
            .await?;
        assert_eq!(updated.service.capacity, 3);
        assert_eq!(updated.tags, vec!["outdoor".to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn tag_search_and_popularity() -> Result<(), anyhow::Error> {
        let db = memory_db().await?;
        let owner = member(&db, "Kai", false).await?;
        let catalog = Catalog::new(db.clone());
        let actor = Actor::member(owner.id);

        catalog.create_service(&actor, offer("Pruning", &["Gardening", "Outdoor"], None)).await?;
        catalog.create_service(&actor, offer("Planting", &["Gardening"], None)).await?;
        let hike = catalog.create_service(&actor, offer("Hiking", &["Outdoor", "Home Repair"], None)).await?;
        tag::find_or_create(&db, "Unused").await?;

        let found = catalog.list_tags(Some("GARD"), Pagination::default()).await?;
        assert_eq!(found.iter().map(|t| t.slug.as_str()).collect::<Vec<_>>(), vec!["gardening"]);
        let spaced = catalog.list_tags(Some("home repair"), Pagination::default()).await?;
        assert_eq!(spaced.len(), 1);
        assert_eq!(catalog.list_tags(None, Pagination::default()).await?.len(), 4);

        let mut am: service::ActiveModel = hike.service.into();
        am.deleted_at = Set(Some(Utc::now().into()));
        am.update(&db).await?;

        let popular = catalog.popular_tags().await?;
        let ranked: Vec<(&str, u64)> = popular.iter().map(|t| (t.tag.slug.as_str(), t.service_count)).collect();
        assert_eq!(ranked, vec![("gardening", 2), ("outdoor", 1)]);
        Ok(())
    }

    #[tokio::test]
    async fn validation_and_restriction() -> Result<(), anyhow::Error> {
        let db = memory_db().await?;
        let u = member(&db, "Jon", false).await?;
        let catalog = Catalog::new(db.clone());
        let actor = Actor::member(u.id);

        let mut bad = offer("x", &[], None);
        bad.estimated_hours = Some(0);
        assert!(matches!(catalog.create_service(&actor, bad).await, Err(ServiceError::Validation(_))));
        assert!(matches!(catalog.create_service(&actor, offer("  ", &[], None)).await, Err(ServiceError::Validation(_))));

        let mut am: user::ActiveModel = u.into();
        am.status = Set(user::UserStatus::Banned);
        am.update(&db).await?;
        assert!(matches!(
            catalog.create_service(&actor, offer("Anything", &[], None)).await,
            Err(ServiceError::PermissionDenied(_))
        ));
        Ok(())
    }
}
