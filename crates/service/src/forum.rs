//! Community forum: threads and their posts.

use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use common::pagination::Pagination;
use models::{
    post::{self, PostStatus},
    service,
    thread::{self, ThreadStatus},
};

use crate::{actor::Actor, errors::ServiceError, users};

#[derive(Debug, Clone, Deserialize)]
pub struct NewThread {
    pub title: String,
    pub related_service_id: Option<Uuid>,
    /// Opening post, optional.
    pub body: Option<String>,
}

#[derive(Clone)]
pub struct Forum {
    db: DatabaseConnection,
}

impl Forum {
    pub fn new(db: DatabaseConnection) -> Self { Self { db } }

    #[instrument(skip(self, input), fields(user_id = %actor.user_id))]
    pub async fn create_thread(&self, actor: &Actor, input: NewThread) -> Result<thread::Model, ServiceError> {
        let title = input.title.trim();
        if title.is_empty() {
            return Err(ServiceError::Validation("title required".into()));
        }
        let txn = self.db.begin().await?;
        users::ensure_unrestricted(&txn, actor.user_id).await?;
        if let Some(sid) = input.related_service_id {
            service::Entity::find_by_id(sid)
                .one(&txn)
                .await?
                .filter(|s| !s.is_deleted())
                .ok_or_else(|| ServiceError::not_found("service"))?;
        }
        let now = Utc::now();
        let created = thread::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(title.to_string()),
            author_id: Set(actor.user_id),
            status: Set(ThreadStatus::Open),
            related_service_id: Set(input.related_service_id),
            views_count: Set(0),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            deleted_at: Set(None),
        }
        .insert(&txn)
        .await?;
        if let Some(body) = input.body.as_deref().map(str::trim).filter(|b| !b.is_empty()) {
            insert_post(&txn, created.id, actor.user_id, body).await?;
        }
        txn.commit().await?;
        info!(event = "thread_created", thread_id = %created.id);
        Ok(created)
    }

    /// Pinned threads first, then most recently active.
    pub async fn list_threads(&self, status: Option<ThreadStatus>, page: Pagination) -> Result<Vec<thread::Model>, ServiceError> {
        let mut q = thread::Entity::find().filter(thread::Column::DeletedAt.is_null());
        if let Some(s) = status {
            q = q.filter(thread::Column::Status.eq(s));
        }
        let (page_idx, per_page) = page.normalize();
        let mut threads = q
            .order_by_desc(thread::Column::UpdatedAt)
            .paginate(&self.db, per_page)
            .fetch_page(page_idx)
            .await?;
        threads.sort_by_key(|t| t.status != ThreadStatus::Pinned);
        Ok(threads)
    }

    /// Fetch a thread and count the view.
    pub async fn get_thread(&self, id: Uuid) -> Result<thread::Model, ServiceError> {
        let res = thread::Entity::update_many()
            .col_expr(thread::Column::ViewsCount, Expr::col(thread::Column::ViewsCount).add(1))
            .filter(thread::Column::Id.eq(id))
            .filter(thread::Column::DeletedAt.is_null())
            .exec(&self.db)
            .await?;
        if res.rows_affected == 0 {
            return Err(ServiceError::not_found("thread"));
        }
        thread::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("thread"))
    }

    /// Author or staff may close, reopen or pin a thread.
    pub async fn set_thread_status(&self, actor: &Actor, id: Uuid, status: ThreadStatus) -> Result<thread::Model, ServiceError> {
        let t = thread::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .filter(|t| t.deleted_at.is_none())
            .ok_or_else(|| ServiceError::not_found("thread"))?;
        if status == ThreadStatus::Pinned && !actor.is_staff {
            return Err(ServiceError::PermissionDenied("only staff may pin threads".into()));
        }
        if t.author_id != actor.user_id && !actor.is_staff {
            return Err(ServiceError::PermissionDenied("only the author may change this thread".into()));
        }
        let mut am: thread::ActiveModel = t.into();
        am.status = Set(status);
        am.updated_at = Set(Utc::now().into());
        Ok(am.update(&self.db).await?)
    }

    #[instrument(skip(self, body), fields(user_id = %actor.user_id))]
    pub async fn create_post(&self, actor: &Actor, thread_id: Uuid, body: &str) -> Result<post::Model, ServiceError> {
        let body = body.trim();
        if body.is_empty() {
            return Err(ServiceError::Validation("post body required".into()));
        }
        let txn = self.db.begin().await?;
        users::ensure_unrestricted(&txn, actor.user_id).await?;
        let t = thread::Entity::find_by_id(thread_id)
            .one(&txn)
            .await?
            .filter(|t| t.deleted_at.is_none())
            .ok_or_else(|| ServiceError::not_found("thread"))?;
        if !t.status.accepts_posts() {
            return Err(ServiceError::InvalidTransition("thread is closed".into()));
        }
        let created = insert_post(&txn, thread_id, actor.user_id, body).await?;
        let mut am: thread::ActiveModel = t.into();
        am.updated_at = Set(Utc::now().into());
        am.update(&txn).await?;
        txn.commit().await?;
        Ok(created)
    }

    /// Visible posts of a live thread, oldest first.
    pub async fn list_posts(&self, thread_id: Uuid, page: Pagination) -> Result<Vec<post::Model>, ServiceError> {
        thread::Entity::find_by_id(thread_id)
            .one(&self.db)
            .await?
            .filter(|t| t.deleted_at.is_none())
            .ok_or_else(|| ServiceError::not_found("thread"))?;
        let (page_idx, per_page) = page.normalize();
        Ok(post::Entity::find()
            .filter(post::Column::ThreadId.eq(thread_id))
            .filter(post::Column::DeletedAt.is_null())
            .filter(post::Column::Status.eq(PostStatus::Published))
            .order_by_asc(post::Column::CreatedAt)
            .paginate(&self.db, per_page)
            .fetch_page(page_idx)
            .await?)
    }
}

async fn insert_post<C: sea_orm::ConnectionTrait>(db: &C, thread_id: Uuid, author: Uuid, body: &str) -> Result<post::Model, ServiceError> {
    let now = Utc::now();
    Ok(post::ActiveModel {
        id: Set(Uuid::new_v4()),
        thread_id: Set(thread_id),
        author_id: Set(author),
        body: Set(body.to_string()),
        status: Set(PostStatus::Published),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        deleted_at: Set(None),
    }
    .insert(db)
    .await?)
}
