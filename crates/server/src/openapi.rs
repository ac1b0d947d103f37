use utoipa::OpenApi;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(ToSchema)]
pub struct HealthResponse { pub status: String, pub database: String }

#[derive(ToSchema)]
pub struct RegisterRequest { pub email: String, pub name: String, pub password: String }

#[derive(ToSchema)]
pub struct LoginRequest { pub email: String, pub password: String }

#[derive(ToSchema)]
pub struct NewServiceDoc {
    /// `offer` or `need`
    pub service_type: String,
    pub title: String,
    pub description: Option<String>,
    pub estimated_hours: Option<i32>,
    pub capacity: Option<i32>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub tags: Option<Vec<String>>,
}

#[derive(ToSchema)]
pub struct CreateRequestDoc { pub service_id: Uuid, pub message: Option<String> }

#[derive(ToSchema)]
pub struct SetStatusDoc {
    /// `accepted` or `rejected`
    pub status: String,
}

#[derive(ToSchema)]
pub struct UpdateHoursDoc { pub actual_hours: f64 }

#[derive(ToSchema)]
pub struct SendMessageDoc { pub body: String }

#[derive(ToSchema)]
pub struct NewThreadDoc { pub title: String, pub related_service_id: Option<Uuid>, pub body: Option<String> }

#[derive(ToSchema)]
pub struct NewPostDoc { pub body: String }

#[derive(ToSchema)]
pub struct NewReportDoc {
    /// `service`, `user`, `post` or `thread`
    pub content_type: String,
    pub object_id: Uuid,
    pub reason: String,
    pub description: Option<String>,
    pub evidence_url: Option<String>,
}

#[derive(ToSchema)]
pub struct BanDoc { pub reason: String }

#[derive(ToSchema)]
pub struct SuspendDoc {
    pub reason: String,
    /// Defaults to 7
    pub days: Option<i32>,
}

#[derive(ToSchema)]
pub struct ReverseDoc { pub reason: String }

#[derive(ToSchema)]
pub struct ProfileUpdateDoc {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    /// http(s) URL; empty clears it
    pub avatar_url: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub preferred_languages: Option<Vec<String>>,
}

#[derive(ToSchema)]
pub struct NewNoteDoc { pub to_user_id: Uuid, pub message: String, pub service_id: Option<Uuid> }

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::auth::register,
        crate::routes::auth::login,
        crate::routes::auth::logout,
        crate::routes::auth::me,
        crate::routes::profiles::me,
        crate::routes::profiles::update_me,
        crate::routes::profiles::get,
        crate::routes::catalog::list,
        crate::routes::catalog::create,
        crate::routes::catalog::get,
        crate::routes::catalog::update,
        crate::routes::catalog::tags,
        crate::routes::catalog::popular_tags,
        crate::routes::requests::list,
        crate::routes::requests::create,
        crate::routes::requests::get,
        crate::routes::requests::set_status,
        crate::routes::requests::approve_start,
        crate::routes::requests::complete,
        crate::routes::requests::update_hours,
        crate::routes::requests::approve_hours,
        crate::routes::ledger::account,
        crate::routes::ledger::transactions,
        crate::routes::messaging::list,
        crate::routes::messaging::messages,
        crate::routes::messaging::send,
        crate::routes::messaging::mark_read,
        crate::routes::thanks::list,
        crate::routes::thanks::send,
        crate::routes::thanks::get,
        crate::routes::thanks::mark_read,
        crate::routes::thanks::archive,
        crate::routes::thanks::delete,
        crate::routes::forum::list_threads,
        crate::routes::forum::create_thread,
        crate::routes::forum::get_thread,
        crate::routes::forum::list_posts,
        crate::routes::forum::create_post,
        crate::routes::moderation::list,
        crate::routes::moderation::create,
        crate::routes::moderation::get,
        crate::routes::moderation::review,
        crate::routes::moderation::resolve,
        crate::routes::moderation::dismiss,
        crate::routes::moderation::ban_user,
        crate::routes::moderation::suspend_user,
        crate::routes::moderation::delete_content,
        crate::routes::moderation::list_actions,
        crate::routes::moderation::reverse_action,
        crate::routes::admin::stats,
    ),
    components(
        schemas(
            HealthResponse,
            RegisterRequest,
            LoginRequest,
            NewServiceDoc,
            CreateRequestDoc,
            SetStatusDoc,
            UpdateHoursDoc,
            SendMessageDoc,
            NewThreadDoc,
            NewPostDoc,
            NewReportDoc,
            BanDoc,
            SuspendDoc,
            ReverseDoc,
            ProfileUpdateDoc,
            NewNoteDoc,
        )
    ),
    tags(
        (name = "health"),
        (name = "auth"),
        (name = "profiles"),
        (name = "catalog"),
        (name = "requests"),
        (name = "ledger"),
        (name = "messaging"),
        (name = "thanks"),
        (name = "forum"),
        (name = "moderation"),
        (name = "admin")
    )
)]
pub struct ApiDoc;
