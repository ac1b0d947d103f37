use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use configs::{AppConfig, AuthSettings, DatabaseConfig};

async fn app() -> anyhow::Result<Router> {
    let cfg = AppConfig {
        database: DatabaseConfig { url: "sqlite::memory:".into(), ..DatabaseConfig::default() },
        auth: AuthSettings {
            jwt_secret: "integration-test-secret".into(),
            staff_emails: vec!["mod@hive.test".into()],
            ..AuthSettings::default()
        },
        ..AppConfig::default()
    };
    Ok(server::build_app(&cfg).await?)
}

async fn call(app: &Router, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> anyhow::Result<(StatusCode, Value)> {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(t) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    let req = match body {
        Some(b) => req.header(header::CONTENT_TYPE, "application/json").body(Body::from(serde_json::to_vec(&b)?))?,
        None => req.body(Body::empty())?,
    };
    let resp = app.clone().oneshot(req).await?;
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await?;
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap_or(Value::Null) };
    Ok((status, value))
}

async fn signup(app: &Router, email: &str, name: &str) -> anyhow::Result<String> {
    let (status, _) = call(app, "POST", "/auth/register", None, Some(json!({"email": email, "name": name, "password": "correct-horse"}))).await?;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = call(app, "POST", "/auth/login", None, Some(json!({"email": email, "password": "correct-horse"}))).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(body["token"].as_str().unwrap_or_default().to_string())
}

async fn balance(app: &Router, token: &str) -> anyhow::Result<i64> {
    let (status, body) = call(app, "GET", "/time-account/", Some(token), None).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(body["balance"].as_i64().unwrap_or(i64::MIN))
}

#[tokio::test]
async fn health_docs_and_metrics_are_public() -> anyhow::Result<()> {
    let app = app().await?;
    let (status, body) = call(&app, "GET", "/health", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "connected");
    let (status, doc) = call(&app, "GET", "/api-docs/openapi.json", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/service-requests/{id}/complete/"].is_object());

    let resp = app.clone().oneshot(Request::builder().uri("/metrics").body(Body::empty())?).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn sessions_gate_every_endpoint() -> anyhow::Result<()> {
    let app = app().await?;
    let (status, body) = call(&app, "GET", "/services", None, None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
    assert_eq!(body["code"], 2009);

    let token = signup(&app, "ada@hive.test", "Ada").await?;
    let (status, me) = call(&app, "GET", "/auth/me", Some(&token), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "ada@hive.test");
    assert_eq!(me["is_staff"], false);

    let (status, _) = call(&app, "POST", "/auth/register", None, Some(json!({"email": "ADA@hive.test", "name": "Ada", "password": "correct-horse"}))).await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = call(&app, "POST", "/auth/logout", Some(&token), None).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&app, "GET", "/auth/me", Some(&token), None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn offer_exchange_settles_once() -> anyhow::Result<()> {
    let app = app().await?;
    let owner = signup(&app, "olga@hive.test", "Olga").await?;
    let requester = signup(&app, "remy@hive.test", "Remy").await?;

    let (status, svc) = call(&app, "POST", "/services/", Some(&owner), Some(json!({
        "service_type": "offer", "title": "Bike repair", "estimated_hours": 2, "tags": ["Bikes"]
    }))).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(svc["tags"], json!(["bikes"]));
    let service_id = svc["id"].as_str().unwrap_or_default().to_string();

    let (status, listed) = call(&app, "GET", "/services?tag=bikes", Some(&requester), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().map(Vec::len), Some(1));

    let (status, req) = call(&app, "POST", "/service-requests/", Some(&requester), Some(json!({"service_id": service_id, "message": "Flat tyre"}))).await?;
    assert_eq!(status, StatusCode::CREATED);
    let id = req["id"].as_str().unwrap_or_default().to_string();

    let (status, _) = call(&app, "POST", &format!("/service-requests/{id}/set_status/"), Some(&requester), Some(json!({"status": "accepted"}))).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = call(&app, "POST", &format!("/service-requests/{id}/set_status/"), Some(&owner), Some(json!({"status": "accepted"}))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "accepted");

    let (_, body) = call(&app, "POST", &format!("/service-requests/{id}/complete"), Some(&owner), None).await?;
    assert_eq!(body["error"], "invalid_transition");

    for t in [&owner, &requester] {
        call(&app, "POST", &format!("/service-requests/{id}/approve_start"), Some(t), None).await?;
    }
    for t in [&owner, &requester] {
        let (status, _) = call(&app, "POST", &format!("/service-requests/{id}/complete/"), Some(t), None).await?;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, body) = call(&app, "POST", &format!("/service-requests/{id}/complete/"), Some(&requester), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");

    assert_eq!(balance(&app, &owner).await?, 300);
    assert_eq!(balance(&app, &requester).await?, 60);

    let (_, txs) = call(&app, "GET", "/time-transactions/?kind=credit", Some(&owner), None).await?;
    assert_eq!(txs.as_array().map(Vec::len), Some(1));
    Ok(())
}

#[tokio::test]
async fn banned_member_cannot_list_services() -> anyhow::Result<()> {
    let app = app().await?;
    let offender = signup(&app, "otto@hive.test", "Otto").await?;
    let reporter = signup(&app, "rita@hive.test", "Rita").await?;
    let staff = signup(&app, "mod@hive.test", "Mod").await?;

    let (_, svc) = call(&app, "POST", "/services", Some(&offender), Some(json!({"service_type": "offer", "title": "Cheap watches"}))).await?;
    let report_body = json!({"content_type": "service", "object_id": svc["id"], "reason": "spam"});
    let (status, report) = call(&app, "POST", "/reports/", Some(&reporter), Some(report_body.clone())).await?;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = call(&app, "POST", "/reports/", Some(&reporter), Some(report_body)).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "duplicate_report");

    let id = report["id"].as_str().unwrap_or_default().to_string();
    let (status, _) = call(&app, "POST", &format!("/reports/{id}/ban_user/"), Some(&reporter), Some(json!({"reason": "spam"}))).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, closed) = call(&app, "POST", &format!("/reports/{id}/ban_user/"), Some(&staff), Some(json!({"reason": "spam"}))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(closed["resolution"], "user_banned");

    let (status, _) = call(&app, "POST", "/services/", Some(&offender), Some(json!({"service_type": "need", "title": "Anything"}))).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, convs) = call(&app, "GET", "/conversations/", Some(&offender), None).await?;
    assert_eq!(convs.as_array().map(Vec::len), Some(1));
    assert_eq!(convs[0]["unread_count"], 1);

    let (status, stats) = call(&app, "GET", "/admin/stats", Some(&staff), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["restricted_users"], 1);

    let (status, bans) = call(&app, "GET", "/moderation-actions/?action=user_banned", Some(&staff), None).await?;
    assert_eq!(status, StatusCode::OK);
    let action_id = bans[0]["id"].as_str().unwrap_or_default().to_string();
    let (status, reversed) = call(&app, "POST", &format!("/moderation-actions/{action_id}/reverse/"), Some(&staff), Some(json!({"reason": "appeal"}))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reversed["is_reversed"], true);
    let (status, _) = call(&app, "POST", "/services/", Some(&offender), Some(json!({"service_type": "need", "title": "Anything"}))).await?;
    assert_eq!(status, StatusCode::CREATED);
    Ok(())
}

#[tokio::test]
async fn profiles_tags_and_thank_you_notes() -> anyhow::Result<()> {
    let app = app().await?;
    let helper = signup(&app, "hugo@hive.test", "Hugo").await?;
    let neighbour = signup(&app, "nell@hive.test", "Nell").await?;

    let (status, me) = call(&app, "PATCH", "/me/", Some(&helper), Some(json!({
        "display_name": "Hugo the Fixer", "preferred_languages": ["en", "TR"]
    }))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["preferred_languages"], json!(["en", "tr"]));
    assert_eq!(me["balance_minutes"], 180);
    let helper_id = me["user_id"].as_str().unwrap_or_default().to_string();
    let (status, public) = call(&app, "GET", &format!("/profiles/{helper_id}"), Some(&neighbour), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(public["display_name"], "Hugo the Fixer");
    assert!(public.get("email").is_none());

    for title in ["Bike repair", "Wheel truing"] {
        call(&app, "POST", "/services/", Some(&helper), Some(json!({"service_type": "offer", "title": title, "tags": ["Bikes"]}))).await?;
    }
    let (_, popular) = call(&app, "GET", "/tags/popular/", Some(&neighbour), None).await?;
    assert_eq!(popular[0]["slug"], "bikes");
    assert_eq!(popular[0]["service_count"], 2);
    let (_, found) = call(&app, "GET", "/tags/?search=bik", Some(&neighbour), None).await?;
    assert_eq!(found.as_array().map(Vec::len), Some(1));

    let (status, note) = call(&app, "POST", "/thank-you-notes/", Some(&neighbour), Some(json!({"to_user_id": helper_id, "message": "Great job!"}))).await?;
    assert_eq!(status, StatusCode::CREATED);
    let note_id = note["id"].as_str().unwrap_or_default().to_string();
    let (status, _) = call(&app, "POST", &format!("/thank-you-notes/{note_id}/mark_read/"), Some(&neighbour), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (_, read) = call(&app, "POST", &format!("/thank-you-notes/{note_id}/mark_read/"), Some(&helper), None).await?;
    assert_eq!(read["status"], "read");
    let (_, inbox) = call(&app, "GET", "/thank-you-notes/?received=true", Some(&helper), None).await?;
    assert_eq!(inbox.as_array().map(Vec::len), Some(1));
    let (status, _) = call(&app, "DELETE", &format!("/thank-you-notes/{note_id}/"), Some(&helper), None).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);
    Ok(())
}
