use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Path, Query, State},
    http::{request::Parts, StatusCode},
    routing::{get, patch, post},
    Json, Router,
};
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    config::Config,
    geo::is_valid_point,
    geocode::ReverseGeocoder,
    model::{
        GeoPoint, NewReport, NotificationItem, Report, ReportCategory, ReportFilters, ReportPatch,
    },
    notifications::NotificationSink,
    openapi, seed,
    store::ReportStore,
};

pub const MAX_ATTACHMENTS: usize = 2;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USERNAME_HEADER: &str = "x-username";
pub const ROLE_HEADER: &str = "x-user-role";

type ApiError = (StatusCode, String);

#[derive(Clone)]
pub struct AppState {
    pub reports: Arc<dyn ReportStore>,
    pub notifications: Arc<dyn NotificationSink>,
    pub geocoder: Option<Arc<ReverseGeocoder>>,
    pub config: Arc<Config>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Citizen,
    Admin,
}

impl Role {
    fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "citizen" => Some(Role::Citizen),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// Caller identity as resolved by the upstream authenticator.
#[derive(Debug, Clone)]
pub struct Caller {
    pub user_id: String,
    pub username: Option<String>,
    pub role: Option<Role>,
}

impl Caller {
    fn require(&self, role: Role) -> Result<(), ApiError> {
        if self.role == Some(role) {
            Ok(())
        } else {
            Err((StatusCode::FORBIDDEN, format!("{:?} role required", role)))
        }
    }
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let user_id = header(USER_ID_HEADER)
            .ok_or((StatusCode::UNAUTHORIZED, "Missing caller identity".to_string()))?;
        Ok(Caller {
            user_id,
            username: header(USERNAME_HEADER),
            role: header(ROLE_HEADER).as_deref().and_then(Role::parse),
        })
    }
}

fn bad_request(msg: impl Into<String>) -> ApiError {
    (StatusCode::BAD_REQUEST, msg.into())
}

fn not_found(id: u64) -> ApiError {
    (StatusCode::NOT_FOUND, format!("Report {} not found", id))
}

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    status: String,
    service: String,
    version: String,
}

/// GET /health
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service health", body = HealthResponse))
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn get_config_info(State(state): State<AppState>) -> Json<serde_json::Value> {
    let config = &state.config;
    Json(serde_json::json!({
        "server_port": config.server_port,
        "seed_report_count": config.seed_report_count,
        "community_radius_km": config.community_radius_km,
        "geocode_enabled": config.geocode_enabled,
        "geocoder_url": config.geocoder_url,
    }))
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportRequest {
    pub title: String,
    pub description: String,
    pub category: Option<ReportCategory>,
    #[serde(default)]
    pub attachments: Vec<String>,
    pub location: Option<GeoPoint>,
    pub location_name: Option<String>,
}

fn validate_create(body: &CreateReportRequest) -> Result<(), ApiError> {
    if body.title.trim().is_empty() {
        return Err(bad_request("Title is required"));
    }
    if body.description.trim().is_empty() {
        return Err(bad_request("Description is required"));
    }
    if body.attachments.len() > MAX_ATTACHMENTS {
        return Err(bad_request(format!("At most {} attachments are allowed", MAX_ATTACHMENTS)));
    }
    if let Some(location) = body.location {
        if !is_valid_point(location) {
            return Err(bad_request("Invalid coordinates"));
        }
    }
    Ok(())
}

/// POST /reports
#[utoipa::path(
    post,
    path = "/reports",
    request_body = CreateReportRequest,
    responses(
        (status = 200, description = "Created report", body = Report),
        (status = 400, description = "Invalid payload")
    )
)]
pub async fn create_report(
    State(state): State<AppState>,
    caller: Caller,
    Json(body): Json<CreateReportRequest>,
) -> Result<Json<Report>, ApiError> {
    caller.require(Role::Citizen)?;
    validate_create(&body)?;

    let mut location_name = body.location_name.filter(|n| !n.trim().is_empty());
    if location_name.is_none() {
        if let (Some(location), Some(geocoder)) = (body.location, state.geocoder.as_ref()) {
            match geocoder.reverse(location).await {
                Ok(name) => location_name = name,
                Err(e) => tracing::warn!("location name backfill failed: {}", e),
            }
        }
    }

    let report = state.reports.create(NewReport {
        title: body.title,
        description: body.description,
        category: body.category,
        created_by_user_id: caller.user_id,
        created_by_username: caller.username,
        attachments: body.attachments,
        location: body.location,
        location_name,
    });
    Ok(Json(report))
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    category: Option<ReportCategory>,
    q: Option<String>,
}

/// GET /reports
#[utoipa::path(
    get,
    path = "/reports",
    params(ListParams),
    responses((status = 200, description = "All reports, newest first", body = [Report]))
)]
pub async fn list_reports(
    State(state): State<AppState>,
    caller: Caller,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Report>>, ApiError> {
    caller.require(Role::Admin)?;
    let filters = ReportFilters {
        category: params.category,
        location_query: params.q,
    };
    Ok(Json(state.reports.list(&filters)))
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CommunityParams {
    lat: Option<String>,
    lng: Option<String>,
}

fn community_location(params: &CommunityParams) -> Result<Option<GeoPoint>, ApiError> {
    let (lat, lng) = match (params.lat.as_deref(), params.lng.as_deref()) {
        (None | Some(""), None | Some("")) => return Ok(None),
        (Some(lat), Some(lng)) => (lat, lng),
        _ => return Err(bad_request("Both lat and lng are required")),
    };
    let point = GeoPoint {
        lat: lat.trim().parse().map_err(|_| bad_request("Invalid coordinates"))?,
        lng: lng.trim().parse().map_err(|_| bad_request("Invalid coordinates"))?,
    };
    if !is_valid_point(point) {
        return Err(bad_request("Invalid coordinates"));
    }
    Ok(Some(point))
}

/// GET /reports/community
#[utoipa::path(
    get,
    path = "/reports/community",
    params(CommunityParams),
    responses((status = 200, description = "Reports near the caller", body = [Report]))
)]
pub async fn list_community_reports(
    State(state): State<AppState>,
    caller: Caller,
    Query(params): Query<CommunityParams>,
) -> Result<Json<Vec<Report>>, ApiError> {
    caller.require(Role::Citizen)?;
    let location = community_location(&params)?;
    Ok(Json(
        state
            .reports
            .list_by_area(location, state.config.community_radius_km),
    ))
}

/// GET /reports/mine
#[utoipa::path(
    get,
    path = "/reports/mine",
    responses((status = 200, description = "Reports created by the caller", body = [Report]))
)]
pub async fn list_my_reports(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<Vec<Report>>, ApiError> {
    caller.require(Role::Citizen)?;
    Ok(Json(state.reports.list_by_user(&caller.user_id)))
}

/// PATCH /reports/{id}
#[utoipa::path(
    patch,
    path = "/reports/{id}",
    params(("id" = u64, Path, description = "Report id")),
    request_body = ReportPatch,
    responses(
        (status = 200, description = "Updated report", body = Report),
        (status = 404, description = "No such report")
    )
)]
pub async fn update_report(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<u64>,
    Json(patch): Json<ReportPatch>,
) -> Result<Json<Report>, ApiError> {
    caller.require(Role::Admin)?;
    state
        .reports
        .update(id, patch)
        .map(Json)
        .ok_or_else(|| not_found(id))
}

/// POST /reports/{id}/upvote
#[utoipa::path(
    post,
    path = "/reports/{id}/upvote",
    params(("id" = u64, Path, description = "Report id")),
    responses(
        (status = 200, description = "Report after the vote", body = Report),
        (status = 404, description = "No such report")
    )
)]
pub async fn upvote_report(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<u64>,
) -> Result<Json<Report>, ApiError> {
    caller.require(Role::Citizen)?;
    state
        .reports
        .upvote(id, &caller.user_id)
        .map(Json)
        .ok_or_else(|| not_found(id))
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SeedResponse {
    message: String,
    count: usize,
}

/// POST /reports/test-seed
#[utoipa::path(
    post,
    path = "/reports/test-seed",
    responses((status = 200, description = "Demo reports added", body = SeedResponse))
)]
pub async fn add_test_reports(State(state): State<AppState>) -> Json<SeedResponse> {
    let mut rng = StdRng::from_entropy();
    let count = seed::add_test_reports(state.reports.as_ref(), &mut rng);
    Json(SeedResponse {
        message: "Test reports added".to_string(),
        count,
    })
}

/// GET /notifications
#[utoipa::path(
    get,
    path = "/notifications",
    responses((status = 200, description = "Caller notifications, newest first", body = [NotificationItem]))
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    caller: Caller,
) -> Json<Vec<NotificationItem>> {
    Json(state.notifications.list_for_user(&caller.user_id))
}

/// POST /notifications/read-all
#[utoipa::path(
    post,
    path = "/notifications/read-all",
    responses((status = 200, description = "All caller notifications marked read"))
)]
pub async fn mark_notifications_read(
    State(state): State<AppState>,
    caller: Caller,
) -> Json<serde_json::Value> {
    state.notifications.mark_all_read(&caller.user_id);
    Json(serde_json::json!({ "ok": true }))
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReverseGeocodeParams {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReverseGeocodeResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    location_name: Option<String>,
}

/// GET /geocode/reverse
#[utoipa::path(
    get,
    path = "/geocode/reverse",
    params(ReverseGeocodeParams),
    responses(
        (status = 200, description = "Resolved location name", body = ReverseGeocodeResponse),
        (status = 502, description = "Geocoder failure")
    )
)]
pub async fn reverse_geocode(
    State(state): State<AppState>,
    Query(params): Query<ReverseGeocodeParams>,
) -> Result<Json<ReverseGeocodeResponse>, ApiError> {
    let point = GeoPoint { lat: params.lat, lng: params.lng };
    if !is_valid_point(point) {
        return Err(bad_request("Invalid coordinates"));
    }
    let geocoder = state.geocoder.as_ref().ok_or((
        StatusCode::SERVICE_UNAVAILABLE,
        "Reverse geocoding is disabled".to_string(),
    ))?;
    let location_name = geocoder.reverse(point).await.map_err(|e| {
        tracing::error!("reverse geocoding error: {}", e);
        (StatusCode::BAD_GATEWAY, e.to_string())
    })?;
    Ok(Json(ReverseGeocodeResponse { location_name }))
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/config", get(get_config_info))
        .route("/reports", post(create_report).get(list_reports))
        .route("/reports/community", get(list_community_reports))
        .route("/reports/mine", get(list_my_reports))
        .route("/reports/test-seed", post(add_test_reports))
        .route("/reports/{id}", patch(update_report))
        .route("/reports/{id}/upvote", post(upvote_report))
        .route("/notifications", get(list_notifications))
        .route("/notifications/read-all", post(mark_notifications_read))
        .route("/geocode/reverse", get(reverse_geocode))
        .route("/api/openapi.json", get(openapi::openapi_json))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::Request,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::{notifications::InMemoryNotifications, reports_memory::InMemoryReports};

    fn test_app() -> Router {
        let notifications = Arc::new(InMemoryNotifications::new());
        let reports = Arc::new(InMemoryReports::new(notifications.clone()));
        create_router(AppState {
            reports,
            notifications,
            geocoder: None,
            config: Arc::new(Config {
                geocode_enabled: false,
                ..Config::default()
            }),
        })
    }

    async fn call(
        app: &Router,
        method: &str,
        uri: &str,
        who: Option<(&str, &str)>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some((user, role)) = who {
            req = req.header(USER_ID_HEADER, user).header(ROLE_HEADER, role);
        }
        let body = match body {
            Some(v) => {
                req = req.header("content-type", "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let response = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    const CITIZEN: Option<(&str, &str)> = Some(("citizen-1", "citizen"));
    const ADMIN: Option<(&str, &str)> = Some(("admin-1", "admin"));

    #[tokio::test]
    async fn test_identity_and_roles_are_enforced() {
        let app = test_app();
        let body = json!({"title": "Pothole", "description": "Large pothole"});

        let (status, _) = call(&app, "POST", "/reports", None, Some(body.clone())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = call(&app, "POST", "/reports", ADMIN, Some(body)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = call(&app, "GET", "/reports", CITIZEN, None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_create_validation() {
        let app = test_app();
        let cases = [
            json!({"title": " ", "description": "x"}),
            json!({"title": "x", "description": ""}),
            json!({"title": "x", "description": "y", "location": {"lat": 91.0, "lng": 0.0}}),
            json!({"title": "x", "description": "y", "attachments": ["a", "b", "c"]}),
        ];
        for body in cases {
            let (status, _) = call(&app, "POST", "/reports", CITIZEN, Some(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn test_report_lifecycle() {
        let app = test_app();
        let (status, created) = call(
            &app,
            "POST",
            "/reports",
            CITIZEN,
            Some(json!({
                "title": "Pothole",
                "description": "Large pothole",
                "category": "roads",
                "location": {"lat": 13.0827, "lng": 80.2707},
                "locationName": "T. Nagar, Chennai"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["status"], "in_progress");
        assert_eq!(created["priority"], "low");
        assert_eq!(created["upvotes"], 0);
        assert_eq!(created["createdByUserId"], "citizen-1");
        let id = created["id"].as_u64().unwrap();

        for voter in ["v1", "v2", "v3", "v3"] {
            let (status, _) = call(
                &app,
                "POST",
                &format!("/reports/{}/upvote", id),
                Some((voter, "citizen")),
                None,
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }

        let (_, listed) = call(&app, "GET", "/reports?category=roads&q=CHENNAI", ADMIN, None).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);
        assert_eq!(listed[0]["upvotes"], 3);
        assert_eq!(listed[0]["priority"], "medium");

        let (status, updated) = call(
            &app,
            "PATCH",
            &format!("/reports/{}", id),
            ADMIN,
            Some(json!({"status": "finished"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["status"], "finished");
        assert_eq!(updated["priority"], "medium");

        let (_, inbox) = call(&app, "GET", "/notifications", CITIZEN, None).await;
        let inbox = inbox.as_array().unwrap();
        assert_eq!(inbox.len(), 1);
        assert!(inbox[0]["message"].as_str().unwrap().contains("Pothole"));
        assert_eq!(inbox[0]["read"], false);

        let (status, ok) = call(&app, "POST", "/notifications/read-all", CITIZEN, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ok, json!({"ok": true}));
        let (_, inbox) = call(&app, "GET", "/notifications", CITIZEN, None).await;
        assert_eq!(inbox[0]["read"], true);
    }

    #[tokio::test]
    async fn test_unknown_report_is_404() {
        let app = test_app();
        let (status, _) = call(&app, "POST", "/reports/99/upvote", CITIZEN, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = call(
            &app,
            "PATCH",
            "/reports/99",
            ADMIN,
            Some(json!({"priority": "high"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_community_and_mine() {
        let app = test_app();
        let (status, seeded) = call(&app, "POST", "/reports/test-seed", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(seeded["count"], 7);

        call(
            &app,
            "POST",
            "/reports",
            CITIZEN,
            Some(json!({"title": "No GPS", "description": "somewhere"})),
        )
        .await;

        let (_, all) = call(&app, "GET", "/reports/community", CITIZEN, None).await;
        assert_eq!(all.as_array().unwrap().len(), 7);

        let (_, chennai) =
            call(&app, "GET", "/reports/community?lat=13.08&lng=80.27", CITIZEN, None).await;
        assert_eq!(chennai.as_array().unwrap().len(), 2);

        let (status, _) = call(&app, "GET", "/reports/community?lat=13.08", CITIZEN, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, mine) = call(&app, "GET", "/reports/mine", CITIZEN, None).await;
        let mine = mine.as_array().unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0]["title"], "No GPS");
    }

    #[tokio::test]
    async fn test_geocode_disabled() {
        let app = test_app();
        let (status, _) = call(&app, "GET", "/geocode/reverse?lat=1&lng=2", None, None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        let (status, _) = call(&app, "GET", "/geocode/reverse?lat=100&lng=2", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_health_and_openapi() {
        let app = test_app();
        let (status, health) = call(&app, "GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(health["status"], "healthy");

        let (status, doc) = call(&app, "GET", "/api/openapi.json", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(doc["paths"].get("/reports/{id}/upvote").is_some());
    }
}
