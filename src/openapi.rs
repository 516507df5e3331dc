use axum::Json;
use utoipa::OpenApi;

use crate::{
    handlers::{CreateReportRequest, HealthResponse, ReverseGeocodeResponse, SeedResponse},
    model::{
        GeoPoint, NotificationItem, Report, ReportCategory, ReportPatch, ReportPriority,
        ReportStatus,
    },
};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health_check,
        crate::handlers::create_report,
        crate::handlers::list_reports,
        crate::handlers::list_community_reports,
        crate::handlers::list_my_reports,
        crate::handlers::update_report,
        crate::handlers::upvote_report,
        crate::handlers::add_test_reports,
        crate::handlers::list_notifications,
        crate::handlers::mark_notifications_read,
        crate::handlers::reverse_geocode,
    ),
    components(
        schemas(
            Report,
            ReportCategory,
            ReportPriority,
            ReportStatus,
            ReportPatch,
            GeoPoint,
            NotificationItem,
            CreateReportRequest,
            HealthResponse,
            SeedResponse,
            ReverseGeocodeResponse,
        )
    ),
    tags(
        (name = "civic-reports", description = "Civic issue reports, upvotes and owner notifications")
    )
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
