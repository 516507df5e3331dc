use crate::model::{GeoPoint, NewReport, Report, ReportFilters, ReportPatch};

pub const DEFAULT_RADIUS_KM: f64 = 10.0;

/// Storage contract for reports. Every mutation of the report collection
/// goes through an implementation of this trait.
///
/// "Not found" is reported as `None`, never as an error; all operations are
/// total over well-formed input.
pub trait ReportStore: Send + Sync {
    /// Insert a new report with `status=in_progress`, `priority=low` and no upvotes.
    fn create(&self, input: NewReport) -> Report;

    /// All reports, newest first, optionally narrowed by category and by a
    /// case-insensitive substring of `location_name`.
    fn list(&self, filters: &ReportFilters) -> Vec<Report>;

    fn list_by_user(&self, user_id: &str) -> Vec<Report>;

    /// Reports within `radius_km` of `user_location`. Without a location every
    /// report that has coordinates is returned.
    fn list_by_area(&self, user_location: Option<GeoPoint>, radius_km: f64) -> Vec<Report>;

    /// Merge the supplied fields onto the report. Moving into `finished`
    /// notifies the report owner.
    fn update(&self, id: u64, patch: ReportPatch) -> Option<Report>;

    /// Record one upvote per voter and recompute priority. A repeated vote
    /// returns the report unchanged.
    fn upvote(&self, id: u64, user_id: &str) -> Option<Report>;
}
