use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// GeoPoint is a WGS84 coordinate pair in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReportCategory {
    Sewage,
    Electricity,
    Waste,
    Roads,
    Transport,
    #[default]
    Other,
}

impl ReportCategory {
    pub const ALL: [ReportCategory; 6] = [
        ReportCategory::Sewage,
        ReportCategory::Electricity,
        ReportCategory::Waste,
        ReportCategory::Roads,
        ReportCategory::Transport,
        ReportCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportCategory::Sewage => "sewage",
            ReportCategory::Electricity => "electricity",
            ReportCategory::Waste => "waste",
            ReportCategory::Roads => "roads",
            ReportCategory::Transport => "transport",
            ReportCategory::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReportPriority {
    #[default]
    Low,
    Medium,
    High,
}

impl ReportPriority {
    /// Threshold rule: 0-2 upvotes is low, 3-5 is medium, 6 and above is high.
    pub fn from_upvotes(upvotes: u32) -> Self {
        match upvotes {
            0..=2 => ReportPriority::Low,
            3..=5 => ReportPriority::Medium,
            _ => ReportPriority::High,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    #[default]
    InProgress,
    Accepted,
    Rejected,
    Finished,
}

impl ReportStatus {
    pub const ALL: [ReportStatus; 4] = [
        ReportStatus::InProgress,
        ReportStatus::Accepted,
        ReportStatus::Rejected,
        ReportStatus::Finished,
    ];
}

/// Report represents a citizen-submitted civic issue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub category: ReportCategory,
    pub priority: ReportPriority,
    pub priority_score: u32,
    pub upvotes: u32,
    pub upvoted_by: Vec<String>,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
    pub created_by_user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by_username: Option<String>,
    #[serde(default)]
    pub attachments: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_name: Option<String>,
}

/// NewReport carries the caller-supplied fields of a report about to be created
#[derive(Debug, Clone, Default)]
pub struct NewReport {
    pub title: String,
    pub description: String,
    pub category: Option<ReportCategory>,
    pub created_by_user_id: String,
    pub created_by_username: Option<String>,
    pub attachments: Vec<String>,
    pub location: Option<GeoPoint>,
    pub location_name: Option<String>,
}

/// ReportPatch is an operator edit; absent fields are left untouched
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ReportPatch {
    pub status: Option<ReportStatus>,
    pub priority: Option<ReportPriority>,
}

#[derive(Debug, Clone, Default)]
pub struct ReportFilters {
    pub category: Option<ReportCategory>,
    pub location_query: Option<String>,
}

/// NotificationItem is a per-user message emitted when a report is finished
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationItem {
    pub id: u64,
    pub user_id: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_thresholds() {
        assert_eq!(ReportPriority::from_upvotes(0), ReportPriority::Low);
        assert_eq!(ReportPriority::from_upvotes(2), ReportPriority::Low);
        assert_eq!(ReportPriority::from_upvotes(3), ReportPriority::Medium);
        assert_eq!(ReportPriority::from_upvotes(5), ReportPriority::Medium);
        assert_eq!(ReportPriority::from_upvotes(6), ReportPriority::High);
        assert_eq!(ReportPriority::from_upvotes(400), ReportPriority::High);
    }

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(serde_json::to_string(&ReportStatus::InProgress).unwrap(), "\"in_progress\"");
        assert_eq!(serde_json::to_string(&ReportCategory::Roads).unwrap(), "\"roads\"");
        let status: ReportStatus = serde_json::from_str("\"finished\"").unwrap();
        assert_eq!(status, ReportStatus::Finished);
        assert!(serde_json::from_str::<ReportCategory>("\"potholes\"").is_err());
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let report = Report {
            id: 7,
            title: "Pothole".to_string(),
            description: "Large pothole".to_string(),
            category: ReportCategory::Roads,
            priority: ReportPriority::Low,
            priority_score: 0,
            upvotes: 0,
            upvoted_by: vec![],
            status: ReportStatus::InProgress,
            created_at: Utc::now(),
            created_by_user_id: "u1".to_string(),
            created_by_username: None,
            attachments: vec![],
            location: Some(GeoPoint { lat: 13.08, lng: 80.27 }),
            location_name: None,
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["createdByUserId"], "u1");
        assert_eq!(value["upvotedBy"], serde_json::json!([]));
        assert_eq!(value["location"]["lng"], 80.27);
        assert!(value.get("locationName").is_none());
        assert!(value.get("createdByUsername").is_none());
    }
}
