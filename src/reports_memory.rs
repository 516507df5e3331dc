use std::{
    collections::BTreeMap,
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use chrono::Utc;

use crate::{
    geo::distance_km,
    model::{
        GeoPoint, NewReport, Report, ReportFilters, ReportPatch, ReportPriority, ReportStatus,
    },
    notifications::NotificationSink,
    store::ReportStore,
};

#[derive(Default)]
struct Reports {
    // keyed by id; ids only grow, so reverse key order is newest-first
    by_id: BTreeMap<u64, Report>,
    last_id: u64,
}

impl Reports {
    fn next_id(&mut self) -> u64 {
        self.last_id += 1;
        self.last_id
    }

    fn newest_first(&self) -> impl Iterator<Item = &Report> {
        self.by_id.values().rev()
    }
}

pub struct InMemoryReports {
    reports: RwLock<Reports>,
    notifications: Arc<dyn NotificationSink>,
}

impl InMemoryReports {
    pub fn new(notifications: Arc<dyn NotificationSink>) -> Self {
        Self {
            reports: RwLock::new(Reports::default()),
            notifications,
        }
    }

    pub fn len(&self) -> usize {
        self.read().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert a fully formed report (sample data). The id is reassigned, and
    /// upvote bookkeeping and priority are normalized from `upvoted_by`.
    pub fn insert_existing(&self, mut report: Report) -> Report {
        report.upvoted_by.sort();
        report.upvoted_by.dedup();
        report.upvotes = report.upvoted_by.len() as u32;
        report.priority_score = report.upvotes;
        report.priority = ReportPriority::from_upvotes(report.upvotes);

        let mut guard = self.write();
        report.id = guard.next_id();
        guard.by_id.insert(report.id, report.clone());
        report
    }

    fn read(&self) -> RwLockReadGuard<'_, Reports> {
        self.reports.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Reports> {
        self.reports.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ReportStore for InMemoryReports {
    fn create(&self, input: NewReport) -> Report {
        let mut guard = self.write();
        let report = Report {
            id: guard.next_id(),
            title: input.title,
            description: input.description,
            category: input.category.unwrap_or_default(),
            priority: ReportPriority::Low,
            priority_score: 0,
            upvotes: 0,
            upvoted_by: Vec::new(),
            status: ReportStatus::InProgress,
            created_at: Utc::now(),
            created_by_user_id: input.created_by_user_id,
            created_by_username: input.created_by_username,
            attachments: input.attachments,
            location: input.location,
            location_name: input.location_name,
        };
        guard.by_id.insert(report.id, report.clone());
        tracing::info!(
            "Got a new report: id={} category={} owner={}",
            report.id,
            report.category.as_str(),
            report.created_by_user_id
        );
        report
    }

    fn list(&self, filters: &ReportFilters) -> Vec<Report> {
        let query = filters
            .location_query
            .as_deref()
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase);

        self.read()
            .newest_first()
            .filter(|r| filters.category.map_or(true, |c| r.category == c))
            .filter(|r| match &query {
                Some(q) => r
                    .location_name
                    .as_deref()
                    .map_or(false, |name| name.to_lowercase().contains(q.as_str())),
                None => true,
            })
            .cloned()
            .collect()
    }

    fn list_by_user(&self, user_id: &str) -> Vec<Report> {
        self.read()
            .newest_first()
            .filter(|r| r.created_by_user_id == user_id)
            .cloned()
            .collect()
    }

    fn list_by_area(&self, user_location: Option<GeoPoint>, radius_km: f64) -> Vec<Report> {
        let guard = self.read();
        let out: Vec<Report> = match user_location {
            None => guard
                .newest_first()
                .filter(|r| r.location.is_some())
                .cloned()
                .collect(),
            Some(center) => guard
                .newest_first()
                .filter(|r| {
                    r.location
                        .map_or(false, |loc| distance_km(center, loc) <= radius_km)
                })
                .cloned()
                .collect(),
        };
        tracing::debug!(
            "list_by_area center={:?} radius_km={} matched={} total={}",
            user_location,
            radius_km,
            out.len(),
            guard.by_id.len()
        );
        out
    }

    fn update(&self, id: u64, patch: ReportPatch) -> Option<Report> {
        let (updated, owner, title) = {
            let mut guard = self.write();
            let report = guard.by_id.get_mut(&id)?;
            let owner = report.created_by_user_id.clone();
            let title = report.title.clone();
            if let Some(status) = patch.status {
                report.status = status;
            }
            if let Some(priority) = patch.priority {
                report.priority = priority;
            }
            (report.clone(), owner, title)
        };

        if patch.status == Some(ReportStatus::Finished) {
            tracing::info!("report {} finished, notifying {}", id, owner);
            self.notifications.add_notification(
                &owner,
                format!("Your report \"{}\" has been marked as finished.", title),
            );
        }
        Some(updated)
    }

    fn upvote(&self, id: u64, user_id: &str) -> Option<Report> {
        let mut guard = self.write();
        let report = guard.by_id.get_mut(&id)?;
        if report.upvoted_by.iter().any(|u| u == user_id) {
            tracing::debug!("user {} already upvoted report {}", user_id, id);
            return Some(report.clone());
        }
        report.upvoted_by.push(user_id.to_string());
        report.upvotes += 1;
        report.priority_score = report.upvotes;
        report.priority = ReportPriority::from_upvotes(report.upvotes);
        tracing::debug!(
            "report {} upvoted by {}: upvotes={} priority={:?}",
            id,
            user_id,
            report.upvotes,
            report.priority
        );
        Some(report.clone())
    }
}
