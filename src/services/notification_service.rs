use serde_json::json;
use std::sync::Arc;

use crate::dto::backend_dto::{CreateNotificationRequest, NotificationKind, NotificationPriority};
use crate::services::backend_service::TestsApi;
use crate::services::result_service::ResultReport;

/// Tells the employee about a persisted result. Best effort only.
#[derive(Clone)]
pub struct NotificationService {
    api: Arc<dyn TestsApi>,
    enabled: bool,
}

impl NotificationService {
    pub fn new(api: Arc<dyn TestsApi>, enabled: bool) -> Self {
        Self { api, enabled }
    }

    pub fn build_request(report: &ResultReport) -> CreateNotificationRequest {
        let (title, kind, priority) = if report.passed {
            ("Test passed", NotificationKind::Success, NotificationPriority::Normal)
        } else {
            ("Test not passed", NotificationKind::Warning, NotificationPriority::High)
        };
        let message = if report.passed {
            format!(
                "You passed \"{}\" with {}% ({}/{} points).",
                report.test_title, report.percentage, report.score, report.max_score
            )
        } else {
            format!(
                "You scored {}% on \"{}\". The passing score is {}%.",
                report.percentage, report.test_title, report.passing_score
            )
        };

        CreateNotificationRequest {
            employee_id: report.employee_id,
            title: title.to_string(),
            message,
            kind,
            priority,
            link: Some("/tests".to_string()),
            metadata: Some(json!({
                "test_id": report.test_id,
                "result_id": report.result_id,
                "percentage": report.percentage,
                "passed": report.passed,
            })),
        }
    }

    /// Returns whether a notification was delivered. Failures are logged, never raised.
    pub async fn notify_result(&self, report: &ResultReport) -> bool {
        if !self.enabled {
            return false;
        }
        let request = Self::build_request(report);
        match self.api.create_notification(&request).await {
            Ok(()) => {
                tracing::debug!(employee_id = %report.employee_id, result_id = %report.result_id, "Result notification sent");
                true
            }
            Err(e) => {
                tracing::warn!(employee_id = %report.employee_id, error = %e, "Failed to send result notification");
                false
            }
        }
    }
}
