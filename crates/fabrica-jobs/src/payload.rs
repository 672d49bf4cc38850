//! Typed job payloads.
//!
//! Producers build these; the broker itself treats payloads as opaque
//! structured data. Each payload knows its home queue and its kind string.

use serde::{Deserialize, Serialize};

use crate::types::QueueName;

/// A payload that can be enqueued through the broker.
pub trait JobPayload: Serialize {
    /// The queue this payload belongs to.
    const QUEUE: QueueName;

    /// Kind string recorded on the job.
    fn kind(&self) -> &'static str;
}

/// Email recipient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipient {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmailJobKind {
    EcoCreated,
    EcoStatusChanged,
    EcoAssigned,
    WorkorderCreated,
    WorkorderStatusChanged,
    Notification,
}

impl EmailJobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailJobKind::EcoCreated => "eco-created",
            EmailJobKind::EcoStatusChanged => "eco-status-changed",
            EmailJobKind::EcoAssigned => "eco-assigned",
            EmailJobKind::WorkorderCreated => "workorder-created",
            EmailJobKind::WorkorderStatusChanged => "workorder-status-changed",
            EmailJobKind::Notification => "notification",
        }
    }
}

/// Outbound email rendered and sent by the email worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailJob {
    pub kind: EmailJobKind,
    pub recipients: Vec<Recipient>,
    pub data: serde_json::Value,
}

impl JobPayload for EmailJob {
    const QUEUE: QueueName = QueueName::Email;

    fn kind(&self) -> &'static str {
        self.kind.as_str()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnalysisJobKind {
    RiskScore,
    ImpactAnalysis,
    ComplianceCheck,
    ChangeSuggestion,
}

impl AnalysisJobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisJobKind::RiskScore => "risk-score",
            AnalysisJobKind::ImpactAnalysis => "impact-analysis",
            AnalysisJobKind::ComplianceCheck => "compliance-check",
            AnalysisJobKind::ChangeSuggestion => "change-suggestion",
        }
    }
}

/// Background analysis over a domain entity (ECO, BOM, work order...).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisJob {
    pub kind: AnalysisJobKind,
    pub entity_id: String,
    pub entity_type: String,
    pub data: serde_json::Value,
}

impl JobPayload for AnalysisJob {
    const QUEUE: QueueName = QueueName::Analysis;

    fn kind(&self) -> &'static str {
        self.kind.as_str()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportJobKind {
    EcoSummary,
    WorkorderSummary,
    InventoryReport,
    AuditLog,
}

impl ReportJobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportJobKind::EcoSummary => "eco-summary",
            ReportJobKind::WorkorderSummary => "workorder-summary",
            ReportJobKind::InventoryReport => "inventory-report",
            ReportJobKind::AuditLog => "audit-log",
        }
    }
}

/// Date range filter for report generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateRange {
    pub from: String,
    pub to: String,
}

/// Report generated for a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportJob {
    pub kind: ReportJobKind,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub date_range: Option<DateRange>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub filters: Option<serde_json::Value>,
}

impl JobPayload for ReportJob {
    const QUEUE: QueueName = QueueName::Reports;

    fn kind(&self) -> &'static str {
        self.kind.as_str()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationJobKind {
    InApp,
    Push,
}

impl NotificationJobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationJobKind::InApp => "in-app",
            NotificationJobKind::Push => "push",
        }
    }
}

/// User-facing notification delivered by the notification worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationJob {
    pub kind: NotificationJobKind,
    pub user_id: String,
    pub title: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub link: Option<String>,
}

impl JobPayload for NotificationJob {
    const QUEUE: QueueName = QueueName::Notifications;

    fn kind(&self) -> &'static str {
        self.kind.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_email_kind_serializes_kebab_case() {
        let kind = EmailJobKind::EcoStatusChanged;
        assert_eq!(
            serde_json::to_string(&kind).unwrap(),
            "\"eco-status-changed\""
        );
        assert_eq!(kind.as_str(), "eco-status-changed");
    }

    #[test]
    fn test_payload_queue_association() {
        assert_eq!(EmailJob::QUEUE, QueueName::Email);
        assert_eq!(AnalysisJob::QUEUE, QueueName::Analysis);
        assert_eq!(ReportJob::QUEUE, QueueName::Reports);
        assert_eq!(NotificationJob::QUEUE, QueueName::Notifications);
    }

    #[test]
    fn test_report_payload_round_trip() {
        let payload = ReportJob {
            kind: ReportJobKind::EcoSummary,
            user_id: "u-1".to_string(),
            date_range: None,
            filters: Some(json!({"status": "approved"})),
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["kind"], "eco-summary");
        assert_eq!(value["userId"], "u-1");
        assert!(value.get("dateRange").is_none());
    }
}
