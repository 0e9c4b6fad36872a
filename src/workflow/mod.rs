// Unified status workflow for the two trackable resource kinds.
//
// Service requests and kitchen orders each have their own status track.
// Both are represented behind one tagged enum so transition rules and
// completion-timestamp semantics are written once.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    ServiceRequest,
    Order,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::ServiceRequest => "service_request",
            ResourceKind::Order => "order",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceRequestStatus {
    Pending,
    AutoApproved,
    ManualReview,
    Assigned,
    Processing,
    InProgress,
    AwaitingCompletion,
    Completed,
    Invoiced,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Submitted,
    Processing,
    Delivering,
    Completed,
}

/// A status value tagged with its resource kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceStatus {
    ServiceRequest(ServiceRequestStatus),
    Order(OrderStatus),
}

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("unknown status '{value}' for {kind}")]
    UnknownStatus { kind: &'static str, value: String },

    #[error("cannot change status of a resource in terminal status '{0}'")]
    TerminalStatus(String),
}

impl ServiceRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceRequestStatus::Pending => "pending",
            ServiceRequestStatus::AutoApproved => "auto_approved",
            ServiceRequestStatus::ManualReview => "manual_review",
            ServiceRequestStatus::Assigned => "assigned",
            ServiceRequestStatus::Processing => "processing",
            ServiceRequestStatus::InProgress => "in_progress",
            ServiceRequestStatus::AwaitingCompletion => "awaiting_completion",
            ServiceRequestStatus::Completed => "completed",
            ServiceRequestStatus::Invoiced => "invoiced",
            ServiceRequestStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "auto_approved" => Some(Self::AutoApproved),
            "manual_review" => Some(Self::ManualReview),
            "assigned" => Some(Self::Assigned),
            "processing" => Some(Self::Processing),
            "in_progress" => Some(Self::InProgress),
            "awaiting_completion" => Some(Self::AwaitingCompletion),
            "completed" => Some(Self::Completed),
            "invoiced" => Some(Self::Invoiced),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Submitted => "submitted",
            OrderStatus::Processing => "processing",
            OrderStatus::Delivering => "delivering",
            OrderStatus::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "submitted" => Some(Self::Submitted),
            "processing" => Some(Self::Processing),
            "delivering" => Some(Self::Delivering),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

impl ResourceStatus {
    /// Parse a raw status string for a given resource kind. Unknown values
    /// are rejected before anything touches the database.
    pub fn parse(kind: ResourceKind, value: &str) -> Result<Self, WorkflowError> {
        let parsed = match kind {
            ResourceKind::ServiceRequest => {
                ServiceRequestStatus::parse(value).map(ResourceStatus::ServiceRequest)
            }
            ResourceKind::Order => OrderStatus::parse(value).map(ResourceStatus::Order),
        };

        parsed.ok_or_else(|| WorkflowError::UnknownStatus {
            kind: kind.as_str(),
            value: value.to_string(),
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceStatus::ServiceRequest(s) => s.as_str(),
            ResourceStatus::Order(s) => s.as_str(),
        }
    }

    /// Terminal statuses admit no further transitions, including cancellation
    pub fn is_terminal(&self) -> bool {
        match self {
            ResourceStatus::ServiceRequest(s) => {
                matches!(s, ServiceRequestStatus::Invoiced | ServiceRequestStatus::Cancelled)
            }
            ResourceStatus::Order(s) => matches!(s, OrderStatus::Completed),
        }
    }

    /// The initial status, during which the owning resident may still edit
    /// descriptive fields
    pub fn is_initial(&self) -> bool {
        match self {
            ResourceStatus::ServiceRequest(s) => matches!(s, ServiceRequestStatus::Pending),
            ResourceStatus::Order(s) => matches!(s, OrderStatus::Submitted),
        }
    }

    /// Whether entering this status stamps the completion timestamp.
    /// Leaving it clears the timestamp again.
    pub fn marks_completion(&self) -> bool {
        match self {
            ResourceStatus::ServiceRequest(s) => matches!(s, ServiceRequestStatus::Completed),
            ResourceStatus::Order(s) => matches!(s, OrderStatus::Completed),
        }
    }

    /// Validate a transition from `current`. Staff may overwrite the status
    /// freely (including backwards), but nothing leaves a terminal status.
    pub fn check_transition(current: ResourceStatus, _next: ResourceStatus) -> Result<(), WorkflowError> {
        if current.is_terminal() {
            return Err(WorkflowError::TerminalStatus(current.as_str().to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_service_request_status() {
        for value in [
            "pending",
            "auto_approved",
            "manual_review",
            "assigned",
            "processing",
            "in_progress",
            "awaiting_completion",
            "completed",
            "invoiced",
            "cancelled",
        ] {
            let status = ResourceStatus::parse(ResourceKind::ServiceRequest, value).unwrap();
            assert_eq!(status.as_str(), value);
        }
    }

    #[test]
    fn parses_every_order_status() {
        for value in ["submitted", "processing", "delivering", "completed"] {
            let status = ResourceStatus::parse(ResourceKind::Order, value).unwrap();
            assert_eq!(status.as_str(), value);
        }
    }

    #[test]
    fn rejects_unknown_and_cross_track_values() {
        assert!(ResourceStatus::parse(ResourceKind::ServiceRequest, "shipped").is_err());
        // Order track does not share the service request vocabulary
        assert!(ResourceStatus::parse(ResourceKind::Order, "assigned").is_err());
        assert!(ResourceStatus::parse(ResourceKind::ServiceRequest, "delivering").is_err());
    }

    #[test]
    fn terminal_statuses_block_transitions() {
        let invoiced = ResourceStatus::ServiceRequest(ServiceRequestStatus::Invoiced);
        let cancelled = ResourceStatus::ServiceRequest(ServiceRequestStatus::Cancelled);
        let pending = ResourceStatus::ServiceRequest(ServiceRequestStatus::Pending);

        assert!(ResourceStatus::check_transition(invoiced, pending).is_err());
        assert!(ResourceStatus::check_transition(cancelled, pending).is_err());
        assert!(ResourceStatus::check_transition(pending, cancelled).is_ok());
    }

    #[test]
    fn completed_is_not_terminal_for_service_requests() {
        // Staff may move a request back out of completed; the completion
        // timestamp is cleared when that happens
        let completed = ResourceStatus::ServiceRequest(ServiceRequestStatus::Completed);
        let in_progress = ResourceStatus::ServiceRequest(ServiceRequestStatus::InProgress);

        assert!(ResourceStatus::check_transition(completed, in_progress).is_ok());
        assert!(completed.marks_completion());
        assert!(!in_progress.marks_completion());
    }

    #[test]
    fn completed_orders_are_terminal() {
        let completed = ResourceStatus::Order(OrderStatus::Completed);
        let processing = ResourceStatus::Order(OrderStatus::Processing);

        assert!(ResourceStatus::check_transition(completed, processing).is_err());
        assert!(ResourceStatus::check_transition(processing, completed).is_ok());
    }

    #[test]
    fn initial_statuses_gate_resident_edits() {
        assert!(ResourceStatus::ServiceRequest(ServiceRequestStatus::Pending).is_initial());
        assert!(!ResourceStatus::ServiceRequest(ServiceRequestStatus::Assigned).is_initial());
        assert!(ResourceStatus::Order(OrderStatus::Submitted).is_initial());
        assert!(!ResourceStatus::Order(OrderStatus::Delivering).is_initial());
    }
}
