use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::datetime::parse_canonical_strict;
use crate::error::VisitQueueError;

pub use shared_models::{Notification, NotificationKind};

// ==============================================================================
// VISITS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VisitState {
    NoVisit,
    Active,
    Ended,
}

impl VisitState {
    pub fn of(visit: Option<&Visit>) -> Self {
        match visit {
            None => VisitState::NoVisit,
            Some(visit) if visit.is_active() => VisitState::Active,
            Some(_) => VisitState::Ended,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Visit {
    pub uuid: String,
    pub patient_uuid: String,
    pub visit_type: Option<VisitType>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Visit {
    pub fn is_active(&self) -> bool {
        self.ended_at.is_none()
    }

    pub fn state(&self) -> VisitState {
        VisitState::of(Some(self))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitType {
    pub uuid: String,
    pub display: String,
}

/// What the clinician filled in on the start-visit form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartVisitForm {
    pub visit_type_uuid: Option<String>,
    pub location_uuid: Option<String>,
}

/// Payload for opening a visit on the remote system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVisit {
    pub patient: String,
    pub visit_type: String,
    pub location: String,
    pub start_datetime: String,
}

/// Payload for closing the active visit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndVisit {
    #[serde(skip)]
    pub visit_uuid: String,
    pub stop_datetime: String,
}

// ==============================================================================
// LOOKUPS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub uuid: String,
    pub display: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub uuid: String,
    pub display: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStatus {
    pub uuid: String,
    pub display: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuePriority {
    pub uuid: String,
    pub display: String,
}

// ==============================================================================
// QUEUE ENTRIES
// ==============================================================================

/// A patient's current membership in a service queue, flattened for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    pub queue_entry_uuid: String,
    pub visit_uuid: String,
    pub patient_uuid: String,
    pub name: String,
    pub patient_age: Option<u32>,
    pub patient_sex: String,
    pub queue_uuid: String,
    pub status_uuid: String,
    pub priority_uuid: String,
}

impl QueueEntry {
    /// `name · sex · age Years`, the header of the change-status dialog.
    pub fn display_header(&self) -> String {
        match self.patient_age {
            Some(age) => format!("{} · {} · {} Years", self.name, self.patient_sex, age),
            None => format!("{} · {}", self.name, self.patient_sex),
        }
    }
}

/// Pending edits captured from the change-status form at submit time.
///
/// Blank strings count as "left unset".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntryEdits {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub target_queue_uuid: Option<String>,
}

impl QueueEntryEdits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(self, status: impl Into<String>) -> Self {
        Self { status: Some(status.into()), ..self }
    }

    pub fn with_priority(self, priority: impl Into<String>) -> Self {
        Self { priority: Some(priority.into()), ..self }
    }

    pub fn with_target_queue(self, queue_uuid: impl Into<String>) -> Self {
        Self { target_queue_uuid: Some(queue_uuid.into()), ..self }
    }
}

/// The single close-old/open-new request sent to the remote system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRequest {
    pub visit_uuid: String,
    pub previous_queue_uuid: String,
    pub new_queue_uuid: String,
    pub queue_entry_uuid: String,
    pub patient_uuid: String,
    pub priority: String,
    pub status: String,
    pub end_date: String,
}

// ==============================================================================
// REMOTE PAYLOADS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ResultsPage<T> {
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteRef {
    pub uuid: String,
    #[serde(default)]
    pub display: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptSet {
    #[serde(default)]
    pub set_members: Vec<ConceptMember>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConceptMember {
    pub uuid: String,
    pub display: String,
    #[serde(default)]
    pub name: Option<ConceptName>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConceptName {
    pub display: String,
}

impl From<ConceptMember> for QueueStatus {
    fn from(member: ConceptMember) -> Self {
        let name = member
            .name
            .map(|n| n.display)
            .unwrap_or_else(|| member.display.clone());
        Self { uuid: member.uuid, display: member.display, name }
    }
}

impl From<ConceptMember> for QueuePriority {
    fn from(member: ConceptMember) -> Self {
        Self { uuid: member.uuid, display: member.display }
    }
}

impl From<RemoteRef> for Service {
    fn from(r: RemoteRef) -> Self {
        Self { display: r.display.unwrap_or_default(), uuid: r.uuid }
    }
}

impl From<RemoteRef> for Location {
    fn from(r: RemoteRef) -> Self {
        Self { display: r.display.unwrap_or_default(), uuid: r.uuid }
    }
}

impl From<RemoteRef> for VisitType {
    fn from(r: RemoteRef) -> Self {
        Self { display: r.display.unwrap_or_default(), uuid: r.uuid }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteVisit {
    pub uuid: String,
    pub patient: RemoteRef,
    #[serde(default)]
    pub visit_type: Option<RemoteRef>,
    pub start_datetime: String,
    #[serde(default)]
    pub stop_datetime: Option<String>,
}

impl TryFrom<RemoteVisit> for Visit {
    type Error = VisitQueueError;

    fn try_from(remote: RemoteVisit) -> Result<Self, Self::Error> {
        let started_at = parse_canonical_strict(&remote.start_datetime)?;
        let ended_at = remote
            .stop_datetime
            .as_deref()
            .map(parse_canonical_strict)
            .transpose()?;

        Ok(Self {
            uuid: remote.uuid,
            patient_uuid: remote.patient.uuid,
            visit_type: remote.visit_type.map(VisitType::from),
            started_at,
            ended_at,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteVisitQueueEntry {
    pub visit: RemoteRef,
    pub queue_entry: RemoteQueueEntry,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteQueueEntry {
    pub uuid: String,
    #[serde(default)]
    pub status: Option<RemoteRef>,
    #[serde(default)]
    pub priority: Option<RemoteRef>,
    pub queue: RemoteRef,
    pub patient: RemotePatient,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemotePatient {
    pub uuid: String,
    #[serde(default)]
    pub person: Option<RemotePerson>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemotePerson {
    #[serde(default)]
    pub display: Option<String>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub gender: Option<String>,
}

impl From<RemoteVisitQueueEntry> for QueueEntry {
    fn from(remote: RemoteVisitQueueEntry) -> Self {
        let entry = remote.queue_entry;
        let person = entry.patient.person;

        Self {
            queue_entry_uuid: entry.uuid,
            visit_uuid: remote.visit.uuid,
            patient_uuid: entry.patient.uuid,
            name: person.as_ref().and_then(|p| p.display.clone()).unwrap_or_default(),
            patient_age: person.as_ref().and_then(|p| p.age),
            patient_sex: person.and_then(|p| p.gender).unwrap_or_default(),
            queue_uuid: entry.queue.uuid,
            status_uuid: entry.status.map(|s| s.uuid).unwrap_or_default(),
            priority_uuid: entry.priority.map(|p| p.uuid).unwrap_or_default(),
        }
    }
}
