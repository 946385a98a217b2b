use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::datetime::canonical_timestamp;
use crate::error::VisitQueueError;
use crate::models::{EndVisit, NewVisit, StartVisitForm, Visit, VisitState};

fn filled(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Gatekeeper for a patient's visit: no visit, then active, then ended.
///
/// Holds no connection; the visit service asks it before every remote call and
/// reports results back through `record_started` / `record_ended`.
#[derive(Debug, Clone)]
pub struct VisitLifecycle {
    patient_uuid: String,
    current: Option<Visit>,
}

impl VisitLifecycle {
    pub fn new(patient_uuid: impl Into<String>, current: Option<Visit>) -> Self {
        Self {
            patient_uuid: patient_uuid.into(),
            current,
        }
    }

    pub fn patient_uuid(&self) -> &str {
        &self.patient_uuid
    }

    pub fn state(&self) -> VisitState {
        VisitState::of(self.current.as_ref())
    }

    pub fn visit(&self) -> Option<&Visit> {
        self.current.as_ref()
    }

    pub fn active_visit(&self) -> Option<&Visit> {
        self.current.as_ref().filter(|visit| visit.is_active())
    }

    /// A new visit may start unless one is already active.
    pub fn can_start(&self) -> bool {
        self.state() != VisitState::Active
    }

    pub fn can_end(&self) -> bool {
        self.state() == VisitState::Active
    }

    pub fn prepare_start(
        &self,
        form: &StartVisitForm,
        now: DateTime<Utc>,
    ) -> Result<NewVisit, VisitQueueError> {
        if !self.can_start() {
            warn!("Start visit attempted for patient {} with an active visit", self.patient_uuid);
            return Err(VisitQueueError::IllegalState(
                "Patient already has an active visit".to_string(),
            ));
        }

        let visit_type = filled(form.visit_type_uuid.as_deref()).ok_or_else(|| {
            VisitQueueError::ValidationError("A visit type must be selected".to_string())
        })?;
        let location = filled(form.location_uuid.as_deref()).ok_or_else(|| {
            VisitQueueError::ValidationError("A visit location is required".to_string())
        })?;

        Ok(NewVisit {
            patient: self.patient_uuid.clone(),
            visit_type: visit_type.to_string(),
            location: location.to_string(),
            start_datetime: canonical_timestamp(&now)?,
        })
    }

    pub fn record_started(&mut self, visit: Visit) -> Result<VisitState, VisitQueueError> {
        if !self.can_start() {
            return Err(VisitQueueError::IllegalState(
                "Patient already has an active visit".to_string(),
            ));
        }
        if visit.patient_uuid != self.patient_uuid {
            return Err(VisitQueueError::ValidationError(format!(
                "Visit {} belongs to patient {}, not {}",
                visit.uuid, visit.patient_uuid, self.patient_uuid
            )));
        }
        if !visit.is_active() {
            return Err(VisitQueueError::ValidationError(format!(
                "Visit {} was returned already ended",
                visit.uuid
            )));
        }

        info!("Visit {} started for patient {}", visit.uuid, self.patient_uuid);
        self.current = Some(visit);
        Ok(self.state())
    }

    /// The stop time never precedes the visit's start.
    pub fn prepare_end(&self, now: DateTime<Utc>) -> Result<EndVisit, VisitQueueError> {
        let visit = self.active_visit().ok_or_else(|| {
            VisitQueueError::IllegalState("There is no active visit to end".to_string())
        })?;

        let stop = now.max(visit.started_at);
        debug!("Preparing to end visit {} at {}", visit.uuid, stop);

        Ok(EndVisit {
            visit_uuid: visit.uuid.clone(),
            stop_datetime: canonical_timestamp(&stop)?,
        })
    }

    pub fn record_ended(&mut self, ended_at: DateTime<Utc>) -> Result<&Visit, VisitQueueError> {
        let visit = self
            .current
            .as_mut()
            .filter(|visit| visit.is_active())
            .ok_or_else(|| VisitQueueError::IllegalState("There is no active visit to end".to_string()))?;

        if ended_at < visit.started_at {
            return Err(VisitQueueError::ValidationError(format!(
                "Visit {} cannot end before it started",
                visit.uuid
            )));
        }

        visit.ended_at = Some(ended_at);
        info!("Visit {} ended for patient {}", visit.uuid, self.patient_uuid);
        Ok(&*visit)
    }
}
