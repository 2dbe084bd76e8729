use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::editor::EditorDraft;
use crate::error::{ScheduleError, ScheduleResult};
use crate::model::CalendarEvent;
use crate::resources::ResourceFilterManager;
use crate::sources::{EventSink, EventSource};

/// What to do when a draft names a resource that is not in the roster.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourcePolicy {
    /// Fall back to the default resource (first selected, else first).
    #[default]
    Lenient,
    /// Reject with `UnknownResource`.
    Strict,
}

impl ResourcePolicy {
    pub fn from_key(raw: &str) -> Option<Self> {
        match raw.trim() {
            "lenient" => Some(Self::Lenient),
            "strict" => Some(Self::Strict),
            _ => None,
        }
    }
}

/// Authoritative in-memory event sequence.
#[derive(Debug, Clone, Default)]
pub struct ScheduleStore {
    events: Vec<CalendarEvent>,
    policy: ResourcePolicy,
    last_issued_id: i64,
}

impl ScheduleStore {
    pub fn new(policy: ResourcePolicy) -> Self {
        Self {
            events: Vec::new(),
            policy,
            last_issued_id: 0,
        }
    }

    pub fn with_events(events: Vec<CalendarEvent>, policy: ResourcePolicy) -> Self {
        let mut store = Self::new(policy);
        for event in events {
            store.apply_created(event);
        }
        store
    }

    #[tracing::instrument(skip(source))]
    pub fn from_source(source: &dyn EventSource, policy: ResourcePolicy) -> anyhow::Result<Self> {
        let events = source.list()?;
        info!(count = events.len(), "loaded initial events");
        Ok(Self::with_events(events, policy))
    }

    pub fn policy(&self) -> ResourcePolicy {
        self.policy
    }

    pub fn events(&self) -> &[CalendarEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&CalendarEvent> {
        self.events.iter().find(|e| e.id == id)
    }

    /// Events assigned to one of `active_ids` whose title contains
    /// `search_text` (case-insensitive). Keeps insertion order.
    pub fn query<S: AsRef<str>>(
        &self,
        active_ids: &[S],
        search_text: &str,
    ) -> Vec<&CalendarEvent> {
        let needle = search_text.to_lowercase();
        self.events
            .iter()
            .filter(|event| {
                active_ids
                    .iter()
                    .any(|id| id.as_ref() == event.resource_id)
            })
            .filter(|event| needle.is_empty() || event.title.to_lowercase().contains(&needle))
            .collect()
    }

    /// `query` against the manager's current selection.
    pub fn visible(
        &self,
        resources: &ResourceFilterManager,
        search_text: &str,
    ) -> Vec<&CalendarEvent> {
        self.query(&resources.active_resource_ids(), search_text)
    }

    pub fn validate_range(start: NaiveDateTime, end: NaiveDateTime) -> bool {
        end > start
    }

    /// Validates `draft` and builds the event a create would store, with a
    /// fresh id. Does not touch the sequence.
    #[tracing::instrument(skip(self, draft, resources))]
    pub fn prepare_insert(
        &mut self,
        draft: &EditorDraft,
        resources: &ResourceFilterManager,
    ) -> ScheduleResult<CalendarEvent> {
        let (start, end) = checked_range(draft)?;
        let resource_id = self.resolve_resource(&draft.resource_id, resources)?;
        let id = self.next_id();
        Ok(build_event(id, draft, start, end, resource_id, resources))
    }

    /// Validates `draft` against the existing event `id` and builds its
    /// replacement. Does not touch the sequence.
    #[tracing::instrument(skip(self, draft, resources))]
    pub fn prepare_update(
        &self,
        id: &str,
        draft: &EditorDraft,
        resources: &ResourceFilterManager,
    ) -> ScheduleResult<CalendarEvent> {
        if self.get(id).is_none() {
            return Err(ScheduleError::NotFound(id.to_string()));
        }
        let (start, end) = checked_range(draft)?;
        let resource_id = self.resolve_resource(&draft.resource_id, resources)?;
        Ok(build_event(id.to_string(), draft, start, end, resource_id, resources))
    }

    #[tracing::instrument(skip(self, draft, resources))]
    pub fn insert(
        &mut self,
        draft: &EditorDraft,
        resources: &ResourceFilterManager,
    ) -> ScheduleResult<CalendarEvent> {
        let event = self.prepare_insert(draft, resources)?;
        self.apply_created(event.clone());
        Ok(event)
    }

    #[tracing::instrument(skip(self, draft, resources))]
    pub fn update(
        &mut self,
        id: &str,
        draft: &EditorDraft,
        resources: &ResourceFilterManager,
    ) -> ScheduleResult<CalendarEvent> {
        let event = self.prepare_update(id, draft, resources)?;
        self.apply_updated(id, event.clone())?;
        Ok(event)
    }

    /// Removes the event; absent ids are a no-op. Returns whether an event
    /// was removed.
    #[tracing::instrument(skip(self))]
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.events.len();
        self.events.retain(|e| e.id != id);
        let removed = self.events.len() != before;
        if removed {
            debug!("removed event");
        } else {
            debug!("remove for absent event; ignoring");
        }
        removed
    }

    /// Stores a confirmed record. A record whose id is already present
    /// replaces it in place.
    #[tracing::instrument(skip(self, event), fields(id = %event.id))]
    pub fn apply_created(&mut self, event: CalendarEvent) {
        self.note_issued(&event.id);
        match self.position(&event.id) {
            Some(idx) => {
                warn!("created record already present; replacing");
                self.events[idx] = event;
            }
            None => self.events.push(event),
        }
    }

    /// Replaces the event `original_id` with a confirmed record, keeping its
    /// position. If it was removed meanwhile the record is dropped and
    /// `NotFound` is returned.
    #[tracing::instrument(skip(self, event), fields(canonical_id = %event.id))]
    pub fn apply_updated(&mut self, original_id: &str, event: CalendarEvent) -> ScheduleResult<()> {
        if self.position(original_id).is_none() {
            info!("updated record no longer present; dropping");
            return Err(ScheduleError::NotFound(original_id.to_string()));
        }
        self.note_issued(&event.id);
        if event.id != original_id {
            // Drop any other record already holding the canonical id.
            self.events.retain(|e| e.id == original_id || e.id != event.id);
        }
        if let Some(idx) = self.position(original_id) {
            self.events[idx] = event;
        }
        Ok(())
    }

    /// Create through the sink; the sequence changes only once the sink
    /// confirms.
    #[tracing::instrument(skip(self, draft, resources, sink))]
    pub async fn persist_insert(
        &mut self,
        draft: &EditorDraft,
        resources: &ResourceFilterManager,
        sink: &dyn EventSink,
    ) -> ScheduleResult<CalendarEvent> {
        let event = self.prepare_insert(draft, resources)?;
        let canonical = sink.create(event).await.map_err(persistence_failure)?;
        self.apply_created(canonical.clone());
        Ok(canonical)
    }

    #[tracing::instrument(skip(self, draft, resources, sink))]
    pub async fn persist_update(
        &mut self,
        id: &str,
        draft: &EditorDraft,
        resources: &ResourceFilterManager,
        sink: &dyn EventSink,
    ) -> ScheduleResult<CalendarEvent> {
        let event = self.prepare_update(id, draft, resources)?;
        let canonical = sink.update(event).await.map_err(persistence_failure)?;
        self.apply_updated(id, canonical.clone())?;
        Ok(canonical)
    }

    /// Delete through the sink. Absent ids skip the sink entirely.
    #[tracing::instrument(skip(self, sink))]
    pub async fn persist_remove(&mut self, id: &str, sink: &dyn EventSink) -> ScheduleResult<()> {
        if self.get(id).is_none() {
            debug!("delete for absent event; ignoring");
            return Ok(());
        }
        sink.delete(id).await.map_err(persistence_failure)?;
        self.remove(id);
        Ok(())
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.events.iter().position(|e| e.id == id)
    }

    fn resolve_resource(
        &self,
        requested: &str,
        resources: &ResourceFilterManager,
    ) -> ScheduleResult<String> {
        if resources.get(requested).is_some() {
            return Ok(requested.to_string());
        }

        match self.policy {
            ResourcePolicy::Strict => Err(ScheduleError::UnknownResource(requested.to_string())),
            ResourcePolicy::Lenient => match resources.default_resource() {
                Some(fallback) => {
                    warn!(
                        requested,
                        fallback = %fallback.id,
                        "unknown resource on draft; using default resource"
                    );
                    Ok(fallback.id.clone())
                }
                None => {
                    warn!(requested, "resource roster is empty; keeping requested id");
                    Ok(requested.to_string())
                }
            },
        }
    }

    /// Millisecond timestamp, bumped past anything already issued or stored.
    fn next_id(&mut self) -> String {
        let mut candidate = Utc::now().timestamp_millis().max(self.last_issued_id + 1);
        while self.get(&candidate.to_string()).is_some() {
            candidate += 1;
        }
        self.last_issued_id = candidate;
        candidate.to_string()
    }

    fn note_issued(&mut self, id: &str) {
        if let Ok(numeric) = id.parse::<i64>() {
            self.last_issued_id = self.last_issued_id.max(numeric);
        }
    }
}

fn checked_range(draft: &EditorDraft) -> ScheduleResult<(NaiveDateTime, NaiveDateTime)> {
    let (start, end) = draft.time_range()?;
    if !ScheduleStore::validate_range(start, end) {
        debug!(%start, %end, "rejected time range");
        return Err(ScheduleError::InvalidTimeRange { start, end });
    }
    Ok((start, end))
}

fn build_event(
    id: String,
    draft: &EditorDraft,
    start: NaiveDateTime,
    end: NaiveDateTime,
    resource_id: String,
    resources: &ResourceFilterManager,
) -> CalendarEvent {
    let color = resources.color_of(&resource_id).unwrap_or_default().to_string();
    CalendarEvent {
        id,
        title: draft.title.trim().to_string(),
        patient_label: draft.patient_label.trim().to_string(),
        kind: draft.kind.trim().to_string(),
        start,
        end,
        resource_id,
        background_color: color.clone(),
        border_color: color,
    }
}

fn persistence_failure(err: anyhow::Error) -> ScheduleError {
    warn!(error = %format!("{err:#}"), "event sink rejected the request");
    ScheduleError::PersistenceFailure(format!("{err:#}"))
}
