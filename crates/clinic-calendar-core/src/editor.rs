//! Single-flight editor for the create /
//! edit / delete modal.
//!
//! At most one draft is open. Saving is split
//! in two steps so a host can await its
//! persistence call without holding the
//! editor: [`EventEditor::begin_confirm`]
//! validates and hands out a [`PendingSave`]
//! ticket, [`EventEditor::complete_save`]
//! applies the outcome. A ticket from an
//! earlier session still updates the store
//! but never touches the current draft.

use chrono::{
  Duration,
  Local,
  NaiveDateTime
};
use serde::{
  Deserialize,
  Serialize
};
use tracing::{
  debug,
  info,
  warn
};

use crate::datetime::{
  format_draft_date,
  format_draft_time,
  parse_clock_time,
  parse_draft_date,
  round_up_to_slot
};
use crate::error::{
  ScheduleError,
  ScheduleResult
};
use crate::model::{
  CalendarEvent,
  RangeSelection
};
use crate::resources::ResourceFilterManager;
use crate::sources::EventSink;
use crate::store::ScheduleStore;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum DraftField {
  Title,
  PatientLabel,
  Kind,
  Date,
  Time,
  EndDate,
  EndTime,
  ResourceId
}

/// Form state while the modal is open.
/// Dates are `YYYY-MM-DD`, times `HH:MM`.
#[derive(
  Debug, Clone, Default, PartialEq, Eq,
)]
pub struct EditorDraft {
  pub title:           String,
  pub patient_label:   String,
  pub kind:            String,
  pub date:            String,
  pub time:            String,
  pub end_date:        String,
  pub end_time:        String,
  pub resource_id:     String,
  /// `None` in create mode, the edited
  /// event's id in edit mode.
  pub source_event_id: Option<String>
}

impl EditorDraft {
  fn spanning(
    start: NaiveDateTime,
    end: NaiveDateTime,
    resource_id: String
  ) -> Self {
    Self {
      date: format_draft_date(
        start.date()
      ),
      time: format_draft_time(
        start.time()
      ),
      end_date: format_draft_date(
        end.date()
      ),
      end_time: format_draft_time(
        end.time()
      ),
      resource_id,
      ..Self::default()
    }
  }

  pub fn from_event(
    event: &CalendarEvent
  ) -> Self {
    Self {
      title: event.title.clone(),
      patient_label: event
        .patient_label
        .clone(),
      kind: event.kind.clone(),
      source_event_id: Some(
        event.id.clone()
      ),
      ..Self::spanning(
        event.start,
        event.end,
        event.resource_id.clone()
      )
    }
  }

  pub fn is_edit(&self) -> bool {
    self.source_event_id.is_some()
  }

  /// Required fields that are blank, in
  /// form order.
  pub fn missing_fields(
    &self
  ) -> Vec<DraftField> {
    [
      (DraftField::Title, &self.title),
      (
        DraftField::PatientLabel,
        &self.patient_label
      ),
      (DraftField::Date, &self.date),
      (DraftField::Time, &self.time),
      (
        DraftField::EndDate,
        &self.end_date
      ),
      (
        DraftField::EndTime,
        &self.end_time
      )
    ]
    .into_iter()
    .filter(|(_, value)| {
      value.trim().is_empty()
    })
    .map(|(field, _)| field)
    .collect()
  }

  /// Combines the separate date and time
  /// fields. Does not check ordering.
  pub fn time_range(
    &self
  ) -> ScheduleResult<(
    NaiveDateTime,
    NaiveDateTime
  )> {
    let start = combine(
      &self.date,
      DraftField::Date,
      &self.time,
      DraftField::Time
    )?;
    let end = combine(
      &self.end_date,
      DraftField::EndDate,
      &self.end_time,
      DraftField::EndTime
    )?;
    Ok((start, end))
  }
}

fn combine(
  date: &str,
  date_field: DraftField,
  time: &str,
  time_field: DraftField
) -> ScheduleResult<NaiveDateTime> {
  let day = parse_draft_date(date)
    .ok_or_else(|| {
      ScheduleError::InvalidField {
        field: date_field,
        value: date.to_string()
      }
    })?;
  let clock = parse_clock_time(time)
    .ok_or_else(|| {
      ScheduleError::InvalidField {
        field: time_field,
        value: time.to_string()
      }
    })?;
  Ok(day.and_time(clock))
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum EditorMode {
  Closed,
  Creating,
  Editing
}

/// Seeding rules for new drafts.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub struct EditorSettings {
  pub slot_minutes:             u32,
  pub default_duration_minutes: u32
}

impl Default for EditorSettings {
  fn default() -> Self {
    Self {
      slot_minutes:             30,
      default_duration_minutes: 30
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveAction {
  Create(CalendarEvent),
  Update {
    original_id: String,
    event:       CalendarEvent
  },
  Delete(String)
}

/// Ticket for one in-flight save. Consumed
/// by [`EventEditor::complete_save`].
#[derive(Debug, PartialEq, Eq)]
pub struct PendingSave {
  session: u64,
  action:  SaveAction
}

impl PendingSave {
  pub fn session(&self) -> u64 {
    self.session
  }

  pub fn action(&self) -> &SaveAction {
    &self.action
  }
}

#[derive(Debug, Clone)]
struct OpenDraft {
  draft:   EditorDraft,
  session: u64,
  saving:  bool
}

#[derive(Debug, Clone, Default)]
pub struct EventEditor {
  open:     Option<OpenDraft>,
  sessions: u64,
  settings: EditorSettings
}

impl EventEditor {
  pub fn new(
    settings: EditorSettings
  ) -> Self {
    Self {
      open: None,
      sessions: 0,
      settings
    }
  }

  pub fn settings(
    &self
  ) -> EditorSettings {
    self.settings
  }

  pub fn mode(&self) -> EditorMode {
    match &self.open {
      | None => EditorMode::Closed,
      | Some(open)
        if open.draft.is_edit() =>
      {
        EditorMode::Editing
      }
      | Some(_) => EditorMode::Creating
    }
  }

  pub fn is_open(&self) -> bool {
    self.open.is_some()
  }

  /// True while a save ticket is out; the
  /// host shows its busy indicator.
  pub fn is_saving(&self) -> bool {
    self
      .open
      .as_ref()
      .is_some_and(|open| open.saving)
  }

  /// Session of the open draft, if any.
  pub fn session(&self) -> Option<u64> {
    self
      .open
      .as_ref()
      .map(|open| open.session)
  }

  pub fn draft(
    &self
  ) -> Option<&EditorDraft> {
    self
      .open
      .as_ref()
      .map(|open| &open.draft)
  }

  pub fn draft_mut(
    &mut self
  ) -> Option<&mut EditorDraft> {
    self
      .open
      .as_mut()
      .map(|open| &mut open.draft)
  }

  fn open_with(
    &mut self,
    draft: EditorDraft
  ) -> ScheduleResult<&EditorDraft> {
    if self.open.is_some() {
      warn!(
        "editor already open; refusing \
         second draft"
      );
      return Err(
        ScheduleError::EditorBusy
      );
    }
    self.sessions += 1;
    info!(
      session = self.sessions,
      edit = draft.is_edit(),
      "editor opened"
    );
    let open =
      self.open.insert(OpenDraft {
        draft,
        session: self.sessions,
        saving: false
      });
    Ok(&open.draft)
  }

  /// Closed -> Creating. The draft starts
  /// at the next slot after `now` and lasts
  /// the default duration.
  #[tracing::instrument(skip(self))]
  pub fn open_for_create(
    &mut self,
    default_resource_id: &str,
    now: NaiveDateTime
  ) -> ScheduleResult<&EditorDraft> {
    let start = round_up_to_slot(
      now,
      self.settings.slot_minutes
    );
    let end = start
      + Duration::minutes(i64::from(
        self
          .settings
          .default_duration_minutes
          .max(1)
      ));
    self.open_with(EditorDraft::spanning(
      start,
      end,
      default_resource_id.to_string()
    ))
  }

  /// `open_for_create` seeded from the
  /// local wall clock.
  pub fn open_for_create_now(
    &mut self,
    default_resource_id: &str
  ) -> ScheduleResult<&EditorDraft> {
    self.open_for_create(
      default_resource_id,
      Local::now().naive_local()
    )
  }

  /// Closed -> Editing.
  #[tracing::instrument(skip(self, event), fields(id = %event.id))]
  pub fn open_for_edit(
    &mut self,
    event: &CalendarEvent
  ) -> ScheduleResult<&EditorDraft> {
    self.open_with(
      EditorDraft::from_event(event)
    )
  }

  /// Closed -> Creating, seeded from a range
  /// picked on the rendering surface.
  #[tracing::instrument(skip(self, resources))]
  pub fn open_from_range_selection(
    &mut self,
    selection: &RangeSelection,
    resources: &ResourceFilterManager
  ) -> ScheduleResult<&EditorDraft> {
    let resource_id = selection
      .resource_id
      .clone()
      .or_else(|| {
        resources
          .default_resource()
          .map(|r| r.id.clone())
      })
      .unwrap_or_default();
    self.open_with(EditorDraft::spanning(
      selection.start,
      selection.end,
      resource_id
    ))
  }

  /// Any open state -> Closed. An in-flight
  /// ticket is not retracted; its outcome
  /// still reaches the store.
  pub fn cancel(&mut self) {
    match self.open.take() {
      | Some(open) => {
        info!(
          session = open.session,
          saving = open.saving,
          "editor cancelled"
        );
      }
      | None => {
        debug!(
          "cancel with editor closed; \
           ignoring"
        );
      }
    }
  }

  /// Validates the open draft and issues a
  /// save ticket. On any error the editor
  /// stays open and unchanged.
  #[tracing::instrument(skip_all)]
  pub fn begin_confirm(
    &mut self,
    store: &mut ScheduleStore,
    resources: &ResourceFilterManager
  ) -> ScheduleResult<PendingSave> {
    let Some(open) = self.open.as_mut()
    else {
      return Err(
        ScheduleError::EditorClosed
      );
    };
    if open.saving {
      return Err(
        ScheduleError::EditorBusy
      );
    }

    let missing =
      open.draft.missing_fields();
    if !missing.is_empty() {
      debug!(
        ?missing,
        "draft incomplete"
      );
      return Err(
        ScheduleError::IncompleteForm {
          missing
        }
      );
    }

    let action = match open
      .draft
      .source_event_id
      .clone()
    {
      | None => {
        SaveAction::Create(
          store.prepare_insert(
            &open.draft,
            resources
          )?
        )
      }
      | Some(original_id) => {
        let event = store
          .prepare_update(
            &original_id,
            &open.draft,
            resources
          )?;
        SaveAction::Update {
          original_id,
          event
        }
      }
    };

    open.saving = true;
    debug!(
      session = open.session,
      "save ticket issued"
    );
    Ok(PendingSave {
      session: open.session,
      action
    })
  }

  /// Editing only. Without confirmation
  /// nothing happens; with it a delete
  /// ticket is issued.
  #[tracing::instrument(skip(self))]
  pub fn begin_delete(
    &mut self,
    confirmed: bool
  ) -> ScheduleResult<Option<PendingSave>>
  {
    let Some(open) = self.open.as_mut()
    else {
      return Err(
        ScheduleError::EditorClosed
      );
    };
    if open.saving {
      return Err(
        ScheduleError::EditorBusy
      );
    }
    let Some(id) =
      open.draft.source_event_id.clone()
    else {
      warn!(
        "delete requested while \
         creating; ignoring"
      );
      return Ok(None);
    };
    if !confirmed {
      debug!("delete not confirmed");
      return Ok(None);
    }

    open.saving = true;
    Ok(Some(PendingSave {
      session: open.session,
      action:  SaveAction::Delete(id)
    }))
  }

  /// Applies the persistence outcome of a
  /// ticket. `Ok(None)` keeps the prepared
  /// record, `Ok(Some(_))` replaces it with
  /// the canonical one. Failures leave the
  /// store untouched.
  #[tracing::instrument(skip(self, pending, outcome, store), fields(session = pending.session))]
  pub fn complete_save(
    &mut self,
    pending: PendingSave,
    outcome: anyhow::Result<
      Option<CalendarEvent>
    >,
    store: &mut ScheduleStore
  ) -> ScheduleResult<Option<CalendarEvent>>
  {
    let current = self
      .open
      .as_ref()
      .is_some_and(|open| {
        open.session == pending.session
      });

    let canonical = match outcome {
      | Ok(canonical) => canonical,
      | Err(err) => {
        let message = format!("{err:#}");
        warn!(
          error = %message,
          current,
          "save rejected by sink"
        );
        if current
          && let Some(open) =
            self.open.as_mut()
        {
          open.saving = false;
        }
        return Err(
          ScheduleError::PersistenceFailure(
            message
          )
        );
      }
    };

    let applied = match pending.action {
      | SaveAction::Create(prepared) => {
        let event = canonical
          .unwrap_or(prepared);
        store.apply_created(event.clone());
        Some(event)
      }
      | SaveAction::Update {
        original_id,
        event: prepared
      } => {
        let event = canonical
          .unwrap_or(prepared);
        if let Err(err) = store
          .apply_updated(
            &original_id,
            event.clone()
          )
        {
          warn!(
            id = %original_id,
            current,
            "update target gone; \
             dropping save"
          );
          if current
            && let Some(open) =
              self.open.as_mut()
          {
            open.saving = false;
          }
          return Err(err);
        }
        Some(event)
      }
      | SaveAction::Delete(id) => {
        store.remove(&id);
        None
      }
    };

    if current {
      self.open = None;
      info!("save completed; editor closed");
    } else {
      info!(
        "late save applied to store; \
         editor left as is"
      );
    }
    Ok(applied)
  }

  /// Local confirm: validates, stores and
  /// closes in one step.
  pub fn confirm(
    &mut self,
    store: &mut ScheduleStore,
    resources: &ResourceFilterManager
  ) -> ScheduleResult<CalendarEvent> {
    let pending =
      self.begin_confirm(store, resources)?;
    let applied = self.complete_save(
      pending,
      Ok(None),
      store
    )?;
    applied.ok_or_else(|| {
      ScheduleError::EditorClosed
    })
  }

  /// Local delete. Returns whether the
  /// editor closed.
  pub fn request_delete(
    &mut self,
    confirmed: bool,
    store: &mut ScheduleStore
  ) -> ScheduleResult<bool> {
    match self.begin_delete(confirmed)? {
      | Some(pending) => {
        self.complete_save(
          pending,
          Ok(None),
          store
        )?;
        Ok(true)
      }
      | None => Ok(false)
    }
  }

  /// Confirm through the sink, staying busy
  /// until it answers.
  pub async fn confirm_with_sink(
    &mut self,
    store: &mut ScheduleStore,
    resources: &ResourceFilterManager,
    sink: &dyn EventSink
  ) -> ScheduleResult<CalendarEvent> {
    let pending =
      self.begin_confirm(store, resources)?;
    let outcome = match pending.action() {
      | SaveAction::Create(event) => {
        sink
          .create(event.clone())
          .await
          .map(Some)
      }
      | SaveAction::Update {
        event, ..
      } => {
        sink
          .update(event.clone())
          .await
          .map(Some)
      }
      | SaveAction::Delete(id) => {
        sink.delete(id).await.map(|()| None)
      }
    };
    let applied = self.complete_save(
      pending, outcome, store
    )?;
    applied.ok_or_else(|| {
      ScheduleError::EditorClosed
    })
  }

  /// Delete through the sink. Returns
  /// whether the editor closed.
  pub async fn delete_with_sink(
    &mut self,
    confirmed: bool,
    store: &mut ScheduleStore,
    sink: &dyn EventSink
  ) -> ScheduleResult<bool> {
    let Some(pending) =
      self.begin_delete(confirmed)?
    else {
      return Ok(false);
    };
    let outcome = match pending.action() {
      | SaveAction::Delete(id) => {
        sink.delete(id).await.map(|()| None)
      }
      | _ => Ok(None)
    };
    self.complete_save(
      pending, outcome, store
    )?;
    Ok(true)
  }
}
