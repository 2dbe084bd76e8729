//! Error taxonomy for scheduling operations.

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::editor::DraftField;

/// Errors surfaced to the editor or the host UI.
///
/// Every variant is recoverable by the user: the editor stays open and the
/// draft can be corrected and resubmitted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
  #[error(
    "end {end} must be strictly after \
     start {start}"
  )]
  InvalidTimeRange {
    start: NaiveDateTime,
    end:   NaiveDateTime
  },

  #[error(
    "required fields are empty: \
     {missing:?}"
  )]
  IncompleteForm {
    missing: Vec<DraftField>
  },

  #[error("event not found: {0}")]
  NotFound(String),

  #[error("persistence failed: {0}")]
  PersistenceFailure(String),

  #[error("unknown resource: {0}")]
  UnknownResource(String),

  #[error(
    "invalid value for {field:?}: \
     {value:?}"
  )]
  InvalidField {
    field: DraftField,
    value: String
  },

  #[error("an editor draft is already open")]
  EditorBusy,

  #[error("no editor draft is open")]
  EditorClosed
}

/// Result alias for scheduling operations.
pub type ScheduleResult<T> =
  Result<T, ScheduleError>;
