//! Appointment scheduling engine for the
//! clinic calendar: month grids, range
//! labels, doctor filtering, the event store
//! and the single-flight event editor.

pub mod config;
pub mod datetime;
pub mod editor;
pub mod error;
pub mod grid;
pub mod label;
pub mod mini_calendar;
pub mod model;
pub mod resources;
pub mod sources;
pub mod store;

pub use chrono::Locale;
pub use editor::{
  DraftField,
  EditorDraft,
  EditorMode,
  EditorSettings,
  EventEditor,
  PendingSave,
  SaveAction
};
pub use error::{
  ScheduleError,
  ScheduleResult
};
pub use grid::{
  GRID_CELLS,
  NoUrgency,
  UrgencyRule,
  build_month_grid,
  weekday_labels
};
pub use label::format_range_label;
pub use mini_calendar::{
  AnchorOwnership,
  CursorUpdate,
  DateSelected,
  MiniCalendar,
  UpdateOrigin
};
pub use model::{
  CalendarDay,
  CalendarEvent,
  Granularity,
  RangeSelection,
  Resource,
  WeekStart
};
pub use resources::{
  InitialSelection,
  ResourceFilterManager
};
pub use store::{
  ResourcePolicy,
  ScheduleStore
};
