//! Small month picker.
//!
//! The anchor is either owned by the widget
//! (paged with prev/next) or mirrored from a
//! cursor the host owns. Updates carry an
//! origin tag naming the widget that wrote
//! them, so a mirror ignores echoes of its own
//! selections but still follows its siblings.

use std::sync::atomic::{
  AtomicU64,
  Ordering
};

use chrono::{
  Datelike,
  Locale,
  NaiveDate
};
use tracing::debug;

use crate::datetime::{
  first_day_of_month,
  shift_months
};
use crate::grid::{
  GRID_CELLS,
  UrgencyRule,
  build_month_grid
};
use crate::label::format_range_label;
use crate::model::{
  CalendarDay,
  CalendarEvent,
  Granularity,
  WeekStart
};

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum AnchorOwnership {
  Local,
  Mirrored
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum UpdateOrigin {
  /// Written back by the host in response
  /// to a selection in the widget with
  /// this id.
  Widget(u64),
  External
}

static NEXT_WIDGET_ID: AtomicU64 =
  AtomicU64::new(1);

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub struct CursorUpdate {
  pub date:   NaiveDate,
  pub origin: UpdateOrigin
}

/// Emitted to the owner when a day is
/// clicked. The owner tags its write-back
/// with `origin`.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub struct DateSelected {
  pub date:   NaiveDate,
  pub origin: UpdateOrigin
}

#[derive(Debug, Clone)]
pub struct MiniCalendar {
  id:         u64,
  ownership:  AnchorOwnership,
  anchor:     NaiveDate,
  selected:   Option<NaiveDate>,
  week_start: WeekStart
}

impl MiniCalendar {
  pub fn new(
    ownership: AnchorOwnership,
    anchor: NaiveDate,
    week_start: WeekStart
  ) -> Self {
    Self {
      id: NEXT_WIDGET_ID
        .fetch_add(1, Ordering::Relaxed),
      ownership,
      anchor: first_day_of_month(
        anchor.year(),
        anchor.month()
      ),
      selected: match ownership {
        | AnchorOwnership::Local => None,
        | AnchorOwnership::Mirrored => {
          Some(anchor)
        }
      },
      week_start
    }
  }

  /// Process-unique id used in origin tags.
  pub fn id(&self) -> u64 {
    self.id
  }

  pub fn ownership(
    &self
  ) -> AnchorOwnership {
    self.ownership
  }

  /// First day of the visible month.
  pub fn anchor(&self) -> NaiveDate {
    self.anchor
  }

  pub fn selected(
    &self
  ) -> Option<NaiveDate> {
    self.selected
  }

  pub fn week_start(&self) -> WeekStart {
    self.week_start
  }

  pub fn prev_month(
    &mut self
  ) -> NaiveDate {
    self.anchor =
      shift_months(self.anchor, -1);
    debug!(anchor = %self.anchor, "mini calendar paged back");
    self.anchor
  }

  pub fn next_month(
    &mut self
  ) -> NaiveDate {
    self.anchor =
      shift_months(self.anchor, 1);
    debug!(anchor = %self.anchor, "mini calendar paged forward");
    self.anchor
  }

  /// Records the click and returns the
  /// notification for the owner. Does not
  /// touch any store.
  pub fn select_day(
    &mut self,
    date: NaiveDate
  ) -> DateSelected {
    self.selected = Some(date);
    self.anchor = first_day_of_month(
      date.year(),
      date.month()
    );
    DateSelected {
      date,
      origin: UpdateOrigin::Widget(self.id)
    }
  }

  /// Follows the host cursor. Returns
  /// whether the widget changed.
  pub fn observe_cursor(
    &mut self,
    update: CursorUpdate
  ) -> bool {
    if self.ownership
      == AnchorOwnership::Local
    {
      debug!(
        "locally anchored mini calendar \
         ignores host cursor"
      );
      return false;
    }
    if update.origin
      == UpdateOrigin::Widget(self.id)
    {
      debug!(date = %update.date, "ignoring echo of own selection");
      return false;
    }

    let anchor = first_day_of_month(
      update.date.year(),
      update.date.month()
    );
    let changed = self.anchor != anchor
      || self.selected
        != Some(update.date);
    self.anchor = anchor;
    self.selected = Some(update.date);
    changed
  }

  pub fn grid(
    &self,
    events: &[CalendarEvent],
    urgency: &dyn UrgencyRule
  ) -> [CalendarDay; GRID_CELLS] {
    build_month_grid(
      self.anchor.year(),
      self.anchor.month0() as i32,
      events,
      self.week_start,
      urgency
    )
  }

  pub fn title(
    &self,
    locale: Locale
  ) -> String {
    format_range_label(
      self.anchor,
      Granularity::Month,
      locale
    )
  }
}
