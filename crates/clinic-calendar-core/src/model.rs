use chrono::{
  Datelike,
  NaiveDate,
  NaiveDateTime,
  Weekday
};
use serde::{
  Deserialize,
  Serialize
};

/// A schedulable provider (doctor) that
/// events are assigned to.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
  pub id:           String,
  pub display_name: String,
  #[serde(default)]
  pub specialty:    String,
  pub color:        String,
  #[serde(default)]
  pub selected:     bool
}

impl Resource {
  pub fn new(
    id: impl Into<String>,
    display_name: impl Into<String>,
    color: impl Into<String>
  ) -> Self {
    Self {
      id:           id.into(),
      display_name: display_name.into(),
      specialty:    String::new(),
      color:        color.into(),
      selected:     false
    }
  }

  #[must_use]
  pub fn with_specialty(
    mut self,
    specialty: impl Into<String>
  ) -> Self {
    self.specialty = specialty.into();
    self
  }

  #[must_use]
  pub fn selected(
    mut self,
    selected: bool
  ) -> Self {
    self.selected = selected;
    self
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
  pub id:               String,
  pub title:            String,
  #[serde(default)]
  pub patient_label:    String,
  #[serde(default)]
  pub kind:             String,
  pub start:            NaiveDateTime,
  pub end:              NaiveDateTime,
  pub resource_id:      String,
  #[serde(default)]
  pub background_color: String,
  #[serde(default)]
  pub border_color:     String
}

impl CalendarEvent {
  /// Calendar date of the event start,
  /// ignoring time of day.
  pub fn start_date(&self) -> NaiveDate {
    self.start.date()
  }
}

/// One cell of a month grid. Always rebuilt,
/// never mutated in place.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub struct CalendarDay {
  pub date:                    NaiveDate,
  pub is_current_month_member: bool,
  pub has_any_event:           bool,
  pub has_urgent_event:        bool
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
  Month,
  Week,
  Day
}

impl Granularity {
  pub fn all() -> [Self; 3] {
    [Self::Month, Self::Week, Self::Day]
  }

  pub fn as_key(self) -> &'static str {
    match self {
      | Self::Month => "month",
      | Self::Week => "week",
      | Self::Day => "day"
    }
  }

  pub fn from_key(
    key: &str
  ) -> Option<Self> {
    match key.trim() {
      | "month" => Some(Self::Month),
      | "week" => Some(Self::Week),
      | "day" => Some(Self::Day),
      | _ => None
    }
  }
}

/// Which weekday opens a grid row.
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
  #[default]
  Monday,
  Sunday
}

impl WeekStart {
  pub fn from_key(
    raw: &str
  ) -> Option<Self> {
    let trimmed = raw.trim();
    if trimmed
      .eq_ignore_ascii_case("monday")
    {
      Some(Self::Monday)
    } else if trimmed
      .eq_ignore_ascii_case("sunday")
    {
      Some(Self::Sunday)
    } else {
      None
    }
  }

  pub fn as_key(self) -> &'static str {
    match self {
      | Self::Monday => "monday",
      | Self::Sunday => "sunday"
    }
  }

  pub fn weekday(self) -> Weekday {
    match self {
      | Self::Monday => Weekday::Mon,
      | Self::Sunday => Weekday::Sun
    }
  }

  /// Column of `date` in a row opened by
  /// this weekday: 0..=6.
  pub fn offset_of(
    self,
    date: NaiveDate
  ) -> u32 {
    match self {
      | Self::Monday => {
        date
          .weekday()
          .num_days_from_monday()
      }
      | Self::Sunday => {
        date
          .weekday()
          .num_days_from_sunday()
      }
    }
  }
}

/// A start/end range chosen on the
/// rendering surface (e.g. drag-select).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeSelection {
  pub start:       NaiveDateTime,
  pub end:         NaiveDateTime,
  pub resource_id: Option<String>
}
