use std::collections::BTreeMap;

use chrono::{
  Datelike,
  Locale,
  NaiveDate
};

use crate::datetime::{
  add_days,
  first_day_of_month,
  normalize_month_index,
  start_of_week
};
use crate::label::capitalize_first;
use crate::model::{
  CalendarDay,
  CalendarEvent,
  WeekStart
};

/// Six full weeks, so the rendered grid
/// keeps a fixed height.
pub const GRID_CELLS: usize = 42;

/// Decides whether an event marks its day
/// as urgent.
pub trait UrgencyRule {
  fn is_urgent(
    &self,
    event: &CalendarEvent
  ) -> bool;
}

impl<F> UrgencyRule for F
where
  F: Fn(&CalendarEvent) -> bool
{
  fn is_urgent(
    &self,
    event: &CalendarEvent
  ) -> bool {
    self(event)
  }
}

/// Rule that never flags anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoUrgency;

impl UrgencyRule for NoUrgency {
  fn is_urgent(
    &self,
    _event: &CalendarEvent
  ) -> bool {
    false
  }
}

#[derive(Default, Clone, Copy)]
struct DayFlags {
  any:    bool,
  urgent: bool
}

/// Builds the 42-cell grid for the month at
/// `month_index0` (0 = January). Indices
/// outside 0..=11 roll into the adjacent
/// year.
#[tracing::instrument(skip(
  events, urgency
))]
pub fn build_month_grid(
  year: i32,
  month_index0: i32,
  events: &[CalendarEvent],
  week_start: WeekStart,
  urgency: &dyn UrgencyRule
) -> [CalendarDay; GRID_CELLS] {
  let (year, month) =
    normalize_month_index(
      year,
      month_index0
    );
  let first =
    first_day_of_month(year, month);
  let grid_start =
    start_of_week(first, week_start);
  let grid_end = add_days(
    grid_start,
    GRID_CELLS as i64 - 1
  );

  let mut flags: BTreeMap<
    NaiveDate,
    DayFlags
  > = BTreeMap::new();
  for event in events {
    let day = event.start_date();
    if day < grid_start || day > grid_end
    {
      continue;
    }
    let entry =
      flags.entry(day).or_default();
    entry.any = true;
    if !entry.urgent
      && urgency.is_urgent(event)
    {
      entry.urgent = true;
    }
  }

  tracing::debug!(
    year,
    month,
    grid_start = %grid_start,
    event_days = flags.len(),
    "built month grid"
  );

  std::array::from_fn(|offset| {
    let date =
      add_days(grid_start, offset as i64);
    let day_flags = flags
      .get(&date)
      .copied()
      .unwrap_or_default();
    CalendarDay {
      date,
      is_current_month_member: date
        .year()
        == year
        && date.month() == month,
      has_any_event: day_flags.any,
      has_urgent_event: day_flags.urgent
    }
  })
}

/// Abbreviated weekday names in grid column
/// order.
pub fn weekday_labels(
  week_start: WeekStart,
  locale: Locale
) -> [String; 7] {
  // 2024-01-01 is a Monday, 2023-12-31 a Sunday.
  let first = match week_start {
    | WeekStart::Monday => {
      NaiveDate::from_ymd_opt(2024, 1, 1)
    }
    | WeekStart::Sunday => {
      NaiveDate::from_ymd_opt(
        2023, 12, 31
      )
    }
  }
  .unwrap_or(NaiveDate::MIN);

  std::array::from_fn(|offset| {
    let day =
      add_days(first, offset as i64);
    capitalize_first(
      &day
        .format_localized("%a", locale)
        .to_string()
    )
  })
}

#[cfg(test)]
mod tests {
  use chrono::{
    Datelike,
    Locale,
    NaiveDate,
    Weekday
  };

  use super::*;
  use crate::datetime::days_in_month;

  fn event_on(
    id: &str,
    date: NaiveDate,
    hour: u32
  ) -> CalendarEvent {
    let start = date
      .and_hms_opt(hour, 0, 0)
      .expect("valid start");
    CalendarEvent {
      id:               id.to_string(),
      title:            format!("event {id}"),
      patient_label:    String::new(),
      kind:             String::new(),
      start,
      end:              start
        + chrono::Duration::minutes(30),
      resource_id:      "A".to_string(),
      background_color: "#123456"
        .to_string(),
      border_color:     "#123456"
        .to_string()
    }
  }

  #[test]
  fn every_month_has_42_cells_and_exact_membership()
   {
    for year in [2023, 2024, 2025, 2026]
    {
      for month0 in 0..12 {
        for week_start in [
          WeekStart::Monday,
          WeekStart::Sunday
        ] {
          let grid = build_month_grid(
            year,
            month0,
            &[],
            week_start,
            &NoUrgency
          );
          assert_eq!(
            grid.len(),
            GRID_CELLS
          );
          let members = grid
            .iter()
            .filter(|cell| {
              cell.is_current_month_member
            })
            .count();
          assert_eq!(
            members as u32,
            days_in_month(
              year,
              month0 as u32 + 1
            )
          );
          assert_eq!(
            grid[0].date.weekday(),
            week_start.weekday()
          );
          for pair in grid.windows(2) {
            assert_eq!(
              pair[1].date,
              pair[0].date.succ_opt()
                .expect("next day")
            );
          }
        }
      }
    }
  }

  #[test]
  fn month_starting_on_week_start_still_fills_six_weeks()
   {
    // June 2025 begins on a Sunday.
    let grid = build_month_grid(
      2025,
      5,
      &[],
      WeekStart::Sunday,
      &NoUrgency
    );
    assert_eq!(
      grid[0].date,
      NaiveDate::from_ymd_opt(2025, 6, 1)
        .expect("valid date")
    );
    assert!(
      grid[0].is_current_month_member
    );
    assert_eq!(
      grid[41].date,
      NaiveDate::from_ymd_opt(
        2025, 7, 12
      )
      .expect("valid date")
    );
  }

  #[test]
  fn monday_grid_pulls_leading_days_from_previous_month()
   {
    let grid = build_month_grid(
      2025,
      5,
      &[],
      WeekStart::Monday,
      &NoUrgency
    );
    assert_eq!(
      grid[0].date,
      NaiveDate::from_ymd_opt(
        2025, 5, 26
      )
      .expect("valid date")
    );
    assert_eq!(
      grid[0].date.weekday(),
      Weekday::Mon
    );
    assert!(
      !grid[0].is_current_month_member
    );
    assert!(
      grid[6].is_current_month_member
    );
  }

  #[test]
  fn event_marks_only_its_start_day() {
    let day =
      NaiveDate::from_ymd_opt(2025, 6, 10)
        .expect("valid date");
    let mut long_event =
      event_on("1", day, 23);
    long_event.end = day
      .succ_opt()
      .expect("next day")
      .and_hms_opt(9, 0, 0)
      .expect("valid end");

    let grid = build_month_grid(
      2025,
      5,
      &[long_event],
      WeekStart::Monday,
      &NoUrgency
    );
    let marked = grid
      .iter()
      .filter(|cell| cell.has_any_event)
      .map(|cell| cell.date)
      .collect::<Vec<_>>();
    assert_eq!(marked, vec![day]);
  }

  #[test]
  fn events_in_spill_over_cells_are_marked()
   {
    let spill =
      NaiveDate::from_ymd_opt(2025, 7, 2)
        .expect("valid date");
    let outside =
      NaiveDate::from_ymd_opt(2025, 9, 1)
        .expect("valid date");
    let grid = build_month_grid(
      2025,
      5,
      &[
        event_on("1", spill, 8),
        event_on("2", outside, 8)
      ],
      WeekStart::Monday,
      &NoUrgency
    );
    let cell = grid
      .iter()
      .find(|cell| cell.date == spill)
      .expect("spill cell present");
    assert!(cell.has_any_event);
    assert!(
      !cell.is_current_month_member
    );
    assert_eq!(
      grid
        .iter()
        .filter(|cell| cell.has_any_event)
        .count(),
      1
    );
  }

  #[test]
  fn urgency_comes_from_the_supplied_rule()
   {
    let day =
      NaiveDate::from_ymd_opt(2025, 6, 12)
        .expect("valid date");
    let mut urgent =
      event_on("u", day, 9);
    urgent.title =
      "URGENT follow-up".to_string();
    let calm = event_on(
      "c",
      NaiveDate::from_ymd_opt(
        2025, 6, 13
      )
      .expect("valid date"),
      9
    );

    let rule = |event: &CalendarEvent| {
      event.title.starts_with("URGENT")
    };
    let grid = build_month_grid(
      2025,
      5,
      &[urgent, calm],
      WeekStart::Monday,
      &rule
    );
    let urgent_days = grid
      .iter()
      .filter(|cell| {
        cell.has_urgent_event
      })
      .map(|cell| cell.date)
      .collect::<Vec<_>>();
    assert_eq!(urgent_days, vec![day]);
  }

  #[test]
  fn weekday_labels_follow_week_start() {
    let monday = weekday_labels(
      WeekStart::Monday,
      Locale::en_US
    );
    assert_eq!(monday[0], "Mon");
    assert_eq!(monday[6], "Sun");

    let sunday = weekday_labels(
      WeekStart::Sunday,
      Locale::en_US
    );
    assert_eq!(sunday[0], "Sun");
    assert_eq!(sunday[1], "Mon");
  }
}
