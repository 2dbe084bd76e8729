use std::sync::OnceLock;

use chrono::{
  Datelike,
  Duration,
  NaiveDate,
  NaiveDateTime,
  NaiveTime,
  Timelike
};
use regex::Regex;

use crate::model::{
  Granularity,
  WeekStart
};

const DRAFT_DATE_FORMAT: &str =
  "%Y-%m-%d";

pub fn first_day_of_month(
  year: i32,
  month: u32
) -> NaiveDate {
  NaiveDate::from_ymd_opt(
    year, month, 1
  )
  .unwrap_or(NaiveDate::MIN)
}

pub fn last_day_of_month(
  year: i32,
  month: u32
) -> NaiveDate {
  let (next_year, next_month) =
    if month >= 12 {
      (year.saturating_add(1), 1_u32)
    } else {
      (year, month + 1)
    };
  add_days(
    first_day_of_month(
      next_year, next_month
    ),
    -1
  )
}

pub fn days_in_month(
  year: i32,
  month: u32
) -> u32 {
  last_day_of_month(year, month).day()
}

pub fn add_days(
  date: NaiveDate,
  days: i64
) -> NaiveDate {
  date
    .checked_add_signed(Duration::days(
      days
    ))
    .unwrap_or(date)
}

/// Moves `date` by whole months, clamping
/// the day to the target month's length.
pub fn shift_months(
  date: NaiveDate,
  months: i32
) -> NaiveDate {
  let (year, month) =
    normalize_month_index(
      date.year(),
      date.month0() as i32 + months
    );
  let day = date
    .day()
    .min(days_in_month(year, month));
  NaiveDate::from_ymd_opt(
    year, month, day
  )
  .unwrap_or(date)
}

/// Folds a zero-based month index that may
/// fall outside 0..=11 (e.g. -1 or 12) into
/// the adjacent year. Returns a one-based
/// month.
pub fn normalize_month_index(
  year: i32,
  month_index0: i32
) -> (i32, u32) {
  let year_shift =
    month_index0.div_euclid(12);
  let month0 =
    month_index0.rem_euclid(12);
  (
    year.saturating_add(year_shift),
    month0 as u32 + 1
  )
}

pub fn start_of_week(
  day: NaiveDate,
  week_start: WeekStart
) -> NaiveDate {
  add_days(
    day,
    -i64::from(week_start.offset_of(day))
  )
}

/// One navigation step (prev/next) for the
/// given view granularity.
pub fn shift_focus(
  current: NaiveDate,
  granularity: Granularity,
  step: i64
) -> NaiveDate {
  match granularity {
    | Granularity::Month => {
      let months = step.clamp(
        i64::from(i32::MIN),
        i64::from(i32::MAX)
      ) as i32;
      shift_months(current, months)
    }
    | Granularity::Week => {
      add_days(current, step * 7)
    }
    | Granularity::Day => {
      add_days(current, step)
    }
  }
}

/// Inclusive date window shown by a view.
pub fn view_window(
  focus: NaiveDate,
  granularity: Granularity,
  week_start: WeekStart
) -> (NaiveDate, NaiveDate) {
  match granularity {
    | Granularity::Month => {
      (
        first_day_of_month(
          focus.year(),
          focus.month()
        ),
        last_day_of_month(
          focus.year(),
          focus.month()
        )
      )
    }
    | Granularity::Week => {
      let start = start_of_week(
        focus, week_start
      );
      (start, add_days(start, 6))
    }
    | Granularity::Day => (focus, focus)
  }
}

pub fn parse_draft_date(
  raw: &str
) -> Option<NaiveDate> {
  NaiveDate::parse_from_str(
    raw.trim(),
    DRAFT_DATE_FORMAT
  )
  .ok()
}

#[must_use]
pub fn format_draft_date(
  date: NaiveDate
) -> String {
  date
    .format(DRAFT_DATE_FORMAT)
    .to_string()
}

#[must_use]
pub fn format_draft_time(
  time: NaiveTime
) -> String {
  time.format("%H:%M").to_string()
}

fn clock_regex() -> Option<&'static Regex>
{
  static CLOCK_RE: OnceLock<
    Option<Regex>
  > = OnceLock::new();
  CLOCK_RE
    .get_or_init(|| {
      Regex::new(
        r"(?i)^(?P<hour>\d{1,2}):(?P<minute>\d{2})\s*(?P<ampm>[ap]m)?$",
      )
      .ok()
    })
    .as_ref()
}

/// Parses `15:23`, `9:05` or `3:23pm`.
pub fn parse_clock_time(
  token: &str
) -> Option<NaiveTime> {
  let captures = clock_regex()?
    .captures(token.trim())?;

  let raw_hour = captures
    .name("hour")?
    .as_str()
    .parse::<u32>()
    .ok()?;
  let minute = captures
    .name("minute")?
    .as_str()
    .parse::<u32>()
    .ok()?;
  if minute > 59 {
    return None;
  }

  let hour = if let Some(ampm_match) =
    captures.name("ampm")
  {
    if raw_hour == 0 || raw_hour > 12 {
      return None;
    }
    let is_pm = ampm_match
      .as_str()
      .eq_ignore_ascii_case("pm");
    match (is_pm, raw_hour) {
      | (false, 12) => 0,
      | (true, 12) => 12,
      | (true, hour) => hour + 12,
      | (false, hour) => hour
    }
  } else {
    if raw_hour > 23 {
      return None;
    }
    raw_hour
  };

  NaiveTime::from_hms_opt(
    hour, minute, 0
  )
}

/// Rounds up to the next multiple of
/// `slot_minutes` past midnight. Instants
/// already on a boundary are kept.
pub fn round_up_to_slot(
  at: NaiveDateTime,
  slot_minutes: u32
) -> NaiveDateTime {
  let slot_secs =
    i64::from(slot_minutes.max(1)) * 60;
  let mut secs = i64::from(
    at.time().num_seconds_from_midnight()
  );
  if at.time().nanosecond() > 0 {
    secs += 1;
  }
  let rounded = (secs + slot_secs - 1)
    / slot_secs
    * slot_secs;
  at.date().and_time(NaiveTime::MIN)
    + Duration::seconds(rounded)
}
