//! Human-readable labels for the visible
//! calendar range.
//!
//! Labels depend only on the anchor date, the
//! granularity and the locale, never on the
//! current clock.

use chrono::{
  Datelike,
  Locale,
  NaiveDate
};

use crate::datetime::{
  add_days,
  start_of_week
};
use crate::model::{
  Granularity,
  WeekStart
};

const RANGE_SEPARATOR: &str = " – ";

/// Upper-cases the first character and
/// leaves the rest untouched.
#[must_use]
pub fn capitalize_first(
  raw: &str
) -> String {
  let mut chars = raw.chars();
  match chars.next() {
    | Some(first) => {
      first
        .to_uppercase()
        .chain(chars)
        .collect()
    }
    | None => String::new()
  }
}

pub fn month_name(
  date: NaiveDate,
  locale: Locale
) -> String {
  capitalize_first(
    &date
      .format_localized("%B", locale)
      .to_string()
  )
}

pub fn weekday_name(
  date: NaiveDate,
  locale: Locale
) -> String {
  capitalize_first(
    &date
      .format_localized("%A", locale)
      .to_string()
  )
}

/// Monday-start boundaries of the week
/// containing `anchor`. Sunday closes the
/// week.
pub fn week_bounds(
  anchor: NaiveDate
) -> (NaiveDate, NaiveDate) {
  let start = start_of_week(
    anchor,
    WeekStart::Monday
  );
  (start, add_days(start, 6))
}

pub fn format_range_label(
  anchor: NaiveDate,
  granularity: Granularity,
  locale: Locale
) -> String {
  match granularity {
    | Granularity::Month => {
      format!(
        "{} {}",
        month_name(anchor, locale),
        anchor.year()
      )
    }
    | Granularity::Week => {
      format_week_label(anchor, locale)
    }
    | Granularity::Day => {
      format!(
        "{} {} {} {}",
        weekday_name(anchor, locale),
        anchor.day(),
        month_name(anchor, locale),
        anchor.year()
      )
    }
  }
}

fn format_week_label(
  anchor: NaiveDate,
  locale: Locale
) -> String {
  let (start, end) = week_bounds(anchor);

  if start.year() != end.year() {
    return format!(
      "{} {} {}{RANGE_SEPARATOR}{} {} {}",
      start.day(),
      month_name(start, locale),
      start.year(),
      end.day(),
      month_name(end, locale),
      end.year()
    );
  }

  if start.month() == end.month() {
    format!(
      "{}{RANGE_SEPARATOR}{} {} {}",
      start.day(),
      end.day(),
      month_name(end, locale),
      end.year()
    )
  } else {
    format!(
      "{} {}{RANGE_SEPARATOR}{} {} {}",
      start.day(),
      month_name(start, locale),
      end.day(),
      month_name(end, locale),
      end.year()
    )
  }
}

#[cfg(test)]
mod tests {
  use chrono::{
    Locale,
    NaiveDate
  };

  use super::*;

  fn date(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  #[test]
  fn month_label_per_locale() {
    let anchor = date(2025, 6, 15);
    assert_eq!(
      format_range_label(
        anchor,
        Granularity::Month,
        Locale::fr_FR
      ),
      "Juin 2025"
    );
    assert_eq!(
      format_range_label(
        anchor,
        Granularity::Month,
        Locale::en_US
      ),
      "June 2025"
    );
  }

  #[test]
  fn week_label_cross_month() {
    for anchor in [
      date(2025, 5, 26),
      date(2025, 5, 29),
      date(2025, 6, 1)
    ] {
      assert_eq!(
        format_range_label(
          anchor,
          Granularity::Week,
          Locale::fr_FR
        ),
        "26 Mai – 1 Juin 2025"
      );
    }
  }

  #[test]
  fn week_label_same_month() {
    assert_eq!(
      format_range_label(
        date(2025, 6, 11),
        Granularity::Week,
        Locale::fr_FR
      ),
      "9 – 15 Juin 2025"
    );
  }

  #[test]
  fn sunday_closes_the_week() {
    assert_eq!(
      week_bounds(date(2025, 6, 15)),
      (date(2025, 6, 9), date(2025, 6, 15))
    );
  }

  #[test]
  fn week_label_cross_year_names_both_years()
   {
    assert_eq!(
      format_range_label(
        date(2025, 12, 31),
        Granularity::Week,
        Locale::fr_FR
      ),
      "29 Décembre 2025 – 4 Janvier 2026"
    );
  }

  #[test]
  fn day_label_capitalizes_weekday_and_month()
   {
    assert_eq!(
      format_range_label(
        date(2025, 6, 10),
        Granularity::Day,
        Locale::fr_FR
      ),
      "Mardi 10 Juin 2025"
    );
    assert_eq!(
      format_range_label(
        date(2025, 6, 10),
        Granularity::Day,
        Locale::en_US
      ),
      "Tuesday 10 June 2025"
    );
  }

  #[test]
  fn capitalize_leaves_tail_alone() {
    assert_eq!(
      capitalize_first("éTé"),
      "ÉTé"
    );
    assert_eq!(capitalize_first(""), "");
  }
}
