//! Calendar helpers: day-by-day ranges and period boundaries.

use std::collections::BTreeMap;

use chrono::{Datelike, Days, Duration, Local, Months, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::Serialize;

/// One calendar day inside a [`DateRange`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EachDay {
    pub date: NaiveDate,
    pub day: u32,
    pub month: u32,
    pub year: i32,
}

/// The days of a [`DateRange`] that fall in one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EachMonth {
    pub month: u32,
    pub year: i32,
    pub days: Vec<EachDay>,
}

/// Every day between two dates, both ends included.
#[derive(Debug, Clone, Default)]
pub struct DateRange {
    days: Vec<EachDay>,
}

impl DateRange {
    /// Empty when `end` is before `start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        let days = start
            .iter_days()
            .take_while(|d| *d <= end)
            .map(|date| EachDay {
                date,
                day: date.day(),
                month: date.month(),
                year: date.year(),
            })
            .collect();
        Self { days }
    }

    pub fn by_date(&self) -> &[EachDay] {
        &self.days
    }

    /// Days grouped per month, oldest month first.
    pub fn by_month(&self) -> Vec<EachMonth> {
        let mut months: BTreeMap<(i32, u32), EachMonth> = BTreeMap::new();
        for day in &self.days {
            months
                .entry((day.year, day.month))
                .or_insert_with(|| EachMonth {
                    month: day.month,
                    year: day.year,
                    days: Vec::new(),
                })
                .days
                .push(day.clone());
        }
        months.into_values().collect()
    }
}

/// Period boundaries relative to a reference instant. Weeks start on Monday.
#[derive(Debug, Clone, Copy)]
pub struct Now(pub NaiveDateTime);

impl Now {
    /// Boundaries relative to the local wall clock.
    pub fn local() -> Self {
        Self(Local::now().naive_local())
    }

    pub fn beginning_of_minute(&self) -> NaiveDateTime {
        self.0
            .with_second(0)
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(self.0)
    }

    pub fn beginning_of_hour(&self) -> NaiveDateTime {
        self.beginning_of_minute().with_minute(0).unwrap_or(self.0)
    }

    pub fn beginning_of_day(&self) -> NaiveDateTime {
        self.0.date().and_time(NaiveTime::MIN)
    }

    pub fn beginning_of_week(&self) -> NaiveDateTime {
        let offset = self.0.weekday().num_days_from_monday() as u64;
        (self.0.date() - Days::new(offset)).and_time(NaiveTime::MIN)
    }

    pub fn beginning_of_month(&self) -> NaiveDateTime {
        first_of(self.0.year(), self.0.month())
    }

    pub fn beginning_of_quarter(&self) -> NaiveDateTime {
        let month = (self.0.month() - 1) / 3 * 3 + 1;
        first_of(self.0.year(), month)
    }

    pub fn beginning_of_year(&self) -> NaiveDateTime {
        first_of(self.0.year(), 1)
    }

    pub fn end_of_minute(&self) -> NaiveDateTime {
        last_instant(self.beginning_of_minute() + Duration::minutes(1))
    }

    pub fn end_of_hour(&self) -> NaiveDateTime {
        last_instant(self.beginning_of_hour() + Duration::hours(1))
    }

    pub fn end_of_day(&self) -> NaiveDateTime {
        last_instant(self.beginning_of_day() + Duration::days(1))
    }

    pub fn end_of_week(&self) -> NaiveDateTime {
        last_instant(self.beginning_of_week() + Duration::days(7))
    }

    pub fn end_of_month(&self) -> NaiveDateTime {
        last_instant(self.beginning_of_month() + Months::new(1))
    }

    pub fn end_of_quarter(&self) -> NaiveDateTime {
        last_instant(self.beginning_of_quarter() + Months::new(3))
    }

    pub fn end_of_year(&self) -> NaiveDateTime {
        last_instant(self.beginning_of_year() + Months::new(12))
    }

    /// Start of the Monday of this week.
    pub fn monday(&self) -> NaiveDateTime {
        self.beginning_of_week()
    }

    /// Start of the Sunday that closes this week.
    pub fn sunday(&self) -> NaiveDateTime {
        self.beginning_of_week() + Duration::days(6)
    }

    /// Last instant of the Sunday that closes this week.
    pub fn end_of_sunday(&self) -> NaiveDateTime {
        self.end_of_week()
    }

    /// True when the reference instant lies strictly between `a` and `b`.
    pub fn between(&self, a: NaiveDateTime, b: NaiveDateTime) -> bool {
        self.0 > a && self.0 < b
    }
}

fn first_of(year: i32, month: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, 1)
        .unwrap_or(NaiveDate::MIN)
        .and_time(NaiveTime::MIN)
}

fn last_instant(next_start: NaiveDateTime) -> NaiveDateTime {
    next_start - Duration::nanoseconds(1)
}
