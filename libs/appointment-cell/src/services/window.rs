// libs/appointment-cell/src/services/window.rs
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use shared_database::AppointmentFilter;
use shared_models::validation::ValidationErrors;

/// The half-open range `[date 00:00:00, date+1 00:00:00)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DayWindow {
    pub fn for_date(date: NaiveDate) -> Result<Self, ValidationErrors> {
        let start = date.and_time(NaiveTime::MIN);
        let end = start
            .checked_add_signed(Duration::days(1))
            .ok_or_else(|| ValidationErrors::single("date", format!("{} is out of range", date)))?;

        Ok(Self { start, end })
    }

    pub fn filter(&self) -> AppointmentFilter {
        AppointmentFilter::new().starting_between(self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_bounds() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 24).unwrap();
        let window = DayWindow::for_date(date).unwrap();

        assert_eq!(window.start, date.and_hms_opt(0, 0, 0).unwrap());
        assert_eq!(window.end, NaiveDate::from_ymd_opt(2026, 1, 25).unwrap().and_hms_opt(0, 0, 0).unwrap());
        assert!(window.start < date.and_hms_opt(23, 59, 59).unwrap());
        assert!(date.and_hms_opt(23, 59, 59).unwrap() < window.end);
    }

    #[test]
    fn test_window_crosses_month_and_leap_day() {
        let leap = NaiveDate::from_ymd_opt(2028, 2, 29).unwrap();
        let window = DayWindow::for_date(leap).unwrap();
        assert_eq!(window.end.date(), NaiveDate::from_ymd_opt(2028, 3, 1).unwrap());
    }

    #[test]
    fn test_last_representable_date_is_rejected() {
        assert!(DayWindow::for_date(NaiveDate::MAX).is_err());
    }
}
