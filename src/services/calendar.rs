use chrono::NaiveDate;

use crate::{error::MenuError, models::calendar::DayEntry};

/// Every calendar day from `start` to `end` inclusive, ascending, with its weekday.
pub fn expand_range(start: NaiveDate, end: NaiveDate) -> Result<Vec<DayEntry>, MenuError> {
    if start > end {
        return Err(MenuError::InvalidRange { start, end });
    }
    Ok(start
        .iter_days()
        .take_while(|date| *date <= end)
        .map(DayEntry::new)
        .collect())
}
