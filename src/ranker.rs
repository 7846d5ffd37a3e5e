use chrono::NaiveDate;

use crate::dates;
use crate::types::Birthday;

/// The `limit` closest upcoming birthdays, today first.
///
/// Each enabled record is placed on a 366-slot circular year and
/// ranked by forward distance from `today`, so December entries come
/// before January entries when standing in November. Equal distances
/// tie-break by ascending id, which keeps repeated calls stable.
pub fn top_upcoming(records: &[Birthday], today: NaiveDate, limit: usize) -> Vec<&Birthday> {
    let mut upcoming: Vec<&Birthday> = records.iter().filter(|b| b.enabled).collect();
    upcoming.sort_by_key(|b| (dates::days_until(today, b.month, b.day), b.id));
    upcoming.truncate(limit);
    upcoming
}
