//! Write-time data validation.
//!
//! The schema deliberately does not enforce the date and time invariants, so
//! every repository backend runs these checks before touching storage.
//! Failures carry a plain message; callers wrap them into the repository
//! error taxonomy.

use crate::models::{Like, NewPlannerItem, Planner};
use chrono::{NaiveDate, NaiveTime};

/// `start_date <= end_date`, checked whenever a planner window is written.
pub fn validate_planner_window(start_date: NaiveDate, end_date: NaiveDate) -> Result<(), String> {
    if start_date > end_date {
        return Err(format!(
            "Planner start date {} is after end date {}",
            start_date, end_date
        ));
    }
    Ok(())
}

/// `start_time <= end_time` when both are present. One-sided times pass.
pub fn validate_item_times(
    start_time: Option<NaiveTime>,
    end_time: Option<NaiveTime>,
) -> Result<(), String> {
    if let (Some(start), Some(end)) = (start_time, end_time) {
        if start > end {
            return Err(format!("Start time {} is after end time {}", start, end));
        }
    }
    Ok(())
}

/// A planner item's date must fall inside the owning planner's window.
pub fn validate_item_date(date: NaiveDate, planner: &Planner) -> Result<(), String> {
    if !planner.contains(date) {
        return Err(format!(
            "Item date {} is outside the planner window {} to {}",
            date, planner.start_date, planner.end_date
        ));
    }
    Ok(())
}

/// All write-time checks for one planner item against its planner.
pub fn validate_planner_item(item: &NewPlannerItem, planner: &Planner) -> Result<(), String> {
    validate_item_date(item.date, planner)?;
    validate_item_times(item.start_time, item.end_time)
}

/// A stored like must decompose into a well-formed target: the discriminator
/// pair and the typed reference column have to agree.
pub fn validate_like_shape(like: &Like) -> Result<(), String> {
    like.target().map(|_| ())
}
