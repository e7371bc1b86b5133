//! Target selection: which dates need a document.

use crate::activity::ActivityRecord;
use crate::document::ExistingDocuments;
use chrono::NaiveDate;
use std::path::PathBuf;

/// User filters for a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionCriteria {
    /// Inclusive lower bound
    pub from: Option<NaiveDate>,
    /// Inclusive upper bound
    pub to: Option<NaiveDate>,
    pub overwrite: bool,
    /// Cap applied after ordering; `None` means no cap
    pub limit: Option<usize>,
}

impl SelectionCriteria {
    fn in_bounds(&self, date: &NaiveDate) -> bool {
        self.from.map_or(true, |from| *date >= from) && self.to.map_or(true, |to| *date <= to)
    }
}

/// One unit of work: a day's record plus any documents it replaces
#[derive(Debug, Clone, PartialEq)]
pub struct WorkItem {
    pub date: NaiveDate,
    pub record: ActivityRecord,
    /// Existing documents for the date; non-empty only with overwrite
    pub replaces: Vec<PathBuf>,
}

/// Build the work list, newest date first.
///
/// A record is dropped when it is out of bounds, carries an error marker, has
/// no ideas or commits, or already has a document and overwrite is off.
pub fn select_targets<'a, I>(
    records: I,
    existing: &ExistingDocuments,
    criteria: &SelectionCriteria,
) -> Vec<WorkItem>
where
    I: IntoIterator<Item = &'a ActivityRecord>,
{
    let mut targets: Vec<WorkItem> = records
        .into_iter()
        .filter(|r| criteria.in_bounds(&r.date))
        .filter(|r| r.is_eligible())
        .filter(|r| criteria.overwrite || !existing.contains(&r.date))
        .map(|r| WorkItem {
            date: r.date,
            record: r.clone(),
            replaces: if criteria.overwrite {
                existing.for_date(&r.date).to_vec()
            } else {
                Vec::new()
            },
        })
        .collect();

    targets.sort_by(|a, b| b.date.cmp(&a.date));
    if let Some(limit) = criteria.limit {
        targets.truncate(limit);
    }
    targets
}
