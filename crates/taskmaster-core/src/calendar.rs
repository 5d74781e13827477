use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use tracing::trace;

use crate::task::Task;

/// One slot of the month grid. `date` is `None` for the leading
/// placeholders that align day 1 under its weekday column; a placeholder
/// is never today, never selected, and never owns tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayCell {
    pub date: Option<NaiveDate>,
    pub is_today: bool,
    pub is_selected: bool,
}

#[derive(Debug, Clone)]
pub struct MonthGrid {
    pub year: i32,
    pub month: u32,
    pub cells: Vec<DayCell>,
}

impl MonthGrid {
    pub fn leading_blanks(&self) -> usize {
        self.cells.iter().take_while(|cell| cell.date.is_none()).count()
    }
}

/// Lays out the month containing `focus` as weekday-aligned cells: one
/// blank per weekday before the 1st (weeks start on Sunday), then one cell
/// per calendar day.
#[tracing::instrument(skip(focus, today, selected))]
pub fn month_grid(focus: NaiveDate, today: NaiveDate, selected: Option<NaiveDate>) -> MonthGrid {
    let year = focus.year();
    let month = focus.month();
    let first = first_day_of_month(year, month);
    let days = days_in_month(year, month);
    let leading = first.weekday().num_days_from_sunday() as usize;

    let mut cells = Vec::with_capacity(leading + days as usize);
    for _ in 0..leading {
        cells.push(DayCell {
            date: None,
            is_today: false,
            is_selected: false,
        });
    }

    for day in 1..=days {
        let date = NaiveDate::from_ymd_opt(year, month, day).unwrap_or(first);
        cells.push(DayCell {
            date: Some(date),
            is_today: date == today,
            is_selected: selected == Some(date),
        });
    }

    trace!(year, month, leading, days, "built month grid");
    MonthGrid { year, month, cells }
}

/// Groups tasks by due date; undated tasks are left out. Day cells look
/// their tasks up by their own date.
pub fn bucket_by_due(tasks: &[Task]) -> BTreeMap<NaiveDate, Vec<&Task>> {
    let mut buckets: BTreeMap<NaiveDate, Vec<&Task>> = BTreeMap::new();
    for task in tasks {
        if let Some(due) = task.due_date {
            buckets.entry(due).or_default().push(task);
        }
    }
    buckets
}

/// Navigation state for the calendar view: a focus month plus an optional
/// selected day. Moving to another month drops the selection.
#[derive(Debug, Clone, Copy)]
pub struct MonthCursor {
    focus: NaiveDate,
    selected: Option<NaiveDate>,
}

impl MonthCursor {
    pub fn new(focus: NaiveDate) -> Self {
        Self {
            focus: first_day_of_month(focus.year(), focus.month()),
            selected: None,
        }
    }

    pub fn focus(&self) -> NaiveDate {
        self.focus
    }

    pub fn selected(&self) -> Option<NaiveDate> {
        self.selected
    }

    pub fn select(&mut self, date: Option<NaiveDate>) {
        self.selected = date;
    }

    pub fn prev_month(&mut self) {
        self.focus = shift_month_start(self.focus, -1);
        self.selected = None;
    }

    pub fn next_month(&mut self) {
        self.focus = shift_month_start(self.focus, 1);
        self.selected = None;
    }
}

fn shift_month_start(focus: NaiveDate, months: i32) -> NaiveDate {
    let mut year = focus.year();
    let mut month = focus.month() as i32 + months;

    while month < 1 {
        month += 12;
        year = year.saturating_sub(1);
    }
    while month > 12 {
        month -= 12;
        year = year.saturating_add(1);
    }

    first_day_of_month(year, month as u32)
}

fn first_day_of_month(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN)
}

pub fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    let (next_year, next_month) = if month >= 12 {
        (year.saturating_add(1), 1_u32)
    } else {
        (year, month + 1)
    };
    first_day_of_month(next_year, next_month) - Duration::days(1)
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    last_day_of_month(year, month).day()
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::task::Status;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    fn due_task(due: Option<NaiveDate>) -> Task {
        Task {
            id: Uuid::new_v4(),
            title: "calendar fixture".to_string(),
            description: None,
            due_date: due,
            status: Status::New,
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn grid_is_leading_blanks_then_one_cell_per_day() {
        // March 2024 starts on a Friday (weekday index 5) and has 31 days.
        let grid = month_grid(date(2024, 3, 15), date(2024, 3, 15), None);

        assert_eq!(grid.leading_blanks(), 5);
        assert_eq!(grid.cells.len(), 5 + 31);
        assert_eq!(grid.cells[5].date, Some(date(2024, 3, 1)));
        assert_eq!(grid.cells.last().and_then(|c| c.date), Some(date(2024, 3, 31)));
    }

    #[test]
    fn leap_february_gets_twenty_nine_day_cells() {
        let grid = month_grid(date(2024, 2, 1), date(2024, 3, 15), None);

        // 2024-02-01 is a Thursday.
        assert_eq!(grid.leading_blanks(), 4);
        assert_eq!(grid.cells.len(), 4 + 29);
    }

    #[test]
    fn sunday_start_month_has_no_leading_blanks() {
        // September 2024 begins on a Sunday.
        let grid = month_grid(date(2024, 9, 1), date(2024, 9, 1), None);

        assert_eq!(grid.leading_blanks(), 0);
        assert_eq!(grid.cells.len(), 30);
    }

    #[test]
    fn placeholders_never_match_today_or_selection() {
        let today = date(2024, 3, 1);
        let grid = month_grid(today, today, Some(today));

        for cell in grid.cells.iter().take(grid.leading_blanks()) {
            assert_eq!(cell.date, None);
            assert!(!cell.is_today);
            assert!(!cell.is_selected);
        }
    }

    #[test]
    fn today_and_selected_flags_require_exact_date_match() {
        let today = date(2024, 3, 7);
        let selected = date(2024, 3, 9);
        let grid = month_grid(today, today, Some(selected));

        let flagged_today: Vec<NaiveDate> = grid
            .cells
            .iter()
            .filter(|c| c.is_today)
            .filter_map(|c| c.date)
            .collect();
        let flagged_selected: Vec<NaiveDate> = grid
            .cells
            .iter()
            .filter(|c| c.is_selected)
            .filter_map(|c| c.date)
            .collect();

        assert_eq!(flagged_today, vec![today]);
        assert_eq!(flagged_selected, vec![selected]);
    }

    #[test]
    fn today_outside_focus_month_flags_nothing() {
        let grid = month_grid(date(2024, 4, 1), date(2024, 3, 31), None);
        assert!(grid.cells.iter().all(|c| !c.is_today));
    }

    #[test]
    fn month_navigation_clears_the_selection() {
        let mut cursor = MonthCursor::new(date(2024, 3, 15));
        cursor.select(Some(date(2024, 3, 9)));
        assert!(cursor.selected().is_some());

        cursor.next_month();
        assert_eq!(cursor.focus(), date(2024, 4, 1));
        assert_eq!(cursor.selected(), None);

        cursor.select(Some(date(2024, 4, 2)));
        cursor.prev_month();
        assert_eq!(cursor.focus(), date(2024, 3, 1));
        assert_eq!(cursor.selected(), None);
    }

    #[test]
    fn cursor_navigation_crosses_year_boundaries() {
        let mut cursor = MonthCursor::new(date(2024, 1, 20));
        cursor.prev_month();
        assert_eq!(cursor.focus(), date(2023, 12, 1));

        cursor.next_month();
        cursor.next_month();
        assert_eq!(cursor.focus(), date(2024, 2, 1));
    }

    #[test]
    fn bucketing_groups_by_due_date_and_skips_undated() {
        let first = date(2024, 3, 1);
        let tasks = vec![
            due_task(Some(first)),
            due_task(Some(first)),
            due_task(Some(date(2024, 3, 2))),
            due_task(None),
        ];

        let buckets = bucket_by_due(&tasks);
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets.get(&first).map(Vec::len), Some(2));
        assert_eq!(buckets.get(&date(2024, 3, 2)).map(Vec::len), Some(1));
    }

    #[test]
    fn days_in_month_handles_leap_years() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2025, 2), 28);
        assert_eq!(days_in_month(2024, 12), 31);
        assert_eq!(last_day_of_month(2024, 12), date(2024, 12, 31));
    }
}
