use std::collections::BTreeMap;
use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::{Datelike, NaiveDate};
use unicode_width::UnicodeWidthStr;

use crate::calendar::MonthGrid;
use crate::config::Config;
use crate::task::{Status, Task};

const WEEKDAY_LABELS: [&str; 7] = ["Su", "Mo", "Tu", "We", "Th", "Fr", "Sa"];
const DAY_CELL_WIDTH: usize = 8;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self { color })
    }

    #[tracing::instrument(skip(self, tasks, today))]
    pub fn print_task_table(&mut self, tasks: &[Task], today: NaiveDate) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        let headers = ["ID", "Status", "Due", "Title", "Description"];
        let mut rows = Vec::with_capacity(tasks.len());

        for task in tasks {
            let id = self.paint(&short_id(task.id), "33");

            let due = task.due_date.map(|d| d.to_string()).unwrap_or_default();
            let due = match task.due_date {
                Some(date) if date < today && task.status != Status::Completed => {
                    self.paint(&due, "31")
                }
                _ => due,
            };

            rows.push(vec![
                id,
                task.status.to_string(),
                due,
                task.title.clone(),
                task.description.clone().unwrap_or_default(),
            ]);
        }

        write_table(&mut out, &headers, rows)?;
        Ok(())
    }

    /// Month grid: weekday header, blank-padded first week, one cell per
    /// day with the due-task count, today starred, selected bracketed.
    #[tracing::instrument(skip(self, grid, buckets))]
    pub fn print_month(
        &mut self,
        grid: &MonthGrid,
        buckets: &BTreeMap<NaiveDate, Vec<&Task>>,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        let title = NaiveDate::from_ymd_opt(grid.year, grid.month, 1)
            .map(|d| d.format("%B %Y").to_string())
            .unwrap_or_else(|| format!("{}-{:02}", grid.year, grid.month));
        writeln!(out, "{title}")?;

        for label in WEEKDAY_LABELS {
            write!(out, " {label:<width$}", width = DAY_CELL_WIDTH - 1)?;
        }
        writeln!(out)?;

        for week in grid.cells.chunks(WEEKDAY_LABELS.len()) {
            for cell in week {
                let count = cell
                    .date
                    .and_then(|date| buckets.get(&date))
                    .map(Vec::len)
                    .unwrap_or(0);
                let plain = format_day_cell(cell.date, cell.is_today, cell.is_selected, count);
                let painted = if cell.is_today {
                    self.paint(&plain, "33")
                } else if cell.is_selected {
                    self.paint(&plain, "36")
                } else {
                    plain
                };
                write!(out, "{painted}")?;
            }
            writeln!(out)?;
        }

        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

pub fn short_id(id: uuid::Uuid) -> String {
    id.to_string().chars().take(8).collect()
}

fn format_day_cell(
    date: Option<NaiveDate>,
    is_today: bool,
    is_selected: bool,
    task_count: usize,
) -> String {
    let Some(date) = date else {
        return " ".repeat(DAY_CELL_WIDTH);
    };

    let mut inner = format!("{:>2}", date.day());
    if is_today {
        inner.push('*');
    }
    if task_count > 0 {
        inner.push_str(&format!(":{task_count}"));
    }

    let wrapped = if is_selected {
        format!("[{inner}]")
    } else {
        format!(" {inner} ")
    };
    format!("{wrapped:<width$}", width = DAY_CELL_WIDTH)
}

fn write_table<W: Write>(
    mut writer: W,
    headers: &[&str],
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(*header));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for idx in 0..column_count {
            let cell = &row[idx];
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    #[test]
    fn day_cells_have_a_fixed_width() {
        let blank = format_day_cell(None, false, false, 0);
        assert_eq!(blank.len(), DAY_CELL_WIDTH);

        let plain = format_day_cell(Some(date(2024, 3, 5)), false, false, 0);
        let busy = format_day_cell(Some(date(2024, 3, 5)), true, true, 3);
        assert_eq!(plain.len(), DAY_CELL_WIDTH);
        assert_eq!(busy.len(), DAY_CELL_WIDTH);
        assert!(busy.starts_with("[ 5*:3]"));
    }

    #[test]
    fn stripping_ansi_recovers_visible_text() {
        assert_eq!(strip_ansi("\x1b[33mhello\x1b[0m"), "hello");
        assert_eq!(strip_ansi("plain"), "plain");
    }

    #[test]
    fn table_columns_are_padded_to_the_widest_cell() {
        let mut buffer = Vec::new();
        write_table(
            &mut buffer,
            &["A", "B"],
            vec![
                vec!["x".to_string(), "wide cell".to_string()],
                vec!["longer".to_string(), "y".to_string()],
            ],
        )
        .expect("write table");

        let text = String::from_utf8(buffer).expect("utf8 table");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "A      B         ");
        assert!(lines[1].starts_with("------ ---------"));
    }
}
