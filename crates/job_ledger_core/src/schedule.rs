//! crates/job_ledger_core/src/schedule.rs
//!
//! Deadline arithmetic: urgency buckets for display and the monthly
//! materialization of recurring tasks.

use chrono::{Datelike, Months, NaiveDate};

use crate::domain::{NewTask, Task, TaskType};

/// How many monthly instances a recurring task expands into.
pub const RECURRING_MONTHS: u32 = 12;

/// Urgency bucket of a task relative to today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadlineStatus {
    Completed,
    Overdue,
    DueToday,
    /// Due within 5 days.
    Red,
    /// Due within 10 days.
    Yellow,
    Green,
    NoDeadline,
}

impl DeadlineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeadlineStatus::Completed => "completed",
            DeadlineStatus::Overdue => "overdue",
            DeadlineStatus::DueToday => "due_today",
            DeadlineStatus::Red => "task_red",
            DeadlineStatus::Yellow => "task_yellow",
            DeadlineStatus::Green => "task_green",
            DeadlineStatus::NoDeadline => "no_deadline",
        }
    }

    pub fn of(task: &Task, today: NaiveDate) -> Self {
        let Some(days) = days_until(task.deadline, today) else {
            return DeadlineStatus::NoDeadline;
        };
        if task.is_complete() {
            DeadlineStatus::Completed
        } else if days < 0 {
            DeadlineStatus::Overdue
        } else if days == 0 {
            DeadlineStatus::DueToday
        } else if days <= 5 {
            DeadlineStatus::Red
        } else if days <= 10 {
            DeadlineStatus::Yellow
        } else {
            DeadlineStatus::Green
        }
    }
}

pub fn days_until(deadline: Option<NaiveDate>, today: NaiveDate) -> Option<i64> {
    deadline.map(|d| (d - today).num_days())
}

fn days_in_month(first_of_month: NaiveDate) -> u32 {
    first_of_month
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}

/// The same day-of-month as `today` in each of the next `count` months,
/// starting with the current one. Days past the end of a short month clamp to
/// its last day.
pub fn monthly_occurrences(today: NaiveDate, count: u32) -> Vec<NaiveDate> {
    let Some(first) = today.with_day(1) else {
        return Vec::new();
    };
    (0..count)
        .filter_map(|i| first.checked_add_months(Months::new(i)))
        .filter_map(|month_start| {
            let day = today.day().min(days_in_month(month_start));
            month_start.with_day(day)
        })
        .collect()
}

/// Expands a recurring task into one instance per month.
///
/// The first instance covers the current month and keeps the requested
/// deadline; later instances are due on the same day in their month. Each
/// title is suffixed with the month name. Non-recurring tasks pass through.
pub fn expand_recurring(task: NewTask, today: NaiveDate) -> Vec<NewTask> {
    if task.task_type != TaskType::Recurring {
        return vec![task];
    }
    monthly_occurrences(today, RECURRING_MONTHS)
        .into_iter()
        .enumerate()
        .map(|(i, date)| NewTask {
            title: format!("{} ({})", task.title, date.format("%B")),
            deadline: if i == 0 { task.deadline } else { Some(date) },
            ..task.clone()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn new_task(task_type: TaskType) -> NewTask {
        NewTask {
            title: "Hosting".into(),
            description: "Monthly hosting".into(),
            hours: 2,
            money_for_task: 40,
            progress: 0,
            task_type,
            deadline: Some(date(2025, 1, 31)),
            assignee_ids: vec![],
        }
    }

    #[test]
    fn occurrences_clamp_to_month_end() {
        let dates = monthly_occurrences(date(2025, 1, 31), 4);
        assert_eq!(
            dates,
            vec![
                date(2025, 1, 31),
                date(2025, 2, 28),
                date(2025, 3, 31),
                date(2025, 4, 30)
            ]
        );
    }

    #[test]
    fn recurring_task_expands_into_a_year() {
        let expanded = expand_recurring(new_task(TaskType::Recurring), date(2025, 1, 31));
        assert_eq!(expanded.len(), 12);
        assert_eq!(expanded[0].title, "Hosting (January)");
        assert_eq!(expanded[0].deadline, Some(date(2025, 1, 31)));
        assert_eq!(expanded[1].title, "Hosting (February)");
        assert_eq!(expanded[1].deadline, Some(date(2025, 2, 28)));
        assert_eq!(expanded[11].title, "Hosting (December)");
        assert!(expanded.iter().all(|t| t.hours == 2));
    }

    #[test]
    fn simple_task_is_not_expanded() {
        let expanded = expand_recurring(new_task(TaskType::Simple), date(2025, 1, 31));
        assert_eq!(expanded.len(), 1);
        assert_eq!(expanded[0].title, "Hosting");
    }

    #[test]
    fn status_buckets() {
        let today = date(2025, 5, 1);
        let mut task = Task::from_new(
            Uuid::new_v4(),
            new_task(TaskType::Simple),
            Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap(),
        );

        task.deadline = None;
        assert_eq!(DeadlineStatus::of(&task, today), DeadlineStatus::NoDeadline);
        task.deadline = Some(date(2025, 4, 30));
        assert_eq!(DeadlineStatus::of(&task, today), DeadlineStatus::Overdue);
        task.deadline = Some(today);
        assert_eq!(DeadlineStatus::of(&task, today), DeadlineStatus::DueToday);
        task.deadline = Some(date(2025, 5, 6));
        assert_eq!(DeadlineStatus::of(&task, today), DeadlineStatus::Red);
        task.deadline = Some(date(2025, 5, 11));
        assert_eq!(DeadlineStatus::of(&task, today), DeadlineStatus::Yellow);
        task.deadline = Some(date(2025, 5, 12));
        assert_eq!(DeadlineStatus::of(&task, today), DeadlineStatus::Green);
        task.progress = 100;
        assert_eq!(DeadlineStatus::of(&task, today), DeadlineStatus::Completed);
    }
}
