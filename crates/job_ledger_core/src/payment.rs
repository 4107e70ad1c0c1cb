//! crates/job_ledger_core/src/payment.rs
//!
//! Developer earnings and admin-initiated balance deductions.
//!
//! The per-task payment check itself lives on [`Task`]; this module covers the
//! balance that paid tasks add up to and how a deduction is spread over them.

use uuid::Uuid;

use crate::domain::{money_total, Task, MAX_MONEY};
use crate::ports::{PortError, PortResult};

/// Sum of `money_for_task` over the paid tasks assigned to the developer.
pub fn developer_balance(tasks: &[Task], developer_id: Uuid) -> i64 {
    money_total(
        tasks
            .iter()
            .filter(|t| t.paid && t.is_assigned_to(developer_id))
            .map(|t| t.money_for_task),
    )
}

/// One task's money after a deduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Adjustment {
    pub task_id: Uuid,
    pub money_for_task: i64,
}

/// Spreads `amount` over the developer's paid tasks, in the given order.
///
/// Each task is drained to zero before the next one is touched. Fails when the
/// amount is not positive, exceeds [`MAX_MONEY`] or exceeds the developer's
/// balance.
pub fn plan_deduction(
    tasks: &[Task],
    developer_id: Uuid,
    amount: i64,
) -> PortResult<Vec<Adjustment>> {
    if amount <= 0 {
        return Err(PortError::Invalid(
            "Deduction amount must be greater than 0".to_string(),
        ));
    }
    if amount > MAX_MONEY {
        return Err(PortError::Invalid(format!(
            "Deduction amount must not exceed {}",
            MAX_MONEY
        )));
    }
    let balance = developer_balance(tasks, developer_id);
    if amount > balance {
        return Err(PortError::Invalid(format!(
            "Deduction amount {} exceeds current balance {}",
            amount, balance
        )));
    }

    let mut remaining = amount;
    let mut plan = Vec::new();
    for task in tasks
        .iter()
        .filter(|t| t.paid && t.is_assigned_to(developer_id))
    {
        if remaining == 0 {
            break;
        }
        if task.money_for_task == 0 {
            continue;
        }
        let taken = remaining.min(task.money_for_task);
        remaining -= taken;
        plan.push(Adjustment {
            task_id: task.id,
            money_for_task: task.money_for_task - taken,
        });
    }
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewTask, TaskType};
    use chrono::Utc;

    fn paid_task(dev: Uuid, money: i64, paid: bool) -> Task {
        let mut t = Task::from_new(
            Uuid::new_v4(),
            NewTask {
                title: "t".into(),
                description: String::new(),
                hours: 1,
                money_for_task: money,
                progress: 100,
                task_type: TaskType::Simple,
                deadline: None,
                assignee_ids: vec![dev],
            },
            Utc::now(),
        );
        t.paid = paid;
        t
    }

    #[test]
    fn balance_counts_only_paid_tasks_of_the_developer() {
        let dev = Uuid::new_v4();
        let other = Uuid::new_v4();
        let tasks = vec![
            paid_task(dev, 100, true),
            paid_task(dev, 50, false),
            paid_task(other, 70, true),
        ];
        assert_eq!(developer_balance(&tasks, dev), 100);
    }

    #[test]
    fn deduction_drains_tasks_in_order() {
        let dev = Uuid::new_v4();
        let tasks = vec![paid_task(dev, 100, true), paid_task(dev, 80, true)];
        let plan = plan_deduction(&tasks, dev, 130).unwrap();
        assert_eq!(
            plan,
            vec![
                Adjustment {
                    task_id: tasks[0].id,
                    money_for_task: 0
                },
                Adjustment {
                    task_id: tasks[1].id,
                    money_for_task: 50
                },
            ]
        );
    }

    #[test]
    fn deduction_above_balance_is_rejected() {
        let dev = Uuid::new_v4();
        let tasks = vec![paid_task(dev, 100, true)];
        assert!(matches!(
            plan_deduction(&tasks, dev, 101),
            Err(PortError::Invalid(_))
        ));
        assert!(plan_deduction(&tasks, dev, 0).is_err());
    }

    #[test]
    fn deduction_above_money_ceiling_is_rejected() {
        let dev = Uuid::new_v4();
        let tasks = vec![paid_task(dev, i64::MAX, true), paid_task(dev, i64::MAX, true)];
        assert_eq!(developer_balance(&tasks, dev), i64::MAX);
        assert!(matches!(
            plan_deduction(&tasks, dev, MAX_MONEY + 1),
            Err(PortError::Invalid(_))
        ));
    }
}
