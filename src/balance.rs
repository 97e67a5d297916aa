use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::schemas::{clamp_cents, Cents, Expense, Group, Member, UserNick};

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Balance {
    pub member: Member,
    pub total_paid: Cents,
    pub total_share: Cents,
    /// Positive when the group owes the member.
    pub net_balance: Cents,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct BalanceReport {
    pub balances: Vec<Balance>,
    /// `false` means some split does not add up to its expense.
    pub invariant_valid: bool,
    pub sum_of_balances: Cents,
}

impl BalanceReport {
    pub fn balance_of(&self, nick: &str) -> Option<&Balance> {
        self.balances
            .iter()
            .find(|balance| balance.member.nick == nick)
    }
}

#[derive(Default)]
struct Totals {
    paid: i128,
    share: i128,
}

/// Folds expenses into one net balance per member.
///
/// Members are reported in join order, followed by anyone who appears only in
/// expenses (e.g. someone who left the group) in order of first appearance.
/// A split that does not partition its amount is not corrected: it shows up as
/// a nonzero `sum_of_balances` and `invariant_valid == false`. Sums are kept in
/// `i128`; any figure that does not fit in [`Cents`] is clamped and also marks
/// the report invalid.
pub fn compute_balances<'a, I>(members: &[Member], expenses: I) -> BalanceReport
where
    I: IntoIterator<Item = &'a Expense>,
{
    let mut order: Vec<Member> = members.to_vec();
    let mut totals: HashMap<UserNick, Totals> = members
        .iter()
        .map(|member| (member.nick.clone(), Totals::default()))
        .collect();

    for expense in expenses {
        totals_for(&mut order, &mut totals, &expense.payer).paid += i128::from(expense.amount);
        for (nick, share) in expense.split.iter() {
            totals_for(&mut order, &mut totals, nick).share += i128::from(share);
        }
    }

    let mut representable = true;
    let mut sum: i128 = 0;
    let balances: Vec<Balance> = order
        .into_iter()
        .map(|member| {
            let Totals { paid, share } = totals.remove(&member.nick).unwrap_or_default();
            let net = paid - share;
            sum += net;
            let (total_paid, paid_fits) = clamp_cents(paid);
            let (total_share, share_fits) = clamp_cents(share);
            let (net_balance, net_fits) = clamp_cents(net);
            representable &= paid_fits && share_fits && net_fits;
            Balance {
                member,
                total_paid,
                total_share,
                net_balance,
            }
        })
        .collect();

    let (sum_of_balances, sum_fits) = clamp_cents(sum);
    BalanceReport {
        balances,
        invariant_valid: representable && sum_fits && sum == 0,
        sum_of_balances,
    }
}

fn totals_for<'t>(
    order: &mut Vec<Member>,
    totals: &'t mut HashMap<UserNick, Totals>,
    nick: &UserNick,
) -> &'t mut Totals {
    if !totals.contains_key(nick) {
        order.push(Member::new(nick.clone(), nick.clone()));
    }
    totals.entry(nick.clone()).or_default()
}

pub fn compute_balance_from_group(group: &Group) -> BalanceReport {
    let report = compute_balances(&group.members, &group.expenses);
    log_report(group, group.expenses.len(), &report);
    report
}

/// Same as [`compute_balance_from_group`] but only over expenses created in
/// the given calendar month (UTC).
pub fn compute_balances_for_month(group: &Group, year: i32, month: u32) -> BalanceReport {
    let expenses: Vec<&Expense> = group
        .expenses
        .iter()
        .filter(|expense| expense.in_month(year, month))
        .collect();
    let report = compute_balances(&group.members, expenses.iter().copied());
    log_report(group, expenses.len(), &report);
    report
}

fn log_report(group: &Group, folded: usize, report: &BalanceReport) {
    debug!(
        group = %group.id,
        members = report.balances.len(),
        expenses = folded,
        "computed balances"
    );
    if !report.invariant_valid {
        warn!(
            group = %group.id,
            sum_of_balances = report.sum_of_balances,
            "ledger does not add up to zero"
        );
    }
}
