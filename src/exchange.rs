use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::balance::{Balance, BalanceReport};
use crate::schemas::{clamp_cents, Cents, Group, Member, UserNick};

/// A suggested payment: `payer` sends `amount` to `receiver`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Exchange {
    pub payer: Member,
    pub receiver: Member,
    pub amount: Cents,
}

/// One side of the matching, ordered so that a max-heap yields the largest
/// remaining amount first and, among equal amounts, the smallest nick.
#[derive(Debug, PartialEq, Eq)]
struct PersonalBalance {
    remaining: Cents,
    member: Member,
}

impl Ord for PersonalBalance {
    fn cmp(&self, other: &Self) -> Ordering {
        self.remaining
            .cmp(&other.remaining)
            .then_with(|| other.member.nick.cmp(&self.member.nick))
    }
}

impl PartialOrd for PersonalBalance {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Greedy settlement: repeatedly pairs the biggest debtor with the biggest
/// creditor until one side runs out.
///
/// Members with a zero balance never show up. The result has at most
/// `creditors + debtors - 1` exchanges. If the balances do not sum to zero the
/// leftover stays unmatched on the heavier side.
pub fn simplify_balances(balances: &[Balance]) -> Vec<Exchange> {
    let mut payers = BinaryHeap::new();
    let mut receivers = BinaryHeap::new();

    for balance in balances {
        let person = PersonalBalance {
            remaining: balance.net_balance.saturating_abs(),
            member: balance.member.clone(),
        };
        match balance.net_balance.cmp(&0) {
            Ordering::Less => payers.push(person),
            Ordering::Greater => receivers.push(person),
            Ordering::Equal => {}
        }
    }

    let mut exchanges = Vec::with_capacity((payers.len() + receivers.len()).saturating_sub(1));
    loop {
        let (mut payer, mut receiver) = match (payers.pop(), receivers.pop()) {
            (Some(payer), Some(receiver)) => (payer, receiver),
            (payer, receiver) => {
                payers.extend(payer);
                receivers.extend(receiver);
                break;
            }
        };
        let amount = payer.remaining.min(receiver.remaining);
        payer.remaining -= amount;
        receiver.remaining -= amount;

        exchanges.push(Exchange {
            payer: payer.member.clone(),
            receiver: receiver.member.clone(),
            amount,
        });

        if payer.remaining > 0 {
            payers.push(payer);
        }
        if receiver.remaining > 0 {
            receivers.push(receiver);
        }
    }

    debug!(
        exchanges = exchanges.len(),
        unmatched_payers = payers.len(),
        unmatched_receivers = receivers.len(),
        "simplified balances"
    );
    exchanges
}

/// The settlement suggestion for a group: empty unless the group simplifies
/// its debts.
pub fn settle(report: &BalanceReport, simplify_debts: bool) -> Vec<Exchange> {
    if !simplify_debts {
        return Vec::new();
    }
    simplify_balances(&report.balances)
}

// The exchanges that will be made if no simplification happens
pub fn direct_exchanges(group: &Group) -> Vec<Exchange> {
    // Keyed with the smaller nick first; positive means the second owes the first.
    let mut balances_between_people: BTreeMap<(UserNick, UserNick), i128> = BTreeMap::new();

    for expense in &group.expenses {
        for (receiver, share) in expense.split.iter() {
            if *receiver == expense.payer || share == 0 {
                continue;
            }
            let share = i128::from(share);
            let (pair, amount) = if expense.payer < *receiver {
                ((expense.payer.clone(), receiver.clone()), share)
            } else {
                ((receiver.clone(), expense.payer.clone()), -share)
            };
            *balances_between_people.entry(pair).or_insert(0) += amount;
        }
    }

    let members: HashMap<&str, &Member> = group
        .members
        .iter()
        .map(|member| (member.nick.as_str(), member))
        .collect();
    let lookup = |nick: &UserNick| {
        members
            .get(nick.as_str())
            .map(|member| (*member).clone())
            .unwrap_or_else(|| Member::new(nick.clone(), nick.clone()))
    };

    let mut exchanges: Vec<Exchange> = balances_between_people
        .into_iter()
        .filter(|(_, balance)| *balance != 0)
        .map(|((first, second), balance)| {
            let (payer, receiver) = if balance > 0 {
                (second, first)
            } else {
                (first, second)
            };
            Exchange {
                payer: lookup(&payer),
                receiver: lookup(&receiver),
                amount: clamp_cents(balance.abs()).0,
            }
        })
        .collect();
    exchanges.sort_by(|a, b| {
        (&a.payer.nick, &a.receiver.nick).cmp(&(&b.payer.nick, &b.receiver.nick))
    });
    exchanges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::compute_balances;
    use crate::schemas::{Expense, Split};
    use chrono::Utc;
    use rstest::rstest;

    fn balances(nets: &[(&str, Cents)]) -> Vec<Balance> {
        nets.iter()
            .map(|(nick, net)| Balance {
                member: Member::new(*nick, nick.to_uppercase()),
                total_paid: (*net).max(0),
                total_share: net.saturating_neg().max(0),
                net_balance: *net,
            })
            .collect()
    }

    fn flatten(exchanges: &[Exchange]) -> Vec<(&str, &str, Cents)> {
        exchanges
            .iter()
            .map(|exchange| {
                (
                    exchange.payer.nick.as_str(),
                    exchange.receiver.nick.as_str(),
                    exchange.amount,
                )
            })
            .collect()
    }

    #[rstest]
    #[case::one_creditor_two_debtors(
        &[("a", 2000), ("b", -1000), ("c", -1000)],
        vec![("b", "a", 1000), ("c", "a", 1000)]
    )]
    #[case::largest_creditor_first(
        &[("a", 500), ("b", 300), ("c", -800)],
        vec![("c", "a", 500), ("c", "b", 300)]
    )]
    #[case::single_pair(&[("a", -10), ("b", 10)], vec![("a", "b", 10)])]
    #[case::all_zero(&[("a", 0), ("b", 0)], vec![])]
    #[case::nobody(&[], vec![])]
    #[case::zero_member_skipped(
        &[("a", 700), ("z", 0), ("b", -300), ("c", -400)],
        vec![("c", "a", 400), ("b", "a", 300)]
    )]
    #[case::tie_broken_by_nick(
        &[("d", 100), ("c", 100), ("b", -100), ("a", -100)],
        vec![("a", "c", 100), ("b", "d", 100)]
    )]
    #[case::debtor_leftover_requeued(
        &[("a", 600), ("b", 400), ("c", -900), ("d", -100)],
        vec![("c", "a", 600), ("c", "b", 300), ("d", "b", 100)]
    )]
    fn simplify_cases(#[case] nets: &[(&str, Cents)], #[case] expected: Vec<(&str, &str, Cents)>) {
        let exchanges = simplify_balances(&balances(nets));

        assert_eq!(flatten(&exchanges), expected);
    }

    #[rstest]
    fn residue_stays_unmatched() {
        let exchanges = simplify_balances(&balances(&[("a", 501), ("b", -500)]));

        assert_eq!(flatten(&exchanges), vec![("b", "a", 500)]);
    }

    #[rstest]
    fn extreme_balances_do_not_overflow() {
        let exchanges = simplify_balances(&balances(&[("a", Cents::MAX), ("b", Cents::MIN)]));

        assert_eq!(flatten(&exchanges), vec![("b", "a", Cents::MAX)]);
    }

    #[rstest]
    fn exchanges_carry_display_names() {
        let exchanges = simplify_balances(&balances(&[("a", 5), ("b", -5)]));

        assert_eq!(exchanges[0].payer.name, "B");
        assert_eq!(exchanges[0].receiver.name, "A");
    }

    #[rstest]
    #[case::enabled(true, 1)]
    #[case::disabled(false, 0)]
    fn settle_respects_flag(#[case] simplify_debts: bool, #[case] expected: usize) {
        let report = BalanceReport {
            balances: balances(&[("a", 5), ("b", -5)]),
            invariant_valid: true,
            sum_of_balances: 0,
        };

        assert_eq!(settle(&report, simplify_debts).len(), expected);
    }

    fn expense(amount: Cents, payer: &str, split: &[(&str, Cents)]) -> Expense {
        Expense {
            id: format!("{payer}-{amount}"),
            name: "expense".to_string(),
            amount,
            payer: payer.to_string(),
            split: split.iter().map(|(nick, share)| (*nick, *share)).collect::<Split>(),
            created_at: Utc::now(),
        }
    }

    #[rstest]
    fn direct_exchanges_net_each_pair() {
        let group = Group {
            id: "g".to_string(),
            name: "G".to_string(),
            members: vec![
                Member::new("a", "Ana"),
                Member::new("b", "Bob"),
                Member::new("c", "Cai"),
            ],
            simplify_debts: false,
            expenses: vec![
                expense(3000, "a", &[("a", 1000), ("b", 1000), ("c", 1000)]),
                expense(900, "b", &[("a", 300), ("b", 300), ("c", 300)]),
                expense(600, "c", &[("b", 600)]),
            ],
        };

        let exchanges = direct_exchanges(&group);

        assert_eq!(
            flatten(&exchanges),
            vec![("b", "a", 700), ("b", "c", 300), ("c", "a", 1000)]
        );
        assert_eq!(exchanges[0].payer.name, "Bob");
    }

    #[rstest]
    fn direct_exchanges_agree_with_balances() {
        let members = vec![Member::new("a", "A"), Member::new("b", "B")];
        let expenses = vec![
            expense(1000, "a", &[("a", 500), ("b", 500)]),
            expense(1000, "b", &[("a", 500), ("b", 500)]),
        ];
        let report = compute_balances(&members, &expenses);
        let group = Group {
            id: "g".to_string(),
            name: "G".to_string(),
            members,
            simplify_debts: true,
            expenses,
        };

        assert!(direct_exchanges(&group).is_empty());
        assert!(settle(&report, group.simplify_debts).is_empty());
    }
}
