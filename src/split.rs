//! Typed expense input and split construction.
//!
//! Request bodies are deserialized into [`NewExpense`] and checked against the
//! group before anything is stored, so the aggregator only ever sees integer
//! amounts and splits that partition them.
use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SplitError};
use crate::schemas::{Cents, Expense, Group, Split, UserNick};

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct WeightedShare {
    pub member: UserNick,
    pub weight: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SplitRequest {
    /// Everyone listed pays the same, remainder cents go to the first members.
    Equal { members: Vec<UserNick> },
    /// Explicit share per member.
    Exact { shares: BTreeMap<UserNick, Cents> },
    /// Shares proportional to the weights.
    Weighted { weights: Vec<WeightedShare> },
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct NewExpense {
    pub name: String,
    pub amount: Cents,
    pub payer: UserNick,
    pub split: SplitRequest,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Split {
    /// Divides `amount` evenly. The `amount % n` leftover cents are handed out
    /// one each to the first members in the given order.
    pub fn equal(amount: Cents, members: &[UserNick]) -> Split {
        if members.is_empty() {
            return Split::new();
        }
        let count = members.len() as Cents;
        let base = amount.div_euclid(count);
        let remainder = amount.rem_euclid(count) as usize;
        members
            .iter()
            .enumerate()
            .map(|(idx, nick)| (nick.clone(), base + Cents::from(idx < remainder)))
            .collect()
    }

    /// Divides `amount` proportionally to the weights, rounding down, then hands
    /// the leftover cents one each to the first members with a nonzero weight.
    pub fn weighted(amount: Cents, weights: &[WeightedShare]) -> Split {
        let total_weight: i128 = weights.iter().map(|share| i128::from(share.weight)).sum();
        if total_weight == 0 {
            return Split::new();
        }
        let mut shares: Vec<(UserNick, Cents)> = weights
            .iter()
            .map(|share| {
                let portion = i128::from(amount) * i128::from(share.weight) / total_weight;
                (share.member.clone(), portion as Cents)
            })
            .collect();

        let assigned: Cents = shares.iter().map(|(_, share)| share).sum();
        let mut remainder = amount - assigned;
        for ((_, share), weighted) in shares.iter_mut().zip(weights) {
            if remainder == 0 {
                break;
            }
            if weighted.weight > 0 {
                *share += 1;
                remainder -= 1;
            }
        }
        shares.into_iter().collect()
    }
}

impl SplitRequest {
    fn members(&self) -> Vec<&str> {
        match self {
            SplitRequest::Equal { members } => members.iter().map(String::as_str).collect(),
            SplitRequest::Exact { shares } => shares.keys().map(String::as_str).collect(),
            SplitRequest::Weighted { weights } => {
                weights.iter().map(|share| share.member.as_str()).collect()
            }
        }
    }

    /// Resolves the request into concrete shares of `amount`.
    pub fn resolve(&self, amount: Cents) -> Result<Split> {
        let split = match self {
            SplitRequest::Equal { members } => Split::equal(amount, members),
            SplitRequest::Exact { shares } => {
                if let Some((nick, _)) = shares.iter().find(|(_, share)| **share < 0) {
                    return Err(invalid(format!("negative share for {nick}")));
                }
                shares.iter().map(|(nick, share)| (nick.clone(), *share)).collect()
            }
            SplitRequest::Weighted { weights } => {
                if weights.iter().all(|share| share.weight == 0) {
                    return Err(invalid("all weights are zero"));
                }
                Split::weighted(amount, weights)
            }
        };

        match split.total() {
            Some(total) if total == amount => Ok(split),
            Some(total) => Err(invalid(format!(
                "shares add up to {total} but the amount is {amount}"
            ))),
            None => Err(invalid("shares add up to more than can be stored")),
        }
    }
}

impl NewExpense {
    /// Checks the expense against `group` and builds the record to persist.
    pub fn validate(self, group: &Group, id: String) -> Result<Expense> {
        if self.name.trim().is_empty() {
            return Err(invalid("name is empty"));
        }
        if self.amount < 0 {
            return Err(invalid(format!("negative amount {}", self.amount)));
        }
        if !group.is_member(&self.payer) {
            return Err(invalid(format!("payer {} is not in the group", self.payer)));
        }

        let members = self.split.members();
        if members.is_empty() {
            return Err(invalid("nobody to split with"));
        }
        let mut seen = HashSet::new();
        for nick in members {
            if !seen.insert(nick) {
                return Err(invalid(format!("{nick} appears twice in the split")));
            }
            if !group.is_member(nick) {
                return Err(invalid(format!("{nick} is not in the group")));
            }
        }

        let split = self.split.resolve(self.amount)?;
        Ok(Expense {
            id,
            name: self.name,
            amount: self.amount,
            payer: self.payer,
            split,
            created_at: self.created_at.unwrap_or_else(Utc::now),
        })
    }
}

fn invalid(reason: impl Into<String>) -> SplitError {
    SplitError::InvalidExpense(reason.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::Member;
    use rstest::{fixture, rstest};

    fn nicks(names: &[&str]) -> Vec<UserNick> {
        names.iter().map(|name| name.to_string()).collect()
    }

    fn equal(members: &[&str]) -> SplitRequest {
        SplitRequest::Equal {
            members: nicks(members),
        }
    }

    fn exact(shares: &[(&str, Cents)]) -> SplitRequest {
        SplitRequest::Exact {
            shares: shares
                .iter()
                .map(|(nick, share)| (nick.to_string(), *share))
                .collect(),
        }
    }

    #[fixture]
    fn group() -> Group {
        Group {
            id: "flat".to_string(),
            name: "Flat".to_string(),
            members: vec![
                Member::new("ana", "Ana"),
                Member::new("bob", "Bob"),
                Member::new("cai", "Cai"),
            ],
            simplify_debts: true,
            expenses: vec![],
        }
    }

    #[rstest]
    #[case::exact_division(3000, &["ana", "bob", "cai"], &[1000, 1000, 1000])]
    #[case::two_cents_left(1001, &["ana", "bob", "cai"], &[334, 334, 333])]
    #[case::member_order_decides_remainder(1000, &["cai", "ana", "bob"], &[334, 333, 333])]
    #[case::less_than_members(2, &["ana", "bob", "cai"], &[1, 1, 0])]
    #[case::zero(0, &["ana", "bob"], &[0, 0])]
    fn equal_split_hands_remainder_to_first_members(
        #[case] amount: Cents,
        #[case] members: &[&str],
        #[case] expected: &[Cents],
    ) {
        let split = Split::equal(amount, &nicks(members));

        assert_eq!(split.total(), Some(amount));
        for (nick, share) in members.iter().zip(expected) {
            assert_eq!(split.share_of(nick), *share, "share of {nick}");
        }
    }

    #[rstest]
    fn weighted_split_is_exact() {
        let weights = vec![
            WeightedShare {
                member: "ana".into(),
                weight: 1,
            },
            WeightedShare {
                member: "bob".into(),
                weight: 0,
            },
            WeightedShare {
                member: "cai".into(),
                weight: 2,
            },
        ];
        let split = Split::weighted(1000, &weights);

        assert_eq!(split.share_of("ana"), 334);
        assert_eq!(split.share_of("bob"), 0);
        assert_eq!(split.share_of("cai"), 666);
        assert_eq!(split.total(), Some(1000));
    }

    #[rstest]
    fn insert_saturates_instead_of_wrapping() {
        let mut split = Split::new();
        split.insert("ana", Cents::MAX);
        split.insert("ana", Cents::MAX);
        split.insert("bob", 1);

        assert_eq!(split.share_of("ana"), Cents::MAX);
        assert_eq!(split.total(), None);
    }

    #[rstest]
    fn valid_expense_becomes_record(group: Group) {
        let expense = NewExpense {
            name: "Groceries".to_string(),
            amount: 1001,
            payer: "ana".to_string(),
            split: SplitRequest::Equal {
                members: nicks(&["ana", "bob", "cai"]),
            },
            created_at: None,
        }
        .validate(&group, "e1".to_string())
        .unwrap();

        assert_eq!(expense.id, "e1");
        assert_eq!(expense.split.total(), Some(1001));
        assert_eq!(expense.split.share_of("ana"), 334);
    }

    #[rstest]
    #[case::negative_amount(-5, "ana", equal(&["ana"]))]
    #[case::unknown_payer(100, "zed", equal(&["ana"]))]
    #[case::unknown_member(100, "ana", equal(&["ana", "zed"]))]
    #[case::duplicate_member(100, "ana", equal(&["bob", "bob"]))]
    #[case::nobody(100, "ana", equal(&[]))]
    #[case::short_exact(100, "ana", exact(&[("ana", 50), ("bob", 49)]))]
    #[case::negative_exact(100, "ana", exact(&[("ana", 150), ("bob", -50)]))]
    #[case::overflowing_exact(
        10,
        "ana",
        exact(&[("ana", Cents::MAX), ("bob", Cents::MAX), ("cai", 12)])
    )]
    #[case::overflowing_pair(10, "ana", exact(&[("ana", Cents::MAX), ("bob", Cents::MAX)]))]
    #[case::zero_weights(
        100,
        "ana",
        SplitRequest::Weighted {
            weights: vec![WeightedShare {
                member: "bob".into(),
                weight: 0,
            }],
        }
    )]
    fn invalid_expenses_are_rejected(
        group: Group,
        #[case] amount: Cents,
        #[case] payer: &str,
        #[case] split: SplitRequest,
    ) {
        let result = NewExpense {
            name: "Dinner".to_string(),
            amount,
            payer: payer.to_string(),
            split,
            created_at: None,
        }
        .validate(&group, "e1".to_string());

        assert!(matches!(result, Err(SplitError::InvalidExpense(_))), "{result:?}");
    }

    #[rstest]
    fn split_request_reads_tagged_json() {
        let request: SplitRequest =
            serde_json::from_str(r#"{"kind":"equal","members":["ana","bob"]}"#).unwrap();

        assert_eq!(request, equal(&["ana", "bob"]));
    }
}
