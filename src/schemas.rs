use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

pub type UserNick = String;

/// Money in integer minor units (cents).
pub type Cents = i64;

/// Narrows a wide sum back to [`Cents`]. Values out of range are clamped to
/// `±Cents::MAX` and flagged with `false`.
pub(crate) fn clamp_cents(value: i128) -> (Cents, bool) {
    match Cents::try_from(value) {
        Ok(cents) if cents != Cents::MIN => (cents, true),
        _ if value < 0 => (-Cents::MAX, false),
        _ => (Cents::MAX, false),
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Member {
    pub nick: UserNick,
    pub name: String,
}

impl Member {
    pub fn new(nick: impl Into<UserNick>, name: impl Into<String>) -> Self {
        Self {
            nick: nick.into(),
            name: name.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    /// Current members, in join order.
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub simplify_debts: bool,
    #[serde(default)]
    pub expenses: Vec<Expense>,
}

impl Group {
    pub fn member(&self, nick: &str) -> Option<&Member> {
        self.members.iter().find(|member| member.nick == nick)
    }

    pub fn is_member(&self, nick: &str) -> bool {
        self.member(nick).is_some()
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Expense {
    pub id: String,
    pub name: String,
    pub amount: Cents,
    pub payer: UserNick,
    pub split: Split,
    pub created_at: DateTime<Utc>,
}

impl Expense {
    pub fn in_month(&self, year: i32, month: u32) -> bool {
        self.created_at.year() == year && self.created_at.month() == month
    }
}

/// Who owes what part of an expense.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Split(BTreeMap<UserNick, Cents>);

impl Split {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `share` to the member's part, saturating instead of wrapping.
    pub fn insert(&mut self, nick: impl Into<UserNick>, share: Cents) {
        let entry = self.0.entry(nick.into()).or_insert(0);
        *entry = entry.saturating_add(share);
    }

    pub fn share_of(&self, nick: &str) -> Cents {
        self.0.get(nick).copied().unwrap_or(0)
    }

    /// Sum of all shares, `None` if it does not fit in [`Cents`].
    pub fn total(&self) -> Option<Cents> {
        self.0
            .values()
            .try_fold(0 as Cents, |total, share| total.checked_add(*share))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&UserNick, Cents)> {
        self.0.iter().map(|(nick, share)| (nick, *share))
    }
}

impl<N: Into<UserNick>> FromIterator<(N, Cents)> for Split {
    fn from_iter<I: IntoIterator<Item = (N, Cents)>>(iter: I) -> Self {
        let mut split = Split::new();
        for (nick, share) in iter {
            split.insert(nick, share);
        }
        split
    }
}
