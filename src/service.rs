use std::collections::HashSet;
use std::sync::Arc;

use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::balance::{compute_balance_from_group, compute_balances_for_month, BalanceReport};
use crate::error::{Result, SplitError};
use crate::exchange::{direct_exchanges, settle, Exchange};
use crate::schemas::{Expense, Group, Member};
use crate::split::NewExpense;
use crate::store::GroupStore;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct GroupSettlement {
    pub report: BalanceReport,
    /// Whether `exchanges` came from the simplifier; when `false` it is empty.
    pub simplified: bool,
    pub exchanges: Vec<Exchange>,
}

/// Loads groups from the store and runs the ledger over them.
#[derive(Clone)]
pub struct LedgerService {
    store: Arc<dyn GroupStore>,
}

impl LedgerService {
    pub fn new(store: Arc<dyn GroupStore>) -> Self {
        Self { store }
    }

    async fn load(&self, group_id: &str) -> Result<Group> {
        if group_id.trim().is_empty() {
            return Err(SplitError::MissingGroup);
        }
        self.store
            .find_group(group_id)
            .await?
            .ok_or_else(|| SplitError::GroupNotFound(group_id.to_string()))
    }

    pub async fn balances(&self, group_id: &str) -> Result<BalanceReport> {
        let group = self.load(group_id).await?;
        Ok(compute_balance_from_group(&group))
    }

    pub async fn balances_for_month(
        &self,
        group_id: &str,
        year: i32,
        month: u32,
    ) -> Result<BalanceReport> {
        if !(1..=12).contains(&month) {
            return Err(SplitError::InvalidMonth(format!("{year}-{month:02}")));
        }
        let group = self.load(group_id).await?;
        Ok(compute_balances_for_month(&group, year, month))
    }

    pub async fn settlement(&self, group_id: &str) -> Result<GroupSettlement> {
        let group = self.load(group_id).await?;
        let report = compute_balance_from_group(&group);
        let exchanges = settle(&report, group.simplify_debts);
        debug!(
            group = %group.id,
            simplified = group.simplify_debts,
            exchanges = exchanges.len(),
            "computed settlement"
        );
        Ok(GroupSettlement {
            report,
            simplified: group.simplify_debts,
            exchanges,
        })
    }

    pub async fn direct_debts(&self, group_id: &str) -> Result<Vec<Exchange>> {
        let group = self.load(group_id).await?;
        Ok(direct_exchanges(&group))
    }

    pub async fn create_group(
        &self,
        group_id: &str,
        name: String,
        members: Vec<Member>,
        simplify_debts: bool,
    ) -> Result<Group> {
        if group_id.trim().is_empty() {
            return Err(SplitError::MissingGroup);
        }
        check_members(&members)?;
        let group = Group {
            id: group_id.to_string(),
            name,
            members,
            simplify_debts,
            expenses: vec![],
        };
        self.store.insert_group(group.clone()).await?;
        info!(group = %group.id, members = group.members.len(), "group added");
        Ok(group)
    }

    pub async fn add_expense(&self, group_id: &str, expense: NewExpense) -> Result<Expense> {
        let group = self.load(group_id).await?;
        let expense = expense.validate(&group, ObjectId::new().to_hex())?;
        if !self.store.push_expense(group_id, expense.clone()).await? {
            return Err(SplitError::GroupNotFound(group_id.to_string()));
        }
        info!(group = %group_id, expense = %expense.id, amount = expense.amount, "expense added");
        Ok(expense)
    }

    pub async fn set_simplify_debts(&self, group_id: &str, enabled: bool) -> Result<()> {
        if group_id.trim().is_empty() {
            return Err(SplitError::MissingGroup);
        }
        if !self.store.set_simplify_debts(group_id, enabled).await? {
            return Err(SplitError::GroupNotFound(group_id.to_string()));
        }
        info!(group = %group_id, enabled, "simplify debts toggled");
        Ok(())
    }
}

/// Nicks key every balance, so they must be present and unique.
fn check_members(members: &[Member]) -> Result<()> {
    let mut seen = HashSet::new();
    for member in members {
        if member.nick.trim().is_empty() {
            return Err(SplitError::InvalidGroup(format!(
                "member \"{}\" has no nick",
                member.name
            )));
        }
        if !seen.insert(member.nick.as_str()) {
            return Err(SplitError::InvalidGroup(format!(
                "{} appears twice in the members",
                member.nick
            )));
        }
    }
    Ok(())
}
