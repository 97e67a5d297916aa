//! Where groups live.
//!
//! The ledger only reads from the store; the writes here back the HTTP glue.
use std::collections::HashMap;

use async_trait::async_trait;
use mongodb::{
    bson::doc,
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::IndexOptions,
    Client, Collection, IndexModel,
};
use tokio::sync::RwLock;

use crate::error::{Result, SplitError};
use crate::schemas::{Expense, Group};

#[async_trait]
pub trait GroupStore: Send + Sync {
    async fn find_group(&self, id: &str) -> Result<Option<Group>>;

    async fn insert_group(&self, group: Group) -> Result<()>;

    /// Returns `false` when the group does not exist.
    async fn push_expense(&self, id: &str, expense: Expense) -> Result<bool>;

    /// Returns `false` when the group does not exist.
    async fn set_simplify_debts(&self, id: &str, enabled: bool) -> Result<bool>;
}

pub struct MongoGroupStore {
    groups: Collection<Group>,
}

impl MongoGroupStore {
    pub async fn connect(uri: &str, database: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri).await?;
        let store = Self::new(&client, database);
        store.ensure_indexes().await?;
        Ok(store)
    }

    /// Group ids are unique; the index is what makes concurrent creates safe.
    pub async fn ensure_indexes(&self) -> Result<()> {
        let index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.groups.create_index(index, None).await?;
        Ok(())
    }

    pub fn new(client: &Client, database: &str) -> Self {
        Self {
            groups: client.database(database).collection::<Group>("Groups"),
        }
    }
}

#[async_trait]
impl GroupStore for MongoGroupStore {
    async fn find_group(&self, id: &str) -> Result<Option<Group>> {
        Ok(self.groups.find_one(doc! { "id": id }, None).await?)
    }

    async fn insert_group(&self, group: Group) -> Result<()> {
        match self.groups.insert_one(&group, None).await {
            Ok(_) => Ok(()),
            Err(err) if is_duplicate_key(&err) => Err(SplitError::GroupExists(group.id)),
            Err(err) => Err(err.into()),
        }
    }

    async fn push_expense(&self, id: &str, expense: Expense) -> Result<bool> {
        let expense = bson::to_bson(&expense)?;
        let result = self
            .groups
            .update_one(
                doc! { "id": id },
                doc! { "$push": { "expenses": expense } },
                None,
            )
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn set_simplify_debts(&self, id: &str, enabled: bool) -> Result<bool> {
        let result = self
            .groups
            .update_one(
                doc! { "id": id },
                doc! { "$set": { "simplify_debts": enabled } },
                None,
            )
            .await?;
        Ok(result.matched_count > 0)
    }
}

const DUPLICATE_KEY: i32 = 11000;

fn is_duplicate_key(err: &MongoError) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY
    )
}

#[derive(Default)]
pub struct MemoryGroupStore {
    groups: RwLock<HashMap<String, Group>>,
}

impl MemoryGroupStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GroupStore for MemoryGroupStore {
    async fn find_group(&self, id: &str) -> Result<Option<Group>> {
        Ok(self.groups.read().await.get(id).cloned())
    }

    async fn insert_group(&self, group: Group) -> Result<()> {
        let mut groups = self.groups.write().await;
        if groups.contains_key(&group.id) {
            return Err(SplitError::GroupExists(group.id));
        }
        groups.insert(group.id.clone(), group);
        Ok(())
    }

    async fn push_expense(&self, id: &str, expense: Expense) -> Result<bool> {
        Ok(match self.groups.write().await.get_mut(id) {
            Some(group) => {
                group.expenses.push(expense);
                true
            }
            None => false,
        })
    }

    async fn set_simplify_debts(&self, id: &str, enabled: bool) -> Result<bool> {
        Ok(match self.groups.write().await.get_mut(id) {
            Some(group) => {
                group.simplify_debts = enabled;
                true
            }
            None => false,
        })
    }
}
