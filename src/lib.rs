//! Shared-expense ledger: who owes whom in a group, and the fewest practical
//! payments that square everyone up.
pub mod balance;
pub mod error;
pub mod exchange;
pub mod routes;
pub mod schemas;
pub mod service;
pub mod settings;
pub mod split;
pub mod store;

pub use balance::{compute_balance_from_group, compute_balances, Balance, BalanceReport};
pub use error::{Result, SplitError};
pub use exchange::{direct_exchanges, settle, simplify_balances, Exchange};
pub use schemas::{Cents, Expense, Group, Member, Split, UserNick};
pub use service::{GroupSettlement, LedgerService};
pub use settings::Settings;
pub use split::{NewExpense, SplitRequest, WeightedShare};
pub use store::{GroupStore, MemoryGroupStore, MongoGroupStore};
