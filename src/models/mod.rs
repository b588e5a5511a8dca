pub mod quote;
pub mod transaction;

pub use quote::PricedQuote;
pub use transaction::{FailureKind, ReconciliationState, Transaction, TransactionStatus};
