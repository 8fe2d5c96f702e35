//! Quota reservation and refund

pub mod ledger;
pub mod ports;

pub use ledger::{LedgerError, QuotaLedger, Reservation};
pub use ports::{QuotaStore, QuotaStoreError};
