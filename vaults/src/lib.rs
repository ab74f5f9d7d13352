//! # CAIRN Vaults -- Custody State Machines
//!
//! Three successive vault generations assembled from the engine
//! primitives, one per era of the protocol:
//!
//! ```text
//! native.rs -- Generation 1: native currency only, native-unit ledger
//! oracle.rs -- Generation 2: two-level balances, oracle-priced capacity
//! swap.rs   -- Generation 3: everything swapped into the canonical asset
//! ```
//!
//! All three share the same discipline:
//!
//! 1. **Checks, effects, interactions.** Every internal mutation is
//!    applied and durable before any collaborator is invoked, so a
//!    collaborator that re-enters observes settled state and cannot
//!    double-spend. The [`guard`] module's entry permit makes the
//!    mutation section explicit and self-releasing.
//! 2. **All-or-nothing calls.** A failed release is compensated; a
//!    failed check changes nothing; there is no partial success.
//! 3. **Typed failures.** Every error is a [`VaultError`] variant with
//!    inspectable diagnostic fields, never a message to parse.

pub mod error;
pub mod guard;
pub mod native;
pub mod oracle;
pub mod receipt;
pub mod swap;

pub use error::VaultError;
pub use native::NativeVault;
pub use oracle::OracleVault;
pub use receipt::{DepositReceipt, WithdrawalReceipt};
pub use swap::SwapVault;
