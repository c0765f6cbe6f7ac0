/// Wallet and ledger entry types. Balance changes are expressed as events,
/// produced by validating an amount against the wallet and then applied.
pub mod wallet;

/// Validated transfer commands, later executed by [`engine`].
pub mod command;

/// Storage port, plus "in memory" and PostgreSQL implementations.
///
/// Every balance write goes through a unit of work that either commits
/// completely or leaves nothing behind.
pub mod store;

/// Wallet creation and transfers. The only place balances are mutated.
pub mod engine;

/// Read-only wallet status and history lookups.
pub mod query;

/// HTTP routes over the engine and query service, with status-code mapping.
pub mod http;

/// Server bootstrap shared by the binary and the integration tests.
pub mod bin_utils;
