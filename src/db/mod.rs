mod postgres;
mod schema;
mod sqlite;

pub use postgres::PostgresStore;
pub use sqlite::SqliteStore;

use crate::types::{Invoice, InvoiceUpdate, P2SHScript, Promise, Proof, ProofsUsed};

use std::{convert::TryFrom, fmt, io, path::PathBuf};

#[derive(Debug)]
pub enum StorageError {
    /// We could not create the directory the database lives in
    CreateDir(PathBuf, io::Error),
    /// Could not start the runtime driving the Postgres connection
    Runtime(io::Error),
    /// An error originating from the SQLite backend
    Sqlite(rusqlite::Error),
    /// An error originating from the Postgres backend
    Postgres(tokio_postgres::Error),
    /// A single-entity lookup didn't match any row
    NotFound { table: &'static str, key: String },
    /// Amounts are stored as signed 64 bits integers
    AmountOutOfRange(u64),
    /// We read something we could not have written
    Corrupted(String),
    /// A thread panicked while holding the connection
    Poisoned,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::CreateDir(path, e) => {
                write!(f, "Could not create database directory '{:?}': {}", path, e)
            }
            Self::Runtime(e) => write!(f, "Creating the database runtime: {}", e),
            Self::Sqlite(e) => write!(f, "{}", e),
            Self::Postgres(e) => write!(f, "{}", e),
            Self::NotFound { table, key } => write!(f, "No entry for '{}' in '{}'", key, table),
            Self::AmountOutOfRange(a) => write!(f, "Amount '{}' does not fit in the database", a),
            Self::Corrupted(msg) => write!(f, "Database corrupted: {}", msg),
            Self::Poisoned => write!(f, "Database connection lock poisoned"),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<rusqlite::Error> for StorageError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Sqlite(e)
    }
}

impl From<tokio_postgres::Error> for StorageError {
    fn from(e: tokio_postgres::Error) -> Self {
        Self::Postgres(e)
    }
}

impl StorageError {
    /// Whether this is the error of a lookup that matched nothing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Everything the mint reads from or writes to its database.
///
/// All methods block until the backing store answered. List-style reads return an empty `Vec`
/// when nothing matches; single-entity lookups return a [StorageError::NotFound].
pub trait MintStorage: Send + Sync {
    /// Store a proof, or update the reservation state of an already stored one. Only `reserved`
    /// and `send_id` are ever overwritten.
    fn store_proof(&self, proof: &Proof) -> Result<(), StorageError>;

    /// Record a redeemed proof. Fails if its secret was already recorded.
    fn store_used_proofs(&self, proof: &ProofsUsed) -> Result<(), StorageError>;

    /// Delete the proof with this secret, if any.
    fn delete_proof(&self, proof: &Proof) -> Result<(), StorageError>;

    /// All redeemed proofs whose secret is among `secrets`.
    fn proofs_used(&self, secrets: &[String]) -> Result<Vec<ProofsUsed>, StorageError>;

    /// All stored proofs.
    fn get_used_proofs(&self) -> Result<Vec<Proof>, StorageError>;

    /// All stored proofs currently reserved for a send.
    fn get_reserved_proofs(&self) -> Result<Vec<Proof>, StorageError>;

    fn store_script(&self, script: &P2SHScript) -> Result<(), StorageError>;

    /// The scripts for this address, or all of them if `address` is empty.
    fn get_scripts(&self, address: &str) -> Result<Vec<P2SHScript>, StorageError>;

    fn store_promise(&self, promise: &Promise) -> Result<(), StorageError>;

    fn store_lightning_invoice(&self, invoice: &Invoice) -> Result<(), StorageError>;

    fn get_lightning_invoice(&self, hash: &str) -> Result<Invoice, StorageError>;

    fn get_lightning_invoices(&self, paid: bool) -> Result<Vec<Invoice>, StorageError>;

    /// Fetch the invoice, apply `updates` in order, then save it. This is not atomic: concurrent
    /// updates of the same invoice are last-write-wins.
    fn update_lightning_invoice(
        &self,
        hash: &str,
        updates: &[InvoiceUpdate],
    ) -> Result<(), StorageError>;
}

/// Which database we use, and where it is.
#[derive(Debug, Clone)]
pub enum Backend {
    Sqlite { dir: PathBuf, file_name: String },
    Postgres(tokio_postgres::Config),
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: Backend,
    /// The invoices table is only created if the Lightning subsystem is enabled
    pub lightning: bool,
}

/// Open the configured database, creating it and its tables if needed.
///
/// This is meant to be called once at startup. An error here is a configuration error: the
/// caller should not retry.
pub fn open_storage(config: &StorageConfig) -> Result<Box<dyn MintStorage>, StorageError> {
    match &config.backend {
        Backend::Sqlite { dir, file_name } => {
            let store = SqliteStore::open(dir, file_name, config.lightning)?;
            Ok(Box::new(store))
        }
        Backend::Postgres(pg_config) => {
            let store = PostgresStore::connect(pg_config, config.lightning)?;
            Ok(Box::new(store))
        }
    }
}

fn amount_to_sql(amount: u64) -> Result<i64, StorageError> {
    i64::try_from(amount).map_err(|_| StorageError::AmountOutOfRange(amount))
}

fn amount_from_sql(amount: i64) -> Result<u64, StorageError> {
    u64::try_from(amount)
        .map_err(|_| StorageError::Corrupted(format!("negative amount '{}'", amount)))
}

fn apply_updates(mut invoice: Invoice, updates: &[InvoiceUpdate]) -> Invoice {
    for update in updates {
        update.apply(&mut invoice);
    }
    invoice
}

// The mint logic must never mark an invoice as issued before it is paid. We don't refuse to
// persist it, but it's worth a trace.
fn warn_issued_unpaid(invoice: &Invoice) {
    if invoice.issued && !invoice.paid {
        log::warn!(
            "Persisting invoice '{}' as issued while it is not paid",
            invoice.hash
        );
    }
}
