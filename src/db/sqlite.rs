use super::{
    amount_from_sql, amount_to_sql, apply_updates,
    schema::{SQLITE_INVOICE_SCHEMA, SQLITE_SCHEMA},
    warn_issued_unpaid, MintStorage, StorageError,
};
use crate::types::{Invoice, InvoiceUpdate, P2SHScript, Promise, Proof, ProofsUsed};

use std::{
    collections::BTreeSet,
    fs,
    path::Path,
    sync::{Mutex, MutexGuard},
};

use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, TransactionBehavior};

// Stay well below SQLITE_MAX_VARIABLE_NUMBER, whatever version we are linked against.
const MAX_SQL_VARIABLES: usize = 500;

/// A mint database stored in a single SQLite file.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (and create when missing) the database at `dir/file_name`.
    pub fn open(dir: &Path, file_name: &str, lightning: bool) -> Result<SqliteStore, StorageError> {
        if !dir.exists() {
            log::info!("Creating database directory at '{:?}'", dir);
            fs::create_dir_all(dir).map_err(|e| StorageError::CreateDir(dir.to_path_buf(), e))?;
        }

        let db_path = dir.join(file_name);
        let conn = Connection::open(&db_path)?;
        log::debug!("Opened SQLite database at '{:?}'", db_path);

        Self::from_connection(conn, lightning)
    }

    /// A throwaway database, gone when dropped.
    pub fn in_memory(lightning: bool) -> Result<SqliteStore, StorageError> {
        Self::from_connection(Connection::open_in_memory()?, lightning)
    }

    fn from_connection(mut conn: Connection, lightning: bool) -> Result<SqliteStore, StorageError> {
        ensure_schema(&mut conn, lightning)?;
        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }
}

fn ensure_schema(conn: &mut Connection, lightning: bool) -> Result<(), StorageError> {
    let tx = conn.transaction()?;
    tx.execute_batch(SQLITE_SCHEMA)?;
    if lightning {
        tx.execute_batch(SQLITE_INVOICE_SCHEMA)?;
    } else {
        log::debug!("Lightning is disabled, not creating the invoices table");
    }
    tx.commit()?;

    Ok(())
}

// Amounts are checked once the row is read, the row closures only read raw columns.
fn raw_proof(row: &Row) -> rusqlite::Result<(Proof, i64)> {
    Ok((
        Proof {
            id: row.get("id")?,
            amount: 0,
            secret: row.get("secret")?,
            c: row.get("c")?,
            reserved: row.get("reserved")?,
            send_id: row.get("send_id")?,
        },
        row.get("amount")?,
    ))
}

fn proof_from_raw((proof, amount): (Proof, i64)) -> Result<Proof, StorageError> {
    Ok(Proof {
        amount: amount_from_sql(amount)?,
        ..proof
    })
}

fn raw_used_proof(row: &Row) -> rusqlite::Result<(ProofsUsed, i64)> {
    Ok((
        ProofsUsed {
            id: row.get("id")?,
            amount: 0,
            secret: row.get("secret")?,
            c: row.get("c")?,
        },
        row.get("amount")?,
    ))
}

fn raw_invoice(row: &Row) -> rusqlite::Result<(Invoice, i64)> {
    Ok((
        Invoice {
            amount: 0,
            pr: row.get("pr")?,
            hash: row.get("hash")?,
            paid: row.get("paid")?,
            issued: row.get("issued")?,
            time_created: row.get("time_created")?,
            time_paid: row.get("time_paid")?,
        },
        row.get("amount")?,
    ))
}

fn invoice_from_raw((invoice, amount): (Invoice, i64)) -> Result<Invoice, StorageError> {
    Ok(Invoice {
        amount: amount_from_sql(amount)?,
        ..invoice
    })
}

fn script_from_row(row: &Row) -> rusqlite::Result<P2SHScript> {
    Ok(P2SHScript {
        script: row.get("script")?,
        signature: row.get("signature")?,
        address: row.get("address")?,
    })
}

fn select_proofs(conn: &Connection, reserved_only: bool) -> Result<Vec<Proof>, StorageError> {
    let query = if reserved_only {
        "SELECT id, amount, secret, c, reserved, send_id FROM proofs WHERE reserved = 1"
    } else {
        "SELECT id, amount, secret, c, reserved, send_id FROM proofs"
    };
    let mut stmt = conn.prepare(query)?;
    let rows = stmt
        .query_map([], raw_proof)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    rows.into_iter().map(proof_from_raw).collect()
}

impl MintStorage for SqliteStore {
    fn store_proof(&self, proof: &Proof) -> Result<(), StorageError> {
        log::info!(
            "Storing proof of amount {} (reserved: {}, send id: '{}')",
            proof.amount,
            proof.reserved,
            proof.send_id
        );
        let amount = amount_to_sql(proof.amount)?;
        let mut conn = self.conn()?;

        // Take the write lock right away so no other writer slips in between the read and the
        // write.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let exists = tx
            .query_row(
                "SELECT 1 FROM proofs WHERE secret = ?1",
                params![proof.secret],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if exists {
            // Never touch the amount of an existing proof
            tx.execute(
                "UPDATE proofs SET reserved = ?1, send_id = ?2 WHERE secret = ?3",
                params![proof.reserved, proof.send_id, proof.secret],
            )?;
        } else {
            tx.execute(
                "INSERT INTO proofs (secret, id, amount, c, reserved, send_id) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    proof.secret,
                    proof.id,
                    amount,
                    proof.c,
                    proof.reserved,
                    proof.send_id
                ],
            )?;
        }
        tx.commit()?;

        Ok(())
    }

    fn store_used_proofs(&self, proof: &ProofsUsed) -> Result<(), StorageError> {
        log::info!("Invalidating proof of amount {}", proof.amount);
        let amount = amount_to_sql(proof.amount)?;
        self.conn()?.execute(
            "INSERT INTO proofs_used (secret, id, amount, c) VALUES (?1, ?2, ?3, ?4)",
            params![proof.secret, proof.id, amount, proof.c],
        )?;

        Ok(())
    }

    fn delete_proof(&self, proof: &Proof) -> Result<(), StorageError> {
        let deleted = self
            .conn()?
            .execute("DELETE FROM proofs WHERE secret = ?1", params![proof.secret])?;
        log::debug!("Deleted {} proof(s)", deleted);

        Ok(())
    }

    fn proofs_used(&self, secrets: &[String]) -> Result<Vec<ProofsUsed>, StorageError> {
        // A secret repeated across two chunks would otherwise be returned twice
        let unique: Vec<&String> = secrets.iter().collect::<BTreeSet<_>>().into_iter().collect();
        let conn = self.conn()?;
        let mut used = Vec::new();

        for chunk in unique.chunks(MAX_SQL_VARIABLES) {
            let query = format!(
                "SELECT id, amount, secret, c FROM proofs_used WHERE secret IN ({})",
                vec!["?"; chunk.len()].join(", ")
            );
            let mut stmt = conn.prepare(&query)?;
            let rows = stmt
                .query_map(params_from_iter(chunk.iter()), raw_used_proof)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            for (proof, amount) in rows {
                used.push(ProofsUsed {
                    amount: amount_from_sql(amount)?,
                    ..proof
                });
            }
        }
        log::trace!(
            "{} out of {} secret(s) were already spent",
            used.len(),
            secrets.len()
        );

        Ok(used)
    }

    fn get_used_proofs(&self) -> Result<Vec<Proof>, StorageError> {
        select_proofs(&*self.conn()?, false)
    }

    fn get_reserved_proofs(&self) -> Result<Vec<Proof>, StorageError> {
        select_proofs(&*self.conn()?, true)
    }

    fn store_script(&self, script: &P2SHScript) -> Result<(), StorageError> {
        log::info!("Storing script for address '{}'", script.address);
        self.conn()?.execute(
            "INSERT INTO p2sh_scripts (address, script, signature) VALUES (?1, ?2, ?3)",
            params![script.address, script.script, script.signature],
        )?;

        Ok(())
    }

    fn get_scripts(&self, address: &str) -> Result<Vec<P2SHScript>, StorageError> {
        let conn = self.conn()?;
        let scripts = if address.is_empty() {
            conn.prepare("SELECT script, signature, address FROM p2sh_scripts")?
                .query_map([], script_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
            conn.prepare("SELECT script, signature, address FROM p2sh_scripts WHERE address = ?1")?
                .query_map(params![address], script_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?
        };

        Ok(scripts)
    }

    fn store_promise(&self, promise: &Promise) -> Result<(), StorageError> {
        log::info!(
            "Storing promise of amount {} for blinded message '{}'",
            promise.amount,
            promise.b_b
        );
        let amount = amount_to_sql(promise.amount)?;
        self.conn()?.execute(
            "INSERT INTO promises (b_b, c_b, amount) VALUES (?1, ?2, ?3)",
            params![promise.b_b, promise.c_b, amount],
        )?;

        Ok(())
    }

    fn store_lightning_invoice(&self, invoice: &Invoice) -> Result<(), StorageError> {
        log::info!(
            "Storing Lightning invoice '{}' of amount {}",
            invoice.hash,
            invoice.amount
        );
        warn_issued_unpaid(invoice);
        let amount = amount_to_sql(invoice.amount)?;
        self.conn()?.execute(
            "INSERT INTO invoices (hash, amount, pr, paid, issued, time_created, time_paid) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                invoice.hash,
                amount,
                invoice.pr,
                invoice.paid,
                invoice.issued,
                invoice.time_created,
                invoice.time_paid
            ],
        )?;

        Ok(())
    }

    fn get_lightning_invoice(&self, hash: &str) -> Result<Invoice, StorageError> {
        let raw = self
            .conn()?
            .query_row(
                "SELECT hash, amount, pr, paid, issued, time_created, time_paid \
                 FROM invoices WHERE hash = ?1",
                params![hash],
                raw_invoice,
            )
            .optional()?;
        log::debug!("Looked up Lightning invoice '{}': found {}", hash, raw.is_some());

        raw.map(invoice_from_raw)
            .unwrap_or_else(|| {
                Err(StorageError::NotFound {
                    table: "invoices",
                    key: hash.to_string(),
                })
            })
    }

    fn get_lightning_invoices(&self, paid: bool) -> Result<Vec<Invoice>, StorageError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT hash, amount, pr, paid, issued, time_created, time_paid \
             FROM invoices WHERE paid = ?1",
        )?;
        let rows = stmt
            .query_map(params![paid], raw_invoice)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(invoice_from_raw).collect()
    }

    fn update_lightning_invoice(
        &self,
        hash: &str,
        updates: &[InvoiceUpdate],
    ) -> Result<(), StorageError> {
        let invoice = apply_updates(self.get_lightning_invoice(hash)?, updates);
        log::info!(
            "Updating Lightning invoice '{}' (paid: {}, issued: {})",
            hash,
            invoice.paid,
            invoice.issued
        );
        warn_issued_unpaid(&invoice);

        let amount = amount_to_sql(invoice.amount)?;
        self.conn()?.execute(
            "UPDATE invoices SET amount = ?1, pr = ?2, paid = ?3, issued = ?4, \
             time_created = ?5, time_paid = ?6 WHERE hash = ?7",
            params![
                amount,
                invoice.pr,
                invoice.paid,
                invoice.issued,
                invoice.time_created,
                invoice.time_paid,
                hash
            ],
        )?;

        Ok(())
    }
}
