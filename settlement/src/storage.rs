//! redb-based storage layer for bills, visits, and receipts
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `bills` | `bill_id` | `Bill` | Root bills and settlement fragments |
//! | `bill_lines` | `(bill_id, line_id)` | `BillLine` | Lines per bill |
//! | `bill_children` | `(parent_id, ordinal)` | `bill_id` | Fragment index in commit order |
//! | `visits` | `visit_id` | `Visit` | Visits (seatings) |
//! | `receipts` | `receipt_id` | `Receipt` | Issued receipts (never deleted) |
//! | `bill_receipts` | `(bill_id, receipt_id)` | `()` | Receipts per bill |
//! | `issuance_keys` | `idempotency_key` | `receipt_id` | Exactly-once receipt issuance |
//! | `counters` | `&str` | `u64` | Daily receipt sequence |
//!
//! # Concurrency
//!
//! redb allows a single write transaction at a time, so every settlement
//! or issuance runs its checks and writes against a stable view. The
//! `issuance_keys` lookup-then-insert inside one write transaction is what
//! makes receipt issuance exactly-once under client retries.
//!
//! # Durability
//!
//! redb commits with `Durability::Immediate`: once `commit()` returns the
//! state is on disk, and the file is always left consistent. This matters
//! for POS terminals that lose power without warning.

use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
    WriteTransaction,
};
use shared::billing::{Bill, BillLine, Receipt, Visit};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Table for bills: key = bill_id, value = JSON-serialized Bill
const BILLS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("bills");

/// Table for bill lines: key = (bill_id, line_id), value = JSON-serialized BillLine
const LINES_TABLE: TableDefinition<(&str, &str), &[u8]> = TableDefinition::new("bill_lines");

/// Table for the fragment index: key = (parent_id, ordinal), value = child bill_id
///
/// Ordinals are 1-based and assigned in commit order, so the number of
/// entries for a parent is the number of committed fragments.
const CHILDREN_TABLE: TableDefinition<(&str, u32), &str> = TableDefinition::new("bill_children");

/// Table for visits: key = visit_id, value = JSON-serialized Visit
const VISITS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("visits");

/// Table for receipts: key = receipt_id, value = JSON-serialized Receipt
const RECEIPTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("receipts");

/// Table for the receipt-per-bill index: key = (bill_id, receipt_id), value = empty
const BILL_RECEIPTS_TABLE: TableDefinition<(&str, &str), ()> =
    TableDefinition::new("bill_receipts");

/// Table for issuance idempotency: key = idempotency_key, value = receipt_id
const ISSUANCE_KEYS_TABLE: TableDefinition<&str, &str> = TableDefinition::new("issuance_keys");

/// Table for counters: key = "receipt_date" or "receipt_seq", value = u64
const COUNTERS_TABLE: TableDefinition<&str, u64> = TableDefinition::new("counters");

const RECEIPT_DATE_KEY: &str = "receipt_date";
const RECEIPT_SEQ_KEY: &str = "receipt_seq";

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Settlement storage backed by redb
#[derive(Clone)]
pub struct LedgerStorage {
    db: Arc<Database>,
}

impl LedgerStorage {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;

        // Initialize tables
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(BILLS_TABLE)?;
            let _ = write_txn.open_table(LINES_TABLE)?;
            let _ = write_txn.open_table(CHILDREN_TABLE)?;
            let _ = write_txn.open_table(VISITS_TABLE)?;
            let _ = write_txn.open_table(RECEIPTS_TABLE)?;
            let _ = write_txn.open_table(BILL_RECEIPTS_TABLE)?;
            let _ = write_txn.open_table(ISSUANCE_KEYS_TABLE)?;

            // Initialize the receipt sequence if not present
            let mut counters = write_txn.open_table(COUNTERS_TABLE)?;
            if counters.get(RECEIPT_SEQ_KEY)?.is_none() {
                counters.insert(RECEIPT_SEQ_KEY, 0u64)?;
            }
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;

        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(BILLS_TABLE)?;
            let _ = write_txn.open_table(LINES_TABLE)?;
            let _ = write_txn.open_table(CHILDREN_TABLE)?;
            let _ = write_txn.open_table(VISITS_TABLE)?;
            let _ = write_txn.open_table(RECEIPTS_TABLE)?;
            let _ = write_txn.open_table(BILL_RECEIPTS_TABLE)?;
            let _ = write_txn.open_table(ISSUANCE_KEYS_TABLE)?;
            let mut counters = write_txn.open_table(COUNTERS_TABLE)?;
            counters.insert(RECEIPT_SEQ_KEY, 0u64)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    // ========== Bill Operations ==========

    /// Store or update a bill
    pub fn store_bill(&self, txn: &WriteTransaction, bill: &Bill) -> StorageResult<()> {
        let mut table = txn.open_table(BILLS_TABLE)?;
        let value = serde_json::to_vec(bill)?;
        table.insert(bill.id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// Get a bill by ID (within transaction)
    pub fn get_bill_txn(&self, txn: &WriteTransaction, bill_id: &str) -> StorageResult<Option<Bill>> {
        let table = txn.open_table(BILLS_TABLE)?;

        match table.get(bill_id)? {
            Some(value) => {
                let bill: Bill = serde_json::from_slice(value.value())?;
                Ok(Some(bill))
            }
            None => Ok(None),
        }
    }

    /// Get a bill by ID
    pub fn get_bill(&self, bill_id: &str) -> StorageResult<Option<Bill>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(BILLS_TABLE)?;

        match table.get(bill_id)? {
            Some(value) => {
                let bill: Bill = serde_json::from_slice(value.value())?;
                Ok(Some(bill))
            }
            None => Ok(None),
        }
    }

    // ========== Line Operations ==========

    /// Store or update a line
    pub fn store_line(&self, txn: &WriteTransaction, line: &BillLine) -> StorageResult<()> {
        let mut table = txn.open_table(LINES_TABLE)?;
        let key = (line.bill_id.as_str(), line.id.as_str());
        let value = serde_json::to_vec(line)?;
        table.insert(key, value.as_slice())?;
        Ok(())
    }

    /// Remove a line (quantity exhausted)
    pub fn remove_line(&self, txn: &WriteTransaction, bill_id: &str, line_id: &str) -> StorageResult<()> {
        let mut table = txn.open_table(LINES_TABLE)?;
        table.remove((bill_id, line_id))?;
        Ok(())
    }

    /// Get a line by ID (within transaction)
    pub fn get_line_txn(
        &self,
        txn: &WriteTransaction,
        bill_id: &str,
        line_id: &str,
    ) -> StorageResult<Option<BillLine>> {
        let table = txn.open_table(LINES_TABLE)?;

        match table.get((bill_id, line_id))? {
            Some(value) => {
                let line: BillLine = serde_json::from_slice(value.value())?;
                Ok(Some(line))
            }
            None => Ok(None),
        }
    }

    /// Get all lines for a bill (within transaction)
    pub fn get_lines_for_bill_txn(
        &self,
        txn: &WriteTransaction,
        bill_id: &str,
    ) -> StorageResult<Vec<BillLine>> {
        let table = txn.open_table(LINES_TABLE)?;

        let mut lines = Vec::new();
        for result in table.range((bill_id, "")..)? {
            let (key, value) = result?;
            if key.value().0 != bill_id {
                break;
            }
            let line: BillLine = serde_json::from_slice(value.value())?;
            lines.push(line);
        }

        Ok(lines)
    }

    /// Get all lines for a bill
    pub fn get_lines_for_bill(&self, bill_id: &str) -> StorageResult<Vec<BillLine>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(LINES_TABLE)?;

        let mut lines = Vec::new();
        for result in table.range((bill_id, "")..)? {
            let (key, value) = result?;
            if key.value().0 != bill_id {
                break;
            }
            let line: BillLine = serde_json::from_slice(value.value())?;
            lines.push(line);
        }

        Ok(lines)
    }

    // ========== Fragment Index ==========

    /// Register a committed fragment under its parent
    ///
    /// Returns the 1-based ordinal assigned to the fragment.
    pub fn append_child(
        &self,
        txn: &WriteTransaction,
        parent_id: &str,
        child_id: &str,
    ) -> StorageResult<u32> {
        let mut table = txn.open_table(CHILDREN_TABLE)?;

        let mut count: u32 = 0;
        for result in table.range((parent_id, 0u32)..=(parent_id, u32::MAX))? {
            let _ = result?;
            count += 1;
        }

        let ordinal = count + 1;
        table.insert((parent_id, ordinal), child_id)?;
        Ok(ordinal)
    }

    /// Number of committed fragments for a parent (within transaction)
    pub fn child_count_txn(&self, txn: &WriteTransaction, parent_id: &str) -> StorageResult<u32> {
        let table = txn.open_table(CHILDREN_TABLE)?;

        let mut count: u32 = 0;
        for result in table.range((parent_id, 0u32)..=(parent_id, u32::MAX))? {
            let _ = result?;
            count += 1;
        }

        Ok(count)
    }

    /// Get child bill IDs in commit order (within transaction)
    pub fn get_child_ids_txn(
        &self,
        txn: &WriteTransaction,
        parent_id: &str,
    ) -> StorageResult<Vec<String>> {
        let table = txn.open_table(CHILDREN_TABLE)?;

        let mut ids = Vec::new();
        for result in table.range((parent_id, 0u32)..=(parent_id, u32::MAX))? {
            let (_key, value) = result?;
            ids.push(value.value().to_string());
        }

        Ok(ids)
    }

    /// Get child bills in commit order (within transaction)
    pub fn get_children_txn(
        &self,
        txn: &WriteTransaction,
        parent_id: &str,
    ) -> StorageResult<Vec<Bill>> {
        let ids = self.get_child_ids_txn(txn, parent_id)?;
        let table = txn.open_table(BILLS_TABLE)?;

        let mut children = Vec::new();
        for id in ids {
            if let Some(value) = table.get(id.as_str())? {
                let bill: Bill = serde_json::from_slice(value.value())?;
                children.push(bill);
            }
        }

        Ok(children)
    }

    /// Get child bills in commit order
    pub fn get_children(&self, parent_id: &str) -> StorageResult<Vec<Bill>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(CHILDREN_TABLE)?;
        let bills = read_txn.open_table(BILLS_TABLE)?;

        let mut children = Vec::new();
        for result in index.range((parent_id, 0u32)..=(parent_id, u32::MAX))? {
            let (_key, value) = result?;
            if let Some(bill_value) = bills.get(value.value())? {
                let bill: Bill = serde_json::from_slice(bill_value.value())?;
                children.push(bill);
            }
        }

        Ok(children)
    }

    // ========== Visit Operations ==========

    /// Store or update a visit
    pub fn store_visit(&self, txn: &WriteTransaction, visit: &Visit) -> StorageResult<()> {
        let mut table = txn.open_table(VISITS_TABLE)?;
        let value = serde_json::to_vec(visit)?;
        table.insert(visit.id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// Get a visit by ID (within transaction)
    pub fn get_visit_txn(&self, txn: &WriteTransaction, visit_id: &str) -> StorageResult<Option<Visit>> {
        let table = txn.open_table(VISITS_TABLE)?;

        match table.get(visit_id)? {
            Some(value) => {
                let visit: Visit = serde_json::from_slice(value.value())?;
                Ok(Some(visit))
            }
            None => Ok(None),
        }
    }

    /// Get a visit by ID
    pub fn get_visit(&self, visit_id: &str) -> StorageResult<Option<Visit>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(VISITS_TABLE)?;

        match table.get(visit_id)? {
            Some(value) => {
                let visit: Visit = serde_json::from_slice(value.value())?;
                Ok(Some(visit))
            }
            None => Ok(None),
        }
    }

    // ========== Receipt Operations ==========

    /// Store a freshly issued receipt and its indices
    ///
    /// Inserts the receipt, the per-bill index entry, and the idempotency
    /// key mapping when the receipt carries one. Must run in the same
    /// transaction as the issuance checks.
    pub fn store_receipt(&self, txn: &WriteTransaction, receipt: &Receipt) -> StorageResult<()> {
        {
            let mut table = txn.open_table(RECEIPTS_TABLE)?;
            let value = serde_json::to_vec(receipt)?;
            table.insert(receipt.id.as_str(), value.as_slice())?;
        }
        {
            let mut index = txn.open_table(BILL_RECEIPTS_TABLE)?;
            index.insert((receipt.bill_id.as_str(), receipt.id.as_str()), ())?;
        }
        if let Some(key) = &receipt.idempotency_key {
            let mut keys = txn.open_table(ISSUANCE_KEYS_TABLE)?;
            keys.insert(key.as_str(), receipt.id.as_str())?;
        }
        Ok(())
    }

    /// Update an existing receipt in place (reprint count, void flags)
    pub fn update_receipt(&self, txn: &WriteTransaction, receipt: &Receipt) -> StorageResult<()> {
        let mut table = txn.open_table(RECEIPTS_TABLE)?;
        let value = serde_json::to_vec(receipt)?;
        table.insert(receipt.id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// Get a receipt by ID (within transaction)
    pub fn get_receipt_txn(
        &self,
        txn: &WriteTransaction,
        receipt_id: &str,
    ) -> StorageResult<Option<Receipt>> {
        let table = txn.open_table(RECEIPTS_TABLE)?;

        match table.get(receipt_id)? {
            Some(value) => {
                let receipt: Receipt = serde_json::from_slice(value.value())?;
                Ok(Some(receipt))
            }
            None => Ok(None),
        }
    }

    /// Get a receipt by ID
    pub fn get_receipt(&self, receipt_id: &str) -> StorageResult<Option<Receipt>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RECEIPTS_TABLE)?;

        match table.get(receipt_id)? {
            Some(value) => {
                let receipt: Receipt = serde_json::from_slice(value.value())?;
                Ok(Some(receipt))
            }
            None => Ok(None),
        }
    }

    /// Get all receipts issued against a bill (within transaction)
    pub fn get_receipts_for_bill_txn(
        &self,
        txn: &WriteTransaction,
        bill_id: &str,
    ) -> StorageResult<Vec<Receipt>> {
        let index = txn.open_table(BILL_RECEIPTS_TABLE)?;

        let mut ids = Vec::new();
        for result in index.range((bill_id, "")..)? {
            let (key, _value) = result?;
            if key.value().0 != bill_id {
                break;
            }
            ids.push(key.value().1.to_string());
        }
        drop(index);

        let table = txn.open_table(RECEIPTS_TABLE)?;
        let mut receipts = Vec::new();
        for id in ids {
            if let Some(value) = table.get(id.as_str())? {
                let receipt: Receipt = serde_json::from_slice(value.value())?;
                receipts.push(receipt);
            }
        }

        Ok(receipts)
    }

    /// Get all receipts issued against a bill
    pub fn get_receipts_for_bill(&self, bill_id: &str) -> StorageResult<Vec<Receipt>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(BILL_RECEIPTS_TABLE)?;
        let table = read_txn.open_table(RECEIPTS_TABLE)?;

        let mut receipts = Vec::new();
        for result in index.range((bill_id, "")..)? {
            let (key, _value) = result?;
            if key.value().0 != bill_id {
                break;
            }
            if let Some(value) = table.get(key.value().1)? {
                let receipt: Receipt = serde_json::from_slice(value.value())?;
                receipts.push(receipt);
            }
        }

        Ok(receipts)
    }

    // ========== Issuance Idempotency ==========

    /// Look up a previously issued receipt by idempotency key (within transaction)
    pub fn find_by_issuance_key_txn(
        &self,
        txn: &WriteTransaction,
        key: &str,
    ) -> StorageResult<Option<Receipt>> {
        let keys = txn.open_table(ISSUANCE_KEYS_TABLE)?;
        let receipt_id = match keys.get(key)? {
            Some(value) => value.value().to_string(),
            None => return Ok(None),
        };
        drop(keys);

        self.get_receipt_txn(txn, &receipt_id)
    }

    // ========== Receipt Sequence ==========

    /// Get the next receipt sequence for the given business day
    ///
    /// `date_key` is the business day as yyyymmdd. The sequence resets to 1
    /// when the stored day differs. Runs inside the caller's transaction so
    /// a failed issuance never burns a number.
    pub fn next_receipt_sequence(
        &self,
        txn: &WriteTransaction,
        date_key: u64,
    ) -> StorageResult<u64> {
        let mut counters = txn.open_table(COUNTERS_TABLE)?;

        let stored_date = counters.get(RECEIPT_DATE_KEY)?.map(|g| g.value()).unwrap_or(0);

        let seq = if stored_date != date_key {
            counters.insert(RECEIPT_DATE_KEY, date_key)?;
            counters.insert(RECEIPT_SEQ_KEY, 1u64)?;
            1
        } else {
            let current = counters.get(RECEIPT_SEQ_KEY)?.map(|g| g.value()).unwrap_or(0);
            let next = current + 1;
            counters.insert(RECEIPT_SEQ_KEY, next)?;
            next
        };

        Ok(seq)
    }

    // ========== Statistics ==========

    /// Get storage statistics
    pub fn get_stats(&self) -> StorageResult<StorageStats> {
        let read_txn = self.db.begin_read()?;

        let bills_table = read_txn.open_table(BILLS_TABLE)?;
        let lines_table = read_txn.open_table(LINES_TABLE)?;
        let visits_table = read_txn.open_table(VISITS_TABLE)?;
        let receipts_table = read_txn.open_table(RECEIPTS_TABLE)?;

        Ok(StorageStats {
            bill_count: bills_table.len()?,
            line_count: lines_table.len()?,
            visit_count: visits_table.len()?,
            receipt_count: receipts_table.len()?,
        })
    }
}

/// Storage statistics
#[derive(Debug, Clone)]
pub struct StorageStats {
    pub bill_count: u64,
    pub line_count: u64,
    pub visit_count: u64,
    pub receipt_count: u64,
}
