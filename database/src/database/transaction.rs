use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, prelude::*};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::consts::consts::TransactionId;

use super::table::table::Mutation;

#[derive(Error, Debug)]
pub enum TransactionLogError {
    #[error("Unable to open the transaction log at {0}: {1}")]
    UnableToOpen(PathBuf, io::Error),

    #[error("Unable to write transaction {0}: {1}")]
    UnableToWrite(TransactionId, io::Error),

    #[error("Unable to sync the transaction log: {0}")]
    UnableToSync(io::Error),

    #[error("Unable to read the transaction log: {0}")]
    UnableToRead(io::Error),

    #[error("Unable to serialize transaction {0}: {1}")]
    UnableToSerialize(TransactionId, serde_json::Error),

    #[error("Corrupt transaction log entry on line {0}: {1}")]
    CorruptEntry(usize, serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransactionWriteMode {
    /// Nothing is written, the table only lives in memory
    Off,
    /// Buffered OS write, is not 'durable' without the fsync
    Buffered,
    /// Every commit is fsynced before the caller is answered
    Sync,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub enum TransactionStatus {
    Committed,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Transaction {
    pub id: TransactionId,
    pub mutations: Vec<Mutation>,
    pub status: TransactionStatus,
}

#[derive(Debug)]
pub struct TransactionWAL {
    log_file: Option<File>,
    write_mode: TransactionWriteMode,
    current_transaction_id: TransactionId,
}

fn get_transaction_log_location(data_directory: &Path) -> PathBuf {
    // Defaults to $CWD/data/transaction_log.json, but $CWD/data can be overridden via the CLI
    data_directory.join("transaction_log.json")
}

/// A crash mid-append leaves a partial last line, drop it so the next append starts on a fresh line
fn trim_torn_tail(path: &Path) -> io::Result<()> {
    let contents = match fs::read(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };

    if contents.is_empty() || contents.ends_with(b"\n") {
        return Ok(());
    }

    let keep = contents
        .iter()
        .rposition(|byte| *byte == b'\n')
        .map_or(0, |position| position + 1);

    log::warn!(
        "Dropping {} bytes of an incomplete transaction at the end of {}",
        contents.len() - keep,
        path.display()
    );

    OpenOptions::new().write(true).open(path)?.set_len(keep as u64)
}

impl TransactionWAL {
    pub fn new(
        data_directory: &Path,
        write_mode: TransactionWriteMode,
    ) -> Result<Self, TransactionLogError> {
        let log_file = match write_mode {
            TransactionWriteMode::Off => None,
            TransactionWriteMode::Buffered | TransactionWriteMode::Sync => {
                let path = get_transaction_log_location(data_directory);

                fs::create_dir_all(data_directory)
                    .map_err(|e| TransactionLogError::UnableToOpen(path.clone(), e))?;

                trim_torn_tail(&path)
                    .map_err(|e| TransactionLogError::UnableToOpen(path.clone(), e))?;

                let file = OpenOptions::new()
                    .append(true)
                    .create(true)
                    .open(&path)
                    .map_err(|e| TransactionLogError::UnableToOpen(path, e))?;

                Some(file)
            }
        };

        Ok(Self {
            log_file,
            write_mode,
            current_transaction_id: TransactionId::new_first_transaction(),
        })
    }

    pub fn get_current_transaction_id(&self) -> &TransactionId {
        &self.current_transaction_id
    }

    pub fn set_current_transaction_id(&mut self, transaction_id: TransactionId) {
        self.current_transaction_id = transaction_id;
    }

    /// Appends the transaction as a single JSON line. Transactions without mutations (reads) are not logged
    pub fn commit(
        &mut self,
        applied_transaction_id: TransactionId,
        mutations: Vec<Mutation>,
    ) -> Result<(), TransactionLogError> {
        if let (Some(log_file), false) = (&mut self.log_file, mutations.is_empty()) {
            let transaction = Transaction {
                id: applied_transaction_id.clone(),
                mutations,
                status: TransactionStatus::Committed,
            };

            let transaction_json_line = format!(
                "{}\n",
                serde_json::to_string(&transaction).map_err(|e| {
                    TransactionLogError::UnableToSerialize(applied_transaction_id.clone(), e)
                })?
            );

            let committed_length = log_file
                .metadata()
                .map_err(|e| {
                    TransactionLogError::UnableToWrite(applied_transaction_id.clone(), e)
                })?
                .len();

            let written = log_file
                .write_all(transaction_json_line.as_bytes())
                .map_err(|e| TransactionLogError::UnableToWrite(applied_transaction_id.clone(), e))
                .and_then(|_| match self.write_mode {
                    // Performs an fsync on the transaction log, ensuring that the transaction is durable
                    // https://www.postgresql.org/docs/current/wal-reliability.html
                    TransactionWriteMode::Sync => {
                        log_file.sync_all().map_err(TransactionLogError::UnableToSync)
                    }
                    _ => Ok(()),
                });

            if let Err(err) = written {
                // The caller is told the transaction failed, so it must not come back on restore
                if let Err(truncate_err) = log_file.set_len(committed_length) {
                    log::error!(
                        "Unable to remove failed transaction {} from the log: {}",
                        applied_transaction_id,
                        truncate_err
                    );
                }

                return Err(err);
            }
        }

        self.current_transaction_id = applied_transaction_id;

        Ok(())
    }

    /// Flushes anything the OS is still buffering, called on shutdown
    pub fn sync(&self) -> Result<(), TransactionLogError> {
        if let Some(log_file) = &self.log_file {
            log_file
                .sync_all()
                .map_err(TransactionLogError::UnableToSync)?;
        }

        Ok(())
    }

    /// Reads back every committed transaction, a missing log is an empty log
    pub fn restore(data_directory: &Path) -> Result<Vec<Transaction>, TransactionLogError> {
        let mut file = match File::open(get_transaction_log_location(data_directory)) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(TransactionLogError::UnableToRead(e)),
        };

        let mut contents = String::new();

        file.read_to_string(&mut contents)
            .map_err(TransactionLogError::UnableToRead)?;

        let mut transactions: Vec<Transaction> = vec![];

        for (line_number, transaction_string) in contents.split('\n').enumerate() {
            if transaction_string.is_empty() {
                continue;
            }

            let transaction: Transaction = serde_json::from_str(transaction_string)
                .map_err(|e| TransactionLogError::CorruptEntry(line_number + 1, e))?;

            transactions.push(transaction);
        }

        Ok(transactions)
    }
}
