use std::{thread, time::Instant};

use flume::Receiver;
use num_format::{Locale, ToFormattedString};
use thiserror::Error;

use crate::model::statement::Statement;

use super::{
    commands::{
        Control, DatabaseCommand, DatabaseCommandRequest, DatabaseCommandResponse,
        DatabaseCommandTransactionResponse,
    },
    options::DatabaseOptions,
    request_manager::RequestManager,
    table::table::{Applied, Change, PersonTable},
    transaction::{TransactionLogError, TransactionWAL},
};

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Unable to restore database: {0}")]
    Restore(TransactionLogError),

    #[error(transparent)]
    TransactionLog(#[from] TransactionLogError),

    #[error("Unable to start database thread: {0}")]
    Thread(std::io::Error),
}

/// Primary store of record. A single thread owns the table so transactions are applied one at a time
pub struct Database {
    person_table: PersonTable,
    transaction_wal: TransactionWAL,
    database_options: DatabaseOptions,
}

impl Database {
    pub fn new(options: DatabaseOptions) -> Result<Self, DatabaseError> {
        let transaction_wal = TransactionWAL::new(&options.data_directory, options.write_mode)?;

        let mut database = Self {
            person_table: PersonTable::new(),
            transaction_wal,
            database_options: options,
        };

        if database.database_options.restore {
            database.restore()?;
        }

        Ok(database)
    }

    pub fn new_test() -> Self {
        Database::new(DatabaseOptions::new_test()).expect("Should be able to create a test database")
    }

    /// Replays the transaction log into the table
    fn restore(&mut self) -> Result<(), DatabaseError> {
        let transaction_log_location = &self.database_options.data_directory;

        log::info!(
            "Transaction Log Location: [{}]",
            transaction_log_location.display()
        );

        let now = Instant::now();

        let restored_transactions =
            TransactionWAL::restore(transaction_log_location).map_err(DatabaseError::Restore)?;
        let restored_transaction_count = restored_transactions.len();

        for transaction in restored_transactions {
            for mutation in &transaction.mutations {
                self.person_table.apply_mutation(mutation);
            }

            self.transaction_wal
                .set_current_transaction_id(transaction.id);
        }

        log::info!(
            "✅ Successful Restore [Duration: {}ms]",
            now.elapsed().as_millis(),
        );

        log::info!(
            "📀 Data               [Rows: {}, TransactionsApplied: {}, CurrentTxId: {}]",
            self.person_table.len().to_formatted_string(&Locale::en),
            restored_transaction_count.to_formatted_string(&Locale::en),
            self.transaction_wal
                .get_current_transaction_id()
                .to_number()
                .to_formatted_string(&Locale::en)
        );

        Ok(())
    }

    /// Moves the database onto its own thread, the returned request manager is how callers talk to it
    pub fn run(self) -> Result<RequestManager, DatabaseError> {
        let (database_sender, database_receiver) = flume::unbounded::<DatabaseCommandRequest>();

        thread::Builder::new()
            .name("people-store".to_string())
            .spawn(move || self.process_commands(database_receiver))
            .map_err(DatabaseError::Thread)?;

        Ok(RequestManager::new(database_sender))
    }

    fn process_commands(mut self, database_receiver: Receiver<DatabaseCommandRequest>) {
        // Exits when every request manager has been dropped, or on a shutdown control
        for DatabaseCommandRequest { command, resolver } in database_receiver.iter() {
            log::debug!("Received request: {}", command.log_format());

            let response = match command {
                DatabaseCommand::Transaction(statements) => {
                    DatabaseCommandResponse::DatabaseCommandTransactionResponse(
                        self.process_statements(statements),
                    )
                }
                DatabaseCommand::Control(Control::Shutdown) => {
                    let response = match self.transaction_wal.sync() {
                        Ok(_) => DatabaseCommandResponse::control_success(
                            "Successfully shutdown database",
                        ),
                        Err(err) => DatabaseCommandResponse::control_error(&format!("{}", err)),
                    };

                    // The caller may have timed out and gone away, nothing to do about that
                    let _ = resolver.send(response);

                    log::info!("Database shutdown");

                    return;
                }
            };

            // Sends the response data back to the caller of the request (i.e.), the entity on the other end of the channel
            if resolver.send(response).is_err() {
                log::warn!("Caller went away before the database responded");
            }
        }
    }

    pub fn process_statement(&mut self, statement: Statement) -> DatabaseCommandTransactionResponse {
        self.process_statements(vec![statement])
    }

    pub fn process_statements(
        &mut self,
        statements: Vec<Statement>,
    ) -> DatabaseCommandTransactionResponse {
        let applying_transaction_id = self
            .transaction_wal
            .get_current_transaction_id()
            .increment();

        let mut results = Vec::with_capacity(statements.len());
        let mut changes: Vec<Change> = Vec::new();

        for statement in statements {
            match self.person_table.apply(statement) {
                Ok(Applied { result, change }) => {
                    results.push(result);

                    if let Some(change) = change {
                        changes.push(change);
                    }
                }
                Err(err) => {
                    log::info!(
                        "⚠️  Rolled back: [TX: {}] {}",
                        &applying_transaction_id,
                        err
                    );

                    self.rollback(changes);

                    return DatabaseCommandTransactionResponse::Rollback(err);
                }
            }
        }

        let mutations = changes
            .iter()
            .map(|change| change.mutation.clone())
            .collect::<Vec<_>>();
        let is_mutation = !mutations.is_empty();

        if let Err(err) = self
            .transaction_wal
            .commit(applying_transaction_id.clone(), mutations)
        {
            log::error!(
                "⚠️  Rolled back: [TX: {}] {}",
                &applying_transaction_id,
                err
            );

            self.rollback(changes);

            return DatabaseCommandTransactionResponse::LogFailure(format!("{}", err));
        }

        if is_mutation {
            log::info!("✅ Committed: [TX: {}]", &applying_transaction_id);
        }

        DatabaseCommandTransactionResponse::Commit(results)
    }

    fn rollback(&mut self, changes: Vec<Change>) {
        // Reverse order, later changes may depend on earlier ones
        for change in changes.into_iter().rev() {
            self.person_table.apply_rollback(change);
        }
    }
}


pub mod test_utils {
    use std::thread::{self, JoinHandle};

    use crate::{
        database::database::Database,
        model::{
            person::Person,
            statement::{Statement, StatementResult},
        },
    };

    /// Runs `statements` statements from each of `worker_threads` threads against a running database,
    /// then shuts the database down
    pub fn database_test(
        worker_threads: u64,
        statements: u64,
        statement_generator: fn(u64, u64) -> Statement,
    ) {
        let request_manager = Database::new_test()
            .run()
            .expect("Should be able to start the database");

        let mut sender_threads: Vec<JoinHandle<()>> = vec![];

        for thread_id in 0..worker_threads {
            let rm = request_manager.clone();

            let sender_thread = thread::spawn(move || {
                for index in 0..statements {
                    let statement = statement_generator(thread_id, index);

                    let result = rm
                        .send_single_statement(statement)
                        .expect("Should not timeout");

                    match result {
                        StatementResult::Created(_)
                        | StatementResult::Updated(_)
                        | StatementResult::GetSingle(_)
                        | StatementResult::List(_) => {}
                        _ => panic!("Unexpected response type"),
                    }
                }
            });

            sender_threads.push(sender_thread);
        }

        for thread in sender_threads {
            thread.join().expect("Sender thread should not panic");
        }

        // Allows database thread to successfully exit
        let shutdown_response = request_manager
            .send_shutdown_request()
            .expect("Should not timeout");

        assert_eq!(
            shutdown_response,
            "Successfully shutdown database".to_string()
        );
    }

    /// Person used by the bulk tests
    pub fn bulk_person(thread_id: u64, index: u64) -> Person {
        Person::new(format!("First {}", thread_id), format!("Last {}", index))
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::{consts::consts::PersonId, database::table::page::Pageable};

        #[test]
        fn bulk_add() {
            database_test(4, 25, |thread_id, index| {
                Statement::Add(bulk_person(thread_id, index))
            });
        }

        #[test]
        fn bulk_update() {
            // Every thread creates through the update fallback, then keeps rewriting row 1
            database_test(2, 10, |thread_id, index| {
                if index == 0 {
                    return Statement::Update(bulk_person(thread_id, index));
                }

                Statement::Update(bulk_person(thread_id, index).with_id(PersonId(1)))
            });
        }

        #[test]
        fn bulk_read() {
            database_test(2, 10, |thread_id, index| match index % 2 {
                0 => Statement::Add(bulk_person(thread_id, index)),
                _ => Statement::List(Pageable::default()),
            });
        }
    }
}
