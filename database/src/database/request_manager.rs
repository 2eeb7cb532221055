use flume::Sender;
use std::time::Duration;
use thiserror::Error;

use crate::{
    consts::consts::PersonId,
    model::{
        person::Person,
        statement::{Statement, StatementResult, Upsert},
    },
};

use super::{
    commands::{
        Control, DatabaseCommand, DatabaseCommandControlResponse, DatabaseCommandRequest,
        DatabaseCommandResponse, DatabaseCommandTransactionResponse,
    },
    table::{
        page::{Page, Pageable},
        table::ApplyErrors,
    },
};

const DATABASE_RESPONSE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Error, Debug)]
pub enum RequestManagerError {
    #[error("Database took too long to respond to request")]
    DatabaseTimeout,
    #[error("Database is not running")]
    DatabaseUnavailable,
    #[error("Rolled back transaction: {0}")]
    TransactionRollback(ApplyErrors),
    #[error("Unable to persist transaction: {0}")]
    TransactionLog(String),
    #[error("Database control failed: {0}")]
    Control(String),
    #[error("Unexpected database response: {0}")]
    UnexpectedResponse(String),
}

/// Goal of the request manager is to provide a simple interface for interacting with the database
///
/// The request manager providers the following APIs. These are sorted by the easiest to use to the most complex
/// 1. CRUD operations on a single person -- these are completely type safe
/// 2. Generic statement based API -- you need to know what Statement maps to which StatementResult
/// 3. Transaction based API -- similar to the generic statement API, but sends multiple statements that commit or roll back together
#[derive(Clone, Debug)]
pub struct RequestManager {
    database_sender: Sender<DatabaseCommandRequest>,
}

impl RequestManager {
    pub fn new(database_sender: Sender<DatabaseCommandRequest>) -> Self {
        Self { database_sender }
    }

    /// Creates a person, the person must not have an id yet
    pub fn send_add(&self, person: Person) -> Result<Person, RequestManagerError> {
        match self.send_single_statement(Statement::Add(person))? {
            StatementResult::Created(person) => Ok(person),
            other => Err(unexpected(other)),
        }
    }

    /// Replaces the stored person, creates it when it has no id
    pub fn send_update(&self, person: Person) -> Result<Upsert, RequestManagerError> {
        match self.send_single_statement(Statement::Update(person))? {
            StatementResult::Created(person) => Ok(Upsert::Created(person)),
            StatementResult::Updated(person) => Ok(Upsert::Updated(person)),
            other => Err(unexpected(other)),
        }
    }

    /// Returns the removed person, None when it did not exist
    pub fn send_remove(&self, id: PersonId) -> Result<Option<Person>, RequestManagerError> {
        match self.send_single_statement(Statement::Remove(id))? {
            StatementResult::Removed(person) => Ok(person),
            other => Err(unexpected(other)),
        }
    }

    pub fn send_get(&self, id: PersonId) -> Result<Option<Person>, RequestManagerError> {
        match self.send_single_statement(Statement::Get(id))? {
            StatementResult::GetSingle(person) => Ok(person),
            other => Err(unexpected(other)),
        }
    }

    pub fn send_list(&self, pageable: Pageable) -> Result<Page<Person>, RequestManagerError> {
        match self.send_single_statement(Statement::List(pageable))? {
            StatementResult::List(page) => Ok(page),
            other => Err(unexpected(other)),
        }
    }

    pub fn send_count(&self) -> Result<usize, RequestManagerError> {
        match self.send_single_statement(Statement::Count)? {
            StatementResult::Count(count) => Ok(count),
            other => Err(unexpected(other)),
        }
    }

    /// Sends a shutdown request to the database and returns the database's response
    pub fn send_shutdown_request(&self) -> Result<String, RequestManagerError> {
        match self.send_command(DatabaseCommand::Control(Control::Shutdown))? {
            DatabaseCommandResponse::DatabaseCommandControlResponse(
                DatabaseCommandControlResponse::Success(message),
            ) => Ok(message),
            DatabaseCommandResponse::DatabaseCommandControlResponse(
                DatabaseCommandControlResponse::Error(message),
            ) => Err(RequestManagerError::Control(message)),
            other => Err(RequestManagerError::UnexpectedResponse(format!(
                "{:?}",
                other
            ))),
        }
    }

    /// Sends a single statement to the database and returns a single statement result
    pub fn send_single_statement(
        &self,
        statement: Statement,
    ) -> Result<StatementResult, RequestManagerError> {
        self.send_transaction(vec![statement])?
            .pop()
            .ok_or_else(|| {
                RequestManagerError::UnexpectedResponse(
                    "single statement generated no result".to_string(),
                )
            })
    }

    /// Used to create a transaction, either every statement commits or none do
    pub fn send_transaction(
        &self,
        statements: Vec<Statement>,
    ) -> Result<Vec<StatementResult>, RequestManagerError> {
        match self.send_command(DatabaseCommand::Transaction(statements))? {
            DatabaseCommandResponse::DatabaseCommandTransactionResponse(response) => {
                match response {
                    DatabaseCommandTransactionResponse::Commit(results) => Ok(results),
                    DatabaseCommandTransactionResponse::Rollback(err) => {
                        Err(RequestManagerError::TransactionRollback(err))
                    }
                    DatabaseCommandTransactionResponse::LogFailure(message) => {
                        Err(RequestManagerError::TransactionLog(message))
                    }
                }
            }
            other => Err(RequestManagerError::UnexpectedResponse(format!(
                "{:?}",
                other
            ))),
        }
    }

    fn send_command(
        &self,
        command: DatabaseCommand,
    ) -> Result<DatabaseCommandResponse, RequestManagerError> {
        let (resolver, response_receiver) = oneshot::channel::<DatabaseCommandResponse>();

        let request = DatabaseCommandRequest { resolver, command };

        // Sends the request to the database worker, database will response
        //  on the response_receiver once it's finished processing it's request
        self.database_sender
            .send(request)
            .map_err(|_| RequestManagerError::DatabaseUnavailable)?;

        match response_receiver.recv_timeout(DATABASE_RESPONSE_TIMEOUT) {
            Ok(response) => Ok(response),
            Err(oneshot::RecvTimeoutError::Timeout) => Err(RequestManagerError::DatabaseTimeout),
            Err(oneshot::RecvTimeoutError::Disconnected) => {
                Err(RequestManagerError::DatabaseUnavailable)
            }
        }
    }
}

fn unexpected(result: StatementResult) -> RequestManagerError {
    RequestManagerError::UnexpectedResponse(format!("{:?}", result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::database::Database;

    fn running_database() -> RequestManager {
        Database::new_test()
            .run()
            .expect("Should be able to start the database")
    }

    mod crud {
        use super::*;

        #[test]
        fn add_then_get() {
            let request_manager = running_database();

            let created = request_manager
                .send_add(Person::new_test())
                .expect("Should not timeout");
            let id = created.id.expect("created person has an id");

            let fetched = request_manager.send_get(id).expect("Should not timeout");

            assert_eq!(fetched, Some(created));
        }

        #[test]
        fn update_without_id_creates() {
            let request_manager = running_database();

            let upsert = request_manager
                .send_update(Person::new_test())
                .expect("Should not timeout");

            assert!(matches!(upsert, Upsert::Created(_)));
            assert_eq!(request_manager.send_count().expect("Should not timeout"), 1);
        }

        #[test]
        fn update_unknown_id_creates() {
            let request_manager = running_database();

            let upsert = request_manager
                .send_update(Person::new_test().with_id(PersonId(7)))
                .expect("Should not timeout");

            let Upsert::Created(created) = upsert else {
                panic!("Expected the update to create");
            };

            assert_eq!(created.id, Some(PersonId(1)));
            assert_eq!(request_manager.send_get(PersonId(7)).expect("Should not timeout"), None);
        }

        #[test]
        fn remove_missing_person() {
            let request_manager = running_database();

            let removed = request_manager
                .send_remove(PersonId(1))
                .expect("Should not timeout");

            assert_eq!(removed, None);
        }
    }

    mod transaction {
        use super::*;

        #[test]
        fn commits_every_statement() {
            let request_manager = running_database();

            let results = request_manager
                .send_transaction(vec![
                    Statement::Add(Person::new_test()),
                    Statement::Add(Person::new_test()),
                    Statement::Count,
                ])
                .expect("Should not timeout");

            assert_eq!(results.last(), Some(&StatementResult::Count(2)));
        }

        #[test]
        fn failure_rolls_back_earlier_statements() {
            // Given a transaction whose last statement fails
            let request_manager = running_database();

            let result = request_manager.send_transaction(vec![
                Statement::Add(Person::new_test()),
                Statement::Remove(PersonId(1)),
                Statement::Add(Person::new_test().with_id(PersonId(5))),
            ]);

            // Then nothing from it is visible
            assert!(matches!(
                result,
                Err(RequestManagerError::TransactionRollback(
                    ApplyErrors::CannotCreateWithId(PersonId(5))
                ))
            ));
            assert_eq!(request_manager.send_count().expect("Should not timeout"), 0);
        }
    }

    mod shutdown {
        use super::*;

        #[test]
        fn requests_after_shutdown_fail() {
            let request_manager = running_database();

            let shutdown_response = request_manager
                .send_shutdown_request()
                .expect("Should not timeout");

            assert_eq!(shutdown_response, "Successfully shutdown database");
            assert!(matches!(
                request_manager.send_count(),
                Err(RequestManagerError::DatabaseUnavailable)
            ));
        }
    }
}
