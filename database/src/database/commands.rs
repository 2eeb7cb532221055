use crate::model::statement::{Statement, StatementResult};

use super::table::table::ApplyErrors;

/// Database commands are how we interact with the database, they are how we ask the database to run a transaction or shutdown
///
/// The majority of interactions happen via statements (e.g. add, update, remove, etc), controls are used to manage
/// the database thread itself.
#[derive(Debug)]
pub enum DatabaseCommand {
    /// Sends a set of statements to the database and returns the results
    Transaction(Vec<Statement>),

    /// Commands that control the database
    Control(Control),
}

impl DatabaseCommand {
    /// Prints complex logs in a more readable format
    pub fn log_format(&self) -> String {
        match self {
            DatabaseCommand::Transaction(statements) => {
                if statements.len() > 1 {
                    format!("{:#?}", self)
                } else {
                    format!("{:?}", self)
                }
            }
            _ => format!("{:?}", self),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum DatabaseCommandTransactionResponse {
    /// Transaction has successfully committed, returns a list of statement results
    Commit(Vec<StatementResult>),
    /// Transaction has been rolled back, returns the error that caused the rollback
    Rollback(ApplyErrors),
    /// The statements applied but the transaction log could not be written, nothing was kept
    LogFailure(String),
}

impl DatabaseCommandTransactionResponse {
    /// Used to help with testing, creates a new committed result
    pub fn new_committed_single_result(result: StatementResult) -> Self {
        DatabaseCommandTransactionResponse::Commit(vec![result])
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum DatabaseCommandControlResponse {
    /// Successfully performed the control
    Success(String),
    /// Command has failed, returns a message for why it failed
    Error(String),
}

#[derive(Clone, Debug, PartialEq)]
pub enum DatabaseCommandResponse {
    DatabaseCommandTransactionResponse(DatabaseCommandTransactionResponse),
    DatabaseCommandControlResponse(DatabaseCommandControlResponse),
}

impl DatabaseCommandResponse {
    pub fn control_success(message: &str) -> Self {
        DatabaseCommandResponse::DatabaseCommandControlResponse(
            DatabaseCommandControlResponse::Success(message.to_string()),
        )
    }

    pub fn control_error(message: &str) -> Self {
        DatabaseCommandResponse::DatabaseCommandControlResponse(
            DatabaseCommandControlResponse::Error(message.to_string()),
        )
    }
}

#[derive(Debug)]
pub enum Control {
    /// Performs a safe shutdown of the database, requests before the shutdown will be run / committed, requests after the shutdown will be ignored
    Shutdown,
}

pub struct DatabaseCommandRequest {
    pub resolver: oneshot::Sender<DatabaseCommandResponse>,
    pub command: DatabaseCommand,
}
