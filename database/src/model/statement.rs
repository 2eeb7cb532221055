use serde::{Deserialize, Serialize};

use crate::{
    consts::consts::PersonId,
    database::table::page::{Page, Pageable},
};

use super::person::Person;

#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum Statement {
    /// Person must not carry an id, the table assigns one
    Add(Person),
    /// Replaces the row with the same id, falls back to an add under a fresh id when the person has no id or an unknown one
    Update(Person),
    /// Removing a person that does not exist is not an error
    Remove(PersonId),
    Get(PersonId),
    List(Pageable),
    Count,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum StatementResult {
    /// A new row was created (add, or an update without a known id)
    Created(Person),
    Updated(Person),
    /// The removed row, None when there was nothing to remove
    Removed(Option<Person>),
    GetSingle(Option<Person>),
    List(Page<Person>),
    Count(usize),
}

/// Outcome of an update, which can create a row when the person has no known id
#[derive(Clone, Debug, PartialEq)]
pub enum Upsert {
    Created(Person),
    Updated(Person),
}

impl Upsert {
    pub fn person(&self) -> &Person {
        match self {
            Upsert::Created(person) | Upsert::Updated(person) => person,
        }
    }
}
