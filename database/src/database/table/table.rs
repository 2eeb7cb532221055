use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    consts::consts::{PersonId, FIRST_PERSON_ID},
    model::{
        person::Person,
        statement::{Statement, StatementResult},
    },
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApplyErrors {
    // CRUD - CREATE
    #[error("Cannot create, a new person cannot already have an id: {0}")]
    CannotCreateWithId(PersonId),

    // Constraints
    #[error("Cannot set field to null or empty: {0}")]
    NotNullConstraintViolation(&'static str),
}

/// Row level change that is written to the transaction log, replaying these rebuilds the table
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum Mutation {
    Put(Person),
    Delete(PersonId),
}

/// A mutation plus what the row looked like before it, enough to revert it on rollback
#[derive(Clone, Debug)]
pub struct Change {
    pub mutation: Mutation,
    pub previous: Option<Person>,
}

#[derive(Debug)]
pub struct Applied {
    pub result: StatementResult,
    pub change: Option<Change>,
}

impl Applied {
    fn query(result: StatementResult) -> Self {
        Self {
            result,
            change: None,
        }
    }
}

pub struct PersonTable {
    pub person_rows: BTreeMap<PersonId, Person>,
    next_id: PersonId,
}

impl Default for PersonTable {
    fn default() -> Self {
        Self::new()
    }
}

impl PersonTable {
    pub fn new() -> Self {
        Self {
            person_rows: BTreeMap::new(),
            next_id: FIRST_PERSON_ID,
        }
    }

    pub fn len(&self) -> usize {
        self.person_rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.person_rows.is_empty()
    }

    // Each mutation statement can be broken up into 3 steps
    //  - Verifying validity / constraints (not null, id rules)
    //  - Building the row change
    //  - Applying the change
    pub fn apply(&mut self, statement: Statement) -> Result<Applied, ApplyErrors> {
        let applied = match statement {
            Statement::Add(person) => {
                if let Some(id) = person.id {
                    return Err(ApplyErrors::CannotCreateWithId(id));
                }

                let created = self.insert_new(person)?;

                Applied {
                    result: StatementResult::Created(created.0),
                    change: Some(created.1),
                }
            }
            Statement::Update(person) => {
                // No id, or an id that was never handed out, means a new row under a fresh id
                let Some((id, previous)) = person
                    .id
                    .and_then(|id| self.person_rows.get(&id).cloned().map(|row| (id, row)))
                else {
                    let created = self.insert_new(Person { id: None, ..person })?;

                    return Ok(Applied {
                        result: StatementResult::Created(created.0),
                        change: Some(created.1),
                    });
                };

                verify_not_null(&person)?;

                let mutation = Mutation::Put(person.clone());
                self.apply_mutation(&mutation);

                Applied {
                    result: StatementResult::Updated(person),
                    change: Some(Change {
                        mutation,
                        previous: Some(previous),
                    }),
                }
            }
            Statement::Remove(id) => match self.person_rows.get(&id).cloned() {
                Some(previous) => {
                    let mutation = Mutation::Delete(id);
                    self.apply_mutation(&mutation);

                    Applied {
                        result: StatementResult::Removed(Some(previous.clone())),
                        change: Some(Change {
                            mutation,
                            previous: Some(previous),
                        }),
                    }
                }
                // Deletes are idempotent
                None => Applied::query(StatementResult::Removed(None)),
            },
            Statement::Get(id) => {
                Applied::query(StatementResult::GetSingle(self.person_rows.get(&id).cloned()))
            }
            Statement::List(pageable) => {
                let people: Vec<Person> = self.person_rows.values().cloned().collect();

                Applied::query(StatementResult::List(pageable.paginate(people)))
            }
            Statement::Count => Applied::query(StatementResult::Count(self.person_rows.len())),
        };

        Ok(applied)
    }

    /// Applies a row level change, used by `apply` and when replaying the transaction log
    pub fn apply_mutation(&mut self, mutation: &Mutation) {
        match mutation {
            Mutation::Put(person) => {
                if let Some(id) = person.id {
                    // Replayed rows must never be handed out again by the sequence
                    if id >= self.next_id {
                        self.next_id = id.next();
                    }

                    self.person_rows.insert(id, person.clone());
                }
            }
            Mutation::Delete(id) => {
                self.person_rows.remove(id);
            }
        }
    }

    /// Reverts a change made by `apply`. The id sequence is not rewound, like a database sequence ids can have gaps
    pub fn apply_rollback(&mut self, change: Change) {
        let id = match &change.mutation {
            Mutation::Put(person) => person.id,
            Mutation::Delete(id) => Some(*id),
        };

        let Some(id) = id else {
            return;
        };

        match change.previous {
            Some(previous) => {
                self.person_rows.insert(id, previous);
            }
            None => {
                self.person_rows.remove(&id);
            }
        }
    }

    fn insert_new(&mut self, person: Person) -> Result<(Person, Change), ApplyErrors> {
        verify_not_null(&person)?;

        let id = self.next_id;
        let created = person.with_id(id);
        let mutation = Mutation::Put(created.clone());

        self.apply_mutation(&mutation);

        Ok((
            created,
            Change {
                mutation,
                previous: None,
            },
        ))
    }
}

fn verify_not_null(person: &Person) -> Result<(), ApplyErrors> {
    if person.first_name.trim().is_empty() {
        return Err(ApplyErrors::NotNullConstraintViolation("first_name"));
    }

    if person.last_name.trim().is_empty() {
        return Err(ApplyErrors::NotNullConstraintViolation("last_name"));
    }

    Ok(())
}
