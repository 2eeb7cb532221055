use serde::{Deserialize, Serialize};
use std::fmt::Display;

// New Type Pattern -- https://doc.rust-lang.org/rust-by-example/generics/new_types.html
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, PartialOrd)]
pub struct TransactionId(pub usize);

impl TransactionId {
    pub fn new_first_transaction() -> TransactionId {
        TransactionId(0)
    }

    pub fn to_number(&self) -> usize {
        self.0
    }

    pub fn increment(&self) -> TransactionId {
        TransactionId(self.0 + 1)
    }
}

impl Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Primary key of a person row, assigned by the store when the row is created
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct PersonId(pub u64);

impl PersonId {
    pub fn to_number(self) -> u64 {
        self.0
    }

    pub fn next(&self) -> PersonId {
        PersonId(self.0 + 1)
    }
}

impl Display for PersonId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Values
pub const FIRST_PERSON_ID: PersonId = PersonId(1);
pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 2000;
