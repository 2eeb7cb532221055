use serde::{Deserialize, Serialize};

use crate::consts::consts::PersonId;

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Person {
    pub id: Option<PersonId>,
    pub first_name: String,
    pub last_name: String,
}

impl Person {
    /// A person that has not been stored yet, the store assigns the id
    pub fn new(first_name: String, last_name: String) -> Self {
        Person {
            id: None,
            first_name,
            last_name,
        }
    }

    pub fn new_test() -> Self {
        Person {
            id: None,
            first_name: "AAAAAAAAAA".to_string(),
            last_name: "AAAAAAAAAA".to_string(),
        }
    }

    pub fn with_id(mut self, id: PersonId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_first_name(mut self, first_name: impl Into<String>) -> Self {
        self.first_name = first_name.into();
        self
    }

    pub fn with_last_name(mut self, last_name: impl Into<String>) -> Self {
        self.last_name = last_name.into();
        self
    }

    pub fn id(&self) -> Option<PersonId> {
        self.id
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    /// Field by field comparison, used to check a copy (e.g. a search document) mirrors the stored row
    pub fn same_fields(&self, other: &Person) -> bool {
        self.id == other.id && self.first_name == other.first_name && self.last_name == other.last_name
    }
}

/// Identity equality: an unsaved person is not equal to anything, not even itself
impl PartialEq for Person {
    fn eq(&self, other: &Self) -> bool {
        match (self.id, other.id) {
            (Some(id), Some(other_id)) => id == other_id,
            _ => false,
        }
    }
}
