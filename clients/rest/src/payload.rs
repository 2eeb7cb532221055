use people_store::{consts::consts::PersonId, model::person::Person};
use serde::Deserialize;

use crate::errors::{ApiError, FieldError};

/// Incoming person body. Every field is optional here so missing fields become validation errors
/// instead of deserialization errors
#[derive(Deserialize, Debug, Default)]
pub struct PersonPayload {
    pub id: Option<u64>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl PersonPayload {
    pub fn has_id(&self) -> bool {
        self.id.is_some()
    }

    /// Checks the required fields and builds the person, collecting every failing field
    pub fn into_person(self) -> Result<Person, ApiError> {
        let mut field_errors = vec![];

        let first_name = required(self.first_name, "first_name", &mut field_errors);
        let last_name = required(self.last_name, "last_name", &mut field_errors);

        match (first_name, last_name) {
            (Some(first_name), Some(last_name)) if field_errors.is_empty() => {
                let person = Person::new(first_name, last_name);

                Ok(match self.id {
                    Some(id) => person.with_id(PersonId(id)),
                    None => person,
                })
            }
            _ => Err(ApiError::Validation(field_errors)),
        }
    }
}

fn required(
    value: Option<String>,
    field: &'static str,
    field_errors: &mut Vec<FieldError>,
) -> Option<String> {
    match value {
        None => {
            field_errors.push(FieldError::not_null(field));
            None
        }
        Some(value) if value.trim().is_empty() => {
            field_errors.push(FieldError::not_blank(field));
            None
        }
        Some(value) => Some(value),
    }
}
