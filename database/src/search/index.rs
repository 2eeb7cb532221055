use std::{
    collections::BTreeMap,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use thiserror::Error;

use crate::{
    consts::consts::PersonId,
    database::table::page::{Page, Pageable},
    model::person::Person,
};

use super::query::{tokenize, PersonQuery};

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Search index lock was poisoned by a panicking writer")]
    Poisoned,

    #[error("Only stored people can be indexed, person has no id")]
    MissingId,

    #[error("Search index unavailable: {0}")]
    Unavailable(String),
}

/// Indexed form of a person, the analysed tokens are computed once when the document is saved
#[derive(Clone, Debug)]
pub struct PersonDocument {
    person: Person,
    pub first_name_tokens: Vec<String>,
    pub last_name_tokens: Vec<String>,
}

impl PersonDocument {
    pub fn from_person(person: Person) -> Self {
        Self {
            first_name_tokens: tokenize(&person.first_name),
            last_name_tokens: tokenize(&person.last_name),
            person,
        }
    }

    pub fn id(&self) -> Option<PersonId> {
        self.person.id
    }

    pub fn id_tokens(&self) -> Vec<String> {
        self.person
            .id
            .map(|id| vec![id.to_string()])
            .unwrap_or_default()
    }

    pub fn person(&self) -> &Person {
        &self.person
    }
}

/// Secondary, query optimised mirror of the primary store. Nothing here is transactional with the
/// primary store: callers write the store first and the index second, a failed index write leaves the two diverged
pub trait PersonSearchIndex: Send + Sync {
    /// Indexes the person, replacing any document with the same id
    fn save(&self, person: &Person) -> Result<(), IndexError>;

    /// Removes the document, no-op when it is not indexed
    fn delete(&self, id: PersonId) -> Result<(), IndexError>;

    fn exists(&self, id: PersonId) -> Result<bool, IndexError>;

    fn find_one(&self, id: PersonId) -> Result<Option<Person>, IndexError>;

    fn search(&self, query: &PersonQuery, pageable: &Pageable)
        -> Result<Page<Person>, IndexError>;

    /// Clears the whole index
    fn delete_all(&self) -> Result<(), IndexError>;

    fn count(&self) -> Result<usize, IndexError>;

    fn save_all(&self, people: &[Person]) -> Result<usize, IndexError> {
        for person in people {
            self.save(person)?;
        }

        Ok(people.len())
    }
}

#[derive(Default)]
pub struct InMemorySearchIndex {
    documents: RwLock<BTreeMap<PersonId, PersonDocument>>,
}

impl InMemorySearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<PersonId, PersonDocument>>, IndexError> {
        self.documents.read().map_err(|_| IndexError::Poisoned)
    }

    fn write(
        &self,
    ) -> Result<RwLockWriteGuard<'_, BTreeMap<PersonId, PersonDocument>>, IndexError> {
        self.documents.write().map_err(|_| IndexError::Poisoned)
    }
}

impl PersonSearchIndex for InMemorySearchIndex {
    fn save(&self, person: &Person) -> Result<(), IndexError> {
        let id = person.id.ok_or(IndexError::MissingId)?;

        self.write()?
            .insert(id, PersonDocument::from_person(person.clone()));

        Ok(())
    }

    fn delete(&self, id: PersonId) -> Result<(), IndexError> {
        self.write()?.remove(&id);

        Ok(())
    }

    fn exists(&self, id: PersonId) -> Result<bool, IndexError> {
        Ok(self.read()?.contains_key(&id))
    }

    fn find_one(&self, id: PersonId) -> Result<Option<Person>, IndexError> {
        Ok(self
            .read()?
            .get(&id)
            .map(|document| document.person().clone()))
    }

    #[tracing::instrument(skip(self))]
    fn search(
        &self,
        query: &PersonQuery,
        pageable: &Pageable,
    ) -> Result<Page<Person>, IndexError> {
        let matches: Vec<Person> = self
            .read()?
            .values()
            .filter(|document| query.matches(document))
            .map(|document| document.person().clone())
            .collect();

        Ok(pageable.paginate(matches))
    }

    fn delete_all(&self) -> Result<(), IndexError> {
        self.write()?.clear();

        Ok(())
    }

    fn count(&self) -> Result<usize, IndexError> {
        Ok(self.read()?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(id: u64, first_name: &str, last_name: &str) -> Person {
        Person::new(first_name.to_string(), last_name.to_string()).with_id(PersonId(id))
    }

    #[test]
    fn save_then_find_one() {
        let index = InMemorySearchIndex::new();
        let person = stored(1, "First", "Person");

        index.save(&person).expect("save should succeed");

        let found = index
            .find_one(PersonId(1))
            .expect("find should succeed")
            .expect("document should exist");

        assert!(found.same_fields(&person));
    }

    #[test]
    fn save_replaces_existing_document() {
        let index = InMemorySearchIndex::new();

        index.save(&stored(1, "First", "Person")).expect("save");
        index.save(&stored(1, "Updated", "Person")).expect("save");

        assert_eq!(index.count().expect("count"), 1);
        assert_eq!(
            index
                .find_one(PersonId(1))
                .expect("find")
                .map(|person| person.first_name),
            Some("Updated".to_string())
        );
    }

    #[test]
    fn unsaved_person_cannot_be_indexed() {
        let index = InMemorySearchIndex::new();

        let result = index.save(&Person::new_test());

        assert!(matches!(result, Err(IndexError::MissingId)));
    }

    #[test]
    fn delete_is_a_no_op_when_absent() {
        let index = InMemorySearchIndex::new();

        index.delete(PersonId(1)).expect("delete should succeed");

        assert!(!index.exists(PersonId(1)).expect("exists"));
    }

    #[test]
    fn delete_removes_document() {
        let index = InMemorySearchIndex::new();
        index.save(&stored(1, "First", "Person")).expect("save");

        index.delete(PersonId(1)).expect("delete should succeed");

        assert!(!index.exists(PersonId(1)).expect("exists"));
    }

    #[test]
    fn search_by_id_returns_exactly_one() {
        let index = InMemorySearchIndex::new();
        index
            .save_all(&[
                stored(1, "First", "Person"),
                stored(2, "Second", "Person"),
                stored(11, "Eleventh", "Person"),
            ])
            .expect("save all");

        let query = PersonQuery::parse("id:1").expect("query should parse");
        let page = index
            .search(&query, &Pageable::default())
            .expect("search should succeed");

        assert_eq!(page.total, 1);
        assert_eq!(page.content[0].id, Some(PersonId(1)));
    }

    #[test]
    fn search_pages_results() {
        let index = InMemorySearchIndex::new();
        index
            .save_all(&[
                stored(1, "First", "Person"),
                stored(2, "Second", "Person"),
                stored(3, "Third", "Person"),
            ])
            .expect("save all");

        let query = PersonQuery::parse("last_name:person").expect("query should parse");
        let page = index
            .search(&query, &Pageable::new(1, 2).expect("valid page"))
            .expect("search should succeed");

        assert_eq!(page.total, 3);
        assert_eq!(page.content.len(), 1);
        assert_eq!(page.content[0].id, Some(PersonId(3)));
    }

    #[test]
    fn delete_all_clears_index() {
        let index = InMemorySearchIndex::new();
        index
            .save_all(&[stored(1, "First", "Person"), stored(2, "Second", "Person")])
            .expect("save all");

        index.delete_all().expect("delete all should succeed");

        assert_eq!(index.count().expect("count"), 0);
    }
}
