use std::sync::{Arc, Mutex, MutexGuard};

use people_store::{
    consts::consts::PersonId,
    database::request_manager::RequestManager,
    model::{person::Person, statement::Upsert},
    search::index::PersonSearchIndex,
};

use crate::errors::ApiError;

/// Search index kept in step with the primary store.
///
/// Every store write and the index write that follows it happen under one lock, so the index sees
/// writes in commit order and a delete can't be overtaken by the save of the row it removed. A failed
/// index write is logged and otherwise ignored, the store stays the source of truth.
pub struct MirroredIndex {
    index: Arc<dyn PersonSearchIndex>,
    write_lock: Mutex<()>,
}

impl MirroredIndex {
    pub fn new(index: Arc<dyn PersonSearchIndex>) -> Self {
        Self {
            index,
            write_lock: Mutex::new(()),
        }
    }

    pub fn index(&self) -> &dyn PersonSearchIndex {
        self.index.as_ref()
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>, ApiError> {
        self.write_lock
            .lock()
            .map_err(|_| ApiError::Internal("Search index write lock was poisoned".to_string()))
    }

    pub fn create(
        &self,
        request_manager: &RequestManager,
        person: Person,
    ) -> Result<Person, ApiError> {
        let _guard = self.lock()?;

        let created = request_manager.send_add(person)?;

        self.save(&created);

        Ok(created)
    }

    pub fn update(
        &self,
        request_manager: &RequestManager,
        person: Person,
    ) -> Result<Upsert, ApiError> {
        let _guard = self.lock()?;

        let upsert = request_manager.send_update(person)?;

        self.save(upsert.person());

        Ok(upsert)
    }

    pub fn remove(
        &self,
        request_manager: &RequestManager,
        id: PersonId,
    ) -> Result<Option<Person>, ApiError> {
        let _guard = self.lock()?;

        let removed = request_manager.send_remove(id)?;

        if let Err(err) = self.index.delete(id) {
            log::warn!(
                "Search index out of sync, unable to remove person {}: {}",
                id,
                err
            );
        }

        Ok(removed)
    }

    fn save(&self, person: &Person) {
        if let Err(err) = self.index.save(person) {
            log::warn!(
                "Search index out of sync, unable to index person {:?}: {}",
                person.id,
                err
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use people_store::{database::database::Database, search::index::InMemorySearchIndex};
    use std::thread;

    #[test]
    fn concurrent_creates_and_deletes_leave_index_matching_store() {
        // Given many threads racing creates against deletes of the same rows
        let request_manager = Database::new_test()
            .run()
            .expect("Should be able to start the database");
        let index = Arc::new(InMemorySearchIndex::new());
        let mirror = Arc::new(MirroredIndex::new(index.clone()));

        let creators: Vec<_> = (0..4)
            .map(|thread_id| {
                let mirror = mirror.clone();
                let request_manager = request_manager.clone();

                thread::spawn(move || {
                    for row in 0..25 {
                        mirror
                            .create(
                                &request_manager,
                                Person::new(format!("First {}", thread_id), format!("Last {}", row)),
                            )
                            .expect("create should succeed");
                    }
                })
            })
            .collect();

        let deleters: Vec<_> = (0..2)
            .map(|_| {
                let mirror = mirror.clone();
                let request_manager = request_manager.clone();

                thread::spawn(move || {
                    for id in 1..=100 {
                        mirror
                            .remove(&request_manager, PersonId(id))
                            .expect("remove should succeed");
                    }
                })
            })
            .collect();

        for handle in creators.into_iter().chain(deleters) {
            handle.join().expect("worker thread should not panic");
        }

        // Then every indexed document is a stored row and every stored row is indexed
        let stored = request_manager
            .send_list(people_store::database::table::page::Pageable::unpaged())
            .expect("Should not timeout");

        assert_eq!(index.count().expect("count"), stored.total);

        for person in &stored.content {
            let id = person.id.expect("stored person has an id");

            assert!(index.exists(id).expect("exists"), "{} should be indexed", id);
        }
    }

    #[test]
    fn update_of_unknown_id_indexes_the_created_row() {
        let request_manager = Database::new_test()
            .run()
            .expect("Should be able to start the database");
        let index = Arc::new(InMemorySearchIndex::new());
        let mirror = MirroredIndex::new(index.clone());

        let upsert = mirror
            .update(&request_manager, Person::new_test().with_id(PersonId(9)))
            .expect("update should succeed");

        let Upsert::Created(created) = upsert else {
            panic!("Expected the update to create");
        };

        let id = created.id.expect("created person has an id");

        assert!(index.exists(id).expect("exists"));
        assert!(!index.exists(PersonId(9)).expect("exists"));
    }
}
