use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use strum::EnumString;
use thiserror::Error;

use crate::{
    consts::consts::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE},
    model::person::Person,
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PageableError {
    #[error("Page size must be between 1 and 2000, got {0}")]
    InvalidSize(usize),

    #[error("Unknown sort property: {0}")]
    UnknownSortField(String),

    #[error("Unknown sort direction: {0}")]
    UnknownSortDirection(String),
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum SortField {
    Id,
    FirstName,
    LastName,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Default, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct SortOrder {
    pub field: SortField,
    pub direction: Direction,
}

impl SortOrder {
    pub fn new(field: SortField, direction: Direction) -> Self {
        Self { field, direction }
    }

    /// Parses the `field[,direction]` form used by the `sort` query parameter
    pub fn parse(value: &str) -> Result<Self, PageableError> {
        let (field, direction) = match value.split_once(',') {
            Some((field, direction)) => (field.trim(), Some(direction.trim())),
            None => (value.trim(), None),
        };

        let field = field
            .parse::<SortField>()
            .map_err(|_| PageableError::UnknownSortField(field.to_string()))?;

        let direction = match direction {
            Some(direction) => direction
                .parse::<Direction>()
                .map_err(|_| PageableError::UnknownSortDirection(direction.to_string()))?,
            None => Direction::Asc,
        };

        Ok(SortOrder { field, direction })
    }

    fn compare(&self, a: &Person, b: &Person) -> Ordering {
        let ordering = match self.field {
            SortField::Id => a.id.cmp(&b.id),
            SortField::FirstName => a.first_name.cmp(&b.first_name),
            SortField::LastName => a.last_name.cmp(&b.last_name),
        };

        match self.direction {
            Direction::Asc => ordering,
            Direction::Desc => ordering.reverse(),
        }
    }
}

/// Page request: 0 indexed page number, page size and sort orders applied in sequence
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Pageable {
    pub page: usize,
    pub size: usize,
    pub sort: Vec<SortOrder>,
}

impl Default for Pageable {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
            sort: vec![],
        }
    }
}

impl Pageable {
    pub fn new(page: usize, size: usize) -> Result<Self, PageableError> {
        if size == 0 || size > MAX_PAGE_SIZE {
            return Err(PageableError::InvalidSize(size));
        }

        Ok(Self {
            page,
            size,
            sort: vec![],
        })
    }

    /// Everything on one page, used when rebuilding the search index
    pub fn unpaged() -> Self {
        Self {
            page: 0,
            size: usize::MAX,
            sort: vec![],
        }
    }

    pub fn with_sort(mut self, sort_order: SortOrder) -> Self {
        self.sort.push(sort_order);
        self
    }

    fn offset(&self) -> usize {
        self.page.saturating_mul(self.size)
    }

    /// Sorts the people (id ascending when no order is given, and as the final tie breaker) then cuts out the requested page
    pub fn paginate(&self, mut people: Vec<Person>) -> Page<Person> {
        people.sort_by(|a, b| {
            self.sort
                .iter()
                .map(|order| order.compare(a, b))
                .find(|ordering| ordering.is_ne())
                .unwrap_or_else(|| a.id.cmp(&b.id))
        });

        let total = people.len();

        let content = people
            .into_iter()
            .skip(self.offset())
            .take(self.size)
            .collect();

        Page {
            content,
            total,
            page: self.page,
            size: self.size,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Page<T> {
    pub content: Vec<T>,
    /// Number of items across every page
    pub total: usize,
    pub page: usize,
    pub size: usize,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> usize {
        if self.size == 0 {
            return 0;
        }

        self.total.div_ceil(self.size)
    }

    pub fn has_next(&self) -> bool {
        self.page.saturating_add(1) < self.total_pages()
    }

    pub fn has_previous(&self) -> bool {
        self.page > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::consts::PersonId;

    fn people() -> Vec<Person> {
        vec![
            Person::new("Charlie".to_string(), "Alpha".to_string()).with_id(PersonId(3)),
            Person::new("Alice".to_string(), "Bravo".to_string()).with_id(PersonId(1)),
            Person::new("Bob".to_string(), "Alpha".to_string()).with_id(PersonId(2)),
        ]
    }

    fn ids(page: &Page<Person>) -> Vec<u64> {
        page.content
            .iter()
            .filter_map(|person| person.id.map(PersonId::to_number))
            .collect()
    }

    mod sort_order {
        use super::*;

        #[test]
        fn parses_field_and_direction() {
            assert_eq!(
                SortOrder::parse("first_name,desc"),
                Ok(SortOrder::new(SortField::FirstName, Direction::Desc))
            );
        }

        #[test]
        fn direction_defaults_to_ascending() {
            assert_eq!(
                SortOrder::parse("id"),
                Ok(SortOrder::new(SortField::Id, Direction::Asc))
            );
        }

        #[test]
        fn direction_is_case_insensitive() {
            assert_eq!(
                SortOrder::parse("last_name,DESC"),
                Ok(SortOrder::new(SortField::LastName, Direction::Desc))
            );
        }

        #[test]
        fn rejects_unknown_field() {
            assert_eq!(
                SortOrder::parse("email,asc"),
                Err(PageableError::UnknownSortField("email".to_string()))
            );
        }

        #[test]
        fn rejects_unknown_direction() {
            assert_eq!(
                SortOrder::parse("id,sideways"),
                Err(PageableError::UnknownSortDirection("sideways".to_string()))
            );
        }
    }

    mod paginate {
        use super::*;

        #[test]
        fn defaults_to_id_ascending() {
            let page = Pageable::default().paginate(people());

            assert_eq!(ids(&page), vec![1, 2, 3]);
            assert_eq!(page.total, 3);
        }

        #[test]
        fn sorts_descending() {
            let pageable =
                Pageable::default().with_sort(SortOrder::new(SortField::Id, Direction::Desc));

            assert_eq!(ids(&pageable.paginate(people())), vec![3, 2, 1]);
        }

        #[test]
        fn later_orders_break_ties() {
            let pageable = Pageable::default()
                .with_sort(SortOrder::new(SortField::LastName, Direction::Asc))
                .with_sort(SortOrder::new(SortField::FirstName, Direction::Desc));

            assert_eq!(ids(&pageable.paginate(people())), vec![3, 2, 1]);
        }

        #[test]
        fn cuts_out_requested_page() {
            let page = Pageable::new(1, 2)
                .expect("valid page size")
                .paginate(people());

            assert_eq!(ids(&page), vec![3]);
            assert_eq!(page.total, 3);
            assert_eq!(page.total_pages(), 2);
            assert!(!page.has_next());
            assert!(page.has_previous());
        }

        #[test]
        fn page_past_the_end_is_empty() {
            let page = Pageable::new(5, 2)
                .expect("valid page size")
                .paginate(people());

            assert!(page.content.is_empty());
            assert_eq!(page.total, 3);
        }

        #[test]
        fn last_possible_page_has_no_next() {
            let page = Pageable::new(usize::MAX, 20)
                .expect("valid page size")
                .paginate(people());

            assert!(page.content.is_empty());
            assert!(!page.has_next());
            assert!(page.has_previous());
        }

        #[test]
        fn unpaged_does_not_overflow() {
            let page = Pageable::unpaged().paginate(people());

            assert_eq!(page.content.len(), 3);
            assert_eq!(page.total_pages(), 1);
        }

        #[test]
        fn rejects_zero_size() {
            assert_eq!(Pageable::new(0, 0), Err(PageableError::InvalidSize(0)));
        }
    }
}
