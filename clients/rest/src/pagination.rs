use people_store::{
    consts::consts::DEFAULT_PAGE_SIZE,
    database::table::page::{Pageable, SortOrder},
};

use crate::errors::ApiError;

/// Builds a page request from `page`, `size` and repeated `sort=field,direction` parameters,
/// other parameters are ignored
pub fn pageable_from_query(params: &[(String, String)]) -> Result<Pageable, ApiError> {
    let mut page = 0;
    let mut size = DEFAULT_PAGE_SIZE;
    let mut sort = vec![];

    for (key, value) in params {
        match key.as_str() {
            "page" => {
                page = value
                    .parse::<usize>()
                    .map_err(|_| ApiError::InvalidParameter(format!("page={}", value)))?;
            }
            "size" => {
                size = value
                    .parse::<usize>()
                    .map_err(|_| ApiError::InvalidParameter(format!("size={}", value)))?;
            }
            "sort" => sort.push(SortOrder::parse(value)?),
            _ => {}
        }
    }

    let pageable = sort
        .into_iter()
        .fold(Pageable::new(page, size)?, Pageable::with_sort);

    Ok(pageable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use people_store::database::table::page::{Direction, SortField};

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn defaults_when_nothing_is_given() {
        let pageable = pageable_from_query(&[]).expect("should parse");

        assert_eq!(pageable, Pageable::default());
    }

    #[test]
    fn reads_page_size_and_every_sort() {
        let pageable = pageable_from_query(&params(&[
            ("page", "2"),
            ("size", "5"),
            ("sort", "last_name,desc"),
            ("sort", "id"),
            ("query", "ignored"),
        ]))
        .expect("should parse");

        assert_eq!(pageable.page, 2);
        assert_eq!(pageable.size, 5);
        assert_eq!(
            pageable.sort,
            vec![
                SortOrder::new(SortField::LastName, Direction::Desc),
                SortOrder::new(SortField::Id, Direction::Asc),
            ]
        );
    }

    #[test]
    fn rejects_non_numeric_page() {
        let result = pageable_from_query(&params(&[("page", "first")]));

        assert!(matches!(result, Err(ApiError::InvalidParameter(_))));
    }

    #[test]
    fn rejects_oversized_page() {
        let result = pageable_from_query(&params(&[("size", "100000")]));

        assert!(matches!(result, Err(ApiError::InvalidParameter(_))));
    }

    #[test]
    fn rejects_unknown_sort_field() {
        let result = pageable_from_query(&params(&[("sort", "email,asc")]));

        assert!(matches!(result, Err(ApiError::InvalidParameter(_))));
    }
}
