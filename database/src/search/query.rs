use strum::EnumString;
use thiserror::Error;

use crate::consts::consts::PersonId;

use super::index::PersonDocument;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error("Unknown search field: {0}")]
    UnknownField(String),

    #[error("Search on id expects a number, got: {0}")]
    InvalidId(String),

    #[error("Dangling operator: {0}")]
    DanglingOperator(&'static str),

    #[error("Unterminated quote in search query")]
    UnterminatedQuote,
}

#[derive(Clone, Copy, Debug, PartialEq, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum QueryField {
    Id,
    FirstName,
    LastName,
}

#[derive(Clone, Debug, PartialEq)]
enum Matcher {
    /// `*`, or `field:*`
    Any,
    Id(PersonId),
    /// Every token must be present, the last one may be a prefix (`jo*`)
    Text {
        tokens: Vec<String>,
        prefix_last: bool,
    },
}

#[derive(Clone, Debug, PartialEq)]
struct Clause {
    /// None searches every field
    field: Option<QueryField>,
    matcher: Matcher,
}

impl Clause {
    fn parse(token: &str) -> Result<Self, QueryError> {
        let field_split = token
            .split_once(':')
            .filter(|(field, _)| !field.starts_with('"'));

        let (field, value) = match field_split {
            Some((field, value)) => {
                let field = field
                    .parse::<QueryField>()
                    .map_err(|_| QueryError::UnknownField(field.to_string()))?;

                (Some(field), value)
            }
            None => (None, token),
        };

        // Only a bare `id:` or `id:*` matches every id, anything else must be a number
        if field == Some(QueryField::Id) {
            let matcher = match value {
                "" | "*" => Matcher::Any,
                _ => Matcher::Id(PersonId(
                    value
                        .trim_matches('"')
                        .parse::<u64>()
                        .map_err(|_| QueryError::InvalidId(value.to_string()))?,
                )),
            };

            return Ok(Clause { field, matcher });
        }

        let value = value.trim_matches('"');

        let (value, prefix_last) = match value.strip_suffix('*') {
            Some(value) => (value, true),
            None => (value, false),
        };

        let tokens = tokenize(value);

        let matcher = match tokens.is_empty() {
            true => Matcher::Any,
            false => Matcher::Text {
                tokens,
                prefix_last,
            },
        };

        Ok(Clause { field, matcher })
    }

    fn matches(&self, document: &PersonDocument) -> bool {
        let text_matches = |field_tokens: &[String]| match &self.matcher {
            Matcher::Any => true,
            Matcher::Id(_) => false,
            Matcher::Text {
                tokens,
                prefix_last,
            } => contains_tokens(field_tokens, tokens, *prefix_last),
        };

        match self.field {
            Some(QueryField::Id) => match &self.matcher {
                Matcher::Any => true,
                Matcher::Id(id) => document.id() == Some(*id),
                Matcher::Text { .. } => false,
            },
            Some(QueryField::FirstName) => text_matches(document.first_name_tokens.as_slice()),
            Some(QueryField::LastName) => text_matches(document.last_name_tokens.as_slice()),
            None => {
                text_matches(document.first_name_tokens.as_slice())
                    || text_matches(document.last_name_tokens.as_slice())
                    || text_matches(document.id_tokens().as_slice())
            }
        }
    }
}

fn contains_tokens(field_tokens: &[String], tokens: &[String], prefix_last: bool) -> bool {
    tokens.iter().enumerate().all(|(position, token)| {
        let is_prefix = prefix_last && position + 1 == tokens.len();

        field_tokens.iter().any(|field_token| match is_prefix {
            true => field_token.starts_with(token.as_str()),
            false => field_token == token,
        })
    })
}

/// Splits on whitespace outside double quotes, `first_name:"jean luc"` stays one term
fn split_terms(query: &str) -> Result<Vec<&str>, QueryError> {
    let mut terms = vec![];
    let mut start: Option<usize> = None;
    let mut in_quotes = false;

    for (position, c) in query.char_indices() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                start.get_or_insert(position);
            }
            c if c.is_whitespace() && !in_quotes => {
                if let Some(term_start) = start.take() {
                    terms.push(&query[term_start..position]);
                }
            }
            _ => {
                start.get_or_insert(position);
            }
        }
    }

    if in_quotes {
        return Err(QueryError::UnterminatedQuote);
    }

    if let Some(term_start) = start {
        terms.push(&query[term_start..]);
    }

    Ok(terms)
}

/// Lowercased alphanumeric runs, e.g. "Jean-Luc" -> ["jean", "luc"]
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_lowercase())
        .collect()
}

/// Parsed query string. Whitespace separated clauses are OR-ed, `AND` joins its neighbours,
/// an empty query or `*` matches everything. A quoted value may hold spaces, every word in it must match
#[derive(Clone, Debug, PartialEq)]
pub struct PersonQuery {
    /// Disjunction of conjunctions
    groups: Vec<Vec<Clause>>,
}

impl PersonQuery {
    pub fn match_all() -> Self {
        Self { groups: vec![] }
    }

    #[tracing::instrument]
    pub fn parse(query: &str) -> Result<Self, QueryError> {
        let mut groups: Vec<Vec<Clause>> = vec![];
        let mut join_next = false;

        for token in split_terms(query)? {
            match token {
                "AND" | "&&" => {
                    if groups.is_empty() || join_next {
                        return Err(QueryError::DanglingOperator("AND"));
                    }

                    join_next = true;
                }
                // Default operator, nothing to do
                "OR" | "||" => {
                    if groups.is_empty() || join_next {
                        return Err(QueryError::DanglingOperator("OR"));
                    }
                }
                _ => {
                    let clause = Clause::parse(token)?;

                    match (join_next, groups.last_mut()) {
                        (true, Some(group)) => group.push(clause),
                        _ => groups.push(vec![clause]),
                    }

                    join_next = false;
                }
            }
        }

        if join_next {
            return Err(QueryError::DanglingOperator("AND"));
        }

        Ok(Self { groups })
    }

    pub fn matches(&self, document: &PersonDocument) -> bool {
        if self.groups.is_empty() {
            return true;
        }

        self.groups
            .iter()
            .any(|group| group.iter().all(|clause| clause.matches(document)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::person::Person;

    fn document(id: u64, first_name: &str, last_name: &str) -> PersonDocument {
        PersonDocument::from_person(
            Person::new(first_name.to_string(), last_name.to_string()).with_id(PersonId(id)),
        )
    }

    fn matches(query: &str, document: &PersonDocument) -> bool {
        PersonQuery::parse(query)
            .expect("query should parse")
            .matches(document)
    }

    mod parse {
        use super::*;

        #[test]
        fn empty_query_matches_everything() {
            assert_eq!(PersonQuery::parse("   "), Ok(PersonQuery::match_all()));
        }

        #[test]
        fn rejects_unknown_field() {
            assert_eq!(
                PersonQuery::parse("email:someone"),
                Err(QueryError::UnknownField("email".to_string()))
            );
        }

        #[test]
        fn rejects_non_numeric_id() {
            assert_eq!(
                PersonQuery::parse("id:abc"),
                Err(QueryError::InvalidId("abc".to_string()))
            );
        }

        #[test]
        fn rejects_symbol_id() {
            for query in ["id:!!", "id:-", "id:\"\"", "id:1-2"] {
                assert!(
                    matches!(PersonQuery::parse(query), Err(QueryError::InvalidId(_))),
                    "{} should be rejected",
                    query
                );
            }
        }

        #[test]
        fn quoted_value_is_one_clause() {
            assert_eq!(
                split_terms("first_name:\"Jean Luc\" OR picard"),
                Ok(vec!["first_name:\"Jean Luc\"", "OR", "picard"])
            );
        }

        #[test]
        fn rejects_unterminated_quote() {
            assert_eq!(
                PersonQuery::parse("first_name:\"Jean Luc"),
                Err(QueryError::UnterminatedQuote)
            );
        }

        #[test]
        fn id_wildcard_matches_everything() {
            assert!(PersonQuery::parse("id:*").is_ok());
            assert!(PersonQuery::parse("id:").is_ok());
        }

        #[test]
        fn rejects_dangling_and() {
            assert_eq!(
                PersonQuery::parse("first_name:a AND"),
                Err(QueryError::DanglingOperator("AND"))
            );
            assert_eq!(
                PersonQuery::parse("AND first_name:a"),
                Err(QueryError::DanglingOperator("AND"))
            );
        }
    }

    mod matching {
        use super::*;

        #[test]
        fn by_id() {
            let person = document(5, "Jean-Luc", "Picard");

            assert!(matches("id:5", &person));
            assert!(!matches("id:50", &person));
        }

        #[test]
        fn by_field_is_case_insensitive() {
            let person = document(5, "Jean-Luc", "Picard");

            assert!(matches("last_name:PICARD", &person));
            assert!(matches("first_name:luc", &person));
            assert!(!matches("first_name:picard", &person));
        }

        #[test]
        fn bare_term_searches_every_field() {
            let person = document(5, "Jean-Luc", "Picard");

            assert!(matches("picard", &person));
            assert!(matches("5", &person));
            assert!(!matches("riker", &person));
        }

        #[test]
        fn prefix() {
            let person = document(5, "Jean-Luc", "Picard");

            assert!(matches("last_name:pic*", &person));
            assert!(!matches("last_name:rik*", &person));
        }

        #[test]
        fn whole_tokens_only() {
            let person = document(5, "Jean-Luc", "Picard");

            assert!(!matches("last_name:pic", &person));
        }

        #[test]
        fn quoted_value_needs_every_word() {
            let person = document(5, "Jean-Luc", "Picard");

            assert!(matches("first_name:\"Jean Luc\"", &person));
            assert!(!matches("first_name:\"Jean Picard\"", &person));
            assert!(!matches("first_name:\"Luc Riker\"", &person));
        }

        #[test]
        fn terms_are_or_by_default() {
            let person = document(5, "Jean-Luc", "Picard");

            assert!(matches("riker picard", &person));
            assert!(matches("riker OR picard", &person));
        }

        #[test]
        fn and_joins_terms() {
            let person = document(5, "Jean-Luc", "Picard");

            assert!(matches("first_name:jean AND last_name:picard", &person));
            assert!(!matches("first_name:jean AND last_name:riker", &person));
            assert!(matches("riker OR first_name:jean AND id:5", &person));
        }

        #[test]
        fn wildcard_matches_everything() {
            assert!(matches("*", &document(1, "A", "B")));
            assert!(matches("first_name:*", &document(1, "A", "B")));
        }
    }
}
