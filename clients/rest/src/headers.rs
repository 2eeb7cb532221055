use actix_web::{http::header, HttpResponseBuilder};
use people_store::database::table::page::Page;

const APPLICATION_NAME: &str = "peopleApp";
pub const ENTITY_NAME: &str = "person";

pub const TOTAL_COUNT_HEADER: &str = "X-Total-Count";

fn alert(response: &mut HttpResponseBuilder, message: String, param: String) {
    response
        .insert_header((format!("X-{}-alert", APPLICATION_NAME), message))
        .insert_header((format!("X-{}-params", APPLICATION_NAME), param));
}

pub fn entity_creation_alert(response: &mut HttpResponseBuilder, id: &str) {
    alert(
        response,
        format!("{}.{}.created", APPLICATION_NAME, ENTITY_NAME),
        id.to_string(),
    );
}

pub fn entity_update_alert(response: &mut HttpResponseBuilder, id: &str) {
    alert(
        response,
        format!("{}.{}.updated", APPLICATION_NAME, ENTITY_NAME),
        id.to_string(),
    );
}

pub fn entity_deletion_alert(response: &mut HttpResponseBuilder, id: &str) {
    alert(
        response,
        format!("{}.{}.deleted", APPLICATION_NAME, ENTITY_NAME),
        id.to_string(),
    );
}

pub fn failure_alert(response: &mut HttpResponseBuilder, error_key: &str) {
    response
        .insert_header((format!("X-{}-error", APPLICATION_NAME), error_key.to_string()))
        .insert_header((
            format!("X-{}-params", APPLICATION_NAME),
            ENTITY_NAME.to_string(),
        ));
}

/// Adds `X-Total-Count` and an RFC 5988 `Link` header (next, prev, last, first)
///
/// `base_url` may already carry query parameters, e.g. the search query
pub fn pagination<T>(response: &mut HttpResponseBuilder, page: &Page<T>, base_url: &str) {
    let separator = match base_url.contains('?') {
        true => '&',
        false => '?',
    };

    let link = |page_number: usize, rel: &str| {
        format!(
            "<{}{}page={}&size={}>; rel=\"{}\"",
            base_url, separator, page_number, page.size, rel
        )
    };

    let last_page = page.total_pages().saturating_sub(1);

    let mut links = vec![];

    if page.has_next() {
        links.push(link(page.page + 1, "next"));
    }

    if page.has_previous() {
        links.push(link(page.page - 1, "prev"));
    }

    links.push(link(last_page, "last"));
    links.push(link(0, "first"));

    response
        .insert_header((TOTAL_COUNT_HEADER, page.total.to_string()))
        .insert_header((header::LINK, links.join(",")));
}
