use actix_web::{
    body::MessageBody,
    delete,
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    get,
    http::header,
    post, put,
    web::{self, Data},
    App, HttpResponse,
};
use people_store::{
    consts::consts::PersonId,
    database::request_manager::RequestManager,
    model::{person::Person, statement::Upsert},
    search::{index::PersonSearchIndex, query::PersonQuery},
};

use crate::{
    errors::ApiError, headers, mirror::MirroredIndex, pagination::pageable_from_query,
    payload::PersonPayload,
};

type QueryParams = web::Query<Vec<(String, String)>>;

fn id_param(person: &Person) -> String {
    person.id.map(|id| id.to_string()).unwrap_or_default()
}

fn created_response(person: &Person) -> HttpResponse {
    let id = id_param(person);

    let mut response = HttpResponse::Created();

    response.insert_header((header::LOCATION, format!("/api/people/{}", id)));
    headers::entity_creation_alert(&mut response, &id);

    response.json(person)
}

/// POST /api/people -- creates a person, the body must not carry an id
#[post("/api/people")]
async fn create_person(
    request_manager: Data<RequestManager>,
    mirror: Data<MirroredIndex>,
    payload: web::Json<PersonPayload>,
) -> Result<HttpResponse, ApiError> {
    let payload = payload.into_inner();

    log::debug!("REST request to save Person : {:?}", payload);

    if payload.has_id() {
        return Err(ApiError::IdExists);
    }

    let person = payload.into_person()?;

    let request_manager = request_manager.into_inner();
    let mirror = mirror.into_inner();
    let created = web::block(move || mirror.create(&request_manager, person)).await??;

    Ok(created_response(&created))
}

/// PUT /api/people -- replaces a person, a body without an id or with an unknown id is created instead
#[put("/api/people")]
async fn update_person(
    request_manager: Data<RequestManager>,
    mirror: Data<MirroredIndex>,
    payload: web::Json<PersonPayload>,
) -> Result<HttpResponse, ApiError> {
    let payload = payload.into_inner();

    log::debug!("REST request to update Person : {:?}", payload);

    let person = payload.into_person()?;

    let request_manager = request_manager.into_inner();
    let mirror = mirror.into_inner();
    let upsert = web::block(move || mirror.update(&request_manager, person)).await??;

    let response = match upsert {
        Upsert::Created(person) => created_response(&person),
        Upsert::Updated(person) => {
            let mut response = HttpResponse::Ok();

            headers::entity_update_alert(&mut response, &id_param(&person));

            response.json(person)
        }
    };

    Ok(response)
}

/// GET /api/people -- one page of people, `page`, `size` and `sort` control which
#[get("/api/people")]
async fn get_all_people(
    request_manager: Data<RequestManager>,
    params: QueryParams,
) -> Result<HttpResponse, ApiError> {
    let pageable = pageable_from_query(&params)?;

    log::debug!("REST request to get a page of People : {:?}", pageable);

    let request_manager = request_manager.into_inner();
    let page = web::block(move || request_manager.send_list(pageable)).await??;

    let mut response = HttpResponse::Ok();

    headers::pagination(&mut response, &page, "/api/people");

    Ok(response.json(page.content))
}

#[get("/api/people/{id}")]
async fn get_person(
    request_manager: Data<RequestManager>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let id = PersonId(path.into_inner());

    log::debug!("REST request to get Person : {}", id);

    let request_manager = request_manager.into_inner();

    match web::block(move || request_manager.send_get(id)).await?? {
        Some(person) => Ok(HttpResponse::Ok().json(person)),
        None => Err(ApiError::NotFound),
    }
}

/// DELETE /api/people/{id} -- deleting an unknown id still succeeds
#[delete("/api/people/{id}")]
async fn delete_person(
    request_manager: Data<RequestManager>,
    mirror: Data<MirroredIndex>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let id = PersonId(path.into_inner());

    log::debug!("REST request to delete Person : {}", id);

    let request_manager = request_manager.into_inner();
    let mirror = mirror.into_inner();
    web::block(move || mirror.remove(&request_manager, id)).await??;

    let mut response = HttpResponse::Ok();

    headers::entity_deletion_alert(&mut response, &id.to_string());

    Ok(response.finish())
}

/// GET /api/_search/people?query=... -- searches the index, not the primary store
#[get("/api/_search/people")]
async fn search_people(
    mirror: Data<MirroredIndex>,
    params: QueryParams,
) -> Result<HttpResponse, ApiError> {
    let query_string = params
        .iter()
        .find(|(key, _)| key == "query")
        .map(|(_, value)| value.as_str())
        .unwrap_or_default();

    log::debug!("REST request to search for a page of People for query {}", query_string);

    let query = PersonQuery::parse(query_string)?;
    let pageable = pageable_from_query(&params)?;

    let page = mirror.index().search(&query, &pageable)?;

    let mut response = HttpResponse::Ok();

    headers::pagination(
        &mut response,
        &page,
        &format!(
            "/api/_search/people?query={}",
            urlencoding::encode(query_string)
        ),
    );

    Ok(response.json(page.content))
}

/// Routes plus the extractor configs that turn malformed input into 400s
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| ApiError::MalformedBody(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _req| ApiError::MalformedPath(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| ApiError::InvalidParameter(err.to_string()).into()),
    )
    .service(create_person)
    .service(update_person)
    .service(get_all_people)
    .service(get_person)
    .service(delete_person)
    .service(search_people);
}

/// Application with its state wired in, shared by `main` and the tests
pub fn app(
    request_manager: RequestManager,
    mirror: Data<MirroredIndex>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(Data::new(request_manager))
        .app_data(mirror)
        .configure(configure)
}
