use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{
    middleware::{self, Condition},
    web::Data,
    HttpServer,
};
use anyhow::Context;
use clap::Parser;
use people_store::{
    database::{
        database::Database, options::DatabaseOptions, request_manager::RequestManager,
        table::page::Pageable, transaction::TransactionWriteMode,
    },
    search::index::{InMemorySearchIndex, PersonSearchIndex},
};

mod errors;
mod headers;
mod mirror;
mod pagination;
mod payload;
mod routes;
mod tracers;

/// 📇 People REST server, CRUD over the person store plus full text search over its index
#[derive(Parser, Debug)]
struct Cli {
    /// Location of the database. Reads / writes to this directory. Note: Does not support shell paths, e.g. ~
    #[clap(short, long, default_value = "data")]
    data: std::path::PathBuf,

    /// Port the REST server will run on
    #[clap(short, long, default_value = "8080")]
    port: u16,

    /// Address the REST server will run on
    #[clap(short, long, default_value = "0.0.0.0")]
    address: String,

    /// Log every HTTP request
    #[clap(long)]
    log_http: bool,

    #[clap(long, default_value_t = 2)]
    http_workers: usize,

    /// fsync the transaction log on every commit
    #[clap(long, default_value_t = true, action = clap::ArgAction::Set)]
    sync_commits: bool,

    /// Spans at or above this level are printed when they close (trace, debug, info, warn, error)
    #[clap(long, default_value = "info")]
    span_level: tracing::Level,

    /// Keep nothing on disk, the store starts empty and is lost on shutdown
    #[clap(long)]
    in_memory: bool,
}

impl Cli {
    fn database_options(&self) -> DatabaseOptions {
        let options = DatabaseOptions::default()
            .set_data_directory(self.data.clone())
            .set_sync_on_commit(self.sync_commits);

        match self.in_memory {
            true => options
                .set_restore(false)
                .set_write_mode(TransactionWriteMode::Off),
            false => options,
        }
    }
}

/// The index is not persisted, fill it from whatever the store restored
fn rebuild_search_index(
    request_manager: &RequestManager,
    search_index: &dyn PersonSearchIndex,
) -> anyhow::Result<()> {
    let people = request_manager
        .send_list(Pageable::unpaged())
        .context("Unable to read people from the store")?;

    search_index.delete_all()?;

    let indexed = search_index.save_all(&people.content)?;

    log::info!("🔎 Indexed {} people", indexed);

    Ok(())
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let args = Cli::parse();

    tracers::init_tracing_subscriber(args.span_level);

    let request_manager = Database::new(args.database_options())
        .context("Unable to open the database")?
        .run()
        .context("Unable to start the database")?;

    let search_index: Arc<dyn PersonSearchIndex> = Arc::new(InMemorySearchIndex::new());

    rebuild_search_index(&request_manager, search_index.as_ref())?;

    log::info!("starting HTTP server on port {}.", args.port);

    log::info!(
        "People API: http://{}:{}/api/people",
        args.address,
        args.port
    );

    let server_request_manager = request_manager.clone();
    // One lock for every worker, index writes stay in commit order across all of them
    let mirror = Data::new(mirror::MirroredIndex::new(search_index));
    let log_http = args.log_http;

    // Start HTTP server, run() resolves once actix has handled Ctrl-C / SIGTERM
    HttpServer::new(move || {
        routes::app(server_request_manager.clone(), mirror.clone())
            .wrap(Cors::permissive())
            .wrap(Condition::new(log_http, middleware::Logger::default()))
    })
    .workers(args.http_workers)
    .bind((args.address.as_str(), args.port))?
    .run()
    .await?;

    let shutdown_response = request_manager
        .send_shutdown_request()
        .context("Database did not acknowledge shutdown")?;

    log::info!("Shutting down server: {}", shutdown_response);

    Ok(())
}
