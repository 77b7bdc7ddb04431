use std::{env, fmt, io};

use actix_web::http::StatusCode;
use actix_web::middleware::Logger;
use actix_web::{App, HttpResponse, HttpServer, ResponseError, delete, get, post, put, web};

use log::info;
use rs_markov_core::{DatasetService, Error, GroupId, ServiceConfig};
use serde::Deserialize;

const ENV_BIND: &str = "RS_MARKOV_BIND";
const DEFAULT_BIND: &str = "127.0.0.1:5000";

/// Largest corpus accepted in one upload.
const MAX_CORPUS_BYTES: usize = 16 * 1024 * 1024;

/// Sentences generated when the query does not say.
const DEFAULT_SENTENCES: usize = 3;

type Service = web::Data<DatasetService>;

/// Engine error rendered as a one-line plain text reply.
#[derive(Debug)]
struct ApiError(Error);

impl fmt::Display for ApiError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		self.0.fmt(f)
	}
}

impl From<Error> for ApiError {
	fn from(error: Error) -> Self {
		Self(error)
	}
}

impl ResponseError for ApiError {
	fn status_code(&self) -> StatusCode {
		match self.0 {
			Error::NotFound { .. } => StatusCode::NOT_FOUND,
			Error::InvalidName(_) | Error::InvalidOrder(_) | Error::Build { .. } | Error::Combine { .. } => {
				StatusCode::BAD_REQUEST
			}
			Error::Generation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
			Error::Storage { .. } | Error::CorruptCache { .. } | Error::Worker(_) | Error::Config { .. } => {
				StatusCode::INTERNAL_SERVER_ERROR
			}
		}
	}

	fn error_response(&self) -> HttpResponse {
		HttpResponse::build(self.status_code()).body(self.0.to_string())
	}
}

/// Runs a blocking service call on actix's blocking pool.
///
/// The call keeps running if the client goes away, so a started build
/// always completes and commits.
async fn run<T, F>(service: Service, call: F) -> Result<T, ApiError>
where
	F: FnOnce(&DatasetService) -> rs_markov_core::Result<T> + Send + 'static,
	T: Send + 'static,
{
	let result = web::block(move || call(service.get_ref()))
		.await
		.map_err(|_| ApiError(Error::Worker("blocking pool unavailable".to_owned())))?;
	Ok(result?)
}

#[derive(Deserialize)]
struct CachedQuery {
	query: Option<String>,
}

#[derive(Deserialize)]
struct RegenerateQuery {
	order: Option<usize>,
}

#[derive(Deserialize)]
struct CombineQuery {
	left: String,
	right: String,
}

#[derive(Deserialize)]
struct GenerateQuery {
	sentences: Option<usize>,
}

/// HTTP GET endpoint `/v1/groups/{group}/datasets`
///
/// Lists the group's stored corpora as a JSON array.
#[get("/v1/groups/{group}/datasets")]
async fn list_datasets(service: Service, path: web::Path<GroupId>) -> Result<HttpResponse, ApiError> {
	let group = path.into_inner();
	let names = run(service, move |s| s.list_datasets(group)).await?;
	Ok(HttpResponse::Ok().json(names))
}

/// HTTP GET endpoint `/v1/groups/{group}/cached`
///
/// Lists generatable datasets, optionally filtered by `query`.
#[get("/v1/groups/{group}/cached")]
async fn list_cached(
	service: Service,
	path: web::Path<GroupId>,
	query: web::Query<CachedQuery>,
) -> Result<HttpResponse, ApiError> {
	let group = path.into_inner();
	let filter = query.into_inner().query;
	let names = run(service, move |s| match filter {
		Some(filter) => s.search_cached(group, &filter),
		None => s.list_cached(group),
	})
	.await?;
	Ok(HttpResponse::Ok().json(names))
}

#[get("/v1/groups/{group}/loaded")]
async fn list_loaded(service: Service, path: web::Path<GroupId>) -> HttpResponse {
	HttpResponse::Ok().json(service.list_loaded(path.into_inner()))
}

/// HTTP PUT endpoint `/v1/groups/{group}/datasets/{name}`
///
/// The request body is the raw corpus. Replaces an existing dataset.
#[put("/v1/groups/{group}/datasets/{name}")]
async fn add_dataset(
	service: Service,
	path: web::Path<(GroupId, String)>,
	body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
	let (group, name) = path.into_inner();
	let reply = format!("Successfully added and cached {name}!");
	run(service, move |s| s.add(group, &name, &body)).await?;
	Ok(HttpResponse::Created().body(reply))
}

#[delete("/v1/groups/{group}/datasets/{name}")]
async fn remove_dataset(service: Service, path: web::Path<(GroupId, String)>) -> Result<HttpResponse, ApiError> {
	let (group, name) = path.into_inner();
	run(service, move |s| s.remove(group, &name)).await?;
	Ok(HttpResponse::NoContent().finish())
}

#[post("/v1/groups/{group}/datasets/{name}/regenerate")]
async fn regenerate_dataset(
	service: Service,
	path: web::Path<(GroupId, String)>,
	query: web::Query<RegenerateQuery>,
) -> Result<HttpResponse, ApiError> {
	let (group, name) = path.into_inner();
	let order = query.order.unwrap_or(service.config().default_order);
	run(service, move |s| s.regenerate(group, &name, order)).await?;
	Ok(HttpResponse::NoContent().finish())
}

/// HTTP POST endpoint `/v1/groups/{group}/datasets/{name}/combine`
///
/// Caches the combination of `left` and `right` under `name`.
#[post("/v1/groups/{group}/datasets/{name}/combine")]
async fn combine_datasets(
	service: Service,
	path: web::Path<(GroupId, String)>,
	query: web::Query<CombineQuery>,
) -> Result<HttpResponse, ApiError> {
	let (group, name) = path.into_inner();
	let CombineQuery { left, right } = query.into_inner();
	run(service, move |s| s.combine(group, &name, &left, &right)).await?;
	Ok(HttpResponse::Created().finish())
}

/// HTTP GET endpoint `/v1/groups/{group}/datasets/{name}/generate`
///
/// Returns `sentences` generated sentences (default 3, clamped to 1..=10).
#[get("/v1/groups/{group}/datasets/{name}/generate")]
async fn generate(
	service: Service,
	path: web::Path<(GroupId, String)>,
	query: web::Query<GenerateQuery>,
) -> Result<HttpResponse, ApiError> {
	let (group, name) = path.into_inner();
	let sentences = query.sentences.unwrap_or(DEFAULT_SENTENCES);
	let text = run(service, move |s| s.generate(group, &name, sentences)).await?;
	Ok(HttpResponse::Ok().body(text))
}

#[get("/v1/groups/{group}/datasets/{name}/corpus")]
async fn download_corpus(service: Service, path: web::Path<(GroupId, String)>) -> Result<HttpResponse, ApiError> {
	let (group, name) = path.into_inner();
	let bytes = run(service, move |s| s.corpus(group, &name)).await?;
	Ok(HttpResponse::Ok().content_type("text/plain; charset=utf-8").body(bytes))
}

fn routes(cfg: &mut web::ServiceConfig) {
	cfg.app_data(web::PayloadConfig::new(MAX_CORPUS_BYTES))
		.service(list_datasets)
		.service(list_cached)
		.service(list_loaded)
		.service(add_dataset)
		.service(remove_dataset)
		.service(regenerate_dataset)
		.service(combine_datasets)
		.service(generate)
		.service(download_corpus);
}

/// Main entry point for the server.
///
/// Reads the engine settings from `RS_MARKOV_*` variables, opens the data
/// directory and serves the dataset endpoints on `RS_MARKOV_BIND`
/// (default 127.0.0.1:5000).
#[actix_web::main]
async fn main() -> io::Result<()> {
	env_logger::init();

	let config = ServiceConfig::from_env().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
	let bind = env::var(ENV_BIND).unwrap_or_else(|_| DEFAULT_BIND.to_owned());
	info!("serving datasets from {} on {bind}", config.data_dir.display());

	let service = web::Data::new(DatasetService::open(config));

	HttpServer::new(move || App::new().wrap(Logger::default()).app_data(service.clone()).configure(routes))
		.bind(bind)?
		.run()
		.await
}

#[cfg(test)]
mod tests {
	use super::*;

	use actix_web::test;

	fn service(dir: &tempfile::TempDir) -> Service {
		web::Data::new(DatasetService::open(ServiceConfig::new(dir.path())))
	}

	#[actix_web::test]
	async fn add_then_generate() {
		let dir = tempfile::tempdir().unwrap();
		let app = test::init_service(App::new().app_data(service(&dir)).configure(routes)).await;

		let req = test::TestRequest::put()
			.uri("/v1/groups/1/datasets/cats")
			.set_payload("The cat sat. The cat ran.")
			.to_request();
		assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

		let req = test::TestRequest::get().uri("/v1/groups/1/datasets/cats/generate?sentences=2").to_request();
		let body = test::call_and_read_body(&app, req).await;
		let text = String::from_utf8(body.to_vec()).unwrap();
		assert_eq!(text.matches('.').count(), 2);

		let req = test::TestRequest::get().uri("/v1/groups/1/cached?query=CAT").to_request();
		let names: Vec<String> = test::call_and_read_body_json(&app, req).await;
		assert_eq!(names, vec!["cats"]);
	}

	#[actix_web::test]
	async fn errors_map_to_status_codes() {
		let dir = tempfile::tempdir().unwrap();
		let app = test::init_service(App::new().app_data(service(&dir)).configure(routes)).await;

		let req = test::TestRequest::get().uri("/v1/groups/1/datasets/missing/generate").to_request();
		assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

		let req = test::TestRequest::put().uri("/v1/groups/1/datasets/short").set_payload("Hi.").to_request();
		assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

		let req = test::TestRequest::post().uri("/v1/groups/1/datasets/short/regenerate?order=0").to_request();
		assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

		let req = test::TestRequest::delete().uri("/v1/groups/1/datasets/short").to_request();
		assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

		let req = test::TestRequest::get().uri("/v1/groups/1/datasets/short/corpus").to_request();
		let body = test::call_and_read_body(&app, req).await;
		assert_eq!(body.as_ref(), b"Hi.");
	}
}
