use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use super::config::Config;
use super::db;
use super::gate::{Gate, GateError};
use super::store::{PgStore, StoreError, WeatherStore};
use super::upstream::{WeatherSource, YandexClient};

pub async fn run(
    address: std::net::SocketAddr,
    database_url: &str,
    config: &Config,
) -> anyhow::Result<()> {
    let pool = db::pool(database_url).await?;
    let source = YandexClient::new(config)?;
    let gate = Arc::new(Gate::new(PgStore::new(pool), source, config.freshness_window()));

    log::info!(
        "Serving weather on {} (freshness window {} min)",
        address,
        config.freshness_minutes
    );
    warp::serve(routes(gate)).run(address).await;
    Ok(())
}

pub fn routes<S, U>(
    gate: Arc<Gate<S, U>>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone
where
    S: WeatherStore,
    U: WeatherSource,
{
    let health_route = warp::path!("health")
        .and(warp::get())
        .and(with_gate(gate.clone()))
        .and_then(health::<S, U>);

    let weather_route = warp::path!("weather")
        .and(warp::get())
        .and(warp::query::<WeatherQuery>())
        .and(with_gate(gate))
        .and_then(weather::<S, U>);

    health_route
        .or(weather_route)
        .recover(rejection)
        .with(warp::log("weather::http"))
}

fn with_gate<S, U>(
    gate: Arc<Gate<S, U>>,
) -> impl Filter<Extract = (Arc<Gate<S, U>>,), Error = Infallible> + Clone
where
    S: WeatherStore,
    U: WeatherSource,
{
    warp::any().map(move || gate.clone())
}

#[derive(Debug, Deserialize)]
pub struct WeatherQuery {
    city: String,
}

pub async fn health<S, U>(gate: Arc<Gate<S, U>>) -> Result<impl Reply, Rejection>
where
    S: WeatherStore,
    U: WeatherSource,
{
    gate.store()
        .ping()
        .await
        .map_err(|e| warp::reject::custom(Error(GateError::Storage(e))))
        .map(|_| StatusCode::OK)
}

pub async fn weather<S, U>(query: WeatherQuery, gate: Arc<Gate<S, U>>) -> Result<impl Reply, Rejection>
where
    S: WeatherStore,
    U: WeatherSource,
{
    let reading = gate
        .get_weather(&query.city)
        .await
        .map_err(|e| warp::reject::custom(Error(e)))?;
    Ok(warp::reply::json(&reading))
}

#[derive(Debug)]
struct Error(GateError);
impl warp::reject::Reject for Error {}

/// City lookups that miss answer 400 rather than 404.
fn status_of(err: &GateError) -> StatusCode {
    match err {
        GateError::Validation(_) | GateError::NotFound(_) => StatusCode::BAD_REQUEST,
        GateError::Storage(_) | GateError::Upstream(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

#[derive(Serialize)]
struct ErrorMessage {
    code: u16,
    message: String,
}

pub async fn rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (code, message) = if let Some(Error(gate_err)) = err.find::<Error>() {
        let code = status_of(gate_err);
        match gate_err {
            GateError::Storage(StoreError::Database(e)) => {
                log::error!("Storage error: {:?}", e);
            }
            e if code.is_server_error() => log::error!("Error: {}", e),
            e => log::info!("Rejected: {}", e),
        }
        let message = if code.is_server_error() {
            "Weather service unavailable.".to_string()
        } else {
            gate_err.to_string()
        };
        (code, message)
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found.".to_string())
    } else if let Some(e) = err.find::<warp::reject::InvalidQuery>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed.".to_string())
    } else {
        log::error!("Unhandled rejection: {:?}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error.".to_string(),
        )
    };

    let json = warp::reply::json(&ErrorMessage {
        code: code.as_u16(),
        message,
    });

    Ok(warp::reply::with_status(json, code))
}
