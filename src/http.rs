//! HTTP REST API for the gateway
//!
//! Thin axum transport over `WeatherService`. Client identity for admission
//! control is the peer IP address.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use common::{Analysis, CanonicalReading, Error, HistoryView};
use pipeline::{ServiceStatus, WeatherService};
use serde::Serialize;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Shared state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<WeatherService>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after_ms: Option<u64>,
}

/// Pipeline error rendered as a JSON response.
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.0 {
            Error::RateLimited { retry_after_ms } => {
                let retry_secs = retry_after_ms.div_ceil(1000).max(1);
                let body = ErrorBody {
                    error: "Rate limit exceeded. Try again later.".into(),
                    retry_after_ms: Some(retry_after_ms),
                };
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    [(header::RETRY_AFTER, retry_secs.to_string())],
                    Json(body),
                )
                    .into_response()
            }
            Error::AllSourcesFailed { city } => {
                let body = ErrorBody {
                    error: format!("Unable to fetch weather data for {city} from any source"),
                    retry_after_ms: None,
                };
                (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
            }
            other => {
                error!("Unhandled gateway error: {}", other);
                let body = ErrorBody {
                    error: "Internal server error".into(),
                    retry_after_ms: None,
                };
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
        }
    }
}

/// GET /health
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "weather-gateway",
    })
}

/// GET /api/status
async fn status(State(state): State<AppState>) -> Json<ServiceStatus> {
    Json(state.service.status())
}

/// GET /api/weather/{city}
async fn weather(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Path(city): Path<String>,
) -> Result<Json<CanonicalReading>, ApiError> {
    let client = peer.ip().to_string();
    Ok(Json(state.service.get_weather(&client, &city).await?))
}

/// GET /api/history/{city}
async fn history(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Path(city): Path<String>,
) -> Result<Json<HistoryView>, ApiError> {
    let client = peer.ip().to_string();
    Ok(Json(state.service.get_history(&client, &city).await?))
}

/// GET /api/analytics/{city}
async fn analytics(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Path(city): Path<String>,
) -> Result<Json<Analysis>, ApiError> {
    let client = peer.ip().to_string();
    Ok(Json(state.service.get_analytics(&client, &city).await?))
}

/// Create the HTTP router
pub fn create_router(service: Arc<WeatherService>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/status", get(status))
        .route("/api/weather/{city}", get(weather))
        .route("/api/history/{city}", get(history))
        .route("/api/analytics/{city}", get(analytics))
        .with_state(AppState { service })
}

/// Serve the gateway on an already-bound listener.
pub async fn run_http_server(
    listener: TcpListener,
    service: Arc<WeatherService>,
) -> Result<(), Error> {
    if let Ok(addr) = listener.local_addr() {
        info!("HTTP gateway listening on {}", addr);
    }

    let app = create_router(service);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use common::{CityKey, Measurements, Provider, SourceFetcher, SourceReading};
    use pipeline::{HistoryStore, RateLimiter, ServiceSettings, SharedFetcher};
    use serde_json::Value;
    use std::time::Duration;

    struct FixedFetcher {
        provider: Provider,
        temperature: Option<f64>,
    }

    #[async_trait]
    impl SourceFetcher for FixedFetcher {
        fn provider(&self) -> Provider {
            self.provider
        }

        async fn fetch(&self, _city: &CityKey, _timeout: Duration) -> SourceReading {
            match self.temperature {
                Some(t) => SourceReading::available(
                    self.provider,
                    Measurements {
                        temperature: Some(t),
                        humidity: Some(50.0),
                        pressure: Some(1012.0),
                        description: Some("clear sky".into()),
                        wind_speed: Some(2.0),
                    },
                ),
                None => SourceReading::unavailable(self.provider),
            }
        }
    }

    fn fetcher(provider: Provider, temperature: Option<f64>) -> SharedFetcher {
        Arc::new(FixedFetcher {
            provider,
            temperature,
        })
    }

    async fn spawn_gateway(fetchers: Vec<SharedFetcher>, max_requests: usize) -> String {
        let service = Arc::new(WeatherService::new(
            fetchers,
            Arc::new(HistoryStore::new()),
            Arc::new(RateLimiter::with_limits(
                max_requests,
                Duration::from_secs(60),
            )),
            ServiceSettings::default(),
        ));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(run_http_server(listener, service));
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_health_is_not_rate_limited() {
        let base = spawn_gateway(vec![fetcher(Provider::OpenWeather, Some(20.0))], 1).await;
        let client = reqwest::Client::new();

        for _ in 0..3 {
            let resp = client.get(format!("{base}/health")).send().await.unwrap();
            assert_eq!(resp.status(), 200);
            let body: Value = resp.json().await.unwrap();
            assert_eq!(body["status"], "healthy");
            assert_eq!(body["service"], "weather-gateway");
        }
    }

    #[tokio::test]
    async fn test_weather_returns_averaged_reading() {
        let base = spawn_gateway(
            vec![
                fetcher(Provider::OpenWeather, Some(20.0)),
                fetcher(Provider::WeatherApi, Some(21.0)),
            ],
            10,
        )
        .await;

        let resp = reqwest::get(format!("{base}/api/weather/London"))
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);

        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["key"], "london");
        assert_eq!(body["city"], "London");
        assert_eq!(body["averages"]["temperature"], 20.5);
        assert_eq!(body["averages"]["humidity"], 50.0);
        assert_eq!(body["data_sources"]["openweather"], "success");
        assert_eq!(body["data_sources"]["weatherapi"], "success");
    }

    #[tokio::test]
    async fn test_eleventh_request_is_rejected_with_retry_hint() {
        let base = spawn_gateway(vec![fetcher(Provider::WeatherApi, Some(15.0))], 10).await;
        let client = reqwest::Client::new();

        for _ in 0..10 {
            let resp = client
                .get(format!("{base}/api/weather/paris"))
                .send()
                .await
                .unwrap();
            assert_eq!(resp.status(), 200);
        }

        let resp = client
            .get(format!("{base}/api/history/paris"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 429);
        assert!(resp.headers().contains_key("retry-after"));

        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "Rate limit exceeded. Try again later.");
        let retry = body["retry_after_ms"].as_u64().unwrap();
        assert!(retry > 0 && retry <= 60_000);
    }

    #[tokio::test]
    async fn test_all_sources_down_is_service_unavailable() {
        let base = spawn_gateway(
            vec![
                fetcher(Provider::OpenWeather, None),
                fetcher(Provider::WeatherApi, None),
            ],
            10,
        )
        .await;

        let resp = reqwest::get(format!("{base}/api/analytics/Atlantis"))
            .await
            .unwrap();
        assert_eq!(resp.status(), 503);
        let body: Value = resp.json().await.unwrap();
        assert!(body["error"].as_str().unwrap().contains("Atlantis"));
        assert!(body.get("retry_after_ms").is_none());
    }

    #[tokio::test]
    async fn test_analytics_feeds_history() {
        let base = spawn_gateway(vec![fetcher(Provider::OpenWeather, Some(18.0))], 10).await;
        let client = reqwest::Client::new();

        for _ in 0..3 {
            let resp = client
                .get(format!("{base}/api/analytics/Berlin"))
                .send()
                .await
                .unwrap();
            assert_eq!(resp.status(), 200);
        }

        let body: Value = client
            .get(format!("{base}/api/history/berlin"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["total_records"], 3);
        assert_eq!(body["records"].as_array().unwrap().len(), 3);

        let status: Value = client
            .get(format!("{base}/api/status"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(status["history_records"], 3);
        assert_eq!(status["rate_limited_identities"], 1);
    }
}
