//! Integration tests for OpenWeatherClient using wiremock.

use std::time::Duration;

use common::{CityKey, Provider, SourceFetcher};
use openweather_client::OpenWeatherClient;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TIMEOUT: Duration = Duration::from_secs(2);

fn client_for(server: &MockServer) -> OpenWeatherClient {
    OpenWeatherClient::with_base_url("test-key".into(), server.uri()).unwrap()
}

#[tokio::test]
async fn test_fetch_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("q", "paris"))
        .and(query_param("appid", "test-key"))
        .and(query_param("units", "metric"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "weather": [{"description": "light rain"}],
            "main": {"temp": 14.2, "humidity": 81, "pressure": 1009},
            "wind": {"speed": 5.1}
        })))
        .mount(&mock_server)
        .await;

    let reading = client_for(&mock_server)
        .fetch(&CityKey::new("Paris"), TIMEOUT)
        .await;

    assert_eq!(reading.provider(), Provider::OpenWeather);
    assert!(reading.is_available());
    assert_eq!(reading.temperature(), Some(14.2));
    assert_eq!(reading.humidity(), Some(81.0));
    let m = reading.measurements().unwrap();
    assert_eq!(m.description.as_deref(), Some("light rain"));
    assert_eq!(m.wind_speed, Some(5.1));
}

#[tokio::test]
async fn test_partial_payload_is_still_available() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "main": {"humidity": 40}
        })))
        .mount(&mock_server)
        .await;

    let reading = client_for(&mock_server).fetch(&CityKey::new("oslo"), TIMEOUT).await;

    assert!(reading.is_available());
    assert_eq!(reading.temperature(), None);
    assert_eq!(reading.humidity(), Some(40.0));
}

#[tokio::test]
async fn test_null_weather_list_is_still_available() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "main": {"temp": 12.0, "humidity": 40},
            "weather": null
        })))
        .mount(&mock_server)
        .await;

    let reading = client_for(&mock_server).fetch(&CityKey::new("oslo"), TIMEOUT).await;

    assert!(reading.is_available());
    assert_eq!(reading.temperature(), Some(12.0));
    assert_eq!(reading.measurements().unwrap().description, None);
}

#[tokio::test]
async fn test_non_success_status_is_unavailable() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "cod": 401,
            "message": "Invalid API key"
        })))
        .mount(&mock_server)
        .await;

    let reading = client_for(&mock_server).fetch(&CityKey::new("paris"), TIMEOUT).await;

    assert!(!reading.is_available());
    assert!(reading.measurements().is_none());
}

#[tokio::test]
async fn test_malformed_body_is_unavailable() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&mock_server)
        .await;

    let reading = client_for(&mock_server).fetch(&CityKey::new("paris"), TIMEOUT).await;

    assert!(!reading.is_available());
}

#[tokio::test]
async fn test_slow_response_is_unavailable() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"main": {"temp": 10.0}}))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&mock_server)
        .await;

    let reading = client_for(&mock_server)
        .fetch(&CityKey::new("paris"), Duration::from_millis(100))
        .await;

    assert!(!reading.is_available());
}

#[tokio::test]
async fn test_unreachable_host_is_unavailable() {
    let client = OpenWeatherClient::with_base_url("k".into(), "http://127.0.0.1:1").unwrap();

    let reading = client.fetch(&CityKey::new("paris"), TIMEOUT).await;

    assert!(!reading.is_available());
}
