use reqwest::Client;
use tokio::time::Duration;
use tracing::{debug, info};

use crate::error::FetchError;

pub const BUNNY_EDGE_LIST: &str = "https://bunnycdn.com/api/system/edgeserverlist";
pub const DEFAULT_FETCH_TIMEOUT_SECS: f64 = 10.0;

/// GET a JSON array of edge server addresses.
pub async fn fetch_edge_list(endpoint: &str, timeout: Duration) -> Result<Vec<String>, FetchError> {
    let client = Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|source| FetchError::Request {
            endpoint: endpoint.to_string(),
            source,
        })?;

    debug!("fetching edge list from {}", endpoint);
    let resp = client
        .get(endpoint)
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .await
        .map_err(|source| FetchError::Request {
            endpoint: endpoint.to_string(),
            source,
        })?;

    let status = resp.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            endpoint: endpoint.to_string(),
            status,
        });
    }

    let body = resp.text().await.map_err(|source| FetchError::Request {
        endpoint: endpoint.to_string(),
        source,
    })?;
    let ips: Vec<String> = serde_json::from_str(&body).map_err(|source| FetchError::Parse {
        endpoint: endpoint.to_string(),
        source,
    })?;

    info!("fetched {} edge addresses from {}", ips.len(), endpoint);
    Ok(ips)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{closed_port, serve};

    fn json_reply(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    #[tokio::test]
    async fn parses_address_array() {
        let port = serve(Duration::ZERO, json_reply("200 OK", r#"["1.2.3.4","5.6.7.8"]"#)).await;
        let ips = fetch_edge_list(&format!("http://127.0.0.1:{port}/api"), Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(ips, vec!["1.2.3.4".to_string(), "5.6.7.8".to_string()]);
    }

    #[tokio::test]
    async fn empty_array_is_not_an_error() {
        let port = serve(Duration::ZERO, json_reply("200 OK", "[]")).await;
        let ips = fetch_edge_list(&format!("http://127.0.0.1:{port}/"), Duration::from_secs(2))
            .await
            .unwrap();
        assert!(ips.is_empty());
    }

    #[tokio::test]
    async fn non_success_status_fails() {
        let port = serve(Duration::ZERO, json_reply("500 Internal Server Error", "[]")).await;
        let err = fetch_edge_list(&format!("http://127.0.0.1:{port}/"), Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status { status, .. } if status.as_u16() == 500));
    }

    #[tokio::test]
    async fn malformed_body_fails() {
        let port = serve(Duration::ZERO, json_reply("200 OK", r#"{"ips": 3}"#)).await;
        let err = fetch_edge_list(&format!("http://127.0.0.1:{port}/"), Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Parse { .. }));
    }

    #[tokio::test]
    async fn unreachable_endpoint_fails() {
        let port = closed_port().await;
        let err = fetch_edge_list(&format!("http://127.0.0.1:{port}/"), Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Request { .. }));
    }
}
