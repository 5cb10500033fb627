//! HTTP grade endpoint

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::GradeEndpoint;
use crate::config::ReportConfig;
use crate::error::{Error, Result};
use crate::grader::GraderKind;
use crate::score::parse_score;

/// Posts `graderName=<name>` as a form to the video's grade URL.
///
/// A response body holding a finite number is the viewer's new score.
#[derive(Debug, Clone)]
pub struct HttpEndpoint {
    client: reqwest::Client,
    url: String,
}

impl HttpEndpoint {
    /// Build an endpoint for `url` with the configured timeout and user agent
    pub fn new(url: impl Into<String>, config: &ReportConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl GradeEndpoint for HttpEndpoint {
    // POST <grade_url>
    async fn send_grade(&self, grader: GraderKind) -> Result<Option<f64>> {
        let response = self
            .client
            .post(&self.url)
            .form(&[("graderName", grader.backend_name())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Rejected {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        debug!("Grade endpoint answered {} for {}: {:?}", status, grader, body);
        Ok(parse_score(&body))
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    use super::*;

    /// Serve one request with a canned response; yields the raw request text.
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/grade", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0_u8; 1024];
            while !String::from_utf8_lossy(&request).contains("graderName=") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }

            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&request).into_owned()
        });

        (url, handle)
    }

    #[tokio::test]
    async fn test_posts_grader_name_and_reads_score() {
        let (url, server) = serve_once("200 OK", "0.5").await;
        let endpoint = HttpEndpoint::new(url, &ReportConfig::default()).unwrap();

        let score = endpoint.send_grade(GraderKind::WatchUntilPercent).await.unwrap();
        assert_eq!(score, Some(0.5));

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /grade"));
        assert!(request.contains("application/x-www-form-urlencoded"));
        assert!(request.contains("graderName=scored_on_percent"));
    }

    #[tokio::test]
    async fn test_non_numeric_body_is_success_without_score() {
        let (url, _server) = serve_once("200 OK", "ok").await;
        let endpoint = HttpEndpoint::new(url, &ReportConfig::default()).unwrap();
        let score = endpoint.send_grade(GraderKind::WatchUntilEnd).await.unwrap();
        assert_eq!(score, None);
    }

    #[tokio::test]
    async fn test_server_error_is_rejected() {
        let (url, _server) = serve_once("500 Internal Server Error", "").await;
        let endpoint = HttpEndpoint::new(url, &ReportConfig::default()).unwrap();
        let result = endpoint.send_grade(GraderKind::WatchUntilEnd).await;
        assert!(matches!(result, Err(Error::Rejected { status: 500 })));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_http_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/grade", listener.local_addr().unwrap());
        drop(listener);

        let endpoint = HttpEndpoint::new(url, &ReportConfig::default()).unwrap();
        let result = endpoint.send_grade(GraderKind::WatchUntilEnd).await;
        assert!(matches!(result, Err(Error::Http(_))));
    }
}
