use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{ExternalQueueSource, QueueSourceError, QueueSourceResult};
use crate::models::QueueEntry;

/// Queue source reading `GET <url>?room=<label>[&limit=<n>]`.
///
/// The endpoint answers with a JSON array of `{patient_id, position}`. The
/// response is re-sorted by position and capped locally, so a sloppy
/// endpoint cannot break the ordering guarantee.
#[derive(Debug, Clone)]
pub struct HttpQueueSource {
    client: reqwest::Client,
    url: String,
}

impl HttpQueueSource {
    pub fn new(url: impl Into<String>, timeout_ms: u64) -> QueueSourceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| QueueSourceError::Http(e.to_string()))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl ExternalQueueSource for HttpQueueSource {
    async fn fetch_queue(
        &self,
        room_label: &str,
        limit: Option<u32>,
    ) -> QueueSourceResult<Vec<QueueEntry>> {
        let mut request = self.client.get(&self.url).query(&[("room", room_label)]);
        if let Some(limit) = limit {
            request = request.query(&[("limit", limit)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| QueueSourceError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(QueueSourceError::UnexpectedStatus {
                status: status.as_u16(),
            });
        }

        let mut entries: Vec<QueueEntry> = response
            .json()
            .await
            .map_err(|e| QueueSourceError::Http(e.to_string()))?;

        entries.sort_by_key(|entry| entry.position);
        if let Some(limit) = limit {
            entries.truncate(limit as usize);
        }

        debug!(room = %room_label, count = entries.len(), "Read queue from endpoint");
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    #[tokio::test]
    async fn test_fetch_sorts_and_caps() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/queue")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("room".into(), "WZ1".into()),
                Matcher::UrlEncoded("limit".into(), "2".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!([
                    {"patient_id": 30, "position": 3},
                    {"patient_id": 10, "position": 1},
                    {"patient_id": 20, "position": 2}
                ])
                .to_string(),
            )
            .create_async()
            .await;

        let source = HttpQueueSource::new(format!("{}/queue", server.url()), 1_000).unwrap();
        let queue = source.fetch_queue("WZ1", Some(2)).await.unwrap();

        assert_eq!(queue, vec![QueueEntry::new(10, 1), QueueEntry::new(20, 2)]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unlimited_fetch_omits_limit() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/queue")
            .match_query(Matcher::Exact("room=WZ1".into()))
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let source = HttpQueueSource::new(format!("{}/queue", server.url()), 1_000).unwrap();
        let queue = source.fetch_queue("WZ1", None).await.unwrap();
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_server_error_is_not_an_empty_queue() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/queue")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let source = HttpQueueSource::new(format!("{}/queue", server.url()), 1_000).unwrap();
        let err = source.fetch_queue("WZ1", None).await.unwrap_err();
        assert!(matches!(err, QueueSourceError::UnexpectedStatus { status: 500 }));
    }

    #[tokio::test]
    async fn test_malformed_body_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/queue")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("{\"not\": \"a list\"}")
            .create_async()
            .await;

        let source = HttpQueueSource::new(format!("{}/queue", server.url()), 1_000).unwrap();
        assert!(matches!(
            source.fetch_queue("WZ1", None).await,
            Err(QueueSourceError::Http(_))
        ));
    }
}
