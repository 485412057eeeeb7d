use std::time::Duration;

use reqwest::blocking::{Client, Response};
use serde::de::DeserializeOwned;

use crate::config::ApiOptions;

use super::{ApiError, ListParams, NewNote, Note, NotesApi, NotesPage};

const USER_AGENT: &str = concat!("notehub-tui/", env!("CARGO_PKG_VERSION"));
const ERROR_BODY_LIMIT: usize = 200;

#[derive(Debug, Clone)]
pub struct HttpNotesApi {
    client: Client,
    base_url: String,
}

impl HttpNotesApi {
    pub fn new(options: &ApiOptions) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(options.timeout_ms))
            .user_agent(USER_AGENT)
            .build()
            .map_err(ApiError::Transport)?;
        Ok(Self {
            client,
            base_url: options.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

impl NotesApi for HttpNotesApi {
    fn list(&self, params: &ListParams) -> Result<NotesPage, ApiError> {
        tracing::debug!(?params, "GET notes");
        let response = self
            .client
            .get(self.endpoint("notes"))
            .query(params)
            .send()
            .map_err(ApiError::Transport)?;
        decode(ensure_success(response)?)
    }

    fn create(&self, note: &NewNote) -> Result<Note, ApiError> {
        tracing::debug!(title = note.title(), tag = %note.tag(), "POST notes");
        let response = self
            .client
            .post(self.endpoint("notes"))
            .json(note)
            .send()
            .map_err(ApiError::Transport)?;
        decode(ensure_success(response)?)
    }

    fn delete(&self, id: i64) -> Result<(), ApiError> {
        tracing::debug!(note_id = id, "DELETE note");
        let response = self
            .client
            .delete(self.endpoint(&format!("notes/{id}")))
            .send()
            .map_err(ApiError::Transport)?;
        // The deleted note is echoed back; nothing in the client needs it.
        ensure_success(response).map(|_| ())
    }
}

fn ensure_success(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let mut message = response.text().unwrap_or_default();
    if message.len() > ERROR_BODY_LIMIT {
        let mut cut = ERROR_BODY_LIMIT;
        while !message.is_char_boundary(cut) {
            cut -= 1;
        }
        message.truncate(cut);
    }
    if message.trim().is_empty() {
        message = status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string();
    }
    Err(ApiError::Status {
        status: status.as_u16(),
        message,
    })
}

fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let body = response.text().map_err(ApiError::Transport)?;
    serde_json::from_str(&body).map_err(|err| ApiError::Decode(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::NoteTag;
    use assert_matches::assert_matches;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn options(uri: &str) -> ApiOptions {
        ApiOptions {
            base_url: format!("{uri}/api/"),
            timeout_ms: 2_000,
        }
    }

    fn note_json(id: i64, title: &str, tag: &str) -> serde_json::Value {
        json!({
            "id": id,
            "title": title,
            "content": "",
            "tag": tag,
            "createdAt": "2024-05-01T10:00:00Z",
            "updatedAt": "2024-05-01T10:00:00Z"
        })
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn list_sends_search_page_and_per_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/notes"))
            .and(query_param("search", " "))
            .and(query_param("page", "2"))
            .and(query_param("perPage", "12"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "notes": [note_json(1, "Standup", "Meeting")],
                "totalPages": 3
            })))
            .expect(1)
            .mount(&server)
            .await;

        let opts = options(&server.uri());
        let page = tokio::task::spawn_blocking(move || {
            let api = HttpNotesApi::new(&opts)?;
            api.list(&ListParams {
                search: " ".into(),
                page: 2,
                per_page: 12,
            })
        })
        .await
        .unwrap()
        .unwrap();

        assert_eq!(page.total_pages, 3);
        assert_eq!(page.notes.len(), 1);
        assert_eq!(page.notes[0].tag, NoteTag::Meeting);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn create_posts_validated_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/notes"))
            .and(body_json(json!({
                "title": "Buy milk",
                "content": "",
                "tag": "Shopping"
            })))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(note_json(42, "Buy milk", "Shopping")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let opts = options(&server.uri());
        let created = tokio::task::spawn_blocking(move || {
            let api = HttpNotesApi::new(&opts)?;
            let payload = NewNote::new_unchecked("Buy milk".into(), String::new(), NoteTag::Shopping);
            api.create(&payload)
        })
        .await
        .unwrap()
        .unwrap();

        assert_eq!(created.id, 42);
        assert_eq!(created.title, "Buy milk");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn delete_maps_server_errors_to_status() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/notes/9"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let opts = options(&server.uri());
        let result = tokio::task::spawn_blocking(move || {
            let api = HttpNotesApi::new(&opts)?;
            api.delete(9)
        })
        .await
        .unwrap();

        assert_matches!(result, Err(ApiError::Status { status: 500, ref message }) if message == "boom");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn malformed_body_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/notes"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let opts = options(&server.uri());
        let result = tokio::task::spawn_blocking(move || {
            let api = HttpNotesApi::new(&opts)?;
            api.list(&ListParams {
                search: " ".into(),
                page: 1,
                per_page: 12,
            })
        })
        .await
        .unwrap();

        assert_matches!(result, Err(ApiError::Decode(_)));
    }

    #[test]
    fn endpoint_joins_without_double_slashes() -> Result<(), ApiError> {
        let api = HttpNotesApi::new(&ApiOptions {
            base_url: "https://example.test/api/".into(),
            timeout_ms: 1_000,
        })?;
        assert_eq!(api.base_url(), "https://example.test/api");
        assert_eq!(api.endpoint("/notes"), "https://example.test/api/notes");
        Ok(())
    }
}
