use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

use crate::api::types::{Bookmark, Guide, NewBookmark, NewNote, Note, NotePatch};
use crate::api::GuideApi;
use crate::config::ApiConfig;
use crate::error::{Error, RemoteError, Result};

/// REST client for the guide API
#[derive(Clone)]
pub struct HttpGuideApi {
  http: reqwest::Client,
  base_url: Url,
}

/// Error body shape returned by the API on non-2xx responses
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
  message: Option<String>,
  error: Option<String>,
}

impl HttpGuideApi {
  pub fn new(config: &ApiConfig) -> Result<Self> {
    let base_url = Url::parse(&config.base_url)
      .map_err(|e| Error::Config(format!("invalid API url {}: {}", config.base_url, e)))?;
    if base_url.cannot_be_a_base() {
      return Err(Error::Config(format!(
        "API url {} cannot be used as a base",
        config.base_url
      )));
    }

    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()
      .map_err(RemoteError::from)?;

    Ok(Self { http, base_url })
  }

  /// Build `<base>/<segments...>`, percent-encoding each segment
  fn endpoint(&self, segments: &[&str]) -> Result<Url, RemoteError> {
    let mut url = self.base_url.clone();
    url
      .path_segments_mut()
      .map_err(|_| RemoteError::Decode(format!("{} cannot be a base url", self.base_url)))?
      .pop_if_empty()
      .extend(segments);
    Ok(url)
  }

  async fn send(&self, request: RequestBuilder) -> Result<Response, RemoteError> {
    let response = request.send().await?;
    let status = response.status();
    if status.is_success() {
      return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(error_from_body(status, &body))
  }

  async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, RemoteError> {
    self
      .send(request)
      .await?
      .json::<T>()
      .await
      .map_err(|e| RemoteError::Decode(e.to_string()))
  }
}

/// Map a failed response body onto a [`RemoteError`].
///
/// JSON bodies without a `message` or `error` field are treated as
/// rejections that carry no description.
fn error_from_body(status: StatusCode, body: &str) -> RemoteError {
  let code = status.as_u16();
  let body = body.trim();
  if body.is_empty() {
    return RemoteError::Api {
      status: code,
      message: status
        .canonical_reason()
        .unwrap_or("request failed")
        .to_string(),
    };
  }

  match serde_json::from_str::<Value>(body) {
    Ok(value) => {
      let described = serde_json::from_value::<ApiErrorBody>(value.clone())
        .ok()
        .and_then(|b| b.message.or(b.error))
        .filter(|m| !m.is_empty());
      match described {
        Some(message) => RemoteError::Api {
          status: code,
          message,
        },
        None => RemoteError::Rejected(value),
      }
    }
    Err(_) => RemoteError::Api {
      status: code,
      message: body.to_string(),
    },
  }
}

#[async_trait]
impl GuideApi for HttpGuideApi {
  async fn update_guide_position(
    &self,
    guide_id: &str,
    position: u64,
  ) -> Result<(), RemoteError> {
    let url = self.endpoint(&["guides", guide_id, "position"])?;
    self
      .send(self.http.put(url).json(&json!({ "position": position })))
      .await?;
    Ok(())
  }

  async fn create_bookmark(
    &self,
    guide_id: &str,
    bookmark: &NewBookmark,
  ) -> Result<Bookmark, RemoteError> {
    let url = self.endpoint(&["guides", guide_id, "bookmarks"])?;
    self.send_json(self.http.post(url).json(bookmark)).await
  }

  async fn delete_bookmark(&self, guide_id: &str, bookmark_id: &str) -> Result<(), RemoteError> {
    let url = self.endpoint(&["guides", guide_id, "bookmarks", bookmark_id])?;
    self.send(self.http.delete(url)).await?;
    Ok(())
  }

  async fn create_note(&self, guide_id: &str, note: &NewNote) -> Result<Note, RemoteError> {
    let url = self.endpoint(&["guides", guide_id, "notes"])?;
    self.send_json(self.http.post(url).json(note)).await
  }

  async fn update_note(
    &self,
    guide_id: &str,
    note_id: &str,
    patch: &NotePatch,
  ) -> Result<Note, RemoteError> {
    let url = self.endpoint(&["guides", guide_id, "notes", note_id])?;
    self.send_json(self.http.patch(url).json(patch)).await
  }

  async fn delete_note(&self, guide_id: &str, note_id: &str) -> Result<(), RemoteError> {
    let url = self.endpoint(&["guides", guide_id, "notes", note_id])?;
    self.send(self.http.delete(url)).await?;
    Ok(())
  }

  async fn get_guide(&self, guide_id: &str) -> Result<Guide, RemoteError> {
    let url = self.endpoint(&["guides", guide_id])?;
    self.send_json(self.http.get(url)).await
  }
}
