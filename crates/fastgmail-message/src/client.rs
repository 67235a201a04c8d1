//! Gmail REST client.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::CONTENT_TYPE;
use tracing::instrument;

use crate::error::GmailError;
use crate::labels::ApiLabel;
use crate::service::GmailService;
use crate::types::{ApiMessage, AttachmentBody, MessageFormat, ModifyRequest};

const GMAIL_API_BASE: &str = "https://gmail.googleapis.com";

/// Content-ID prefix of the batch parts; Gmail answers with `response-` prepended.
const BATCH_PART_PREFIX: &str = "label-";

pub struct GmailClient {
    client: reqwest::Client,
    access_token: String,
    base_url: String,
}

impl GmailClient {
    pub fn new(access_token: &str) -> Self {
        Self::with_base_url(access_token, GMAIL_API_BASE)
    }

    /// Client against another API root, such as a proxy or a local mock.
    pub fn with_base_url(access_token: &str, base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            access_token: access_token.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    fn user_url(&self, user_id: &str) -> String {
        format!("{}/gmail/v1/users/{}", self.base_url, urlencoding::encode(user_id))
    }

    fn batch_url(&self) -> String {
        format!("{}/batch/gmail/v1", self.base_url)
    }

    /// Map non-success statuses to errors.
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, GmailError> {
        let status = response.status();

        if status.is_success() {
            Ok(response)
        } else if status.as_u16() == 401 {
            Err(GmailError::TokenExpired)
        } else if status.as_u16() == 403 {
            Err(GmailError::AuthRequired)
        } else if status.as_u16() == 404 {
            let text = response.text().await.unwrap_or_default();
            Err(GmailError::NotFound(text))
        } else if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            Err(GmailError::RateLimited(retry_after))
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(GmailError::ApiError(format!("{}: {}", status, text)))
        }
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, GmailError> {
        Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| GmailError::InvalidResponse(format!("JSON parse error: {}", e)))
    }
}

#[async_trait]
impl GmailService for GmailClient {
    #[instrument(skip(self), level = "info")]
    async fn get_message(
        &self,
        user_id: &str,
        message_id: &str,
        format: MessageFormat,
    ) -> Result<ApiMessage, GmailError> {
        let url = format!(
            "{}/messages/{}?format={}",
            self.user_url(user_id),
            urlencoding::encode(message_id),
            format.as_str()
        );

        let response =
            self.client.get(&url).header("Authorization", self.auth_header()).send().await?;

        Self::handle_response(response).await
    }

    #[instrument(skip(self), level = "info")]
    async fn get_attachment(
        &self,
        user_id: &str,
        message_id: &str,
        attachment_id: &str,
    ) -> Result<AttachmentBody, GmailError> {
        let url = format!(
            "{}/messages/{}/attachments/{}",
            self.user_url(user_id),
            urlencoding::encode(message_id),
            urlencoding::encode(attachment_id)
        );

        let response =
            self.client.get(&url).header("Authorization", self.auth_header()).send().await?;

        Self::handle_response(response).await
    }

    #[instrument(skip(self), level = "info")]
    async fn modify_message(
        &self,
        user_id: &str,
        message_id: &str,
        request: &ModifyRequest,
    ) -> Result<(), GmailError> {
        let url =
            format!("{}/messages/{}/modify", self.user_url(user_id), urlencoding::encode(message_id));

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.auth_header())
            .json(request)
            .send()
            .await?;

        Self::check_status(response).await?;
        Ok(())
    }

    #[instrument(skip(self), level = "info")]
    async fn get_label(&self, user_id: &str, label_id: &str) -> Result<ApiLabel, GmailError> {
        let url = format!("{}/labels/{}", self.user_url(user_id), urlencoding::encode(label_id));

        let response =
            self.client.get(&url).header("Authorization", self.auth_header()).send().await?;

        Self::handle_response(response).await
    }

    /// One `multipart/mixed` request with a `users.labels.get` per id.
    #[instrument(skip(self), level = "info")]
    async fn batch_get_labels(
        &self,
        user_id: &str,
        label_ids: &[String],
    ) -> Result<Vec<ApiLabel>, GmailError> {
        if label_ids.is_empty() {
            return Ok(Vec::new());
        }

        let boundary =
            format!("fastgmail_batch_{}", Utc::now().timestamp_nanos_opt().unwrap_or_default());
        let body = build_batch_body(&boundary, user_id, label_ids);

        let response = self
            .client
            .post(self.batch_url())
            .header("Authorization", self.auth_header())
            .header(CONTENT_TYPE, format!("multipart/mixed; boundary={}", boundary))
            .body(body)
            .send()
            .await?;

        let response = Self::check_status(response).await?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let text = response.text().await?;

        let labels = parse_batch_response(&text, &content_type, label_ids)?;
        tracing::debug!("Batch resolved {} labels", labels.len());
        Ok(labels)
    }
}

fn build_batch_body(boundary: &str, user_id: &str, label_ids: &[String]) -> String {
    let user = urlencoding::encode(user_id);
    let mut body = String::new();
    for (index, id) in label_ids.iter().enumerate() {
        body.push_str(&format!("--{}\r\n", boundary));
        body.push_str("Content-Type: application/http\r\n");
        body.push_str(&format!("Content-ID: <{}{}>\r\n", BATCH_PART_PREFIX, index));
        body.push_str("\r\n");
        body.push_str(&format!(
            "GET /gmail/v1/users/{}/labels/{}\r\n",
            user,
            urlencoding::encode(id)
        ));
        body.push_str("\r\n");
    }
    body.push_str(&format!("--{}--\r\n", boundary));
    body
}

/// Split a batch response into labels ordered like `label_ids`.
///
/// Parts are matched by Content-ID, or by position when a part has none.
/// A non-2xx part, or an id with no part at all, fails the whole batch.
fn parse_batch_response(
    body: &str,
    content_type: &str,
    label_ids: &[String],
) -> Result<Vec<ApiLabel>, GmailError> {
    let boundary = content_type
        .split(';')
        .filter_map(|part| {
            part.trim().strip_prefix("boundary=").map(|value| value.trim_matches('"').to_string())
        })
        .next()
        .ok_or_else(|| {
            GmailError::InvalidResponse("batch response missing boundary in content-type".into())
        })?;

    let separator = format!("--{}", boundary);
    let mut slots: Vec<Option<ApiLabel>> = vec![None; label_ids.len()];

    for (position, part) in body
        .split(&separator)
        .map(str::trim)
        .filter(|p| !p.is_empty() && !p.starts_with("--"))
        .enumerate()
    {
        let normalized = part.replace("\r\n", "\n");
        let index = part_index(&normalized).unwrap_or(position);
        let Some(id) = label_ids.get(index) else {
            tracing::warn!("Ignoring batch part {} with no matching label", index);
            continue;
        };

        let Some(http_pos) = normalized.find("HTTP/1.1 ") else {
            return Err(GmailError::InvalidResponse(format!(
                "batch part for {} has no status line",
                id
            )));
        };
        let status_region = &normalized[http_pos..];
        let status_line_end = status_region.find('\n').unwrap_or(status_region.len());
        let status = status_region[..status_line_end]
            .split_whitespace()
            .nth(1)
            .and_then(|s| s.parse::<u16>().ok())
            .unwrap_or_default();

        let after_status = &status_region[status_line_end..];
        let json_body = after_status
            .find('{')
            .map(|start| {
                let region = &after_status[start..];
                find_json_object_end(region).map_or(region.trim(), |end| &region[..end])
            })
            .unwrap_or_default();

        if !(200..300).contains(&status) {
            return Err(GmailError::BatchItemFailed {
                id: id.clone(),
                status,
                message: batch_error_message(json_body),
            });
        }

        let label: ApiLabel = serde_json::from_str(json_body).map_err(|e| {
            GmailError::InvalidResponse(format!("batch part for {}: {}", id, e))
        })?;
        slots[index] = Some(label);
    }

    slots
        .into_iter()
        .zip(label_ids)
        .map(|(slot, id)| {
            slot.ok_or_else(|| GmailError::BatchItemFailed {
                id: id.clone(),
                status: 0,
                message: "missing from batch response".to_string(),
            })
        })
        .collect()
}

/// Index from a `Content-ID: <response-label-N>` header.
fn part_index(part: &str) -> Option<usize> {
    part.lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.trim().eq_ignore_ascii_case("content-id").then_some(value)
        })?
        .trim()
        .trim_start_matches('<')
        .trim_end_matches('>')
        .rsplit_once(BATCH_PART_PREFIX)?
        .1
        .parse()
        .ok()
}

fn batch_error_message(json_body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(json_body)
        .ok()
        .and_then(|v| v.pointer("/error/message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| json_body.to_string())
}

fn find_json_object_end(s: &str) -> Option<usize> {
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        if in_string {
            match ch {
                '\\' => escape_next = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}
