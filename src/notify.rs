//! Side-channel notices to the human in a session. The model never sees them.
use serde_json::json;

#[derive(Debug)]
pub enum NotifyError {
    Transport(reqwest::Error),
    Status { session_id: String, status: u16 },
}

impl std::fmt::Display for NotifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotifyError::Transport(e) => write!(f, "transport error: {e}"),
            NotifyError::Status { session_id, status } => {
                write!(f, "host rejected notice for session {session_id} with status {status}")
            }
        }
    }
}

impl std::error::Error for NotifyError {}

/// Delivers a text notice that expects no reply and stays out of model context.
#[async_trait::async_trait]
pub trait AnyNotifier: Send + Sync {
    async fn send_ignored(&self, session_id: &str, text: &str) -> Result<(), NotifyError>;
}

/// Posts notices to the host's HTTP API.
pub struct HttpNotifier {
    client: reqwest::Client,
    base_url: reqwest::Url,
}

impl HttpNotifier {
    pub fn new(base_url: &str) -> eyre::Result<Self> {
        let base_url = reqwest::Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            eyre::bail!("server url {base_url} cannot hold a path");
        }
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static(concat!(
                "askaway/",
                env!("CARGO_PKG_VERSION")
            )),
        );
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;
        Ok(Self {
            client,
            base_url,
        })
    }
}

/// Endpoint that appends a message to a session. The id is percent-encoded as one segment.
fn session_url(base_url: &reqwest::Url, session_id: &str) -> reqwest::Url {
    let mut url = base_url.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments
            .pop_if_empty()
            .extend(["session", session_id, "message"]);
    }
    url
}

/// Request body for an ignored, no-reply text message.
pub fn ignored_notice_body(text: &str) -> serde_json::Value {
    json!({
        "noReply": true,
        "parts": [{ "type": "text", "text": text, "ignored": true }],
    })
}

#[async_trait::async_trait]
impl AnyNotifier for HttpNotifier {
    async fn send_ignored(&self, session_id: &str, text: &str) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(session_url(&self.base_url, session_id))
            .json(&ignored_notice_body(text))
            .send()
            .await
            .map_err(NotifyError::Transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status {
                session_id: session_id.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notice_body_is_flagged() {
        let body = ignored_notice_body("hello");
        assert_eq!(body["noReply"], json!(true));
        assert_eq!(body["parts"][0]["type"], json!("text"));
        assert_eq!(body["parts"][0]["text"], json!("hello"));
        assert_eq!(body["parts"][0]["ignored"], json!(true));
    }

    fn url(raw: &str) -> reqwest::Url {
        reqwest::Url::parse(raw).unwrap()
    }

    #[test]
    fn session_url_strips_trailing_slash() {
        assert_eq!(
            session_url(&url("http://127.0.0.1:4096/"), "ses_1").as_str(),
            "http://127.0.0.1:4096/session/ses_1/message"
        );
        assert_eq!(
            session_url(&url("http://host:1"), "ses_2").as_str(),
            "http://host:1/session/ses_2/message"
        );
        assert_eq!(
            session_url(&url("http://host:1/api/"), "ses_3").as_str(),
            "http://host:1/api/session/ses_3/message"
        );
    }

    #[test]
    fn session_id_is_one_encoded_segment() {
        assert_eq!(
            session_url(&url("http://host:1"), "a b/../c?d#e").as_str(),
            "http://host:1/session/a%20b%2F..%2Fc%3Fd%23e/message"
        );
    }

    #[test]
    fn rejects_unusable_server_url() {
        assert!(HttpNotifier::new("not a url").is_err());
        assert!(HttpNotifier::new("mailto:someone@example.com").is_err());
    }
}
