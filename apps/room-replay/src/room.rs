//! The HTTP "enter room" call that must succeed before the websocket opens.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::identity::DeviceProfile;

/// Literal the service puts in a successful response body.
pub const SUCCESS_MARKER: &str = "\"result\":1";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const BODY_EXCERPT_LEN: usize = 512;

#[derive(Debug, Error)]
pub enum RoomError {
    #[error("room entry request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid value for header {name}")]
    InvalidHeader { name: &'static str },
    #[error("room entry rejected ({status}): {body}")]
    Rejected { status: StatusCode, body: String },
}

/// What to send to the room service.
#[derive(Debug, Clone)]
pub struct RoomRequest {
    pub url: Url,
    pub uid: u64,
    pub signature: String,
}

impl RoomRequest {
    /// JSON body covered by the signature. Built by hand because the
    /// signature covers this exact byte sequence, key order included.
    pub fn data_payload(&self) -> String {
        format!(
            concat!(
                r#"{{"cmd":1012,"appId":1802,"version":0,"jsonMsg":{{"cmd":1012,"seq":"5","uid":"#,
                "{uid}",
                r#","sid":0,"ssid":0,"appId":1802,"usedChannel":1855}}}}"#
            ),
            uid = self.uid
        )
    }

    /// Form body as the client posts it: not percent-encoded.
    pub fn form_body(&self) -> String {
        format!("sign={}&data={}", self.signature, self.data_payload())
    }
}

/// Returns true when the response proves the room accepted us.
pub fn is_accepted(status: StatusCode, body: &str) -> bool {
    status == StatusCode::OK && body.contains(SUCCESS_MARKER)
}

#[derive(Clone)]
pub struct RoomClient {
    http: Client,
    headers: HeaderMap,
}

impl RoomClient {
    pub fn new(profile: &DeviceProfile, token: &str) -> Result<Self, RoomError> {
        let mut headers = HeaderMap::new();
        for (name, value) in profile.http_headers(token) {
            let header_name = HeaderName::from_static(name);
            let header_value =
                HeaderValue::from_str(&value).map_err(|_| RoomError::InvalidHeader { name })?;
            headers.insert(header_name, header_value);
        }
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { http, headers })
    }

    pub async fn enter(&self, request: &RoomRequest) -> Result<(), RoomError> {
        info!(target: "room", url = %request.url, uid = request.uid, "entering room");
        let res = self
            .http
            .post(request.url.clone())
            .headers(self.headers.clone())
            .body(request.form_body())
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await.unwrap_or_default();
        debug!(target: "room", %status, bytes = body.len(), "room entry response");

        if is_accepted(status, &body) {
            info!(target: "room", "room join acknowledged");
            Ok(())
        } else {
            Err(RoomError::Rejected {
                status,
                body: excerpt(&body),
            })
        }
    }
}

fn excerpt(body: &str) -> String {
    match body.char_indices().nth(BODY_EXCERPT_LEN) {
        Some((idx, _)) => format!("{}…", &body[..idx]),
        None => body.to_string(),
    }
}
