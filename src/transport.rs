//! # Transport Messages
//!
//! Everything that crosses the boundary into an actor host is a [`Call`]: a lifecycle
//! [`Event`] plus an optional out-of-band metadata field. Ordinary application traffic
//! leaves the metadata empty. Control actions put an [`Action`] descriptor there, which
//! the host validates against the closed set of action kinds before doing anything else.

use crate::error::{HarnessError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Correlation id of one control action.
pub type ActionId = u64;

pub const STATUS_OK: u16 = 200;
pub const STATUS_NO_CONTENT: u16 = 204;
pub const STATUS_INTERNAL_SERVER_ERROR: u16 = 500;

/// A control action addressed to an actor host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Action {
    GetInstance { id: ActionId },
    RunCallback { id: ActionId },
    RunAlarm { id: ActionId },
}

impl Action {
    pub fn id(&self) -> ActionId {
        match self {
            Action::GetInstance { id } | Action::RunCallback { id } | Action::RunAlarm { id } => {
                *id
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Action::GetInstance { .. } => "GetInstance",
            Action::RunCallback { .. } => "RunCallback",
            Action::RunAlarm { .. } => "RunAlarm",
        }
    }

    /// Validates a raw metadata value. Unknown tags and malformed shapes are rejected.
    pub fn from_metadata(metadata: serde_json::Value) -> Result<Self> {
        serde_json::from_value(metadata).map_err(|e| HarnessError::Protocol(e.to_string()))
    }

    pub fn to_metadata(&self) -> serde_json::Value {
        match *self {
            Action::GetInstance { id } => {
                serde_json::json!({ "type": "GetInstance", "id": id })
            }
            Action::RunCallback { id } => {
                serde_json::json!({ "type": "RunCallback", "id": id })
            }
            Action::RunAlarm { id } => serde_json::json!({ "type": "RunAlarm", "id": id }),
        }
    }
}

/// A request delivered to an actor's `fetch` hook.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: String,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl Request {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: BTreeMap::new(),
            body: Vec::new(),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new("POST", url)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Path component of the url, without query string.
    pub fn path(&self) -> &str {
        let rest = match self.url.find("://") {
            Some(scheme_end) => {
                let after = &self.url[scheme_end + 3..];
                match after.find('/') {
                    Some(slash) => &after[slash..],
                    None => "/",
                }
            }
            None => self.url.as_str(),
        };
        rest.split(['?', '#']).next().unwrap_or("/")
    }

    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }
}

/// A response produced by an actor.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    pub fn text(body: impl Into<String>) -> Self {
        Self::new(STATUS_OK, body.into()).with_header("content-type", "text/plain;charset=UTF-8")
    }

    pub fn json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<Self> {
        Ok(Self::new(STATUS_OK, serde_json::to_vec(value)?)
            .with_header("content-type", "application/json"))
    }

    pub fn no_content() -> Self {
        Self::new(STATUS_NO_CONTENT, Vec::new())
    }

    pub fn internal_error() -> Self {
        Self::new(STATUS_INTERNAL_SERVER_ERROR, Vec::new())
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn body_json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }
}

/// Payload of a web socket message event.
#[derive(Debug, Clone, PartialEq)]
pub enum WebSocketMessage {
    Text(String),
    Binary(Vec<u8>),
}

/// The lifecycle event a call delivers.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Fetch(Request),
    Alarm,
    WebSocketMessage(WebSocketMessage),
    WebSocketClose {
        code: u16,
        reason: String,
        was_clean: bool,
    },
    WebSocketError(String),
}

impl Event {
    pub fn hook_name(&self) -> &'static str {
        match self {
            Event::Fetch(_) => "fetch",
            Event::Alarm => "alarm",
            Event::WebSocketMessage(_) => "webSocketMessage",
            Event::WebSocketClose { .. } => "webSocketClose",
            Event::WebSocketError(_) => "webSocketError",
        }
    }
}

/// One transport call into an actor host.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub event: Event,
    pub metadata: Option<serde_json::Value>,
}

impl Call {
    pub fn event(event: Event) -> Self {
        Self {
            event,
            metadata: None,
        }
    }

    /// A control action. The event is a placeholder `fetch`; hosts never deliver it.
    pub fn action(action: Action) -> Self {
        Self {
            event: Event::Fetch(Request::get("http://actor-harness/")),
            metadata: Some(action.to_metadata()),
        }
    }
}
