use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- JWT Claims --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Claims carried by both access and refresh tokens. `token_type` keeps a
/// refresh token from being accepted as a bearer credential and vice versa.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub token_type: TokenType,
    pub sub: i64,
    pub username: String,
    pub exp: usize,
    pub jti: Uuid,
}

// -- Form input --

/// A client-supplied text field. Numbers are accepted in their textual
/// form; booleans, arrays and objects are kept as `Invalid` so validation
/// can report them against the field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextInput {
    Text(String),
    Invalid,
}

impl TextInput {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            TextInput::Text(s) => Some(s),
            TextInput::Invalid => None,
        }
    }
}

impl From<&str> for TextInput {
    fn from(s: &str) -> Self {
        TextInput::Text(s.to_string())
    }
}

impl<'de> Deserialize<'de> for TextInput {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(TextInputVisitor)
    }
}

struct TextInputVisitor;

impl<'de> Visitor<'de> for TextInputVisitor {
    type Value = TextInput;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string or number")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<TextInput, E> {
        Ok(TextInput::Text(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<TextInput, E> {
        Ok(TextInput::Text(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<TextInput, E> {
        Ok(TextInput::Text(v.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<TextInput, E> {
        Ok(TextInput::Text(v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<TextInput, E> {
        Ok(TextInput::Text(v.to_string()))
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> Result<TextInput, E> {
        Ok(TextInput::Invalid)
    }

    fn visit_unit<E: de::Error>(self) -> Result<TextInput, E> {
        Ok(TextInput::Invalid)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<TextInput, A::Error> {
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(TextInput::Invalid)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<TextInput, A::Error> {
        while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
        Ok(TextInput::Invalid)
    }
}

// -- Auth --

/// Fields are optional so that missing ones surface as field errors
/// instead of a body rejection.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<TextInput>,
    pub email: Option<TextInput>,
    pub password: Option<TextInput>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub username: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct TokenObtainRequest {
    pub username: Option<TextInput>,
    pub password: Option<TextInput>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenPair {
    pub refresh: String,
    pub access: String,
}

#[derive(Debug, Deserialize)]
pub struct TokenRefreshRequest {
    pub refresh: Option<TextInput>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccessToken {
    pub access: String,
}

// -- Threads --

#[derive(Debug, Deserialize)]
pub struct NewThreadRequest {
    /// Username of the other participant.
    pub user: Option<TextInput>,
}

#[derive(Debug, Serialize)]
pub struct ThreadResponse {
    pub id: i64,
    pub participants: Vec<i64>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub last_message: Option<MessageResponse>,
}

// -- Messages --

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub text: Option<TextInput>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub text: String,
    pub created: DateTime<Utc>,
    pub is_read: bool,
}

// -- Envelopes --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Failure,
}

/// `{"status": ..., "detail": ...}` body used by the thread and message
/// endpoints.
#[derive(Debug, Serialize)]
pub struct StatusResponse<T> {
    pub status: Status,
    pub detail: T,
}

impl<T> StatusResponse<T> {
    pub fn success(detail: T) -> Self {
        Self { status: Status::Success, detail }
    }

    pub fn failure(detail: T) -> Self {
        Self { status: Status::Failure, detail }
    }
}

/// Limit-offset page.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}
