//! User identities referenced by people properties.
//!
//! People values decode to bare ids; this module gives those ids a face.
//! [`Session::user`](crate::session::Session::user) resolves one id and
//! [`Session::users`](crate::session::Session::users) lists the workspace.
//! Users are read-only and are not identity-mapped: they carry no local
//! state worth tracking.

use serde_json::Value as Json;
use uuid::Uuid;

use crate::error::{PageStoreError, PageStoreResult};

/// Whether a user is a person or an integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserKind {
    Person,
    Bot,
}

/// A workspace user.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    id: Uuid,
    kind: Option<UserKind>,
    name: Option<String>,
    email: Option<String>,
    avatar_url: Option<String>,
}

impl User {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The user's kind, absent on partial user objects.
    pub fn kind(&self) -> Option<UserKind> {
        self.kind
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The email address, present only for people the token may see.
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn avatar_url(&self) -> Option<&str> {
        self.avatar_url.as_deref()
    }

    /// Decodes a user object.
    ///
    /// # Errors
    ///
    /// Returns [`PageStoreError::Decode`] for a missing or malformed id,
    /// a wrong `object` tag, or an unrecognized user type tag.
    pub fn from_wire(fragment: &Json) -> PageStoreResult<Self> {
        match fragment.get("object").and_then(Json::as_str) {
            Some(object) if object != "user" => {
                return Err(PageStoreError::decode(format!(
                    "object '{object}' where a user was expected"
                )));
            }
            _ => {}
        }

        let raw_id = fragment
            .get("id")
            .and_then(Json::as_str)
            .ok_or_else(|| PageStoreError::decode("user without an 'id'"))?;
        let id = Uuid::parse_str(raw_id)
            .map_err(|_| PageStoreError::decode(format!("user id '{raw_id}' is not a uuid")))?;

        let kind = match fragment.get("type").and_then(Json::as_str) {
            None => None,
            Some("person") => Some(UserKind::Person),
            Some("bot") => Some(UserKind::Bot),
            Some(other) => {
                return Err(PageStoreError::decode(format!("user type '{other}'")));
            }
        };

        let email = fragment
            .get("person")
            .and_then(|person| person.get("email"))
            .and_then(Json::as_str)
            .map(str::to_string);

        Ok(Self {
            id,
            kind,
            name: optional_string(fragment, "name"),
            email,
            avatar_url: optional_string(fragment, "avatar_url"),
        })
    }
}

fn optional_string(fragment: &Json, key: &str) -> Option<String> {
    fragment.get(key).and_then(Json::as_str).map(str::to_string)
}
