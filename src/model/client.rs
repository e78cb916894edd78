//! Client entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{DomainError, ErrorCode};

use super::{non_blank, Entity};

/// A client that owns purchases.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Client {
    pub(crate) id: Uuid,

    /// Display name
    pub(crate) name: String,

    /// Unique nickname, case-folded and whitespace-normalized
    pub(crate) nickname: Option<String>,

    pub(crate) phone: Option<String>,
    pub(crate) email: Option<String>,
    pub(crate) is_active: bool,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

/// Field changes for a client update. `None` leaves the field as is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientChanges {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl ClientChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.nickname.is_none() && self.phone.is_none() && self.email.is_none()
    }
}

/// Normalize a nickname for uniqueness: trim, collapse inner whitespace,
/// lowercase. Blank input means "no nickname".
pub fn normalize_nickname(raw: &str) -> Option<String> {
    let normalized = raw
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

fn validate_name(name: &str) -> Result<String, DomainError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::invalid(ErrorCode::ClientInvalidName));
    }
    Ok(name.to_string())
}

impl Client {
    /// Create a new active client
    pub fn create(
        id: Uuid,
        name: &str,
        nickname: Option<&str>,
        phone: Option<String>,
        email: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        Ok(Self {
            id,
            name: validate_name(name)?,
            nickname: nickname.and_then(normalize_nickname),
            phone: non_blank(phone),
            email: non_blank(email),
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply field changes
    pub fn apply_changes(
        &mut self,
        changes: ClientChanges,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if changes.is_empty() {
            return Err(DomainError::invalid(ErrorCode::DataFieldsEmpty));
        }

        if let Some(name) = changes.name {
            self.name = validate_name(&name)?;
        }
        if let Some(nickname) = changes.nickname {
            self.nickname = normalize_nickname(&nickname);
        }
        if let Some(phone) = changes.phone {
            self.phone = non_blank(Some(phone));
        }
        if let Some(email) = changes.email {
            self.email = non_blank(Some(email));
        }
        self.updated_at = now;

        Ok(())
    }

    // =========================================================================
    // Getters
    // =========================================================================

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn nickname(&self) -> Option<&str> {
        self.nickname.as_deref()
    }

    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }
}

impl Entity for Client {
    fn id(&self) -> Uuid {
        self.id
    }

    fn is_active(&self) -> bool {
        self.is_active
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn set_active(&mut self, active: bool, now: DateTime<Utc>) -> bool {
        if self.is_active == active {
            return false;
        }
        self.is_active = active;
        self.updated_at = now;
        true
    }
}
