use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Which registry a principal belongs to. Users and admins share one
/// pipeline and differ only in the messages they produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Admin => "Admin",
        }
    }

    // Wording (spelling included) is what existing clients receive.
    pub fn registered_message(&self) -> &'static str {
        match self {
            Role::User => "User registered successfully",
            Role::Admin => "Admin registered sucessfully",
        }
    }

    pub fn login_message(&self) -> &'static str {
        match self {
            Role::User => "Login sucessful",
            Role::Admin => "Login sucessfully",
        }
    }

    pub fn listing_message(&self, firstname: &str) -> String {
        format!("{}: {}", self.label(), firstname)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub role: Role,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl Principal {
    /// Builds a fresh principal with a newly generated UUID v4 id.
    pub fn new(role: Role, req: RegistrationRequest, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            firstname: req.firstname,
            lastname: req.lastname,
            email: req.email,
            password_hash,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationRequest {
    #[serde(deserialize_with = "lenient_string")]
    pub firstname: String,
    #[serde(deserialize_with = "lenient_string")]
    pub lastname: String,
    #[serde(deserialize_with = "lenient_string")]
    pub email: String,
    #[serde(deserialize_with = "lenient_string")]
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    #[serde(deserialize_with = "lenient_string")]
    pub email: String,
    #[serde(deserialize_with = "lenient_string")]
    pub password: String,
}

/// Accepts any JSON value for a text field: `null` becomes empty, strings
/// pass through, anything else becomes its JSON text (`7`, `true`, ...).
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationResponse {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub message: String,
}
