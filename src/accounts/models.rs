// src/accounts/models.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Editable volunteer profile, one per user, provisioned at first login
#[derive(FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct Account {
    pub id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    #[serde(deserialize_with = "deserialize_bool_from_int")]
    #[serde(serialize_with = "serialize_bool_to_bool")]
    #[serde(rename = "isPublic")]
    pub is_public: i64,
    pub notes: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(rename = "updatedAt")]
    pub updated_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAccountRequest {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    #[serde(rename = "isPublic")]
    pub is_public: Option<bool>,
    pub notes: Option<String>,
}

/// Self-service deletion requires an explicit confirmation flag
#[derive(Debug, Deserialize)]
pub struct DeleteAccountRequest {
    pub confirm: bool,
}

/// Public roster: opted-in volunteer names plus the overall count
#[derive(Debug, Serialize)]
pub struct RosterResponse {
    pub volunteers: Vec<String>,
    pub total: i64,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

// Helper functions for serializing SQLite INTEGER booleans
fn deserialize_bool_from_int<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    i64::deserialize(deserializer)
}

fn serialize_bool_to_bool<S>(value: &i64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_bool(*value != 0)
}
