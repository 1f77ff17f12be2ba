// src/schools/models.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// NCES-style school level codes
pub const LEVEL_PRESCHOOL: i64 = 510;
pub const LEVEL_ELEMENTARY: i64 = 520;
pub const LEVEL_INTERMEDIATE: i64 = 530;
pub const LEVEL_HIGH: i64 = 540;
pub const LEVEL_ELEMENTARY_HIGH: i64 = 550;
pub const LEVEL_SECONDARY: i64 = 555;
pub const LEVEL_ADULT: i64 = 560;
pub const LEVEL_UNGRADED: i64 = 570;

/// Human-readable label for a school level code
pub fn level_label(level: i64) -> Option<&'static str> {
    match level {
        LEVEL_PRESCHOOL => Some("Preschool"),
        LEVEL_ELEMENTARY => Some("Elementary"),
        LEVEL_INTERMEDIATE => Some("Intermediate/Middle/Junior High"),
        LEVEL_HIGH => Some("High School"),
        LEVEL_ELEMENTARY_HIGH => Some("Elementary-High Combination"),
        LEVEL_SECONDARY => Some("Secondary"),
        LEVEL_ADULT => Some("Adult"),
        LEVEL_UNGRADED => Some("Ungraded"),
        _ => None,
    }
}

pub fn is_known_level(level: i64) -> bool {
    level_label(level).is_some()
}

#[derive(FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct School {
    pub id: String,
    pub name: String,
    pub level: Option<i64>,
    #[serde(rename = "ncesId")]
    pub nces_id: Option<String>,
    pub address: Option<String>,
    pub phone: String,
    pub website: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(rename = "updatedAt")]
    pub updated_at: Option<String>,
}

#[derive(FromRow, Serialize, Debug, Clone)]
pub struct Member {
    pub id: String,
    #[serde(rename = "schoolId")]
    pub school_id: String,
    #[serde(rename = "accountId")]
    pub account_id: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct SchoolListQuery {
    pub q: Option<String>,
    pub level: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSchoolRequest {
    pub name: String,
    pub level: Option<i64>,
    #[serde(rename = "ncesId")]
    pub nces_id: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
}

/// School detail view with its level label and membership count
#[derive(Debug, Serialize)]
pub struct SchoolResponse {
    #[serde(flatten)]
    pub school: School,
    #[serde(rename = "levelLabel")]
    pub level_label: Option<&'static str>,
    #[serde(rename = "memberCount")]
    pub member_count: i64,
}

/// One of the caller's school memberships
#[derive(Debug, Serialize)]
pub struct MembershipResponse {
    #[serde(rename = "memberId")]
    pub member_id: String,
    pub school: School,
    #[serde(rename = "joinedAt")]
    pub joined_at: String,
}
