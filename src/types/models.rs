use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Category;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub github_login: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Avatar as delivered by the provider at first sign-in. `image` swaps
    /// between this and a generated placeholder via preferences.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Verified institutional email, set only by the sign-in domain gate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school_email: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    #[serde(skip)]
    pub token_hash: String,
    #[serde(skip)]
    pub token_lookup: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPreferences {
    pub user_id: String,
    pub show_email: bool,
    pub show_school_email: bool,
    pub show_generic_image: bool,
    pub show_work_experience: bool,
    pub show_organizations: bool,
    pub show_related_projects: bool,
}

impl UserPreferences {
    /// Defaults favor visibility, except the email fields and the generic
    /// avatar override.
    #[must_use]
    pub fn defaults_for(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            show_email: false,
            show_school_email: false,
            show_generic_image: false,
            show_work_experience: true,
            show_organizations: true,
            show_related_projects: true,
        }
    }
}

/// One employment entry on a profile, newest first in listings. Visibility
/// is controlled by the owner's `show_work_experience` flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkExperience {
    pub id: String,
    #[serde(skip)]
    pub user_id: String,
    pub position: String,
    pub company: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub started_at: DateTime<Utc>,
    /// `None` marks a current position.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
}

/// An external link on a profile (portfolio, LinkedIn, and the like).
/// Links are always public.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserLink {
    pub id: String,
    #[serde(skip)]
    pub user_id: String,
    pub url: String,
    pub link_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub programming_language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stars: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forks: Option<i64>,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

/// Lightweight member identity for detail payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberSummary {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageStat {
    pub language: String,
    pub count: i64,
    pub percentage: i64,
}

/// A materialized snapshot of aggregate language usage. Rows are append-only;
/// the latest by creation time is authoritative and recomputed once stale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub languages: Vec<LanguageStat>,
    pub total_projects: i64,
    pub created_at: DateTime<Utc>,
}
