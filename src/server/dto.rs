use serde::{Deserialize, Serialize};

use crate::server::response::ApiError;
use crate::store::{ListQuery, clamp_limit};
use crate::types::{
    Category, MemberSummary, Organization, Project, SortKey, SortOrder, User, UserLink,
    UserPreferences, WorkExperience,
};

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub github_login: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    pub access_token: String,
}

#[derive(Debug, Serialize)]
pub struct SignInResponse {
    pub token: String,
    pub user: User,
}

/// Query parameters shared by the list endpoints. Multi-value filters are
/// comma-separated single parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub sort_by: Option<SortKey>,
    #[serde(default)]
    pub order: Option<SortOrder>,
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
}

fn split_csv(value: Option<&str>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

impl ListParams {
    /// Unknown category labels are a client error rather than an empty
    /// result, so typos surface immediately.
    pub fn into_query(self) -> Result<ListQuery, ApiError> {
        let categories = split_csv(self.category.as_deref())
            .iter()
            .map(|label| Category::parse(label))
            .collect::<crate::error::Result<Vec<_>>>()?;

        Ok(ListQuery {
            text: self.text,
            categories,
            languages: split_csv(self.language.as_deref()),
            tags: split_csv(self.tag.as_deref()),
            sort: self.sort_by.unwrap_or_default(),
            order: self.order.unwrap_or_default(),
            cursor: self.cursor,
            limit: clamp_limit(self.limit),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ProjectPayload {
    pub name: String,
    pub description: String,
    pub category: Category,
    #[serde(default)]
    pub programming_language: Option<String>,
    #[serde(default)]
    pub github_url: Option<String>,
    #[serde(default)]
    pub deployment_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub user_ids: Vec<String>,
    #[serde(default)]
    pub organization_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OrganizationPayload {
    pub name: String,
    pub description: String,
    pub url: String,
    #[serde(default)]
    pub user_ids: Vec<String>,
}

/// Partial preference update; absent fields keep their stored value.
#[derive(Debug, Default, Deserialize)]
pub struct PreferencesPatch {
    #[serde(default)]
    pub show_email: Option<bool>,
    #[serde(default)]
    pub show_school_email: Option<bool>,
    #[serde(default)]
    pub show_generic_image: Option<bool>,
    #[serde(default)]
    pub show_work_experience: Option<bool>,
    #[serde(default)]
    pub show_organizations: Option<bool>,
    #[serde(default)]
    pub show_related_projects: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct ProjectResponse {
    #[serde(flatten)]
    pub project: Project,
    pub members: Vec<MemberSummary>,
    pub like_count: i64,
}

#[derive(Debug, Serialize)]
pub struct OrganizationResponse {
    #[serde(flatten)]
    pub organization: Organization,
    pub members: Vec<MemberSummary>,
    pub project_ids: Vec<String>,
    pub project_count: i64,
    pub member_count: i64,
}

/// A user as others see them, after privacy preferences are applied.
#[derive(Debug, Serialize)]
pub struct PublicProfileResponse {
    #[serde(flatten)]
    pub user: User,
    pub work_experience: Vec<WorkExperience>,
    pub links: Vec<UserLink>,
    pub organizations: Vec<Organization>,
    pub project_ids: Vec<String>,
}

/// The signed-in user's own profile; nothing is redacted.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub user: User,
    pub preferences: UserPreferences,
    pub work_experience: Vec<WorkExperience>,
    pub links: Vec<UserLink>,
    pub organizations: Vec<Organization>,
    pub project_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExperiencePayload {
    pub position: String,
    pub company: String,
    #[serde(default)]
    pub location: Option<String>,
    pub started_at: chrono::DateTime<chrono::Utc>,
    #[serde(default)]
    pub ended_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct LinkPayload {
    pub url: String,
    pub link_type: String,
    #[serde(default)]
    pub logo: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CanEditResponse {
    pub can_edit: bool,
}

#[derive(Debug, Serialize)]
pub struct LikeStatusResponse {
    pub liked: bool,
}

#[derive(Debug, Serialize)]
pub struct LikeCountResponse {
    pub likes: i64,
}

#[derive(Debug, Serialize)]
pub struct ProjectCountResponse {
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct OrganizationName {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct CatalogResponse {
    pub categories: Vec<&'static str>,
    pub popular_tags: Vec<&'static str>,
    pub sort_keys: Vec<SortKey>,
    pub sort_orders: Vec<SortOrder>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RepoPreviewParams {
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_splitting_skips_blanks() {
        assert_eq!(
            split_csv(Some("Rust, Go,,  ,TypeScript")),
            vec!["Rust".to_string(), "Go".to_string(), "TypeScript".to_string()]
        );
        assert!(split_csv(None).is_empty());
        assert!(split_csv(Some("")).is_empty());
    }

    #[test]
    fn test_into_query_rejects_unknown_category() {
        let params = ListParams {
            category: Some("Web Development,Nonsense".to_string()),
            ..Default::default()
        };
        assert!(params.into_query().is_err());
    }

    #[test]
    fn test_into_query_applies_defaults() {
        let query = ListParams::default().into_query().unwrap();
        assert_eq!(query.limit, 5);
        assert_eq!(query.sort, SortKey::UpdatedAt);
        assert_eq!(query.order, SortOrder::Desc);
        assert!(query.categories.is_empty());
    }
}
