mod schema;
mod sqlite;

pub mod query;

pub use query::{ListQuery, Page, clamp_limit};
pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::types::*;

/// Store defines the database interface.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // User operations
    fn create_user(&self, user: &User) -> Result<()>;
    fn get_user(&self, id: &str) -> Result<Option<User>>;
    fn get_user_by_github_login(&self, login: &str) -> Result<Option<User>>;
    fn set_user_school_email(&self, id: &str, email: &str) -> Result<()>;
    fn set_user_image(&self, id: &str, image: &str) -> Result<()>;
    fn list_user_ids(&self, q: &ListQuery) -> Result<Page>;
    fn count_user_projects(&self, user_id: &str) -> Result<i64>;
    fn list_user_project_ids(&self, user_id: &str, limit: Option<i64>) -> Result<Vec<String>>;
    fn list_user_organizations(&self, user_id: &str) -> Result<Vec<Organization>>;

    // Profile enrichment: employment history and external links. Deletes
    // are scoped to the owning user; a miss is NotFound either way.
    fn add_work_experience(&self, entry: &WorkExperience) -> Result<()>;
    fn list_work_experience(&self, user_id: &str) -> Result<Vec<WorkExperience>>;
    fn delete_work_experience(&self, id: &str, user_id: &str) -> Result<()>;
    fn add_user_link(&self, link: &UserLink) -> Result<()>;
    fn list_user_links(&self, user_id: &str) -> Result<Vec<UserLink>>;
    fn delete_user_link(&self, id: &str, user_id: &str) -> Result<()>;

    // Preference operations (1:1 with users)
    fn create_preferences(&self, prefs: &UserPreferences) -> Result<()>;
    fn get_preferences(&self, user_id: &str) -> Result<Option<UserPreferences>>;
    fn upsert_preferences(&self, prefs: &UserPreferences) -> Result<()>;

    // GitHub credential operations; the newest stored token wins
    fn store_github_token(&self, user_id: &str, access_token: &str) -> Result<()>;
    fn github_access_token(&self, user_id: &str) -> Result<Option<String>>;

    // Session operations
    fn create_session(&self, session: &Session) -> Result<()>;
    fn get_session_by_lookup(&self, lookup: &str) -> Result<Option<Session>>;
    fn update_session_last_used(&self, id: &str) -> Result<()>;
    fn delete_session(&self, id: &str) -> Result<bool>;

    // Project operations. Create/update run inside one transaction; update
    // verifies the acting user's membership before touching anything and
    // reconciles membership as a set diff.
    fn create_project(&self, project: &Project, member_ids: &[String]) -> Result<()>;
    fn get_project(&self, id: &str) -> Result<Option<Project>>;
    fn update_project(
        &self,
        project: &Project,
        member_ids: &[String],
        acting_user: &str,
    ) -> Result<()>;
    fn delete_project_as_member(&self, id: &str, user_id: &str) -> Result<()>;
    fn list_project_ids(&self, q: &ListQuery) -> Result<Page>;
    fn list_project_members(&self, project_id: &str) -> Result<Vec<MemberSummary>>;
    fn is_project_member(&self, project_id: &str, user_id: &str) -> Result<bool>;
    fn set_project_stats(&self, id: &str, stars: i64, forks: i64) -> Result<()>;

    // Like operations; toggle returns the resulting liked state
    fn toggle_like(&self, user_id: &str, project_id: &str) -> Result<bool>;
    fn is_liked(&self, user_id: &str, project_id: &str) -> Result<bool>;
    fn like_count(&self, project_id: &str) -> Result<i64>;

    // Organization operations, mirroring the project ownership rules
    fn create_organization(&self, org: &Organization, member_ids: &[String]) -> Result<()>;
    fn get_organization(&self, id: &str) -> Result<Option<Organization>>;
    fn update_organization(
        &self,
        org: &Organization,
        member_ids: &[String],
        acting_user: &str,
    ) -> Result<()>;
    fn delete_organization_as_member(&self, id: &str, user_id: &str) -> Result<()>;
    fn list_organization_ids(&self, q: &ListQuery) -> Result<Page>;
    fn list_organization_members(&self, org_id: &str) -> Result<Vec<MemberSummary>>;
    fn is_organization_member(&self, org_id: &str, user_id: &str) -> Result<bool>;
    fn list_organization_project_ids(&self, org_id: &str, limit: i64) -> Result<Vec<String>>;
    /// (project count, member count)
    fn organization_counts(&self, org_id: &str) -> Result<(i64, i64)>;
    fn list_organization_names(&self) -> Result<Vec<(String, String)>>;

    // Stats cache operations
    fn latest_stats(&self) -> Result<Option<StatsSnapshot>>;
    fn insert_stats(&self, snapshot: &StatsSnapshot) -> Result<()>;
    fn language_histogram(&self) -> Result<Vec<(String, i64)>>;
    fn count_projects(&self) -> Result<i64>;
}
