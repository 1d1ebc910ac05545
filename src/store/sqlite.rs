use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Row, Transaction, params, params_from_iter};

use super::Store;
use super::query::{ListQuery, Page, SqlFilter, clamp_limit, order_by};
use super::schema::SCHEMA;
use crate::error::{Error, Result};
use crate::types::*;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        github_login: row.get(1)?,
        name: row.get(2)?,
        image: row.get(3)?,
        original_image: row.get(4)?,
        email: row.get(5)?,
        school_email: row.get(6)?,
        created_at: parse_datetime(&row.get::<_, String>(7)?),
    })
}

const USER_COLUMNS: &str =
    "id, github_login, name, image, original_image, email, school_email, created_at";

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    let category: String = row.get(3)?;
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        category: Category::parse(&category).map_err(|_| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                rusqlite::types::Type::Text,
                format!("unknown category '{category}'").into(),
            )
        })?,
        programming_language: row.get(4)?,
        github_url: row.get(5)?,
        deployment_url: row.get(6)?,
        stars: row.get(7)?,
        forks: row.get(8)?,
        tags: Vec::new(),
        organization_id: row.get(9)?,
        created_at: parse_datetime(&row.get::<_, String>(10)?),
        updated_at: parse_datetime(&row.get::<_, String>(11)?),
    })
}

const PROJECT_COLUMNS: &str = "id, name, description, category, programming_language, github_url, \
     deployment_url, stars, forks, organization_id, created_at, updated_at";

fn organization_from_row(row: &Row<'_>) -> rusqlite::Result<Organization> {
    Ok(Organization {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        logo: row.get(3)?,
        url: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

const ORGANIZATION_COLUMNS: &str = "id, name, description, logo, url, created_at";

fn work_experience_from_row(row: &Row<'_>) -> rusqlite::Result<WorkExperience> {
    Ok(WorkExperience {
        id: row.get(0)?,
        user_id: row.get(1)?,
        position: row.get(2)?,
        company: row.get(3)?,
        location: row.get(4)?,
        started_at: parse_datetime(&row.get::<_, String>(5)?),
        ended_at: row
            .get::<_, Option<String>>(6)?
            .map(|s| parse_datetime(&s)),
    })
}

fn user_link_from_row(row: &Row<'_>) -> rusqlite::Result<UserLink> {
    Ok(UserLink {
        id: row.get(0)?,
        user_id: row.get(1)?,
        url: row.get(2)?,
        link_type: row.get(3)?,
        logo: row.get(4)?,
    })
}

/// Deduplicates member ids preserving first-occurrence order.
fn dedup_members(member_ids: &[String]) -> Vec<&str> {
    let mut seen = HashSet::new();
    member_ids
        .iter()
        .filter(|id| seen.insert(id.as_str()))
        .map(String::as_str)
        .collect()
}

/// Reconciles a membership join table against the desired member set as a
/// set-difference diff rather than a delete-all/recreate, so surviving rows
/// keep their created_at and the whole step stays inside the caller's
/// transaction.
fn sync_members(
    tx: &Transaction<'_>,
    table: &str,
    entity_col: &str,
    entity_id: &str,
    member_ids: &[String],
) -> Result<()> {
    let desired: Vec<&str> = dedup_members(member_ids);

    let current: Vec<String> = {
        let mut stmt = tx.prepare(&format!(
            "SELECT user_id FROM {table} WHERE {entity_col} = ?1"
        ))?;
        let rows = stmt.query_map(params![entity_id], |row| row.get(0))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()?
    };

    for user_id in &desired {
        if !current.iter().any(|c| c == user_id) {
            tx.execute(
                &format!("INSERT OR IGNORE INTO {table} (user_id, {entity_col}) VALUES (?1, ?2)"),
                params![user_id, entity_id],
            )?;
        }
    }

    for user_id in &current {
        if !desired.contains(&user_id.as_str()) {
            tx.execute(
                &format!("DELETE FROM {table} WHERE user_id = ?1 AND {entity_col} = ?2"),
                params![user_id, entity_id],
            )?;
        }
    }

    Ok(())
}

fn replace_tags(tx: &Transaction<'_>, project_id: &str, tags: &[String]) -> Result<()> {
    tx.execute(
        "DELETE FROM project_tags WHERE project_id = ?1",
        params![project_id],
    )?;
    let mut seen = HashSet::new();
    for (position, tag) in tags.iter().filter(|t| seen.insert(t.as_str())).enumerate() {
        tx.execute(
            "INSERT INTO project_tags (project_id, tag, position) VALUES (?1, ?2, ?3)",
            params![project_id, tag, position as i64],
        )?;
    }
    Ok(())
}

/// Runs a keyset-paginated id query: `limit + 1` rows are fetched and the
/// extra row, when present, becomes the continuation cursor.
fn paged_ids(
    conn: &Connection,
    table: &str,
    filter: &SqlFilter,
    sort_expr: &str,
    order: SortOrder,
    limit: i64,
) -> Result<Page> {
    let sql = format!(
        "SELECT id FROM {table} {} {} LIMIT ?",
        filter.where_sql(),
        order_by(sort_expr, order),
    );

    let mut values: Vec<Value> = filter.params().to_vec();
    values.push(Value::Integer(limit + 1));

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(values), |row| row.get::<_, String>(0))?;
    let mut ids = rows.collect::<std::result::Result<Vec<_>, _>>()?;

    let next_cursor = if ids.len() as i64 > limit {
        ids.pop()
    } else {
        None
    };

    Ok(Page { ids, next_cursor })
}

/// Resolves the cursor row's sort value, which anchors the keyset predicate.
fn cursor_key(conn: &Connection, table: &str, sort_expr: &str, cursor: &str) -> Result<Value> {
    conn.query_row(
        &format!("SELECT {sort_expr} FROM {table} WHERE id = ?1"),
        params![cursor],
        |row| row.get::<_, Value>(0),
    )
    .optional()?
    .ok_or_else(|| Error::InvalidInput(format!("unknown cursor '{cursor}'")))
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // User operations

    fn create_user(&self, user: &User) -> Result<()> {
        self.conn().execute(
            "INSERT INTO users (id, github_login, name, image, original_image, email, school_email, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                user.id,
                user.github_login,
                user.name,
                user.image,
                user.original_image,
                user.email,
                user.school_email,
                format_datetime(&user.created_at),
            ],
        )?;
        Ok(())
    }

    fn get_user(&self, id: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![id],
            user_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_user_by_github_login(&self, login: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE github_login = ?1"),
            params![login],
            user_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn set_user_school_email(&self, id: &str, email: &str) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE users SET school_email = ?1 WHERE id = ?2",
            params![email, id],
        )?;
        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn set_user_image(&self, id: &str, image: &str) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE users SET image = ?1 WHERE id = ?2",
            params![image, id],
        )?;
        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn list_user_ids(&self, q: &ListQuery) -> Result<Page> {
        let conn = self.conn();
        let limit = clamp_limit(Some(q.limit));
        let sort_expr = "created_at";

        let mut filter = SqlFilter::new();
        filter.text_contains(&["name"], q.text.as_deref());
        if let Some(cursor) = &q.cursor {
            let key = cursor_key(&conn, "users", sort_expr, cursor)?;
            filter.keyset(sort_expr, q.order, key, cursor);
        }

        paged_ids(&conn, "users", &filter, sort_expr, q.order, limit)
    }

    fn count_user_projects(&self, user_id: &str) -> Result<i64> {
        let conn = self.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM user_projects WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn list_user_project_ids(&self, user_id: &str, limit: Option<i64>) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT project_id FROM user_projects WHERE user_id = ?1
             ORDER BY created_at DESC, project_id LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![user_id, limit.unwrap_or(-1)], |row| row.get(0))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_user_organizations(&self, user_id: &str) -> Result<Vec<Organization>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM organizations o
             JOIN organization_members m ON o.id = m.organization_id
             WHERE m.user_id = ?1 ORDER BY o.name",
            ORGANIZATION_COLUMNS
                .split(", ")
                .map(|c| format!("o.{c}"))
                .collect::<Vec<_>>()
                .join(", ")
        ))?;
        let rows = stmt.query_map(params![user_id], organization_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Profile enrichment

    fn add_work_experience(&self, entry: &WorkExperience) -> Result<()> {
        self.conn().execute(
            "INSERT INTO work_experience (id, user_id, position, company, location, started_at, ended_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.id,
                entry.user_id,
                entry.position,
                entry.company,
                entry.location,
                format_datetime(&entry.started_at),
                entry.ended_at.as_ref().map(format_datetime),
            ],
        )?;
        Ok(())
    }

    fn list_work_experience(&self, user_id: &str) -> Result<Vec<WorkExperience>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, position, company, location, started_at, ended_at
             FROM work_experience WHERE user_id = ?1
             ORDER BY ended_at IS NULL DESC, started_at DESC",
        )?;
        let rows = stmt.query_map(params![user_id], work_experience_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_work_experience(&self, id: &str, user_id: &str) -> Result<()> {
        let affected = self.conn().execute(
            "DELETE FROM work_experience WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        if affected == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    fn add_user_link(&self, link: &UserLink) -> Result<()> {
        self.conn().execute(
            "INSERT INTO user_links (id, user_id, url, link_type, logo)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![link.id, link.user_id, link.url, link.link_type, link.logo],
        )?;
        Ok(())
    }

    fn list_user_links(&self, user_id: &str) -> Result<Vec<UserLink>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, url, link_type, logo
             FROM user_links WHERE user_id = ?1 ORDER BY rowid",
        )?;
        let rows = stmt.query_map(params![user_id], user_link_from_row)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_user_link(&self, id: &str, user_id: &str) -> Result<()> {
        let affected = self.conn().execute(
            "DELETE FROM user_links WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        if affected == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    // Preference operations

    fn create_preferences(&self, prefs: &UserPreferences) -> Result<()> {
        self.conn().execute(
            "INSERT INTO user_preferences (user_id, show_email, show_school_email, show_generic_image,
                                           show_work_experience, show_organizations, show_related_projects)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                prefs.user_id,
                prefs.show_email,
                prefs.show_school_email,
                prefs.show_generic_image,
                prefs.show_work_experience,
                prefs.show_organizations,
                prefs.show_related_projects,
            ],
        )?;
        Ok(())
    }

    fn get_preferences(&self, user_id: &str) -> Result<Option<UserPreferences>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT user_id, show_email, show_school_email, show_generic_image,
                    show_work_experience, show_organizations, show_related_projects
             FROM user_preferences WHERE user_id = ?1",
            params![user_id],
            |row| {
                Ok(UserPreferences {
                    user_id: row.get(0)?,
                    show_email: row.get(1)?,
                    show_school_email: row.get(2)?,
                    show_generic_image: row.get(3)?,
                    show_work_experience: row.get(4)?,
                    show_organizations: row.get(5)?,
                    show_related_projects: row.get(6)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn upsert_preferences(&self, prefs: &UserPreferences) -> Result<()> {
        self.conn().execute(
            "INSERT INTO user_preferences (user_id, show_email, show_school_email, show_generic_image,
                                           show_work_experience, show_organizations, show_related_projects)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT (user_id) DO UPDATE SET
                show_email = excluded.show_email,
                show_school_email = excluded.show_school_email,
                show_generic_image = excluded.show_generic_image,
                show_work_experience = excluded.show_work_experience,
                show_organizations = excluded.show_organizations,
                show_related_projects = excluded.show_related_projects",
            params![
                prefs.user_id,
                prefs.show_email,
                prefs.show_school_email,
                prefs.show_generic_image,
                prefs.show_work_experience,
                prefs.show_organizations,
                prefs.show_related_projects,
            ],
        )?;
        Ok(())
    }

    // GitHub credential operations

    fn store_github_token(&self, user_id: &str, access_token: &str) -> Result<()> {
        self.conn().execute(
            "INSERT INTO github_accounts (user_id, access_token, created_at) VALUES (?1, ?2, ?3)",
            params![user_id, access_token, format_datetime(&Utc::now())],
        )?;
        Ok(())
    }

    fn github_access_token(&self, user_id: &str) -> Result<Option<String>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT access_token FROM github_accounts WHERE user_id = ?1
             ORDER BY id DESC LIMIT 1",
            params![user_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(Error::from)
    }

    // Session operations

    fn create_session(&self, session: &Session) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO sessions (id, token_hash, token_lookup, user_id, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                session.id,
                session.token_hash,
                session.token_lookup,
                session.user_id,
                format_datetime(&session.created_at),
                session.expires_at.as_ref().map(format_datetime),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(Error::AlreadyExists)
            }
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_session_by_lookup(&self, lookup: &str) -> Result<Option<Session>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, token_hash, token_lookup, user_id, created_at, expires_at, last_used_at
             FROM sessions WHERE token_lookup = ?1",
            params![lookup],
            |row| {
                Ok(Session {
                    id: row.get(0)?,
                    token_hash: row.get(1)?,
                    token_lookup: row.get(2)?,
                    user_id: row.get(3)?,
                    created_at: parse_datetime(&row.get::<_, String>(4)?),
                    expires_at: row.get::<_, Option<String>>(5)?.map(|s| parse_datetime(&s)),
                    last_used_at: row.get::<_, Option<String>>(6)?.map(|s| parse_datetime(&s)),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn update_session_last_used(&self, id: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE sessions SET last_used_at = ?1 WHERE id = ?2",
            params![format_datetime(&Utc::now()), id],
        )?;
        Ok(())
    }

    fn delete_session(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM sessions WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Project operations

    fn create_project(&self, project: &Project, member_ids: &[String]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO projects (id, name, description, category, programming_language, github_url,
                                   deployment_url, stars, forks, organization_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                project.id,
                project.name,
                project.description,
                project.category.as_str(),
                project.programming_language,
                project.github_url,
                project.deployment_url,
                project.stars,
                project.forks,
                project.organization_id,
                format_datetime(&project.created_at),
                format_datetime(&project.updated_at),
            ],
        )?;

        replace_tags(&tx, &project.id, &project.tags)?;
        sync_members(&tx, "user_projects", "project_id", &project.id, member_ids)?;

        tx.commit()?;
        Ok(())
    }

    fn get_project(&self, id: &str) -> Result<Option<Project>> {
        let conn = self.conn();
        let project = conn
            .query_row(
                &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?1"),
                params![id],
                project_from_row,
            )
            .optional()?;

        let Some(mut project) = project else {
            return Ok(None);
        };

        let mut stmt =
            conn.prepare("SELECT tag FROM project_tags WHERE project_id = ?1 ORDER BY position")?;
        let rows = stmt.query_map(params![id], |row| row.get(0))?;
        project.tags = rows.collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Some(project))
    }

    fn update_project(
        &self,
        project: &Project,
        member_ids: &[String],
        acting_user: &str,
    ) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let exists: Option<i64> = tx
            .query_row(
                "SELECT 1 FROM projects WHERE id = ?1",
                params![project.id],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Err(Error::NotFound);
        }

        let is_member: Option<i64> = tx
            .query_row(
                "SELECT 1 FROM user_projects WHERE project_id = ?1 AND user_id = ?2",
                params![project.id, acting_user],
                |row| row.get(0),
            )
            .optional()?;
        if is_member.is_none() {
            return Err(Error::Forbidden);
        }

        // Stars/forks only move on a successful external fetch; absent values
        // leave the previously stored stats untouched.
        tx.execute(
            "UPDATE projects SET name = ?1, description = ?2, category = ?3,
                    programming_language = ?4, github_url = ?5, deployment_url = ?6,
                    stars = COALESCE(?7, stars), forks = COALESCE(?8, forks),
                    organization_id = ?9, updated_at = ?10
             WHERE id = ?11",
            params![
                project.name,
                project.description,
                project.category.as_str(),
                project.programming_language,
                project.github_url,
                project.deployment_url,
                project.stars,
                project.forks,
                project.organization_id,
                format_datetime(&Utc::now()),
                project.id,
            ],
        )?;

        replace_tags(&tx, &project.id, &project.tags)?;
        sync_members(&tx, "user_projects", "project_id", &project.id, member_ids)?;

        tx.commit()?;
        Ok(())
    }

    fn delete_project_as_member(&self, id: &str, user_id: &str) -> Result<()> {
        // Authorization is the delete's own filter, so a missing row and a
        // non-member are indistinguishable to the caller.
        let rows = self.conn().execute(
            "DELETE FROM projects WHERE id = ?1
             AND EXISTS (SELECT 1 FROM user_projects WHERE project_id = ?1 AND user_id = ?2)",
            params![id, user_id],
        )?;
        if rows == 0 {
            return Err(Error::NotFoundOrForbidden);
        }
        Ok(())
    }

    fn list_project_ids(&self, q: &ListQuery) -> Result<Page> {
        let conn = self.conn();
        let limit = clamp_limit(Some(q.limit));
        let sort_expr = q.sort.sql_expr();

        let categories: Vec<String> = q.categories.iter().map(|c| c.as_str().to_string()).collect();

        let mut filter = SqlFilter::new();
        filter
            .text_contains(&["name", "description"], q.text.as_deref())
            .any_of("category", &categories)
            .any_of("programming_language", &q.languages)
            .tags_overlap(&q.tags);
        if let Some(cursor) = &q.cursor {
            let key = cursor_key(&conn, "projects", sort_expr, cursor)?;
            filter.keyset(sort_expr, q.order, key, cursor);
        }

        paged_ids(&conn, "projects", &filter, sort_expr, q.order, limit)
    }

    fn list_project_members(&self, project_id: &str) -> Result<Vec<MemberSummary>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT u.id, u.name, u.image FROM users u
             JOIN user_projects up ON u.id = up.user_id
             WHERE up.project_id = ?1 ORDER BY u.name",
        )?;
        let rows = stmt.query_map(params![project_id], |row| {
            Ok(MemberSummary {
                id: row.get(0)?,
                name: row.get(1)?,
                image: row.get(2)?,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn is_project_member(&self, project_id: &str, user_id: &str) -> Result<bool> {
        let conn = self.conn();
        let row: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM user_projects WHERE project_id = ?1 AND user_id = ?2",
                params![project_id, user_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(row.is_some())
    }

    fn set_project_stats(&self, id: &str, stars: i64, forks: i64) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE projects SET stars = ?1, forks = ?2 WHERE id = ?3",
            params![stars, forks, id],
        )?;
        if rows == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    // Like operations

    fn toggle_like(&self, user_id: &str, project_id: &str) -> Result<bool> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let deleted = tx.execute(
            "DELETE FROM project_likes WHERE user_id = ?1 AND project_id = ?2",
            params![user_id, project_id],
        )?;

        let liked = if deleted > 0 {
            false
        } else {
            // OR IGNORE keeps a concurrent duplicate insert from failing the
            // toggle; the unique key guarantees at most one row per pair.
            tx.execute(
                "INSERT OR IGNORE INTO project_likes (user_id, project_id, created_at)
                 VALUES (?1, ?2, ?3)",
                params![user_id, project_id, format_datetime(&Utc::now())],
            )?;
            true
        };

        tx.commit()?;
        Ok(liked)
    }

    fn is_liked(&self, user_id: &str, project_id: &str) -> Result<bool> {
        let conn = self.conn();
        let row: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM project_likes WHERE user_id = ?1 AND project_id = ?2",
                params![user_id, project_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(row.is_some())
    }

    fn like_count(&self, project_id: &str) -> Result<i64> {
        let conn = self.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM project_likes WHERE project_id = ?1",
            params![project_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // Organization operations

    fn create_organization(&self, org: &Organization, member_ids: &[String]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO organizations (id, name, description, logo, url, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                org.id,
                org.name,
                org.description,
                org.logo,
                org.url,
                format_datetime(&org.created_at),
            ],
        )?;

        sync_members(
            &tx,
            "organization_members",
            "organization_id",
            &org.id,
            member_ids,
        )?;

        tx.commit()?;
        Ok(())
    }

    fn get_organization(&self, id: &str) -> Result<Option<Organization>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {ORGANIZATION_COLUMNS} FROM organizations WHERE id = ?1"),
            params![id],
            organization_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn update_organization(
        &self,
        org: &Organization,
        member_ids: &[String],
        acting_user: &str,
    ) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let exists: Option<i64> = tx
            .query_row(
                "SELECT 1 FROM organizations WHERE id = ?1",
                params![org.id],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Err(Error::NotFound);
        }

        let is_member: Option<i64> = tx
            .query_row(
                "SELECT 1 FROM organization_members WHERE organization_id = ?1 AND user_id = ?2",
                params![org.id, acting_user],
                |row| row.get(0),
            )
            .optional()?;
        if is_member.is_none() {
            return Err(Error::Forbidden);
        }

        tx.execute(
            "UPDATE organizations SET name = ?1, description = ?2,
                    logo = COALESCE(?3, logo), url = ?4
             WHERE id = ?5",
            params![org.name, org.description, org.logo, org.url, org.id],
        )?;

        sync_members(
            &tx,
            "organization_members",
            "organization_id",
            &org.id,
            member_ids,
        )?;

        tx.commit()?;
        Ok(())
    }

    fn delete_organization_as_member(&self, id: &str, user_id: &str) -> Result<()> {
        let rows = self.conn().execute(
            "DELETE FROM organizations WHERE id = ?1
             AND EXISTS (SELECT 1 FROM organization_members
                         WHERE organization_id = ?1 AND user_id = ?2)",
            params![id, user_id],
        )?;
        if rows == 0 {
            return Err(Error::NotFoundOrForbidden);
        }
        Ok(())
    }

    fn list_organization_ids(&self, q: &ListQuery) -> Result<Page> {
        let conn = self.conn();
        let limit = clamp_limit(Some(q.limit));
        let sort_expr = "created_at";

        let mut filter = SqlFilter::new();
        filter.text_contains(&["name", "description"], q.text.as_deref());
        if let Some(cursor) = &q.cursor {
            let key = cursor_key(&conn, "organizations", sort_expr, cursor)?;
            filter.keyset(sort_expr, q.order, key, cursor);
        }

        paged_ids(&conn, "organizations", &filter, sort_expr, q.order, limit)
    }

    fn list_organization_members(&self, org_id: &str) -> Result<Vec<MemberSummary>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT u.id, u.name, u.image FROM users u
             JOIN organization_members m ON u.id = m.user_id
             WHERE m.organization_id = ?1 ORDER BY u.name",
        )?;
        let rows = stmt.query_map(params![org_id], |row| {
            Ok(MemberSummary {
                id: row.get(0)?,
                name: row.get(1)?,
                image: row.get(2)?,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn is_organization_member(&self, org_id: &str, user_id: &str) -> Result<bool> {
        let conn = self.conn();
        let row: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM organization_members WHERE organization_id = ?1 AND user_id = ?2",
                params![org_id, user_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(row.is_some())
    }

    fn list_organization_project_ids(&self, org_id: &str, limit: i64) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id FROM projects WHERE organization_id = ?1
             ORDER BY updated_at DESC, id LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![org_id, limit], |row| row.get(0))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn organization_counts(&self, org_id: &str) -> Result<(i64, i64)> {
        let conn = self.conn();
        let projects: i64 = conn.query_row(
            "SELECT COUNT(*) FROM projects WHERE organization_id = ?1",
            params![org_id],
            |row| row.get(0),
        )?;
        let members: i64 = conn.query_row(
            "SELECT COUNT(*) FROM organization_members WHERE organization_id = ?1",
            params![org_id],
            |row| row.get(0),
        )?;
        Ok((projects, members))
    }

    fn list_organization_names(&self) -> Result<Vec<(String, String)>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT id, name FROM organizations ORDER BY name")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Stats cache operations

    fn latest_stats(&self) -> Result<Option<StatsSnapshot>> {
        let conn = self.conn();
        let row: Option<(String, i64, String)> = conn
            .query_row(
                "SELECT languages, total_projects, created_at FROM stats_cache
                 ORDER BY id DESC LIMIT 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let Some((languages, total_projects, created_at)) = row else {
            return Ok(None);
        };

        let languages: Vec<LanguageStat> = serde_json::from_str(&languages)
            .map_err(|e| Error::InvalidInput(format!("corrupt stats snapshot: {e}")))?;

        Ok(Some(StatsSnapshot {
            languages,
            total_projects,
            created_at: parse_datetime(&created_at),
        }))
    }

    fn insert_stats(&self, snapshot: &StatsSnapshot) -> Result<()> {
        let languages = serde_json::to_string(&snapshot.languages)
            .map_err(|e| Error::InvalidInput(format!("unserializable stats snapshot: {e}")))?;
        self.conn().execute(
            "INSERT INTO stats_cache (languages, total_projects, created_at) VALUES (?1, ?2, ?3)",
            params![
                languages,
                snapshot.total_projects,
                format_datetime(&snapshot.created_at),
            ],
        )?;
        Ok(())
    }

    fn language_histogram(&self) -> Result<Vec<(String, i64)>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT programming_language, COUNT(*) FROM projects
             WHERE programming_language IS NOT NULL
             GROUP BY programming_language ORDER BY COUNT(*) DESC, programming_language",
        )?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn count_projects(&self) -> Result<i64> {
        let conn = self.conn();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM projects", [], |row| row.get(0))?;
        Ok(count)
    }
}
