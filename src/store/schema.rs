pub const SCHEMA: &str = r#"
-- Directory members, created by the sign-in domain gate
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    github_login TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    image TEXT,
    original_image TEXT,
    email TEXT,
    school_email TEXT,        -- set only after domain verification
    created_at TEXT DEFAULT (datetime('now'))
);

-- Stored GitHub credentials; newest row per user wins
CREATE TABLE IF NOT EXISTS github_accounts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    access_token TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now'))
);

-- API session tokens issued after a successful sign-in
CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    token_hash TEXT NOT NULL,          -- argon2id hash with embedded salt
    token_lookup TEXT NOT NULL,        -- short prefix for fast lookup
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at TEXT DEFAULT (datetime('now')),
    expires_at TEXT,                   -- NULL = never
    last_used_at TEXT
);

-- Per-user visibility flags (1:1 with users)
CREATE TABLE IF NOT EXISTS user_preferences (
    user_id TEXT PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
    show_email INTEGER NOT NULL DEFAULT 0,
    show_school_email INTEGER NOT NULL DEFAULT 0,
    show_generic_image INTEGER NOT NULL DEFAULT 0,
    show_work_experience INTEGER NOT NULL DEFAULT 1,
    show_organizations INTEGER NOT NULL DEFAULT 1,
    show_related_projects INTEGER NOT NULL DEFAULT 1
);

-- Employment history shown on profiles, gated by show_work_experience
CREATE TABLE IF NOT EXISTS work_experience (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    position TEXT NOT NULL,
    company TEXT NOT NULL,
    location TEXT,
    started_at TEXT NOT NULL,
    ended_at TEXT                      -- NULL = current position
);

-- External profile links; always public
CREATE TABLE IF NOT EXISTS user_links (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    url TEXT NOT NULL,
    link_type TEXT NOT NULL,
    logo TEXT
);

CREATE TABLE IF NOT EXISTS organizations (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    logo TEXT,
    url TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS projects (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    category TEXT NOT NULL,
    programming_language TEXT,
    github_url TEXT,
    deployment_url TEXT,

    -- Cached external stats; NULL until a successful GitHub fetch
    stars INTEGER,
    forks INTEGER,

    organization_id TEXT REFERENCES organizations(id) ON DELETE SET NULL,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

-- Ordered free-text labels on a project
CREATE TABLE IF NOT EXISTS project_tags (
    project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    tag TEXT NOT NULL,
    position INTEGER NOT NULL,
    PRIMARY KEY (project_id, tag)
);

-- Authorship doubles as edit authorization: membership = ownership
CREATE TABLE IF NOT EXISTS user_projects (
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    created_at TEXT DEFAULT (datetime('now')),
    PRIMARY KEY (user_id, project_id)
);

CREATE TABLE IF NOT EXISTS organization_members (
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    organization_id TEXT NOT NULL REFERENCES organizations(id) ON DELETE CASCADE,
    created_at TEXT DEFAULT (datetime('now')),
    PRIMARY KEY (user_id, organization_id)
);

-- Upvotes; existence = liked, uniqueness is a correctness guarantee
CREATE TABLE IF NOT EXISTS project_likes (
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    created_at TEXT DEFAULT (datetime('now')),
    PRIMARY KEY (user_id, project_id)
);

-- Append-only aggregate snapshots; latest row is authoritative
CREATE TABLE IF NOT EXISTS stats_cache (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    languages TEXT NOT NULL,           -- JSON array of {language, count, percentage}
    total_projects INTEGER NOT NULL,
    created_at TEXT NOT NULL
);

-- Create indexes
CREATE UNIQUE INDEX IF NOT EXISTS idx_sessions_lookup ON sessions(token_lookup);
CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id);
CREATE INDEX IF NOT EXISTS idx_github_accounts_user ON github_accounts(user_id);
CREATE INDEX IF NOT EXISTS idx_work_experience_user ON work_experience(user_id);
CREATE INDEX IF NOT EXISTS idx_user_links_user ON user_links(user_id);
CREATE INDEX IF NOT EXISTS idx_projects_category ON projects(category);
CREATE INDEX IF NOT EXISTS idx_projects_language ON projects(programming_language);
CREATE INDEX IF NOT EXISTS idx_projects_updated ON projects(updated_at);
CREATE INDEX IF NOT EXISTS idx_projects_org ON projects(organization_id);
CREATE INDEX IF NOT EXISTS idx_project_tags_tag ON project_tags(tag);
CREATE INDEX IF NOT EXISTS idx_user_projects_project ON user_projects(project_id);
CREATE INDEX IF NOT EXISTS idx_org_members_org ON organization_members(organization_id);
CREATE INDEX IF NOT EXISTS idx_project_likes_project ON project_likes(project_id);
"#;
