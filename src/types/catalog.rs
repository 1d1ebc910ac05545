use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Closed set of project categories. The string forms are the canonical
/// labels used in the database, in filters, and in the catalog endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Web Development")]
    WebDevelopment,
    #[serde(rename = "Mobile Development")]
    MobileDevelopment,
    #[serde(rename = "Data Science")]
    DataScience,
    #[serde(rename = "Machine Learning")]
    MachineLearning,
    #[serde(rename = "DevOps")]
    DevOps,
    #[serde(rename = "Game Development")]
    GameDevelopment,
    #[serde(rename = "Desktop Application")]
    DesktopApplication,
    #[serde(rename = "API/Backend")]
    ApiBackend,
    #[serde(rename = "CLI")]
    Cli,
    #[serde(rename = "Robotics")]
    Robotics,
    #[serde(rename = "Other")]
    Other,
}

pub const ALL_CATEGORIES: [Category; 11] = [
    Category::WebDevelopment,
    Category::MobileDevelopment,
    Category::DataScience,
    Category::MachineLearning,
    Category::DevOps,
    Category::GameDevelopment,
    Category::DesktopApplication,
    Category::ApiBackend,
    Category::Cli,
    Category::Robotics,
    Category::Other,
];

impl Category {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::WebDevelopment => "Web Development",
            Category::MobileDevelopment => "Mobile Development",
            Category::DataScience => "Data Science",
            Category::MachineLearning => "Machine Learning",
            Category::DevOps => "DevOps",
            Category::GameDevelopment => "Game Development",
            Category::DesktopApplication => "Desktop Application",
            Category::ApiBackend => "API/Backend",
            Category::Cli => "CLI",
            Category::Robotics => "Robotics",
            Category::Other => "Other",
        }
    }

    pub fn parse(label: &str) -> Result<Self> {
        ALL_CATEGORIES
            .into_iter()
            .find(|c| c.as_str() == label)
            .ok_or_else(|| Error::InvalidInput(format!("unknown category '{label}'")))
    }
}

/// Sort keys for project listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    CreatedAt,
    #[default]
    UpdatedAt,
    Stars,
}

impl SortKey {
    /// SQL expression yielding the sort value. Stars are coalesced below any
    /// real count so projects without stored stats rank last on descending.
    #[must_use]
    pub fn sql_expr(&self) -> &'static str {
        match self {
            SortKey::CreatedAt => "created_at",
            SortKey::UpdatedAt => "updated_at",
            SortKey::Stars => "COALESCE(stars, -1)",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Suggested tags surfaced by the catalog endpoint. Stored tags are free
/// text; this list only seeds the editor UI.
pub const POPULAR_TAGS: &[&str] = &[
    "React",
    "Next.js",
    "TypeScript",
    "JavaScript",
    "Python",
    "Node.js",
    "Express",
    "MongoDB",
    "PostgreSQL",
    "Firebase",
    "AWS",
    "Docker",
    "Machine Learning",
    "AI",
    "Flutter",
    "React Native",
    "Vue.js",
    "Angular",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_roundtrip() {
        for cat in ALL_CATEGORIES {
            assert_eq!(Category::parse(cat.as_str()).unwrap(), cat);
        }
    }

    #[test]
    fn unknown_category_rejected() {
        assert!(Category::parse("Blockchain").is_err());
    }

    #[test]
    fn sort_defaults() {
        assert_eq!(SortKey::default(), SortKey::UpdatedAt);
        assert_eq!(SortOrder::default(), SortOrder::Desc);
    }
}
