mod catalog;
mod models;

pub use catalog::{ALL_CATEGORIES, Category, POPULAR_TAGS, SortKey, SortOrder};
pub use models::*;
