use std::sync::Arc;

use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};
use chrono::{DateTime, Duration, Utc};

use crate::server::AppState;
use crate::server::response::{ApiError, ApiResponse};
use crate::types::{LanguageStat, StatsSnapshot};

pub fn stats_router() -> Router<Arc<AppState>> {
    Router::new().route("/stats/languages", get(language_stats))
}

const SNAPSHOT_MAX_AGE_HOURS: i64 = 24;
const TOP_LANGUAGES: usize = 6;

/// Folds a language histogram into the published snapshot: the six most
/// common languages keep their names, everything else collapses into an
/// "Other" bucket. Percentages are integer-truncated shares of all projects
/// that declare a language.
pub fn build_snapshot(
    histogram: Vec<(String, i64)>,
    total_projects: i64,
    now: DateTime<Utc>,
) -> StatsSnapshot {
    let with_language: i64 = histogram.iter().map(|(_, count)| count).sum();

    let mut languages = Vec::new();
    let mut other = 0;
    for (i, (language, count)) in histogram.into_iter().enumerate() {
        if i < TOP_LANGUAGES {
            languages.push(LanguageStat {
                language,
                count,
                percentage: if with_language > 0 {
                    count * 100 / with_language
                } else {
                    0
                },
            });
        } else {
            other += count;
        }
    }

    if other > 0 {
        languages.push(LanguageStat {
            language: "Other".to_string(),
            count: other,
            percentage: other * 100 / with_language,
        });
    }

    StatsSnapshot {
        languages,
        total_projects,
        created_at: now,
    }
}

/// Serves the language breakdown from an append-only snapshot cache,
/// recomputing when the newest snapshot is older than a day.
async fn language_stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let store = state.store.as_ref();
    let now = Utc::now();

    if let Some(snapshot) = store.latest_stats()? {
        if now - snapshot.created_at < Duration::hours(SNAPSHOT_MAX_AGE_HOURS) {
            return Ok::<_, ApiError>(Json(ApiResponse::success(snapshot)));
        }
    }

    let snapshot = build_snapshot(store.language_histogram()?, store.count_projects()?, now);
    store.insert_stats(&snapshot)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(snapshot)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_languages_keep_their_names() {
        let histogram = vec![
            ("TypeScript".to_string(), 10),
            ("Python".to_string(), 5),
            ("Rust".to_string(), 5),
        ];
        let snapshot = build_snapshot(histogram, 25, Utc::now());

        assert_eq!(snapshot.total_projects, 25);
        assert_eq!(snapshot.languages.len(), 3);
        assert_eq!(snapshot.languages[0].language, "TypeScript");
        assert_eq!(snapshot.languages[0].percentage, 50);
        assert_eq!(snapshot.languages[1].percentage, 25);
    }

    #[test]
    fn test_tail_collapses_into_other() {
        let histogram: Vec<(String, i64)> = (0..9).map(|i| (format!("Lang{i}"), 10 - i)).collect();
        let snapshot = build_snapshot(histogram, 100, Utc::now());

        assert_eq!(snapshot.languages.len(), 7);
        let other = snapshot.languages.last().unwrap();
        assert_eq!(other.language, "Other");
        // Lang6 + Lang7 + Lang8 = 4 + 3 + 2
        assert_eq!(other.count, 9);
    }

    #[test]
    fn test_empty_histogram_produces_empty_snapshot() {
        let snapshot = build_snapshot(Vec::new(), 0, Utc::now());
        assert!(snapshot.languages.is_empty());
        assert_eq!(snapshot.total_projects, 0);
    }
}
