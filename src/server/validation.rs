use crate::server::dto::{ExperiencePayload, LinkPayload, OrganizationPayload, ProjectPayload};
use crate::server::response::ApiError;

const MAX_NAME_LEN: usize = 100;
const MAX_DESCRIPTION_LEN: usize = 350;
const MAX_TAGS: usize = 10;
const MAX_TAG_LEN: usize = 30;

fn validate_name(name: &str, entity: &str) -> Result<(), ApiError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ApiError::bad_request(format!(
            "{entity} name cannot be empty"
        )));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(ApiError::bad_request(format!(
            "{entity} name cannot exceed {MAX_NAME_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_description(description: &str, entity: &str) -> Result<(), ApiError> {
    let trimmed = description.trim();
    if trimmed.is_empty() {
        return Err(ApiError::bad_request(format!(
            "{entity} description cannot be empty"
        )));
    }
    if trimmed.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(ApiError::bad_request(format!(
            "{entity} description cannot exceed {MAX_DESCRIPTION_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_optional_url(url: Option<&str>, field: &str) -> Result<(), ApiError> {
    if let Some(url) = url {
        if !url.starts_with("https://") && !url.starts_with("http://") {
            return Err(ApiError::bad_request(format!(
                "{field} must be an absolute http(s) url"
            )));
        }
    }
    Ok(())
}

pub fn validate_project_payload(payload: &ProjectPayload) -> Result<(), ApiError> {
    validate_name(&payload.name, "Project")?;
    validate_description(&payload.description, "Project")?;
    validate_optional_url(payload.github_url.as_deref(), "github_url")?;
    validate_optional_url(payload.deployment_url.as_deref(), "deployment_url")?;

    if payload.tags.len() > MAX_TAGS {
        return Err(ApiError::bad_request(format!(
            "A project cannot carry more than {MAX_TAGS} tags"
        )));
    }
    for tag in &payload.tags {
        if tag.trim().is_empty() || tag.chars().count() > MAX_TAG_LEN {
            return Err(ApiError::bad_request(format!(
                "Tags must be 1 to {MAX_TAG_LEN} characters"
            )));
        }
    }

    Ok(())
}

pub fn validate_experience_payload(payload: &ExperiencePayload) -> Result<(), ApiError> {
    validate_name(&payload.position, "Position")?;
    validate_name(&payload.company, "Company")?;
    if let Some(ended_at) = payload.ended_at {
        if ended_at < payload.started_at {
            return Err(ApiError::bad_request("ended_at cannot precede started_at"));
        }
    }
    Ok(())
}

pub fn validate_link_payload(payload: &LinkPayload) -> Result<(), ApiError> {
    validate_name(&payload.link_type, "Link type")?;
    validate_optional_url(Some(&payload.url), "url")?;
    validate_optional_url(payload.logo.as_deref(), "logo")?;
    Ok(())
}

pub fn validate_organization_payload(payload: &OrganizationPayload) -> Result<(), ApiError> {
    validate_name(&payload.name, "Organization")?;
    validate_description(&payload.description, "Organization")?;
    validate_optional_url(Some(&payload.url), "url")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Category;

    fn payload() -> ProjectPayload {
        ProjectPayload {
            name: "Campus Mapper".to_string(),
            description: "Maps the campus".to_string(),
            category: Category::WebDevelopment,
            programming_language: None,
            github_url: None,
            deployment_url: None,
            tags: vec![],
            user_ids: vec![],
            organization_id: None,
        }
    }

    #[test]
    fn test_accepts_minimal_payload() {
        assert!(validate_project_payload(&payload()).is_ok());
    }

    #[test]
    fn test_rejects_blank_and_oversized_fields() {
        let mut p = payload();
        p.name = "   ".to_string();
        assert!(validate_project_payload(&p).is_err());

        let mut p = payload();
        p.description = "x".repeat(351);
        assert!(validate_project_payload(&p).is_err());

        let mut p = payload();
        p.github_url = Some("github.com/foo/bar".to_string());
        assert!(validate_project_payload(&p).is_err());
    }

    #[test]
    fn test_rejects_inverted_experience_dates() {
        use chrono::TimeZone;
        let p = ExperiencePayload {
            position: "Backend Intern".to_string(),
            company: "Acme".to_string(),
            location: None,
            started_at: chrono::Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
            ended_at: Some(chrono::Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
        };
        assert!(validate_experience_payload(&p).is_err());
    }

    #[test]
    fn test_rejects_too_many_tags() {
        let mut p = payload();
        p.tags = (0..11).map(|i| format!("tag{i}")).collect();
        assert!(validate_project_payload(&p).is_err());
    }
}
