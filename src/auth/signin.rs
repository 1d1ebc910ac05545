//! Email-domain gating for sign-in.
//!
//! Membership in the community is decided by whether the GitHub account
//! carries an email address under one of the allowed domains. The public
//! profile email is checked first; when that misses, the account's verified
//! email list is consulted.

use crate::github::EmailEntry;

/// Whether an email address falls under one of the allowed domain suffixes.
/// Comparison is case-insensitive on both sides.
pub fn email_allowed(email: &str, domains: &[String]) -> bool {
    let email = email.to_lowercase();
    domains.iter().any(|d| email.ends_with(&d.to_lowercase()))
}

/// Picks the email to record as the user's school email.
///
/// Preference order: the profile email when it matches, then the account's
/// verified emails with primary ones first. Unverified addresses never
/// qualify.
pub fn select_school_email(
    profile_email: Option<&str>,
    entries: &[EmailEntry],
    domains: &[String],
) -> Option<String> {
    if let Some(email) = profile_email {
        if email_allowed(email, domains) {
            return Some(email.to_string());
        }
    }

    let mut candidates: Vec<&EmailEntry> = entries
        .iter()
        .filter(|e| e.verified && email_allowed(&e.email, domains))
        .collect();
    candidates.sort_by_key(|e| !e.primary);

    candidates.first().map(|e| e.email.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn domains() -> Vec<String> {
        vec!["@tec.mx".to_string(), "@exatec.mx".to_string()]
    }

    fn entry(email: &str, primary: bool, verified: bool) -> EmailEntry {
        EmailEntry {
            email: email.to_string(),
            primary,
            verified,
        }
    }

    #[test]
    fn test_email_allowed_is_case_insensitive() {
        assert!(email_allowed("A01234@TEC.MX", &domains()));
        assert!(email_allowed("alum@exatec.mx", &domains()));
        assert!(!email_allowed("someone@gmail.com", &domains()));
        // Suffix must include the @ so lookalike domains fail.
        assert!(!email_allowed("someone@nottec.mx.evil.com", &domains()));
    }

    #[test]
    fn test_profile_email_wins_when_it_matches() {
        let entries = vec![entry("other@tec.mx", true, true)];
        assert_eq!(
            select_school_email(Some("me@tec.mx"), &entries, &domains()),
            Some("me@tec.mx".to_string())
        );
    }

    #[test]
    fn test_falls_back_to_verified_primary() {
        let entries = vec![
            entry("secondary@tec.mx", false, true),
            entry("primary@tec.mx", true, true),
        ];
        assert_eq!(
            select_school_email(Some("me@gmail.com"), &entries, &domains()),
            Some("primary@tec.mx".to_string())
        );
    }

    #[test]
    fn test_unverified_emails_never_qualify() {
        let entries = vec![entry("fake@tec.mx", true, false)];
        assert_eq!(select_school_email(None, &entries, &domains()), None);
    }
}
