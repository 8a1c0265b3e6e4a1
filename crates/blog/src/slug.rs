//! Slug derivation and normalization.

use crate::error::{ServiceError, ServiceResult};

/// Derive a user slug from an email address.
///
/// `jane.doe@example.com` becomes `jane-doe-example-com`.
pub fn slug_from_email(email: &str) -> String {
    email.replace(['@', '.'], "-")
}

/// Lower-case a client-supplied slug and check it is URL-safe.
pub fn normalize_slug(raw: &str) -> ServiceResult<String> {
    let slug = raw.trim().to_lowercase();
    if slug.is_empty() {
        return Err(ServiceError::validation("slug: must not be empty"));
    }
    if !slug
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ServiceError::validation(format!(
            "slug: '{slug}' may only contain letters, digits, '-' and '_'"
        )));
    }
    Ok(slug)
}
