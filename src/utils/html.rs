use ammonia;

use crate::error::AppError;

/// Clean HTML content using the ammonia library.
///
/// Whitelist-based: safe tags (like <b>, <p>) survive, dangerous tags (like
/// <script>, <iframe>) and attributes (like onclick) are stripped.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

/// Cleans a user-supplied text field and rejects it if nothing is left.
pub fn clean_required(field: &str, input: &str) -> Result<String, AppError> {
    let cleaned = clean_html(input.trim());
    if cleaned.trim().is_empty() {
        return Err(AppError::BadRequest(format!("{} cannot be empty", field)));
    }
    Ok(cleaned)
}
