//! URL normalization for endpoint construction.
//!
//! Trailing slashes on configured base URLs would otherwise produce double
//! slashes when the messages endpoint is appended.

/// Remove trailing slashes from a base URL.
///
/// # Examples
///
/// ```
/// use felichat::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("http://localhost:8000"), "http://localhost:8000");
/// assert_eq!(normalize_base_url("http://localhost:8000/"), "http://localhost:8000");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Join a base URL and an endpoint path with exactly one slash between them.
///
/// # Examples
///
/// ```
/// use felichat::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("http://localhost:8000/", "api/messages"),
///     "http://localhost:8000/api/messages"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let normalized_base = normalize_base_url(base_url);
    let endpoint = endpoint.trim_start_matches('/');
    format!("{normalized_base}/{endpoint}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_any_number_of_trailing_slashes() {
        assert_eq!(normalize_base_url("http://h/v1"), "http://h/v1");
        assert_eq!(normalize_base_url("http://h/v1/"), "http://h/v1");
        assert_eq!(normalize_base_url("http://h/v1///"), "http://h/v1");
        assert_eq!(normalize_base_url(""), "");
    }

    #[test]
    fn construct_tolerates_slashes_on_either_side() {
        for base in ["http://h", "http://h/", "http://h///"] {
            for endpoint in ["api/messages", "/api/messages"] {
                assert_eq!(construct_api_url(base, endpoint), "http://h/api/messages");
            }
        }
    }
}
