//! Service and share-link URL construction.

/// Trim trailing slashes so endpoint joins never produce `//`.
///
/// ```
/// use devochat::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("http://localhost:8000/"), "http://localhost:8000");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Join a service base URL and an endpoint path.
///
/// ```
/// use devochat::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("http://localhost:8000/", "/upload_page"),
///     "http://localhost:8000/upload_page"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let normalized_base = normalize_base_url(base_url);
    let endpoint = endpoint.trim_start_matches('/');
    format!("{normalized_base}/{endpoint}")
}

/// Public address of a published snapshot: `https://share.<domain>/id/<id>`.
pub fn share_url(service_domain: &str, unique_id: &str) -> String {
    let domain = service_domain
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_matches('/');
    format!("https://share.{domain}/id/{unique_id}")
}
