pub const DEFAULT_PORT: &str = "8080";

/// Base URL of the server under test. An absent or empty port falls back to
/// [`DEFAULT_PORT`]; anything else is used verbatim.
pub fn resolve_base_url(port: Option<&str>) -> String {
    let port = port.filter(|p| !p.is_empty()).unwrap_or(DEFAULT_PORT);
    format!("http://localhost:{port}")
}
