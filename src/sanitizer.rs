use crate::common::SANITIZED_URL_PLACEHOLDER;

/// Hides the backend location in text that originates from the backend or its transport
///
/// Every occurrence of `backend_base_url` is replaced by `SANITIZED_URL_PLACEHOLDER`,
/// anything else is left untouched. Never apply this to caller supplied values.
pub fn sanitize(text: &str, backend_base_url: &str) -> String {
    if backend_base_url.is_empty() || !text.contains(backend_base_url) {
        return text.into();
    }
    text.replace(backend_base_url, SANITIZED_URL_PLACEHOLDER)
}
