// Endpoint methods on `ResilientClient`, grouped by backend area.

mod devices;
mod hierarchy;

/// Percent-encode one path or query component.
pub(crate) fn component(raw: &str) -> String {
    url::form_urlencoded::byte_serialize(raw.as_bytes()).collect()
}
