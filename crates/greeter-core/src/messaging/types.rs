/// Capabilities / limits of a messenger implementation.
#[derive(Clone, Copy, Debug)]
pub struct MessagingCapabilities {
    pub max_message_len: usize,
}

/// Fallback when a contact has no resolvable display name.
pub const FALLBACK_CONTACT_LABEL: &str = "customer";

/// Pick the first non-blank candidate as a contact label.
pub fn pick_label<'a>(candidates: impl IntoIterator<Item = Option<&'a str>>) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}
