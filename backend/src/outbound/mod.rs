//! Outbound adapters implementing the domain's ports.

pub mod memory;
pub mod payments;
pub mod persistence;
pub mod receipts;
pub mod sms;

/// Compact single-line excerpt of a provider error body for log and error
/// messages.
pub(crate) fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}

#[cfg(test)]
mod tests {
    use super::body_preview;

    #[test]
    fn preview_collapses_whitespace_and_truncates() {
        assert_eq!(body_preview(b"a  b\n c"), "a b c");
        let long = "x".repeat(200);
        let preview = body_preview(long.as_bytes());
        assert!(preview.ends_with("..."));
        assert_eq!(preview.chars().count(), 163);
    }
}
