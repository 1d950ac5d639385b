//! Recipient naming and attachment filename derivation.

/// Fallback label when no usable name was submitted.
pub const DEFAULT_DISPLAY_NAME: &str = "Rockstar";

/// A recipient name resolved from the submitted fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientName {
    pub first: String,
    pub last: String,
    pub display: String,
}

/// Derive a recipient name.
///
/// A combined full-name string wins when present (split on whitespace into
/// first + rest); otherwise the separate given/family fields are joined.
/// When everything is blank, the first name and display both fall back to
/// [`DEFAULT_DISPLAY_NAME`].
pub fn resolve_recipient_name(
    full_name: Option<&str>,
    given: Option<&str>,
    family: Option<&str>,
) -> RecipientName {
    if let Some(full) = full_name.map(str::trim).filter(|s| !s.is_empty()) {
        let mut parts = full.split_whitespace();
        let first = parts.next().unwrap_or_default().to_string();
        let last = parts.collect::<Vec<_>>().join(" ");
        return RecipientName {
            first,
            last,
            display: full.to_string(),
        };
    }

    let first = given.map(str::trim).unwrap_or_default().to_string();
    let last = family.map(str::trim).unwrap_or_default().to_string();
    let display = match (first.is_empty(), last.is_empty()) {
        (false, false) => format!("{first} {last}"),
        (false, true) => first.clone(),
        (true, false) => last.clone(),
        (true, true) => DEFAULT_DISPLAY_NAME.to_string(),
    };
    let first = if first.is_empty() {
        DEFAULT_DISPLAY_NAME.to_string()
    } else {
        first
    };

    RecipientName {
        first,
        last,
        display,
    }
}

/// File extension and MIME type inferred from an image URL's suffix.
///
/// Anything that is not recognizably PNG or WebP is treated as JPEG, which
/// matches what the workflow emits by default.
pub fn image_ext_and_mime(url: &str) -> (&'static str, &'static str) {
    let lower = url.to_lowercase();
    if lower.ends_with(".png") {
        ("png", "image/png")
    } else if lower.ends_with(".webp") {
        ("webp", "image/webp")
    } else {
        ("jpg", "image/jpeg")
    }
}

/// Attachment filename for a generated image: `{first}_{last}.{ext}`,
/// with the family-name slot defaulting to the rockstar label.
pub fn attachment_filename(name: &RecipientName, url: &str) -> String {
    let (ext, _) = image_ext_and_mime(url);
    let last = if name.last.is_empty() {
        "rockstar"
    } else {
        name.last.as_str()
    };
    format!("{}_{}.{}", name.first, last, ext)
}
