//! Output-URL extraction over ComfyDeploy's variant payload shapes.
//!
//! The location of the generated image URL differs between workflow
//! versions. Rather than one optimistic path of nested lookups, the
//! candidates are an ordered list of probes over the first output element,
//! tried until one yields a non-empty string.

use serde_json::Value;

/// Probes over the first element of the `outputs` array, in priority order.
///
/// 1. `outputs[0].url`
/// 2. `outputs[0].images[0].url`
/// 3. `outputs[0].data.images[0].url`
/// 4. `outputs[0].data.url`
const URL_PROBES: &[fn(&Value) -> Option<&str>] = &[
    |out| out.get("url")?.as_str(),
    |out| out.get("images")?.get(0)?.get("url")?.as_str(),
    |out| out.get("data")?.get("images")?.get(0)?.get("url")?.as_str(),
    |out| out.get("data")?.get("url")?.as_str(),
];

/// Extract the best candidate output URL from a raw `outputs` array.
///
/// Returns `None` when the array is empty or no probe finds a non-empty
/// string.
pub fn extract_output_url(outputs: &[Value]) -> Option<String> {
    let first = outputs.first()?;
    URL_PROBES
        .iter()
        .find_map(|probe| probe(first).filter(|url| !url.is_empty()))
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn direct_url() {
        let outputs = vec![json!({ "url": "https://x/y.jpg" })];
        assert_eq!(extract_output_url(&outputs).as_deref(), Some("https://x/y.jpg"));
    }

    #[test]
    fn nested_images_url() {
        let outputs = vec![json!({ "images": [{ "url": "https://x/nested.png" }] })];
        assert_eq!(
            extract_output_url(&outputs).as_deref(),
            Some("https://x/nested.png")
        );
    }

    #[test]
    fn data_images_url() {
        let outputs = vec![json!({ "data": { "images": [{ "url": "https://x/d.webp" }] } })];
        assert_eq!(
            extract_output_url(&outputs).as_deref(),
            Some("https://x/d.webp")
        );
    }

    #[test]
    fn data_url() {
        let outputs = vec![json!({ "data": { "url": "https://x/plain.jpg" } })];
        assert_eq!(
            extract_output_url(&outputs).as_deref(),
            Some("https://x/plain.jpg")
        );
    }

    #[test]
    fn direct_url_wins_over_nested() {
        let outputs = vec![json!({
            "url": "https://x/direct.jpg",
            "images": [{ "url": "https://x/nested.jpg" }],
        })];
        assert_eq!(
            extract_output_url(&outputs).as_deref(),
            Some("https://x/direct.jpg")
        );
    }

    #[test]
    fn empty_string_falls_through_to_next_probe() {
        let outputs = vec![json!({
            "url": "",
            "images": [{ "url": "https://x/fallback.jpg" }],
        })];
        assert_eq!(
            extract_output_url(&outputs).as_deref(),
            Some("https://x/fallback.jpg")
        );
    }

    #[test]
    fn no_outputs() {
        assert_eq!(extract_output_url(&[]), None);
        let outputs = vec![json!({ "node_id": "save_image" })];
        assert_eq!(extract_output_url(&outputs), None);
    }
}
