pub mod error;
pub mod from_html;
pub mod inline;
pub mod to_html;

pub use error::ParseError;

/// Sentinel prefix carried by pruned `<table>` placeholders.
pub const TABLE_SENTINEL_PREFIX: &str = "BLOCK_TABLE_";
/// Sentinel prefix carried by pruned media-block placeholders.
pub const MEDIA_SENTINEL_PREFIX: &str = "BLOCK_MEDIA_";
/// Sentinel prefix carried by pruned figure-embed and loose-media placeholders.
pub const FIGURE_SENTINEL_PREFIX: &str = "BLOCK_FIGURE_";
/// Sentinel prefix carried by pruned `<iframe>` placeholders.
pub const IFRAME_SENTINEL_PREFIX: &str = "BLOCK_IFRAME_";
/// Sentinel prefix carried by pruned `<script>` placeholders.
pub const SCRIPT_SENTINEL_PREFIX: &str = "BLOCK_SCRIPT_";

/// Match a sentinel token of the form `<prefix><index>` via a direct prefix
/// check and index parse. Sentinels are an internal contract between the
/// pruning and reconstruction phases and never appear in generated output.
pub(crate) fn sentinel_index(text: &str, prefix: &str) -> Option<usize> {
    text.trim().strip_prefix(prefix)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_matching_is_prefix_and_index() {
        assert_eq!(sentinel_index("BLOCK_TABLE_0", TABLE_SENTINEL_PREFIX), Some(0));
        assert_eq!(sentinel_index(" BLOCK_MEDIA_17 ", MEDIA_SENTINEL_PREFIX), Some(17));
        assert_eq!(sentinel_index("BLOCK_TABLE_", TABLE_SENTINEL_PREFIX), None);
        assert_eq!(sentinel_index("BLOCK_TABLE_x", TABLE_SENTINEL_PREFIX), None);
        assert_eq!(sentinel_index("BLOCK_MEDIA_1", TABLE_SENTINEL_PREFIX), None);
    }
}
