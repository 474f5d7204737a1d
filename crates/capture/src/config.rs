use std::time::Duration;

/// Per-session capture settings.
#[derive(Clone, Debug)]
pub struct CaptureConfig {
    /// Elements carrying this class are excluded together with their subtree.
    pub block_class: String,
    /// Upper bound on waiting for a nested document to become ready.
    pub frame_ready_timeout: Duration,
    /// Inline `<style>` and loaded `<link rel=stylesheet>` rules as `cssText`.
    pub inline_stylesheets: bool,
    pub record_canvas: bool,
    pub record_media: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            block_class: "norecord".to_string(),
            frame_ready_timeout: Duration::from_secs(5),
            inline_stylesheets: true,
            record_canvas: true,
            record_media: true,
        }
    }
}
