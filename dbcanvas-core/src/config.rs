/// Engine-wide knobs passed explicitly into the duplication service and the
/// export translator. Defaults match the free plan and a conservative external
/// API request rate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Maximum in-flight requests to the external schema API within a stage.
    pub export_concurrency: usize,
    /// Canvas limit applied to owners whose context carries no explicit limit.
    pub default_canvas_limit: u32,
    /// Suffix appended to the name of a duplicated canvas.
    pub copy_suffix: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            export_concurrency: 3,
            default_canvas_limit: 3,
            copy_suffix: " (copy)".to_string(),
        }
    }
}

impl EngineConfig {
    /// Reads overrides from `DBCANVAS_*` environment variables, falling back to
    /// the defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            export_concurrency: std::env::var("DBCANVAS_EXPORT_CONCURRENCY")
                .ok()
                .and_then(|value| value.parse::<usize>().ok())
                .filter(|value| *value > 0)
                .unwrap_or(defaults.export_concurrency),
            default_canvas_limit: std::env::var("DBCANVAS_CANVAS_LIMIT")
                .ok()
                .and_then(|value| value.parse::<u32>().ok())
                .unwrap_or(defaults.default_canvas_limit),
            copy_suffix: std::env::var("DBCANVAS_COPY_SUFFIX").unwrap_or(defaults.copy_suffix),
        }
    }

    pub fn with_export_concurrency(mut self, concurrency: usize) -> Self {
        self.export_concurrency = concurrency.max(1);
        self
    }

    pub fn with_default_canvas_limit(mut self, limit: u32) -> Self {
        self.default_canvas_limit = limit;
        self
    }
}
