use serde::Deserialize;

fn default_max_file_size_mb() -> u64 {
    5
}

fn default_max_placeholders() -> usize {
    200
}

fn default_log_level() -> String {
    "info".into()
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Settings {
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: u64,
    /// Detection logs a warning above this many unique fields.
    #[serde(default = "default_max_placeholders")]
    pub max_placeholders: usize,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Ask a model for questions instead of deriving them locally.
    #[serde(default)]
    pub use_llm: bool,
    /// Shell command that reads a prompt on stdin and writes the reply to
    /// stdout. Consulted only with `use_llm`.
    #[serde(default)]
    pub question_command: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_file_size_mb: default_max_file_size_mb(),
            max_placeholders: default_max_placeholders(),
            log_level: default_log_level(),
            use_llm: false,
            question_command: None,
        }
    }
}

impl Settings {
    /// Defaults overridden by `DOCX_FILL_*` environment variables.
    pub fn new() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("DOCX_FILL").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb * 1024 * 1024
    }
}
