use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Deserialize, Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub database_url: String,

    pub stream_api_key: String,
    pub stream_api_secret: String,
    pub stream_video_url: String,
    pub stream_chat_url: String,

    pub openai_api_key: String,
    pub openai_url: String,
    pub openai_model: String,

    pub inngest_event_key: String,
    pub inngest_url: String,

    /// Bearer token the summarization job presents when reporting back.
    /// The callback route is only mounted when this is set.
    pub job_callback_secret: Option<String>,

    pub log_dir: String,
    pub call_type: String,
    pub chat_channel_type: String,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug, Clone)]
struct PartialServerConfig {
    listen_addr: Option<String>,
    database_url: Option<String>,
    stream_api_key: Option<String>,
    stream_api_secret: Option<String>,
    stream_video_url: Option<String>,
    stream_chat_url: Option<String>,
    openai_api_key: Option<String>,
    openai_url: Option<String>,
    openai_model: Option<String>,
    inngest_event_key: Option<String>,
    inngest_url: Option<String>,
    job_callback_secret: Option<String>,
    log_dir: Option<String>,
    call_type: Option<String>,
    chat_channel_type: Option<String>,
}

impl PartialServerConfig {
    /// Builds the final config. Values in `env` win over `file`.
    fn layer(
        env: PartialServerConfig,
        file: PartialServerConfig,
    ) -> Result<ServerConfig, String> {
        Ok(ServerConfig {
            listen_addr: env
                .listen_addr
                .or(file.listen_addr)
                .unwrap_or_else(default_listen_addr),
            database_url: env
                .database_url
                .or(file.database_url)
                .ok_or("DATABASE_URL is required")?,
            stream_api_key: env
                .stream_api_key
                .or(file.stream_api_key)
                .ok_or("STREAM_API_KEY is required")?,
            stream_api_secret: env
                .stream_api_secret
                .or(file.stream_api_secret)
                .ok_or("STREAM_API_SECRET is required")?,
            stream_video_url: env
                .stream_video_url
                .or(file.stream_video_url)
                .unwrap_or_else(default_stream_video_url),
            stream_chat_url: env
                .stream_chat_url
                .or(file.stream_chat_url)
                .unwrap_or_else(default_stream_chat_url),
            openai_api_key: env
                .openai_api_key
                .or(file.openai_api_key)
                .ok_or("OPENAI_API_KEY is required")?,
            openai_url: env
                .openai_url
                .or(file.openai_url)
                .unwrap_or_else(default_openai_url),
            openai_model: env
                .openai_model
                .or(file.openai_model)
                .unwrap_or_else(default_openai_model),
            inngest_event_key: env
                .inngest_event_key
                .or(file.inngest_event_key)
                .ok_or("INNGEST_EVENT_KEY is required")?,
            inngest_url: env
                .inngest_url
                .or(file.inngest_url)
                .unwrap_or_else(default_inngest_url),
            // An empty value disables the job callback route.
            job_callback_secret: env
                .job_callback_secret
                .or(file.job_callback_secret)
                .filter(|s| !s.is_empty()),
            log_dir: env
                .log_dir
                .or(file.log_dir)
                .unwrap_or_else(default_log_dir),
            call_type: env
                .call_type
                .or(file.call_type)
                .unwrap_or_else(default_call_type),
            chat_channel_type: env
                .chat_channel_type
                .or(file.chat_channel_type)
                .unwrap_or_else(default_chat_channel_type),
        })
    }
}

fn default_listen_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_stream_video_url() -> String {
    "https://video.stream-io-api.com".to_string()
}

fn default_stream_chat_url() -> String {
    "https://chat.stream-io-api.com".to_string()
}

fn default_openai_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_openai_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_inngest_url() -> String {
    "https://inn.gs".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_call_type() -> String {
    "default".to_string()
}

fn default_chat_channel_type() -> String {
    "messaging".to_string()
}

impl ServerConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self, String> {
        dotenv::dotenv().ok();

        // 1. Load from file (optional)
        let file_config = match config_path {
            Some(path_str) if Path::new(path_str).exists() => {
                let contents = fs::read_to_string(path_str)
                    .map_err(|e| format!("Failed to read config file at {path_str:?}: {e}"))?;
                Self::parse_file(&contents).map_err(|e| {
                    format!("Failed to parse TOML from config file at {path_str:?}: {e}")
                })?
            }
            _ => PartialServerConfig::default(),
        };

        // 2. Load from environment variables
        let env_config: PartialServerConfig = envy::from_env::<PartialServerConfig>()
            .map_err(|e| format!("Failed to load config from environment: {e}"))?;

        // 3. Merge: environment overrides file
        PartialServerConfig::layer(env_config, file_config)
    }

    fn parse_file(contents: &str) -> Result<PartialServerConfig, toml::de::Error> {
        toml::from_str(contents)
    }
}
