mod settings;

pub use settings::{
    DirectoryConfig, I18nConfig, OtelConfig, RedisConfig, ServerConfig, Settings, WorkerConfig,
};
