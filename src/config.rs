use std::path::PathBuf;

/// Runtime configuration, read once at startup from the environment (a `.env`
/// file is honored the same way the rest of the env is).
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_addr: String,
    pub database_url: String,
    pub uploads_dir: PathBuf,
    /// Max conference rooms a single account may own.
    pub conference_limit: usize,
    /// Attachment ceilings, in bytes of payload as submitted (data URLs count whole).
    pub file_limit: usize,
    pub image_limit: usize,
    pub avatar_limit: usize,
    /// Swaps the SQLite store for the seeded in-memory one. Development only;
    /// there is no credential that reaches the in-memory store otherwise.
    pub test_mode: bool,
    pub test_admin_password: String,
    pub assistant: Option<AssistantConfig>,
}

/// Credentials for the single-turn text-generation endpoint. Absent config
/// disables the assistant; chat keeps working without it.
#[derive(Clone, Debug)]
pub struct AssistantConfig {
    pub url: String,
    pub api_key: String,
    pub model: String,
}

const MIB: usize = 1024 * 1024;

impl Config {
    pub fn from_env() -> Config {
        let assistant = match (
            dotenv::var("ASSISTANT_URL"),
            dotenv::var("ASSISTANT_API_KEY"),
        ) {
            (Ok(url), Ok(api_key)) => Some(AssistantConfig {
                url,
                api_key,
                model: dotenv::var("ASSISTANT_MODEL")
                    .unwrap_or_else(|_| "nexus-text-1".to_owned()),
            }),
            _ => None,
        };

        Config {
            bind_addr: dotenv::var("CHRONONEXUS_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_owned()),
            database_url: dotenv::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:chrononexus.db".to_owned()),
            uploads_dir: dotenv::var("CHRONONEXUS_UPLOADS")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("uploads")),
            conference_limit: 3,
            file_limit: 5 * MIB,
            image_limit: 10 * MIB,
            avatar_limit: 2 * MIB,
            test_mode: dotenv::var("CHRONONEXUS_TEST_MODE")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            test_admin_password: dotenv::var("CHRONONEXUS_TEST_ADMIN_PASSWORD")
                .unwrap_or_else(|_| "admin".to_owned()),
            assistant,
        }
    }
}

#[cfg(test)]
impl Default for Config {
    fn default() -> Config {
        Config {
            bind_addr: "127.0.0.1:0".to_owned(),
            database_url: "sqlite::memory:".to_owned(),
            uploads_dir: PathBuf::from("uploads"),
            conference_limit: 3,
            file_limit: 5 * MIB,
            image_limit: 10 * MIB,
            avatar_limit: 2 * MIB,
            test_mode: true,
            test_admin_password: "admin".to_owned(),
            assistant: None,
        }
    }
}
