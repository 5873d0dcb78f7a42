use crate::error::BotError;

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub tmdb_api_key: String,
    pub language: String,
    pub db_path: String,
}

impl Config {
    /// Read configuration from the environment. `BOT_TOKEN` and
    /// `TMDB_API_KEY` are required; everything else has a default.
    pub fn from_env() -> Result<Self, BotError> {
        let bot_token = required("BOT_TOKEN")?;
        let tmdb_api_key = required("TMDB_API_KEY")?;
        let language = std::env::var("TMDB_LANG").unwrap_or_else(|_| String::from("ru-RU"));
        let db_path = std::env::var("DB_PATH").unwrap_or_else(|_| String::from("bot.db"));

        Ok(Self {
            bot_token,
            tmdb_api_key,
            language,
            db_path,
        })
    }

    /// Region code derived from the locale suffix, e.g. "ru-RU" -> "RU".
    pub fn region(&self) -> String {
        match self.language.rsplit_once('-') {
            Some((_, region)) => region.to_uppercase(),
            None => String::from("US"),
        }
    }
}

fn required(name: &'static str) -> Result<String, BotError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(BotError::Config(format!("{name} must be set"))),
    }
}
