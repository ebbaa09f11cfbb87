use anyhow::{Context, Result};

pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
}

pub struct DatabaseConfig {
    /// Filesystem path of the SQLite data file. Resolved once at startup and
    /// never re-read, so changing the variable at runtime has no effect.
    pub path: String,
}

pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

pub fn load() -> Result<Config> {
    let path =
        std::env::var("SQLITE_DB_PATH").context("SQLITE_DB_PATH environment variable is not set")?;

    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse::<u16>()
        .context("PORT must be a valid port number")?;

    Ok(Config {
        database: DatabaseConfig { path },
        server: ServerConfig { host, port },
    })
}
