//! Server settings.
//!
//! Read from built-in defaults, then an optional `settings.toml`, then
//! `OPENSPLIT__SECTION__KEY` environment variables. `MONGODB_URI` overrides
//! `mongodb.uri` when set.
use config::{builder::DefaultState, Config, ConfigBuilder, Environment, File, FileFormat};
use serde::Deserialize;

use crate::error::Result;

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct MongoDb {
    pub uri: String,
    pub database: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Log {
    pub level: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Settings {
    pub server: Server,
    pub mongodb: MongoDb,
    pub log: Log,
}

impl Settings {
    pub fn new() -> Result<Self> {
        let builder = defaults()?
            .add_source(File::with_name("settings").required(false))
            .add_source(Environment::with_prefix("OPENSPLIT").separator("__"))
            .set_override_option("mongodb.uri", std::env::var("MONGODB_URI").ok())?;
        Ok(builder.build()?.try_deserialize()?)
    }

    /// Settings from a TOML document layered over the defaults.
    pub fn from_toml(source: &str) -> Result<Self> {
        let builder = defaults()?.add_source(File::from_str(source, FileFormat::Toml));
        Ok(builder.build()?.try_deserialize()?)
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.server.host.clone(), self.server.port)
    }
}

fn defaults() -> Result<ConfigBuilder<DefaultState>> {
    Ok(Config::builder()
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 8080)?
        .set_default("mongodb.uri", "mongodb://localhost:27017")?
        .set_default("mongodb.database", "OpenSplit")?
        .set_default("log.level", "info")?)
}
