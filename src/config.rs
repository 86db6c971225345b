use std::env;

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Postgresql connection URI postgresql://[userspec@][hostspec][/dbname][?paramspec]
    pub connection_uri: String,
}

impl PostgresConfig {
    pub fn new(uri: &str) -> Self {
        Self {
            connection_uri: uri.to_owned(),
        }
    }

    /// Reads the connection URI from the GIDX_POSTGRES_URI environment variable.
    pub fn from_env() -> Result<Self, env::VarError> {
        let uri = env::var("GIDX_POSTGRES_URI")?;
        tracing::debug!("found GIDX_POSTGRES_URI environment variable");
        Ok(Self::new(&uri))
    }
}
