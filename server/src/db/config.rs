use std::borrow::Cow;

/// Database connection settings used when `DATABASE_URL` is not set.
#[derive(Debug, Clone)]
pub struct DbConfig<'a> {
    pub host: Cow<'a, str>,
    pub port: u16,
    pub database: Cow<'a, str>,
    pub user: Cow<'a, str>,
    pub password: Cow<'a, str>,
}

impl<'a> DbConfig<'a> {
    /// Build the PostgreSQL connection string
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.database
        )
    }
}

impl DbConfig<'static> {
    /// Read `DB_HOST`, `DB_PORT`, `DB_NAME`, `DB_USER` and `DB_PASSWORD`,
    /// falling back to the local development defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, crate::config::ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let port = match lookup("DB_PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|_| crate::config::ConfigError::invalid("DB_PORT", raw))?,
            None => defaults.port,
        };

        Ok(Self {
            host: lookup("DB_HOST").map_or(defaults.host, Cow::Owned),
            port,
            database: lookup("DB_NAME").map_or(defaults.database, Cow::Owned),
            user: lookup("DB_USER").map_or(defaults.user, Cow::Owned),
            password: lookup("DB_PASSWORD").map_or(defaults.password, Cow::Owned),
        })
    }
}

impl Default for DbConfig<'static> {
    fn default() -> Self {
        Self {
            host: Cow::Borrowed("localhost"),
            port: 5432,
            database: Cow::Borrowed("ehr_db"),
            user: Cow::Borrowed("postgres"),
            password: Cow::Borrowed("postgres"),
        }
    }
}
