use config::ConfigError;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub jwt: JwtSettings,
    pub password: PasswordSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }
}

/// JWT authentication settings
#[derive(serde::Deserialize, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub access_token_expiry: i64,   // seconds (1800 = 30 minutes)
    pub refresh_token_expiry: i64,  // seconds (2592000 = 30 days)
    pub issuer: String,
}

/// Password hashing settings
#[derive(serde::Deserialize, Clone)]
pub struct PasswordSettings {
    pub hash_cost: u32,
}

/// Load settings from defaults, an optional `configuration` file, `APP_*`
/// environment variables and finally `JWT_SECRET`.
///
/// A missing or blank signing secret is an error: the server must not start
/// without one.
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .set_default("application.host", "127.0.0.1")?
        .set_default("application.port", 8080)?
        .set_default("database.username", "postgres")?
        .set_default("database.password", "postgres")?
        .set_default("database.host", "localhost")?
        .set_default("database.port", 5432)?
        .set_default("database.database_name", "workout_tracker")?
        .set_default("jwt.secret", "")?
        .set_default("jwt.access_token_expiry", 1800)?
        .set_default("jwt.refresh_token_expiry", 2_592_000)?
        .set_default("jwt.issuer", "workout-tracker")?
        .set_default("password.hash_cost", i64::from(bcrypt::DEFAULT_COST))?
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .set_override_option("jwt.secret", std::env::var("JWT_SECRET").ok())?
        .build()?;

    let settings = settings.try_deserialize::<Settings>()?;
    validate(&settings)?;
    Ok(settings)
}

fn validate(settings: &Settings) -> Result<(), ConfigError> {
    if settings.jwt.secret.trim().is_empty() {
        return Err(ConfigError::Message(
            "JWT secret is not set (JWT_SECRET or APP_JWT__SECRET)".to_string(),
        ));
    }
    if settings.jwt.access_token_expiry <= 0 || settings.jwt.refresh_token_expiry <= 0 {
        return Err(ConfigError::Message(
            "token expiries must be positive".to_string(),
        ));
    }
    Ok(())
}
