use super::parsing::{
    env_optional, env_or_default, parse_bool, parse_cors_origins, parse_environment, parse_i64,
    parse_u16, parse_u32, parse_u64,
};
use super::types::{
    AdminSettings, ApiSettings, ConfigError, CorsSettings, DatabaseSettings, RedisSettings,
    RuntimeSettings, SecuritySettings, ServerHost, ServerPort, ServerSettings, Settings,
    TelemetrySettings,
};

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("TUTORA_HOST", "0.0.0.0");
        let port = env_or_default("TUTORA_PORT", "8000");

        let environment =
            parse_environment(env_optional("TUTORA_ENV").or_else(|| env_optional("ENVIRONMENT")));
        let strict_config =
            env_optional("TUTORA_STRICT_CONFIG").map(|value| parse_bool(&value)).unwrap_or(false)
                || environment.is_production();

        let project_name = env_or_default("PROJECT_NAME", "Tutora API");
        let version = env_or_default("VERSION", env!("CARGO_PKG_VERSION"));
        let api_v1_str = env_or_default("API_V1_STR", "/api/v1");

        let request_timeout_seconds = parse_u64(
            "REQUEST_TIMEOUT_SECONDS",
            env_or_default("REQUEST_TIMEOUT_SECONDS", "30"),
        )?;
        let max_page_size = parse_i64("MAX_PAGE_SIZE", env_or_default("MAX_PAGE_SIZE", "100"))?;

        let session_ttl_hours =
            parse_u64("SESSION_TTL_HOURS", env_or_default("SESSION_TTL_HOURS", "24"))?;
        let argon2_memory_kib =
            parse_u32("ARGON2_MEMORY_KIB", env_or_default("ARGON2_MEMORY_KIB", "19456"))?;
        let argon2_time_cost =
            parse_u32("ARGON2_TIME_COST", env_or_default("ARGON2_TIME_COST", "2"))?;
        let argon2_parallelism =
            parse_u32("ARGON2_PARALLELISM", env_or_default("ARGON2_PARALLELISM", "1"))?;

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let postgres_server = env_or_default("POSTGRES_SERVER", "localhost");
        let postgres_port = parse_u16("POSTGRES_PORT", env_or_default("POSTGRES_PORT", "5432"))?;
        let postgres_user = env_or_default("POSTGRES_USER", "tutora");
        let postgres_password = env_or_default("POSTGRES_PASSWORD", "");
        let postgres_db = env_or_default("POSTGRES_DB", "tutora_db");
        let database_url = env_optional("DATABASE_URL");

        let redis_host = env_or_default("REDIS_HOST", "localhost");
        let redis_port = parse_u16("REDIS_PORT", env_or_default("REDIS_PORT", "6379"))?;
        let redis_db = parse_u16("REDIS_DB", env_or_default("REDIS_DB", "0"))?;
        let redis_password = env_or_default("REDIS_PASSWORD", "");

        let first_admin_email =
            env_or_default("FIRST_ADMIN_EMAIL", "").trim().to_ascii_lowercase();
        let first_admin_password = env_or_default("FIRST_ADMIN_PASSWORD", "");

        let log_level = env_or_default("TUTORA_LOG_LEVEL", "info");
        let json = env_optional("TUTORA_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_enabled =
            env_optional("PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
                request_timeout_seconds,
                max_page_size,
            },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { project_name, version, api_v1_str },
            security: SecuritySettings {
                session_ttl_hours,
                argon2_memory_kib,
                argon2_time_cost,
                argon2_parallelism,
            },
            cors: CorsSettings { origins: cors_origins },
            database: DatabaseSettings {
                postgres_server,
                postgres_port,
                postgres_user,
                postgres_password,
                postgres_db,
                database_url,
            },
            redis: RedisSettings {
                host: redis_host,
                port: redis_port,
                db: redis_db,
                password: redis_password,
            },
            admin: AdminSettings { first_admin_email, first_admin_password },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.runtime.strict_config {
            if self.database.database_url.is_none() && self.database.postgres_password.is_empty() {
                return Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"));
            }
            if !self.admin.first_admin_email.is_empty()
                && self.admin.first_admin_password.is_empty()
            {
                return Err(ConfigError::MissingSecret("FIRST_ADMIN_PASSWORD"));
            }
        }

        if self.server.max_page_size < 1 {
            return Err(ConfigError::InvalidValue {
                field: "MAX_PAGE_SIZE",
                value: self.server.max_page_size.to_string(),
            });
        }

        if self.security.argon2_memory_kib < 8 * self.security.argon2_parallelism {
            return Err(ConfigError::InvalidValue {
                field: "ARGON2_MEMORY_KIB",
                value: self.security.argon2_memory_kib.to_string(),
            });
        }

        Ok(())
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host.0, self.server.port.0)
    }

    pub(crate) fn server_host(&self) -> &str {
        &self.server.host.0
    }

    pub(crate) fn server_port(&self) -> u16 {
        self.server.port.0
    }

    pub(crate) fn server(&self) -> &ServerSettings {
        &self.server
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn security(&self) -> &SecuritySettings {
        &self.security
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub(crate) fn redis(&self) -> &RedisSettings {
        &self.redis
    }

    pub(crate) fn admin(&self) -> &AdminSettings {
        &self.admin
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }
}

#[cfg(test)]
mod tests {
    use super::Settings;

    #[test]
    fn defaults_load_without_env() {
        let settings = Settings::load().expect("settings");
        assert_eq!(settings.security().session_ttl_hours, 24);
        assert_eq!(settings.server().request_timeout_seconds, 30);
        assert_eq!(settings.server().max_page_size, 100);
    }
}
