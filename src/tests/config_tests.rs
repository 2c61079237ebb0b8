#[cfg(test)]
mod tests {
    use crate::config;
    use crate::tests::test_env;

    fn load_with(overrides: &[(&str, &str)]) -> anyhow::Result<config::AppConfig> {
        let mut env = test_env();
        for (key, value) in overrides {
            env.insert(key.to_string(), value.to_string());
        }
        config::load_from(env)
    }

    fn load_without(key: &str) -> anyhow::Result<config::AppConfig> {
        let mut env = test_env();
        env.remove(key);
        config::load_from(env)
    }

    #[test]
    fn test_valid_config_loads_with_defaults() {
        let cfg = config::load_from(test_env()).unwrap();
        assert_eq!(cfg.app_name, "kitsu");
        assert!(!cfg.debug);
        assert_eq!(cfg.log_level, "INFO");
        assert_eq!(cfg.log_directive(), "info");
        assert_eq!(cfg.bind_host, "127.0.0.1");
        assert_eq!(cfg.bind_port, 8000);
        assert_eq!(cfg.allowed_origins, vec!["http://localhost:3000".to_string()]);
        assert_eq!(cfg.listen_addr().unwrap().to_string(), "127.0.0.1:8000");
    }

    #[test]
    fn test_secret_key_required() {
        let err = load_without("SECRET_KEY").unwrap_err();
        assert!(err.to_string().contains("SECRET_KEY must be set"));

        let err = load_with(&[("SECRET_KEY", "   ")]).unwrap_err();
        assert!(err.to_string().contains("SECRET_KEY must be set"));
    }

    #[test]
    fn test_database_url_validation() {
        let err = load_without("DATABASE_URL").unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL must be set"));

        let err = load_with(&[("DATABASE_URL", "postgresql+asyncpg://kitsu:hunter2@db/kitsu")]).unwrap_err();
        let text = err.to_string();
        assert!(text.contains("must use the sqlite: scheme"));
        assert!(!text.contains("hunter2"), "credentials leaked: {}", text);

        assert!(load_with(&[("DATABASE_URL", "sqlite://data/kitsu.db")]).is_ok());
    }

    #[test]
    fn test_redis_url_validation() {
        let err = load_without("REDIS_URL").unwrap_err();
        assert!(err.to_string().contains("REDIS_URL must be set"));

        let err = load_with(&[("REDIS_URL", "http://localhost:6379")]).unwrap_err();
        assert!(err.to_string().contains("redis:// or rediss://"));

        assert!(load_with(&[("REDIS_URL", "rediss://cache.internal:6380/0")]).is_ok());
    }

    #[test]
    fn test_allowed_origins_comma_separated() {
        let cfg = load_with(&[("ALLOWED_ORIGINS", "http://a.test, https://b.test,,")]).unwrap();
        assert_eq!(cfg.allowed_origins, vec!["http://a.test".to_string(), "https://b.test".to_string()]);

        let cfg = load_with(&[("ALLOWED_ORIGINS", "*")]).unwrap();
        assert_eq!(cfg.allowed_origins, vec!["*".to_string()]);

        let cfg = load_without("ALLOWED_ORIGINS").unwrap();
        assert!(cfg.allowed_origins.is_empty());

        let err = load_with(&[("ALLOWED_ORIGINS", "ftp://files.test")]).unwrap_err();
        assert!(err.to_string().contains("not an http(s) origin"));
    }

    #[test]
    fn test_log_level_mapping() {
        let cases = [
            ("warning", "WARNING", "warn"),
            ("Debug", "DEBUG", "debug"),
            ("critical", "CRITICAL", "error"),
            (" trace ", "TRACE", "trace"),
            ("verbose", "VERBOSE", "info"),
        ];
        for (raw, normalized, directive) in cases {
            let cfg = load_with(&[("LOG_LEVEL", raw)]).unwrap();
            assert_eq!(cfg.log_level, normalized);
            assert_eq!(cfg.log_directive(), directive, "LOG_LEVEL={}", raw);
        }
    }

    #[test]
    fn test_bind_settings_from_env() {
        let cfg = load_with(&[("BIND_HOST", "0.0.0.0"), ("BIND_PORT", "9090"), ("DEBUG", "true")]).unwrap();
        assert_eq!(cfg.bind_port, 9090);
        assert!(cfg.debug);
        assert_eq!(cfg.listen_addr().unwrap().to_string(), "0.0.0.0:9090");

        let err = load_with(&[("BIND_PORT", "0")]).unwrap_err();
        assert!(err.to_string().contains("invalid BIND_PORT"));

        assert!(load_with(&[("BIND_PORT", "not-a-port")]).is_err());
    }

    #[test]
    fn test_debug_output_redacts_secret() {
        let cfg = load_with(&[("SECRET_KEY", "super-secret-signing-key")]).unwrap();
        let printed = format!("{:?}", cfg);
        assert!(!printed.contains("super-secret-signing-key"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn test_ensure_sqlite_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("kitsu.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());

        config::ensure_sqlite_parent_dir(&url).unwrap();
        assert!(dir.path().join("nested").is_dir());

        // In-memory URLs are a no-op
        config::ensure_sqlite_parent_dir("sqlite::memory:").unwrap();
    }
}
