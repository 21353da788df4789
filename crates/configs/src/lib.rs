use std::time::Duration;

use anyhow::anyhow;
use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub tasks: TaskConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
    /// `"compact"` or `"json"`
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            worker_threads: Some(4),
            log_format: default_log_format(),
        }
    }
}

/// Session lifetime policy.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Sliding idle timeout applied by the GC sweep.
    #[serde(default = "default_max_idle")]
    pub max_idle_secs: u64,
    #[serde(default = "default_gc_interval")]
    pub gc_interval_secs: u64,
    /// Absolute lifetime stamped on new sessions; unset means idle timeout only.
    #[serde(default)]
    pub ttl_secs: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { max_idle_secs: default_max_idle(), gc_interval_secs: default_gc_interval(), ttl_secs: None }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_processing_delay")]
    pub processing_delay_ms: u64,
    #[serde(default = "default_result_payload")]
    pub result_payload: String,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
            processing_delay_ms: default_processing_delay(),
            result_payload: default_result_payload(),
        }
    }
}

/// Argon2id cost parameters for stored password hashes.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_memory_kib")]
    pub memory_kib: u32,
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    #[serde(default = "default_parallelism")]
    pub parallelism: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self { memory_kib: default_memory_kib(), iterations: default_iterations(), parallelism: default_parallelism() }
    }
}

fn default_host() -> String { "127.0.0.1".into() }
fn default_port() -> u16 { 8000 }
fn default_log_format() -> String { "compact".into() }
fn default_max_idle() -> u64 { 1800 }
fn default_gc_interval() -> u64 { 60 }
fn default_workers() -> usize { 4 }
fn default_queue_capacity() -> usize { 1024 }
fn default_processing_delay() -> u64 { 2000 }
fn default_result_payload() -> String { "some_junk_payload".into() }
fn default_memory_kib() -> u32 { 19 * 1024 }
fn default_iterations() -> u32 { 2 }
fn default_parallelism() -> u32 { 1 }

fn config_path() -> String {
    std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string())
}

pub fn load_default() -> Result<AppConfig> {
    load_from_file(&config_path())
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let cfg: AppConfig = toml::from_str(&content)?;
    Ok(cfg)
}

impl AppConfig {
    /// Load `config.toml` if present, otherwise fall back to defaults plus
    /// `SERVER_HOST` / `SERVER_PORT` / `TOKIO_WORKER_THREADS`.
    pub fn load_or_env() -> Result<Self> {
        Self::load_or_env_from(&config_path())
    }

    /// Only a missing file falls back to env; unreadable or malformed files are errors.
    pub fn load_or_env_from(path: &str) -> Result<Self> {
        let mut cfg = match load_from_file(path) {
            Ok(cfg) => cfg,
            Err(e) if is_not_found(&e) => {
                let mut cfg = AppConfig::default();
                cfg.server.apply_env();
                cfg
            }
            Err(e) => return Err(e.context(format!("failed to load config from {path}"))),
        };
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize()?;
        self.session.validate()?;
        self.tasks.normalize()?;
        self.auth.validate()?;
        Ok(())
    }
}

fn is_not_found(e: &anyhow::Error) -> bool {
    e.downcast_ref::<std::io::Error>()
        .is_some_and(|io| io.kind() == std::io::ErrorKind::NotFound)
}

impl ServerConfig {
    fn apply_env(&mut self) {
        if let Ok(host) = std::env::var("SERVER_HOST") {
            self.host = host;
        }
        if let Some(port) = std::env::var("SERVER_PORT").ok().and_then(|p| p.parse::<u16>().ok()) {
            self.port = port;
        }
        if let Some(w) = std::env::var("TOKIO_WORKER_THREADS").ok().and_then(|v| v.parse::<usize>().ok()) {
            self.worker_threads = Some(w);
        }
    }

    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = "127.0.0.1".to_string();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be in 1..=65535"));
        }
        match self.worker_threads {
            Some(0) | None => self.worker_threads = Some(4),
            Some(_) => {}
        }
        Ok(())
    }
}

impl SessionConfig {
    fn validate(&self) -> Result<()> {
        if self.gc_interval_secs == 0 {
            return Err(anyhow!("session.gc_interval_secs must be >= 1"));
        }
        if self.ttl_secs == Some(0) {
            return Err(anyhow!("session.ttl_secs must be >= 1 when set"));
        }
        Ok(())
    }

    pub fn max_idle(&self) -> Duration { Duration::from_secs(self.max_idle_secs) }
    pub fn gc_interval(&self) -> Duration { Duration::from_secs(self.gc_interval_secs) }
    pub fn ttl(&self) -> Option<Duration> { self.ttl_secs.map(Duration::from_secs) }
}

impl TaskConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.workers == 0 {
            self.workers = default_workers();
        }
        if self.queue_capacity == 0 {
            return Err(anyhow!("tasks.queue_capacity must be >= 1"));
        }
        Ok(())
    }

    pub fn processing_delay(&self) -> Duration { Duration::from_millis(self.processing_delay_ms) }
}

impl AuthConfig {
    fn validate(&self) -> Result<()> {
        if self.iterations == 0 || self.parallelism == 0 {
            return Err(anyhow!("auth.iterations and auth.parallelism must be >= 1"));
        }
        if self.memory_kib < 8 * self.parallelism {
            return Err(anyhow!("auth.memory_kib must be >= 8 * auth.parallelism"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let mut cfg: AppConfig = toml::from_str("").unwrap();
        cfg.normalize_and_validate().unwrap();
        assert_eq!(cfg.server.port, 8000);
        assert_eq!(cfg.session.max_idle_secs, 1800);
        assert_eq!(cfg.session.ttl(), None);
        assert_eq!(cfg.tasks.workers, 4);
        assert_eq!(cfg.tasks.result_payload, "some_junk_payload");
    }

    #[test]
    fn partial_sections_keep_field_defaults() {
        let mut cfg: AppConfig = toml::from_str(
            r#"
            [server]
            host = ""
            port = 9000
            worker_threads = 0

            [session]
            ttl_secs = 3600

            [tasks]
            workers = 0
            processing_delay_ms = 10
            "#,
        )
        .unwrap();
        cfg.normalize_and_validate().unwrap();
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.server.worker_threads, Some(4));
        assert_eq!(cfg.session.ttl(), Some(Duration::from_secs(3600)));
        assert_eq!(cfg.session.gc_interval_secs, 60);
        assert_eq!(cfg.tasks.workers, 4);
        assert_eq!(cfg.tasks.processing_delay(), Duration::from_millis(10));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut cfg: AppConfig = toml::from_str("[session]\ngc_interval_secs = 0\n").unwrap();
        assert!(cfg.normalize_and_validate().is_err());

        let mut cfg: AppConfig = toml::from_str("[tasks]\nqueue_capacity = 0\n").unwrap();
        assert!(cfg.normalize_and_validate().is_err());

        let mut cfg: AppConfig = toml::from_str("[auth]\nmemory_kib = 4\n").unwrap();
        assert!(cfg.normalize_and_validate().is_err());
    }

    fn temp_config(name: &str, body: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("task_api_{}_{name}.toml", std::process::id()));
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn file_values_survive_load_or_env() {
        let path = temp_config("partial", "[server]\nport = 9000\n[tasks]\nworkers = 16\nprocessing_delay_ms = 5\n");
        let cfg = AppConfig::load_or_env_from(path.to_str().unwrap()).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.tasks.workers, 16);
        assert_eq!(cfg.tasks.processing_delay(), Duration::from_millis(5));
    }

    #[test]
    fn malformed_file_is_an_error_not_defaults() {
        let path = temp_config("malformed", "[server\nport = \"nine\"\n");
        let res = AppConfig::load_or_env_from(path.to_str().unwrap());
        std::fs::remove_file(&path).ok();
        assert!(res.is_err());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let path = std::env::temp_dir().join(format!("task_api_{}_absent.toml", std::process::id()));
        let cfg = AppConfig::load_or_env_from(path.to_str().unwrap()).unwrap();
        assert_eq!(cfg.tasks.workers, 4);
    }
}
