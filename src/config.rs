//! Service configuration.
//!
//! Every runtime knob lives in [`ServiceConfig`], built through
//! [`ServiceConfigBuilder`]. Setters clamp numeric ranges; `build()` rejects
//! values that cannot be clamped into something sensible (empty program
//! names, a zero-byte upload limit).

use crate::error::ServiceError;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Default HTTP listen port.
pub const DEFAULT_PORT: u16 = 2510;

/// Lowest and highest accepted rasterisation resolution.
pub const DPI_RANGE: (u32, u32) = (72, 600);

/// Configuration for the citation service.
///
/// # Example
/// ```rust
/// use citescan::ServiceConfig;
///
/// let config = ServiceConfig::builder()
///     .port(8080)
///     .workers(2)
///     .ocr_language("vie+eng")
///     .build()
///     .unwrap();
/// assert_eq!(config.dpi, 300);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Bind address. Default: `0.0.0.0`.
    pub host: String,

    /// Listen port. Default: 2510.
    pub port: u16,

    /// Rasterisation resolution in DPI. Range: 72–600. Default: 300.
    ///
    /// OCR accuracy on scanned legal text drops sharply below 200 DPI.
    pub dpi: u32,

    /// Tesseract language model passed as `-l`. Default: `vie`.
    pub ocr_language: String,

    /// Number of concurrent pipeline workers. Default: CPU count.
    pub workers: usize,

    /// Rasteriser executable. Default: `gs`.
    pub rasterizer_program: String,

    /// OCR executable. Default: `tesseract`.
    pub ocr_program: String,

    /// Watchdog for the rasterise step, in seconds. Default: 300.
    pub rasterize_timeout_secs: u64,

    /// Watchdog for the OCR step, in seconds. Default: 600.
    pub ocr_timeout_secs: u64,

    /// Parent directory of per-job workspaces. Default: system temp dir.
    pub workspace_root: PathBuf,

    /// Directory for the file-backed result cache. `None` keeps results in
    /// memory only.
    pub cache_dir: Option<PathBuf>,

    /// Path of the queue journal. `None` keeps the queue in memory only.
    pub queue_journal: Option<PathBuf>,

    /// Largest accepted request body. Default: 100 MiB.
    pub max_upload_bytes: usize,

    /// How long an idle worker waits before polling the queue again.
    /// Default: 500 ms.
    pub poll_interval_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            dpi: 300,
            ocr_language: "vie".to_string(),
            workers: num_cpus::get().max(1),
            rasterizer_program: "gs".to_string(),
            ocr_program: "tesseract".to_string(),
            rasterize_timeout_secs: 300,
            ocr_timeout_secs: 600,
            workspace_root: std::env::temp_dir(),
            cache_dir: None,
            queue_journal: None,
            max_upload_bytes: 100 * 1024 * 1024,
            poll_interval_ms: 500,
        }
    }
}

impl ServiceConfig {
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder {
            config: Self::default(),
        }
    }

    /// Socket address to bind. `host` must be an IP literal.
    pub fn listen_addr(&self) -> Result<SocketAddr, ServiceError> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|e| ServiceError::InvalidConfig(format!("Invalid host address: {e}")))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn rasterize_timeout(&self) -> Duration {
        Duration::from_secs(self.rasterize_timeout_secs)
    }

    pub fn ocr_timeout(&self) -> Duration {
        Duration::from_secs(self.ocr_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Builder for [`ServiceConfig`].
#[derive(Debug)]
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(DPI_RANGE.0, DPI_RANGE.1);
        self
    }

    pub fn ocr_language(mut self, lang: impl Into<String>) -> Self {
        self.config.ocr_language = lang.into();
        self
    }

    pub fn workers(mut self, n: usize) -> Self {
        self.config.workers = n.max(1);
        self
    }

    pub fn rasterizer_program(mut self, program: impl Into<String>) -> Self {
        self.config.rasterizer_program = program.into();
        self
    }

    pub fn ocr_program(mut self, program: impl Into<String>) -> Self {
        self.config.ocr_program = program.into();
        self
    }

    pub fn rasterize_timeout_secs(mut self, secs: u64) -> Self {
        self.config.rasterize_timeout_secs = secs.max(1);
        self
    }

    pub fn ocr_timeout_secs(mut self, secs: u64) -> Self {
        self.config.ocr_timeout_secs = secs.max(1);
        self
    }

    pub fn workspace_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.workspace_root = dir.into();
        self
    }

    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.cache_dir = Some(dir.into());
        self
    }

    pub fn queue_journal(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.queue_journal = Some(path.into());
        self
    }

    pub fn max_upload_bytes(mut self, bytes: usize) -> Self {
        self.config.max_upload_bytes = bytes;
        self
    }

    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms.max(1);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ServiceConfig, ServiceError> {
        let c = &self.config;
        if c.dpi < DPI_RANGE.0 || c.dpi > DPI_RANGE.1 {
            return Err(ServiceError::InvalidConfig(format!(
                "DPI must be {}-{}, got {}",
                DPI_RANGE.0, DPI_RANGE.1, c.dpi
            )));
        }
        if c.workers == 0 {
            return Err(ServiceError::InvalidConfig("workers must be >= 1".into()));
        }
        if c.rasterizer_program.trim().is_empty() || c.ocr_program.trim().is_empty() {
            return Err(ServiceError::InvalidConfig(
                "rasterizer and OCR programs must be named".into(),
            ));
        }
        if c.ocr_language.trim().is_empty() {
            return Err(ServiceError::InvalidConfig("OCR language must be set".into()));
        }
        if c.max_upload_bytes == 0 {
            return Err(ServiceError::InvalidConfig(
                "max upload size must be > 0".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ServiceConfig::default();
        assert_eq!(c.port, 2510);
        assert_eq!(c.dpi, 300);
        assert_eq!(c.ocr_language, "vie");
        assert_eq!(c.rasterizer_program, "gs");
        assert_eq!(c.ocr_program, "tesseract");
        assert!(c.workers >= 1);
        assert!(c.cache_dir.is_none());
        assert_eq!(c.listen_addr().unwrap().to_string(), "0.0.0.0:2510");
    }

    #[test]
    fn listen_addr_rejects_hostnames() {
        let c = ServiceConfig::builder().host("localhost").build().unwrap();
        assert!(matches!(
            c.listen_addr(),
            Err(ServiceError::InvalidConfig(_))
        ));
        let c = ServiceConfig::builder().host("::1").port(8080).build().unwrap();
        assert_eq!(c.listen_addr().unwrap().to_string(), "[::1]:8080");
    }

    #[test]
    fn dpi_is_clamped() {
        assert_eq!(ServiceConfig::builder().dpi(10).build().unwrap().dpi, 72);
        assert_eq!(ServiceConfig::builder().dpi(5000).build().unwrap().dpi, 600);
    }

    #[test]
    fn workers_never_zero() {
        assert_eq!(ServiceConfig::builder().workers(0).build().unwrap().workers, 1);
    }

    #[test]
    fn empty_program_rejected() {
        let err = ServiceConfig::builder().ocr_program("  ").build().unwrap_err();
        assert!(matches!(err, ServiceError::InvalidConfig(_)));
    }

    #[test]
    fn zero_upload_limit_rejected() {
        assert!(ServiceConfig::builder().max_upload_bytes(0).build().is_err());
    }

    #[test]
    fn timeouts_as_durations() {
        let c = ServiceConfig::builder()
            .rasterize_timeout_secs(7)
            .ocr_timeout_secs(9)
            .poll_interval_ms(20)
            .build()
            .unwrap();
        assert_eq!(c.rasterize_timeout(), Duration::from_secs(7));
        assert_eq!(c.ocr_timeout(), Duration::from_secs(9));
        assert_eq!(c.poll_interval(), Duration::from_millis(20));
    }
}
