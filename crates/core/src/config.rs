use crate::error::{AppError, Result};
use crate::image_processing::{DEFAULT_MAX_EDGE, DEFAULT_QUALITY, OutputFormat, PreprocessOptions};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;
use url::Url;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api/v1/";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Clone, Debug)]
pub struct Config {
    pub api_base_url: Url,
    pub request_timeout: Duration,
    pub preprocess: PreprocessOptions,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load .env file if it exists, ignore if it doesn't
        let _ = dotenv();

        let mut builder = Config::builder();

        if let Ok(base) = env::var("CUTOUT_API_BASE_URL") {
            builder = builder.with_base_url(base);
        }
        if let Ok(raw) = env::var("CUTOUT_TIMEOUT_SECS") {
            let secs = raw
                .parse::<u64>()
                .map_err(|_| AppError::config(format!("CUTOUT_TIMEOUT_SECS must be an integer, got {:?}", raw)))?;
            builder = builder.with_timeout(Duration::from_secs(secs));
        }
        if let Ok(raw) = env::var("CUTOUT_MAX_EDGE") {
            let edge = raw
                .parse::<u32>()
                .map_err(|_| AppError::config(format!("CUTOUT_MAX_EDGE must be an integer, got {:?}", raw)))?;
            builder = builder.with_max_edge(edge);
        }
        if let Ok(raw) = env::var("CUTOUT_JPEG_QUALITY") {
            let quality = raw
                .parse::<f32>()
                .map_err(|_| AppError::config(format!("CUTOUT_JPEG_QUALITY must be a number, got {:?}", raw)))?;
            builder = builder.with_quality(quality);
        }

        builder.build()
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// `POST` target for segmentation uploads.
    pub fn segment_url(&self) -> Result<Url> {
        self.endpoint("cutout/segment")
    }

    /// `GET` target for the service health probe.
    pub fn health_url(&self) -> Result<Url> {
        self.endpoint("cutout/health")
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.api_base_url
            .join(path)
            .map_err(|e| AppError::config(format!("Invalid endpoint {}: {}", path, e)))
    }
}

#[derive(Debug)]
pub struct ConfigBuilder {
    base_url: String,
    timeout: Duration,
    max_edge: u32,
    quality: f32,
    format: OutputFormat,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_edge: DEFAULT_MAX_EDGE,
            quality: DEFAULT_QUALITY,
            format: OutputFormat::Jpeg,
        }
    }
}

impl ConfigBuilder {
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_edge(mut self, max_edge: u32) -> Self {
        self.max_edge = max_edge;
        self
    }

    pub fn with_quality(mut self, quality: f32) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn build(self) -> Result<Config> {
        // Url::join drops the last segment unless the base ends with '/'
        let mut base = self.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let api_base_url = Url::parse(&base)
            .map_err(|e| AppError::config(format!("Invalid base URL {:?}: {}", self.base_url, e)))?;

        if self.max_edge == 0 {
            return Err(AppError::config("Max edge must be greater than zero"));
        }
        if !(0.0..=1.0).contains(&self.quality) {
            return Err(AppError::config(format!(
                "Quality must be within [0, 1], got {}",
                self.quality
            )));
        }
        if self.timeout.is_zero() {
            return Err(AppError::config("Request timeout must be greater than zero"));
        }

        Ok(Config {
            api_base_url,
            request_timeout: self.timeout,
            preprocess: PreprocessOptions {
                max_edge: self.max_edge,
                quality: self.quality,
                format: self.format,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_join_onto_base_path() {
        let config = Config::builder()
            .with_base_url("https://tools.example.com/api/v1")
            .build()
            .unwrap();
        assert_eq!(
            config.segment_url().unwrap().as_str(),
            "https://tools.example.com/api/v1/cutout/segment"
        );
        assert_eq!(
            config.health_url().unwrap().as_str(),
            "https://tools.example.com/api/v1/cutout/health"
        );
    }

    #[test]
    fn defaults_match_upload_transform() {
        let config = Config::builder().build().unwrap();
        assert_eq!(config.preprocess, PreprocessOptions::default());
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            Config::builder().with_quality(1.5).build(),
            Err(AppError::Config(_))
        ));
        assert!(matches!(
            Config::builder().with_max_edge(0).build(),
            Err(AppError::Config(_))
        ));
        assert!(matches!(
            Config::builder().with_base_url("not a url").build(),
            Err(AppError::Config(_))
        ));
    }
}
