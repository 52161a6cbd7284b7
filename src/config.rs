use crate::error::{DocTextError, Result};
use crate::pipeline::{ErrorPolicy, ExtractionOptions};
use crate::pipeline::options::DEFAULT_FALLBACK_MAX_BYTES;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub extraction: ExtractionConfig,
    pub walk: WalkConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Defaults to the number of logical CPUs when absent.
    pub max_parallelism: Option<usize>,
    pub error_policy: ErrorPolicy,
    pub fallback_max_bytes: u64,
    pub enable_fallback: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WalkConfig {
    pub recursive: bool,
    pub max_depth: usize,
    /// Drop walked files no registered extractor claims instead of reporting them.
    pub skip_unsupported: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    /// No text files are written when unset.
    pub directory: Option<PathBuf>,
    pub preserve_structure: bool,
    pub force_overwrite: bool,
    pub write_report: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_parallelism: None,
            error_policy: ErrorPolicy::ContinueOnError,
            fallback_max_bytes: DEFAULT_FALLBACK_MAX_BYTES,
            enable_fallback: true,
        }
    }
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            recursive: true,
            max_depth: 10,
            skip_unsupported: false,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: None,
            preserve_structure: true,
            force_overwrite: false,
            write_report: true,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(DocTextError::Config {
                message: format!("Configuration file not found: {}", path.display()),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| DocTextError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| DocTextError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })?;

        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    pub fn load_with_defaults<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_file(path),
            None => {
                let default_paths = ["doctext.toml", ".doctext.toml"];

                for default_path in &default_paths {
                    if Path::new(default_path).exists() {
                        return Self::load_from_file(default_path);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    pub fn merge_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(max) = overrides.max_parallelism {
            self.extraction.max_parallelism = Some(max);
        }

        if let Some(policy) = overrides.error_policy {
            self.extraction.error_policy = policy;
        }

        if let Some(recursive) = overrides.recursive {
            self.walk.recursive = recursive;
        }

        if let Some(max_depth) = overrides.max_depth {
            self.walk.max_depth = max_depth;
        }

        if let Some(ref directory) = overrides.output_dir {
            self.output.directory = Some(directory.clone());
        }

        if let Some(force) = overrides.force_overwrite {
            self.output.force_overwrite = force;
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).map_err(|e| DocTextError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        std::fs::write(path, content).map_err(|e| DocTextError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.extraction.max_parallelism == Some(0) {
            return Err(DocTextError::Config {
                message: "Maximum parallelism must be greater than 0".to_string(),
            });
        }

        if self.extraction.fallback_max_bytes == 0 {
            return Err(DocTextError::Config {
                message: "Fallback size limit must be greater than 0".to_string(),
            });
        }

        if let Some(ref directory) = self.output.directory {
            if directory.as_os_str().is_empty() {
                return Err(DocTextError::Config {
                    message: "Output directory must not be empty".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Runtime options for a [`BatchPipeline`](crate::pipeline::BatchPipeline).
    pub fn extraction_options(&self) -> ExtractionOptions {
        let mut options = ExtractionOptions::new()
            .with_error_policy(self.extraction.error_policy)
            .with_fallback_max_bytes(self.extraction.fallback_max_bytes);

        if let Some(max) = self.extraction.max_parallelism {
            options = options.with_max_parallelism(max);
        }

        options
    }

    pub fn create_sample_config() -> String {
        let sample = Self {
            output: OutputConfig {
                directory: Some(PathBuf::from("extracted")),
                ..OutputConfig::default()
            },
            ..Self::default()
        };
        toml::to_string_pretty(&sample).unwrap_or_default()
    }
}

#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub max_parallelism: Option<usize>,
    pub error_policy: Option<ErrorPolicy>,
    pub recursive: Option<bool>,
    pub max_depth: Option<usize>,
    pub output_dir: Option<PathBuf>,
    pub force_overwrite: Option<bool>,
}

impl ConfigOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_parallelism(mut self, max: Option<usize>) -> Self {
        self.max_parallelism = max;
        self
    }

    pub fn with_error_policy(mut self, policy: Option<ErrorPolicy>) -> Self {
        self.error_policy = policy;
        self
    }

    pub fn with_recursive(mut self, recursive: Option<bool>) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_output_dir(mut self, output_dir: Option<PathBuf>) -> Self {
        self.output_dir = output_dir;
        self
    }

    pub fn with_force_overwrite(mut self, force: Option<bool>) -> Self {
        self.force_overwrite = force;
        self
    }
}
