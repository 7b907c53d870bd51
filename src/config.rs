use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::rules::longest_field_limit;

/// A validation error in the configuration
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]: {}", self.field, self.message)
    }
}

/// Throwaway-address providers rejected for the email field
pub const DEFAULT_DISPOSABLE_DOMAINS: &[&str] = &[
    "10minutemail.com",
    "guerrillamail.com",
    "mailinator.com",
    "temp-mail.org",
    "throwaway.email",
    "yopmail.com",
    "maildrop.cc",
    "tempail.com",
    "dispostable.com",
];

/// Calling codes accepted for WhatsApp numbers
pub const DEFAULT_COUNTRY_CODES: &[&str] = &[
    "1", "34", "51", "52", "54", "55", "56", "57", "58", "591", "592", "593", "595", "597", "598",
    "599", "501", "502", "503", "504", "505", "506", "507", "509",
];

fn default_max_input_chars() -> usize {
    10_000
}

fn default_audit_dir() -> PathBuf {
    Path::new(".brandcheck").join("audit")
}

/// Output format for validation reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "human" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
        }
    }
}

/// Data tables fed to the rule set
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct RulesConfig {
    #[serde(default)]
    pub disposable_domains: Vec<String>,
    #[serde(default)]
    pub country_codes: Vec<String>,
    /// Also deny subdomains of a disposable domain (`x.mailinator.com`)
    #[serde(default)]
    pub block_disposable_subdomains: Option<bool>,
    /// Raw values longer than this are rejected before sanitizing
    #[serde(default)]
    pub max_input_chars: Option<usize>,
}

impl RulesConfig {
    /// Rule tables with the built-in deny and allow lists
    pub fn builtin() -> Self {
        Self {
            disposable_domains: DEFAULT_DISPOSABLE_DOMAINS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            country_codes: DEFAULT_COUNTRY_CODES.iter().map(|s| s.to_string()).collect(),
            block_disposable_subdomains: None,
            max_input_chars: None,
        }
    }

    pub fn blocks_subdomains(&self) -> bool {
        self.block_disposable_subdomains.unwrap_or(false)
    }

    pub fn max_input_chars(&self) -> usize {
        self.max_input_chars.unwrap_or_else(default_max_input_chars)
    }
}

/// Audit log settings
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct AuditConfig {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl AuditConfig {
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    pub fn dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(default_audit_dir)
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub format: Option<OutputFormat>,
    #[serde(default)]
    pub rules: RulesConfig,
    #[serde(default)]
    pub audit: AuditConfig,
}

impl Config {
    /// Create config with the built-in rule tables
    pub fn with_builtin_rules() -> Self {
        Config {
            format: None,
            rules: RulesConfig::builtin(),
            audit: AuditConfig::default(),
        }
    }

    /// Load configuration from default paths
    /// Priority: local (.brandcheck/config.local.toml) > project (.brandcheck/config.toml)
    /// > user (~/.brandcheck/config.toml), all layered over the built-in rules
    pub fn load() -> Result<Self> {
        Self::load_layers(dirs::home_dir().as_deref(), Path::new("."))
    }

    fn load_layers(home: Option<&Path>, project_root: &Path) -> Result<Self> {
        let mut config = Self::with_builtin_rules();

        let mut layers = Vec::new();
        if let Some(home) = home {
            layers.push(home.join(".brandcheck").join("config.toml"));
        }
        let project_dir = project_root.join(".brandcheck");
        layers.push(project_dir.join("config.toml"));
        // Local overrides, should be gitignored
        layers.push(project_dir.join("config.local.toml"));

        for path in layers {
            if path.exists() {
                let layer = Self::load_from(&path)?;
                config.merge(layer);
            }
        }

        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    /// Load a single config file on top of the built-in rules
    pub fn load_explicit(path: &Path) -> Result<Self> {
        let mut config = Self::with_builtin_rules();
        config.merge(Self::load_from(path)?);
        Ok(config)
    }

    /// Merge another config into this one (other takes priority)
    /// Lists are concatenated and deduplicated, scalars are overridden if set
    pub fn merge(&mut self, other: Config) {
        extend_unique(
            &mut self.rules.disposable_domains,
            other
                .rules
                .disposable_domains
                .into_iter()
                .map(|d| d.trim().to_lowercase()),
        );
        extend_unique(
            &mut self.rules.country_codes,
            other.rules.country_codes.into_iter().map(|c| {
                c.trim().trim_start_matches('+').to_string()
            }),
        );
        if other.rules.block_disposable_subdomains.is_some() {
            self.rules.block_disposable_subdomains = other.rules.block_disposable_subdomains;
        }
        if other.rules.max_input_chars.is_some() {
            self.rules.max_input_chars = other.rules.max_input_chars;
        }

        if other.audit.enabled.is_some() {
            self.audit.enabled = other.audit.enabled;
        }
        if other.audit.dir.is_some() {
            self.audit.dir = other.audit.dir;
        }

        if other.format.is_some() {
            self.format = other.format;
        }
    }

    /// Validate configuration and return any errors found
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        for (i, domain) in self.rules.disposable_domains.iter().enumerate() {
            if !domain.contains('.')
                || domain.contains('@')
                || domain.chars().any(char::is_whitespace)
            {
                errors.push(ValidationError {
                    field: format!("rules.disposable_domains[{}]", i),
                    message: format!("Invalid domain '{}'", domain),
                });
            }
        }

        if self.rules.country_codes.is_empty() {
            errors.push(ValidationError {
                field: "rules.country_codes".to_string(),
                message: "At least one country code is required".to_string(),
            });
        }
        for (i, code) in self.rules.country_codes.iter().enumerate() {
            let well_formed = (1..=3).contains(&code.len())
                && code.chars().all(|c| c.is_ascii_digit())
                && !code.starts_with('0');
            if !well_formed {
                errors.push(ValidationError {
                    field: format!("rules.country_codes[{}]", i),
                    message: format!(
                        "Invalid country code '{}', expected 1-3 digits without leading zero",
                        code
                    ),
                });
            }
        }

        let max_input = self.rules.max_input_chars();
        if max_input < longest_field_limit() {
            errors.push(ValidationError {
                field: "rules.max_input_chars".to_string(),
                message: format!(
                    "Must be at least {} (the longest field limit), got {}",
                    longest_field_limit(),
                    max_input
                ),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn extend_unique(list: &mut Vec<String>, items: impl IntoIterator<Item = String>) {
    for item in items {
        if !list.contains(&item) {
            list.push(item);
        }
    }
}
