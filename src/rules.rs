//! Per-field rules for the registration form.
//!
//! Fields are described by a declarative table ([`FIELD_RULES`]); the rule
//! set walks the table generically. The disposable-domain deny-list and the
//! WhatsApp country-code allow-list come from [`RulesConfig`] at
//! construction time.
//!
//! Every failure produces exactly one Spanish message per field.

use crate::config::RulesConfig;
use crate::record::Field;
use crate::sanitize::{contains_markup, sanitize};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use url::Url;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"));

static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+\d+$").expect("phone pattern is valid"));

/// Characters never accepted anywhere in an Instagram URL
const URL_FORBIDDEN_CHARS: &[char] = &['<', '>', '"', '\'', '`', '{', '}', '|', '\\', '^'];

const INSTAGRAM_HOSTS: &[&str] = &["instagram.com", "www.instagram.com"];

/// Category of a rule violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldErrorKind {
    /// Value does not match its format (email, phone, URL, markup)
    Format,
    /// Value is outside its length bounds
    Length,
    /// Required value is absent or empty after sanitizing
    Required,
    /// Value is on a deny-list
    DeniedValue,
}

impl FieldErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Format => "format",
            Self::Length => "length",
            Self::Required => "required",
            Self::DeniedValue => "denied_value",
        }
    }
}

/// A single rejected field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: Field,
    pub kind: FieldErrorKind,
    pub message: String,
}

impl FieldError {
    fn new(field: Field, kind: FieldErrorKind, message: impl Into<String>) -> Self {
        Self {
            field,
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]: {}", self.field, self.message)
    }
}

/// How a field is named in user-facing messages
#[derive(Debug, Clone, Copy)]
pub struct Label {
    pub noun: &'static str,
    pub feminine: bool,
}

impl Label {
    /// Inflect an adjective ending in `-o` for the label's gender
    fn agree(&self, adjective: &str) -> String {
        match adjective.strip_suffix('o') {
            Some(stem) if self.feminine => format!("{}a", stem),
            _ => adjective.to_string(),
        }
    }
}

/// The format check applied to a field
#[derive(Debug, Clone, Copy)]
pub enum RuleKind {
    Text { min: usize, max: usize },
    Email { min: usize, max: usize },
    Whatsapp { min_digits: usize, max_digits: usize },
    InstagramUrl,
}

/// One row of the field table
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub field: Field,
    pub label: Label,
    pub required: bool,
    /// Reject instead of silently stripping when sanitizing removes markup
    pub reject_markup: bool,
    pub kind: RuleKind,
}

pub const FIELD_RULES: &[FieldRule] = &[
    FieldRule {
        field: Field::FounderName,
        label: Label {
            noun: "El nombre del fundador",
            feminine: false,
        },
        required: false,
        reject_markup: false,
        kind: RuleKind::Text { min: 2, max: 50 },
    },
    FieldRule {
        field: Field::BusinessName,
        label: Label {
            noun: "El nombre del negocio",
            feminine: false,
        },
        required: true,
        reject_markup: true,
        kind: RuleKind::Text { min: 3, max: 80 },
    },
    FieldRule {
        field: Field::Email,
        label: Label {
            noun: "El email",
            feminine: false,
        },
        required: false,
        reject_markup: false,
        kind: RuleKind::Email { min: 5, max: 254 },
    },
    FieldRule {
        field: Field::City,
        label: Label {
            noun: "La ciudad",
            feminine: true,
        },
        required: false,
        reject_markup: false,
        kind: RuleKind::Text { min: 2, max: 50 },
    },
    FieldRule {
        field: Field::Country,
        label: Label {
            noun: "El país",
            feminine: false,
        },
        required: false,
        reject_markup: false,
        kind: RuleKind::Text { min: 2, max: 50 },
    },
    FieldRule {
        field: Field::Whatsapp,
        label: Label {
            noun: "El número de WhatsApp",
            feminine: false,
        },
        required: true,
        reject_markup: false,
        kind: RuleKind::Whatsapp {
            min_digits: 8,
            max_digits: 15,
        },
    },
    FieldRule {
        field: Field::InstagramUrl,
        label: Label {
            noun: "La URL de Instagram",
            feminine: true,
        },
        required: false,
        reject_markup: true,
        kind: RuleKind::InstagramUrl,
    },
    FieldRule {
        field: Field::Description,
        label: Label {
            noun: "La descripción",
            feminine: true,
        },
        required: false,
        reject_markup: false,
        kind: RuleKind::Text { min: 10, max: 1000 },
    },
];

/// Largest upper length bound in the field table
pub fn longest_field_limit() -> usize {
    FIELD_RULES
        .iter()
        .filter_map(|rule| match rule.kind {
            RuleKind::Text { max, .. } | RuleKind::Email { max, .. } => Some(max),
            RuleKind::Whatsapp { max_digits, .. } => Some(max_digits + 1),
            RuleKind::InstagramUrl => None,
        })
        .max()
        .unwrap_or(0)
}

/// Field rules bound to their deny/allow lists
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: &'static [FieldRule],
    disposable_domains: HashSet<String>,
    country_codes: Vec<String>,
    block_subdomains: bool,
    max_input_chars: usize,
}

impl RuleSet {
    pub fn new(config: &RulesConfig) -> Self {
        Self {
            rules: FIELD_RULES,
            disposable_domains: config
                .disposable_domains
                .iter()
                .map(|d| d.trim().to_lowercase())
                .collect(),
            country_codes: config
                .country_codes
                .iter()
                .map(|c| c.trim().trim_start_matches('+').to_string())
                .filter(|c| !c.is_empty())
                .collect(),
            block_subdomains: config.blocks_subdomains(),
            max_input_chars: config.max_input_chars(),
        }
    }

    /// The field table, in evaluation order
    pub fn rules(&self) -> &[FieldRule] {
        self.rules
    }

    pub fn rule_for(&self, field: Field) -> Option<&FieldRule> {
        self.rules.iter().find(|rule| rule.field == field)
    }

    /// Check one field in isolation.
    ///
    /// Returns the normalized value (`None` when the field is absent or an
    /// optional field sanitizes to nothing), or the single error for it.
    pub fn check_field(
        &self,
        field: Field,
        raw: Option<&str>,
    ) -> Result<Option<String>, FieldError> {
        match self.rule_for(field) {
            Some(rule) => self.check(rule, raw),
            None => Ok(raw.map(sanitize).filter(|v| !v.is_empty())),
        }
    }

    pub(crate) fn check(
        &self,
        rule: &FieldRule,
        raw: Option<&str>,
    ) -> Result<Option<String>, FieldError> {
        let field = rule.field;
        let label = &rule.label;

        let Some(raw) = raw else {
            return if rule.required {
                Err(required(rule))
            } else {
                Ok(None)
            };
        };

        // Bound the work the sanitizer's regexes can be asked to do
        if raw.chars().count() > self.max_input_chars {
            return Err(FieldError::new(
                field,
                FieldErrorKind::Length,
                format!("{} es demasiado {}", label.noun, label.agree("largo")),
            ));
        }

        let value = sanitize(raw);
        if rule.reject_markup && contains_markup(raw) {
            return Err(FieldError::new(
                field,
                FieldErrorKind::Format,
                format!("{} contiene caracteres no permitidos", label.noun),
            ));
        }

        if value.is_empty() {
            return if rule.required {
                Err(required(rule))
            } else {
                Ok(None)
            };
        }

        match rule.kind {
            RuleKind::Text { min, max } => check_length(rule, &value, min, max)?,
            RuleKind::Email { min, max } => self.check_email(field, &value, min, max)?,
            RuleKind::Whatsapp {
                min_digits,
                max_digits,
            } => self.check_whatsapp(field, &value, min_digits, max_digits)?,
            RuleKind::InstagramUrl => check_instagram_url(rule, raw)?,
        }

        Ok(Some(value))
    }

    fn check_email(
        &self,
        field: Field,
        value: &str,
        min: usize,
        max: usize,
    ) -> Result<(), FieldError> {
        let len = value.chars().count();
        if len < min || len > max {
            return Err(FieldError::new(
                field,
                FieldErrorKind::Length,
                format!("El email debe tener entre {} y {} caracteres", min, max),
            ));
        }

        if !EMAIL_RE.is_match(value) {
            return Err(FieldError::new(
                field,
                FieldErrorKind::Format,
                "Formato de email inválido",
            ));
        }

        let domain = value
            .rsplit_once('@')
            .map(|(_, d)| d.to_lowercase())
            .unwrap_or_default();
        if !domain.contains('.') {
            return Err(FieldError::new(
                field,
                FieldErrorKind::Format,
                "El dominio del email no es válido",
            ));
        }

        if self.is_disposable(&domain) {
            return Err(FieldError::new(
                field,
                FieldErrorKind::DeniedValue,
                "No se permiten emails temporales",
            ));
        }

        Ok(())
    }

    /// `domain` must already be lowercased
    fn is_disposable(&self, domain: &str) -> bool {
        if self.disposable_domains.contains(domain) {
            return true;
        }
        self.block_subdomains
            && self.disposable_domains.iter().any(|denied| {
                domain
                    .strip_suffix(denied.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
            })
    }

    fn check_whatsapp(
        &self,
        field: Field,
        value: &str,
        min_digits: usize,
        max_digits: usize,
    ) -> Result<(), FieldError> {
        let cleaned: String = value
            .chars()
            .filter(|c| !c.is_whitespace() && !matches!(c, '-' | '(' | ')'))
            .collect();

        let Some(digits) = cleaned.strip_prefix('+') else {
            return Err(FieldError::new(
                field,
                FieldErrorKind::Format,
                "El número debe comenzar con + y el código de país",
            ));
        };

        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(FieldError::new(
                field,
                FieldErrorKind::Format,
                "El número solo puede contener dígitos después del +",
            ));
        }

        if !self
            .country_codes
            .iter()
            .any(|code| digits.starts_with(code.as_str()))
        {
            return Err(FieldError::new(
                field,
                FieldErrorKind::Format,
                "Código de país no soportado",
            ));
        }

        if digits.len() < min_digits || digits.len() > max_digits {
            return Err(FieldError::new(
                field,
                FieldErrorKind::Length,
                format!(
                    "El número debe tener entre {} y {} dígitos",
                    min_digits, max_digits
                ),
            ));
        }

        if !PHONE_RE.is_match(value) {
            return Err(FieldError::new(
                field,
                FieldErrorKind::Format,
                "Escribe el número sin espacios, guiones ni paréntesis",
            ));
        }

        Ok(())
    }
}

fn required(rule: &FieldRule) -> FieldError {
    FieldError::new(
        rule.field,
        FieldErrorKind::Required,
        format!("{} es {}", rule.label.noun, rule.label.agree("obligatorio")),
    )
}

fn check_length(rule: &FieldRule, value: &str, min: usize, max: usize) -> Result<(), FieldError> {
    let len = value.chars().count();
    if len < min {
        return Err(FieldError::new(
            rule.field,
            FieldErrorKind::Length,
            format!("{} debe tener al menos {} caracteres", rule.label.noun, min),
        ));
    }
    if len > max {
        return Err(FieldError::new(
            rule.field,
            FieldErrorKind::Length,
            format!("{} no puede exceder {} caracteres", rule.label.noun, max),
        ));
    }
    Ok(())
}

/// Checks the submitted URL itself, not its sanitized form
fn check_instagram_url(rule: &FieldRule, raw: &str) -> Result<(), FieldError> {
    let field = rule.field;
    let trimmed = raw.trim();
    if trimmed
        .chars()
        .any(|c| c.is_whitespace() || URL_FORBIDDEN_CHARS.contains(&c))
    {
        return Err(FieldError::new(
            field,
            FieldErrorKind::Format,
            format!("{} contiene caracteres no permitidos", rule.label.noun),
        ));
    }

    let invalid = || {
        FieldError::new(
            field,
            FieldErrorKind::Format,
            format!("{} no es válida", rule.label.noun),
        )
    };

    let url = Url::parse(trimmed).map_err(|_| invalid())?;
    if !url.username().is_empty() || url.password().is_some() {
        return Err(invalid());
    }

    if url.scheme() != "https" {
        return Err(FieldError::new(
            field,
            FieldErrorKind::Format,
            "La URL debe usar https",
        ));
    }

    let host = url.host_str().unwrap_or_default();
    if !INSTAGRAM_HOSTS.contains(&host) {
        return Err(FieldError::new(
            field,
            FieldErrorKind::Format,
            "La URL debe ser de instagram.com",
        ));
    }

    if url.path().is_empty() || url.path() == "/" {
        return Err(FieldError::new(
            field,
            FieldErrorKind::Format,
            "La URL debe incluir el nombre de usuario",
        ));
    }

    Ok(())
}
