//! Brand-registration input validation and sanitization.
//!
//! ```
//! use brandcheck::{RulesConfig, Validator};
//! use serde_json::json;
//!
//! let validator = Validator::new(&RulesConfig::builtin());
//! let outcome = validator
//!     .validate(&json!({"businessName": "Café Paradiso", "whatsapp": "+51987654321"}))
//!     .unwrap();
//! assert!(outcome.is_valid());
//! ```

pub mod audit;
pub mod config;
pub mod record;
pub mod rules;
pub mod sanitize;
pub mod schema;

pub use config::{Config, RulesConfig};
pub use record::{Field, RegistrationRecord};
pub use rules::{FieldError, FieldErrorKind, RuleSet};
pub use sanitize::sanitize;
pub use schema::{SchemaError, Validation, Validator};
