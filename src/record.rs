//! The brand-registration record and its field names.

use serde::{Deserialize, Serialize};

/// A known registration form field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    FounderName,
    BusinessName,
    Email,
    City,
    Country,
    Whatsapp,
    InstagramUrl,
    Description,
}

impl Field {
    pub const ALL: [Field; 8] = [
        Field::FounderName,
        Field::BusinessName,
        Field::Email,
        Field::City,
        Field::Country,
        Field::Whatsapp,
        Field::InstagramUrl,
        Field::Description,
    ];

    /// Form key as submitted by the frontend
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FounderName => "founderName",
            Self::BusinessName => "businessName",
            Self::Email => "email",
            Self::City => "city",
            Self::Country => "country",
            Self::Whatsapp => "whatsapp",
            Self::InstagramUrl => "instagramUrl",
            Self::Description => "description",
        }
    }

    /// Look up a field by its exact form key
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.as_str() == key)
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sanitized, validated registration. Absent fields are `None` and are
/// omitted when serialized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub founder_name: Option<String>,
    pub business_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    pub whatsapp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instagram_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl RegistrationRecord {
    /// Store a normalized value. Required fields are only ever set with
    /// `Some`, so `None` leaves them untouched.
    pub(crate) fn set(&mut self, field: Field, value: Option<String>) {
        match field {
            Field::FounderName => self.founder_name = value,
            Field::BusinessName => {
                if let Some(v) = value {
                    self.business_name = v;
                }
            }
            Field::Email => self.email = value,
            Field::City => self.city = value,
            Field::Country => self.country = value,
            Field::Whatsapp => {
                if let Some(v) = value {
                    self.whatsapp = v;
                }
            }
            Field::InstagramUrl => self.instagram_url = value,
            Field::Description => self.description = value,
        }
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        match field {
            Field::FounderName => self.founder_name.as_deref(),
            Field::BusinessName => Some(self.business_name.as_str()),
            Field::Email => self.email.as_deref(),
            Field::City => self.city.as_deref(),
            Field::Country => self.country.as_deref(),
            Field::Whatsapp => Some(self.whatsapp.as_str()),
            Field::InstagramUrl => self.instagram_url.as_deref(),
            Field::Description => self.description.as_deref(),
        }
    }

    /// Names of the fields that carry a value
    pub fn present_fields(&self) -> Vec<&'static str> {
        Field::ALL
            .iter()
            .filter(|f| self.get(**f).is_some())
            .map(|f| f.as_str())
            .collect()
    }
}
