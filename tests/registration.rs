use brandcheck::{
    sanitize, Config, Field, FieldErrorKind, RegistrationRecord, RulesConfig, SchemaError,
    Validation, Validator,
};
use serde_json::{json, Value};
use std::path::PathBuf;

fn validator() -> Validator {
    Validator::new(&RulesConfig::builtin())
}

fn fixture(name: &str) -> Value {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join("submissions")
        .join(name);
    let text = std::fs::read_to_string(&path).unwrap();
    serde_json::from_str(&text).unwrap()
}

fn base() -> serde_json::Map<String, Value> {
    json!({"businessName": "Café Paradiso", "whatsapp": "+51987654321"})
        .as_object()
        .unwrap()
        .clone()
}

fn with(field: &str, value: &str) -> Value {
    let mut form = base();
    form.insert(field.to_string(), Value::String(value.to_string()));
    Value::Object(form)
}

fn error_for(outcome: &Validation, field: Field) -> Option<(FieldErrorKind, String)> {
    outcome
        .errors()
        .iter()
        .find(|e| e.field == field)
        .map(|e| (e.kind, e.message.clone()))
}

#[test]
fn test_cafe_paradiso_end_to_end() {
    let outcome = validator().validate(&fixture("cafe_paradiso.json")).unwrap();
    assert_eq!(
        outcome,
        Validation::Valid {
            value: RegistrationRecord {
                business_name: "Café Paradiso".to_string(),
                whatsapp: "+51987654321".to_string(),
                ..Default::default()
            }
        }
    );
    let json = serde_json::to_value(outcome.record().unwrap()).unwrap();
    assert_eq!(json.as_object().unwrap().len(), 2);
}

#[test]
fn test_full_registration_fixture() {
    let outcome = validator().validate(&fixture("full_registration.json")).unwrap();
    let record = outcome.record().expect("fixture should be valid");
    assert_eq!(record.founder_name.as_deref(), Some("Lucía Fernández"));
    assert_eq!(
        record.instagram_url.as_deref(),
        Some("https://www.instagram.com/cevicheriadelpuerto")
    );
    assert_eq!(record.present_fields().len(), 8);
}

#[test]
fn test_rejected_fixture_reports_every_field() {
    let submissions = fixture("rejected.json");
    let validator = validator();
    let items = submissions.as_array().unwrap();

    let first = validator.validate(&items[0]).unwrap();
    let fields: Vec<Field> = first.errors().iter().map(|e| e.field).collect();
    assert_eq!(fields, vec![Field::BusinessName, Field::Email, Field::Whatsapp]);
    let (_, message) = error_for(&first, Field::BusinessName).unwrap();
    assert!(message.contains("caracteres no permitidos"));

    let second = validator.validate(&items[1]).unwrap();
    let fields: Vec<Field> = second.errors().iter().map(|e| e.field).collect();
    assert_eq!(
        fields,
        vec![
            Field::BusinessName,
            Field::Whatsapp,
            Field::InstagramUrl,
            Field::Description
        ]
    );
}

#[test]
fn test_required_fields() {
    let validator = validator();
    let cases = [
        json!({}),
        json!({"businessName": "Café Paradiso"}),
        json!({"whatsapp": "+51987654321"}),
        json!({"businessName": "", "whatsapp": "+51987654321"}),
        json!({"businessName": "Café Paradiso", "whatsapp": "   "}),
        json!({"businessName": "<>'\"", "whatsapp": "+51987654321"}),
    ];
    for case in cases {
        let outcome = validator.validate(&case).unwrap();
        assert!(!outcome.is_valid(), "{} should be rejected", case);
    }
}

#[test]
fn test_whatsapp_acceptance() {
    let validator = validator();
    for phone in ["+51987654321", "+521234567890", "+5511987654321"] {
        assert!(validator.validate(&with("whatsapp", phone)).unwrap().is_valid());
    }
    for phone in ["987654321", "+51 987654321", "+99987654321"] {
        let outcome = validator.validate(&with("whatsapp", phone)).unwrap();
        assert!(error_for(&outcome, Field::Whatsapp).is_some(), "{}", phone);
    }
}

#[test]
fn test_email_rules() {
    let validator = validator();

    let outcome = validator
        .validate(&with("email", "test@10minutemail.com"))
        .unwrap();
    let (kind, message) = error_for(&outcome, Field::Email).unwrap();
    assert_eq!(kind, FieldErrorKind::DeniedValue);
    assert!(message.contains("emails temporales"));

    assert!(validator
        .validate(&with("email", "test@example.com"))
        .unwrap()
        .is_valid());

    let outcome = validator.validate(&with("email", "")).unwrap();
    assert!(outcome.is_valid());
    assert_eq!(outcome.record().unwrap().email, None);
}

#[test]
fn test_instagram_rules() {
    let validator = validator();
    assert!(validator
        .validate(&with("instagramUrl", "https://www.instagram.com/username"))
        .unwrap()
        .is_valid());
    for url in [
        "http://www.instagram.com/username",
        "https://www.instagram.com/",
        "https://www.facebook.com/username",
    ] {
        let outcome = validator.validate(&with("instagramUrl", url)).unwrap();
        assert!(error_for(&outcome, Field::InstagramUrl).is_some(), "{}", url);
    }
}

#[test]
fn test_instagram_markup_is_rejected_not_stripped() {
    let validator = validator();
    for url in [
        "javascript:https://www.instagram.com/x",
        "data:https://instagram.com/u",
        "https://www.insta&lt;gram.com/x",
    ] {
        let outcome = validator.validate(&with("instagramUrl", url)).unwrap();
        let (kind, message) = error_for(&outcome, Field::InstagramUrl).unwrap();
        assert_eq!(kind, FieldErrorKind::Format, "{}", url);
        assert!(message.contains("caracteres no permitidos"), "{}", url);
    }
}

#[test]
fn test_only_camel_case_keys_are_fields() {
    let validator = validator();
    let outcome = validator
        .validate(&json!({"business_name": "Pan y Vino", "whatsapp": "+34612345678"}))
        .unwrap();
    let (kind, _) = error_for(&outcome, Field::BusinessName).unwrap();
    assert_eq!(kind, FieldErrorKind::Required);

    let mut form = base();
    form.insert("instagram_url".to_string(), json!(42));
    let outcome = validator.validate(&Value::Object(form)).unwrap();
    assert!(outcome.is_valid());
    assert_eq!(outcome.record().unwrap().instagram_url, None);
}

#[test]
fn test_business_name_bounds() {
    let validator = validator();
    let long = "n".repeat(81);
    for name in ["AB", long.as_str()] {
        let outcome = validator.validate(&with("businessName", name)).unwrap();
        let (kind, _) = error_for(&outcome, Field::BusinessName).unwrap();
        assert_eq!(kind, FieldErrorKind::Length);
    }
    let outcome = validator
        .validate(&with("businessName", "Mi <script>negocio</script>"))
        .unwrap();
    let (_, message) = error_for(&outcome, Field::BusinessName).unwrap();
    assert!(message.contains("caracteres no permitidos"));
}

#[test]
fn test_description_rules() {
    let validator = validator();
    assert!(validator.validate(&Value::Object(base())).unwrap().is_valid());

    let outcome = validator.validate(&with("description", "Corto")).unwrap();
    let (kind, _) = error_for(&outcome, Field::Description).unwrap();
    assert_eq!(kind, FieldErrorKind::Length);

    let text = "Panadería artesanal con masa madre, horneamos cada mañana desde 1985.";
    let outcome = validator.validate(&with("description", text)).unwrap();
    assert_eq!(outcome.record().unwrap().description.as_deref(), Some(text));
}

#[test]
fn test_validation_is_deterministic() {
    let validator = validator();
    let submission = fixture("rejected.json")[0].clone();
    let first = validator.validate(&submission).unwrap();
    for _ in 0..5 {
        assert_eq!(validator.validate(&submission).unwrap(), first);
    }
}

#[test]
fn test_sanitize_properties() {
    let inputs = [
        "<script>document.cookie</script>Bodega",
        "Tacos \"El Güero\" & 'Hermanos'",
        "`rm -rf` <iframe src=x></iframe>",
        "javajavascript:script:alert(1)",
        "   espacios    múltiples   ",
    ];
    for input in inputs {
        let once = sanitize(input);
        assert_eq!(sanitize(&once), once);
        for needle in ["<", ">", "\"", "'", "`", "<script>", "<iframe>"] {
            assert!(!once.contains(needle));
        }
    }
}

#[test]
fn test_internal_errors_are_distinct() {
    let validator = validator();
    assert!(matches!(
        validator.validate(&json!("Café Paradiso")),
        Err(SchemaError::NotAnObject("string"))
    ));
    assert!(matches!(
        validator.validate(&json!({"businessName": ["Café"], "whatsapp": "+51987654321"})),
        Err(SchemaError::NotAString {
            field: Field::BusinessName,
            ..
        })
    ));
}

#[test]
fn test_config_extends_rule_tables() {
    let layer: Config = toml::from_str(
        "[rules]\ndisposable_domains = [\"trashmail.com\"]\ncountry_codes = [\"53\"]\n",
    )
    .unwrap();
    let mut config = Config::with_builtin_rules();
    config.merge(layer);
    let validator = Validator::new(&config.rules);

    let outcome = validator
        .validate(&json!({
            "businessName": "Paladar Habana",
            "whatsapp": "+5351234567",
            "email": "hola@trashmail.com"
        }))
        .unwrap();
    let fields: Vec<Field> = outcome.errors().iter().map(|e| e.field).collect();
    assert_eq!(fields, vec![Field::Email]);
}
