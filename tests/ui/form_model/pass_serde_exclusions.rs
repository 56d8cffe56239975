use std::collections::BTreeMap;

use formkit::form::{FieldLens, FormModel, ObjectAccessor};
use serde_json::json;

#[derive(Clone, serde::Serialize, serde::Deserialize, formkit::form::FormModel)]
struct Settings {
    theme: String,
    #[serde(skip_serializing, default)]
    session_token: String,
    #[serde(flatten)]
    extra: BTreeMap<String, serde_json::Value>,
}

fn main() {
    let fields = Settings::fields();
    assert_eq!(fields.theme().key().as_str(), "theme");

    let mut extra = BTreeMap::new();
    extra.insert("density".to_string(), json!("compact"));
    let object = ObjectAccessor::new(Settings {
        theme: "dark".to_string(),
        session_token: "secret".to_string(),
        extra,
    })
    .expect("record");

    assert!(!object.record().contains_key("session_token"));
    assert_eq!(object.record().get("density"), Some(&json!("compact")));
    assert_eq!(object.field(fields.theme()).value().as_deref(), Some("dark"));
}
