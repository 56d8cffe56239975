use formkit::form::{FieldLens, FormModel};

#[derive(Clone, serde::Serialize, serde::Deserialize, formkit::form::FormModel)]
#[serde(rename_all = "camelCase")]
struct SignupForm {
    display_name: String,
    #[serde(rename = "mail")]
    email_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    referral_code: Option<String>,
    #[serde(skip)]
    #[allow(dead_code)]
    scratch: u32,
}

fn main() {
    let fields = SignupForm::fields();
    assert_eq!(fields.display_name().key().as_str(), "displayName");
    assert_eq!(fields.email_address().key().as_str(), "mail");
    assert_eq!(fields.referral_code().key().as_str(), "referralCode");
}
