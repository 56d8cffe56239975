use formkit::form::{FieldLens, FormModel, ObjectAccessor};

#[derive(Clone, serde::Serialize, serde::Deserialize, formkit::form::FormModel)]
struct DemoForm {
    email: String,
}

fn main() {
    let fields = DemoForm::fields();
    let lens = fields.email();
    assert_eq!(lens.key().as_str(), "email");

    let object = ObjectAccessor::new(DemoForm {
        email: "a@formkit.dev".to_string(),
    })
    .expect("record");
    object
        .field(lens)
        .set_value("b@formkit.dev".to_string())
        .expect("encode");
    assert_eq!(object.field(lens).value().as_deref(), Some("b@formkit.dev"));
}
