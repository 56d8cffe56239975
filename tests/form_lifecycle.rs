use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use formkit::form::{
    FieldKind, FormDraftStore, FormId, InMemoryDraftStore, NativeFormEvent, Record,
};
use formkit::prelude::*;
use futures::executor::block_on;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Signup {
    email: String,
    display_name: String,
    age: Option<u32>,
}

#[derive(Clone, Copy)]
struct DisplayName;

impl FieldLens<Signup> for DisplayName {
    type Value = String;

    fn key(self) -> FieldKey {
        FieldKey::new("displayName")
    }
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Account {
    id: u64,
}

fn blank_signup() -> Signup {
    Signup {
        email: String::new(),
        display_name: String::new(),
        age: None,
    }
}

fn require_email(signup: &Signup) -> Option<FieldErrors> {
    signup
        .email
        .is_empty()
        .then(|| field_errors([("email", "Email is required")]))
}

fn server(signup: Signup) -> Return<Account> {
    if signup.email.ends_with("@taken.example") {
        Return::failure(Problem::new(409, "Conflict").with_param("email", "Already registered"))
    } else {
        Return::success(201, Account { id: 42 })
    }
}

#[test]
fn signup_round_trip_through_validation_server_and_success() {
    let object = ObjectAccessor::new(blank_signup()).expect("record");
    let created = Arc::new(AtomicUsize::new(0));
    let problems = Arc::new(AtomicUsize::new(0));
    let form = {
        let created = created.clone();
        let problems = problems.clone();
        FormAccessor::new(object.clone(), |signup: Signup| async move { server(signup) })
            .with_validation(require_email)
            .on_success(move |account: Option<&Account>| {
                if account.is_some_and(|account| account.id == 42) {
                    created.fetch_add(1, Ordering::SeqCst);
                }
            })
            .with_problem_handler(move |_problem: Option<Problem>| {
                problems.fetch_add(1, Ordering::SeqCst);
                async {}
            })
    };

    assert_eq!(
        block_on(form.submit()).expect("submit runs"),
        SubmitOutcome::Invalid
    );
    let email = object.accessor("email");
    assert_eq!(email.error().as_deref(), Some("Email is required"));
    assert!(email.has_help());

    email.set_input("ann@taken.example").expect("text input");
    assert_eq!(email.error(), None);
    let outcome = block_on(form.submit()).expect("submit runs");
    assert!(matches!(outcome, SubmitOutcome::Failed { status: 409, .. }));
    assert_eq!(email.error().as_deref(), Some("Already registered"));
    assert_eq!(problems.load(Ordering::SeqCst), 1);

    email.set_input("ann@example.com").expect("text input");
    object
        .field(DisplayName)
        .set_value("Ann".into())
        .expect("encodes");
    object
        .accessor_of_kind("age", FieldKind::Number)
        .set_input("37")
        .expect("number input");
    let outcome = block_on(form.submit()).expect("submit runs");

    assert!(outcome.is_success());
    assert_eq!(created.load(Ordering::SeqCst), 1);
    assert!(!form.submitting());
    assert_eq!(
        object.object(None).expect("decodes"),
        Some(Signup {
            email: "ann@example.com".into(),
            display_name: "Ann".into(),
            age: Some(37),
        })
    );
}

#[test]
fn native_reset_event_discards_edits() {
    let form = FormAccessor::new(
        ObjectAccessor::new(blank_signup()).expect("record"),
        |signup: Signup| async move { server(signup) },
    );
    let events = form.events();
    form.object()
        .accessor("displayName")
        .set_value(json!("Draft name"));
    form.object()
        .accessor("email")
        .set_error(Some("stale".into()));
    assert!(!form.object().is_at_preset());

    let mut event = NativeFormEvent::new();
    events.on_reset(&mut event);

    assert!(event.default_prevented());
    assert!(form.object().is_at_preset());
    assert!(!form.object().has_errors());
    assert_eq!(form.object().accessor("displayName").value(), json!(""));
}

#[test]
fn standalone_field_accessor_behaves_like_record_field() {
    let field = FieldAccessor::new("volume", 5_u8).with_kind(FieldKind::Number);
    let seen = Arc::new(AtomicUsize::new(0));
    {
        let seen = seen.clone();
        field.on_change(move |new: &u8, old: &u8| {
            assert_eq!((*new, *old), (7, 5));
            seen.fetch_add(1, Ordering::SeqCst);
        });
    }

    field.set_value(7);
    field.set_value(7);
    assert!(!field.is_at_preset());
    field.set_preset(7);
    assert!(field.is_at_preset());
    assert_eq!(seen.load(Ordering::SeqCst), 1);
}

#[test]
fn drafts_survive_a_new_view_of_the_same_entity() {
    let store = InMemoryDraftStore::new();
    let entity = FormId(90_210);

    let first_view = ObjectAccessor::new(blank_signup())
        .expect("record")
        .with_form_id(entity);
    first_view.accessor("email").set_value(json!("half-typed@"));
    first_view.save_draft(&store).expect("saves");

    let saved: Option<Record> = store.load(entity).expect("in-memory load");
    assert_eq!(
        saved.and_then(|record| record.get("email").cloned()),
        Some(json!("half-typed@"))
    );

    let second_view = ObjectAccessor::new(blank_signup())
        .expect("record")
        .with_form_id(entity);
    assert!(second_view.load_draft(&store).expect("loads"));
    assert_eq!(second_view.dirty_fields(), vec![FieldKey::from("email")]);
}

#[test]
fn typed_access_without_a_lens() {
    let object = ObjectAccessor::new(Signup {
        email: "a@example.com".into(),
        display_name: "A".into(),
        age: Some(3),
    })
    .expect("record");
    let age = object.typed::<Option<u32>>("age");

    assert_eq!(age.value(), Some(Some(3)));
    age.set_value(None).expect("encodes");
    assert_eq!(object.record().get("age"), Some(&json!(null)));
    age.reset();
    assert_eq!(age.value(), Some(Some(3)));
}
