//! Wire shapes exchanged with the transport collaborator.
//!
//! `Return` serializes as `{ "ok": bool, "status": number, "body"?: R | Problem<P> }` and
//! `Problem` as `{ "status", "title", "detail"?, "params"?: [{ "name", "reason" }],
//! "extension"? }`.

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ProblemParam {
    pub name: String,
    pub reason: String,
}

impl ProblemParam {
    pub fn new(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Server-reported error, optionally carrying per-field reasons in `params`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Problem<P = ()> {
    pub status: u16,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub params: Vec<ProblemParam>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<P>,
}

/// Servers also send an explicit `null` for members they leave empty.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl<P> Problem<P> {
    pub fn new(status: u16, title: impl Into<String>) -> Self {
        Self {
            status,
            title: title.into(),
            detail: None,
            params: Vec::new(),
            extension: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, reason: impl Into<String>) -> Self {
        self.params.push(ProblemParam::new(name, reason));
        self
    }

    pub fn with_extension(mut self, extension: P) -> Self {
        self.extension = Some(extension);
        self
    }

    pub fn has_field_errors(&self) -> bool {
        !self.params.is_empty()
    }
}

/// Result of one transport call.
#[derive(Clone, Debug, PartialEq)]
pub enum Return<R, P = ()> {
    Success {
        status: u16,
        body: Option<R>,
    },
    Failure {
        status: u16,
        problem: Option<Problem<P>>,
    },
}

impl<R, P> Return<R, P> {
    pub fn success(status: u16, body: R) -> Self {
        Return::Success {
            status,
            body: Some(body),
        }
    }

    pub fn failure(problem: Problem<P>) -> Self {
        Return::Failure {
            status: problem.status,
            problem: Some(problem),
        }
    }

    pub fn ok(&self) -> bool {
        matches!(self, Return::Success { .. })
    }

    pub fn status(&self) -> u16 {
        match self {
            Return::Success { status, .. } | Return::Failure { status, .. } => *status,
        }
    }

    pub fn problem(&self) -> Option<&Problem<P>> {
        match self {
            Return::Failure { problem, .. } => problem.as_ref(),
            Return::Success { .. } => None,
        }
    }
}

#[derive(Serialize)]
struct WireOut<'a, B> {
    ok: bool,
    status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<&'a B>,
}

#[derive(Deserialize)]
struct WireIn {
    ok: bool,
    status: u16,
    #[serde(default)]
    body: Option<serde_json::Value>,
}

impl<R, P> Serialize for Return<R, P>
where
    R: Serialize,
    P: Serialize,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Return::Success { status, body } => WireOut {
                ok: true,
                status: *status,
                body: body.as_ref(),
            }
            .serialize(serializer),
            Return::Failure { status, problem } => WireOut {
                ok: false,
                status: *status,
                body: problem.as_ref(),
            }
            .serialize(serializer),
        }
    }
}

impl<'de, R, P> Deserialize<'de> for Return<R, P>
where
    R: DeserializeOwned,
    P: DeserializeOwned,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = WireIn::deserialize(deserializer)?;
        if wire.ok {
            let body = wire
                .body
                .map(serde_json::from_value::<R>)
                .transpose()
                .map_err(D::Error::custom)?;
            Ok(Return::Success {
                status: wire.status,
                body,
            })
        } else {
            let problem = wire
                .body
                .map(serde_json::from_value::<Problem<P>>)
                .transpose()
                .map_err(D::Error::custom)?;
            Ok(Return::Failure {
                status: wire.status,
                problem,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, PartialEq, Deserialize, Serialize)]
    struct Created {
        id: u32,
    }

    #[test]
    fn failure_body_without_title_parses_as_problem() {
        let parsed: Return<Created> = serde_json::from_value(json!({
            "ok": false,
            "status": 400,
            "body": { "status": 400, "params": [{ "name": "f1", "reason": "x" }] }
        }))
        .expect("failure return parses");
        let problem = parsed.problem().expect("problem body");
        assert!(!parsed.ok());
        assert_eq!(problem.title, "");
        assert_eq!(problem.params, vec![ProblemParam::new("f1", "x")]);
    }

    #[test]
    fn null_members_decode_as_empty() {
        let parsed: Return<Created> = serde_json::from_value(json!({
            "ok": false,
            "status": 500,
            "body": { "status": 500, "title": null, "params": null, "detail": null }
        }))
        .expect("failure return with null members parses");
        let problem = parsed.problem().expect("problem body");
        assert_eq!(problem.title, "");
        assert!(problem.params.is_empty());
        assert_eq!(problem.detail, None);
    }

    #[test]
    fn success_body_is_decoded_by_ok_flag() {
        let parsed: Return<Created> =
            serde_json::from_value(json!({ "ok": true, "status": 201, "body": { "id": 7 } }))
                .expect("success return parses");
        assert_eq!(parsed, Return::success(201, Created { id: 7 }));

        let empty: Return<Created> =
            serde_json::from_value(json!({ "ok": true, "status": 204 })).expect("empty body");
        assert_eq!(
            empty,
            Return::Success {
                status: 204,
                body: None
            }
        );
    }

    #[test]
    fn problem_omits_absent_members_on_output() {
        let problem = Problem::<()>::new(409, "Conflict");
        assert_eq!(
            serde_json::to_value(Return::<Created>::failure(problem)).expect("serializes"),
            json!({ "ok": false, "status": 409, "body": { "status": 409, "title": "Conflict" } })
        );
    }

    #[test]
    fn extension_payload_round_trips_through_wire_shape() {
        let problem = Problem::new(422, "Unprocessable")
            .with_detail("check the fields")
            .with_param("email", "taken")
            .with_extension(json!({ "trace": "abc" }));
        let wire = serde_json::to_value(&problem).expect("serializes");
        assert_eq!(wire["extension"]["trace"], "abc");
        assert_eq!(wire["params"][0]["reason"], "taken");
        let back: Problem<serde_json::Value> = serde_json::from_value(wire).expect("parses");
        assert_eq!(back, problem);
    }
}
