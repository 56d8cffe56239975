#![allow(dead_code)]

#[derive(formkit::form::FormModel)]
#[serde(rename_all = "Train-Case")]
struct Profile {
    display_name: String,
}

fn main() {}
