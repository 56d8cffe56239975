#![allow(dead_code)]

#[derive(formkit::form::FormModel)]
enum Choice {
    Yes,
    No,
}

fn main() {}
