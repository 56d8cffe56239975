#![allow(dead_code)]

#[derive(formkit::form::FormModel)]
struct Wrapper<T> {
    value: T,
}

fn main() {}
