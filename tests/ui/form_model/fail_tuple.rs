#![allow(dead_code)]

#[derive(formkit::form::FormModel)]
struct Pair(String, u32);

fn main() {}
