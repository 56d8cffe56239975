use proc_macro::TokenStream;
use proc_macro2::{Ident, Span, TokenStream as TokenStream2};
use proc_macro_crate::{FoundCrate, crate_name};
use quote::{format_ident, quote};
use syn::ext::IdentExt;
use syn::{Attribute, Data, DeriveInput, Fields, LitStr, Token, parse_macro_input};

#[proc_macro_derive(FormModel, attributes(serde))]
pub fn derive_form_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(input) {
        Ok(tokens) => tokens.into(),
        Err(error) => error.to_compile_error().into(),
    }
}

fn expand(input: DeriveInput) -> syn::Result<TokenStream2> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            input.ident,
            "FormModel derive currently supports only non-generic structs",
        ));
    }

    let model_ident = input.ident;
    let fields_struct_ident = format_ident!("{model_ident}Fields");
    let rename_all = container_rename_rule(&input.attrs)?;

    let named_fields = match input.data {
        Data::Struct(data) => match data.fields {
            Fields::Named(fields) => fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &model_ident,
                    "FormModel derive requires a struct with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &model_ident,
                "FormModel derive is only supported on structs",
            ));
        }
    };

    let formkit = formkit_path();
    let mut lens_defs = Vec::new();
    let mut fields_methods = Vec::new();

    for field in named_fields {
        let Some(field_ident) = field.ident else {
            continue;
        };
        let serde = field_serde_attrs(&field.attrs)?;
        if serde.excluded {
            continue;
        }
        let field_ty = field.ty;
        let rust_name = field_ident.unraw().to_string();
        let key = serde
            .rename
            .unwrap_or_else(|| rename_all.apply(&rust_name));
        let lens_ident = format_ident!("{model_ident}{}Lens", to_pascal_case(&rust_name));

        lens_defs.push(quote! {
            #[derive(Clone, Copy, Debug, Default)]
            pub struct #lens_ident;

            impl #formkit::form::FieldLens<#model_ident> for #lens_ident {
                type Value = #field_ty;

                fn key(self) -> #formkit::form::FieldKey {
                    #formkit::form::FieldKey::new(#key)
                }
            }
        });

        fields_methods.push(quote! {
            pub const fn #field_ident(&self) -> #lens_ident {
                #lens_ident
            }
        });
    }

    Ok(quote! {
        #[derive(Clone, Copy, Debug, Default)]
        pub struct #fields_struct_ident;

        impl #fields_struct_ident {
            #(#fields_methods)*
        }

        impl #formkit::form::FormModel for #model_ident {
            type Fields = #fields_struct_ident;

            fn fields() -> Self::Fields {
                #fields_struct_ident
            }
        }

        #(#lens_defs)*
    })
}

#[derive(Default)]
struct FieldSerde {
    rename: Option<String>,
    excluded: bool,
}

/// Fields that never reach the serialized record get no lens.
fn field_serde_attrs(attrs: &[Attribute]) -> syn::Result<FieldSerde> {
    let mut parsed = FieldSerde::default();
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("serde")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") && meta.input.peek(Token![=]) {
                let value: LitStr = meta.value()?.parse()?;
                parsed.rename = Some(value.value());
            } else if meta.path.is_ident("skip")
                || meta.path.is_ident("skip_serializing")
                || meta.path.is_ident("flatten")
            {
                parsed.excluded = true;
            } else {
                skip_meta_value(&meta)?;
            }
            Ok(())
        })?;
    }
    Ok(parsed)
}

fn container_rename_rule(attrs: &[Attribute]) -> syn::Result<RenameRule> {
    let mut rule = RenameRule::None;
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("serde")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename_all") && meta.input.peek(Token![=]) {
                let value: LitStr = meta.value()?.parse()?;
                rule = RenameRule::parse(&value.value()).ok_or_else(|| {
                    syn::Error::new(
                        value.span(),
                        format!("unsupported rename_all style `{}`", value.value()),
                    )
                })?;
            } else {
                skip_meta_value(&meta)?;
            }
            Ok(())
        })?;
    }
    Ok(rule)
}

fn skip_meta_value(meta: &syn::meta::ParseNestedMeta<'_>) -> syn::Result<()> {
    if meta.input.peek(Token![=]) {
        let _: syn::Expr = meta.value()?.parse()?;
    } else if meta.input.peek(syn::token::Paren) {
        let _: proc_macro2::Group = meta.input.parse()?;
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum RenameRule {
    None,
    Lower,
    Upper,
    Pascal,
    Camel,
    Snake,
    ScreamingSnake,
    Kebab,
    ScreamingKebab,
}

impl RenameRule {
    fn parse(style: &str) -> Option<Self> {
        Some(match style {
            "lowercase" => RenameRule::Lower,
            "UPPERCASE" => RenameRule::Upper,
            "PascalCase" => RenameRule::Pascal,
            "camelCase" => RenameRule::Camel,
            "snake_case" => RenameRule::Snake,
            "SCREAMING_SNAKE_CASE" => RenameRule::ScreamingSnake,
            "kebab-case" => RenameRule::Kebab,
            "SCREAMING-KEBAB-CASE" => RenameRule::ScreamingKebab,
            _ => return None,
        })
    }

    fn apply(self, field: &str) -> String {
        match self {
            RenameRule::None | RenameRule::Snake => field.to_string(),
            RenameRule::Lower => field.to_ascii_lowercase(),
            RenameRule::Upper | RenameRule::ScreamingSnake => field.to_ascii_uppercase(),
            RenameRule::Pascal => to_pascal_case(field),
            RenameRule::Camel => {
                let pascal = to_pascal_case(field);
                let mut chars = pascal.chars();
                match chars.next() {
                    Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
                    None => pascal,
                }
            }
            RenameRule::Kebab => field.replace('_', "-"),
            RenameRule::ScreamingKebab => field.replace('_', "-").to_ascii_uppercase(),
        }
    }
}

fn formkit_path() -> TokenStream2 {
    match crate_name("formkit") {
        Ok(FoundCrate::Name(name)) => {
            let ident = Ident::new(&name, Span::call_site());
            quote!(::#ident)
        }
        Ok(FoundCrate::Itself) => quote!(crate),
        Err(_) => quote!(::formkit),
    }
}

fn to_pascal_case(input: &str) -> String {
    let mut out = String::new();
    for segment in input.split('_') {
        if segment.is_empty() {
            continue;
        }
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            out.push(first.to_ascii_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expanded(input: DeriveInput) -> String {
        expand(input).expect("derive expands").to_string()
    }

    #[test]
    fn skipped_and_flattened_fields_get_no_lens() {
        let output = expanded(syn::parse_quote! {
            struct Settings {
                theme: String,
                #[serde(skip_serializing, default)]
                session_token: String,
                #[serde(flatten)]
                extra: std::collections::BTreeMap<String, String>,
                #[serde(skip)]
                cache: u32,
            }
        });
        assert!(output.contains("SettingsThemeLens"));
        assert!(!output.contains("SettingsSessionTokenLens"));
        assert!(!output.contains("SettingsExtraLens"));
        assert!(!output.contains("SettingsCacheLens"));
    }

    #[test]
    fn serde_attribute_arguments_are_read_or_skipped() {
        let attrs: Vec<Attribute> = vec![
            syn::parse_quote!(#[serde(default = "fallback", rename = "mail")]),
            syn::parse_quote!(#[serde(with = "codec", rename(deserialize = "email"))]),
        ];
        let parsed = field_serde_attrs(&attrs).expect("attributes parse");
        assert_eq!(parsed.rename.as_deref(), Some("mail"));
        assert!(!parsed.excluded);
    }

    #[test]
    fn unsupported_shapes_are_rejected() {
        let rejected: [DeriveInput; 4] = [
            syn::parse_quote!(struct Pair(String, u32);),
            syn::parse_quote!(enum Choice { Yes, No }),
            syn::parse_quote!(struct Wrapper<T> { value: T }),
            syn::parse_quote! {
                #[serde(rename_all = "Train-Case")]
                struct Profile { display_name: String }
            },
        ];
        for input in rejected {
            assert!(expand(input).is_err());
        }
    }

    #[test]
    fn rename_rules_match_serde_field_conventions() {
        assert_eq!(RenameRule::Camel.apply("confirm_password"), "confirmPassword");
        assert_eq!(RenameRule::Pascal.apply("confirm_password"), "ConfirmPassword");
        assert_eq!(RenameRule::Kebab.apply("confirm_password"), "confirm-password");
        assert_eq!(
            RenameRule::ScreamingSnake.apply("confirm_password"),
            "CONFIRM_PASSWORD"
        );
        assert_eq!(RenameRule::Camel.apply("email"), "email");
        assert_eq!(RenameRule::parse("Train-Case"), None);
    }
}
