//! Derive macros for the settings-records store
//!
//! This crate provides `#[derive(SettingsRecord)]`, which maps every named
//! field of a struct to one column of a single-row table.
//!
//! # Usage
//!
//! ```text
//! use settings_records::SettingsRecord;
//!
//! #[derive(Clone, Default, SettingsRecord)]
//! #[record(table = "settings")]
//! struct AppSettings {
//!     #[column(name = "isOn")]
//!     is_on: bool,
//!
//!     api: Option<String>,
//!
//!     #[column(skip)]
//!     session_only: u32,
//! }
//! ```

use proc_macro::TokenStream;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Expr, Fields, Ident, Lit, Meta, Path, Type, parse_macro_input};

/// Derive macro for generating `SettingsRecord` implementations.
///
/// # Attributes
///
/// ## Container attributes (`#[record(...)]`)
/// - `table = "name"` - Table holding the row (default: struct name in snake_case)
/// - `empty = "path::to::fn"` - Function returning the empty record
///   (default: `Default::default`)
///
/// ## Field attributes (`#[column(...)]`)
/// - `name = "column"` - Column name (default: field name)
/// - `skip` - Keep the field in memory only; decoding takes it from the empty record
#[proc_macro_derive(SettingsRecord, attributes(record, column))]
pub fn derive_settings_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

struct Column<'a> {
    field: &'a Ident,
    ty: &'a Type,
    name: String,
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let container = parse_container_attrs(&input.attrs)?;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    input,
                    "SettingsRecord can only be derived for structs with named fields.\n\nExample:\n  #[derive(SettingsRecord)]\n  struct MySettings {\n      field: Type,\n  }",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "SettingsRecord can only be derived for structs.\n\nTry: #[derive(SettingsRecord)] on a struct, not an enum or union.",
            ));
        }
    };

    let mut columns = Vec::new();
    let mut skipped = Vec::new();
    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let attrs = parse_field_attrs(&field.attrs)?;
        if attrs.skip {
            skipped.push(ident);
            continue;
        }
        columns.push(Column {
            field: ident,
            ty: &field.ty,
            name: attrs.name.unwrap_or_else(|| ident.to_string()),
        });
    }

    if let Some(duplicate) = first_duplicate(&columns) {
        return Err(syn::Error::new_spanned(
            duplicate.field,
            format!("column \"{}\" is declared more than once", duplicate.name),
        ));
    }

    let table = container
        .table
        .unwrap_or_else(|| to_snake_case(&name.to_string()));
    let empty = match &container.empty {
        Some(path) => quote! { #path() },
        None => quote! { <Self as ::core::default::Default>::default() },
    };

    let defs = columns.iter().map(|c| {
        let (col, ty) = (&c.name, c.ty);
        quote! {
            ::settings_records::ColumnDef::new(
                #col,
                <#ty as ::settings_records::ColumnValue>::COLUMN_TYPE,
            )
        }
    });
    let encoders = columns.iter().map(|c| {
        let (col, field) = (&c.name, c.field);
        quote! { row.set(#col, &self.#field); }
    });
    let decoders = columns.iter().map(|c| {
        let (col, field, ty) = (&c.name, c.field, c.ty);
        quote! { #field: row.get::<#ty>(#col).unwrap_or(empty.#field), }
    });

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::settings_records::SettingsRecord for #name #ty_generics #where_clause {
            const TABLE: &'static str = #table;

            fn empty() -> Self {
                #empty
            }

            fn columns() -> ::std::vec::Vec<::settings_records::ColumnDef> {
                ::std::vec![#(#defs),*]
            }

            fn encode(&self) -> ::settings_records::Row {
                let mut row = ::settings_records::Row::new();
                #(#encoders)*
                row
            }

            fn decode(row: &::settings_records::Row) -> Self {
                let empty = <Self as ::settings_records::SettingsRecord>::empty();
                Self {
                    #(#decoders)*
                    #(#skipped: empty.#skipped,)*
                }
            }
        }
    })
}

/// Container-level attributes from #[record(...)]
#[derive(Default)]
struct ContainerAttrs {
    table: Option<String>,
    empty: Option<Path>,
}

/// Field-level attributes from #[column(...)]
#[derive(Default)]
struct FieldAttrs {
    name: Option<String>,
    skip: bool,
}

fn parse_container_attrs(attrs: &[Attribute]) -> syn::Result<ContainerAttrs> {
    let mut result = ContainerAttrs::default();

    for attr in attrs.iter().filter(|a| a.path().is_ident("record")) {
        let nested = attr.parse_args_with(
            syn::punctuated::Punctuated::<Meta, syn::Token![,]>::parse_terminated,
        )?;
        for meta in nested {
            match meta {
                Meta::NameValue(nv) if nv.path.is_ident("table") => {
                    result.table = Some(string_value(&nv.value, "#[record(table = \"settings\")]")?);
                }
                Meta::NameValue(nv) if nv.path.is_ident("empty") => {
                    let path = string_value(&nv.value, "#[record(empty = \"Settings::factory\")]")?;
                    result.empty = Some(syn::parse_str(&path).map_err(|e| {
                        syn::Error::new_spanned(&nv.value, format!("invalid path: {e}"))
                    })?);
                }
                other => {
                    return Err(syn::Error::new_spanned(
                        other,
                        "unknown record attribute, expected `table` or `empty`",
                    ));
                }
            }
        }
    }

    Ok(result)
}

fn parse_field_attrs(attrs: &[Attribute]) -> syn::Result<FieldAttrs> {
    let mut result = FieldAttrs::default();

    for attr in attrs.iter().filter(|a| a.path().is_ident("column")) {
        let nested = attr.parse_args_with(
            syn::punctuated::Punctuated::<Meta, syn::Token![,]>::parse_terminated,
        )?;
        for meta in nested {
            match meta {
                Meta::Path(path) if path.is_ident("skip") => result.skip = true,
                Meta::NameValue(nv) if nv.path.is_ident("name") => {
                    result.name = Some(string_value(&nv.value, "#[column(name = \"isOn\")]")?);
                }
                other => {
                    return Err(syn::Error::new_spanned(
                        other,
                        "unknown column attribute, expected `name` or `skip`",
                    ));
                }
            }
        }
    }

    Ok(result)
}

fn string_value(value: &Expr, example: &str) -> syn::Result<String> {
    if let Expr::Lit(lit) = value {
        if let Lit::Str(s) = &lit.lit {
            return Ok(s.value());
        }
    }
    Err(syn::Error::new_spanned(
        value,
        format!("expected a string literal.\n\nExample: {example}"),
    ))
}

fn first_duplicate<'c, 'a>(columns: &'c [Column<'a>]) -> Option<&'c Column<'a>> {
    columns
        .iter()
        .enumerate()
        .find(|(i, c)| columns[..*i].iter().any(|earlier| earlier.name == c.name))
        .map(|(_, c)| c)
}

/// `AppSettings` -> `app_settings`, `HTTPSettings` -> `http_settings`
fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &ch) in chars.iter().enumerate() {
        if ch.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|c| c.is_lowercase());
            // A capital starts a word after a lowercase letter or digit, or
            // when it is the last capital of an acronym followed by lowercase
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower) {
                out.push('_');
            }
        }
        out.extend(ch.to_lowercase());
    }
    out
}
