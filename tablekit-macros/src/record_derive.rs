use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, parse_quote, Data, DeriveInput, Fields};

use crate::crate_path::tablekit_core_path;

pub fn expand(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match generate(&input) {
        Ok(output) => output.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Access {
    ReadWrite,
    ReadOnly,
    WriteOnly,
}

/// A mapped field.
struct ColumnField {
    ident: syn::Ident,
    ty: syn::Type,
    column: String,
    access: Access,
}

/// Parsed field-level `#[column(...)]` attributes.
#[derive(Default)]
struct ColumnAttrs {
    read_only: bool,
    write_only: bool,
    skip: bool,
    rename: Option<String>,
}

fn extract_column_attrs(field: &syn::Field) -> syn::Result<ColumnAttrs> {
    let mut attrs = ColumnAttrs::default();
    for attr in &field.attrs {
        if !attr.path().is_ident("column") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("read_only") {
                attrs.read_only = true;
                Ok(())
            } else if meta.path.is_ident("write_only") {
                attrs.write_only = true;
                Ok(())
            } else if meta.path.is_ident("skip") {
                attrs.skip = true;
                Ok(())
            } else if meta.path.is_ident("rename") {
                let lit: syn::LitStr = meta.value()?.parse()?;
                if lit.value().is_empty() {
                    return Err(syn::Error::new_spanned(&lit, "column name cannot be empty"));
                }
                attrs.rename = Some(lit.value());
                Ok(())
            } else {
                Err(meta.error(
                    "unknown column attribute, expected one of: read_only, write_only, rename = \"...\", skip",
                ))
            }
        })?;
    }
    if attrs.read_only && attrs.write_only {
        return Err(syn::Error::new_spanned(
            field,
            "a field cannot be both #[column(read_only)] and #[column(write_only)]",
        ));
    }
    if attrs.skip && (attrs.read_only || attrs.write_only || attrs.rename.is_some()) {
        return Err(syn::Error::new_spanned(
            field,
            "#[column(skip)] cannot be combined with other column attributes",
        ));
    }
    Ok(attrs)
}

fn generate(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let core = tablekit_core_path();

    let named = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "#[derive(Record)] requires a struct with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "#[derive(Record)] can only be used on structs",
            ))
        }
    };

    let mut mapped = Vec::new();
    let mut skipped = Vec::new();
    for field in named {
        let attrs = extract_column_attrs(field)?;
        let Some(ident) = field.ident.clone() else {
            continue;
        };
        if attrs.skip {
            skipped.push(ident);
            continue;
        }
        let access = if attrs.read_only {
            Access::ReadOnly
        } else if attrs.write_only {
            Access::WriteOnly
        } else {
            Access::ReadWrite
        };
        let column = attrs.rename.unwrap_or_else(|| ident.to_string());
        mapped.push(ColumnField {
            ident,
            ty: field.ty.clone(),
            column,
            access,
        });
    }

    if mapped.is_empty() {
        return Err(syn::Error::new_spanned(
            name,
            "#[derive(Record)] requires at least one mapped field",
        ));
    }

    let field_entries = mapped.iter().map(|f| {
        let field_name = f.ident.to_string();
        let column = &f.column;
        let access = match f.access {
            Access::ReadWrite => quote!(ReadWrite),
            Access::ReadOnly => quote!(ReadOnly),
            Access::WriteOnly => quote!(WriteOnly),
        };
        quote! {
            #core::Field::new(#field_name, #column, #core::Access::#access)
        }
    });

    let value_exprs = mapped.iter().map(|f| {
        let ident = &f.ident;
        quote! { #core::ToValue::to_value(&self.#ident) }
    });

    let read_exprs = mapped.iter().map(|f| {
        let ident = &f.ident;
        let column = &f.column;
        quote! { #ident: row.get_lax(#column)? }
    });

    let default_exprs = skipped.iter().map(|ident| {
        quote! { #ident: ::core::default::Default::default() }
    });

    // Generic records need their field types to be convertible.
    let mut generics = input.generics.clone();
    if !generics.params.is_empty() {
        let where_clause = generics.make_where_clause();
        for param in input.generics.type_params() {
            let ident = &param.ident;
            where_clause
                .predicates
                .push(parse_quote!(#ident: ::core::marker::Send + ::core::marker::Sync + 'static));
        }
        for f in &mapped {
            let ty = &f.ty;
            where_clause.predicates.push(parse_quote!(
                #ty: #core::ToValue + #core::FromValue + ::core::default::Default
            ));
        }
        for ident in &skipped {
            if let Some(field) = named.iter().find(|f| f.ident.as_ref() == Some(ident)) {
                let ty = &field.ty;
                where_clause
                    .predicates
                    .push(parse_quote!(#ty: ::core::default::Default));
            }
        }
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics #core::Record for #name #ty_generics #where_clause {
            fn fields() -> &'static [#core::Field] {
                const FIELDS: &[#core::Field] = &[#(#field_entries),*];
                FIELDS
            }

            fn values(&self) -> ::std::vec::Vec<#core::Value> {
                ::std::vec![#(#value_exprs),*]
            }

            fn from_row(row: &#core::Row) -> ::core::result::Result<Self, #core::DecodeError> {
                ::core::result::Result::Ok(Self {
                    #(#read_exprs,)*
                    #(#default_exprs,)*
                })
            }
        }
    })
}
