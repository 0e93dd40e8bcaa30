//! Derive macros for lazydi
//!
//! This crate provides procedural macros for the lazydi container.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{parse_macro_input, Data, DeriveInput, Expr, Fields, Meta};

/// Generates an `inject` constructor taking one parameter per field, so the
/// struct can be registered with `Container::provide(Type::inject)`.
///
/// A field marked `#[inject(expr)]` is set to `expr` instead; a bare `#[inject]`
/// uses `Default::default()`.
#[proc_macro_derive(Inject, attributes(inject))]
pub fn derive_inject(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(expanded) => TokenStream::from(expanded),
        Err(err) => TokenStream::from(err.to_compile_error()),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            name,
            "Inject can only be derived for structs",
        ));
    };

    let mut params = Vec::new();
    let mut values = Vec::new();
    for (index, field) in data.fields.iter().enumerate() {
        let attr = field.attrs.iter().find(|a| a.path().is_ident("inject"));
        let value = match attr.map(|a| &a.meta) {
            Some(Meta::Path(_)) => quote!(::core::default::Default::default()),
            Some(Meta::List(list)) => {
                let expr: Expr = list.parse_args()?;
                quote!(#expr)
            }
            Some(meta @ Meta::NameValue(_)) => {
                return Err(syn::Error::new_spanned(
                    meta,
                    "expected #[inject] or #[inject(expr)]",
                ));
            }
            None => {
                let arg = match &field.ident {
                    Some(ident) => ident.clone(),
                    None => format_ident!("arg{}", index),
                };
                let ty = &field.ty;
                params.push(quote!(#arg: #ty));
                quote!(#arg)
            }
        };
        values.push(match &field.ident {
            Some(ident) => quote!(#ident: #value),
            None => value,
        });
    }

    let body = match &data.fields {
        Fields::Named(_) => quote!(Self { #(#values),* }),
        Fields::Unnamed(_) => quote!(Self(#(#values),*)),
        Fields::Unit => quote!(Self),
    };

    Ok(quote! {
        impl #impl_generics #name #ty_generics #where_clause {
            #[allow(clippy::too_many_arguments)]
            pub fn inject(#(#params),*) -> Self {
                #body
            }
        }
    })
}
