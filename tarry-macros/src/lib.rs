//! Procedural macros for Tarry.
//!
//! - `#[derive(Message)]` - Derive macro for implementing the `Message` trait

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{DeriveInput, LitStr, Path, parse_macro_input};

/// Derive macro for implementing the `Message` trait.
///
/// The generated impl names the trait as `::tarry::Message`. Crates that
/// depend on `tarry-core` directly can point it elsewhere:
///
/// ```rust,ignore
/// #[derive(Message)]
/// #[tarry(crate = "tarry_core")]
/// struct Tick;
/// ```
#[proc_macro_derive(Message, attributes(tarry))]
pub fn derive_message(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_message(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_message(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let krate = crate_path(input)?;
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics #krate::Message for #name #ty_generics #where_clause {}
    })
}

fn crate_path(input: &DeriveInput) -> syn::Result<Path> {
    let mut krate = None;
    for attr in input.attrs.iter().filter(|attr| attr.path().is_ident("tarry")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("crate") {
                let lit: LitStr = meta.value()?.parse()?;
                krate = Some(lit.parse::<Path>()?);
                Ok(())
            } else {
                Err(meta.error("unknown tarry attribute, expected `crate = \"...\"`"))
            }
        })?;
    }
    Ok(krate.unwrap_or_else(|| syn::parse_quote!(::tarry)))
}
