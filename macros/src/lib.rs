//! Derive macros for the namespaced store
//!
//! # Available Macros
//!
//! - `#[derive(ActionName)]` - Implements `ActionName` for a closed enumeration
//!   of a namespace's action names
//!
//! # Example
//!
//! ```ignore
//! use namespaced_store_macros::ActionName;
//!
//! #[derive(ActionName, Debug, Clone, Copy, PartialEq, Eq, Hash)]
//! enum TodoAction {
//!     Set,
//!     FetchList,
//!     #[action(name = "remove_item")]
//!     Remove,
//! }
//!
//! // Generated:
//! assert_eq!(TodoAction::Set.as_str(), "set");
//! assert_eq!(TodoAction::FetchList.as_str(), "fetchList");
//! assert_eq!(TodoAction::Remove.as_str(), "remove_item");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Attribute, Data, DeriveInput, Fields, LitStr};

/// Derive macro for action-name enums
///
/// Implements `namespaced_store_core::creators::ActionName`:
/// - `ALL` lists every variant in declaration order
/// - `as_str()` returns the wire name: the variant name in lower camel case
///   (`FetchList` becomes `fetchList`) unless overridden
///
/// # Attributes
///
/// - `#[action(name = "...")]` - Use an explicit wire name
///
/// # Errors
///
/// Produces a compile error if:
/// - Applied to a non-enum type
/// - A variant carries fields
/// - Two variants resolve to the same wire name
#[proc_macro_derive(ActionName, attributes(action))]
pub fn derive_action_name(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match expand_action_name(&input) {
        Ok(tokens) => tokens.into(),
        Err(error) => error.to_compile_error().into(),
    }
}

fn expand_action_name(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;

    let Data::Enum(data_enum) = &input.data else {
        return Err(syn::Error::new_spanned(
            input,
            "#[derive(ActionName)] can only be used on enums",
        ));
    };

    let mut variants = Vec::with_capacity(data_enum.variants.len());
    let mut wire_names: Vec<String> = Vec::with_capacity(data_enum.variants.len());

    for variant in &data_enum.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(
                variant,
                "ActionName variants cannot carry fields; payloads travel in the action",
            ));
        }

        let wire_name = explicit_name(&variant.attrs)?
            .unwrap_or_else(|| lower_camel_case(&variant.ident.to_string()));

        if wire_names.contains(&wire_name) {
            return Err(syn::Error::new_spanned(
                variant,
                format!("Duplicate action name `{wire_name}`"),
            ));
        }

        variants.push(&variant.ident);
        wire_names.push(wire_name);
    }

    let as_str_arms = variants
        .iter()
        .zip(&wire_names)
        .map(|(variant, wire_name)| quote! { Self::#variant => #wire_name, });

    Ok(quote! {
        impl ::namespaced_store_core::creators::ActionName for #name {
            const ALL: &'static [Self] = &[#(Self::#variants),*];

            fn as_str(self) -> &'static str {
                match self {
                    #(#as_str_arms)*
                }
            }
        }
    })
}

/// Read `#[action(name = "...")]`, if present
fn explicit_name(attrs: &[Attribute]) -> syn::Result<Option<String>> {
    let mut name = None;

    for attr in attrs.iter().filter(|attr| attr.path().is_ident("action")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let lit: LitStr = meta.value()?.parse()?;
                name = Some(lit.value());
                Ok(())
            } else {
                Err(meta.error("expected `name = \"...\"`"))
            }
        })?;
    }

    Ok(name)
}

/// `FetchList` -> `fetchList`
fn lower_camel_case(ident: &str) -> String {
    let mut chars = ident.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_lowercase().chain(chars).collect()
    })
}
