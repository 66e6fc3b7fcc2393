//! Crate path resolution for generated code.
//!
//! Detects whether the user depends on `tablekit` (facade) or `tablekit-core`
//! directly, and returns the appropriate path prefix for generated code.

use proc_macro2::TokenStream;
use proc_macro_crate::{crate_name, FoundCrate};
use quote::quote;

fn found_path(found: FoundCrate) -> TokenStream {
    match found {
        FoundCrate::Itself => quote!(crate),
        FoundCrate::Name(name) => {
            let ident = syn::Ident::new(&name, proc_macro2::Span::call_site());
            quote!(::#ident)
        }
    }
}

/// Returns the token stream for accessing `tablekit_core` types.
///
/// `::tablekit` when the facade is a dependency (it re-exports the core at
/// its root), otherwise `::tablekit_core`.
pub fn tablekit_core_path() -> TokenStream {
    if let Ok(found) = crate_name("tablekit") {
        found_path(found)
    } else if let Ok(found) = crate_name("tablekit-core") {
        found_path(found)
    } else {
        // Fallback so the error message names the missing crate
        quote!(::tablekit_core)
    }
}
