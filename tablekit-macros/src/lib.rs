extern crate proc_macro;
use proc_macro::TokenStream;

pub(crate) mod crate_path;
pub(crate) mod record_derive;

/// Derive `Record` for a struct with named fields.
///
/// Every field is mapped to the column of the same name unless told
/// otherwise, and its type must implement `ToValue`, `FromValue` and
/// `Default`.
///
/// # Field attributes
///
/// | Attribute | Description |
/// |-----------|-------------|
/// | `#[column(read_only)]` | Never written by INSERT/UPDATE (e.g. server-generated ids). |
/// | `#[column(write_only)]` | Never projected by SELECT/RETURNING (e.g. secrets). |
/// | `#[column(rename = "name")]` | Map to a differently named column. |
/// | `#[column(skip)]` | Not mapped; filled with `Default::default()` when reading. |
///
/// # Example
///
/// ```ignore
/// #[derive(Record, Debug, Default)]
/// pub struct Account {
///     #[column(read_only)]
///     pub id: i64,
///     #[column(rename = "display_name")]
///     pub name: String,
///     #[column(write_only)]
///     pub secret: String,
///     #[column(skip)]
///     pub cached_score: u32,
/// }
/// ```
#[proc_macro_derive(Record, attributes(column))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    record_derive::expand(input)
}
