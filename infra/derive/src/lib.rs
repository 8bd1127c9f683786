#![allow(unreachable_pub)]
#![allow(clippy::needless_pass_by_value)]

//! # Macros
//!
//! Procedural macros shared by the number-series crates.
//!
//! ## Usage
//! ```toml
//! [dependencies]
//! nseries-derive.workspace = true
//! thiserror.workspace = true
//! ```

mod macros;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// A high-level attribute macro for defining crate-level error enums.
///
/// # Features
///
/// * **Automatic Derives**: Injects `#[derive(Debug, thiserror::Error)]`.
/// * **Context Support**: Generates a companion `...Ext` trait that adds `.context()`
///   to any `Result` that can be converted into this error type.
/// * **Standard Conversions**: Implements `From<T>` for variants containing a `#[source]` field,
///   enabling the use of the `?` operator for upstream errors.
/// * **Internal Fallback**: Provides `From<&str>` and `From<String>` implementations
///   if an `Internal` variant is present.
/// * **Suppression Marker**: Variants tagged `#[suppressible]` make the generated
///   `is_suppressible()` return `true`. Callers that run with a suppress flag degrade
///   only those variants to an empty result; every other variant still propagates.
///
/// # Requirements
///
/// 1. The macro must be applied to an **enum**.
/// 2. Variants that support context must include a `context: Option<Cow<'static, str>>` field.
/// 3. Variants wrapping external errors must include a `source: T` field or a field marked
///    with `#[source]`/`#[from]` (compatible with `thiserror`).
/// 4. Tuple or unit variants are rejected.
/// 5. `#[suppressible]` cannot be combined with a source field.
///
/// # Example
///
/// ```rust,ignore
/// use nseries_derive::nseries_error;
/// use std::borrow::Cow;
///
/// #[nseries_error]
/// pub enum LineError {
///     #[suppressible]
///     #[error("No open line{}: {message}", format_context(.context))]
///     NoOpenLine { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
///
///     #[error("Internal fault{}: {message}", format_context(.context))]
///     Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
/// }
///
/// let err = LineError::from("unexpected state");
/// assert!(!err.is_suppressible());
/// ```
#[proc_macro_attribute]
pub fn nseries_error(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    macros::error::expand_derive(input).into()
}
