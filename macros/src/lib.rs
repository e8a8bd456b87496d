//! Augment the development of dbjoin with procedural macros.

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Error, ItemFn, LitStr};

/// Run a test function with a [tracing] subscriber that writes to the test output.
///
/// The log level may be provided as a string literal (`"TRACE"`, `"DEBUG"`, `"INFO"`,
/// `"WARN"` or `"ERROR"`). If omitted, `"DEBUG"` is used.
///
/// The crate using this attribute must depend on `tracing` and `tracing-subscriber`.
///
/// # Example
/// ```rust,ignore
/// use dbjoin_macros::test_traced;
///
/// #[test_traced("INFO")]
/// fn test_seek() {
///     tracing::info!("seeking");
/// }
/// ```
#[proc_macro_attribute]
pub fn test_traced(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);

    // Parse the log level, defaulting to DEBUG
    let level = if attr.is_empty() {
        LitStr::new("DEBUG", proc_macro2::Span::call_site())
    } else {
        parse_macro_input!(attr as LitStr)
    };
    let level = match level.value().to_ascii_uppercase().as_str() {
        "TRACE" => quote! { ::tracing::Level::TRACE },
        "DEBUG" => quote! { ::tracing::Level::DEBUG },
        "INFO" => quote! { ::tracing::Level::INFO },
        "WARN" => quote! { ::tracing::Level::WARN },
        "ERROR" => quote! { ::tracing::Level::ERROR },
        other => {
            return Error::new(
                level.span(),
                format!(
                    "invalid log level `{}`, expected one of TRACE, DEBUG, INFO, WARN, ERROR",
                    other
                ),
            )
            .to_compile_error()
            .into();
        }
    };

    // Rebuild the function with the subscriber installed around its body
    let attrs = input.attrs;
    let vis = input.vis;
    let sig = input.sig;
    let block = input.block;
    let expanded = quote! {
        #[test]
        #(#attrs)*
        #vis #sig {
            let subscriber = ::tracing_subscriber::fmt()
                .with_test_writer()
                .with_max_level(#level)
                .with_line_number(true)
                .finish();
            let dispatcher = ::tracing::Dispatch::new(subscriber);
            ::tracing::dispatcher::with_default(&dispatcher, || #block)
        }
    };
    TokenStream::from(expanded)
}
