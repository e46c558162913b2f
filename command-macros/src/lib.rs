use proc_macro::TokenStream;
use quote::quote;
use syn::{ItemFn, parse_macro_input};

/// Pairs an `async fn(CommandInteraction) -> anyhow::Result<()>` with a
/// `<name>_handler()` constructor that boxes it into a `CommandHandler`.
#[proc_macro_attribute]
pub fn command_handler(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input_fn = parse_macro_input!(item as ItemFn);
    let fn_name = &input_fn.sig.ident;
    let vis = &input_fn.vis;

    if input_fn.sig.asyncness.is_none() {
        return syn::Error::new_spanned(&input_fn.sig, "command handlers must be `async fn`")
            .to_compile_error()
            .into();
    }

    let expanded = quote! {
        #input_fn

        paste::paste! {
            #vis fn [<#fn_name _handler>]() -> crate::shared::structs::handler::CommandHandler {
                crate::shared::structs::handler::into_command_handler(#fn_name)
            }
        }
    };

    TokenStream::from(expanded)
}
