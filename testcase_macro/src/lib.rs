// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, ItemFn};

/// The macro for labeling scenario test cases.
///
/// Scenario test functions have the signature `async fn test(ctx:
/// &Framework)`. The macro inserts the function body into a wrapper
/// function that returns a boxed future resolving to an
/// `oswin_testcase::TestOutcome` and creates an entry in the test case
/// inventory that allows the runner to enumerate the test.
#[proc_macro_attribute]
pub fn oswin_testcase(_attrib: TokenStream, input: TokenStream) -> TokenStream {
    let item_fn = parse_macro_input!(input as ItemFn);

    // Build the inventory record for this test. The `module_path!()` in the
    // generated code allows the test case to report the fully-qualified
    // path to itself regardless of where it's located.
    let fn_ident = item_fn.sig.ident.clone();
    let fn_name = fn_ident.to_string();
    let submit: proc_macro2::TokenStream = quote! {
        oswin_testcase::inventory_submit! {
            oswin_testcase::TestCase::new(
                module_path!(),
                #fn_name,
                oswin_testcase::TestFunction { f: #fn_ident }
            )
        }
    };

    // Rebuild the test body into a synchronous function returning a boxed
    // future so it can be stored in the inventory as a plain function
    // pointer. Inside, the body runs in an `async` block returning an
    // `anyhow::Result`, which lets tests use the `?` operator, `return
    // Ok(())` to pass early, and `oswin_skip!` to bail out as skipped.
    let fn_vis = item_fn.vis.clone();
    let mut fn_sig = item_fn.sig.clone();
    fn_sig.asyncness = None;
    fn_sig.output = syn::parse_quote! {
        -> oswin_testcase::BoxFuture<'_, oswin_testcase::TestOutcome>
    };
    let fn_block = item_fn.block;

    let remade_fn = quote! {
        #fn_vis #fn_sig {
            ::std::boxed::Box::pin(async move {
                let result: oswin_testcase::Result<()> = async move {
                    #fn_block
                    Ok(())
                }
                .await;

                match result {
                    Ok(()) => oswin_testcase::TestOutcome::Passed,
                    Err(e) => {
                        match e.downcast_ref::<oswin_testcase::TestSkippedError>() {
                            Some(oswin_testcase::TestSkippedError::TestSkipped(
                                msg,
                            )) => oswin_testcase::TestOutcome::Skipped(
                                msg.clone(),
                            ),
                            None => oswin_testcase::TestOutcome::Failed(Some(
                                format!("{:#}", e),
                            )),
                        }
                    }
                }
            })
        }
    };

    quote! {
        #remade_fn

        #submit
    }
    .into()
}
