use proc_macro::TokenStream;
use quote::quote;
use syn::{Expr, ExprLit, ExprPath, ItemFn, Lit, Meta, MetaNameValue};

/// Marks an async function as a dashboard feed and registers it for
/// discovery via `SchedulerBuilder::register_all()`.
///
/// The function must be `async` and return `feedloop::FeedResult`; the
/// scheduler only observes whether each attempt succeeded.
///
/// # Examples
///
/// ```ignore
/// use feedloop::{feed, FeedResult};
///
/// #[feed(interval = "10s")]
/// async fn market_ticker() -> FeedResult {
///     // fetch prices, hand them to the render layer
///     Ok(())
/// }
///
/// #[feed(cron = "0 0 7 * * *")]
/// async fn morning_briefing() -> FeedResult {
///     Ok(())
/// }
///
/// #[feed(interval = "${feeds.news.interval:60s}", enabled = "${feeds.news.enabled:true}")]
/// async fn news_wire() -> FeedResult {
///     Ok(())
/// }
/// ```
///
/// # Parameters
///
/// - `interval`: polling period — integer (milliseconds by default),
///   shorthand string ("500ms", "30s", "5m"), or config placeholder
/// - `cron`: cron expression for calendar feeds (seconds-first syntax)
/// - `time_unit`: unit for plain-integer intervals (string or a
///   `TimeUnit::*` constant such as `TimeUnit::Seconds`)
/// - `enabled`: enable/disable the feed (boolean or config placeholder)
#[proc_macro_attribute]
pub fn feed(args: TokenStream, input: TokenStream) -> TokenStream {
    let input_fn = match syn::parse::<ItemFn>(input) {
        Ok(input_fn) => input_fn,
        Err(_) => panic!("the feed macro can only be applied to async functions returning FeedResult"),
    };

    let attr_args = syn::parse_macro_input!(args with syn::punctuated::Punctuated::<Meta, syn::Token![,]>::parse_terminated);

    let fn_name = &input_fn.sig.ident;
    let fn_vis = &input_fn.vis;
    let fn_sig = &input_fn.sig;
    let fn_block = &input_fn.block;

    let (schedule_type, schedule_value, enabled_str, time_unit_str) = parse_feed_args(&attr_args);

    // Generate unique registration function name
    let register_fn_name = syn::Ident::new(&format!("__register_feed_{}", fn_name), fn_name.span());

    let expanded = quote! {
        #fn_vis #fn_sig #fn_block

        // Auto-registration using linkme
        #[::feedloop::feedloop_runtime::linkme::distributed_slice(::feedloop::feedloop_runtime::FEED_DEFS)]
        #[linkme(crate = ::feedloop::feedloop_runtime::linkme)]
        fn #register_fn_name() -> ::feedloop::feedloop_runtime::FeedDef {
            ::feedloop::feedloop_runtime::FeedDef {
                name: stringify!(#fn_name),
                schedule_type: #schedule_type,
                schedule_value: #schedule_value,
                enabled: #enabled_str,
                time_unit: #time_unit_str,
                handler: || ::std::boxed::Box::pin(#fn_name()),
            }
        }
    };

    TokenStream::from(expanded)
}

fn parse_feed_args(
    attr_args: &syn::punctuated::Punctuated<Meta, syn::Token![,]>,
) -> (String, String, String, String) {
    let mut schedule_type = None;
    let mut schedule_value = None;
    let mut enabled = None;
    let mut time_unit = None;

    for arg in attr_args {
        if let Meta::NameValue(MetaNameValue { path, value, .. }) = arg {
            let path_str = path.get_ident().map(|i| i.to_string()).unwrap_or_default();

            match path_str.as_str() {
                "interval" => {
                    schedule_type = Some("interval");
                    schedule_value = Some(match value {
                        Expr::Lit(ExprLit { lit: Lit::Int(i), .. }) => i.base10_digits().to_string(),
                        Expr::Lit(ExprLit { lit: Lit::Str(s), .. }) => s.value(),
                        _ => panic!("interval must be int or string"),
                    });
                }
                "cron" => {
                    if let Expr::Lit(ExprLit { lit: Lit::Str(s), .. }) = value {
                        schedule_type = Some("cron");
                        schedule_value = Some(s.value());
                    } else {
                        panic!("cron must be a string expression");
                    }
                }
                "enabled" => {
                    enabled = Some(match value {
                        Expr::Lit(ExprLit { lit: Lit::Bool(b), .. }) => b.value.to_string(),
                        Expr::Lit(ExprLit { lit: Lit::Str(s), .. }) => s.value(),
                        _ => panic!("enabled must be bool or string"),
                    });
                }
                "time_unit" => {
                    time_unit = Some(match value {
                        Expr::Lit(ExprLit { lit: Lit::Str(s), .. }) => s.value(),
                        Expr::Path(ExprPath { path, .. }) => {
                            // Support TimeUnit::Seconds, TimeUnit::Minutes, etc.
                            if let Some(last_segment) = path.segments.last() {
                                last_segment.ident.to_string().to_lowercase()
                            } else {
                                panic!("Invalid time_unit path");
                            }
                        }
                        _ => panic!("time_unit must be a string or TimeUnit::* constant (e.g., TimeUnit::Seconds)"),
                    });
                }
                _ => {}
            }
        }
    }

    let schedule_type_str = schedule_type.expect("Must specify a schedule (interval or cron)");
    let schedule_value_str = schedule_value.expect("Must specify schedule value");
    let enabled_str = enabled.unwrap_or_else(|| "true".to_string());
    let time_unit_str = time_unit.unwrap_or_else(|| "milliseconds".to_string());

    (
        schedule_type_str.to_string(),
        schedule_value_str,
        enabled_str,
        time_unit_str,
    )
}
