//! GTIN lookup against a flaky catalogue.
//!
//! Run with `cargo run --example gtin_lookup` to watch each failed attempt
//! being logged before the lookup succeeds, and a bad GTIN being rejected
//! without any attempt.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use retrace::lookup::{Gtin, LookupService, ProductLookup, ProductSuggestion};
use retrace::RetryPolicy;

/// Fails the first two calls, like an overloaded model endpoint.
struct FlakyCatalogue {
    calls: AtomicU32,
}

impl ProductLookup for FlakyCatalogue {
    type Error = String;

    async fn suggest(&self, gtin: &Gtin) -> Result<ProductSuggestion, String> {
        if self.calls.fetch_add(1, Ordering::SeqCst) < 2 {
            return Err("model overloaded (529)".to_string());
        }
        Ok(ProductSuggestion {
            title: "The Collection Snowboard: Liquid".to_string(),
            product_type: "Snowboards".to_string(),
            vendor: Some("Hydrogen Vendor".to_string()),
            tags: vec!["winter".to_string(), "premium".to_string()],
            description_html: format!("<p>Matched GTIN {gtin}.</p>"),
        })
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let service = LookupService::new(FlakyCatalogue {
        calls: AtomicU32::new(0),
    })
    .with_policy(RetryPolicy::exponential(Duration::from_millis(200)))
    .with_request_timeout(Duration::from_secs(5));

    match service.lookup("4006381333931").await {
        Ok(product) => println!("found: {} ({})", product.title, product.product_type),
        Err(err) => println!("{} {}", err.status_code(), err.to_body().error),
    }

    if let Err(err) = service.lookup("4006381333932").await {
        println!("{} {}", err.status_code(), err.to_body().error);
    }

    println!(
        "catalogue called {} times",
        service.client().calls.load(Ordering::SeqCst)
    );
}
