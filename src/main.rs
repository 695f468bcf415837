use adslot::ad::{AdRequest, HttpAdApi};
use adslot::config::Config;
use adslot::demo;
use adslot::slot::{AdSlot, Callbacks};
use adslot::tracking::IntersectionEntry;
use metrics_exporter_prometheus::PrometheusBuilder;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    // Setup logging
    tracing_subscriber::fmt::init();

    info!("Starting adslot demo host");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(config).await {
        error!("Ad slot host failed: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let options = config.widget_options()?;
    let metrics = PrometheusBuilder::new().install_recorder()?;

    let api_base = match &config.api_base_url {
        Some(url) => url.clone(),
        None => {
            let (addr, _) = demo::spawn(config.port, Some(metrics)).await?;
            info!("Metrics: http://{}/metrics", addr);
            format!("http://{}", addr)
        }
    };

    let client = Client::builder()
        .connect_timeout(Duration::from_secs(5))
        .pool_idle_timeout(Duration::from_secs(90))
        .build()?;
    let api = Arc::new(HttpAdApi::new(&api_base, client)?.with_timeout(config.request_timeout()));

    let callbacks = Callbacks::new()
        .on_load(|ad| info!("Ad loaded: {} ({:?})", ad.slug, ad.ad_type()))
        .on_impression(|ad| info!("Impression recorded for {}", ad.slug))
        .on_click(|ad| info!("Click on {}", ad.slug))
        .on_close(|| info!("Ad dismissed"))
        .on_error(|e| warn!("Ad slot error: {}", e));

    let request = AdRequest::new(config.placement.clone(), config.content_id.clone());
    let mut slot = AdSlot::mount(api, request, options, callbacks);

    let mut last_frame = String::new();
    loop {
        tokio::select! {
            alive = slot.step() => {
                if !alive {
                    break;
                }
                // Headless host: the slot counts as fully on screen
                if slot.current_ad().is_some() {
                    slot.observe(IntersectionEntry::visible(1.0));
                }
                let frame = serde_json::to_string(&slot.render())?;
                if frame != last_frame {
                    info!("Frame: {}", frame);
                    last_frame = frame;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
        }
    }

    slot.teardown();
    Ok(())
}
