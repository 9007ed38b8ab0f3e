use crate::{
    api::{pipeline, summary},
    store::TableStore,
};
use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware,
};
use actix_web::web;

pub type TriggerLimit = GovernorConfig<PeerIpKeyExtractor, NoOpMiddleware>;

/// Per-client-IP limit for the run trigger. Zero is treated as one per minute.
pub fn trigger_limit(requests_per_min: u32) -> anyhow::Result<TriggerLimit> {
    let requests_per_min = requests_per_min.max(1);
    GovernorConfigBuilder::default()
        .milliseconds_per_request(60_000 / u64::from(requests_per_min))
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow::anyhow!("invalid trigger rate limit: {requests_per_min}/min"))
}

pub fn configure<S: TableStore>(
    cfg: &mut web::ServiceConfig,
    api_prefix: &str,
    trigger_limit: &TriggerLimit,
) {
    cfg.service(
        web::scope(api_prefix)
            .service(
                web::scope("/pipeline")
                    // /pipeline/runs
                    .service(
                        web::resource("/runs")
                            .wrap(Governor::new(trigger_limit))
                            .route(web::post().to(pipeline::trigger_run::<S>)),
                    )
                    // /pipeline/runs/latest
                    .service(
                        web::resource("/runs/latest")
                            .route(web::get().to(pipeline::latest_run::<S>)),
                    ),
            )
            // /summary
            .service(web::resource("/summary").route(web::get().to(summary::list_summary::<S>))),
    );
}
