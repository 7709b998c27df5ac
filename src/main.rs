use std::env;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::signal;
use tracing::{error, info, Level};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use user_education::feature_promo::{
    CachingPrecondition, CallbackPrecondition, DataKey, PreconditionId, PromoType,
};
use user_education::sequence::TaskSequence;
use user_education::time::SystemTimeProvider;
use user_education::{
    Failure, FeatureId, FeaturePromoParams, FeaturePromoQueue, FeaturePromoResult,
    FeaturePromoSpecification, PreconditionList, QueueConfig,
};

const TAB_SEARCH: FeatureId = FeatureId::new("IPH_TabSearch");
const READING_LIST: FeatureId = FeatureId::new("IPH_ReadingList");
const SIDE_PANEL: FeatureId = FeatureId::new("IPH_SidePanel");

const FEATURE_ENABLED: PreconditionId = PreconditionId::new("FeatureEnabled");
const ANCHOR_VISIBLE: PreconditionId = PreconditionId::new("AnchorElementVisible");
const ANCHOR_ELEMENT: DataKey<String> = DataKey::new("anchor_element");

#[derive(Debug, Clone)]
struct AppConfig {
    config_path: Option<String>,
    timeout_ms: Option<u64>,
    scan_interval: Duration,
    anchor_delay: Duration,
    json_logs: bool,
    log_level: Level,
}

impl AppConfig {
    fn from_args() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut config = Self::default();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--config" => {
                    if i + 1 < args.len() {
                        config.config_path = Some(args[i + 1].clone());
                        i += 1;
                    }
                }
                "--timeout-ms" => {
                    if i + 1 < args.len() {
                        config.timeout_ms = args[i + 1].parse().ok();
                        i += 1;
                    }
                }
                "--anchor-delay-ms" => {
                    if i + 1 < args.len() {
                        if let Ok(ms) = args[i + 1].parse() {
                            config.anchor_delay = Duration::from_millis(ms);
                        }
                        i += 1;
                    }
                }
                "--json" => config.json_logs = true,
                "--debug" => config.log_level = Level::DEBUG,
                "--trace" => config.log_level = Level::TRACE,
                _ => {}
            }
            i += 1;
        }

        config
    }

    fn queue_config(&self) -> anyhow::Result<QueueConfig> {
        let mut config = match &self.config_path {
            Some(path) => QueueConfig::from_file(path)?,
            None => QueueConfig {
                queue_timeout: Duration::from_secs(3),
            },
        };
        if let Some(ms) = self.timeout_ms {
            config.queue_timeout = Duration::from_millis(ms);
        }
        config.validate()?;
        Ok(config)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_path: None,
            timeout_ms: None,
            scan_interval: Duration::from_millis(100),
            anchor_delay: Duration::from_millis(1500),
            json_logs: false,
            log_level: Level::INFO,
        }
    }
}

fn init_tracing(app_config: &AppConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(app_config.log_level).into())
        .from_env_lossy();
    let builder = FmtSubscriber::builder().with_env_filter(filter);
    if app_config.json_logs {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

fn report(feature: FeatureId) -> impl FnOnce(FeaturePromoResult) + Send + 'static {
    move |result| match result.failure() {
        Some(Failure::TimedOut) | Some(Failure::BlockedByUi) => {
            info!(%feature, %result, "promo gave up waiting")
        }
        _ => info!(%feature, %result, "promo request finished"),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let app_config = AppConfig::from_args();
    init_tracing(&app_config)?;
    let queue_config = app_config.queue_config()?;

    let started = Instant::now();
    let anchor_delay = app_config.anchor_delay;

    // Side panel promos are switched off; everything else is enabled.
    let required = Arc::new(|spec: &FeaturePromoSpecification, _: &FeaturePromoParams| {
        let enabled = spec.feature != SIDE_PANEL;
        PreconditionList::new().with(CallbackPrecondition::from_predicate(
            FEATURE_ENABLED,
            "feature is enabled",
            Failure::FeatureDisabled,
            move || enabled,
        ))
    });
    // The tab search button appears after a delay; the reading list anchor
    // never does.
    let wait_for = Arc::new(move |spec: &FeaturePromoSpecification, _: &FeaturePromoParams| {
        let anchor = spec.anchor_element_id.clone();
        let appears = spec.feature == TAB_SEARCH;
        PreconditionList::new().with(CachingPrecondition::new(
            ANCHOR_VISIBLE,
            "anchor element is visible",
            ANCHOR_ELEMENT,
            Failure::BlockedByUi,
            move || {
                (appears && started.elapsed() >= anchor_delay)
                    .then(|| anchor.clone())
                    .flatten()
            },
        ))
    });

    let mut sequence = TaskSequence::new();
    let mut queue = FeaturePromoQueue::from_config(
        &queue_config,
        required,
        wait_for,
        Arc::new(SystemTimeProvider),
        sequence.handle(),
    )?;
    info!(timeout_ms = queue_config.queue_timeout.as_millis() as u64, "promo queue ready");

    let specs = [
        FeaturePromoSpecification::new(TAB_SEARCH, PromoType::Toast).with_anchor("tab-search-button"),
        FeaturePromoSpecification::new(READING_LIST, PromoType::Snooze).with_anchor("reading-list-button"),
        FeaturePromoSpecification::new(SIDE_PANEL, PromoType::Tutorial).with_anchor("side-panel-button"),
    ];
    for spec in &specs {
        let params = FeaturePromoParams::new(spec.feature)
            .with_title_params(vec![spec.feature.name().to_string()])
            .with_body_params(vec![format!("{:?}", spec.promo_type)])
            .with_callback(report(spec.feature));
        let preflight = queue.can_show(spec, &params);
        info!(feature = %spec.feature, %preflight, "pre-flight");
        queue.try_to_queue(spec, params);
    }
    // Duplicate request; refused with AlreadyQueued.
    queue.try_to_queue(
        &specs[0],
        FeaturePromoParams::new(TAB_SEARCH).with_callback(report(TAB_SEARCH)),
    );

    let mut ticker = tokio::time::interval(app_config.scan_interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Some(feature) = queue.update_and_identify_next_eligible_promo() {
                    let promo = queue.unqueue_eligible_promo(feature);
                    match promo.cached_data.get(ANCHOR_ELEMENT) {
                        Some(anchor) => info!(
                            %feature,
                            anchor = %anchor,
                            title = ?promo.promo_params.title_params,
                            body = ?promo.promo_params.body_params,
                            "showing promo"
                        ),
                        None => error!(%feature, "eligible promo has no anchor"),
                    }
                }
                sequence.run_until_idle();
                if queue.is_empty() {
                    break;
                }
            }
            _ = signal::ctrl_c() => {
                queue.fail_all(Failure::Shutdown);
                sequence.run_until_idle();
                break;
            }
        }
    }

    info!(elapsed_ms = started.elapsed().as_millis() as u64, "promo queue drained");
    Ok(())
}
