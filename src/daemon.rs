//! Daemon wiring.
//!
//! Builds every component from config, registers the periodic jobs, and runs
//! them until shutdown. The same `Engine` backs the one-shot CLI commands, so
//! a manual run and a scheduled run share the single-flight guards and the
//! activity log.

use crate::activity::ActivityLog;
use crate::comments::CommentEngine;
use crate::config::Config;
use crate::error::{CadenceError, Result};
use crate::gate::{GateLimits, PublishingGate};
use crate::jobs::{MetricsJob, TrendsJob};
use crate::lifecycle::Lifecycle;
use crate::notify::{EventSink, Notifier, TracingSink};
use crate::oracle::{HttpOracle, Oracle, OracleConfig, Retrier, Sleeper, TokioSleeper};
use crate::pipeline::{DailyPipeline, ProductPipeline};
use crate::platform::{
    HttpPlatform, HttpProductSource, PlatformConfig, ProductSource, SocialPlatform,
};
use crate::scheduler::{Cadence, Job, JobKind, Scheduler, TickOutcome};
use crate::store::{SharedStore, Store};
use crate::token_monitor::TokenMonitor;
use std::sync::Arc;
use std::time::Duration;

/// All engine components, wired once and shared.
pub struct Engine {
    pub store: SharedStore,
    pub activity: ActivityLog,
    pub lifecycle: Lifecycle,
    pub gate: Arc<PublishingGate>,
    pub daily: Arc<DailyPipeline>,
    pub product: Arc<ProductPipeline>,
    pub comments: Arc<CommentEngine>,
    pub token_monitor: Arc<TokenMonitor>,
    pub metrics: Arc<MetricsJob>,
    pub trends: Arc<TrendsJob>,
}

impl Engine {
    /// Wire everything from config, with the real HTTP clients.
    pub fn from_config(config: &Config) -> Result<Self> {
        let oracle: Arc<dyn Oracle> = Arc::new(
            HttpOracle::new(OracleConfig {
                base_url: config.oracle.base_url.clone(),
                model: config.oracle.model.clone(),
                api_key_env: config.oracle.api_key_env.clone(),
                timeout: Duration::from_millis(config.oracle.timeout_ms),
            })
            .map_err(|e| CadenceError::Oracle(e.to_string()))?,
        );
        let platform: Arc<dyn SocialPlatform> =
            Arc::new(HttpPlatform::new(PlatformConfig {
                base_url: config.platform.base_url.clone(),
                page_id: config.platform.page_id.clone(),
                token_env: config.platform.token_env.clone(),
                timeout: Duration::from_millis(config.platform.timeout_ms),
            })?);
        let products: Arc<dyn ProductSource> =
            Arc::new(HttpProductSource::new(&config.products.base_url)?);

        let store = open_store(config)?;
        Self::wire(config, store, oracle, platform, products, Arc::new(TracingSink))
    }

    /// Wire from already-built seams. Tests and alternative front-ends enter
    /// here.
    pub fn wire(
        config: &Config,
        store: SharedStore,
        oracle: Arc<dyn Oracle>,
        platform: Arc<dyn SocialPlatform>,
        products: Arc<dyn ProductSource>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self> {
        let sleeper: Arc<dyn Sleeper> = Arc::new(TokioSleeper);
        let activity = ActivityLog::new(store.clone(), sink.clone());
        let lifecycle = Lifecycle::new(store.clone(), activity.clone());
        let retrier = Arc::new(Retrier::new(oracle));

        let gate = Arc::new(PublishingGate::new(
            store.clone(),
            lifecycle.clone(),
            activity.clone(),
            Arc::new(Notifier::new(store.clone(), sink.clone())),
            platform.clone(),
            GateLimits {
                max_posts_per_day: config.gate.max_posts_per_day,
                min_interval_hours: config.gate.min_interval_hours,
            },
        ));

        let daily = Arc::new(DailyPipeline::new(
            store.clone(),
            lifecycle.clone(),
            activity.clone(),
            retrier.clone(),
        ));

        let product = Arc::new(ProductPipeline::new(
            store.clone(),
            lifecycle.clone(),
            activity.clone(),
            retrier.clone(),
            products,
            sleeper.clone(),
            config.inter_call_delay(),
        ));

        let comments = Arc::new(CommentEngine::new(
            store.clone(),
            activity.clone(),
            Notifier::new(store.clone(), sink.clone()),
            platform.clone(),
            retrier.clone(),
            sleeper,
            config.inter_call_delay(),
        ));

        let token_monitor = Arc::new(TokenMonitor::new(
            activity.clone(),
            Notifier::new(store.clone(), sink.clone()),
            platform.clone(),
        ));

        let metrics = Arc::new(MetricsJob::new(store.clone(), activity.clone(), platform));
        let trends = Arc::new(TrendsJob::new(activity.clone(), retrier));

        Ok(Self {
            store,
            activity,
            lifecycle,
            gate,
            daily,
            product,
            comments,
            token_monitor,
            metrics,
            trends,
        })
    }
}

fn open_store(config: &Config) -> Result<SharedStore> {
    Ok(Store::open(&config.storage.db_path)?.into_shared())
}

/// The long-running process: engine + scheduler.
pub struct Daemon {
    engine: Arc<Engine>,
    scheduler: Scheduler,
}

impl Daemon {
    pub fn new(config: &Config, engine: Arc<Engine>) -> Result<Self> {
        let mut scheduler = Scheduler::new();
        let trends_weekday = config
            .trends_weekday()
            .ok_or_else(|| CadenceError::Validation("invalid trends weekday".to_string()))?;
        let (content_hour, content_minute) = config.daily_content_time();

        {
            let engine = engine.clone();
            scheduler.register(Job::new(
                JobKind::PublishTick,
                Cadence::Every(Duration::from_secs(config.cadence.publish_tick_secs)),
                move || {
                    let engine = engine.clone();
                    Box::pin(async move { engine.gate.run_tick().await.map(|_| ()) })
                },
            ));
        }
        {
            let engine = engine.clone();
            scheduler.register(Job::new(
                JobKind::CommentTick,
                Cadence::Every(Duration::from_secs(config.cadence.comment_tick_secs)),
                move || {
                    let engine = engine.clone();
                    Box::pin(async move { engine.comments.run().await.map(|_| ()) })
                },
            ));
        }
        {
            let engine = engine.clone();
            scheduler.register(Job::new(
                JobKind::DailyContent,
                Cadence::DailyAt {
                    hour: content_hour,
                    minute: content_minute,
                },
                move || {
                    let engine = engine.clone();
                    Box::pin(async move { engine.daily.run().await.map(|_| ()) })
                },
            ));
        }
        {
            let engine = engine.clone();
            scheduler.register(Job::new(
                JobKind::ProductCycle,
                Cadence::DailyAt {
                    hour: config.cadence.product_cycle_hour,
                    minute: 0,
                },
                move || {
                    let engine = engine.clone();
                    Box::pin(async move { engine.product.run().await.map(|_| ()) })
                },
            ));
        }
        {
            let engine = engine.clone();
            scheduler.register(Job::new(
                JobKind::DailyMetrics,
                Cadence::DailyAt {
                    hour: config.cadence.metrics_hour,
                    minute: 0,
                },
                move || {
                    let engine = engine.clone();
                    Box::pin(async move { engine.metrics.run().await.map(|_| ()) })
                },
            ));
        }
        {
            let engine = engine.clone();
            scheduler.register(Job::new(
                JobKind::WeeklyTrends,
                Cadence::WeeklyAt {
                    weekday: trends_weekday,
                    hour: config.cadence.trends_hour,
                },
                move || {
                    let engine = engine.clone();
                    Box::pin(async move { engine.trends.run().await.map(|_| ()) })
                },
            ));
        }
        {
            let engine = engine.clone();
            scheduler.register(Job::new(
                JobKind::TokenCheck,
                Cadence::DailyAt {
                    hour: config.cadence.token_check_hour,
                    minute: 0,
                },
                move || {
                    let engine = engine.clone();
                    Box::pin(async move { engine.token_monitor.check().await.map(|_| ()) })
                },
            ));
        }

        Ok(Self { engine, scheduler })
    }

    pub fn engine(&self) -> Arc<Engine> {
        self.engine.clone()
    }

    /// Run a single job now, through its single-flight guard.
    pub async fn run_now(&self, kind: JobKind) -> Result<TickOutcome> {
        let job = self
            .scheduler
            .job(kind)
            .ok_or_else(|| CadenceError::Validation(format!("unknown job {}", kind.name())))?;
        Ok(job.tick().await)
    }

    /// Spawn every job and run until ctrl-c.
    pub async fn run(&self) -> Result<()> {
        tracing::info!("daemon starting");
        let handles = self.scheduler.spawn_all();

        tokio::signal::ctrl_c().await?;
        tracing::info!("shutdown signal received");

        for handle in handles {
            handle.abort();
        }
        Ok(())
    }
}
