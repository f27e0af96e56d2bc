//! The boundary the HTTP layer talks to: alarms in, notifications out.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::briefing::Briefing;
use crate::config::AppConfig;
use crate::error::AlarmError;
use crate::notifications::{Notification, NotificationCenter};
use crate::scheduler::{Alarm, AlarmId, AlarmMeta, AlarmScheduler};
use crate::sources::covid::CovidApiClient;
use crate::sources::news::NewsApiClient;
use crate::sources::weather::OpenWeatherClient;
use crate::sources::Sources;
use crate::speech::{CommandSpeech, LogSpeech, SpeechSink};

pub struct Assistant {
    scheduler: Arc<AlarmScheduler>,
    notifications: NotificationCenter,
    briefing: Arc<Briefing>,
}

impl Assistant {
    pub fn new(sources: Sources, speech: Arc<dyn SpeechSink>) -> Self {
        Self::with_scheduler(Arc::new(AlarmScheduler::new()), sources, speech)
    }

    /// Use a prepared scheduler (e.g. one driven by a manual clock).
    pub fn with_scheduler(
        scheduler: Arc<AlarmScheduler>,
        sources: Sources,
        speech: Arc<dyn SpeechSink>,
    ) -> Self {
        Self {
            scheduler,
            notifications: NotificationCenter::new(sources.clone()),
            briefing: Arc::new(Briefing::new(sources, speech)),
        }
    }

    /// Wire the live HTTP sources and the configured speech sink.
    pub fn from_config(cfg: &AppConfig) -> Self {
        if cfg.open_weather_api_key.is_empty() {
            warn!("OPEN_WEATHER_API_KEY not set; weather will be unavailable");
        }
        if cfg.news_api_key.is_empty() {
            warn!("NEWS_API_KEY not set; news will be unavailable");
        }

        let sources = Sources::new(
            Arc::new(
                OpenWeatherClient::new(cfg.open_weather_api_key.clone())
                    .with_timeout(cfg.http_timeout_secs),
            ),
            Arc::new(
                NewsApiClient::new(cfg.news_api_key.clone()).with_timeout(cfg.http_timeout_secs),
            ),
            Arc::new(CovidApiClient::new().with_timeout(cfg.http_timeout_secs)),
            cfg.location.clone(),
        );

        let speech: Arc<dyn SpeechSink> = match cfg
            .tts_command
            .as_deref()
            .and_then(CommandSpeech::from_command_line)
        {
            Some(cmd) => {
                info!(program = cmd.program(), "speech via external tts program");
                Arc::new(cmd)
            }
            None => {
                info!("no tts command configured; briefings will be logged");
                Arc::new(LogSpeech)
            }
        };

        Self::new(sources, speech)
    }

    /// Start the background alarm dispatcher.
    pub fn start(&self) -> JoinHandle<()> {
        self.scheduler.spawn_dispatcher()
    }

    pub fn scheduler(&self) -> &Arc<AlarmScheduler> {
        &self.scheduler
    }

    /// Schedule a briefing at `fire_at`.
    pub fn schedule_alarm(
        &self,
        fire_at: DateTime<Utc>,
        title: &str,
        include_news: bool,
        include_weather: bool,
    ) -> AlarmId {
        let meta = AlarmMeta {
            title: title.to_string(),
            include_news,
            include_weather,
        };
        self.scheduler
            .schedule(fire_at, meta, self.briefing.clone())
    }

    pub fn cancel_alarm(&self, id: &AlarmId) -> Result<(), AlarmError> {
        self.scheduler.cancel(id)
    }

    pub fn pending_alarms(&self) -> Vec<Alarm> {
        self.scheduler.pending()
    }

    pub async fn list_notifications(&self, refresh: bool) -> Vec<Notification> {
        self.notifications.list(refresh).await
    }

    /// Silent no-op when nothing carries that title.
    pub async fn remove_notification(&self, title: &str) {
        self.notifications.remove(title).await;
    }
}
