//! Demo that runs the assistant offline: fixture sources, briefings go to the log.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use daily_brief::sources::fixture::{FixedNews, FixedStats, FixedWeather};
use daily_brief::sources::{CaseSummary, Headline, Location, Sources, WeatherReport};
use daily_brief::speech::LogSpeech;
use daily_brief::Assistant;

#[tokio::main]
async fn main() {
    daily_brief::init_tracing();

    let sources = Sources::new(
        Arc::new(FixedWeather::from_fixture(Some(WeatherReport {
            description: "light rain".into(),
            temperature: 11.5,
            feels_like: 9.8,
            humidity: 87.0,
        }))),
        Arc::new(FixedNews::from_fixture(vec![
            Headline::new("Rail strike called off", "Unions accept the revised pay offer."),
            Headline::new("Floods in Somerset", "Roads closed after a night of heavy rain."),
        ])),
        Arc::new(FixedStats::from_fixture(Some(CaseSummary {
            is_latest: true,
            as_of: NaiveDate::from_ymd_opt(2020, 7, 28).unwrap_or_default(),
            new_cases: 547,
            cumulative_cases: 259_022,
            new_deaths: 20,
            cumulative_deaths: 41_282,
        }))),
        Location::default(),
    );

    let assistant = Arc::new(Assistant::new(sources, Arc::new(LogSpeech)));
    let _dispatcher = assistant.start();

    let now = Utc::now();
    assistant.schedule_alarm(now + ChronoDuration::seconds(1), "morning", true, true);
    let skipped = assistant.schedule_alarm(now + ChronoDuration::seconds(2), "skipped", false, false);
    if let Err(e) = assistant.cancel_alarm(&skipped) {
        eprintln!("cancel failed: {e}");
    }

    tokio::time::sleep(Duration::from_millis(1_500)).await;

    for n in assistant.list_notifications(true).await {
        println!("[{}] {}: {}", n.id, n.title, n.content);
    }
    assistant.remove_notification("Floods in Somerset").await;
    println!(
        "after dismiss: {} notifications",
        assistant.list_notifications(true).await.len()
    );

    println!("brief-demo done");
}
