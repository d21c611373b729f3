use std::env;

use anyhow::{anyhow, Result};
use dotenv::dotenv;
use radar_ingestion::actions::{self, automated::Sources};
use radar_ingestion::collector::{mark_interrupted, CancelFlag, JsonCheckpointStore};
use radar_ingestion::config::Config;
use radar_ingestion::init_tracing;
use radar_ingestion::services::{
    apify::ApifyClient, lastfm::LastfmClient, youtube::YoutubeClient, ChannelSource,
    ListeningStatsSource, ProfileSource,
};
use tracing::{error, info, warn};

enum RadarAction {
    Discover,
    CollectInstagram,
    CollectYoutube,
    Merge,
    Score,
    Insights,
    Automated,
}

impl RadarAction {
    fn new(action: &str) -> Result<Self> {
        match action {
            "DISCOVER" => Ok(Self::Discover),
            "COLLECT_INSTAGRAM" => Ok(Self::CollectInstagram),
            "COLLECT_YOUTUBE" => Ok(Self::CollectYoutube),
            "MERGE" => Ok(Self::Merge),
            "SCORE" => Ok(Self::Score),
            "INSIGHTS" => Ok(Self::Insights),
            "AUTOMATED" => Ok(Self::Automated),
            other => Err(anyhow!("Invalid action: {}", other)),
        }
    }
}

fn client<T>(
    key: &Option<String>,
    name: &str,
    build: impl FnOnce(&str) -> radar_ingestion::error::CollectResult<T>,
) -> Result<Option<T>> {
    match key {
        Some(key) if !key.trim().is_empty() => Ok(Some(build(key)?)),
        _ => {
            warn!("⚠️  {} not set", name);
            Ok(None)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let config = Config::from_env();
    init_tracing(&config.log_file())?;

    let action = env::var("ACTION").unwrap_or_else(|_| "AUTOMATED".to_string());
    let action = RadarAction::new(&action)?;

    let lastfm = client(&config.lastfm_api_key, "LASTFM_API_KEY", |k| {
        LastfmClient::new(k)
    })?;
    let youtube = client(&config.youtube_api_key, "YOUTUBE_API_KEY", |k| {
        YoutubeClient::new(k)
    })?;
    let apify = client(&config.apify_api_token, "APIFY_API_TOKEN", |k| {
        ApifyClient::new(k)
    })?;

    let stats: Option<&dyn ListeningStatsSource> = lastfm.as_ref().map(|c| c as &dyn ListeningStatsSource);
    let channels: Option<&dyn ChannelSource> = youtube.as_ref().map(|c| c as &dyn ChannelSource);
    let profiles: Option<&dyn ProfileSource> = apify.as_ref().map(|c| c as &dyn ProfileSource);

    let checkpoint = JsonCheckpointStore::new(config.checkpoint_file());
    let cancel = CancelFlag::new();
    cancel.install_ctrl_c_handler();

    let result = match action {
        RadarAction::Discover => {
            let stats = stats.ok_or_else(|| anyhow!("DISCOVER needs LASTFM_API_KEY"))?;
            actions::discover::discover(&config, stats, &cancel)
                .await
                .map(|summary| info!("🎵 Discovery finished: {:?}", summary))
        }
        RadarAction::CollectInstagram => {
            let profiles =
                profiles.ok_or_else(|| anyhow!("COLLECT_INSTAGRAM needs APIFY_API_TOKEN"))?;
            actions::instagram::collect_instagram(&config, profiles, channels, &checkpoint, &cancel)
                .await
                .map(|report| info!("📸 Instagram pass finished: {:?}", report))
        }
        RadarAction::CollectYoutube => {
            let channels = channels.ok_or_else(|| anyhow!("COLLECT_YOUTUBE needs YOUTUBE_API_KEY"))?;
            actions::youtube::collect_youtube(&config, channels, &checkpoint, &cancel)
                .await
                .map(|report| info!("📺 YouTube pass finished: {:?}", report))
        }
        RadarAction::Merge => actions::merge::merge(&config)
            .map(|summary| info!("🔗 Merge finished: {:?}", summary)),
        RadarAction::Score => actions::score::score(&config)
            .map(|summary| info!("📊 Scoring finished: {:?}", summary)),
        RadarAction::Insights => actions::insights::generate_insights(&config).map(|paths| {
            for path in paths {
                info!("📄 Wrote {}", path.display());
            }
        }),
        RadarAction::Automated => {
            let sources = Sources {
                stats,
                profiles,
                channels,
            };
            actions::automated::run_automated(&config, sources, &checkpoint, &cancel)
                .await
                .map(|summary| info!("🤖 Automated run finished: {:?}", summary))
        }
    };

    if let Err(e) = result {
        error!("❌ Action failed: {}", e);
    }
    // Discovery has no cursor of its own, so record the stop here.
    if cancel.is_cancelled() {
        mark_interrupted(&checkpoint)?;
    }
    Ok(())
}
