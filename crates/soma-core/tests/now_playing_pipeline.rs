mod common;

use std::sync::Arc;
use std::time::Duration;

use soma_core::config::Config;
use soma_core::orchestrator::OrchestratorOptions;
use soma_core::reader::StreamMetadataReader;
use soma_core::songs::SongHistoryClient;
use soma_core::{MetadataOrchestrator, MetadataSource, NowPlaying};
use tokio::sync::watch;

fn config(addr: std::net::SocketAddr) -> Config {
    let mut config = Config::default();
    config.endpoints.songs_base_url = common::url(addr, "/songs");
    config.endpoints.channels_url = common::url(addr, "/channels.json");
    config.metadata.poll_interval_secs = 1;
    config.metadata.stream_read_timeout_ms = 2_000;
    config
}

async fn wait_for(
    rx: &mut watch::Receiver<NowPlaying>,
    f: impl FnMut(&NowPlaying) -> bool,
) -> NowPlaying {
    tokio::time::timeout(Duration::from_secs(10), rx.wait_for(f))
        .await
        .expect("timed out waiting for now-playing")
        .expect("orchestrator closed")
        .clone()
}

#[tokio::test]
async fn history_api_then_icy_fallback() {
    let addr = common::spawn_server().await;
    let orch = MetadataOrchestrator::from_config(&config(addr)).unwrap();
    let mut rx = orch.subscribe();

    orch.select("groovesalad", common::url(addr, "/icy/title"))
        .await
        .unwrap();
    let np = wait_for(&mut rx, |np| np.current.is_some()).await;
    assert_eq!(np.source, Some(MetadataSource::HistoryApi));
    assert_eq!(np.current.as_ref().unwrap().title, "Kerala");
    assert_eq!(np.current.as_ref().unwrap().album.as_deref(), Some("Migration"));

    // no songs endpoint for this station: falls back to the stream
    orch.select("icyonly", common::url(addr, "/icy/solo"))
        .await
        .unwrap();
    let np = wait_for(&mut rx, |np| {
        np.current.as_ref().is_some_and(|t| t.title == "Solo Title Only")
    })
    .await;
    assert_eq!(np.source, Some(MetadataSource::IcyStream));
    assert_eq!(np.history.len(), 1, "history is per station");
    assert_eq!(np.history[0].track.artist, "Unknown Artist");

    // a couple of poll intervals later the same track has not been re-added
    tokio::time::sleep(Duration::from_millis(2_500)).await;
    assert_eq!(orch.now_playing().history.len(), 1);

    orch.dispose().await;
}

#[tokio::test]
async fn station_without_any_metadata_stays_blank() {
    let addr = common::spawn_server().await;
    let orch = MetadataOrchestrator::from_config(&config(addr)).unwrap();

    orch.select("missing", common::url(addr, "/plain"))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(1_500)).await;

    let np = orch.now_playing();
    assert!(np.is_polling());
    assert_eq!(np.current, None);
    assert!(np.history.is_empty());

    orch.stop().await.unwrap();
    orch.dispose().await;
}

#[tokio::test]
async fn stop_during_stalled_read_leaves_nothing_behind() {
    let addr = common::spawn_server().await;
    let orch = MetadataOrchestrator::from_config(&config(addr)).unwrap();
    let mut rx = orch.subscribe();

    orch.select("missing", common::url(addr, "/icy/stall"))
        .await
        .unwrap();
    wait_for(&mut rx, |np| np.is_polling()).await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    orch.stop().await.unwrap();
    let np = wait_for(&mut rx, |np| !np.is_polling()).await;
    assert_eq!(np.current, None);

    tokio::time::sleep(Duration::from_millis(2_500)).await;
    let np = orch.now_playing();
    assert!(!np.is_polling());
    assert_eq!(np.current, None);
    orch.dispose().await;
}

#[tokio::test]
async fn dropping_orchestrator_releases_shared_reader() {
    let addr = common::spawn_server().await;
    let config = config(addr);
    let reader = Arc::new(StreamMetadataReader::new(&config.metadata).unwrap());
    let songs = SongHistoryClient::with_client(reqwest::Client::new(), &common::url(addr, "/songs"));

    let orch = MetadataOrchestrator::create(
        Arc::new(songs),
        reader.clone(),
        OrchestratorOptions::from(&config.metadata),
    );
    orch.select("missing", common::url(addr, "/icy/stall"))
        .await
        .unwrap();

    tokio::time::timeout(Duration::from_secs(5), async {
        while !reader.is_busy() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("stream read never started");

    drop(orch);
    tokio::time::timeout(Duration::from_secs(5), async {
        while reader.is_busy() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("reader still busy after the orchestrator was dropped");
}
