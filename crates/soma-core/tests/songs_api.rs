mod common;

use soma_core::songs::SongHistoryClient;
use soma_core::{MetadataError, TrackMetadata};

fn client(addr: std::net::SocketAddr) -> SongHistoryClient {
    SongHistoryClient::with_client(reqwest::Client::new(), &common::url(addr, "/songs"))
}

#[tokio::test]
async fn latest_track_is_first_entry() {
    let addr = common::spawn_server().await;
    let latest = client(addr).get_latest_track("groovesalad").await;
    assert_eq!(
        latest,
        Some(TrackMetadata::new("Bonobo", "Kerala").with_album("Migration"))
    );
}

#[tokio::test]
async fn history_keeps_server_order_in_millis() {
    let addr = common::spawn_server().await;
    let history = client(addr).get_track_history("groovesalad").await;

    assert_eq!(history.len(), 3);
    assert_eq!(history[0].played_at, 1_700_000_000_000);
    assert_eq!(history[1].played_at, 1_699_999_700_000);
    assert_eq!(history[1].track.artist, "Boards of Canada");
    assert_eq!(history[1].track.album, None);
    assert_eq!(history[2].track.artist, "Unknown Artist");
    assert_eq!(history[2].track.title, "Unknown Title");
}

#[tokio::test]
async fn empty_list_is_no_metadata() {
    let addr = common::spawn_server().await;
    let client = client(addr);
    assert_eq!(client.get_latest_track("empty").await, None);
    assert!(client.get_track_history("empty").await.is_empty());
}

#[tokio::test]
async fn failures_are_absorbed() {
    let addr = common::spawn_server().await;
    let client = client(addr);

    for station in ["broken", "error", "missing"] {
        assert_eq!(client.get_latest_track(station).await, None, "{}", station);
        assert!(client.get_track_history(station).await.is_empty(), "{}", station);
    }

    assert!(matches!(
        client.fetch_songs("broken").await,
        Err(MetadataError::Decode(_))
    ));
    assert!(matches!(
        client.fetch_songs("error").await,
        Err(MetadataError::Status(s)) if s.as_u16() == 500
    ));
}
