//! Local fake of a SomaFM-like provider: ICY streams, song history, channels.
#![allow(dead_code)]

use std::net::SocketAddr;

use axum::body::Body;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures_util::stream::{self, StreamExt};

pub const METAINT: usize = 64;

type Chunk = Result<Vec<u8>, std::io::Error>;

/// What the fake stream does after the scripted chunks.
enum Tail {
    End,
    Stall,
    Endless,
}

pub fn icy_block(text: &str) -> Vec<u8> {
    let blocks = text.len().div_ceil(16);
    let mut v = Vec::with_capacity(1 + blocks * 16);
    v.push(blocks as u8);
    v.extend_from_slice(text.as_bytes());
    v.resize(1 + blocks * 16, 0);
    v
}

fn audio(n: usize) -> Vec<u8> {
    vec![0x55; n]
}

fn icy_response(chunks: Vec<Vec<u8>>, tail: Tail, metaint: Option<usize>) -> Response {
    let head = stream::iter(chunks.into_iter().map(Ok::<Vec<u8>, std::io::Error>));
    let body = match tail {
        Tail::End => Body::from_stream(head),
        Tail::Stall => Body::from_stream(head.chain(stream::pending::<Chunk>())),
        Tail::Endless => Body::from_stream(head.chain(stream::repeat_with(|| Ok(audio(4096))))),
    };
    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header("content-type", "audio/mpeg");
    if let Some(n) = metaint {
        builder = builder.header("icy-metaint", n.to_string());
    }
    builder
        .body(body)
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

/// Metadata block split across two chunks, then endless audio.
async fn icy_title() -> Response {
    let mut first = audio(40);
    let mut rest = audio(METAINT - 40);
    rest.extend(icy_block("StreamTitle='Artist Name - Song Title';StreamUrl='';"));
    first.extend_from_slice(&rest[..10]);
    let second = rest[10..].to_vec();
    icy_response(vec![first, second], Tail::Endless, Some(METAINT))
}

async fn icy_solo() -> Response {
    let mut chunk = audio(METAINT);
    chunk.extend(icy_block("StreamTitle='Solo Title Only';"));
    icy_response(vec![chunk], Tail::Endless, Some(METAINT))
}

async fn icy_empty() -> Response {
    let mut chunk = audio(METAINT);
    chunk.push(0);
    icy_response(vec![chunk], Tail::Endless, Some(METAINT))
}

async fn icy_no_title() -> Response {
    let mut chunk = audio(METAINT);
    chunk.extend(icy_block("StreamUrl='https://somafm.com';"));
    icy_response(vec![chunk], Tail::Endless, Some(METAINT))
}

async fn icy_stall() -> Response {
    icy_response(vec![audio(16)], Tail::Stall, Some(METAINT))
}

async fn icy_short() -> Response {
    icy_response(vec![audio(METAINT / 2)], Tail::End, Some(METAINT))
}

async fn plain_stream() -> Response {
    icy_response(vec![audio(1024)], Tail::Endless, None)
}

async fn songs_groovesalad() -> impl IntoResponse {
    (
        [("content-type", "application/json")],
        r#"{"id":"groovesalad","songs":[
            {"title":"Kerala","artist":"Bonobo","album":"Migration","date":"1700000000"},
            {"title":"Roygbiv","artist":"Boards of Canada","album":"","date":"1699999700"},
            {"date":"1699999400"}
        ]}"#,
    )
}

async fn songs_empty() -> &'static str {
    r#"{"songs":[]}"#
}

async fn songs_broken() -> &'static str {
    "<html>not json</html>"
}

async fn songs_error() -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn channels() -> &'static str {
    r#"{"channels":[
        {"id":"groovesalad","title":"Groove Salad","genre":"ambient","listeners":"1500",
         "playlists":[{"url":"/lists/gs.pls","format":"mp3","quality":"highest"}]},
        {"id":"icyonly","title":"ICY Only","listeners":"7",
         "playlists":[{"url":"/lists/icy.m3u","format":"aac","quality":"high"}]}
    ]}"#
}

async fn pls() -> &'static str {
    "[playlist]\nnumberofentries=1\nFile1=../icy/title\nTitle1=Groove Salad\nLength1=-1\n"
}

async fn m3u() -> &'static str {
    "#EXTM3U\n#EXTINF:-1,ICY Only\n/icy/solo\n"
}

async fn empty_pls() -> &'static str {
    "[playlist]\nnumberofentries=0\n"
}

pub fn radio_router() -> Router {
    Router::new()
        .route("/icy/title", get(icy_title))
        .route("/icy/solo", get(icy_solo))
        .route("/icy/empty", get(icy_empty))
        .route("/icy/notitle", get(icy_no_title))
        .route("/icy/stall", get(icy_stall))
        .route("/icy/short", get(icy_short))
        .route("/plain", get(plain_stream))
        .route("/songs/groovesalad.json", get(songs_groovesalad))
        .route("/songs/empty.json", get(songs_empty))
        .route("/songs/broken.json", get(songs_broken))
        .route("/songs/error.json", get(songs_error))
        .route("/channels.json", get(channels))
        .route("/lists/gs.pls", get(pls))
        .route("/lists/icy.m3u", get(m3u))
        .route("/lists/empty.pls", get(empty_pls))
}

/// Bind on an ephemeral port and serve `radio_router()` in the background.
pub async fn spawn_server() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test server");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, radio_router()).await;
    });
    addr
}

pub fn url(addr: SocketAddr, path: &str) -> String {
    format!("http://{}{}", addr, path)
}
