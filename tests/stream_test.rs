//! Integration tests for the playback streaming routes over a live server.

mod common;

use common::TestHarness;
use reelhouse_common::{LibraryKind, Status};
use reelhouse_db::queries::{movies, music, series};

fn sample_bytes(len: usize) -> Vec<u8> {
    (0..=255u8).cycle().take(len).collect()
}

/// A downloaded movie whose file lives under the movie root.
fn seed_movie(h: &TestHarness, ext: &str, data: &[u8]) -> String {
    let file = h.write_media(
        LibraryKind::Movies,
        &format!("Arrival (2016)/Arrival.2016.{ext}"),
        data,
    );
    let movie = movies::create_movie(&h.conn(), "Arrival", Some(2016)).unwrap();
    movies::set_movie_availability(
        &h.conn(),
        movie.id,
        Status::Downloaded,
        Some(&file.parent().unwrap().to_string_lossy()),
    )
    .unwrap();
    movie.id.to_string()
}

#[tokio::test]
async fn video_full_request_serves_whole_file() {
    let (h, addr) = TestHarness::with_server().await;
    let data = sample_bytes(2048);
    let id = seed_movie(&h, "mp4", &data);

    let resp = reqwest::get(format!("http://{addr}/api/playback/video/movie/{id}"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["content-type"], "video/mp4");
    assert_eq!(resp.headers()["accept-ranges"], "bytes");
    assert_eq!(resp.headers()["content-length"], "2048");
    assert_eq!(resp.bytes().await.unwrap().as_ref(), data.as_slice());
}

#[tokio::test]
async fn video_range_request_returns_partial_content() {
    let (h, addr) = TestHarness::with_server().await;
    let data = sample_bytes(2048);
    let id = seed_movie(&h, "mp4", &data);

    let client = reqwest::Client::new();
    let resp = client
        .get(format!("http://{addr}/api/playback/video/movie/{id}"))
        .header("Range", "bytes=100-199")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 206);
    assert_eq!(resp.headers()["content-range"], "bytes 100-199/2048");
    assert_eq!(resp.headers()["content-length"], "100");
    assert_eq!(resp.bytes().await.unwrap().as_ref(), &data[100..200]);
}

#[tokio::test]
async fn open_ended_and_suffix_ranges() {
    let (h, addr) = TestHarness::with_server().await;
    let data = sample_bytes(1000);
    let id = seed_movie(&h, "webm", &data);
    let url = format!("http://{addr}/api/playback/video/movie/{id}");
    let client = reqwest::Client::new();

    let resp = client
        .get(&url)
        .header("Range", "bytes=900-")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 206);
    assert_eq!(resp.headers()["content-range"], "bytes 900-999/1000");
    assert_eq!(resp.headers()["content-type"], "video/webm");
    assert_eq!(resp.bytes().await.unwrap().as_ref(), &data[900..]);

    let resp = client
        .get(&url)
        .header("Range", "bytes=-10")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 206);
    assert_eq!(resp.headers()["content-range"], "bytes 990-999/1000");
    assert_eq!(resp.bytes().await.unwrap().len(), 10);

    // end past the file is clamped
    let resp = client
        .get(&url)
        .header("Range", "bytes=950-5000")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 206);
    assert_eq!(resp.headers()["content-range"], "bytes 950-999/1000");
}

#[tokio::test]
async fn unsatisfiable_range_is_416() {
    let (h, addr) = TestHarness::with_server().await;
    let id = seed_movie(&h, "mp4", &sample_bytes(500));

    let resp = reqwest::Client::new()
        .get(format!("http://{addr}/api/playback/video/movie/{id}"))
        .header("Range", "bytes=500-600")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 416);
    assert_eq!(resp.headers()["content-range"], "bytes */500");
    assert!(resp.bytes().await.unwrap().is_empty());
}

#[tokio::test]
async fn episode_stream_uses_stored_file_path() {
    let (h, addr) = TestHarness::with_server().await;
    let data = sample_bytes(300);
    let file = h.write_media(LibraryKind::Tv, "Dark/Season 1/Dark.S01E01.mp4", &data);

    let conn = h.conn();
    let show = series::create_series(&conn, "Dark", Some(2017)).unwrap();
    let ep = series::create_episode(&conn, show.id, 1, 1, None).unwrap();
    series::set_episode_availability(&conn, ep.id, true, Some(&file.to_string_lossy())).unwrap();
    drop(conn);

    let resp = reqwest::get(format!("http://{addr}/api/playback/video/episode/{}", ep.id))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.bytes().await.unwrap().len(), 300);
}

#[tokio::test]
async fn audio_track_streams_with_audio_content_type() {
    let (h, addr) = TestHarness::with_server().await;
    let data = sample_bytes(640);
    h.write_media(LibraryKind::Music, "Bjork/Homogenic/01 - Hunter.flac", &data);
    h.ctx.reconciler.force_reconcile_music().unwrap();
    let track = music::list_tracks_with_album(&h.conn()).unwrap().remove(0);

    let resp = reqwest::Client::new()
        .get(format!("http://{addr}/api/playback/audio/track/{}", track.track.id))
        .header("Range", "bytes=0-63")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 206);
    assert_eq!(resp.headers()["content-type"], "audio/flac");
    assert_eq!(resp.bytes().await.unwrap().as_ref(), &data[..64]);
}

#[tokio::test]
async fn unknown_and_malformed_ids() {
    let (_h, addr) = TestHarness::with_server().await;

    let resp = reqwest::get(format!(
        "http://{addr}/api/playback/video/movie/{}",
        reelhouse_common::MovieId::new()
    ))
    .await
    .unwrap();
    assert_eq!(resp.status(), 404);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "not_found");

    let resp = reqwest::get(format!("http://{addr}/api/playback/video/movie/not-a-uuid"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = reqwest::get(format!("http://{addr}/api/playback/video/track/whatever"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn movie_without_playable_file_is_404() {
    let (h, addr) = TestHarness::with_server().await;
    h.write_media(LibraryKind::Movies, "Arrival (2016)/Arrival.2016.avi", b"x");
    let movie = movies::create_movie(&h.conn(), "Arrival", Some(2016)).unwrap();

    let resp = reqwest::get(format!("http://{addr}/api/playback/video/movie/{}", movie.id))
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn matroska_without_encoder_asks_for_external_player() {
    let (h, addr) = TestHarness::with_server().await;
    let id = seed_movie(&h, "mkv", &sample_bytes(128));

    let resp = reqwest::get(format!("http://{addr}/api/playback/video/movie/{id}"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "transcode_failed");
    assert!(body["error"].as_str().unwrap().contains("external player"));
}
