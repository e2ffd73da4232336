mod common;

use chrono::{Duration, Utc};

use caption_harvester::auth::{ClientRegistration, OAuthClient, TokenStore};
use caption_harvester::harvest::{CaptionFetcher, Harvester, HarvestSummary};
use caption_harvester::{
    CaptionFormat, Credential, HarvesterError, TokenSet, VideoPlatform, YoutubeClient,
};
use common::FakeGoogle;

fn credential(google: &FakeGoogle, dir: &std::path::Path, token: TokenSet) -> Credential {
    let registration = ClientRegistration {
        client_id: "test-client.apps.googleusercontent.com".to_string(),
        client_secret: "test-secret".to_string(),
        redirect_uri: "http://localhost:3000".to_string(),
        auth_uri: None,
        token_uri: None,
    };
    let client = OAuthClient::new(&registration, &google.oauth_settings(dir));
    Credential::new(client, TokenStore::new(dir.join("token.json")), Some(token))
}

fn valid_token() -> TokenSet {
    TokenSet {
        access_token: Some("ya29.valid".to_string()),
        refresh_token: Some("1//stored".to_string()),
        expiry_date: Some((Utc::now() + Duration::hours(1)).timestamp_millis()),
        ..Default::default()
    }
}

#[tokio::test]
async fn harvests_every_upload_across_pages() {
    let google = FakeGoogle::start().await;
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("captions");

    let client = YoutubeClient::new(
        &google.api_settings(),
        credential(&google, dir.path(), valid_token()),
    );
    let fetcher = CaptionFetcher::new(&out, CaptionFormat::Srt);
    let summary = Harvester::new(client, fetcher, 50).run().await.unwrap();

    assert_eq!(
        summary,
        HarvestSummary {
            videos: 3,
            saved: 2,
            without_captions: 1,
            pages: 2,
        }
    );
    assert_eq!(
        google.api_requests(),
        vec![
            "channels mine=true",
            "playlistItems UU1 max=50 page=-",
            "captions v1",
            "download v1-first",
            "captions v2",
            "playlistItems UU1 max=50 page=p2",
            "captions v3",
            "download v3-first",
        ]
    );
    assert!(google
        .authorizations()
        .iter()
        .all(|header| header == "Bearer ya29.valid"));
    assert_eq!(google.token_request_count(), 0);

    assert_eq!(
        fs_err::read_to_string(out.join("hello_world_1_v1.srt")).unwrap(),
        "caption v1-first as srt"
    );
    assert!(out.join("part_3_finale_v3.srt").exists());
    assert!(!out.join("no_subs_here_v2.srt").exists());
}

#[tokio::test]
async fn expired_token_is_refreshed_and_persisted_before_the_first_call() {
    let google = FakeGoogle::start().await;
    let dir = tempfile::tempdir().unwrap();

    let stale = TokenSet {
        access_token: Some("ya29.stale".to_string()),
        refresh_token: Some("1//stored".to_string()),
        expiry_date: Some((Utc::now() - Duration::minutes(5)).timestamp_millis()),
        ..Default::default()
    };
    let client = YoutubeClient::new(&google.api_settings(), credential(&google, dir.path(), stale));

    let channels = client.list_my_channels().await.unwrap();
    assert_eq!(channels[0].uploads_playlist(), Some("UU1"));

    assert_eq!(google.token_request_count(), 1);
    assert_eq!(google.authorizations(), vec!["Bearer ya29.refreshed"]);

    let stored: TokenSet =
        serde_json::from_str(&fs_err::read_to_string(dir.path().join("token.json")).unwrap())
            .unwrap();
    assert_eq!(stored.access_token.as_deref(), Some("ya29.refreshed"));
    assert_eq!(stored.refresh_token.as_deref(), Some("1//stored"));
    assert!(stored.expiry_date.unwrap() > Utc::now().timestamp_millis());

    // The refreshed token is reused for the next call.
    client.list_captions("v1").await.unwrap();
    assert_eq!(google.token_request_count(), 1);
}

#[tokio::test]
async fn api_error_status_is_reported() {
    let google = FakeGoogle::start().await;
    let dir = tempfile::tempdir().unwrap();
    let client = YoutubeClient::new(
        &google.api_settings(),
        credential(&google, dir.path(), valid_token()),
    );

    let err = client.list_captions("forbidden").await.unwrap_err();
    match err.downcast_ref::<HarvesterError>() {
        Some(HarvesterError::ApiError { status, body }) => {
            assert_eq!(*status, 403);
            assert!(body.contains("forbidden"));
        }
        other => panic!("expected ApiError, got {:?}", other),
    }
}

#[tokio::test]
async fn download_requests_the_configured_format() {
    let google = FakeGoogle::start().await;
    let dir = tempfile::tempdir().unwrap();
    let client = YoutubeClient::new(
        &google.api_settings(),
        credential(&google, dir.path(), valid_token()),
    );

    let content = client.download_caption("abc", CaptionFormat::Vtt).await.unwrap();
    assert_eq!(content, b"caption abc as vtt");
}

#[tokio::test]
async fn caption_id_is_sent_as_a_single_path_segment() {
    let google = FakeGoogle::start().await;
    let dir = tempfile::tempdir().unwrap();
    let client = YoutubeClient::new(
        &google.api_settings(),
        credential(&google, dir.path(), valid_token()),
    );

    for id in ["a?b", "a#b", "abc/def="] {
        let content = client.download_caption(id, CaptionFormat::Srt).await.unwrap();
        assert_eq!(content, format!("caption {} as srt", id).into_bytes());
    }
    assert_eq!(
        google.api_requests(),
        vec!["download a?b", "download a#b", "download abc/def="]
    );
}
