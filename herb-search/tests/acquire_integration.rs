//! End-to-end acquisition against mock provider surfaces.

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use herb_search::{
    AcquireConfig, AcquireOptions, AcquisitionEvent, ChannelSink, FetchMode, Orchestrator,
    PageRenderer, Provider, Query, SearchError, SearchType, Translator,
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([90, 140, 40])));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).expect("encode png");
    buf.into_inner()
}

fn config_for(server: &MockServer, provider: Provider) -> AcquireConfig {
    let mut config = AcquireConfig {
        direct_timeout_seconds: 5,
        extended_timeout_seconds: 5,
        ..AcquireConfig::default()
    };
    config.endpoint_overrides.insert(provider, server.uri());
    config
}

async fn mount_images(server: &MockServer, names: &[&str]) {
    for name in names {
        Mock::given(method("GET"))
            .and(path(format!("/img/{name}")))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/png")
                    .set_body_bytes(png(100, 60)),
            )
            .mount(server)
            .await;
    }
}

fn bing_image_page(server: &MockServer, names: &[&str]) -> String {
    let anchors: String = names
        .iter()
        .map(|name| {
            format!(
                r#"<li><a class="iusc" m='{{"murl":"{}/img/{name}"}}'></a></li>"#,
                server.uri()
            )
        })
        .collect();
    format!("<html><body><ul>{anchors}</ul></body></html>")
}

const BING_TEXT_PAGE: &str = r#"<html><body><ol id="b_results">
<li class="b_algo"><h2><a href="https://herbs.example/chamomile">Chamomile</a></h2>
  <div class="b_caption"><p>Chamomile is one of the most ancient medicinal herbs known to mankind.</p></div></li>
<li class="b_algo"><h2><a href="https://herbs.example/tea">Tea</a></h2>
  <div class="b_caption"><p>Short caption.</p></div></li>
<li class="b_algo"><h2><a href="https://herbs.example/sleep">Sleep</a></h2>
  <div class="b_caption"><p>Chamomile tea is widely regarded as a mild tranquilizer and sleep inducer.</p></div></li>
</ol></body></html>"#;

const EMPTY_PAGE: &str = "<html><body><p>No results</p></body></html>";

/// Bing surfaces where only the bare query finds anything.
async fn mount_bing_chamomile(server: &MockServer, images: &[&str]) {
    Mock::given(method("GET"))
        .and(path("/images/search"))
        .and(query_param("q", "Chamomile"))
        .respond_with(ResponseTemplate::new(200).set_body_string(bing_image_page(server, images)))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/images/search"))
        .and(query_param("q", "Chamomile herb plant photo"))
        .respond_with(ResponseTemplate::new(200).set_body_string(EMPTY_PAGE))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "Chamomile"))
        .respond_with(ResponseTemplate::new(200).set_body_string(BING_TEXT_PAGE))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "Chamomile herb plant photo"))
        .respond_with(ResponseTemplate::new(200).set_body_string(EMPTY_PAGE))
        .mount(server)
        .await;
}

fn bing_options(count: usize) -> AcquireOptions {
    AcquireOptions {
        provider: Provider::Bing,
        image_count: count,
        target_language: None,
    }
}

struct CountingRenderer {
    images_html: String,
    text_html: String,
    calls: AtomicUsize,
}

impl CountingRenderer {
    fn new(images_html: String, text_html: &str) -> Arc<Self> {
        Arc::new(Self {
            images_html,
            text_html: text_html.to_owned(),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl PageRenderer for CountingRenderer {
    async fn render_page(&self, url: &str, _proxy: Option<&str>) -> herb_search::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if url.contains("/images/") {
            Ok(self.images_html.clone())
        } else {
            Ok(self.text_html.clone())
        }
    }
}

struct Shouting {
    calls: AtomicUsize,
}

#[async_trait]
impl Translator for Shouting {
    async fn translate(&self, text: &str, target: &str) -> herb_search::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("[{target}] {}", text.to_uppercase()))
    }
}

/// Answers in a script without spaces between words.
struct Unspaced;

#[async_trait]
impl Translator for Unspaced {
    async fn translate(&self, _text: &str, _target: &str) -> herb_search::Result<String> {
        Ok("洋甘菊是一种古老的草药。".to_owned())
    }
}

struct Offline;

#[async_trait]
impl Translator for Offline {
    async fn translate(&self, _text: &str, _target: &str) -> herb_search::Result<String> {
        Err(SearchError::Network("translator offline".into()))
    }
}

#[tokio::test]
async fn refined_variant_falls_back_to_bare_query() {
    let server = MockServer::start().await;
    mount_bing_chamomile(&server, &["1.png", "2.png", "3.png"]).await;
    mount_images(&server, &["1.png", "2.png", "3.png"]).await;

    let orchestrator = Orchestrator::new(config_for(&server, Provider::Bing)).expect("orchestrator");
    let result = orchestrator
        .acquire(&Query::new("Chamomile", SearchType::Subject), &bing_options(4))
        .await
        .expect("content");

    assert_eq!(result.provider_used, Provider::Bing);
    assert!(!result.translated);
    assert_eq!(
        result.snippets,
        vec![
            "Chamomile is one of the most ancient medicinal herbs known to mankind.".to_owned(),
            "Chamomile tea is widely regarded as a mild tranquilizer and sleep inducer.".to_owned(),
        ]
    );
    assert_eq!(result.images.len(), 3);
    assert!(result.images[0].source_url.ends_with("/img/1.png"));
    assert!(result.images[2].source_url.ends_with("/img/3.png"));
    for image in &result.images {
        assert_eq!(image.decoded_dimensions, (100, 60));
        assert_eq!(image.display_dimensions(), (35, 21));
    }
}

#[tokio::test]
async fn images_are_deduplicated_and_capped() {
    let server = MockServer::start().await;
    mount_bing_chamomile(
        &server,
        &["1.png", "1.png#again", "2.png", "3.png", "4.png", "5.png"],
    )
    .await;
    mount_images(&server, &["1.png", "2.png", "3.png", "4.png", "5.png"]).await;

    let orchestrator = Orchestrator::new(config_for(&server, Provider::Bing)).expect("orchestrator");
    let result = orchestrator
        .acquire(&Query::new("Chamomile", SearchType::Subject), &bing_options(2))
        .await
        .expect("content");

    let urls: Vec<&str> = result.images.iter().map(|i| i.source_url.as_str()).collect();
    assert_eq!(urls.len(), 2);
    assert!(urls[0].ends_with("/img/1.png"));
    assert!(urls[1].ends_with("/img/2.png"));
}

#[tokio::test]
async fn malformed_image_is_skipped() {
    let server = MockServer::start().await;
    mount_bing_chamomile(&server, &["1.png", "broken.png", "3.png"]).await;
    mount_images(&server, &["1.png", "3.png"]).await;
    Mock::given(method("GET"))
        .and(path("/img/broken.png"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not an image</html>"))
        .mount(&server)
        .await;

    let orchestrator = Orchestrator::new(config_for(&server, Provider::Bing)).expect("orchestrator");
    let result = orchestrator
        .acquire(&Query::new("Chamomile", SearchType::Subject), &bing_options(3))
        .await
        .expect("content");

    assert_eq!(result.images.len(), 2);
    assert!(result.images[1].source_url.ends_with("/img/3.png"));
}

#[tokio::test]
async fn denial_page_escalates_to_headless_renderer() {
    let server = MockServer::start().await;
    for surface in ["/images/search", "/search/"] {
        Mock::given(method("GET"))
            .and(path(surface))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<html><form action=\"/showcaptcha\">Are you not a robot?</form></html>",
            ))
            .mount(&server)
            .await;
    }
    mount_images(&server, &["y1.png", "y2.png"]).await;

    let images_html = format!(
        r#"<html><body><img class="serp-item__thumb" src="{0}/img/y1.png"><img class="serp-item__thumb" src="{0}/img/y2.png"></body></html>"#,
        server.uri()
    );
    let renderer = CountingRenderer::new(
        images_html,
        r#"<div class="organic__text">Echinacea purpurea is a flowering plant in the daisy family.</div>"#,
    );
    let orchestrator = Orchestrator::builder(config_for(&server, Provider::Yandex))
        .renderer(renderer.clone())
        .build()
        .expect("orchestrator");

    let options = AcquireOptions {
        provider: Provider::Yandex,
        image_count: 2,
        target_language: None,
    };
    let result = orchestrator
        .acquire(&Query::new("Echinacea", SearchType::Subject), &options)
        .await
        .expect("content");

    assert_eq!(result.images.len(), 2);
    assert_eq!(result.snippets.len(), 1);
    // One render per flow, for the refined variant.
    assert_eq!(renderer.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn direct_success_never_touches_renderer() {
    let server = MockServer::start().await;
    let images_json = format!(
        r#"{{"data":{{"result":{{"items":[{{"media":"{0}/img/q1.png"}},{{"media":"{0}/img/q2.png"}}]}}}}}}"#,
        server.uri()
    );
    Mock::given(method("GET"))
        .and(path("/api/search/images"))
        .respond_with(ResponseTemplate::new(200).set_body_string(images_json))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v3/search/web"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"data":{"result":{"items":{"mainline":[{"type":"web","items":[{"desc":"Ginger root has been used in cooking and medicine for thousands of years."}]}]}}}}"#,
        ))
        .mount(&server)
        .await;
    mount_images(&server, &["q1.png", "q2.png"]).await;

    let renderer = CountingRenderer::new(String::new(), "");
    let orchestrator = Orchestrator::builder(config_for(&server, Provider::Qwant))
        .renderer(renderer.clone())
        .build()
        .expect("orchestrator");
    let options = AcquireOptions {
        provider: Provider::Qwant,
        image_count: 2,
        target_language: None,
    };
    let result = orchestrator
        .acquire(&Query::new("Ginger", SearchType::FreeText), &options)
        .await
        .expect("content");

    assert_eq!(result.images.len(), 2);
    assert_eq!(result.snippets.len(), 1);
    assert_eq!(renderer.calls.load(Ordering::SeqCst), 0);
    // Qwant images are shown at a quarter of their size.
    assert_eq!(result.images[0].display_dimensions(), (25, 15));
}

#[tokio::test]
async fn duckduckgo_follows_token_and_pages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<html><script>DDG.deep.initialize('/d.js?q=Peppermint&vqd=4-2718281828&p=1');</script></html>",
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/i.js"))
        .and(query_param("s", "100"))
        .and(query_param("vqd", "4-2718281828"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            r#"{{"results":[{{"image":"{0}/img/d3.png"}},{{"image":"{0}/img/d4.png"}}]}}"#,
            server.uri()
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/i.js"))
        .and(query_param("p", "1"))
        .and(query_param("vqd", "4-2718281828"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            r#"{{"results":[{{"image":"{0}/img/d1.png"}},{{"image":"{0}/img/d2.png"}}],"next":"i.js?q=Peppermint&o=json&s=100"}}"#,
            server.uri()
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/html/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<div class="result"><a class="result__snippet">Peppermint is a hybrid mint, a cross between watermint and spearmint.</a></div>"#,
        ))
        .mount(&server)
        .await;
    mount_images(&server, &["d1.png", "d2.png", "d3.png", "d4.png"]).await;

    let orchestrator =
        Orchestrator::new(config_for(&server, Provider::DuckDuckGo)).expect("orchestrator");
    let options = AcquireOptions {
        provider: Provider::DuckDuckGo,
        image_count: 4,
        target_language: None,
    };
    let result = orchestrator
        .acquire(&Query::new("Peppermint", SearchType::FreeText), &options)
        .await
        .expect("content");

    let urls: Vec<&str> = result.images.iter().map(|i| i.source_url.as_str()).collect();
    assert_eq!(urls.len(), 4);
    assert!(urls[0].ends_with("/img/d1.png"));
    assert!(urls[3].ends_with("/img/d4.png"));
    assert_eq!(result.snippets.len(), 1);
}

#[tokio::test]
async fn deep_search_with_proxy_down_is_unavailable() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("addr").port();
    drop(listener);

    let mut config = AcquireConfig::default();
    config.proxy.port = port;
    config.proxy.probe_timeout_ms = 300;

    let (sink, mut rx) = ChannelSink::new();
    let orchestrator = Orchestrator::builder(config)
        .sink(Arc::new(sink))
        .build()
        .expect("orchestrator");
    let options = AcquireOptions {
        provider: Provider::Deep,
        image_count: 2,
        target_language: None,
    };

    let started = Instant::now();
    let err = orchestrator
        .acquire(&Query::new("Mandrake", SearchType::Subject), &options)
        .await
        .expect_err("proxy down");
    assert!(matches!(err, SearchError::ProviderUnavailable(_)));
    assert!(started.elapsed() < Duration::from_secs(10));

    let mut saw_failed = false;
    while let Ok((_, event)) = rx.try_recv() {
        match event {
            AcquisitionEvent::FetchAttempted { mode, .. } => assert!(mode.is_proxied()),
            AcquisitionEvent::Failed(SearchError::ProviderUnavailable(_)) => saw_failed = true,
            _ => {}
        }
    }
    assert!(saw_failed);
}

#[tokio::test]
async fn nothing_anywhere_is_no_results() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(EMPTY_PAGE))
        .mount(&server)
        .await;

    let orchestrator = Orchestrator::new(config_for(&server, Provider::Bing)).expect("orchestrator");
    let err = orchestrator
        .acquire(&Query::new("Xyzzyroot", SearchType::Subject), &bing_options(2))
        .await
        .expect_err("no results");
    assert!(matches!(err, SearchError::NoResults(_)));
}

#[tokio::test]
async fn text_only_success_still_completes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(BING_TEXT_PAGE))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/images/search"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let orchestrator = Orchestrator::new(config_for(&server, Provider::Bing)).expect("orchestrator");
    let result = orchestrator
        .acquire(&Query::new("Chamomile", SearchType::Subject), &bing_options(2))
        .await
        .expect("text is enough");
    assert_eq!(result.snippets.len(), 2);
    assert!(result.images.is_empty());
}

#[tokio::test]
async fn translation_applies_to_every_snippet() {
    let server = MockServer::start().await;
    mount_bing_chamomile(&server, &["1.png"]).await;
    mount_images(&server, &["1.png"]).await;

    let translator = Arc::new(Shouting {
        calls: AtomicUsize::new(0),
    });
    let orchestrator = Orchestrator::builder(config_for(&server, Provider::Bing))
        .translator(translator.clone())
        .build()
        .expect("orchestrator");
    let options = AcquireOptions {
        target_language: Some("fr".into()),
        ..bing_options(1)
    };
    let result = orchestrator
        .acquire(&Query::new("Chamomile", SearchType::Subject), &options)
        .await
        .expect("content");

    assert!(result.translated);
    assert_eq!(result.target_language.as_deref(), Some("fr"));
    assert!(result.snippets.iter().all(|s| s.starts_with("[fr] CHAMOMILE")));
    assert_eq!(translator.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn source_language_target_skips_translator() {
    let server = MockServer::start().await;
    mount_bing_chamomile(&server, &["1.png"]).await;
    mount_images(&server, &["1.png"]).await;

    let translator = Arc::new(Shouting {
        calls: AtomicUsize::new(0),
    });
    let orchestrator = Orchestrator::builder(config_for(&server, Provider::Bing))
        .translator(translator.clone())
        .build()
        .expect("orchestrator");
    let options = AcquireOptions {
        target_language: Some("EN".into()),
        ..bing_options(1)
    };
    let result = orchestrator
        .acquire(&Query::new("Chamomile", SearchType::Subject), &options)
        .await
        .expect("content");

    assert!(!result.translated);
    assert!(result.snippets[0].starts_with("Chamomile is one"));
    assert_eq!(translator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn too_short_translation_keeps_source_snippet() {
    let server = MockServer::start().await;
    mount_bing_chamomile(&server, &["1.png"]).await;
    mount_images(&server, &["1.png"]).await;

    let orchestrator = Orchestrator::builder(config_for(&server, Provider::Bing))
        .translator(Arc::new(Unspaced))
        .build()
        .expect("orchestrator");
    let options = AcquireOptions {
        target_language: Some("zh".into()),
        ..bing_options(1)
    };
    let result = orchestrator
        .acquire(&Query::new("Chamomile", SearchType::Subject), &options)
        .await
        .expect("content");

    assert!(!result.translated);
    assert_eq!(result.snippets.len(), 2);
    assert!(result
        .snippets
        .iter()
        .all(|s| s.split_whitespace().count() > 5));
    assert!(result.snippets[0].starts_with("Chamomile is one"));
}

#[tokio::test]
async fn unusable_direct_images_escalate_to_renderer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/images/search"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(bing_image_page(&server, &["broken.png"])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(BING_TEXT_PAGE))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/img/broken.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_string("not an image"),
        )
        .mount(&server)
        .await;
    mount_images(&server, &["good.png"]).await;

    let renderer = CountingRenderer::new(bing_image_page(&server, &["good.png"]), "");
    let orchestrator = Orchestrator::builder(config_for(&server, Provider::Bing))
        .renderer(renderer.clone())
        .build()
        .expect("orchestrator");
    let result = orchestrator
        .acquire(&Query::new("Chamomile", SearchType::Subject), &bing_options(1))
        .await
        .expect("content");

    assert_eq!(result.images.len(), 1);
    assert!(result.images[0].source_url.ends_with("/img/good.png"));
    // Only the image flow needed the renderer, and only for the first variant.
    assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);
    assert_eq!(result.snippets.len(), 2);
}

#[tokio::test]
async fn translation_failure_falls_back_and_reports() {
    let server = MockServer::start().await;
    mount_bing_chamomile(&server, &["1.png"]).await;
    mount_images(&server, &["1.png"]).await;

    let (sink, mut rx) = ChannelSink::new();
    let orchestrator = Orchestrator::builder(config_for(&server, Provider::Bing))
        .translator(Arc::new(Offline))
        .sink(Arc::new(sink))
        .build()
        .expect("orchestrator");
    let options = AcquireOptions {
        target_language: Some("de".into()),
        ..bing_options(1)
    };
    let result = orchestrator
        .acquire(&Query::new("Chamomile", SearchType::Subject), &options)
        .await
        .expect("content");

    assert!(!result.translated);
    assert!(result.snippets[0].starts_with("Chamomile is one"));

    let mut saw_translation_failure = false;
    while let Ok((_, event)) = rx.try_recv() {
        if let AcquisitionEvent::TranslationFailed { error } = event {
            assert!(matches!(error, SearchError::Translation(_)));
            saw_translation_failure = true;
        }
    }
    assert!(saw_translation_failure);
}

#[tokio::test]
async fn superseded_submission_events_are_dropped() {
    let server = MockServer::start().await;
    mount_bing_chamomile(&server, &["1.png"]).await;
    mount_images(&server, &["1.png"]).await;

    let (sink, mut rx) = ChannelSink::new();
    let orchestrator = Orchestrator::builder(config_for(&server, Provider::Bing))
        .sink(Arc::new(sink))
        .build()
        .expect("orchestrator");
    let query = Query::new("Chamomile", SearchType::Subject);

    let first = orchestrator.submit("herb-panel", query.clone(), bing_options(1));
    let second = orchestrator.submit("herb-panel", query, bing_options(1));
    assert!(second.ticket.seq > first.ticket.seq);

    // Stale work still runs to completion.
    assert!(first.handle.await.expect("join").is_ok());
    assert!(second.handle.await.expect("join").is_ok());

    let mut completed = 0;
    while let Ok((ticket, event)) = rx.try_recv() {
        assert_eq!(ticket, second.ticket);
        if matches!(event, AcquisitionEvent::Completed(_)) {
            completed += 1;
        }
    }
    assert_eq!(completed, 1);
}

#[tokio::test]
async fn attempts_use_configured_escalation_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut config = config_for(&server, Provider::Bing);
    config
        .escalation_overrides
        .insert(Provider::Bing, vec![FetchMode::Direct]);
    let (sink, mut rx) = ChannelSink::new();
    let orchestrator = Orchestrator::builder(config)
        .sink(Arc::new(sink))
        .build()
        .expect("orchestrator");

    let err = orchestrator
        .acquire(&Query::new("Chamomile", SearchType::FreeText), &bing_options(1))
        .await
        .expect_err("server errors");
    assert!(matches!(err, SearchError::ProviderUnavailable(_)));

    let mut attempts = 0;
    while let Ok((_, event)) = rx.try_recv() {
        if let AcquisitionEvent::FetchAttempted { mode, .. } = event {
            assert_eq!(mode, FetchMode::Direct);
            attempts += 1;
        }
    }
    // One variant, two flows, one mode each.
    assert_eq!(attempts, 2);
}

/// Hits the real Bing surfaces. Run with `cargo test -- --ignored`.
#[tokio::test]
#[ignore]
async fn live_bing_acquisition() {
    let query = Query::new("Chamomile", SearchType::Subject);
    let result = herb_search::acquire(&query, &bing_options(2), AcquireConfig::default())
        .await
        .expect("live acquisition");
    assert_eq!(result.provider_used, Provider::Bing);
    assert!(!result.snippets.is_empty() || !result.images.is_empty());
    assert!(result.images.len() <= 2);
}
