use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tagbadge::render::{
    BOX_PADDING_X, BOX_PADDING_Y, BadgeEngineConfig, BadgeRenderer, ContentFill, DeterministicTextMetricsProvider,
    FALLBACK_TEXT_SIZE, InMemoryMetricsStore, MeasurementError, MetricsCache, MetricsCacheOptions,
    TITLE_TEXT_SELECTOR, TextMetricsProvider,
};
use tagbadge::{BadgeRecord, ColorScale, TextSize};

/// Deterministic measurements plus a call counter.
#[derive(Default)]
struct CountingProvider {
    inner: DeterministicTextMetricsProvider,
    calls: AtomicUsize,
}

impl CountingProvider {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextMetricsProvider for CountingProvider {
    async fn measure_raw(
        &self,
        markup: &str,
        selector: &str,
    ) -> Result<TextSize, MeasurementError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.measure_markup(markup, selector)
    }
}

struct UnreachableProvider;

#[async_trait]
impl TextMetricsProvider for UnreachableProvider {
    async fn measure_raw(
        &self,
        _markup: &str,
        _selector: &str,
    ) -> Result<TextSize, MeasurementError> {
        Err(MeasurementError::unreachable("connection refused"))
    }
}

fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .and_then(|p| p.parent())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn sample_records() -> Vec<BadgeRecord> {
    let path = workspace_root().join("fixtures").join("coverage.json");
    let text = std::fs::read_to_string(&path).expect("read fixture");
    BadgeRecord::list_from_json_str(&text).expect("parse fixture")
}

fn counting_renderer() -> (BadgeRenderer, Arc<CountingProvider>) {
    let provider = Arc::new(CountingProvider::default());
    let renderer = BadgeRenderer::with_provider(provider.clone(), MetricsCacheOptions::default());
    (renderer, provider)
}

#[tokio::test]
async fn twelve_records_render_as_three_rows_of_five() {
    let records = sample_records();
    assert_eq!(records.len(), 12);

    let (renderer, _) = counting_renderer();
    let geometry = renderer
        .layout(&records, "coverage", &ContentFill::Text)
        .await
        .expect("layout");
    assert_eq!(geometry.row_count, 3);
    let p5 = geometry.position(5);
    assert_eq!((p5.row, p5.col), (1, 0));

    let doc = renderer
        .render(&records, "coverage", &ContentFill::Text)
        .await
        .expect("render");
    assert_eq!(doc.width, geometry.total_width);
    assert_eq!(doc.height, geometry.total_height);

    let parsed = roxmltree::Document::parse(doc.as_str()).expect("well-formed");
    let badges = parsed
        .descendants()
        .filter(|n| n.attribute("class") == Some("badge"))
        .count();
    assert_eq!(badges, 12);
}

#[tokio::test]
async fn empty_dataset_fails_before_measuring() {
    let (renderer, provider) = counting_renderer();
    let err = renderer
        .render(&[], "coverage", &ContentFill::Text)
        .await
        .expect_err("empty");
    assert!(err.is_empty_dataset());
    assert_eq!(provider.calls(), 0);

    let err = renderer
        .render_json("[]", "coverage", &ContentFill::Text)
        .await
        .expect_err("empty json");
    assert!(err.is_empty_dataset());
}

#[tokio::test]
async fn rerendering_reuses_cached_measurements() {
    let records = sample_records();
    let (renderer, provider) = counting_renderer();

    renderer
        .render(&records, "coverage", &ContentFill::Text)
        .await
        .expect("first");
    assert_eq!(provider.calls(), 2);

    let shared = renderer.clone();
    shared
        .render(&records, "coverage", &ContentFill::Text)
        .await
        .expect("second");
    assert_eq!(provider.calls(), 2);

    renderer
        .render(&records, "tests", &ContentFill::Text)
        .await
        .expect("new title");
    assert_eq!(provider.calls(), 3);
}

#[tokio::test]
async fn rendered_title_measures_back_to_layout_width() {
    let records = sample_records();
    let (renderer, _) = counting_renderer();
    let geometry = renderer
        .layout(&records, "coverage", &ContentFill::Text)
        .await
        .expect("layout");
    let doc = renderer
        .render(&records, "coverage", &ContentFill::Text)
        .await
        .expect("render");

    // Same provider and correction, but the final document instead of the probe.
    let cache = MetricsCache::new(
        Arc::new(DeterministicTextMetricsProvider::default()),
        Arc::new(InMemoryMetricsStore::new()),
        MetricsCacheOptions::default(),
    );
    let remeasured = cache
        .measure(doc.as_str(), TITLE_TEXT_SELECTOR)
        .await
        .expect("remeasure");
    let expected = geometry.title_box.width - BOX_PADDING_X;
    assert!((remeasured.width - expected).abs() < 1e-6);
}

#[tokio::test]
async fn content_width_override_skips_value_probe() {
    let records = sample_records();
    let (renderer, provider) = counting_renderer();
    let renderer = renderer.with_content_width(42.0);

    let geometry = renderer
        .layout(&records, "coverage", &ContentFill::Text)
        .await
        .expect("layout");
    assert_eq!(provider.calls(), 1);
    assert_eq!(geometry.content_box.width, 52.0);
    assert_eq!(geometry.content_box.height, geometry.title_box.height);
}

#[tokio::test]
async fn fallback_renderer_lays_out_the_fallback_size() {
    let records = sample_records();
    let geometry = BadgeRenderer::fallback()
        .layout(&records, "coverage", &ContentFill::Text)
        .await
        .expect("layout");
    let expected = TextSize::new(
        FALLBACK_TEXT_SIZE.width + BOX_PADDING_X,
        FALLBACK_TEXT_SIZE.height + BOX_PADDING_Y,
    );
    assert_eq!(geometry.title_box, expected);
    assert_eq!(geometry.content_box, expected);
    assert_eq!(expected, TextSize::new(50.0, 20.0));
}

#[tokio::test]
async fn fixed_width_fills_skip_value_probe() {
    let records = vec![BadgeRecord::percent("serde", 0.5)];
    let (renderer, provider) = counting_renderer();
    let doc = renderer
        .render(&records, "coverage", &ContentFill::PercentBar)
        .await
        .expect("render");
    assert_eq!(provider.calls(), 1);
    roxmltree::Document::parse(doc.as_str()).expect("well-formed");
}

#[tokio::test]
async fn color_scale_colors_values() {
    let records = vec![BadgeRecord::new("fast", 1.0), BadgeRecord::new("slow", 0.25)];
    let renderer = BadgeRenderer::deterministic().with_color_scale(ColorScale::new(1.0, 0.25));
    let doc = renderer
        .render(&records, "speed", &ContentFill::Text)
        .await
        .expect("render");
    assert!(doc.as_str().contains(r##"fill="#97ca00""##));
}

#[tokio::test]
async fn measurement_failures_surface_without_a_document() {
    let renderer = BadgeRenderer::with_provider(
        Arc::new(UnreachableProvider),
        MetricsCacheOptions::default(),
    );
    let err = renderer
        .render(&[BadgeRecord::new("a", 1.0)], "t", &ContentFill::Text)
        .await
        .expect_err("provider down");
    assert!(matches!(
        err.measurement(),
        Some(MeasurementError::Unreachable { .. })
    ));
}

#[tokio::test]
async fn engine_config_loads_from_json_and_persists_metrics() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let dir = tempfile::tempdir().expect("tempdir");
    let metrics = dir.path().join("text-sizes.json");
    let json = format!(
        r#"{{
            "layout": {{ "columnCount": 3, "columnPadding": 4 }},
            "svg": {{ "fontSize": 12, "fontUrls": [] }},
            "cache": {{ "correctionFactor": 1.0 }},
            "colorScale": {{ "domain": [1.0, 0.25] }},
            "metricsFile": {path}
        }}"#,
        path = serde_json::to_string(&metrics).expect("path json"),
    );
    let config = BadgeEngineConfig::from_json_str(&json).expect("config");
    assert_eq!(config.layout.column_count, 3);
    assert_eq!(config.layout.row_padding, 10.0);
    assert_eq!(config.cache.timeout_ms, 30_000);
    assert_eq!(config.provider.program, "phantomjs");

    let provider = Arc::new(CountingProvider::default());
    let renderer = BadgeRenderer::from_config_with_provider(&config, provider.clone())
        .await
        .expect("renderer");
    let doc = renderer
        .render(&sample_records(), "coverage", &ContentFill::Text)
        .await
        .expect("render");
    assert!(!doc.as_str().contains("@import"));
    assert!(doc.as_str().contains(r#"font-size="12""#));
    renderer.close().await.expect("close");
    assert!(metrics.exists());

    // A second renderer over the same file measures nothing.
    let provider = Arc::new(CountingProvider::default());
    let renderer = BadgeRenderer::from_config_with_provider(&config, provider.clone())
        .await
        .expect("reopen");
    renderer
        .render(&sample_records(), "coverage", &ContentFill::Text)
        .await
        .expect("render");
    assert_eq!(provider.calls(), 0);
}

#[test]
fn engine_config_rejects_invalid_layout() {
    let err = BadgeEngineConfig::from_json_str(r#"{ "layout": { "columnCount": 0 } }"#)
        .expect_err("zero columns");
    assert!(matches!(
        err,
        tagbadge::render::HeadlessError::Core(tagbadge::Error::InvalidLayout { .. })
    ));
}
