//! Measurement-driven badge rendering.

pub use tagbadge_render::layout::{
    BOX_PADDING_X, BOX_PADDING_Y, BadgeGeometry, GridPosition, compute_layout,
};
pub use tagbadge_render::svg::{
    ContentFill, ContentFillStrategy, FillContext, SvgDocument, SvgRenderOptions,
    TITLE_TEXT_CLASS, TITLE_TEXT_SELECTOR, VALUE_TEXT_CLASS, VALUE_TEXT_SELECTOR,
    push_shadowed_text, render_badges_svg, render_probe_svg,
};
pub use tagbadge_render::text::{
    DeterministicTextMetricsProvider, FALLBACK_TEXT_SIZE, FixedTextMetricsProvider,
    InMemoryMetricsStore, JsonFileMetricsStore, MEASUREMENT_CORRECTION, MeasurementError,
    MetricsCache, MetricsCacheOptions, MetricsStore, ProcessProviderOptions,
    ProcessTextMetricsProvider, TextMetricsProvider,
};

#[cfg(feature = "usvg")]
pub mod font_metrics;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tagbadge_core::{BadgeRecord, ColorScale, LayoutConfig, TextSize};

#[derive(Debug, thiserror::Error)]
pub enum HeadlessError {
    #[error(transparent)]
    Core(#[from] tagbadge_core::Error),
    #[error(transparent)]
    Render(#[from] tagbadge_render::Error),
}

impl HeadlessError {
    pub fn is_empty_dataset(&self) -> bool {
        matches!(
            self,
            Self::Core(tagbadge_core::Error::EmptyDataset)
                | Self::Render(tagbadge_render::Error::Core(
                    tagbadge_core::Error::EmptyDataset
                ))
        )
    }

    pub fn measurement(&self) -> Option<&MeasurementError> {
        match self {
            Self::Render(tagbadge_render::Error::Measurement(e)) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, HeadlessError>;

/// Everything a [`BadgeRenderer`] needs, loadable from one JSON document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BadgeEngineConfig {
    pub layout: LayoutConfig,
    pub svg: SvgRenderOptions,
    pub cache: MetricsCacheOptions,
    pub provider: ProcessProviderOptions,
    pub color_scale: Option<ColorScale>,
    /// Forces the value box text width instead of measuring the first record.
    pub content_width: Option<f64>,
    /// Persist measurements in this JSON file; in-memory only when unset.
    pub metrics_file: Option<PathBuf>,
}

impl BadgeEngineConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text).map_err(tagbadge_core::Error::from)?;
        config.layout.validate()?;
        Ok(config)
    }

    /// Store selected by [`BadgeEngineConfig::metrics_file`].
    pub fn store(&self) -> Arc<dyn MetricsStore> {
        match &self.metrics_file {
            Some(path) => Arc::new(JsonFileMetricsStore::new(path)),
            None => Arc::new(InMemoryMetricsStore::new()),
        }
    }
}

/// Title/content text sizes that feed the layout, after correction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasuredText {
    pub title: TextSize,
    pub content: TextSize,
}

/// Runs the full pipeline: probe measurement, grid layout, SVG output.
///
/// Cheap to clone; clones share one metrics cache.
#[derive(Debug, Clone)]
pub struct BadgeRenderer {
    cache: Arc<MetricsCache>,
    pub layout: LayoutConfig,
    pub svg: SvgRenderOptions,
    pub color_scale: Option<ColorScale>,
    pub content_width: Option<f64>,
}

impl BadgeRenderer {
    pub fn new(cache: Arc<MetricsCache>) -> Self {
        Self {
            cache,
            layout: LayoutConfig::default(),
            svg: SvgRenderOptions::default(),
            color_scale: None,
            content_width: None,
        }
    }

    /// Renderer measuring with `provider` through a fresh in-memory cache.
    pub fn with_provider(
        provider: Arc<dyn TextMetricsProvider>,
        options: MetricsCacheOptions,
    ) -> Self {
        let store: Arc<dyn MetricsStore> = Arc::new(InMemoryMetricsStore::new());
        Self::new(Arc::new(MetricsCache::new(provider, store, options)))
    }

    /// Offline renderer: deterministic estimates, no correction.
    pub fn deterministic() -> Self {
        Self::with_provider(
            Arc::new(DeterministicTextMetricsProvider::default()),
            MetricsCacheOptions {
                correction_factor: 1.0,
                ..Default::default()
            },
        )
    }

    /// Renderer for when no measuring oracle is available: every text is laid out as
    /// [`FALLBACK_TEXT_SIZE`], uncorrected.
    pub fn fallback() -> Self {
        Self::with_provider(
            Arc::new(FixedTextMetricsProvider::default()),
            MetricsCacheOptions {
                correction_factor: 1.0,
                ..Default::default()
            },
        )
    }

    /// Builds a renderer backed by the headless-browser provider described by `config`, opening
    /// the configured store.
    pub async fn from_config(config: &BadgeEngineConfig) -> Result<Self> {
        let provider: Arc<dyn TextMetricsProvider> =
            Arc::new(ProcessTextMetricsProvider::new(config.provider.clone()));
        Self::from_config_with_provider(config, provider).await
    }

    pub async fn from_config_with_provider(
        config: &BadgeEngineConfig,
        provider: Arc<dyn TextMetricsProvider>,
    ) -> Result<Self> {
        config.layout.validate()?;
        let cache = MetricsCache::open(provider, config.store(), config.cache.clone()).await?;
        Ok(Self {
            cache: Arc::new(cache),
            layout: config.layout,
            svg: config.svg.clone(),
            color_scale: config.color_scale,
            content_width: config.content_width,
        })
    }

    pub fn with_layout(mut self, layout: LayoutConfig) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_svg_options(mut self, svg: SvgRenderOptions) -> Self {
        self.svg = svg;
        self
    }

    pub fn with_color_scale(mut self, color_scale: ColorScale) -> Self {
        self.color_scale = Some(color_scale);
        self
    }

    pub fn with_content_width(mut self, width: f64) -> Self {
        self.content_width = Some(width);
        self
    }

    pub fn cache(&self) -> &Arc<MetricsCache> {
        &self.cache
    }

    /// Corrected size of `text` when rendered with `class` and the configured font.
    pub async fn measure_text(&self, text: &str, class: &str) -> Result<TextSize> {
        let probe = render_probe_svg(text, class, &self.svg);
        Ok(self.cache.measure(&probe, &format!(".{class}")).await?)
    }

    /// Measures the title and the first record's value probe.
    ///
    /// The value probe is skipped when a content width is forced, either by the renderer or by
    /// `fill`. Content height always follows the title.
    pub async fn measure(
        &self,
        records: &[BadgeRecord],
        title: &str,
        fill: &ContentFill,
    ) -> Result<MeasuredText> {
        let first = records.first().ok_or(tagbadge_core::Error::EmptyDataset)?;

        let forced_width = self.content_width.or_else(|| fill.content_width());
        let (title_size, content_width) = match forced_width {
            Some(width) => (self.measure_text(title, TITLE_TEXT_CLASS).await?, width),
            None => {
                let value_text = fill.probe_text(first);
                let (title_size, value_size) = futures::try_join!(
                    self.measure_text(title, TITLE_TEXT_CLASS),
                    self.measure_text(&value_text, VALUE_TEXT_CLASS),
                )?;
                (title_size, value_size.width)
            }
        };

        Ok(MeasuredText {
            title: title_size,
            content: TextSize::new(content_width, title_size.height),
        })
    }

    pub async fn layout(
        &self,
        records: &[BadgeRecord],
        title: &str,
        fill: &ContentFill,
    ) -> Result<BadgeGeometry> {
        let measured = self.measure(records, title, fill).await?;
        Ok(compute_layout(
            measured.title,
            measured.content,
            records.len(),
            &self.layout,
        )?)
    }

    /// Renders `records` as one badge wall. Fails before measuring anything when `records` is
    /// empty.
    #[tracing::instrument(level = "debug", skip(self, records, fill), fields(records = records.len()))]
    pub async fn render(
        &self,
        records: &[BadgeRecord],
        title: &str,
        fill: &ContentFill,
    ) -> Result<SvgDocument> {
        if records.is_empty() {
            return Err(tagbadge_core::Error::EmptyDataset.into());
        }
        let geometry = self.layout(records, title, fill).await?;
        Ok(render_badges_svg(
            records,
            title,
            &geometry,
            self.color_scale.as_ref(),
            fill,
            &self.svg,
        )?)
    }

    /// [`BadgeRenderer::render`] over a JSON record list.
    pub async fn render_json(
        &self,
        records_json: &str,
        title: &str,
        fill: &ContentFill,
    ) -> Result<SvgDocument> {
        let records = BadgeRecord::list_from_json_str(records_json)?;
        self.render(&records, title, fill).await
    }

    /// Flushes the metrics store.
    pub async fn close(&self) -> Result<()> {
        Ok(self.cache.close().await?)
    }
}
