use super::{MeasurementError, TextMetricsProvider};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use tagbadge_core::TextSize;
use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};

const SIZE_MARKER_OPEN: &str = "{{ Text Size:";
const SIZE_MARKER_CLOSE: &str = "}}";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProcessProviderOptions {
    /// Headless browser REPL that reads a script from stdin (PhantomJS-compatible).
    pub program: String,
    pub args: Vec<String>,
}

impl Default for ProcessProviderOptions {
    fn default() -> Self {
        Self {
            program: "phantomjs".to_string(),
            args: Vec::new(),
        }
    }
}

/// Measures by loading the markup into a headless browser and reading `getBBox()` of the
/// selected element.
///
/// One child process per measurement; the child is killed if the measuring future is dropped
/// (for example by the cache timeout).
#[derive(Debug, Clone, Default)]
pub struct ProcessTextMetricsProvider {
    options: ProcessProviderOptions,
}

impl ProcessTextMetricsProvider {
    pub fn new(options: ProcessProviderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ProcessProviderOptions {
        &self.options
    }
}

/// Escapes `text` for a single-quoted JS string literal.
///
/// Single quotes in SVG markup become double quotes so attribute values keep working.
fn js_single_quoted(text: &str, swap_quotes: bool) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    for ch in text.chars() {
        match ch {
            '\'' if swap_quotes => out.push('"'),
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c => out.push(c),
        }
    }
    out
}

/// Script fed to the browser REPL. It prints a `{{ Text Size: w,h }}` line and exits; the
/// trailing newline makes the REPL evaluate it.
pub(crate) fn measurement_script(markup: &str, selector: &str) -> String {
    format!(
        "var page = require('webpage').create();\
         page.content = '{markup}';\
         var size = page.evaluate(function() {{\
             var bBox = document.querySelector('{selector}').getBBox();\
             return bBox.width + ',' + bBox.height;\
         }});\
         console.log('{SIZE_MARKER_OPEN}', size, '{SIZE_MARKER_CLOSE}');\
         phantom.exit()\n",
        markup = js_single_quoted(markup, true),
        selector = js_single_quoted(selector, false),
    )
}

/// Extracts `w,h` from the first `{{ Text Size: w,h }}` marker in the REPL output.
pub fn parse_text_size_output(output: &str) -> std::result::Result<TextSize, MeasurementError> {
    let bad = || MeasurementError::unparseable(output.trim());
    let start = output.find(SIZE_MARKER_OPEN).ok_or_else(bad)? + SIZE_MARKER_OPEN.len();
    let rest = &output[start..];
    let end = rest.find(SIZE_MARKER_CLOSE).ok_or_else(bad)?;
    let mut parts = rest[..end].trim().split(',');
    let mut next = || -> Option<f64> {
        parts
            .next()?
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0)
    };
    let width = next().ok_or_else(bad)?;
    let height = next().ok_or_else(bad)?;
    if parts.next().is_some() {
        return Err(bad());
    }
    Ok(TextSize::new(width, height))
}

#[async_trait]
impl TextMetricsProvider for ProcessTextMetricsProvider {
    async fn measure_raw(
        &self,
        markup: &str,
        selector: &str,
    ) -> std::result::Result<TextSize, MeasurementError> {
        let program = &self.options.program;
        let mut child = tokio::process::Command::new(program)
            .args(&self.options.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| MeasurementError::unreachable(format!("spawn {program}: {e}")))?;

        let script = measurement_script(markup, selector);
        {
            let mut stdin = child
                .stdin
                .take()
                .ok_or_else(|| MeasurementError::unreachable("child stdin unavailable"))?;
            stdin
                .write_all(script.as_bytes())
                .await
                .map_err(|e| MeasurementError::unreachable(format!("write script: {e}")))?;
        }

        let mut output = String::new();
        if let Some(mut stdout) = child.stdout.take() {
            stdout
                .read_to_string(&mut output)
                .await
                .map_err(|e| MeasurementError::unreachable(format!("read output: {e}")))?;
        }
        let status = child
            .wait()
            .await
            .map_err(|e| MeasurementError::unreachable(format!("wait {program}: {e}")))?;
        if !status.success() && !output.contains(SIZE_MARKER_OPEN) {
            return Err(MeasurementError::unreachable(format!(
                "{program} exited with {status}"
            )));
        }

        parse_text_size_output(&output)
    }
}
