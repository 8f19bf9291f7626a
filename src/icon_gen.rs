use crate::error::RenderError;
use crate::manifest_json::{write_manifest, IconManifest};
use crate::render::{FontChain, IconRenderer, Palette};
use crate::stub::{HeaderEncoding, StubRenderer};
use serde::Serialize;
use std::{
    fs::create_dir_all,
    path::{Path, PathBuf},
};
use tracing::{info, warn};

/// Sizes generated when none are requested.
pub const DEFAULT_SIZES: [u32; 3] = [16, 48, 128];

/// Largest edge length accepted for an icon.
pub const MAX_ICON_SIZE: u32 = 4096;

/// Directory the icons are written to when none is requested.
pub const DEFAULT_OUTPUT_DIR: &str = "icons";

/// One square icon to produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconSpec {
    size: u32,
    output_path: PathBuf,
}

impl IconSpec {
    pub fn new(size: u32, output_path: impl Into<PathBuf>) -> Result<Self, RenderError> {
        if size == 0 {
            return Err(RenderError::InvalidSize);
        }
        if size > MAX_ICON_SIZE {
            return Err(RenderError::SizeTooLarge {
                size,
                max: MAX_ICON_SIZE,
            });
        }
        Ok(Self {
            size,
            output_path: output_path.into(),
        })
    }

    /// `<dir>/icon<size>.png`
    pub fn in_dir(dir: &Path, size: u32) -> Result<Self, RenderError> {
        Self::new(size, dir.join(format!("icon{size}.png")))
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }
}

/// Whether real icons can be drawn in this build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Available,
    Unavailable,
}

impl Capability {
    pub fn detect() -> Self {
        if cfg!(feature = "render") {
            Capability::Available
        } else {
            Capability::Unavailable
        }
    }

    pub fn is_available(self) -> bool {
        self == Capability::Available
    }
}

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub output_dir: PathBuf,
    pub sizes: Vec<u32>,
    pub capability: Capability,
    pub header_encoding: HeaderEncoding,
    pub palette: Palette,
    pub glyph: String,
    pub fonts: FontChain,
    pub write_manifest: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            sizes: DEFAULT_SIZES.to_vec(),
            capability: Capability::detect(),
            header_encoding: HeaderEncoding::default(),
            palette: Palette::default(),
            glyph: "抖".to_string(),
            fonts: FontChain::default(),
            write_manifest: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IconKind {
    /// A decodable PNG. `glyph_drawn` is false when the circle mark was used.
    Rendered { glyph_drawn: bool },
    /// The 29-byte stub.
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IconReport {
    pub size: u32,
    pub path: PathBuf,
    pub bytes_written: u64,
    pub kind: IconKind,
}

#[derive(Debug)]
pub struct IconOutcome {
    pub size: u32,
    pub path: PathBuf,
    pub result: Result<IconReport, RenderError>,
}

/// Result of one generator run, one outcome per requested size in order.
#[derive(Debug)]
pub struct BatchReport {
    pub renderer: &'static str,
    pub capability: Capability,
    pub outcomes: Vec<IconOutcome>,
    /// Set when `icons.json` was requested but could not be written.
    pub manifest_error: Option<RenderError>,
}

impl BatchReport {
    pub fn written(&self) -> impl Iterator<Item = &IconReport> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &IconOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    pub fn is_complete(&self) -> bool {
        self.failures().next().is_none() && self.manifest_error.is_none()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&BatchJson::from(self))
    }
}

#[derive(Serialize)]
struct BatchJson<'a> {
    renderer: &'static str,
    capability: Capability,
    icons: Vec<OutcomeJson<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    manifest_error: Option<String>,
}

#[derive(Serialize)]
struct OutcomeJson<'a> {
    size: u32,
    path: &'a Path,
    #[serde(skip_serializing_if = "Option::is_none")]
    written: Option<&'a IconReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<'a> From<&'a BatchReport> for BatchJson<'a> {
    fn from(report: &'a BatchReport) -> Self {
        let icons = report
            .outcomes
            .iter()
            .map(|o| OutcomeJson {
                size: o.size,
                path: &o.path,
                written: o.result.as_ref().ok(),
                error: o.result.as_ref().err().map(|e| e.to_string()),
            })
            .collect();
        Self {
            renderer: report.renderer,
            capability: report.capability,
            icons,
            manifest_error: report.manifest_error.as_ref().map(|e| e.to_string()),
        }
    }
}

/// Writes one icon per configured size with a renderer picked once from the
/// configured capability.
pub struct IconGenerator {
    config: GeneratorConfig,
    renderer: Box<dyn IconRenderer>,
}

impl IconGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        let renderer = select_renderer(&config);
        Self { config, renderer }
    }

    /// Use a custom renderer regardless of the configured capability.
    pub fn with_renderer(config: GeneratorConfig, renderer: Box<dyn IconRenderer>) -> Self {
        Self { config, renderer }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn renderer_name(&self) -> &'static str {
        self.renderer.name()
    }

    /// Generate every icon.
    ///
    /// Renderers that continue on error have their failures recorded in the
    /// report. For the others the first failure is returned.
    pub fn run(&self) -> Result<BatchReport, RenderError> {
        let out_dir = &self.config.output_dir;
        create_dir_all(out_dir).map_err(|err| RenderError::io(out_dir, err))?;

        if self.config.capability.is_available() {
            info!("Rendering icons into {}...", out_dir.display());
        } else {
            warn!("Image rendering is not available, writing placeholder icons");
            warn!("Rebuild with the `render` feature to get real icons");
        }

        let mut outcomes = Vec::with_capacity(self.config.sizes.len());
        for &size in &self.config.sizes {
            let path = out_dir.join(format!("icon{size}.png"));
            let result = IconSpec::new(size, &path).and_then(|spec| self.renderer.render(&spec));

            let result = match result {
                Err(err) if !self.renderer.continues_on_error() => return Err(err),
                result => result,
            };
            if let Err(err) = &result {
                warn!("Could not create {}: {err}", path.display());
            }

            outcomes.push(IconOutcome { size, path, result });
        }

        let mut report = BatchReport {
            renderer: self.renderer.name(),
            capability: self.config.capability,
            outcomes,
            manifest_error: None,
        };

        if self.config.write_manifest {
            let manifest = IconManifest::from_report(&report, out_dir);
            match write_manifest(out_dir, &manifest) {
                Err(err) if !self.renderer.continues_on_error() => return Err(err),
                Err(err) => {
                    warn!("Could not create manifest: {err}");
                    report.manifest_error = Some(err);
                }
                Ok(()) => {}
            }
        }

        let written = report.written().count();
        info!("Done: {written} of {} icons created", report.outcomes.len());

        Ok(report)
    }
}

fn select_renderer(config: &GeneratorConfig) -> Box<dyn IconRenderer> {
    match config.capability {
        #[cfg(feature = "render")]
        Capability::Available => Box::new(crate::render::RasterRenderer::new(
            config.palette,
            config.glyph.clone(),
            &config.fonts,
        )),
        #[cfg(not(feature = "render"))]
        Capability::Available => {
            warn!("Rendering requested but not compiled in, using placeholders");
            Box::new(StubRenderer::new(config.header_encoding))
        }
        Capability::Unavailable => Box::new(StubRenderer::new(config.header_encoding)),
    }
}

/// Build a generator for `config` and run it once.
pub fn generate_icons(config: GeneratorConfig) -> Result<BatchReport, RenderError> {
    IconGenerator::new(config).run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn stub_config(dir: &Path) -> GeneratorConfig {
        GeneratorConfig {
            output_dir: dir.join("icons"),
            capability: Capability::Unavailable,
            ..GeneratorConfig::default()
        }
    }

    #[test]
    fn test_zero_size_rejected() {
        assert!(matches!(
            IconSpec::new(0, "icon0.png"),
            Err(RenderError::InvalidSize)
        ));
    }

    #[test]
    fn test_oversized_rejected() {
        assert!(IconSpec::new(MAX_ICON_SIZE, "big.png").is_ok());
        assert!(matches!(
            IconSpec::new(100_000, "huge.png"),
            Err(RenderError::SizeTooLarge { size: 100_000, .. })
        ));
    }

    #[test]
    fn test_spec_in_dir() {
        let spec = IconSpec::in_dir(Path::new("icons"), 48).unwrap();
        assert_eq!(spec.size(), 48);
        assert_eq!(spec.output_path(), Path::new("icons/icon48.png"));
    }

    #[test]
    fn test_default_config() {
        let config = GeneratorConfig::default();
        assert_eq!(config.sizes, vec![16, 48, 128]);
        assert_eq!(config.output_dir, PathBuf::from("icons"));
        assert_eq!(config.header_encoding, HeaderEncoding::Legacy);
        assert!(!config.write_manifest);
    }

    #[test]
    fn test_unavailable_selects_placeholder() {
        let temp_dir = TempDir::new().unwrap();
        let generator = IconGenerator::new(stub_config(temp_dir.path()));
        assert_eq!(generator.renderer_name(), "placeholder");
    }

    #[test]
    fn test_zero_size_recorded_for_placeholder() {
        let temp_dir = TempDir::new().unwrap();
        let config = GeneratorConfig {
            sizes: vec![16, 0, 48],
            ..stub_config(temp_dir.path())
        };

        let report = generate_icons(config).unwrap();
        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(report.written().count(), 2);
        assert!(matches!(
            report.outcomes[1].result,
            Err(RenderError::InvalidSize)
        ));
        assert!(!report.is_complete());
    }

    struct FailingRenderer;

    impl IconRenderer for FailingRenderer {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn render(&self, spec: &IconSpec) -> Result<IconReport, RenderError> {
            Err(RenderError::io(
                spec.output_path(),
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            ))
        }
    }

    #[test]
    fn test_strict_renderer_aborts_batch() {
        let temp_dir = TempDir::new().unwrap();
        let generator =
            IconGenerator::with_renderer(stub_config(temp_dir.path()), Box::new(FailingRenderer));

        assert_eq!(generator.renderer_name(), "failing");
        assert_eq!(generator.config().sizes.len(), 3);
        assert!(matches!(generator.run(), Err(RenderError::Io { .. })));
    }

    #[test]
    fn test_manifest_failure_recorded_for_placeholder() {
        let temp_dir = TempDir::new().unwrap();
        let config = GeneratorConfig {
            write_manifest: true,
            ..stub_config(temp_dir.path())
        };
        std::fs::create_dir_all(config.output_dir.join("icons.json")).unwrap();

        let report = generate_icons(config).unwrap();

        assert_eq!(report.written().count(), 3);
        assert!(matches!(report.manifest_error, Some(RenderError::Io { .. })));
        assert!(!report.is_complete());

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert!(json["manifest_error"].as_str().unwrap().contains("icons.json"));
    }

    #[test]
    fn test_manifest_failure_aborts_strict_renderer() {
        struct OkRenderer;

        impl IconRenderer for OkRenderer {
            fn name(&self) -> &'static str {
                "ok"
            }

            fn render(&self, spec: &IconSpec) -> Result<IconReport, RenderError> {
                Ok(IconReport {
                    size: spec.size(),
                    path: spec.output_path().to_path_buf(),
                    bytes_written: 0,
                    kind: IconKind::Rendered { glyph_drawn: false },
                })
            }
        }

        let temp_dir = TempDir::new().unwrap();
        let config = GeneratorConfig {
            write_manifest: true,
            ..stub_config(temp_dir.path())
        };
        std::fs::create_dir_all(config.output_dir.join("icons.json")).unwrap();

        let generator = IconGenerator::with_renderer(config, Box::new(OkRenderer));
        assert!(matches!(generator.run(), Err(RenderError::Io { .. })));
    }

    #[test]
    fn test_report_json() {
        let temp_dir = TempDir::new().unwrap();
        let report = generate_icons(stub_config(temp_dir.path())).unwrap();

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["renderer"], "placeholder");
        assert_eq!(json["capability"], "unavailable");
        let icons = json["icons"].as_array().unwrap();
        assert_eq!(icons.len(), 3);
        assert_eq!(icons[0]["size"], 16);
        assert_eq!(icons[0]["written"]["bytes_written"], 29);
        assert_eq!(icons[0]["written"]["kind"]["type"], "placeholder");
    }
}
