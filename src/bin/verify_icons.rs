use anyhow::{Context, Result};
use ext_icon_gen::stub::stub_width;
use image::io::Reader as ImageReader;
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    let dir = std::env::args().nth(1).unwrap_or_else(|| "icons".to_string());

    let mut icons: Vec<PathBuf> = std::fs::read_dir(&dir)
        .with_context(|| format!("Failed to read {dir}"))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| is_icon_file(path))
        .collect();
    icons.sort();

    println!("Checking {} icons in: {}", icons.len(), dir);

    let mut bad = 0;
    for path in &icons {
        let (ok, line) = check_icon(path);
        if !ok {
            bad += 1;
        }
        println!("{line}");
    }

    if bad == 0 {
        println!("✓ All icons decode");
    } else {
        println!("⚠ {bad} icon(s) need a real render");
    }

    Ok(())
}

fn is_icon_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.starts_with("icon") && name.ends_with(".png")
}

/// Status line for one icon and whether it decoded as a square image.
fn check_icon(path: &Path) -> (bool, String) {
    let decoded = ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(image::ImageError::from)
        .and_then(|reader| reader.decode());

    match decoded {
        Ok(img) if img.width() == img.height() => (
            true,
            format!("  ✓ {}: {}x{}", path.display(), img.width(), img.height()),
        ),
        Ok(img) => (
            false,
            format!(
                "  ⚠ {}: {}x{} is not square",
                path.display(),
                img.width(),
                img.height()
            ),
        ),
        Err(err) => {
            let line = match std::fs::read(path).map(|bytes| stub_width(&bytes)) {
                Ok(Some(width)) => format!(
                    "  ⚠ {}: placeholder header claiming {}px, not decodable",
                    path.display(),
                    width
                ),
                Ok(None) => format!("  ⚠ {}: not decodable ({err})", path.display()),
                Err(read_err) => format!("  ⚠ {}: cannot read ({read_err})", path.display()),
            };
            (false, line)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ext_icon_gen::stub::{stub_bytes, HeaderEncoding};
    use tempfile::TempDir;

    #[test]
    fn test_placeholder_reported() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("icon48.png");
        std::fs::write(&path, stub_bytes(48, HeaderEncoding::Legacy)).unwrap();

        let (ok, line) = check_icon(&path);
        assert!(!ok);
        assert!(line.contains("claiming 48px"), "{line}");
    }

    #[test]
    fn test_unreadable_icon_reports_read_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("icon16.png");
        std::fs::create_dir(&path).unwrap();

        let (ok, line) = check_icon(&path);
        assert!(!ok);
        assert!(line.contains("cannot read"), "{line}");
    }

    #[test]
    fn test_real_icon_passes() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("icon16.png");
        image::RgbaImage::new(16, 16).save(&path).unwrap();

        let (ok, line) = check_icon(&path);
        assert!(ok, "{line}");
        assert!(line.contains("16x16"));
    }

    #[test]
    fn test_is_icon_file() {
        assert!(is_icon_file(Path::new("icons/icon128.png")));
        assert!(!is_icon_file(Path::new("icons/icons.json")));
        assert!(!is_icon_file(Path::new("icons/logo.png")));
    }
}
