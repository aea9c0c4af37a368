//! Image asset resolution and the media side store.
//!
//! All binary assets live under `<base_dir>/media/`. References come
//! in three shapes: remote URLs (downloaded once, cached under a
//! URL-derived name), bare filenames that should be normalized to the
//! `media/<name>` form, and direct relative/absolute paths. Resolution
//! never raises past this boundary — an unresolvable reference is
//! `None` and the caller degrades to a placeholder.

use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Recognized raster image extensions (lowercase, with dot).
const IMAGE_EXTS: &[&str] = &[".png", ".jpg", ".jpeg", ".gif", ".bmp", ".webp"];

/// Markdown image reference: captures the path of `![alt](path)`.
static IMG_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[[^\]]*\]\(([^)\s]+)\)").expect("valid regex"));

/// Resolves image references against one output directory.
///
/// Remote downloads are memoized by a stable hash of the URL: the same
/// URL always maps to the same `media/` file, and an already-cached
/// file is returned without touching the network. Nothing negative is
/// cached — a failed fetch resolves to `None` for this call and a
/// later call will retry.
pub struct AssetResolver {
    base_dir: PathBuf,
    downloads: Cell<usize>,
}

impl AssetResolver {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            downloads: Cell::new(0),
        }
    }

    /// The media side store for this output directory.
    #[inline]
    pub fn media_dir(&self) -> PathBuf {
        self.base_dir.join("media")
    }

    /// Number of network fetches performed so far (cache hits excluded).
    #[inline]
    pub fn download_count(&self) -> usize {
        self.downloads.get()
    }

    /// Resolve an image reference to a local file.
    ///
    /// - `http(s)://` URLs download into the media store (cached).
    /// - A bare filename with an image extension is looked up in the
    ///   media store.
    /// - Anything else is checked as given, then relative to the base
    ///   directory; first hit wins.
    pub fn resolve(&self, reference: &str) -> Option<PathBuf> {
        if is_remote(reference) {
            return self.resolve_remote(reference);
        }

        if is_bare_media_candidate(reference) {
            let candidate = self.media_dir().join(reference);
            if candidate.is_file() {
                return Some(candidate);
            }
        }

        let direct = Path::new(reference);
        if direct.is_file() {
            return Some(direct.to_path_buf());
        }
        let relative = self.base_dir.join(reference);
        if relative.is_file() {
            return Some(relative);
        }

        None
    }

    /// Resolve a remote URL through the download cache.
    fn resolve_remote(&self, url: &str) -> Option<PathBuf> {
        let target = self.media_dir().join(cached_name(url));
        if target.is_file() {
            return Some(target);
        }

        let bytes = self.fetch(url)?;
        if let Err(e) = fs::create_dir_all(self.media_dir()) {
            log::warn!("failed to create media directory: {e}");
            return None;
        }
        if let Err(e) = fs::write(&target, bytes) {
            log::warn!("failed to write downloaded asset {}: {e}", target.display());
            return None;
        }
        Some(target)
    }

    /// Single blocking fetch with bounded timeouts; no retries.
    fn fetch(&self, url: &str) -> Option<Vec<u8>> {
        let client = match reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(15))
            .connect_timeout(Duration::from_secs(10))
            .build()
        {
            Ok(c) => c,
            Err(e) => {
                log::warn!("failed to build HTTP client: {e}");
                return None;
            }
        };

        self.downloads.set(self.downloads.get() + 1);
        match client.get(url).send() {
            Ok(response) if response.status().is_success() => match response.bytes() {
                Ok(bytes) => Some(bytes.to_vec()),
                Err(e) => {
                    log::warn!("failed to read bytes from {url}: {e}");
                    None
                }
            },
            Ok(response) => {
                log::warn!("HTTP error {} fetching {url}", response.status());
                None
            }
            Err(e) => {
                log::warn!("failed to fetch {url}: {e}");
                None
            }
        }
    }

    /// Normalize every image reference in a Markdown document.
    ///
    /// Bare filenames that exist in the media store are rewritten to
    /// the `media/<name>` form; remote URLs are downloaded and
    /// rewritten to their cached `media/` path. References that cannot
    /// be normalized are left untouched.
    pub fn normalize_markdown(&self, content: &str) -> String {
        let matches: Vec<(std::ops::Range<usize>, String)> = IMG_REF
            .captures_iter(content)
            .filter_map(|caps| {
                let m = caps.get(1)?;
                let replacement = self.normalized_reference(m.as_str())?;
                Some((m.range(), replacement))
            })
            .collect();

        // Replace back-to-front so earlier ranges stay valid.
        let mut result = content.to_string();
        for (range, replacement) in matches.into_iter().rev() {
            result.replace_range(range, &replacement);
        }
        result
    }

    /// The `media/<name>` rewrite for one reference, if one applies.
    fn normalized_reference(&self, reference: &str) -> Option<String> {
        if is_remote(reference) {
            let local = self.resolve_remote(reference)?;
            return Some(format!("media/{}", local.file_name()?.to_string_lossy()));
        }
        if is_bare_media_candidate(reference) && self.media_dir().join(reference).is_file() {
            return Some(format!("media/{reference}"));
        }
        None
    }
}

#[inline]
fn is_remote(reference: &str) -> bool {
    reference.starts_with("http://") || reference.starts_with("https://")
}

/// A bare filename (no directory separator, not already `media/`-
/// prefixed) with a recognized image extension.
fn is_bare_media_candidate(reference: &str) -> bool {
    if reference.contains('/') || reference.contains('\\') {
        return false;
    }
    has_image_ext(reference)
}

fn has_image_ext(reference: &str) -> bool {
    let lower = reference.to_lowercase();
    IMAGE_EXTS.iter().any(|ext| lower.ends_with(ext))
}

/// Cache filename for a URL: 16 hex chars of its SHA-256, plus the
/// URL path's extension when it looks like an image (default `.png`).
fn cached_name(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    let mut hash = String::with_capacity(16);
    for byte in &digest[..8] {
        hash.push_str(&format!("{byte:02x}"));
    }
    format!("{hash}{}", extension_from_url(url))
}

fn extension_from_url(url: &str) -> &'static str {
    // Strip query/fragment before looking at the path extension.
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let lower = path.to_lowercase();
    IMAGE_EXTS
        .iter()
        .find(|ext| lower.ends_with(*ext))
        .copied()
        .unwrap_or(".png")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn resolver_with_media(files: &[&str]) -> (TempDir, AssetResolver) {
        let dir = TempDir::new().unwrap();
        let media = dir.path().join("media");
        fs::create_dir_all(&media).unwrap();
        for name in files {
            fs::write(media.join(name), b"png-bytes").unwrap();
        }
        let resolver = AssetResolver::new(dir.path());
        (dir, resolver)
    }

    #[test]
    fn test_bare_filename_resolves_into_media() {
        let (_dir, resolver) = resolver_with_media(&["logo.png"]);
        let resolved = resolver.resolve("logo.png").unwrap();
        assert!(resolved.ends_with("media/logo.png"));
    }

    #[test]
    fn test_media_prefixed_reference_resolves_relative_to_base() {
        let (_dir, resolver) = resolver_with_media(&["logo.png"]);
        let resolved = resolver.resolve("media/logo.png").unwrap();
        assert!(resolved.is_file());
    }

    #[test]
    fn test_missing_reference_is_none_not_error() {
        let (_dir, resolver) = resolver_with_media(&[]);
        assert!(resolver.resolve("nope.png").is_none());
        assert!(resolver.resolve("sub/dir/nope.png").is_none());
    }

    #[test]
    fn test_cached_url_skips_network() {
        let (_dir, resolver) = resolver_with_media(&[]);
        let url = "https://example.invalid/pics/chart.png";
        fs::create_dir_all(resolver.media_dir()).unwrap();
        let cached = resolver.media_dir().join(cached_name(url));
        fs::write(&cached, b"cached").unwrap();

        let first = resolver.resolve(url).unwrap();
        let second = resolver.resolve(url).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, cached);
        assert_eq!(resolver.download_count(), 0);
    }

    #[test]
    fn test_unreachable_url_resolves_to_none() {
        let (_dir, resolver) = resolver_with_media(&[]);
        // .invalid never resolves, so the single fetch attempt fails fast.
        assert!(resolver.resolve("https://example.invalid/x.png").is_none());
        assert_eq!(resolver.download_count(), 1);
    }

    #[test]
    fn test_cached_name_stability_and_extension() {
        let a = cached_name("https://example.com/a/b/photo.JPG?s=1");
        let b = cached_name("https://example.com/a/b/photo.JPG?s=1");
        assert_eq!(a, b);
        assert!(a.ends_with(".jpg"));
        assert_eq!(cached_name("https://example.com/asset"), {
            let mut h = cached_name("https://example.com/asset");
            h.truncate(16);
            format!("{h}.png")
        });
    }

    #[test]
    fn test_normalize_rewrites_bare_media_filenames() {
        let (_dir, resolver) = resolver_with_media(&["plot.png"]);
        let md = "intro\n\n![plot](plot.png)\n\n![far](elsewhere/x.png)";
        let normalized = resolver.normalize_markdown(md);
        assert!(normalized.contains("![plot](media/plot.png)"));
        // Paths with separators are left alone.
        assert!(normalized.contains("![far](elsewhere/x.png)"));
    }

    #[test]
    fn test_normalize_leaves_already_prefixed_references() {
        let (_dir, resolver) = resolver_with_media(&["plot.png"]);
        let md = "![plot](media/plot.png)";
        assert_eq!(resolver.normalize_markdown(md), md);
    }

    #[test]
    fn test_normalize_rewrites_cached_remote_url() {
        let (_dir, resolver) = resolver_with_media(&[]);
        let url = "https://example.invalid/chart.png";
        fs::create_dir_all(resolver.media_dir()).unwrap();
        let cached = cached_name(url);
        fs::write(resolver.media_dir().join(&cached), b"img").unwrap();

        let normalized = resolver.normalize_markdown(&format!("![c]({url})"));
        assert_eq!(normalized, format!("![c](media/{cached})"));
        assert_eq!(resolver.download_count(), 0);
    }
}
