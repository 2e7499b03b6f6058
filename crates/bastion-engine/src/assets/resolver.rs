use serde::{Deserialize, Serialize};

/// Where logical asset paths are served from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AssetRoot {
    /// Web serving: `base_url` + `/` + path. An empty base yields root-relative URLs.
    Web { base_url: String },
    /// Desktop packaging: `file://` + `dir` + `/` + path.
    File { dir: String },
}

impl Default for AssetRoot {
    fn default() -> Self {
        AssetRoot::File { dir: "assets".to_string() }
    }
}

/// Maps logical asset paths to fetchable URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetResolver {
    root: AssetRoot,
}

impl AssetResolver {
    pub fn new(root: AssetRoot) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &AssetRoot {
        &self.root
    }

    /// Resolves an already-cleaned logical path (no leading slash).
    pub fn resolve(&self, logical: &str) -> String {
        let logical = logical.trim_start_matches('/');
        match &self.root {
            AssetRoot::Web { base_url } => {
                let base = base_url.trim_end_matches('/');
                format!("{base}/{logical}")
            }
            AssetRoot::File { dir } => {
                let dir = dir.trim_end_matches('/');
                if dir.is_empty() {
                    format!("file:///{logical}")
                } else {
                    format!("file://{dir}/{logical}")
                }
            }
        }
    }
}

/// Normalizes a raw asset reference into the cache key / fetch URL.
///
/// - anything with a URL scheme (`scheme://…`, `data:`) passes through untouched
/// - a leading `/` is relative to the asset root
/// - everything else is joined with `base_dir` first
///
/// `.` and empty segments are dropped and `..` pops the previous segment, so
/// equivalent spellings map to one key.
pub fn normalize_path(raw: &str, base_dir: Option<&str>, resolver: &AssetResolver) -> String {
    let raw = raw.trim();
    if has_scheme(raw) {
        return raw.to_string();
    }

    let logical = match raw.strip_prefix('/') {
        Some(rooted) => clean_segments(rooted),
        None => match base_dir {
            Some(base) if !base.is_empty() => clean_segments(&format!("{base}/{raw}")),
            _ => clean_segments(raw),
        },
    };

    resolver.resolve(&logical)
}

fn has_scheme(s: &str) -> bool {
    if s.starts_with("data:") || s.starts_with("blob:") {
        return true;
    }
    match s.find("://") {
        Some(idx) if idx > 0 => s[..idx]
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')),
        _ => false,
    }
}

fn clean_segments(path: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for seg in path.split(['/', '\\']) {
        match seg {
            "" | "." => {}
            ".." => {
                out.pop();
            }
            s => out.push(s),
        }
    }
    out.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn web() -> AssetResolver {
        AssetResolver::new(AssetRoot::Web { base_url: "https://cdn.example/game/".into() })
    }

    #[test]
    fn absolute_url_passes_through() {
        let url = "https://other.example/a/../b.png";
        assert_eq!(normalize_path(url, Some("images"), &web()), url);
        assert_eq!(normalize_path("data:image/png;base64,AAAA", None, &web()), "data:image/png;base64,AAAA");
    }

    #[test]
    fn leading_slash_ignores_base_dir() {
        assert_eq!(
            normalize_path("/images/a.png", Some("sprites"), &web()),
            "https://cdn.example/game/images/a.png"
        );
    }

    #[test]
    fn relative_joins_base_dir() {
        assert_eq!(
            normalize_path("a.png", Some("images/sprites"), &web()),
            "https://cdn.example/game/images/sprites/a.png"
        );
    }

    #[test]
    fn equivalent_spellings_share_a_key() {
        let r = web();
        let a = normalize_path("images/sprites/fireball.png", None, &r);
        let b = normalize_path("/images/./sprites//fireball.png", None, &r);
        let c = normalize_path("../sprites/fireball.png", Some("images/tiles"), &r);
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn file_root_builds_file_url() {
        let r = AssetResolver::new(AssetRoot::File { dir: "/opt/bastion/assets".into() });
        assert_eq!(normalize_path("maps/m1.png", None, &r), "file:///opt/bastion/assets/maps/m1.png");
    }

    #[test]
    fn colon_in_relative_path_is_not_a_scheme() {
        assert!(!has_scheme("images/a:b.png"));
        assert!(!has_scheme("://x"));
    }
}
