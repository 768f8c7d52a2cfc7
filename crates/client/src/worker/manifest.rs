//! Bootstrap manifest: the fixed list of resources cached at install.

use greenmap_core::{AppConfig, Error};
use reqwest::Url;

use crate::fetch::{FetchRequest, canonicalize, resolve};

/// Resolved, de-duplicated manifest entries in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapManifest {
    entries: Vec<Url>,
}

impl BootstrapManifest {
    /// Resolve every path against `origin`.
    ///
    /// Later duplicates of an already-resolved URL are dropped.
    pub fn resolve<S: AsRef<str>>(origin: &Url, paths: &[S]) -> Result<Self, Error> {
        let mut entries: Vec<Url> = Vec::with_capacity(paths.len());
        for path in paths {
            let url = resolve(origin, path.as_ref())?;
            if !entries.contains(&url) {
                entries.push(url);
            }
        }
        Ok(Self { entries })
    }

    /// Build from the configured origin and manifest paths.
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = canonicalize(&config.origin)?;
        Self::resolve(&origin, &config.manifest)
    }

    pub fn entries(&self) -> &[Url] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// GET requests for every entry.
    pub fn requests(&self) -> impl Iterator<Item = FetchRequest> + '_ {
        self.entries.iter().cloned().map(FetchRequest::get)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_default_config() {
        let manifest = BootstrapManifest::from_config(&AppConfig::default()).unwrap();
        let urls: Vec<&str> = manifest.entries().iter().map(Url::as_str).collect();
        assert_eq!(
            urls,
            vec![
                "http://localhost:3000/",
                "http://localhost:3000/index.html",
                "http://localhost:3000/manifest.json",
                "http://localhost:3000/logo192.png",
            ]
        );
    }

    #[test]
    fn test_duplicates_dropped() {
        let origin = canonicalize("http://localhost:3000").unwrap();
        let manifest = BootstrapManifest::resolve(&origin, &["/", "/index.html", "/"]).unwrap();
        assert_eq!(manifest.len(), 2);
    }

    #[test]
    fn test_requests_are_gets() {
        let origin = canonicalize("http://localhost:3000").unwrap();
        let manifest = BootstrapManifest::resolve(&origin, &["/", "/index.html"]).unwrap();
        let requests: Vec<FetchRequest> = manifest.requests().collect();
        assert_eq!(requests.len(), 2);
        assert!(requests.iter().all(FetchRequest::is_cacheable));
    }

    #[test]
    fn test_invalid_origin() {
        let config = AppConfig { origin: "ftp://example.com".into(), ..Default::default() };
        assert!(matches!(BootstrapManifest::from_config(&config), Err(Error::InvalidUrl(_))));
    }
}
