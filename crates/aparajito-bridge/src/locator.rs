use std::fmt;
use std::path::Path;

use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocatorError {
    #[error("empty source locator")]
    Empty,
    #[error("relative path is not a playable source: {0}")]
    Relative(String),
    #[error("malformed source locator {0:?}: {1}")]
    Malformed(String, String),
}

/// A media source the backend can open: an absolute URL (`https://`,
/// `file://`, `content://`, `rtsp://` ...). Absolute filesystem paths are
/// accepted and stored as `file://` URLs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceLocator(Url);

impl SourceLocator {
    pub fn parse(raw: &str) -> Result<Self, LocatorError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(LocatorError::Empty);
        }

        let path = Path::new(raw);
        if path.is_absolute() {
            return Url::from_file_path(path)
                .map(Self)
                .map_err(|_| LocatorError::Malformed(raw.to_string(), "bad file path".into()));
        }

        match Url::parse(raw) {
            Ok(url) => Ok(Self(url)),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                Err(LocatorError::Relative(raw.to_string()))
            }
            Err(e) => Err(LocatorError::Malformed(raw.to_string(), e.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn scheme(&self) -> &str {
        self.0.scheme()
    }

    /// Filesystem path for `file://` sources.
    pub fn to_file_path(&self) -> Option<std::path::PathBuf> {
        if self.0.scheme() == "file" {
            self.0.to_file_path().ok()
        } else {
            None
        }
    }
}

impl fmt::Display for SourceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}
