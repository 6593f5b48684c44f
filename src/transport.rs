// The one seam between this crate and wherever its data lives.
// Visual: none; decides whether sections show live content or demo fixtures.
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

/// A `GET` for `path` (path plus optional query string).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    pub path: String,
    pub accept: &'static str,
}

impl Request {
    pub fn json(path: impl Into<String>) -> Self {
        Self { path: path.into(), accept: "application/json" }
    }

    pub fn bytes(path: impl Into<String>) -> Self {
        Self { path: path.into(), accept: "*/*" }
    }
}

#[derive(Clone, Debug)]
pub struct Response {
    pub status: u16,
    pub body: Vec<u8>,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body of a 2xx response; anything else becomes `Error::Transport`.
    pub fn into_body(self, path: &str) -> Result<Vec<u8>> {
        if self.is_success() {
            Ok(self.body)
        } else {
            Err(Error::Transport { path: path.to_string(), status: self.status })
        }
    }
}

/// Anything that can answer a `GET`. Shared across loader threads.
pub trait Transport: Send + Sync {
    fn get(&self, request: &Request) -> Result<Response>;
}

/// Serves paths out of a local directory, the way a static host would:
/// the query string is ignored, missing files are 404 and paths escaping
/// the root are 403.
#[derive(Clone, Debug)]
pub struct StaticDir {
    root: PathBuf,
}

impl StaticDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Option<PathBuf> {
        let path = path.split('?').next().unwrap_or_default();
        let relative = Path::new(path.trim_start_matches('/'));
        if relative.components().any(|c| !matches!(c, Component::Normal(_))) {
            return None;
        }
        Some(self.root.join(relative))
    }
}

impl Transport for StaticDir {
    fn get(&self, request: &Request) -> Result<Response> {
        let Some(file) = self.resolve(&request.path) else {
            return Ok(Response { status: 403, body: Vec::new() });
        };
        match std::fs::read(&file) {
            Ok(body) => Ok(Response { status: 200, body }),
            Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::IsADirectory) => {
                Ok(Response { status: 404, body: Vec::new() })
            }
            Err(source) => Err(Error::Io { path: file, source }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("outline-morph-{name}-{}", std::process::id()));
        std::fs::create_dir_all(dir.join("images")).unwrap();
        dir
    }

    #[test]
    fn serves_files_and_ignores_query() {
        let dir = scratch_dir("static-serve");
        std::fs::write(dir.join("images.txt"), "a.png\n").unwrap();

        let transport = StaticDir::new(&dir);
        let res = transport.get(&Request::bytes("/images.txt?t=1700000000")).unwrap();
        assert_eq!(res.status, 200);
        assert_eq!(res.body, b"a.png\n");

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn missing_is_404_and_escape_is_403() {
        let dir = scratch_dir("static-status");
        let transport = StaticDir::new(&dir);

        assert_eq!(transport.get(&Request::bytes("/nope.json")).unwrap().status, 404);
        assert_eq!(transport.get(&Request::bytes("/images")).unwrap().status, 404);
        assert_eq!(transport.get(&Request::bytes("/../etc/passwd")).unwrap().status, 403);

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn non_2xx_body_is_an_error() {
        let res = Response { status: 500, body: b"boom".to_vec() };
        assert!(matches!(res.into_body("/x"), Err(Error::Transport { status: 500, .. })));
    }
}
