//! Static file serving for [`Router::static_files`](crate::Router::static_files).

use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::error::Error;
use crate::response::Response;

/// Serves `rel` (the decoded wildcard remainder) from `dir`.
///
/// An empty remainder or a directory serves its `index.html`.
pub(crate) async fn serve(dir: &Path, rel: &str) -> Result<Response, Error> {
    let mut path = resolve(dir, rel).ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))?;

    if tokio::fs::metadata(&path).await?.is_dir() {
        path.push("index.html");
    }
    debug!(path = %path.display(), "serving static file");
    Response::file(path).await
}

/// Joins `rel` onto `dir`, refusing anything that would leave `dir`.
fn resolve(dir: &Path, rel: &str) -> Option<PathBuf> {
    let mut out = dir.to_path_buf();
    for component in Path::new(rel).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(out)
}
