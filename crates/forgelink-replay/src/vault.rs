//! The local replay vault: paged loading of a replay directory.
//!
//! Every file on a page parses independently on the blocking pool. A file
//! that fails to parse is moved to the quarantine directory (never
//! deleted) and reported alongside the surviving entries; one bad file
//! never aborts the batch.

use std::io;
use std::path::{Path, PathBuf};

use futures_util::future;

use crate::container::{LoadedReplay, read_replay_file};
use crate::error::ReplayError;
use crate::metadata::ReplayMetadata;

/// A replay directory plus the quarantine directory for corrupt files.
#[derive(Debug, Clone)]
pub struct ReplayVault {
    replays_dir: PathBuf,
    quarantine_dir: PathBuf,
}

/// One successfully parsed local replay.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalReplay {
    pub path: PathBuf,
    /// `None` for the legacy `.scfareplay` container.
    pub metadata: Option<ReplayMetadata>,
}

/// One corrupt file and where it was moved.
#[derive(Debug)]
pub struct QuarantinedReplay {
    /// Original path inside the replay directory.
    pub path: PathBuf,
    /// Where the file lives now; `None` when the move itself failed.
    pub moved_to: Option<PathBuf>,
    pub error: ReplayError,
}

/// One page of the local vault listing.
#[derive(Debug, Default)]
pub struct ReplayPage {
    pub replays: Vec<LocalReplay>,
    pub quarantined: Vec<QuarantinedReplay>,
    /// Total pages in the directory at this page size.
    pub page_count: usize,
}

impl ReplayVault {
    pub fn new(replays_dir: impl Into<PathBuf>, quarantine_dir: impl Into<PathBuf>) -> Self {
        Self {
            replays_dir: replays_dir.into(),
            quarantine_dir: quarantine_dir.into(),
        }
    }

    pub fn replays_dir(&self) -> &Path {
        &self.replays_dir
    }

    pub fn quarantine_dir(&self) -> &Path {
        &self.quarantine_dir
    }

    /// Loads one page of the replay directory, `page` starting at 1.
    ///
    /// The directory listing is sorted by file name, so pages are stable
    /// as long as the directory does not change. Files on the page parse
    /// concurrently; corrupt ones are quarantined and listed in
    /// [`ReplayPage::quarantined`].
    pub async fn load_local_page(
        &self,
        page_size: usize,
        page: usize,
    ) -> Result<ReplayPage, ReplayError> {
        if page_size == 0 || page == 0 {
            return Err(ReplayError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                "page size and page number start at 1",
            )));
        }

        let dir = self.replays_dir.clone();
        let files = tokio::task::spawn_blocking(move || list_replay_files(&dir))
            .await
            .map_err(|e| ReplayError::Io(io::Error::other(e)))??;

        let page_count = files.len().div_ceil(page_size);
        let start = (page - 1) * page_size;
        let slice: Vec<PathBuf> = files.into_iter().skip(start).take(page_size).collect();
        tracing::debug!(
            dir = %self.replays_dir.display(),
            page,
            files = slice.len(),
            "loading local replay page"
        );

        let parses = slice.into_iter().map(|path| {
            tokio::task::spawn_blocking(move || {
                let result = read_replay_file(&path);
                (path, result)
            })
        });

        let mut page_result = ReplayPage {
            page_count,
            ..ReplayPage::default()
        };
        for joined in future::join_all(parses).await {
            let (path, result) = joined.map_err(|e| ReplayError::Io(io::Error::other(e)))?;
            match result {
                Ok(LoadedReplay { metadata, .. }) => {
                    page_result.replays.push(LocalReplay { path, metadata });
                }
                Err(error) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %error,
                        "corrupt replay, quarantining"
                    );
                    let moved_to = self.quarantine(&path).await;
                    page_result.quarantined.push(QuarantinedReplay {
                        path,
                        moved_to,
                        error,
                    });
                }
            }
        }
        Ok(page_result)
    }

    /// Moves a corrupt file into the quarantine directory. Best effort:
    /// a failed move leaves the file in place and returns `None`.
    async fn quarantine(&self, path: &Path) -> Option<PathBuf> {
        let file_name = path.file_name()?;
        let target = self.quarantine_dir.join(file_name);
        let source = path.to_path_buf();
        let quarantine_dir = self.quarantine_dir.clone();

        let moved = tokio::task::spawn_blocking(move || {
            std::fs::create_dir_all(&quarantine_dir)?;
            std::fs::rename(&source, &target)?;
            Ok::<PathBuf, io::Error>(target)
        })
        .await;

        match moved {
            Ok(Ok(target)) => Some(target),
            Ok(Err(e)) => {
                tracing::warn!(path = %path.display(), error = %e, "quarantine move failed");
                None
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "quarantine task failed");
                None
            }
        }
    }
}

/// Lists replay files in a directory, sorted by file name. A missing
/// directory is an empty vault, not an error.
fn list_replay_files(dir: &Path) -> Result<Vec<PathBuf>, ReplayError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(ReplayError::Io(e)),
    };

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(ReplayError::Io)?.path();
        if path.is_file() && is_replay_extension(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn is_replay_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            ext.eq_ignore_ascii_case("fafreplay") || ext.eq_ignore_ascii_case("scfareplay")
        })
}
