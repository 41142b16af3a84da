//! JWalk-based directory traversal.

use std::path::{Path, PathBuf};

use jwalk::{DirEntry, Parallelism, WalkDir};

use tracing::debug;

use fileprint_core::{EntryError, ErrorKind, IndexError, WorkItem};

use crate::report::ErrorHook;

type EntryResult = Result<DirEntry<((), ())>, jwalk::Error>;

/// One step of a traversal.
#[derive(Debug)]
pub enum WalkEvent {
    /// A non-directory entry to hash.
    File(WorkItem),
    /// An entry that could not be read. Its subtree, if any, is skipped.
    Error(EntryError),
}

/// Walks a directory tree on the calling thread.
#[derive(Debug, Clone)]
pub struct TreeWalker {
    root: PathBuf,
}

impl TreeWalker {
    /// Prepare a walk of `root`.
    ///
    /// The root is canonicalized and opened once up front, so an unusable
    /// root fails here instead of surfacing as a per-entry error.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, IndexError> {
        let root = root.as_ref();
        let root_path = root.canonicalize().map_err(|e| IndexError::root(root, e))?;

        if !root_path.is_dir() {
            return Err(IndexError::NotADirectory { path: root_path });
        }

        // Probe readability; jwalk would only report this as an entry error.
        std::fs::read_dir(&root_path).map_err(|e| IndexError::root(&root_path, e))?;

        Ok(Self { root: root_path })
    }

    /// Canonical root of the walk.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Start a lazy, unordered walk of the tree.
    pub fn walk(&self) -> Walk {
        let walker = WalkDir::new(&self.root)
            .parallelism(Parallelism::Serial)
            .skip_hidden(false)
            .follow_links(false)
            .sort(false)
            .min_depth(0);

        Walk {
            entries: Box::new(walker.into_iter()),
        }
    }

    /// Walk the tree, passing every file to `consumer` and every unreadable
    /// entry to `hook`.
    ///
    /// Stops at the first consumer error. Returns the number of entries
    /// reported to the hook.
    pub fn drain_into<F>(&self, mut consumer: F, hook: &dyn ErrorHook) -> Result<u64, IndexError>
    where
        F: FnMut(WorkItem) -> Result<(), IndexError>,
    {
        let mut errors = 0;
        for event in self.walk() {
            match event {
                WalkEvent::File(item) => consumer(item)?,
                WalkEvent::Error(err) => {
                    errors += 1;
                    debug!(path = %err.path.display(), "skipping unreadable entry");
                    hook.report(&err);
                }
            }
        }
        Ok(errors)
    }
}

/// Iterator over the files and errors of a walk.
///
/// Directories are descended into but never yielded. A directory whose
/// children cannot be listed is yielded as an error and its subtree skipped.
pub struct Walk {
    entries: Box<dyn Iterator<Item = EntryResult>>,
}

impl Iterator for Walk {
    type Item = WalkEvent;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let mut entry = match self.entries.next()? {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err.path().map(Path::to_path_buf).unwrap_or_default();
                    return Some(WalkEvent::Error(EntryError::new(
                        path,
                        err.to_string(),
                        ErrorKind::EntryUnreadable,
                    )));
                }
            };

            if entry.file_type().is_dir() {
                // jwalk yields an unlistable directory as Ok with the error attached.
                if let Some(err) = entry.read_children_error.take() {
                    return Some(WalkEvent::Error(EntryError::new(
                        entry.path(),
                        err.to_string(),
                        ErrorKind::EntryUnreadable,
                    )));
                }
                continue;
            }

            return Some(WalkEvent::File(WorkItem::new(entry.path())));
        }
    }
}
