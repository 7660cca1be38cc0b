// SPDX-License-Identifier: MIT OR Apache-2.0
//! Watch mode: recompile the document whenever it changes on disk.
//!
//! The document's directory is watched rather than the file itself, since
//! most editors save through a temporary file and a rename.

use crate::output::{self, Compiler};
use crate::settings;
use anyhow::Result;
use notify::{EventKind, RecursiveMode};
use notify_debouncer_full::{
    new_debouncer, notify::RecommendedWatcher, DebounceEventResult, Debouncer, RecommendedCache,
};
use ordoplay_shader_graph::CompileContext;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::time::Duration;

const DEBOUNCE: Duration = Duration::from_millis(250);

/// Events about the watched document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// Created or modified
    Changed(PathBuf),
    /// Deleted
    Removed(PathBuf),
    /// The watcher reported an error
    Error(String),
}

/// Debounced watcher for a single document
pub struct DocumentWatcher {
    _debouncer: Debouncer<RecommendedWatcher, RecommendedCache>,
    event_rx: Receiver<WatchEvent>,
}

impl DocumentWatcher {
    /// Watch `document`
    pub fn new(document: &Path, debounce: Duration) -> Result<Self, notify::Error> {
        let (event_tx, event_rx) = mpsc::channel();
        let target = document.to_path_buf();

        let mut debouncer = new_debouncer(debounce, None, move |result: DebounceEventResult| {
            match result {
                Ok(events) => {
                    for event in events {
                        for path in event.paths.iter().filter(|p| concerns(p, &target)) {
                            let event = match event.kind {
                                EventKind::Create(_) | EventKind::Modify(_) => {
                                    WatchEvent::Changed(path.clone())
                                }
                                EventKind::Remove(_) => WatchEvent::Removed(path.clone()),
                                EventKind::Any | EventKind::Access(_) | EventKind::Other => {
                                    continue
                                }
                            };
                            // The receiver is gone once the watch loop ends
                            let _ = event_tx.send(event);
                        }
                    }
                }
                Err(errors) => {
                    for error in errors {
                        let _ = event_tx.send(WatchEvent::Error(error.to_string()));
                    }
                }
            }
        })?;

        let dir = match document.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        debouncer.watch(dir, RecursiveMode::NonRecursive)?;
        tracing::info!("Watching {} for changes", document.display());

        Ok(Self {
            _debouncer: debouncer,
            event_rx,
        })
    }

    /// Pending events, without blocking
    pub fn poll_events(&self) -> Vec<WatchEvent> {
        let mut events = Vec::new();
        loop {
            match self.event_rx.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    tracing::warn!("File watcher channel disconnected");
                    break;
                }
            }
        }
        events
    }

    /// Block until at least one event arrives, then drain the rest.
    ///
    /// Returns `None` once the watcher has shut down.
    pub fn next_batch(&self) -> Option<Vec<WatchEvent>> {
        let first = self.event_rx.recv().ok()?;
        let mut events = vec![first];
        events.extend(self.poll_events());
        Some(events)
    }
}

/// Whether an event on `path` is about `document`
fn concerns(path: &Path, document: &Path) -> bool {
    path.file_name().is_some() && path.file_name() == document.file_name()
}

/// Compile once, then again after every change, until the watcher stops
pub fn run(
    document: &Path,
    out: &Path,
    compiler: &mut Compiler,
    context: &CompileContext,
) -> Result<()> {
    let watcher = DocumentWatcher::new(document, DEBOUNCE)?;
    rebuild(document, out, compiler, context);

    while let Some(events) = watcher.next_batch() {
        let mut changed = false;
        for event in events {
            match event {
                WatchEvent::Changed(_) => changed = true,
                WatchEvent::Removed(path) => {
                    tracing::warn!("{} was removed, keeping the last artifacts", path.display());
                }
                WatchEvent::Error(error) => tracing::warn!("Watch error: {error}"),
            }
        }
        if changed {
            rebuild(document, out, compiler, context);
        }
    }
    Ok(())
}

/// Reload, recompile and rewrite; on any failure the files on disk stay as they were
fn rebuild(document: &Path, out: &Path, compiler: &mut Compiler, context: &CompileContext) {
    let result = settings::load_document(document).and_then(|mut graph| {
        let artifacts = compiler.compile(&mut graph, context)?;
        output::write(out, &artifacts)
    });
    match result {
        Ok(written) => tracing::info!(files = written.len(), "Rebuilt {}", document.display()),
        Err(error) => tracing::warn!("Keeping previous artifacts: {error:#}"),
    }
}
