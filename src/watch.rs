//! Watch mode for automatic rebuilds on file changes.
//!
//! Changes are debounced and coalesced, then classified into rebuild actions
//! by path and by change kind: a content edit to a stylesheet only recompiles,
//! while adding or removing a partial regenerates the import block first.
//! Actions dispatch synchronously on the watch thread, so rebuild runs never
//! overlap. A failed rebuild is logged and the loop keeps watching.

use crate::build::BuildContext;
use crate::server::ReloadSignal;
use crate::stages::{inject, sprite, stylesheet};
use notify::event::ModifyKind;
use notify::{EventKind, RecursiveMode, Watcher};
use notify_debouncer_full::new_debouncer;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;

/// Error during watch mode
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WatchError {
    /// Failed to initialize the file watcher
    #[error("Failed to initialize file watcher: {0}")]
    WatcherInit(#[source] notify::Error),
    /// Failed to add a watch path
    #[error("Failed to watch path: {0}")]
    WatchPath(#[source] notify::Error),
    /// Channel receive error
    #[error("Watch channel error: {0}")]
    Channel(String),
    /// Source directory not found
    #[error("Source directory not found: {0}")]
    SourceNotFound(PathBuf),
}

/// How a file changed, as far as rebuild decisions care.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Content of an existing file was edited
    Modified,
    /// A file appeared, disappeared, or was renamed
    Structural,
}

impl ChangeKind {
    /// Map a notify event kind onto a change kind.
    ///
    /// Access events and unclassified noise return `None`.
    pub fn from_event(kind: &EventKind) -> Option<Self> {
        match kind {
            EventKind::Create(_) | EventKind::Remove(_) => Some(ChangeKind::Structural),
            EventKind::Modify(ModifyKind::Name(_)) => Some(ChangeKind::Structural),
            EventKind::Modify(_) | EventKind::Any => Some(ChangeKind::Modified),
            EventKind::Access(_) | EventKind::Other => None,
        }
    }
}

/// What a classified change asks the rebuild loop to do.
///
/// Variant order is dispatch order: sprite packing feeds the generated
/// partial, include regeneration feeds the compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RebuildAction {
    /// Repack the sprite sheet and its generated partial
    RebuildSprite,
    /// Regenerate the root stylesheet's import block
    RegenerateIncludes,
    /// Recompile the root stylesheet into staging
    CompileStylesheet,
    /// Markup changed; only a reload is needed
    ReloadMarkup,
}

/// Classify one changed path into a rebuild action.
pub fn classify(ctx: &BuildContext, path: &Path, kind: ChangeKind) -> Option<RebuildAction> {
    if path.starts_with(ctx.sprite_dir()) {
        return Some(RebuildAction::RebuildSprite);
    }
    let ext = path.extension()?.to_string_lossy().to_lowercase();
    match ext.as_str() {
        "html" | "htm" => Some(RebuildAction::ReloadMarkup),
        "css" if path.starts_with(ctx.stylesheet_dir()) => match kind {
            ChangeKind::Modified => Some(RebuildAction::CompileStylesheet),
            ChangeKind::Structural => Some(RebuildAction::RegenerateIncludes),
        },
        _ => None,
    }
}

/// Add the actions an action implies: a repacked sprite changes the
/// generated partial set, and a regenerated import block needs a recompile.
fn expand_actions(actions: &mut BTreeSet<RebuildAction>) {
    if actions.contains(&RebuildAction::RebuildSprite) {
        actions.insert(RebuildAction::RegenerateIncludes);
    }
    if actions.contains(&RebuildAction::RegenerateIncludes) {
        actions.insert(RebuildAction::CompileStylesheet);
    }
}

/// Get current timestamp for logging
fn timestamp() -> String {
    use std::time::SystemTime;
    let now = SystemTime::now().duration_since(SystemTime::UNIX_EPOCH).unwrap_or_default();
    let secs = now.as_secs() % 86400;
    format!("{:02}:{:02}:{:02}", (secs / 3600) % 24, (secs / 60) % 60, secs % 60)
}

/// Run one batch of rebuild actions, logging failures without bailing.
///
/// Returns whether connected clients should reload.
fn dispatch(ctx: &BuildContext, actions: &BTreeSet<RebuildAction>) -> bool {
    let mut reload = false;
    for action in actions {
        let outcome: Result<(), String> = match action {
            RebuildAction::RebuildSprite => {
                println!("[{}] Repacking sprite sheet...", timestamp());
                sprite::build_sprite(ctx).map(|_| ()).map_err(|e| e.to_string())
            }
            RebuildAction::RegenerateIncludes => {
                println!("[{}] Regenerating imports...", timestamp());
                inject::inject_imports(ctx).map(|_| ()).map_err(|e| e.to_string())
            }
            RebuildAction::CompileStylesheet => {
                println!("[{}] Compiling stylesheet...", timestamp());
                stylesheet::compile_stylesheet(ctx).map(|_| ()).map_err(|e| e.to_string())
            }
            RebuildAction::ReloadMarkup => Ok(()),
        };
        match outcome {
            Ok(()) => reload = true,
            Err(message) => {
                // Keep the previous staged output and keep watching
                eprintln!("[{}] Error: {}", timestamp(), message);
            }
        }
    }
    reload
}

/// Watch the source tree and rebuild staging on changes.
///
/// Blocks until the event channel closes. Every successful rebuild batch
/// broadcasts a reload signal; send failures just mean no client is
/// listening.
pub fn watch_and_rebuild(
    ctx: &BuildContext,
    reload_tx: broadcast::Sender<ReloadSignal>,
) -> Result<(), WatchError> {
    let src = ctx.src_dir();
    if !src.exists() {
        return Err(WatchError::SourceNotFound(src));
    }

    let (tx, rx) = channel();
    let debounce = Duration::from_millis(ctx.config().watch.debounce_ms);
    let mut debouncer = new_debouncer(debounce, None, tx).map_err(WatchError::WatcherInit)?;
    debouncer.watcher().watch(&src, RecursiveMode::Recursive).map_err(WatchError::WatchPath)?;

    println!("[{}] Watching {} for changes...", timestamp(), src.display());

    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let mut actions = BTreeSet::new();
                for event in &events {
                    let Some(kind) = ChangeKind::from_event(&event.kind) else { continue };
                    for path in &event.paths {
                        if let Some(action) = classify(ctx, path, kind) {
                            if let Some(name) = path.file_name() {
                                println!(
                                    "[{}] Changed: {}",
                                    timestamp(),
                                    name.to_string_lossy()
                                );
                            }
                            actions.insert(action);
                        }
                    }
                }
                if actions.is_empty() {
                    continue;
                }
                expand_actions(&mut actions);
                if dispatch(ctx, &actions) {
                    let _ = reload_tx.send(ReloadSignal::Changed);
                }
            }
            Ok(Err(errors)) => {
                for error in errors {
                    eprintln!("[{}] Watch error: {}", timestamp(), error);
                }
                eprintln!("[{}] Continuing to watch...", timestamp());
            }
            Err(e) => return Err(WatchError::Channel(e.to_string())),
        }
    }
}
