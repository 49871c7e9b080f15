//! Per-program-point borrow state: which access paths are unused, used,
//! moved, or restored.
//!
//! Every tracked path lives in at most one of the four maps at a time.
//! A path absent from all four is simply not tracked in this scope. States
//! are plain values: cloned when control flow branches, merged (with
//! consistency diagnostics) when branches join, and dropped afterwards.

use ahash::AHashMap;

use crate::access_path::{PathId, PathManager};
use crate::diagnostic::Diagnostic;
use crate::location::Location;

#[derive(Debug, Clone, Default)]
pub struct BorrowState {
    /// Owned references introduced but not yet consumed, with their
    /// creation locations.
    unused: AHashMap<PathId, Location>,
    /// Consumed owned references, with creation and use locations.
    used: AHashMap<PathId, (Location, Location)>,
    /// Storage locations whose contents were moved out, with the move
    /// locations.
    moved: AHashMap<PathId, Location>,
    /// Previously moved locations that have been written again, with move
    /// and restore locations.
    unmoved: AHashMap<PathId, (Location, Location)>,
}

impl BorrowState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn unused_paths(&self) -> &AHashMap<PathId, Location> {
        &self.unused
    }

    #[must_use]
    pub fn used_paths(&self) -> &AHashMap<PathId, (Location, Location)> {
        &self.used
    }

    #[must_use]
    pub fn moved_paths(&self) -> &AHashMap<PathId, Location> {
        &self.moved
    }

    #[must_use]
    pub fn unmoved_paths(&self) -> &AHashMap<PathId, (Location, Location)> {
        &self.unmoved
    }

    /// Introduces `path` as a new unused owned reference. The path must
    /// not already be tracked in any capacity.
    pub fn intro(&mut self, path: PathId, loc: Location) {
        debug_assert!(!self.unused.contains_key(&path), "intro of a tracked path");
        debug_assert!(!self.used.contains_key(&path), "intro of a used path");
        debug_assert!(!self.moved.contains_key(&path), "intro of a moved path");
        debug_assert!(!self.unmoved.contains_key(&path), "intro of an unmoved path");
        self.unused.insert(path, loc);
    }

    /// Consumes the unused path `path` at `loc`. Returns true iff the use
    /// was legal; otherwise a diagnostic is pushed.
    pub fn use_path(&mut self, path: PathId, loc: Location, pm: &PathManager, errors: &mut Vec<Diagnostic>) -> bool {
        if let Some(creation_loc) = self.unused.remove(&path) {
            self.used.insert(path, (creation_loc, loc));
            return true;
        }
        if let Some(&(_, use_loc)) = self.used.get(&path) {
            errors.push(
                Diagnostic::error()
                    .text(format!("Owned reference {} is already used here:\n", pm.display(path)))
                    .snippet(use_loc)
                    .text("so it cannot be used later:\n")
                    .snippet(loc),
            );
            return false;
        }
        errors.push(
            Diagnostic::error()
                .text(format!(
                    "Cannot use owned reference {} created outside this scope.\n",
                    pm.display(path)
                ))
                .snippet(loc),
        );
        false
    }

    /// Performs a move of `path` at `move_loc`. Returns true iff the move
    /// was legal.
    pub fn move_path(&mut self, path: PathId, move_loc: Location, pm: &PathManager, errors: &mut Vec<Diagnostic>) -> bool {
        if let Some(&creation_loc) = self.unused.get(&path) {
            errors.push(
                Diagnostic::error()
                    .text(format!("Owned reference {} created here:\n", pm.display(path)))
                    .snippet(creation_loc)
                    .text("cannot be moved in the same scope:\n")
                    .snippet(move_loc),
            );
            return false;
        }
        if let Some(&(creation_loc, _)) = self.used.get(&path) {
            errors.push(
                Diagnostic::error()
                    .text(format!("Owned reference {} created here:\n", pm.display(path)))
                    .snippet(creation_loc)
                    .text("cannot be moved in the same scope:\n")
                    .snippet(move_loc),
            );
        }
        if let Some(&prev_move_loc) = self.moved.get(&path) {
            errors.push(
                Diagnostic::error()
                    .text(format!("Owned reference {} was already moved here:\n", pm.display(path)))
                    .snippet(prev_move_loc)
                    .text("so it cannot be moved later:\n")
                    .snippet(move_loc),
            );
            return false;
        }
        self.unmoved.remove(&path);
        self.moved.insert(path, move_loc);
        true
    }

    /// Replaces the value of a moved `path` (via a store). Returns true
    /// iff the replacement was legal.
    pub fn unmove_path(&mut self, path: PathId, loc: Location, pm: &PathManager, errors: &mut Vec<Diagnostic>) -> bool {
        if let Some(move_loc) = self.moved.remove(&path) {
            self.unmoved.insert(path, (move_loc, loc));
            return true;
        }
        errors.push(
            Diagnostic::error()
                .text(format!(
                    "Owned reference {} becomes inaccessible after store.\n",
                    pm.display(path)
                ))
                .snippet(loc),
        );
        false
    }

    /// Merges the changes `other` made with the changes `self` made. Both
    /// states must have branched off the same `previous` state; if either
    /// branch changes a path's status relative to `previous`, the other
    /// branch must make the same change.
    ///
    /// `merge_loc` is the expression that joins the two branches.
    pub fn merge(
        &mut self,
        other: &Self,
        merge_loc: Location,
        previous: &Self,
        pm: &PathManager,
        errors: &mut Vec<Diagnostic>,
    ) {
        for (&path, &creation_loc) in &previous.unused {
            let used_here = self.used.contains_key(&path);
            let used_there = other.used.contains_key(&path);
            if used_here != used_there {
                errors.push(
                    Diagnostic::error()
                        .text(format!("Owned reference {} created here:\n", pm.display(path)))
                        .snippet(creation_loc)
                        .text("is not used in both branches of this expression:\n")
                        .snippet(merge_loc),
                );
            }
        }

        for (&path, &move_loc) in &previous.moved {
            let unmoved_here = self.unmoved.contains_key(&path);
            let unmoved_there = other.unmoved.contains_key(&path);
            if unmoved_here != unmoved_there {
                errors.push(
                    Diagnostic::error()
                        .text(format!("Owned reference {} moved here:\n", pm.display(path)))
                        .snippet(move_loc)
                        .text("is not replaced by both branches:\n")
                        .snippet(merge_loc),
                );
            }
        }

        // An obligation introduced inside exactly one branch must also be
        // consumed there: after the join it exists on only one path and
        // can never be discharged.
        let mut orphaned: Vec<PathId> = Vec::new();
        for (&path, &creation_loc) in &self.unused {
            if !previous.unused.contains_key(&path) && !other.unused.contains_key(&path) {
                errors.push(
                    Diagnostic::error()
                        .text(format!("Owned reference {} created here:\n", pm.display(path)))
                        .snippet(creation_loc)
                        .text("is not used in both branches of this expression:\n")
                        .snippet(merge_loc),
                );
                orphaned.push(path);
            }
        }
        for (&path, &creation_loc) in &other.unused {
            if !previous.unused.contains_key(&path) && !self.unused.contains_key(&path) {
                errors.push(
                    Diagnostic::error()
                        .text(format!("Owned reference {} created here:\n", pm.display(path)))
                        .snippet(creation_loc)
                        .text("is not used in both branches of this expression:\n")
                        .snippet(merge_loc),
                );
            }
        }
        for path in orphaned {
            self.unused.remove(&path);
        }

        for (&path, &(move_loc, _)) in &previous.unmoved {
            let unmoved_here = self.unmoved.contains_key(&path);
            let unmoved_there = other.unmoved.contains_key(&path);
            if unmoved_here != unmoved_there {
                errors.push(
                    Diagnostic::error()
                        .text(format!("Owned reference {} moved here:\n", pm.display(path)))
                        .snippet(move_loc)
                        .text("is treated inconsistently by the two branches:\n")
                        .snippet(merge_loc),
                );
            }
        }
    }
}
