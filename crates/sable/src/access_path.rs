//! Symbolic lvalue paths and the manager that uniques them.
//!
//! An access path is a sequence of struct projections, constant offsets,
//! and dereferences used to reach a value, e.g. `myval.field1!.field2`.
//! Paths are structurally uniqued: comparing two [`PathId`]s is equivalent
//! to a deep comparison.
//!
//! Uniquing has one wrinkle. `base[.field]` is an address calculation, so
//! `base[.field]!` reaches the same value as `base!.field`. Two different
//! spellings of one path would break uniquing, so paths containing an
//! address calculation followed by a dereference are forbidden; the deref
//! constructor rewrites `B[.f]!` into `B!.f` (transitively, so
//! `B[.f1][.f2]!` becomes `B!.f1.f2`).
//!
//! The manager also supports aliasing: `alias_root("x", p)` declares that
//! future constructions of the root `x` resolve to the existing path `p`.
//! This projects the lexical name space into the structural path space and
//! models `let x = e` where `e` already has a path. Projection and deref
//! positions can be aliased the same way.

use ahash::AHashMap;
use smallvec::SmallVec;

/// Handle to a uniqued access path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PathId(u32);

impl PathId {
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The structural variants of a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Path {
    /// A named variable, or an internal variable like `$3`.
    Root(String),
    /// `base.field` when `addr_calc` is false, `base[.field]` when true.
    Project {
        base: PathId,
        field: String,
        addr_calc: bool,
    },
    /// `base.N` for a constant integer offset.
    ArrayOffset { base: PathId, offset: i64 },
    /// `base!`
    Deref { base: PathId },
}

impl Path {
    /// The path this one extends, if any.
    #[must_use]
    pub fn base(&self) -> Option<PathId> {
        match self {
            Self::Root(_) => None,
            Self::Project { base, .. } | Self::ArrayOffset { base, .. } | Self::Deref { base } => Some(*base),
        }
    }
}

/// Identifies one kind of extension of a given base path.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ChildKey {
    Project { field: String, addr_calc: bool },
    ArrayOffset(i64),
    Deref,
}

/// Creates, uniques, and aliases access paths. One manager lives per
/// function borrow check.
#[derive(Debug, Default)]
pub struct PathManager {
    paths: Vec<Path>,
    roots: AHashMap<String, PathId>,
    root_aliases: AHashMap<String, PathId>,
    /// Uniqued non-root paths, bucketed by their base.
    children: AHashMap<PathId, SmallVec<[(ChildKey, PathId); 4]>>,
    /// Aliased non-root positions, bucketed by their base. Consulted
    /// before the uniquing buckets.
    child_aliases: AHashMap<PathId, SmallVec<[(ChildKey, PathId); 2]>>,
}

impl PathManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn data(&self, id: PathId) -> &Path {
        &self.paths[id.index()]
    }

    fn alloc(&mut self, path: Path) -> PathId {
        let id = PathId(u32::try_from(self.paths.len()).expect("PathId overflow"));
        self.paths.push(path);
        id
    }

    fn child_lookup(map: &AHashMap<PathId, SmallVec<[(ChildKey, PathId); 4]>>, base: PathId, key: &ChildKey) -> Option<PathId> {
        map.get(&base)
            .and_then(|bucket| bucket.iter().find(|(k, _)| k == key).map(|(_, id)| *id))
    }

    fn alias_lookup(&self, base: PathId, key: &ChildKey) -> Option<PathId> {
        self.child_aliases
            .get(&base)
            .and_then(|bucket| bucket.iter().find(|(k, _)| k == key).map(|(_, id)| *id))
    }

    /// Finds or creates the root path for `name`, resolving aliases.
    pub fn get_root(&mut self, name: &str) -> PathId {
        if let Some(&id) = self.root_aliases.get(name) {
            return id;
        }
        if let Some(&id) = self.roots.get(name) {
            return id;
        }
        let id = self.alloc(Path::Root(name.to_owned()));
        self.roots.insert(name.to_owned(), id);
        id
    }

    /// Looks up the root path for `name` without creating it.
    #[must_use]
    pub fn find_root(&self, name: &str) -> Option<PathId> {
        self.root_aliases.get(name).or_else(|| self.roots.get(name)).copied()
    }

    /// Finds or creates `base.field` / `base[.field]`.
    pub fn get_project(&mut self, base: PathId, field: &str, addr_calc: bool) -> PathId {
        if !addr_calc {
            debug_assert!(
                !matches!(self.data(base), Path::Project { addr_calc: true, .. }),
                "an address calculation must not be extended by a plain projection"
            );
        }
        let key = ChildKey::Project {
            field: field.to_owned(),
            addr_calc,
        };
        if let Some(id) = self.alias_lookup(base, &key) {
            return id;
        }
        if let Some(id) = Self::child_lookup(&self.children, base, &key) {
            return id;
        }
        let id = self.alloc(Path::Project {
            base,
            field: field.to_owned(),
            addr_calc,
        });
        self.children.entry(base).or_default().push((key, id));
        id
    }

    /// Looks up `base.field` / `base[.field]` without creating it.
    #[must_use]
    pub fn find_project(&self, base: PathId, field: &str, addr_calc: bool) -> Option<PathId> {
        let key = ChildKey::Project {
            field: field.to_owned(),
            addr_calc,
        };
        self.alias_lookup(base, &key)
            .or_else(|| Self::child_lookup(&self.children, base, &key))
    }

    /// Finds or creates `base.offset` for a constant array offset.
    pub fn get_array_offset(&mut self, base: PathId, offset: i64) -> PathId {
        debug_assert!(
            !matches!(self.data(base), Path::Project { addr_calc: true, .. }),
            "an address calculation must not be extended by an array offset"
        );
        let key = ChildKey::ArrayOffset(offset);
        if let Some(id) = self.alias_lookup(base, &key) {
            return id;
        }
        if let Some(id) = Self::child_lookup(&self.children, base, &key) {
            return id;
        }
        let id = self.alloc(Path::ArrayOffset { base, offset });
        self.children.entry(base).or_default().push((key, id));
        id
    }

    /// Finds or creates `base!`, rewriting `B[.f]!` into `B!.f` first so
    /// the two spellings unique to the same path.
    pub fn get_deref(&mut self, base: PathId) -> PathId {
        if let Path::Project {
            base: base_base,
            field,
            addr_calc: true,
        } = self.data(base).clone()
        {
            let derefed = self.get_deref(base_base);
            return self.get_project(derefed, &field, false);
        }
        let key = ChildKey::Deref;
        if let Some(id) = self.alias_lookup(base, &key) {
            return id;
        }
        if let Some(id) = Self::child_lookup(&self.children, base, &key) {
            return id;
        }
        let id = self.alloc(Path::Deref { base });
        self.children.entry(base).or_default().push((key, id));
        id
    }

    /// Declares that the root `name` resolves to `target` from now on.
    pub fn alias_root(&mut self, name: &str, target: PathId) {
        self.root_aliases.insert(name.to_owned(), target);
    }

    /// Declares that `base.field` / `base[.field]` resolves to `target`.
    pub fn alias_project(&mut self, base: PathId, field: &str, addr_calc: bool, target: PathId) {
        let key = ChildKey::Project {
            field: field.to_owned(),
            addr_calc,
        };
        self.child_aliases.entry(base).or_default().push((key, target));
    }

    /// Declares that `base!` resolves to `target`.
    pub fn alias_deref(&mut self, base: PathId, target: PathId) {
        self.child_aliases.entry(base).or_default().push((ChildKey::Deref, target));
    }

    /// True iff `path` begins with `prefix`.
    #[must_use]
    pub fn starts_with(&self, path: PathId, prefix: PathId) -> bool {
        let mut current = path;
        loop {
            if current == prefix {
                return true;
            }
            match self.data(current).base() {
                Some(base) => current = base,
                None => return false,
            }
        }
    }

    /// The path that is structurally `of` with `prefix` replaced by
    /// `with`. `None` when `prefix` is not a prefix of `of`.
    pub fn replace_prefix(&mut self, of: PathId, prefix: PathId, with: PathId) -> Option<PathId> {
        if of == prefix {
            return Some(with);
        }
        match self.data(of).clone() {
            Path::Root(_) => None,
            Path::Project { base, field, addr_calc } => {
                let base = self.replace_prefix(base, prefix, with)?;
                Some(self.get_project(base, &field, addr_calc))
            }
            Path::ArrayOffset { base, offset } => {
                let base = self.replace_prefix(base, prefix, with)?;
                Some(self.get_array_offset(base, offset))
            }
            Path::Deref { base } => {
                let base = self.replace_prefix(base, prefix, with)?;
                Some(self.get_deref(base))
            }
        }
    }

    /// Renders the path for error messages, matching source syntax.
    #[must_use]
    pub fn display(&self, id: PathId) -> String {
        match self.data(id) {
            Path::Root(name) => name.clone(),
            Path::Project {
                base,
                field,
                addr_calc: true,
            } => format!("{}[.{field}]", self.display(*base)),
            Path::Project {
                base,
                field,
                addr_calc: false,
            } => format!("{}.{field}", self.display(*base)),
            Path::ArrayOffset { base, offset } => format!("{}.{offset}", self.display(*base)),
            Path::Deref { base } => format!("{}!", self.display(*base)),
        }
    }
}
