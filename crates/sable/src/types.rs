//! The type representation used by semantic analysis.
//!
//! Types are structurally uniqued through a [`TypeContext`], so comparing
//! two [`TypeId`]s is equivalent to a deep structural comparison. Constraint
//! types (`numeric`, `decimal`) are ordinary types that denote sets of
//! concrete types; unification refines them.

use ahash::AHashMap;
use strum::IntoStaticStr;

use crate::ast::{Ast, TypeExprId, TypeExprKind};

/// A primitive concrete type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr)]
pub enum Primitive {
    #[strum(serialize = "bool")]
    Bool,
    #[strum(serialize = "i8")]
    I8,
    #[strum(serialize = "i16")]
    I16,
    #[strum(serialize = "i32")]
    I32,
    #[strum(serialize = "i64")]
    I64,
    #[strum(serialize = "f32")]
    F32,
    #[strum(serialize = "f64")]
    F64,
    #[strum(serialize = "unit")]
    Unit,
}

impl Primitive {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// True for the types `numeric` may refine to.
    #[must_use]
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::I8 | Self::I16 | Self::I32 | Self::I64 | Self::F32 | Self::F64
        )
    }

    /// True for the types `decimal` may refine to.
    #[must_use]
    pub fn is_decimal(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }
}

/// A type constraint: a set of concrete types subject to later refinement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr)]
pub enum Constraint {
    #[strum(serialize = "numeric")]
    Numeric,
    #[strum(serialize = "decimal")]
    Decimal,
}

impl Constraint {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// A type variable, identified by a monotonically increasing id that is
/// never reused within one compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeVarId(u32);

impl TypeVarId {
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handle to a structurally uniqued type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(u32);

impl TypeId {
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The closed set of type shapes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Prim(Primitive),
    Constraint(Constraint),
    /// `&inner` when `unique` is false, `#inner` when true.
    Ref { inner: TypeId, unique: bool },
    /// A user struct, by fully qualified name.
    Named(String),
    Var(TypeVarId),
}

/// Owns and uniques every [`Type`] of one compilation.
#[derive(Debug)]
pub struct TypeContext {
    types: Vec<Type>,
    prims: AHashMap<Primitive, TypeId>,
    constraints: AHashMap<Constraint, TypeId>,
    /// Reference types indexed by inner type and uniqueness.
    refs: AHashMap<(TypeId, bool), TypeId>,
    named: AHashMap<String, TypeId>,
    /// One entry per minted type variable, indexed by [`TypeVarId`].
    vars: Vec<TypeId>,
}

impl Default for TypeContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeContext {
    #[must_use]
    pub fn new() -> Self {
        Self {
            types: Vec::new(),
            prims: AHashMap::new(),
            constraints: AHashMap::new(),
            refs: AHashMap::new(),
            named: AHashMap::new(),
            vars: Vec::new(),
        }
    }

    fn alloc(&mut self, ty: Type) -> TypeId {
        let id = TypeId(u32::try_from(self.types.len()).expect("TypeId overflow"));
        self.types.push(ty);
        id
    }

    #[must_use]
    pub fn kind(&self, id: TypeId) -> &Type {
        &self.types[id.index()]
    }

    pub fn prim(&mut self, p: Primitive) -> TypeId {
        if let Some(&id) = self.prims.get(&p) {
            return id;
        }
        let id = self.alloc(Type::Prim(p));
        self.prims.insert(p, id);
        id
    }

    pub fn constraint(&mut self, c: Constraint) -> TypeId {
        if let Some(&id) = self.constraints.get(&c) {
            return id;
        }
        let id = self.alloc(Type::Constraint(c));
        self.constraints.insert(c, id);
        id
    }

    pub fn bool_type(&mut self) -> TypeId {
        self.prim(Primitive::Bool)
    }

    pub fn unit_type(&mut self) -> TypeId {
        self.prim(Primitive::Unit)
    }

    pub fn i8_type(&mut self) -> TypeId {
        self.prim(Primitive::I8)
    }

    pub fn numeric(&mut self) -> TypeId {
        self.constraint(Constraint::Numeric)
    }

    pub fn decimal(&mut self) -> TypeId {
        self.constraint(Constraint::Decimal)
    }

    /// Finds or creates the reference type `&inner` / `#inner`.
    pub fn ref_type(&mut self, inner: TypeId, unique: bool) -> TypeId {
        if let Some(&id) = self.refs.get(&(inner, unique)) {
            return id;
        }
        let id = self.alloc(Type::Ref { inner, unique });
        self.refs.insert((inner, unique), id);
        id
    }

    /// Finds or creates the named type for a struct FQN.
    pub fn named(&mut self, name: &str) -> TypeId {
        if let Some(&id) = self.named.get(name) {
            return id;
        }
        let id = self.alloc(Type::Named(name.to_owned()));
        self.named.insert(name.to_owned(), id);
        id
    }

    /// Mints a type variable that has never been handed out before.
    pub fn fresh_var(&mut self) -> TypeId {
        let var = TypeVarId(u32::try_from(self.vars.len()).expect("TypeVarId overflow"));
        let id = self.alloc(Type::Var(var));
        self.vars.push(id);
        id
    }

    /// The `TypeId` under which a variable was minted.
    #[must_use]
    pub fn var_type(&self, var: TypeVarId) -> TypeId {
        self.vars[var.index()]
    }

    /// Lowers a source type expression to its type. Named types must
    /// already be canonicalized for struct lookups to work later.
    pub fn from_type_expr(&mut self, ast: &Ast, id: TypeExprId) -> TypeId {
        match &ast.type_expr(id).kind {
            TypeExprKind::Prim(p) => self.prim(*p),
            TypeExprKind::Named(name) => {
                let name = name.clone();
                self.named(&name)
            }
            TypeExprKind::Ref { pointee, unique } => {
                let (pointee, unique) = (*pointee, *unique);
                let inner = self.from_type_expr(ast, pointee);
                self.ref_type(inner, unique)
            }
        }
    }

    /// Renders a type the way it appears in source (`#i8`, `&Person`,
    /// `numeric`, `$var3`).
    #[must_use]
    pub fn display(&self, id: TypeId) -> String {
        match self.kind(id) {
            Type::Prim(p) => p.as_str().to_owned(),
            Type::Constraint(c) => c.as_str().to_owned(),
            Type::Named(name) => name.clone(),
            Type::Ref { inner, unique } => {
                let sigil = if *unique { '#' } else { '&' };
                format!("{sigil}{}", self.display(*inner))
            }
            Type::Var(v) => format!("$var{}", v.index()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniquing_is_pointer_identity() {
        let mut tc = TypeContext::new();
        let a = tc.prim(Primitive::I32);
        let b = tc.prim(Primitive::I32);
        assert_eq!(a, b);
        let r1 = tc.ref_type(a, true);
        let r2 = tc.ref_type(b, true);
        let r3 = tc.ref_type(a, false);
        assert_eq!(r1, r2);
        assert_ne!(r1, r3);
        assert_eq!(tc.named("global::Person"), tc.named("global::Person"));
    }

    #[test]
    fn fresh_vars_are_never_reused() {
        let mut tc = TypeContext::new();
        let v1 = tc.fresh_var();
        let v2 = tc.fresh_var();
        assert_ne!(v1, v2);
    }

    #[test]
    fn display_matches_source_syntax() {
        let mut tc = TypeContext::new();
        let i8 = tc.prim(Primitive::I8);
        let owned = tc.ref_type(i8, true);
        let borrowed = tc.ref_type(i8, false);
        assert_eq!(tc.display(owned), "#i8");
        assert_eq!(tc.display(borrowed), "&i8");
        let numeric = tc.numeric();
        assert_eq!(tc.display(numeric), "numeric");
    }
}
