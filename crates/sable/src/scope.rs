//! A stack of lexical scopes mapping variable names to values.

use ahash::AHashMap;

/// Manages per-scope variable information. There is always at least one
/// scope on the stack.
#[derive(Debug)]
pub struct ScopeStack<V> {
    scopes: Vec<AHashMap<String, V>>,
}

impl<V: Clone> Default for ScopeStack<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone> ScopeStack<V> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            scopes: vec![AHashMap::new()],
        }
    }

    /// Adds a binding to the topmost scope, shadowing any outer binding of
    /// the same name.
    pub fn add(&mut self, name: &str, value: V) {
        self.scopes
            .last_mut()
            .expect("scope stack is never empty")
            .insert(name.to_owned(), value);
    }

    /// Finds `name`, innermost scope first.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<V> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name).cloned())
    }

    pub fn push(&mut self) {
        self.scopes.push(AHashMap::new());
    }

    pub fn pop(&mut self) {
        self.scopes.pop();
        debug_assert!(!self.scopes.is_empty(), "popped the outermost scope");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shadowing_and_popping() {
        let mut scopes: ScopeStack<u32> = ScopeStack::new();
        scopes.add("x", 1);
        scopes.push();
        scopes.add("x", 2);
        assert_eq!(scopes.get("x"), Some(2));
        scopes.pop();
        assert_eq!(scopes.get("x"), Some(1));
        assert_eq!(scopes.get("y"), None);
    }
}
