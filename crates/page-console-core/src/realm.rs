//! Realm: the active global scope a script executes against.

use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

use crate::value::{ObjectRef, Value};

/// A declared binding.
#[derive(Debug, Clone)]
pub struct Binding {
    pub value: Value,
    pub mutable: bool,
}

/// Outcome of assigning to a name in an [`Environment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignment {
    Assigned,
    /// The binding exists but was declared `const`.
    Immutable,
    /// No binding with that name in this record.
    Missing,
}

/// Declarative binding record, shared by handle.
#[derive(Debug, Clone, Default)]
pub struct Environment(Arc<RwLock<HashMap<String, Binding>>>);

impl Environment {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<Binding> {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Declare a binding, replacing any previous one with the same name.
    pub fn declare(&self, name: impl Into<String>, value: Value, mutable: bool) {
        self.0
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), Binding { value, mutable });
    }

    pub fn assign(&self, name: &str, value: Value) -> Assignment {
        let mut bindings = self.0.write().unwrap_or_else(PoisonError::into_inner);
        match bindings.get_mut(name) {
            Some(binding) if binding.mutable => {
                binding.value = value;
                Assignment::Assigned
            }
            Some(_) => Assignment::Immutable,
            None => Assignment::Missing,
        }
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// The (global object, `this`, top-level declarations) triple a script sees.
#[derive(Debug, Clone)]
pub struct GlobalScope {
    pub object: ObjectRef,
    pub this_value: Value,
    pub declarations: Environment,
}

impl GlobalScope {
    /// A scope whose `this` is the global object itself.
    #[must_use]
    pub fn new(object: ObjectRef) -> Self {
        Self {
            this_value: Value::Object(object.clone()),
            object,
            declarations: Environment::new(),
        }
    }

    /// Whether both scopes install the same objects.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        self.object.ptr_eq(&other.object)
            && self.this_value.strict_equals(&other.this_value)
            && self.declarations.ptr_eq(&other.declarations)
    }
}

/// Holds the page's active global scope.
///
/// The active scope can only be replaced through
/// [`ScopeGuard`](crate::switcher::ScopeGuard).
#[derive(Debug)]
pub struct Realm {
    active: RwLock<GlobalScope>,
}

impl Realm {
    #[must_use]
    pub fn new(scope: GlobalScope) -> Self {
        Self {
            active: RwLock::new(scope),
        }
    }

    /// Snapshot of the active scope.
    #[must_use]
    pub fn active_scope(&self) -> GlobalScope {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn global_object(&self) -> ObjectRef {
        self.active_scope().object
    }

    #[must_use]
    pub fn this_value(&self) -> Value {
        self.active_scope().this_value
    }

    #[must_use]
    pub fn declarations(&self) -> Environment {
        self.active_scope().declarations
    }

    /// Install the scope built from the current one; returns the scope that
    /// was active before. Both steps happen under one lock.
    pub(crate) fn install(&self, build: impl FnOnce(&GlobalScope) -> GlobalScope) -> GlobalScope {
        let mut active = self.active.write().unwrap_or_else(PoisonError::into_inner);
        let next = build(&active);
        std::mem::replace(&mut *active, next)
    }

    pub(crate) fn restore(&self, scope: GlobalScope) {
        *self.active.write().unwrap_or_else(PoisonError::into_inner) = scope;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Object;

    #[test]
    fn test_const_binding_rejects_assignment() {
        let env = Environment::new();
        env.declare("x", Value::from(1.0), false);
        assert_eq!(env.assign("x", Value::from(2.0)), Assignment::Immutable);
        assert_eq!(env.assign("y", Value::from(2.0)), Assignment::Missing);
        assert_eq!(env.lookup("x").map(|b| b.value), Some(Value::Number(1.0)));
    }

    #[test]
    fn test_install_returns_previous_scope() {
        let page = GlobalScope::new(ObjectRef::new(Object::ordinary()));
        let realm = Realm::new(page.clone());
        let other = GlobalScope::new(ObjectRef::new(Object::ordinary()));

        let previous = realm.install(|_| other.clone());
        assert!(previous.same_as(&page));
        assert!(realm.active_scope().same_as(&other));
    }
}
