//! Swapping the realm's active global scope for the duration of one evaluation.

use crate::{context::ExecutionContext, realm::GlobalScope, realm::Realm};

/// Installs a console scope on a realm and puts the page's scope back when
/// dropped.
///
/// Restoration runs on every exit path of the enclosing evaluation,
/// including a panic unwinding through it. Guards must not overlap on the
/// same realm.
#[must_use = "the console scope is uninstalled as soon as the guard is dropped"]
#[derive(Debug)]
pub struct ScopeGuard<'r> {
    realm: &'r Realm,
    saved: GlobalScope,
}

impl<'r> ScopeGuard<'r> {
    /// Record the realm's current scope and install `context` over it.
    pub fn enter(realm: &'r Realm, context: &ExecutionContext) -> Self {
        let saved = realm.install(|page| context.scope_over(page));
        tracing::trace!(page_global = saved.object.id(), "entered console scope");
        Self { realm, saved }
    }

    /// The scope that will be restored.
    #[must_use]
    pub const fn saved(&self) -> &GlobalScope {
        &self.saved
    }
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.realm.restore(self.saved.clone());
        tracing::trace!(page_global = self.saved.object.id(), "left console scope");
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use super::*;
    use crate::value::{Object, ObjectRef};

    fn page_realm() -> (Realm, GlobalScope) {
        let page = GlobalScope::new(ObjectRef::new(Object::ordinary()));
        (Realm::new(page.clone()), page)
    }

    #[test]
    fn test_guard_installs_and_restores() {
        let (realm, page) = page_realm();
        let context = ExecutionContext::new(&page.object);

        {
            let guard = ScopeGuard::enter(&realm, &context);
            assert!(guard.saved().same_as(&page));
            assert!(realm.global_object().ptr_eq(context.global_object()));
            assert!(realm.declarations().ptr_eq(context.declarations()));
        }

        assert!(realm.active_scope().same_as(&page));
    }

    #[test]
    fn test_guard_restores_on_panic() {
        let (realm, page) = page_realm();
        let context = ExecutionContext::new(&page.object);

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            let _guard = ScopeGuard::enter(&realm, &context);
            panic!("evaluation blew up");
        }));

        assert!(outcome.is_err());
        assert!(realm.active_scope().same_as(&page));
    }

    #[test]
    fn test_guard_restores_on_early_return() {
        fn evaluate(realm: &Realm, context: &ExecutionContext) -> Result<(), &'static str> {
            let _guard = ScopeGuard::enter(realm, context);
            Err::<(), _>("thrown")?;
            Ok(())
        }

        let (realm, page) = page_realm();
        let context = ExecutionContext::new(&page.object);
        assert!(evaluate(&realm, &context).is_err());
        assert!(realm.active_scope().same_as(&page));
    }
}
