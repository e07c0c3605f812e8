//! The console's dedicated execution context.

use crate::{
    realm::{Environment, GlobalScope},
    value::{Object, ObjectRef, Value},
};

/// Global scope owned by a console session.
///
/// Its global object forwards every property it does not own to the page's
/// global object, so console input reads and mutates real page state.
/// Top-level lexical declarations made from console input land in the
/// console's own declarative record and stay invisible to the page.
#[derive(Debug)]
pub struct ExecutionContext {
    global: ObjectRef,
    declarations: Environment,
}

impl ExecutionContext {
    /// Build the console global for `page_global`.
    ///
    /// The object is assembled while still unshared and published in one
    /// step, so nothing can observe it half-initialised.
    #[must_use]
    pub fn new(page_global: &ObjectRef) -> Self {
        let staged = Object::forwarding(page_global.clone());
        Self {
            global: ObjectRef::new(staged),
            declarations: Environment::new(),
        }
    }

    /// The console's global object.
    #[must_use]
    pub const fn global_object(&self) -> &ObjectRef {
        &self.global
    }

    /// Console-local top-level declarations.
    #[must_use]
    pub const fn declarations(&self) -> &Environment {
        &self.declarations
    }

    /// Scope to install while console input runs over `page`.
    ///
    /// `this` stays bound to the page's global object.
    #[must_use]
    pub fn scope_over(&self, page: &GlobalScope) -> GlobalScope {
        GlobalScope {
            object: self.global.clone(),
            this_value: Value::Object(page.object.clone()),
            declarations: self.declarations.clone(),
        }
    }
}
