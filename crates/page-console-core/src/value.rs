//! Script value model shared by the interpreter, the scope switcher and the
//! markup generator.

use std::{
    any::Any,
    fmt,
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

/// A function object's behavior.
///
/// The interpreter owns the concrete implementations and recovers them with
/// [`Callable::as_any`]; everything else only needs the name.
pub trait Callable: Send + Sync + fmt::Debug {
    /// Function name as shown in markup and call traces.
    fn name(&self) -> &str;

    /// Downcast hook for the interpreter.
    fn as_any(&self) -> &dyn Any;
}

/// What an object is, beyond its property table.
#[derive(Debug, Clone)]
pub enum ObjectKind {
    /// Plain object.
    Ordinary,
    /// Array; indexed values live in the element vector.
    Array,
    /// Error object carrying `name`, `message` and optionally `stack`.
    Error,
    /// Callable object.
    Function(Arc<dyn Callable>),
    /// Object whose missing properties resolve on another object.
    Forwarding(ObjectRef),
}

/// Largest array index plus one; larger numeric keys are plain properties.
const MAX_ARRAY_LENGTH: usize = u32::MAX as usize;

/// How far past its current length a single write may grow an array. Writes
/// further out are kept as plain properties.
pub const MAX_ARRAY_GROWTH: usize = 1 << 16;

/// Canonical array index for `key`, if it is one.
fn array_index(key: &str) -> Option<usize> {
    let index = key.parse::<usize>().ok()?;
    (index < MAX_ARRAY_LENGTH && index.to_string() == key).then_some(index)
}

/// An object under construction or behind an [`ObjectRef`].
///
/// A bare `Object` is inert: nothing else can observe it until it is
/// published with [`ObjectRef::new`].
#[derive(Debug)]
pub struct Object {
    kind: ObjectKind,
    properties: Vec<(String, Value)>,
    elements: Vec<Value>,
}

impl Object {
    fn with_kind(kind: ObjectKind) -> Self {
        Self {
            kind,
            properties: Vec::new(),
            elements: Vec::new(),
        }
    }

    /// Create an empty plain object.
    #[must_use]
    pub fn ordinary() -> Self {
        Self::with_kind(ObjectKind::Ordinary)
    }

    /// Create an array holding `elements`.
    #[must_use]
    pub fn array(elements: Vec<Value>) -> Self {
        let mut object = Self::with_kind(ObjectKind::Array);
        object.elements = elements;
        object
    }

    /// Create an error object with the given constructor name and message.
    #[must_use]
    pub fn error(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_kind(ObjectKind::Error)
            .with_property("name", Value::String(name.into()))
            .with_property("message", Value::String(message.into()))
    }

    /// Create a function object.
    #[must_use]
    pub fn function(callable: Arc<dyn Callable>) -> Self {
        Self::with_kind(ObjectKind::Function(callable))
    }

    /// Create an object that forwards unresolved lookups and writes to `target`.
    #[must_use]
    pub fn forwarding(target: ObjectRef) -> Self {
        Self::with_kind(ObjectKind::Forwarding(target))
    }

    /// Builder-style property definition.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.define(key, value);
        self
    }

    /// Define or overwrite an own property.
    pub fn define(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        if let Some(slot) = self.properties.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.properties.push((key, value));
        }
    }

    fn own(&self, key: &str) -> Option<&Value> {
        self.properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    fn array_slot(&self, key: &str) -> Option<Value> {
        if !matches!(self.kind, ObjectKind::Array) {
            return None;
        }
        if key == "length" {
            #[allow(clippy::cast_precision_loss)]
            return Some(Value::Number(self.elements.len() as f64));
        }
        array_index(key).and_then(|i| self.elements.get(i).cloned())
    }

    /// Store `value` at an element slot, growing the vector within bounds.
    /// Returns the value back when `key` is not a slot this write may fill.
    fn set_element(&mut self, key: &str, value: Value) -> Option<Value> {
        let Some(index) = array_index(key) else {
            return Some(value);
        };
        let len = self.elements.len();
        if index < len {
            self.elements[index] = value;
            return None;
        }
        match index.checked_sub(len) {
            Some(gap) if gap < MAX_ARRAY_GROWTH => {
                self.elements.resize(index, Value::Undefined);
                self.elements.push(value);
                None
            }
            _ => Some(value),
        }
    }
}

/// Shared handle to a published object.
#[derive(Clone)]
pub struct ObjectRef(Arc<RwLock<Object>>);

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectRef({:#x})", self.id())
    }
}

impl ObjectRef {
    /// Publish a fully built object.
    #[must_use]
    pub fn new(object: Object) -> Self {
        Self(Arc::new(RwLock::new(object)))
    }

    fn read(&self) -> RwLockReadGuard<'_, Object> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Object> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Identity of the underlying allocation.
    #[must_use]
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.0).cast::<()>() as usize
    }

    /// Whether both handles refer to the same object.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    #[must_use]
    pub fn kind(&self) -> ObjectKind {
        self.read().kind.clone()
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self.read().kind, ObjectKind::Error)
    }

    /// The callable behind a function object.
    #[must_use]
    pub fn callable(&self) -> Option<Arc<dyn Callable>> {
        match &self.read().kind {
            ObjectKind::Function(callable) => Some(Arc::clone(callable)),
            _ => None,
        }
    }

    /// Target of a forwarding object.
    #[must_use]
    pub fn forwarding_target(&self) -> Option<Self> {
        match &self.read().kind {
            ObjectKind::Forwarding(target) => Some(target.clone()),
            _ => None,
        }
    }

    /// Own property lookup, without forwarding.
    #[must_use]
    pub fn get_own(&self, key: &str) -> Option<Value> {
        let object = self.read();
        object.array_slot(key).or_else(|| object.own(key).cloned())
    }

    /// Property lookup, following forwarding. Missing keys yield `undefined`.
    #[must_use]
    pub fn get(&self, key: &str) -> Value {
        let target = {
            let object = self.read();
            if let Some(value) = object.array_slot(key).or_else(|| object.own(key).cloned()) {
                return value;
            }
            match &object.kind {
                ObjectKind::Forwarding(target) => target.clone(),
                _ => return Value::Undefined,
            }
        };
        target.get(key)
    }

    /// Whether `key` resolves on this object or its forwarding target.
    #[must_use]
    pub fn has_property(&self, key: &str) -> bool {
        let target = {
            let object = self.read();
            if object.array_slot(key).is_some() || object.own(key).is_some() {
                return true;
            }
            match &object.kind {
                ObjectKind::Forwarding(target) => target.clone(),
                _ => return false,
            }
        };
        target.has_property(key)
    }

    /// Property write. A forwarding object without an own `key` writes through
    /// to its target.
    pub fn set(&self, key: impl Into<String>, value: Value) {
        let key = key.into();
        let (target, value) = {
            let mut object = self.write();
            let value = if matches!(object.kind, ObjectKind::Array) {
                match object.set_element(&key, value) {
                    Some(value) => value,
                    None => return,
                }
            } else {
                value
            };
            match &object.kind {
                ObjectKind::Forwarding(target) if object.own(&key).is_none() => {
                    (target.clone(), value)
                }
                _ => {
                    object.define(key, value);
                    return;
                }
            }
        };
        target.set(key, value);
    }

    /// Remove a property, following forwarding when it is not an own property.
    pub fn delete(&self, key: &str) -> bool {
        let target = {
            let mut object = self.write();
            if let Some(pos) = object.properties.iter().position(|(k, _)| k == key) {
                object.properties.remove(pos);
                return true;
            }
            match &object.kind {
                ObjectKind::Forwarding(target) => target.clone(),
                _ => return false,
            }
        };
        target.delete(key)
    }

    /// Own properties in insertion order.
    #[must_use]
    pub fn entries(&self) -> Vec<(String, Value)> {
        self.read().properties.clone()
    }

    /// Array elements (empty for non-arrays).
    #[must_use]
    pub fn elements(&self) -> Vec<Value> {
        self.read().elements.clone()
    }
}

/// A script value.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
    Object(ObjectRef),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.strict_equals(other)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<ObjectRef> for Value {
    fn from(value: ObjectRef) -> Self {
        Self::Object(value)
    }
}

impl Value {
    #[must_use]
    pub const fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Self::Object(object) => Some(object),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_object(&self) -> bool {
        matches!(self, Self::Object(_))
    }

    #[must_use]
    pub const fn is_nullish(&self) -> bool {
        matches!(self, Self::Undefined | Self::Null)
    }

    /// `typeof` result.
    #[must_use]
    pub fn type_of(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "object",
            Self::Object(_) if self.callable().is_some() => "function",
            Self::Object(_) => "object",
            Self::Boolean(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
        }
    }

    fn callable(&self) -> Option<Arc<dyn Callable>> {
        self.as_object().and_then(ObjectRef::callable)
    }

    /// Boolean conversion.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Undefined | Self::Null => false,
            Self::Boolean(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::String(s) => !s.is_empty(),
            Self::Object(_) => true,
        }
    }

    /// Numeric conversion.
    #[must_use]
    pub fn to_number(&self) -> f64 {
        match self {
            Self::Undefined => f64::NAN,
            Self::Null => 0.0,
            Self::Boolean(b) => f64::from(u8::from(*b)),
            Self::Number(n) => *n,
            Self::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse().unwrap_or(f64::NAN)
                }
            }
            Self::Object(_) => Self::String(self.to_display_string()).to_number(),
        }
    }

    /// String conversion used for concatenation and console argument joining.
    #[must_use]
    pub fn to_display_string(&self) -> String {
        match self {
            Self::Undefined => "undefined".to_string(),
            Self::Null => "null".to_string(),
            Self::Boolean(b) => b.to_string(),
            Self::Number(n) => number_to_string(*n),
            Self::String(s) => s.clone(),
            Self::Object(object) => object_to_string(object, &mut Vec::new()),
        }
    }

    /// `===`.
    #[must_use]
    pub fn strict_equals(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            #[allow(clippy::float_cmp)]
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// `==`.
    #[must_use]
    pub fn loose_equals(&self, other: &Self) -> bool {
        if self.is_nullish() || other.is_nullish() {
            return self.is_nullish() && other.is_nullish();
        }
        if std::mem::discriminant(self) == std::mem::discriminant(other) {
            return self.strict_equals(other);
        }
        match (self, other) {
            (Self::Object(_), _) => Self::String(self.to_display_string()).loose_equals(other),
            (_, Self::Object(_)) => self.loose_equals(&Self::String(other.to_display_string())),
            #[allow(clippy::float_cmp)]
            _ => self.to_number() == other.to_number(),
        }
    }
}

fn object_to_string(object: &ObjectRef, seen: &mut Vec<usize>) -> String {
    if seen.contains(&object.id()) {
        return String::new();
    }
    match object.kind() {
        ObjectKind::Array => {
            seen.push(object.id());
            let joined = object
                .elements()
                .iter()
                .map(|element| match element {
                    Value::Undefined | Value::Null => String::new(),
                    Value::Object(inner) => object_to_string(inner, seen),
                    other => other.to_display_string(),
                })
                .collect::<Vec<_>>()
                .join(",");
            seen.pop();
            joined
        }
        ObjectKind::Error => {
            let name = object.get("name").to_display_string();
            let message = object.get("message").to_display_string();
            if message.is_empty() {
                name
            } else {
                format!("{name}: {message}")
            }
        }
        ObjectKind::Function(callable) => {
            format!("function {}() {{ [native code] }}", callable.name())
        }
        ObjectKind::Ordinary | ObjectKind::Forwarding(_) => "[object Object]".to_string(),
    }
}

/// Render a number the way script source would print it.
#[must_use]
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        (if n > 0.0 { "Infinity" } else { "-Infinity" }).to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        #[allow(clippy::cast_possible_truncation)]
        let integer = n as i128;
        integer.to_string()
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_formatting() {
        assert_eq!(number_to_string(2.0), "2");
        assert_eq!(number_to_string(-0.0), "0");
        assert_eq!(number_to_string(0.5), "0.5");
        assert_eq!(number_to_string(f64::NAN), "NaN");
        assert_eq!(number_to_string(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_forwarding_reads_and_writes_reach_target() {
        let target = ObjectRef::new(Object::ordinary().with_property("a", Value::from(1.0)));
        let proxy = ObjectRef::new(Object::forwarding(target.clone()));

        assert_eq!(proxy.get("a"), Value::Number(1.0));
        proxy.set("b", Value::from("x"));
        assert_eq!(target.get("b"), Value::from("x"));
        assert!(proxy.get_own("b").is_none());
        assert!(proxy.delete("a"));
        assert!(!target.has_property("a"));
    }

    #[test]
    fn test_array_length_and_growth() {
        let array = ObjectRef::new(Object::array(vec![Value::from(1.0)]));
        array.set("3", Value::from(true));
        assert_eq!(array.get("length"), Value::Number(4.0));
        assert_eq!(array.get("1"), Value::Undefined);
        assert_eq!(Value::Object(array).to_display_string(), "1,,,true");
    }

    #[test]
    fn test_out_of_range_indices_become_properties() {
        let array = ObjectRef::new(Object::array(Vec::new()));

        array.set("18446744073709551615", Value::from(1.0));
        array.set("4294967295", Value::from(2.0));
        array.set("1000000000", Value::from(3.0));
        array.set("01", Value::from(4.0));

        assert_eq!(array.get("length"), Value::Number(0.0));
        assert_eq!(array.get("18446744073709551615"), Value::Number(1.0));
        assert_eq!(array.get("4294967295"), Value::Number(2.0));
        assert_eq!(array.get("1000000000"), Value::Number(3.0));
        assert_eq!(array.get("01"), Value::Number(4.0));
        assert_eq!(array.get("1"), Value::Undefined);
    }

    #[test]
    fn test_array_growth_is_bounded() {
        let array = ObjectRef::new(Object::array(vec![Value::Null]));
        let last = MAX_ARRAY_GROWTH.to_string();
        array.set(last.as_str(), Value::from(true));
        #[allow(clippy::cast_precision_loss)]
        let grown = (MAX_ARRAY_GROWTH + 1) as f64;
        assert_eq!(array.get("length"), Value::Number(grown));

        let far = (MAX_ARRAY_GROWTH * 3).to_string();
        array.set(far.as_str(), Value::from(false));
        assert_eq!(array.get("length"), Value::Number(grown));
        assert_eq!(array.get(&far), Value::Boolean(false));
    }

    #[test]
    fn test_loose_equality() {
        assert!(Value::Null.loose_equals(&Value::Undefined));
        assert!(Value::from("2").loose_equals(&Value::from(2.0)));
        assert!(!Value::from("2").strict_equals(&Value::from(2.0)));
        assert!(!Value::Number(f64::NAN).loose_equals(&Value::Number(f64::NAN)));
    }

    #[test]
    fn test_error_to_string() {
        let error = ObjectRef::new(Object::error("TypeError", "nope"));
        assert_eq!(Value::Object(error).to_display_string(), "TypeError: nope");
    }
}
