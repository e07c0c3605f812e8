//! Tree-walking evaluator over the shared value model.

use std::{collections::HashMap, sync::Arc};

use page_console_core::{
    ConsoleClient, Diagnostic, Environment, GlobalScope, Interpreter, LogLevel, Object, ObjectRef,
    PrinterArguments, Realm, Value,
    printer::{Group, Trace, join_values},
    realm::Assignment,
    value::Callable,
};

use crate::{
    ast::{
        BinaryOp, DeclarationKind, Expr, FunctionDecl, LogicalOp, Property, Script, Stmt, UnaryOp,
    },
    builtins::{self, Builtin, ConsoleMethod, ScriptFunction, assertion_message, count_message},
    parser,
};

/// Script call nesting limit.
pub const MAX_CALL_DEPTH: usize = 48;

/// `Err` carries a thrown value.
type Completion<T> = Result<T, Value>;

enum Flow {
    /// Statement finished; carries the value of the last expression statement.
    Normal(Option<Value>),
    Return(Value),
}

/// Name resolution state for a point in the program.
#[derive(Debug, Clone)]
pub struct Scope {
    chain: Vec<Environment>,
    var_env: Option<Environment>,
    this: Value,
    global: GlobalScope,
}

impl Scope {
    fn top_level(global: GlobalScope) -> Self {
        Self {
            chain: Vec::new(),
            var_env: None,
            this: global.this_value.clone(),
            global,
        }
    }

    fn child(&self) -> Self {
        let mut scope = self.clone();
        scope.chain.push(Environment::new());
        scope
    }

    fn lexical_env(&self) -> &Environment {
        self.chain.last().unwrap_or(&self.global.declarations)
    }
}

/// Reference script engine for the page console.
///
/// Owns a page realm whose global object carries the `console` namespace and
/// the error constructors. Scripts run against whatever scope the realm has
/// active when [`Interpreter::run`] is called.
#[derive(Debug)]
pub struct ScriptInterpreter {
    realm: Arc<Realm>,
    page_global: ObjectRef,
    call_stack: Vec<String>,
    counters: HashMap<String, u32>,
}

impl Default for ScriptInterpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptInterpreter {
    #[must_use]
    pub fn new() -> Self {
        let page_global = builtins::page_global();
        Self {
            realm: Arc::new(Realm::new(GlobalScope::new(page_global.clone()))),
            page_global,
            call_stack: Vec::new(),
            counters: HashMap::new(),
        }
    }

    /// The page's own global object (`window`).
    #[must_use]
    pub const fn page_global(&self) -> &ObjectRef {
        &self.page_global
    }
}

impl Interpreter for ScriptInterpreter {
    type Script = Script;

    fn realm(&self) -> &Arc<Realm> {
        &self.realm
    }

    fn parse(&self, source: &str) -> Result<Script, Diagnostic> {
        parser::parse(source).map_err(|err| err.to_diagnostic(source))
    }

    fn run(&mut self, script: &Script, console: &mut dyn ConsoleClient) -> Result<Value, Value> {
        self.call_stack.clear();
        let scope = Scope::top_level(self.realm.active_scope());
        let mut evaluation = Evaluation {
            stack: &mut self.call_stack,
            counters: &mut self.counters,
            console,
        };

        match evaluation.exec_statements(&scope, &script.body)? {
            Flow::Normal(value) => Ok(value.unwrap_or_default()),
            Flow::Return(value) => Ok(value),
        }
    }
}

struct Evaluation<'a> {
    stack: &'a mut Vec<String>,
    counters: &'a mut HashMap<String, u32>,
    console: &'a mut dyn ConsoleClient,
}

impl Evaluation<'_> {
    fn error(&self, name: &str, message: impl Into<String>) -> Value {
        let mut error = Object::error(name, message);
        if !self.stack.is_empty() {
            let frames = self
                .stack
                .iter()
                .rev()
                .map(|frame| format!("at {frame}"))
                .collect::<Vec<_>>()
                .join("\n");
            error.define("stack", Value::String(frames));
        }
        Value::Object(ObjectRef::new(error))
    }

    fn type_error(&self, message: impl Into<String>) -> Value {
        self.error("TypeError", message)
    }

    // Statements

    fn hoist(scope: &Scope, body: &[Stmt]) {
        for stmt in body {
            if let Stmt::Function(decl) = stmt {
                let function = make_function(decl, scope);
                declare_var(scope, &decl.name, function, true);
            }
        }
    }

    fn exec_statements(&mut self, scope: &Scope, body: &[Stmt]) -> Completion<Flow> {
        Self::hoist(scope, body);
        let mut last = None;
        for stmt in body {
            match self.exec(scope, stmt)? {
                Flow::Normal(Some(value)) => last = Some(value),
                Flow::Normal(None) => {}
                flow @ Flow::Return(_) => return Ok(flow),
            }
        }
        Ok(Flow::Normal(last))
    }

    fn exec(&mut self, scope: &Scope, stmt: &Stmt) -> Completion<Flow> {
        match stmt {
            Stmt::Expr(expr) => Ok(Flow::Normal(Some(self.eval(scope, expr)?))),
            Stmt::Declaration { kind, declarators } => {
                for (name, init) in declarators {
                    let value = match init {
                        Some(expr) => Some(self.eval(scope, expr)?),
                        None => None,
                    };
                    match kind {
                        DeclarationKind::Var => {
                            let overwrite = value.is_some();
                            declare_var(scope, name, value.unwrap_or_default(), overwrite);
                        }
                        DeclarationKind::Let => {
                            scope
                                .lexical_env()
                                .declare(name.as_str(), value.unwrap_or_default(), true);
                        }
                        DeclarationKind::Const => {
                            scope
                                .lexical_env()
                                .declare(name.as_str(), value.unwrap_or_default(), false);
                        }
                    }
                }
                Ok(Flow::Normal(None))
            }
            Stmt::Function(_) | Stmt::Empty => Ok(Flow::Normal(None)),
            Stmt::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(scope, expr)?,
                    None => Value::Undefined,
                };
                Ok(Flow::Return(value))
            }
            Stmt::If {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(scope, test)?.is_truthy() {
                    self.exec(scope, consequent)
                } else if let Some(alternate) = alternate {
                    self.exec(scope, alternate)
                } else {
                    Ok(Flow::Normal(None))
                }
            }
            Stmt::While { test, body } => {
                let mut last = None;
                while self.eval(scope, test)?.is_truthy() {
                    match self.exec(scope, body)? {
                        Flow::Normal(Some(value)) => last = Some(value),
                        Flow::Normal(None) => {}
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
                Ok(Flow::Normal(last))
            }
            Stmt::Block(body) => self.exec_statements(&scope.child(), body),
            Stmt::Throw(expr) => Err(self.eval(scope, expr)?),
            Stmt::Try {
                block,
                param,
                handler,
                finalizer,
            } => {
                let result = match (self.exec_statements(&scope.child(), block), handler) {
                    (Err(thrown), Some(handler)) => {
                        let catch_scope = scope.child();
                        if let Some(param) = param {
                            catch_scope
                                .lexical_env()
                                .declare(param.as_str(), thrown, true);
                        }
                        self.exec_statements(&catch_scope, handler)
                    }
                    (result, _) => result,
                };

                if let Some(finalizer) = finalizer {
                    if let Flow::Return(value) = self.exec_statements(&scope.child(), finalizer)? {
                        return Ok(Flow::Return(value));
                    }
                }
                result
            }
        }
    }

    // Expressions

    fn eval(&mut self, scope: &Scope, expr: &Expr) -> Completion<Value> {
        match expr {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::String(s) => Ok(Value::String(s.clone())),
            Expr::Bool(b) => Ok(Value::Boolean(*b)),
            Expr::Null => Ok(Value::Null),
            Expr::Ident(name) => self.lookup(scope, name),
            Expr::This => Ok(scope.this.clone()),
            Expr::Array(elements) => {
                let values = elements
                    .iter()
                    .map(|element| self.eval(scope, element))
                    .collect::<Completion<Vec<_>>>()?;
                Ok(Value::Object(ObjectRef::new(Object::array(values))))
            }
            Expr::Object(properties) => {
                let mut object = Object::ordinary();
                for (key, value) in properties {
                    object.define(key.as_str(), self.eval(scope, value)?);
                }
                Ok(Value::Object(ObjectRef::new(object)))
            }
            Expr::Function(decl) => Ok(make_function(decl, scope)),
            Expr::Unary { op, operand } => self.eval_unary(scope, *op, operand),
            Expr::Binary { op, left, right } => {
                let left = self.eval(scope, left)?;
                let right = self.eval(scope, right)?;
                Ok(binary(*op, &left, &right))
            }
            Expr::Logical { op, left, right } => {
                let left = self.eval(scope, left)?;
                match (op, left.is_truthy()) {
                    (LogicalOp::And, true) | (LogicalOp::Or, false) => self.eval(scope, right),
                    _ => Ok(left),
                }
            }
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(scope, test)?.is_truthy() {
                    self.eval(scope, consequent)
                } else {
                    self.eval(scope, alternate)
                }
            }
            Expr::Assign { target, op, value } => self.eval_assign(scope, target, *op, value),
            Expr::Member { object, property } => {
                let object = self.eval(scope, object)?;
                let key = self.property_key(scope, property)?;
                self.get_member(&object, &key)
            }
            Expr::Call { callee, args } => {
                let (function, this) = match callee.as_ref() {
                    Expr::Member { object, property } => {
                        let object = self.eval(scope, object)?;
                        let key = self.property_key(scope, property)?;
                        (self.get_member(&object, &key)?, object)
                    }
                    other => (self.eval(scope, other)?, scope.global.this_value.clone()),
                };
                let args = self.eval_args(scope, args)?;
                self.call(&function, this, args, &callee_label(callee))
            }
            Expr::New { callee, args } => {
                let constructor = self.eval(scope, callee)?;
                let args = self.eval_args(scope, args)?;
                self.construct(&constructor, args, &callee_label(callee))
            }
        }
    }

    fn eval_args(&mut self, scope: &Scope, args: &[Expr]) -> Completion<Vec<Value>> {
        args.iter().map(|arg| self.eval(scope, arg)).collect()
    }

    fn eval_unary(&mut self, scope: &Scope, op: UnaryOp, operand: &Expr) -> Completion<Value> {
        if let (UnaryOp::Typeof, Expr::Ident(name)) = (op, operand) {
            if resolve(scope, name).is_none() {
                return Ok(Value::from("undefined"));
            }
        }

        let value = self.eval(scope, operand)?;
        Ok(match op {
            UnaryOp::Negate => Value::Number(-value.to_number()),
            UnaryOp::Plus => Value::Number(value.to_number()),
            UnaryOp::Not => Value::Boolean(!value.is_truthy()),
            UnaryOp::Typeof => Value::from(value.type_of()),
        })
    }

    fn eval_assign(
        &mut self,
        scope: &Scope,
        target: &Expr,
        op: Option<BinaryOp>,
        value: &Expr,
    ) -> Completion<Value> {
        match target {
            Expr::Ident(name) => {
                let value = match op {
                    Some(op) => {
                        let current = self.lookup(scope, name)?;
                        binary(op, &current, &self.eval(scope, value)?)
                    }
                    None => self.eval(scope, value)?,
                };
                self.assign(scope, name, value.clone())?;
                Ok(value)
            }
            Expr::Member { object, property } => {
                let object = self.eval(scope, object)?;
                let key = self.property_key(scope, property)?;
                let value = match op {
                    Some(op) => {
                        let current = self.get_member(&object, &key)?;
                        binary(op, &current, &self.eval(scope, value)?)
                    }
                    None => self.eval(scope, value)?,
                };
                self.set_member(&object, key, value.clone())?;
                Ok(value)
            }
            _ => Err(self.error("SyntaxError", "Invalid assignment target")),
        }
    }

    fn property_key(&mut self, scope: &Scope, property: &Property) -> Completion<String> {
        match property {
            Property::Named(name) => Ok(name.clone()),
            Property::Computed(expr) => Ok(self.eval(scope, expr)?.to_display_string()),
        }
    }

    fn get_member(&self, object: &Value, key: &str) -> Completion<Value> {
        match object {
            Value::Object(object) => Ok(object.get(key)),
            Value::String(s) if key == "length" => {
                #[allow(clippy::cast_precision_loss)]
                Ok(Value::Number(s.chars().count() as f64))
            }
            Value::String(s) => Ok(key
                .parse::<usize>()
                .ok()
                .and_then(|index| s.chars().nth(index))
                .map_or(Value::Undefined, |c| Value::String(c.to_string()))),
            Value::Undefined | Value::Null => Err(self.type_error(format!(
                "Cannot read properties of {} (reading '{key}')",
                object.to_display_string()
            ))),
            Value::Boolean(_) | Value::Number(_) => Ok(Value::Undefined),
        }
    }

    fn set_member(&self, object: &Value, key: String, value: Value) -> Completion<()> {
        match object {
            Value::Object(object) => {
                object.set(key, value);
                Ok(())
            }
            Value::Undefined | Value::Null => Err(self.type_error(format!(
                "Cannot set properties of {} (setting '{key}')",
                object.to_display_string()
            ))),
            _ => Ok(()),
        }
    }

    // Names

    fn lookup(&self, scope: &Scope, name: &str) -> Completion<Value> {
        resolve(scope, name).ok_or_else(|| self.error("ReferenceError", format!("{name} is not defined")))
    }

    fn assign(&self, scope: &Scope, name: &str, value: Value) -> Completion<()> {
        let records = scope
            .chain
            .iter()
            .rev()
            .chain(std::iter::once(&scope.global.declarations));
        for env in records {
            match env.assign(name, value.clone()) {
                Assignment::Assigned => return Ok(()),
                Assignment::Immutable => {
                    return Err(self.type_error("Assignment to constant variable."));
                }
                Assignment::Missing => {}
            }
        }

        scope.global.object.set(name, value);
        Ok(())
    }

    // Calls

    fn call(
        &mut self,
        function: &Value,
        this: Value,
        args: Vec<Value>,
        label: &str,
    ) -> Completion<Value> {
        let Some(callable) = function.as_object().and_then(ObjectRef::callable) else {
            return Err(self.type_error(format!("{label} is not a function")));
        };

        if let Some(builtin) = callable.as_any().downcast_ref::<Builtin>() {
            return match *builtin {
                Builtin::Console(method) => {
                    self.call_console(method, args);
                    Ok(Value::Undefined)
                }
                Builtin::ErrorConstructor(name) => Ok(self.construct_error(name, &args)),
            };
        }

        match callable.as_any().downcast_ref::<ScriptFunction>() {
            Some(function) => self.call_script(function, this, args),
            None => Err(self.type_error(format!("{label} is not a function"))),
        }
    }

    fn call_script(
        &mut self,
        function: &ScriptFunction,
        this: Value,
        args: Vec<Value>,
    ) -> Completion<Value> {
        if self.stack.len() >= MAX_CALL_DEPTH {
            return Err(self.error("RangeError", "Maximum call stack size exceeded"));
        }

        let env = Environment::new();
        let mut args = args.into_iter();
        for param in &function.decl.params {
            env.declare(param.as_str(), args.next().unwrap_or_default(), true);
        }

        let mut chain = function.closure.chain.clone();
        chain.push(env.clone());
        let scope = Scope {
            chain,
            var_env: Some(env),
            this,
            global: function.closure.global.clone(),
        };

        let name = function.name().to_string();
        tracing::trace!(function = %name, depth = self.stack.len(), "call");
        self.stack.push(name);
        let result = self.exec_statements(&scope, &function.decl.body);
        self.stack.pop();

        match result? {
            Flow::Return(value) => Ok(value),
            Flow::Normal(_) => Ok(Value::Undefined),
        }
    }

    fn construct(&mut self, constructor: &Value, args: Vec<Value>, label: &str) -> Completion<Value> {
        let callable = constructor.as_object().and_then(ObjectRef::callable);
        let Some(callable) = callable else {
            return Err(self.type_error(format!("{label} is not a constructor")));
        };

        if let Some(Builtin::ErrorConstructor(name)) = callable.as_any().downcast_ref::<Builtin>() {
            return Ok(self.construct_error(name, &args));
        }

        match callable.as_any().downcast_ref::<ScriptFunction>() {
            Some(function) => {
                let instance = Value::Object(ObjectRef::new(Object::ordinary()));
                let result = self.call_script(function, instance.clone(), args)?;
                Ok(if result.is_object() { result } else { instance })
            }
            None => Err(self.type_error(format!("{label} is not a constructor"))),
        }
    }

    fn construct_error(&self, name: &str, args: &[Value]) -> Value {
        let message = match args.first() {
            None | Some(Value::Undefined) => String::new(),
            Some(value) => value.to_display_string(),
        };
        self.error(name, message)
    }

    fn call_console(&mut self, method: ConsoleMethod, args: Vec<Value>) {
        let level = method.level();
        match method {
            ConsoleMethod::Log
            | ConsoleMethod::Info
            | ConsoleMethod::Warn
            | ConsoleMethod::Error
            | ConsoleMethod::Debug => {
                self.console.printer(level, PrinterArguments::Values(args));
            }
            ConsoleMethod::Trace => {
                let trace = Trace {
                    label: join_values(&args),
                    stack: self.stack.iter().rev().cloned().collect(),
                };
                self.console.printer(level, PrinterArguments::Trace(trace));
            }
            ConsoleMethod::Group | ConsoleMethod::GroupCollapsed => {
                let group = Group {
                    label: join_values(&args),
                };
                self.console.printer(level, PrinterArguments::Group(group));
            }
            ConsoleMethod::GroupEnd => self.console.end_group(),
            ConsoleMethod::Clear => self.console.clear(),
            ConsoleMethod::Count => {
                let label = counter_label(&args);
                let count = {
                    let count = self.counters.entry(label.clone()).or_insert(0);
                    *count += 1;
                    *count
                };
                let message = count_message(&label, count);
                self.console
                    .printer(level, PrinterArguments::Values(vec![Value::String(message)]));
            }
            ConsoleMethod::CountReset => {
                let label = counter_label(&args);
                if let Some(count) = self.counters.get_mut(&label) {
                    *count = 0;
                } else {
                    let message = format!("Count for '{label}' does not exist");
                    self.console
                        .printer(level, PrinterArguments::Values(vec![Value::String(message)]));
                }
            }
            ConsoleMethod::Assert => {
                if !args.first().is_some_and(Value::is_truthy) {
                    let message = assertion_message(args.get(1..).unwrap_or_default());
                    self.console.printer(
                        LogLevel::Error,
                        PrinterArguments::Values(vec![Value::String(message)]),
                    );
                }
            }
        }
    }
}

fn make_function(decl: &Arc<FunctionDecl>, scope: &Scope) -> Value {
    let function = ScriptFunction {
        decl: Arc::clone(decl),
        closure: scope.clone(),
    };
    Value::Object(ObjectRef::new(Object::function(Arc::new(function))))
}

/// `var` and function declarations: function scope, or the global object at
/// top level.
fn declare_var(scope: &Scope, name: &str, value: Value, overwrite: bool) {
    match &scope.var_env {
        Some(env) => {
            if overwrite || !env.has(name) {
                env.declare(name, value, true);
            }
        }
        None => {
            if overwrite || !scope.global.object.has_property(name) {
                scope.global.object.set(name, value);
            }
        }
    }
}

fn resolve(scope: &Scope, name: &str) -> Option<Value> {
    scope
        .chain
        .iter()
        .rev()
        .chain(std::iter::once(&scope.global.declarations))
        .find_map(|env| env.lookup(name))
        .map(|binding| binding.value)
        .or_else(|| {
            scope
                .global
                .object
                .has_property(name)
                .then(|| scope.global.object.get(name))
        })
}

fn counter_label(args: &[Value]) -> String {
    match args.first() {
        None | Some(Value::Undefined) => "default".to_string(),
        Some(value) => value.to_display_string(),
    }
}

fn callee_label(callee: &Expr) -> String {
    match callee {
        Expr::Ident(name) => name.clone(),
        Expr::This => "this".to_string(),
        Expr::Member {
            object,
            property: Property::Named(name),
        } => format!("{}.{name}", callee_label(object)),
        Expr::Member { object, .. } => format!("{}[...]", callee_label(object)),
        _ => "expression".to_string(),
    }
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Value {
    match op {
        BinaryOp::Add => {
            let concatenates = |value: &Value| matches!(value, Value::String(_) | Value::Object(_));
            if concatenates(left) || concatenates(right) {
                Value::String(left.to_display_string() + &right.to_display_string())
            } else {
                Value::Number(left.to_number() + right.to_number())
            }
        }
        BinaryOp::Sub => Value::Number(left.to_number() - right.to_number()),
        BinaryOp::Mul => Value::Number(left.to_number() * right.to_number()),
        BinaryOp::Div => Value::Number(left.to_number() / right.to_number()),
        BinaryOp::Rem => Value::Number(left.to_number() % right.to_number()),
        BinaryOp::Less | BinaryOp::Greater | BinaryOp::LessEq | BinaryOp::GreaterEq => {
            Value::Boolean(compare(op, left, right))
        }
        BinaryOp::Eq => Value::Boolean(left.loose_equals(right)),
        BinaryOp::NotEq => Value::Boolean(!left.loose_equals(right)),
        BinaryOp::StrictEq => Value::Boolean(left.strict_equals(right)),
        BinaryOp::StrictNotEq => Value::Boolean(!left.strict_equals(right)),
    }
}

fn compare(op: BinaryOp, left: &Value, right: &Value) -> bool {
    if let (Value::String(a), Value::String(b)) = (left, right) {
        return match op {
            BinaryOp::Less => a < b,
            BinaryOp::Greater => a > b,
            BinaryOp::LessEq => a <= b,
            _ => a >= b,
        };
    }

    let (a, b) = (left.to_number(), right.to_number());
    match op {
        BinaryOp::Less => a < b,
        BinaryOp::Greater => a > b,
        BinaryOp::LessEq => a <= b,
        _ => a >= b,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
    }

    impl ConsoleClient for Recorder {
        fn printer(&mut self, level: LogLevel, arguments: PrinterArguments) {
            let text = match arguments {
                PrinterArguments::Values(values) => join_values(&values),
                PrinterArguments::Trace(trace) => {
                    format!("{}|{}", trace.label, trace.stack.join(","))
                }
                PrinterArguments::Group(group) => group.label,
            };
            self.calls.push(format!("{level}:{text}"));
        }

        fn clear(&mut self) {
            self.calls.push("clear".into());
        }

        fn end_group(&mut self) {
            self.calls.push("groupEnd".into());
        }
    }

    fn run(interpreter: &mut ScriptInterpreter, source: &str) -> (Result<Value, Value>, Vec<String>) {
        let script = interpreter.parse(source).unwrap();
        let mut recorder = Recorder::default();
        let result = interpreter.run(&script, &mut recorder);
        (result, recorder.calls)
    }

    fn eval(source: &str) -> Result<Value, Value> {
        run(&mut ScriptInterpreter::new(), source).0
    }

    fn thrown_message(result: Result<Value, Value>) -> String {
        let thrown = result.unwrap_err();
        let error = thrown.as_object().unwrap();
        format!(
            "{}: {}",
            error.get("name").to_display_string(),
            error.get("message").to_display_string()
        )
    }

    #[test]
    fn test_arithmetic_and_completion_value() {
        assert_eq!(eval("1+1").unwrap(), Value::Number(2.0));
        assert_eq!(eval("let a = 2; a * 3; let b = 1").unwrap(), Value::Number(6.0));
        assert_eq!(eval("'a' + 1").unwrap(), Value::from("a1"));
        assert_eq!(eval("7 % 4 === 3 ? 'yes' : 'no'").unwrap(), Value::from("yes"));
    }

    #[test]
    fn test_closures_keep_state() {
        let source = "function counter() { let n = 0; return function () { n += 1; return n; }; }
                      let next = counter(); next(); next()";
        assert_eq!(eval(source).unwrap(), Value::Number(2.0));
    }

    #[test]
    fn test_top_level_bindings() {
        let mut interpreter = ScriptInterpreter::new();
        let (result, _) = run(&mut interpreter, "var a = 1; b = 2; let c = 3; function f() {}");
        assert!(result.is_ok());

        let window = interpreter.page_global().clone();
        assert_eq!(window.get("a"), Value::Number(1.0));
        assert_eq!(window.get("b"), Value::Number(2.0));
        assert_eq!(window.get("f").type_of(), "function");
        assert!(!window.has_property("c"));
        assert!(interpreter.realm().declarations().has("c"));
    }

    #[test]
    fn test_block_and_function_bindings_stay_local() {
        let mut interpreter = ScriptInterpreter::new();
        let (result, _) = run(
            &mut interpreter,
            "{ let inner = 1; } function f() { var local = 2; } f(); typeof inner",
        );
        assert_eq!(result.unwrap(), Value::from("undefined"));
        assert!(!interpreter.page_global().has_property("inner"));
        assert!(!interpreter.page_global().has_property("local"));
    }

    #[test]
    fn test_runtime_errors() {
        assert_eq!(
            thrown_message(eval("missing + 1")),
            "ReferenceError: missing is not defined"
        );
        assert_eq!(
            thrown_message(eval("const k = 1; k = 2")),
            "TypeError: Assignment to constant variable."
        );
        assert_eq!(
            thrown_message(eval("null.x")),
            "TypeError: Cannot read properties of null (reading 'x')"
        );
        assert_eq!(
            thrown_message(eval("let o = {}; o.go()")),
            "TypeError: o.go is not a function"
        );
        assert_eq!(
            thrown_message(eval("function f() { return f(); } f()")),
            "RangeError: Maximum call stack size exceeded"
        );
    }

    #[test]
    fn test_throw_values_and_try() {
        assert_eq!(eval("throw 5").unwrap_err(), Value::Number(5.0));
        assert_eq!(
            eval("let log = ''; try { throw new Error('x') } catch (e) { log += e.message } finally { log += '!' } log")
                .unwrap(),
            Value::from("x!")
        );
    }

    #[test]
    fn test_error_stack_lists_calls_innermost_first() {
        let thrown = eval("function inner() { throw new TypeError('bad') } function outer() { inner() } outer()")
            .unwrap_err();
        let error = thrown.as_object().unwrap();
        assert!(error.is_error());
        assert_eq!(error.get("stack"), Value::from("at inner\nat outer"));
    }

    #[test]
    fn test_console_methods() {
        let mut interpreter = ScriptInterpreter::new();
        let (_, calls) = run(
            &mut interpreter,
            "console.log('a', 1); console.group('g'); console.groupEnd(); console.clear();
             console.count(); console.count(); console.countReset('x');
             console.assert(1 === 2, 'math'); console.assert(true);
             function f() { console.trace('here') } f()",
        );
        assert_eq!(
            calls,
            vec![
                "log:a 1",
                "group:g",
                "groupEnd",
                "clear",
                "count:default: 1",
                "count:default: 2",
                "countReset:Count for 'x' does not exist",
                "error:Assertion failed: math",
                "trace:here|f",
            ]
        );
    }

    #[test]
    fn test_this_and_new() {
        assert_eq!(
            eval("function Point(x) { this.x = x } let p = new Point(3); p.x").unwrap(),
            Value::Number(3.0)
        );
        assert_eq!(eval("typeof this").unwrap(), Value::from("object"));
        assert_eq!(eval("[1, 2, 3].length + 'abc'.length").unwrap(), Value::Number(6.0));
    }
}
