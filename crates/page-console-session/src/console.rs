//! A console session: evaluates input in the console scope, logs the output
//! and keeps the remote peer informed.

use std::sync::Arc;

use page_console_core::{
    ConsoleClient, ConsolePeer, Diagnostic, Entry, ExecutionContext, Interpreter, LogLevel,
    MessageBatch, MessageLog, Object, ObjectRef, Printer, PrinterArguments, ScopeGuard, SyncError,
    Value, get_messages,
    markup::{escape_html_entities, html_from_error, html_from_value},
};
use uuid::Uuid;

use crate::config::ConsoleConfig;

/// Appends to the log and notifies the peer of each new index.
struct Output<'a> {
    log: &'a mut MessageLog,
    peer: Option<&'a Arc<dyn ConsolePeer>>,
    printer: &'a Printer,
}

impl Output<'_> {
    fn append(&mut self, entry: Entry) -> usize {
        let index = self.log.append(entry);
        if let Some(peer) = self.peer {
            peer.did_output_message(index);
        }
        index
    }
}

impl ConsoleClient for Output<'_> {
    fn printer(&mut self, level: LogLevel, arguments: PrinterArguments) {
        let entry = self.printer.print(level, arguments);
        self.append(entry);
    }

    fn clear(&mut self) {
        self.append(Entry::clear());
    }

    fn end_group(&mut self) {
        let entry = self.printer.end_group();
        self.append(entry);
    }
}

/// State of one console attached to a page.
///
/// Everything here runs on a single thread; see
/// [`ConsoleHandle`](crate::handle::ConsoleHandle) for the channel front end.
pub struct ConsoleSession<I: Interpreter> {
    id: Uuid,
    context: ExecutionContext,
    log: MessageLog,
    interpreter: I,
    printer: Printer,
    peer: Option<Arc<dyn ConsolePeer>>,
}

impl<I: Interpreter> ConsoleSession<I> {
    /// Create a session over the interpreter's page realm.
    ///
    /// The console scope forwards to whatever global object the realm has
    /// active at this point.
    #[must_use]
    pub fn new(interpreter: I, printer: Printer) -> Self {
        let page_global = interpreter.realm().global_object();
        let session = Self {
            id: Uuid::new_v4(),
            context: ExecutionContext::new(&page_global),
            log: MessageLog::new(),
            interpreter,
            printer,
            peer: None,
        };
        tracing::info!(session_id = %session.id, "console session created");
        session
    }

    #[must_use]
    pub fn with_config(interpreter: I, config: &ConsoleConfig) -> Self {
        Self::new(interpreter, config.printer())
    }

    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub const fn log(&self) -> &MessageLog {
        &self.log
    }

    #[must_use]
    pub const fn context(&self) -> &ExecutionContext {
        &self.context
    }

    #[must_use]
    pub const fn interpreter(&self) -> &I {
        &self.interpreter
    }

    fn output(&mut self) -> Output<'_> {
        Output {
            log: &mut self.log,
            peer: self.peer.as_ref(),
            printer: &self.printer,
        }
    }

    /// Evaluate one piece of console input.
    ///
    /// Console API calls made while running append their own entries; the
    /// completion (a value, a thrown exception, or a syntax error) is always
    /// appended last. Returns the index of that final entry.
    pub fn handle_input(&mut self, source: &str) -> usize {
        let Self {
            context,
            log,
            interpreter,
            printer,
            peer,
            ..
        } = self;
        let mut output = Output {
            log,
            peer: peer.as_ref(),
            printer,
        };

        let script = match interpreter.parse(source) {
            Ok(script) => script,
            Err(diagnostic) => {
                tracing::debug!(%diagnostic, "console input failed to parse");
                return output.append(Entry::html(syntax_error_html(source, &diagnostic)));
            }
        };

        let realm = Arc::clone(interpreter.realm());
        let completion = {
            let _guard = ScopeGuard::enter(&realm, context);
            interpreter.run(&script, &mut output)
        };

        let html = match completion {
            Ok(value) => html_from_value(&value),
            Err(thrown) => {
                tracing::debug!("console input threw");
                uncaught_html(&thrown)
            }
        };
        output.append(Entry::html(html))
    }

    /// Append pre-rendered markup.
    pub fn print_html(&mut self, html: impl Into<String>) -> usize {
        self.output().append(Entry::html(html))
    }

    /// Append a clear marker; earlier entries stay retrievable.
    pub fn clear_output(&mut self) -> usize {
        self.output().append(Entry::clear())
    }

    pub fn begin_group(&mut self, label: impl Into<String>, expanded: bool) -> usize {
        self.output().append(Entry::begin_group(label, expanded))
    }

    pub fn end_group(&mut self) -> usize {
        self.output().append(Entry::end_group())
    }

    /// Pull entries starting at `start_index`.
    ///
    /// # Errors
    /// Returns [`SyncError`] when the start index does not exist.
    pub fn get_messages(&self, start_index: usize) -> Result<MessageBatch, SyncError> {
        let batch = get_messages(&self.log, start_index)?;
        tracing::debug!(start_index, count = batch.len(), "answered message pull");
        Ok(batch)
    }

    /// Answer a pull through the attached peer: the batch on success, a
    /// misbehavior report otherwise. The log is never touched.
    pub fn send_messages(&self, start_index: usize) {
        let result = self.get_messages(start_index);
        let Some(peer) = &self.peer else {
            tracing::debug!(start_index, "pull with no peer attached");
            return;
        };
        match result {
            Ok(batch) => peer.did_get_messages(batch),
            Err(err) => {
                tracing::warn!(start_index, error = %err, "peer requested a missing index");
                peer.did_misbehave(&err.to_string());
            }
        }
    }

    /// Attach a peer, replacing any previous one.
    pub fn attach_peer(&mut self, peer: Arc<dyn ConsolePeer>) {
        if self.peer.replace(peer).is_some() {
            tracing::info!(session_id = %self.id, "console peer replaced");
        } else {
            tracing::info!(session_id = %self.id, "console peer attached");
        }
    }

    /// Detach `peer` if it is still the attached one. A peer that was
    /// already replaced leaves its successor in place.
    pub fn detach_peer(&mut self, peer: &Arc<dyn ConsolePeer>) {
        match &self.peer {
            Some(current) if std::ptr::addr_eq(Arc::as_ptr(current), Arc::as_ptr(peer)) => {
                self.peer = None;
                tracing::info!(session_id = %self.id, "console peer detached");
            }
            Some(_) => tracing::debug!(session_id = %self.id, "ignoring detach of a replaced peer"),
            None => {}
        }
    }
}

fn syntax_error_html(source: &str, diagnostic: &Diagnostic) -> String {
    let mut html = String::new();
    let hint = diagnostic.source_location_hint(source);
    if !hint.is_empty() {
        html.push_str("<pre>");
        html.push_str(&escape_html_entities(&hint));
        html.push_str("</pre>");
    }

    let error = ObjectRef::new(Object::error("SyntaxError", diagnostic.to_string()));
    html.push_str("Uncaught exception: ");
    html.push_str(&html_from_error(&error));
    html
}

fn uncaught_html(thrown: &Value) -> String {
    let markup = match thrown {
        Value::Object(object) => html_from_error(object),
        other => html_from_value(other),
    };
    format!("Uncaught exception: {markup}")
}

#[cfg(test)]
mod tests {
    use std::sync::{Mutex, PoisonError};

    use page_console_core::{EntryKind, Realm};
    use page_console_script::ScriptInterpreter;

    use super::*;

    #[derive(Default)]
    struct RecordingPeer {
        events: Mutex<Vec<String>>,
    }

    impl RecordingPeer {
        fn events(&self) -> Vec<String> {
            self.events
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        fn record(&self, event: String) {
            self.events
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(event);
        }
    }

    impl ConsolePeer for RecordingPeer {
        fn did_output_message(&self, index: usize) {
            self.record(format!("output {index}"));
        }

        fn did_get_messages(&self, batch: MessageBatch) {
            self.record(format!("batch {} {:?}", batch.start_index, batch.message_types));
        }

        fn did_misbehave(&self, reason: &str) {
            self.record(format!("misbehave {reason}"));
        }
    }

    fn session() -> ConsoleSession<ScriptInterpreter> {
        ConsoleSession::new(ScriptInterpreter::new(), Printer::silent())
    }

    fn payload(session: &ConsoleSession<ScriptInterpreter>, index: usize) -> String {
        session.log().get(index).unwrap().payload().to_string()
    }

    #[test]
    fn test_expression_appends_one_entry() {
        let mut session = session();
        let index = session.handle_input("1+1");

        assert_eq!(index, 0);
        assert_eq!(session.log().len(), 1);
        assert_eq!(session.log().get(0).unwrap().kind(), EntryKind::Html);
        assert_eq!(payload(&session, 0), "<span class=\"js-number\">2</span>");
    }

    #[test]
    fn test_statement_completion_renders_undefined() {
        let mut session = session();
        session.handle_input("let a = 1");
        assert_eq!(
            payload(&session, 0),
            "<span class=\"js-undefined\">undefined</span>"
        );
    }

    #[test]
    fn test_syntax_error_entry() {
        let mut session = session();
        session.handle_input("(");

        assert_eq!(session.log().len(), 1);
        let html = payload(&session, 0);
        assert!(html.starts_with("<pre>(\n ^</pre>Uncaught exception: "));
        assert!(html.contains("<span class=\"js-error-name\">SyntaxError</span>"));
        assert!(html.contains("(line: 1, column: 2)"));
    }

    #[test]
    fn test_syntax_error_on_trailing_empty_line() {
        let mut session = session();
        session.handle_input("(\n");

        let html = payload(&session, 0);
        assert!(html.starts_with("<pre>\n^</pre>Uncaught exception: "), "{html}");
        assert!(html.contains("(line: 2, column: 1)"));
    }

    #[test]
    fn test_long_operator_chain_is_a_syntax_error() {
        let mut session = session();
        session.handle_input(&format!("1{}", "+1".repeat(200_000)));
        session.handle_input("1+1");

        assert_eq!(session.log().len(), 2);
        let html = payload(&session, 0);
        assert!(html.contains("<span class=\"js-error-name\">SyntaxError</span>"));
        assert!(html.contains("Maximum nesting depth"));
        assert_eq!(payload(&session, 1), "<span class=\"js-number\">2</span>");
    }

    #[test]
    fn test_thrown_values() {
        let mut session = session();
        session.handle_input("throw new TypeError('nope')");
        session.handle_input("throw 'plain'");
        session.handle_input("throw {}");

        assert_eq!(
            payload(&session, 0),
            "Uncaught exception: <span class=\"js-error-name\">TypeError</span>: \
             <span class=\"js-error-message\">nope</span>"
        );
        assert_eq!(
            payload(&session, 1),
            "Uncaught exception: <span class=\"js-string\">&quot;plain&quot;</span>"
        );
        let plain = html_from_value(&Value::Object(ObjectRef::new(Object::ordinary())));
        assert_eq!(payload(&session, 2), format!("Uncaught exception: {plain}"));
    }

    #[test]
    fn test_console_calls_precede_completion() {
        let mut session = session();
        let last = session.handle_input("console.log('<b>'); console.group('g'); console.groupEnd(); 3");

        assert_eq!(last, 3);
        let types = session.get_messages(0).unwrap().message_types;
        assert_eq!(types, vec!["html", "group", "groupEnd", "html"]);
        assert_eq!(payload(&session, 0), "<span class=\"log\"> &lt;b&gt;</span>");
    }

    #[test]
    fn test_global_assignment_reaches_page() {
        let mut session = session();
        session.handle_input("globalThing = 5");
        session.handle_input("var viaVar = 1; let scoped = 2; { let inner = 3 } function f() { let local = 4 } f()");

        let window = session.interpreter().page_global().clone();
        assert_eq!(window.get("globalThing"), Value::Number(5.0));
        assert_eq!(window.get("viaVar"), Value::Number(1.0));
        for name in ["scoped", "inner", "local"] {
            assert!(!window.has_property(name), "{name} leaked to the page");
        }
        assert!(session.context().declarations().has("scoped"));
    }

    #[test]
    fn test_console_bindings_persist_between_inputs() {
        let mut session = session();
        session.handle_input("let counter = 1");
        session.handle_input("counter += 1");
        assert_eq!(payload(&session, 1), "<span class=\"js-number\">2</span>");
    }

    #[test]
    fn test_page_scope_restored_after_throw() {
        let mut session = session();
        let realm: Arc<Realm> = Arc::clone(session.interpreter().realm());
        let before = realm.active_scope();

        session.handle_input("throw new Error('x')");
        assert!(realm.active_scope().same_as(&before));
    }

    #[test]
    fn test_this_is_page_global() {
        let mut session = session();
        session.handle_input("this.fromThis = 1");
        assert_eq!(
            session.interpreter().page_global().get("fromThis"),
            Value::Number(1.0)
        );
    }

    #[test]
    fn test_groups_and_clear() {
        let mut session = session();
        session.print_html("first");
        session.begin_group("g", true);
        session.end_group();
        session.end_group();
        session.clear_output();

        let batch = session.get_messages(0).unwrap();
        assert_eq!(
            batch.message_types,
            vec!["html", "group", "groupEnd", "groupEnd", "clear"]
        );
        assert_eq!(batch.messages[0], "first");
        assert_eq!(batch.messages[1], "g");
    }

    #[test]
    fn test_peer_notified_per_append() {
        let mut session = session();
        let peer = Arc::new(RecordingPeer::default());
        let attached: Arc<dyn ConsolePeer> = peer.clone();
        session.attach_peer(Arc::clone(&attached));

        session.handle_input("console.log(1); 2");
        assert_eq!(peer.events(), vec!["output 0", "output 1"]);

        session.detach_peer(&attached);
        session.print_html("quiet");
        assert_eq!(peer.events().len(), 2);
    }

    #[test]
    fn test_send_messages_replies_or_reports() {
        let mut session = session();
        let peer = Arc::new(RecordingPeer::default());
        session.attach_peer(peer.clone());

        session.send_messages(0);
        session.print_html("a");
        session.send_messages(0);
        session.send_messages(5);

        assert_eq!(
            peer.events(),
            vec![
                "batch 0 []".to_string(),
                "output 0".to_string(),
                "batch 0 [\"html\"]".to_string(),
                "misbehave Requested non-existent console message index.".to_string(),
            ]
        );
        assert_eq!(session.log().len(), 1);
    }

    #[test]
    fn test_pull_errors() {
        let mut session = session();
        assert!(session.get_messages(0).unwrap().is_empty());
        assert!(session.get_messages(1).is_err());

        session.print_html("a");
        assert_eq!(session.get_messages(0).unwrap().len(), 1);
        assert!(session.get_messages(1).is_err());
    }

    #[test]
    fn test_stale_detach_keeps_newer_peer() {
        let mut session = session();
        let old = Arc::new(RecordingPeer::default());
        let new = Arc::new(RecordingPeer::default());
        let old_peer: Arc<dyn ConsolePeer> = old.clone();

        session.attach_peer(Arc::clone(&old_peer));
        session.attach_peer(new.clone());
        session.detach_peer(&old_peer);

        session.send_messages(0);
        session.handle_input("1");
        assert_eq!(new.events(), vec!["batch 0 []", "output 0"]);
        assert!(old.events().is_empty());
    }

    #[test]
    fn test_huge_array_index_does_not_abort() {
        let mut session = session();
        session.handle_input("let a = []; a['18446744073709551615'] = 1; a[1e15] = 2; a[4294967295] = 3");
        session.handle_input("[a.length, a['18446744073709551615'], a[1e15], a[4294967295]]");

        assert_eq!(session.log().len(), 2);
        let html = payload(&session, 1);
        for n in ["0", "1", "2", "3"] {
            assert!(html.contains(&format!("<span class=\"js-number\">{n}</span>")), "{html}");
        }
    }
}
