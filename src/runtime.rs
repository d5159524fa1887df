//! Connecting handler methods to live event sources.
//!
//! A class lists its handlers once in a table of [`HandlerSpec`] values and its
//! constructor calls [`bind_handlers`] after the widget tree is built. Each
//! `(path, event)` binding becomes one subscription whose receiver is held
//! through a `Weak` handle, so a dropped object stops receiving events.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use thiserror::Error;

/// A value carried by a signal emission.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s:?}"),
        }
    }
}

type Slot = Rc<dyn Fn(&[Value])>;

/// A named event source. Subscribers run in connection order.
pub struct Signal {
    name: String,
    slots: RefCell<Vec<Slot>>,
}

impl Signal {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), slots: RefCell::new(Vec::new()) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn connect<F>(&self, slot: F)
    where
        F: Fn(&[Value]) + 'static,
    {
        self.slots.borrow_mut().push(Rc::new(slot));
    }

    /// Deliver `args` to every subscriber. Slots may connect further slots while running;
    /// those only see later emissions.
    pub fn emit(&self, args: &[Value]) {
        let slots: Vec<Slot> = self.slots.borrow().clone();
        for slot in slots {
            slot(args);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.slots.borrow().len()
    }
}

impl fmt::Debug for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("name", &self.name)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Widgets and widget trees. Dotted binding paths walk `child` one segment at a time.
pub trait Emitter {
    fn signal(&self, event: &str) -> Option<&Signal>;

    fn child(&self, name: &str) -> Option<&dyn Emitter> {
        let _ = name;
        None
    }
}

/// One handler method and the events it subscribes to.
pub struct HandlerSpec<T> {
    name: &'static str,
    method: fn(&T, &[Value]),
    bindings: Vec<(String, String)>,
}

impl<T> HandlerSpec<T> {
    pub fn new(name: &'static str, method: fn(&T, &[Value])) -> Self {
        Self { name, method, bindings: Vec::new() }
    }

    /// Subscribe to `event` on the emitter at dotted `path`.
    pub fn on(mut self, path: impl Into<String>, event: impl Into<String>) -> Self {
        self.bindings.push((path.into(), event.into()));
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn bindings(&self) -> &[(String, String)] {
        &self.bindings
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BindError {
    #[error("handler `{handler}`: `{path}` has no member `{segment}`")]
    MissingChild { handler: &'static str, path: String, segment: String },

    #[error("handler `{handler}`: `{path}` has no signal `{event}`")]
    MissingSignal { handler: &'static str, path: String, event: String },
}

/// Connect every binding in `table` on `this`. Returns the number of subscriptions made.
///
/// Stops at the first binding that cannot be resolved; earlier subscriptions stay connected.
pub fn bind_handlers<T>(this: &Rc<T>, table: &[HandlerSpec<T>]) -> Result<usize, BindError>
where
    T: Emitter + 'static,
{
    let mut connected = 0;
    for spec in table {
        for (path, event) in &spec.bindings {
            let signal = locate(&**this, spec.name, path, event)?;
            let receiver: Weak<T> = Rc::downgrade(this);
            let method = spec.method;
            signal.connect(move |args| {
                if let Some(this) = receiver.upgrade() {
                    method(&this, args);
                }
            });
            tracing::trace!(handler = spec.name, path = %path, event = %event, "handler connected");
            connected += 1;
        }
    }
    Ok(connected)
}

fn locate<'a>(root: &'a dyn Emitter, handler: &'static str, path: &str, event: &str) -> Result<&'a Signal, BindError> {
    let mut current = root;
    for segment in path.split('.') {
        current = current.child(segment).ok_or_else(|| BindError::MissingChild {
            handler,
            path: path.to_string(),
            segment: segment.to_string(),
        })?;
    }
    current.signal(event).ok_or_else(|| BindError::MissingSignal {
        handler,
        path: path.to_string(),
        event: event.to_string(),
    })
}
