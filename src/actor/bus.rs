//! Synchronous in-process command/event bus.
//!
//! A command has exactly one handler and produces a [`CommandResponse`]; an
//! event has any number of subscribers. Handlers and subscribers receive the
//! bus itself so they can dispatch and publish further work. Nested calls run
//! to completion before the outer call continues.

use std::any::{Any, TypeId, type_name};
use std::fmt::Debug;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, trace, warn};

use crate::actor::reactor::ReactorError;
use crate::common::collections::HashMap;
use crate::model::tree::NodeId;

pub trait Command: Any + Debug {}

pub trait Event: Any + Debug {}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandResponse {
    pub success: bool,
    /// Container the command acted on, when there is one.
    pub subject: Option<NodeId>,
    pub error: Option<String>,
}

impl CommandResponse {
    pub fn ok() -> Self { Self { success: true, ..Default::default() } }

    pub fn with_subject(subject: NodeId) -> Self {
        Self { success: true, subject: Some(subject), error: None }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self { success: false, subject: None, error: Some(error.into()) }
    }
}

#[derive(Debug, Error)]
pub enum BusError {
    #[error("no handler registered for {0}")]
    NoHandler(&'static str),
    #[error("handler for {command} failed: {source}")]
    Handler {
        command: &'static str,
        source: Box<ReactorError>,
    },
    #[error("{} subscriber(s) of {event} failed", failures.len())]
    Subscribers {
        event: &'static str,
        failures: Vec<ReactorError>,
    },
}

type Handler<S> = Box<dyn Fn(&Bus<S>, &mut S, &dyn Any) -> Result<CommandResponse, ReactorError>>;
type Subscriber<S> = Box<dyn Fn(&Bus<S>, &mut S, &dyn Any) -> Result<(), ReactorError>>;

struct Registration<T> {
    name: &'static str,
    callback: T,
}

pub struct Bus<S> {
    handlers: HashMap<TypeId, Registration<Handler<S>>>,
    subscribers: HashMap<TypeId, Vec<Registration<Subscriber<S>>>>,
}

impl<S> Default for Bus<S> {
    fn default() -> Self {
        Self {
            handlers: HashMap::default(),
            subscribers: HashMap::default(),
        }
    }
}

impl<S: 'static> Bus<S> {
    pub fn new() -> Self { Self::default() }

    /// Registers the handler for `C`.
    ///
    /// # Panics
    ///
    /// If `C` already has a handler. This is a wiring mistake, not a runtime
    /// condition.
    pub fn handle<C: Command>(
        &mut self,
        handler: impl Fn(&Bus<S>, &mut S, &C) -> Result<CommandResponse, ReactorError> + 'static,
    ) {
        let name = type_name::<C>();
        assert!(
            !self.handlers.contains_key(&TypeId::of::<C>()),
            "duplicate handler registered for {name}"
        );
        let callback: Handler<S> = Box::new(move |bus, state, command| {
            let command = command.downcast_ref::<C>().ok_or_else(|| ReactorError::Invalid(name.into()))?;
            handler(bus, state, command)
        });
        self.handlers.insert(TypeId::of::<C>(), Registration { name, callback });
    }

    /// Adds a subscriber for `E`. Subscribers run in registration order.
    pub fn subscribe<E: Event>(
        &mut self,
        subscriber: impl Fn(&Bus<S>, &mut S, &E) -> Result<(), ReactorError> + 'static,
    ) {
        let name = type_name::<E>();
        let callback: Subscriber<S> = Box::new(move |bus, state, event| {
            let event = event.downcast_ref::<E>().ok_or_else(|| ReactorError::Invalid(name.into()))?;
            subscriber(bus, state, event)
        });
        self.subscribers.entry(TypeId::of::<E>()).or_default().push(Registration { name, callback });
    }

    #[instrument(name = "bus::dispatch", skip_all, fields(?command))]
    pub fn dispatch<C: Command>(&self, state: &mut S, command: C) -> Result<CommandResponse, BusError> {
        let Some(handler) = self.handlers.get(&TypeId::of::<C>()) else {
            warn!("no handler for {}", type_name::<C>());
            return Err(BusError::NoHandler(type_name::<C>()));
        };
        match (handler.callback)(self, state, &command) {
            Ok(response) => {
                trace!(?response);
                Ok(response)
            }
            Err(source) => Err(BusError::Handler {
                command: handler.name,
                source: Box::new(source),
            }),
        }
    }

    /// Delivers `event` to every subscriber. A failing subscriber does not
    /// stop the others; all failures are returned together.
    #[instrument(name = "bus::publish", skip_all, fields(?event))]
    pub fn publish<E: Event>(&self, state: &mut S, event: E) -> Result<(), BusError> {
        let Some(subscribers) = self.subscribers.get(&TypeId::of::<E>()) else {
            trace!("no subscribers");
            return Ok(());
        };
        let mut failures = vec![];
        for subscriber in subscribers {
            if let Err(e) = (subscriber.callback)(self, state, &event) {
                debug!(event = subscriber.name, %e, "subscriber failed");
                failures.push(e);
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(BusError::Subscribers { event: type_name::<E>(), failures })
        }
    }
}
