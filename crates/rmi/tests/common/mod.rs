//! Interfaces and implementations shared by the integration tests.

#![allow(dead_code)]

use rmi::{remote_interface, ApplicationFailure, ConfigError, RemoteError, RmiError, Skeleton, SkeletonHooks, Stub};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub sensor: String,
    pub values: Vec<f64>,
    pub calibrated: Option<bool>,
}

#[derive(Debug, PartialEq, thiserror::Error, Serialize, Deserialize)]
pub enum EchoError {
    #[error("value {0} is negative")]
    Negative(i64),
    #[error(transparent)]
    Rmi(#[from] RmiError),
}

impl RemoteError for EchoError {
    fn as_rmi(&self) -> Option<&RmiError> {
        match self {
            EchoError::Rmi(err) => Some(err),
            _ => None,
        }
    }
}

remote_interface! {
    /// Returns what it is given.
    pub trait Echo {
        fn identity(&self, value: i64) -> Result<i64, RmiError>;
        fn identity_text(&self, value: String) -> Result<String, RmiError>;
        fn identity_list(&self, values: Vec<i64>) -> Result<Vec<i64>, RmiError>;
        fn identity_reading(&self, reading: Reading) -> Result<Reading, RmiError>;
        fn non_negative(&self, value: i64) -> Result<i64, EchoError>;
        fn refuse(&self, message: String) -> Result<(), RmiError>;
        fn sleep(&self, millis: u64) -> Result<u64, RmiError>;
    }
}

pub struct Mirror;

impl Echo for Mirror {
    fn identity(&self, value: i64) -> Result<i64, RmiError> {
        Ok(value)
    }

    fn identity_text(&self, value: String) -> Result<String, RmiError> {
        Ok(value)
    }

    fn identity_list(&self, values: Vec<i64>) -> Result<Vec<i64>, RmiError> {
        Ok(values)
    }

    fn identity_reading(&self, reading: Reading) -> Result<Reading, RmiError> {
        Ok(reading)
    }

    fn non_negative(&self, value: i64) -> Result<i64, EchoError> {
        if value < 0 {
            Err(EchoError::Negative(value))
        } else {
            Ok(value)
        }
    }

    fn refuse(&self, message: String) -> Result<(), RmiError> {
        Err(RmiError::Remote(ApplicationFailure::new("Refused", message)))
    }

    fn sleep(&self, millis: u64) -> Result<u64, RmiError> {
        std::thread::sleep(Duration::from_millis(millis));
        Ok(millis)
    }
}

remote_interface! {
    /// Hands out stubs for skeletons it owns.
    pub trait EchoFactory {
        fn make_echo(&self) -> Result<Stub<dyn Echo>, RmiError>;
    }
}

pub struct Workshop {
    pub skeletons: Mutex<Vec<Skeleton<dyn Echo>>>,
}

impl EchoFactory for Workshop {
    fn make_echo(&self) -> Result<Stub<dyn Echo>, RmiError> {
        let skeleton = Skeleton::<dyn Echo>::bind(Arc::new(Mirror), "127.0.0.1:0".parse().unwrap())
            .map_err(config_failure)?;
        skeleton.start()?;
        let stub = Stub::<dyn Echo>::for_skeleton(&skeleton).map_err(config_failure)?;
        self.skeletons.lock().unwrap().push(skeleton);
        Ok(stub)
    }
}

fn config_failure(err: ConfigError) -> RmiError {
    RmiError::Remote(ApplicationFailure::new("ConfigError", err.to_string()))
}

remote_interface! {
    /// Passes calls on to another `Echo`.
    pub trait Relay {
        fn forward(&self, value: i64) -> Result<i64, EchoError>;
    }
}

pub struct Forwarder {
    pub downstream: Stub<dyn Echo>,
}

impl Relay for Forwarder {
    fn forward(&self, value: i64) -> Result<i64, EchoError> {
        let checked = self.downstream.non_negative(value)?;
        Ok(checked)
    }
}

/// Hook events in the order they happened.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    ListenError(RmiError),
    ServiceError(RmiError),
    Stopped(Option<RmiError>),
}

#[derive(Default)]
pub struct Recorder {
    pub events: Mutex<Vec<Event>>,
}

impl Recorder {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    /// Polls until `n` events were recorded; service errors are reported
    /// from worker threads after the client already saw its response.
    pub fn wait_for(&self, n: usize) -> Vec<Event> {
        for _ in 0..200 {
            let events = self.events();
            if events.len() >= n {
                return events;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        self.events()
    }
}

impl SkeletonHooks for Recorder {
    fn on_listen_error(&self, error: &RmiError) -> bool {
        self.events.lock().unwrap().push(Event::ListenError(error.clone()));
        false
    }

    fn on_service_error(&self, error: &RmiError) {
        self.events.lock().unwrap().push(Event::ServiceError(error.clone()));
    }

    fn on_stopped(&self, cause: Option<&RmiError>) {
        self.events.lock().unwrap().push(Event::Stopped(cause.cloned()));
    }
}

/// Starts a `Mirror` skeleton on a loopback port picked by the system.
pub fn start_mirror() -> (Skeleton<dyn Echo>, Stub<dyn Echo>) {
    let skeleton = Skeleton::<dyn Echo>::bind(Arc::new(Mirror), "127.0.0.1:0".parse().unwrap()).unwrap();
    skeleton.start().unwrap();
    let stub = Stub::<dyn Echo>::for_skeleton(&skeleton).unwrap();
    (skeleton, stub)
}
