//! The demo's remote interfaces and their implementations.

use rmi::{remote_interface, RemoteError, RmiError, Skeleton, Stub};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, PartialEq, thiserror::Error, Serialize, Deserialize)]
pub enum PingpongError {
    #[error("expected \"ping\", got {0:?}")]
    WrongInput(String),
    #[error(transparent)]
    Rmi(#[from] RmiError),
}

impl RemoteError for PingpongError {
    fn as_rmi(&self) -> Option<&RmiError> {
        match self {
            PingpongError::Rmi(err) => Some(err),
            _ => None,
        }
    }
}

remote_interface! {
    pub trait Pingpong {
        /// Answers `Pong <id>`.
        fn ping(&self, id: i32) -> Result<String, RmiError>;

        /// Answers `pong <round>` if `word` is `ping`.
        fn pingpong(&self, word: String, round: i32) -> Result<String, PingpongError>;
    }
}

pub struct Table;

impl Pingpong for Table {
    fn ping(&self, id: i32) -> Result<String, RmiError> {
        Ok(format!("Pong {}", id))
    }

    fn pingpong(&self, word: String, round: i32) -> Result<String, PingpongError> {
        if word == "ping" {
            Ok(format!("pong {}", round))
        } else {
            Err(PingpongError::WrongInput(word))
        }
    }
}

#[derive(Debug, PartialEq, thiserror::Error, Serialize, Deserialize)]
pub enum FactoryError {
    #[error("cannot serve a table on port {port}: {reason}")]
    Unavailable { port: u16, reason: String },
    #[error(transparent)]
    Rmi(#[from] RmiError),
}

impl RemoteError for FactoryError {
    fn as_rmi(&self) -> Option<&RmiError> {
        match self {
            FactoryError::Rmi(err) => Some(err),
            _ => None,
        }
    }
}

remote_interface! {
    pub trait Factory {
        /// Starts a new ping-pong table on `port` and returns a stub for it.
        fn make_pingpong(&self, port: u16) -> Result<Stub<dyn Pingpong>, FactoryError>;
    }
}

/// Keeps every table it creates running until it is dropped.
#[derive(Default)]
pub struct TableFactory {
    tables: Mutex<Vec<Skeleton<dyn Pingpong>>>,
}

impl TableFactory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Factory for TableFactory {
    fn make_pingpong(&self, port: u16) -> Result<Stub<dyn Pingpong>, FactoryError> {
        let unavailable = |reason: String| FactoryError::Unavailable { port, reason };

        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let skeleton = Skeleton::<dyn Pingpong>::bind(Arc::new(Table), addr)
            .map_err(|e| unavailable(e.to_string()))?;
        skeleton.start().map_err(|e| unavailable(e.to_string()))?;

        let stub = Stub::<dyn Pingpong>::for_skeleton_with_host(&skeleton, "localhost")
            .map_err(|e| unavailable(e.to_string()))?;
        tracing::info!("Serving a new table at {}", stub.address());

        self.tables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(skeleton);
        Ok(stub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn serve<I: ?Sized + rmi::RemoteInterface>(target: Arc<I>) -> Skeleton<I> {
        let skeleton = Skeleton::<I>::bind(target, "127.0.0.1:0".parse().unwrap()).unwrap();
        skeleton.start().unwrap();
        skeleton
    }

    #[test]
    fn test_ping() {
        let skeleton = serve::<dyn Pingpong>(Arc::new(Table));
        let stub = Stub::<dyn Pingpong>::for_skeleton(&skeleton).unwrap();

        assert_eq!(stub.ping(123).unwrap(), "Pong 123");
    }

    #[test]
    fn test_pingpong_rejects_wrong_word() {
        let skeleton = serve::<dyn Pingpong>(Arc::new(Table));
        let stub = Stub::<dyn Pingpong>::for_skeleton(&skeleton).unwrap();

        assert_eq!(stub.pingpong("ping".to_string(), 2).unwrap(), "pong 2");
        assert_eq!(
            stub.pingpong("pong".to_string(), 3).unwrap_err(),
            PingpongError::WrongInput("pong".to_string())
        );
    }

    #[test]
    fn test_factory_hands_out_tables() {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();

        let skeleton = serve::<dyn Factory>(Arc::new(TableFactory::new()));
        let factory = Stub::<dyn Factory>::for_skeleton(&skeleton).unwrap();

        let table = factory.make_pingpong(port).unwrap();
        assert_eq!(table.address().host(), "localhost");
        assert_eq!(table.address().port(), port);
        for round in 0..4 {
            assert_eq!(table.pingpong("ping".to_string(), round).unwrap(), format!("pong {}", round));
        }

        // The port is taken now.
        match factory.make_pingpong(port) {
            Err(FactoryError::Unavailable { port: p, .. }) => assert_eq!(p, port),
            other => panic!("Expected Unavailable, got {:?}", other),
        }
    }
}
