use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("queue is at capacity, message dropped")]
    QueueFull,
    #[error("no response received within the configured timeout")]
    Timeout,
    #[error("the worker handling this queue has terminated")]
    WorkerTerminated,
    #[error("command {0:?} is not recognised by this replier")]
    UnknownCommand(String),
}
