//! In-process transport layer (spec §4.6): bounded queues, fan-out
//! pub/sub, and a request/reply worker pattern shared by the picker
//! pipeline and the associator service.

pub mod error;
pub mod pubsub;
pub mod queue;
pub mod reqrep;

pub use error::TransportError;
pub use pubsub::{InProcessBus, InProcessSubscription, Publisher, Subscriber};
pub use queue::BoundedQueue;
pub use reqrep::{CommandReplier, CommandReplyServer, ReplyServer, RequestClient};
