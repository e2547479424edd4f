//! Fan-out notification broker.
//!
//! Delivers every published [`TodoEvent`](crate::TodoEvent) to every
//! currently registered subscription, in publish order.

mod notification_broker;
pub use notification_broker::*;
