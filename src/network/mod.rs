mod authority;
pub mod message;
mod outbox;
pub mod replication;

pub use authority::{resolve_authority, Authority, SessionRole};
pub use message::{
    ClientSyncMessage, DecodeError, EncodeError, ExplodeMessage, RpcKind, VehicleRpc,
};
pub use outbox::{Delivery, NetworkOutbox, OutboundMessage, Recipients};
pub use replication::{
    FieldUpdate, FieldValue, FixedInterval, ReplicatedField, ReplicationBatch,
    ReplicationOutbox, ReplicationPolicy,
};
