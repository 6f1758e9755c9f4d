use bevy::prelude::*;

use super::message::{EncodeError, VehicleRpc};
use crate::components::PersistentId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Delivery {
    /// Fire and forget, may be dropped or reordered
    Unreliable,
    /// Delivered once, in order
    Reliable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Recipients {
    /// Every participant except the sender
    AllOthers,
    /// The server only
    Server,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub vehicle: PersistentId,
    pub rpc: VehicleRpc,
    pub delivery: Delivery,
    pub recipients: Recipients,
}

impl OutboundMessage {
    /// RPC id and encoded body, ready for the transport
    pub fn encode(&self) -> Result<(u8, Vec<u8>), EncodeError> {
        Ok((self.rpc.kind() as u8, self.rpc.encode()?))
    }
}

/// Explicit RPCs queued during a tick for the host transport to send.
///
/// Under [`VehicleSyncPlugin`](crate::plugins::VehicleSyncPlugin) the queue is
/// emptied into `OutboundRpcReady` events at the end of every fixed step.
/// Hosts driving the tick functions directly must drain it themselves.
#[derive(Resource, Debug, Default)]
pub struct NetworkOutbox {
    messages: Vec<OutboundMessage>,
}

impl NetworkOutbox {
    pub fn send(
        &mut self,
        vehicle: PersistentId,
        rpc: VehicleRpc,
        delivery: Delivery,
        recipients: Recipients,
    ) {
        self.messages.push(OutboundMessage {
            vehicle,
            rpc,
            delivery,
            recipients,
        });
    }

    pub fn drain(&mut self) -> impl Iterator<Item = OutboundMessage> + '_ {
        self.messages.drain(..)
    }

    pub fn iter(&self) -> impl Iterator<Item = &OutboundMessage> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
