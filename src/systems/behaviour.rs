use nalgebra::Vector3;

use super::simulation::{create_physics, simulate_tick};
use super::sync::{apply_replicated_fields, handle_rpc};
use crate::{
    components::{BodyTransform, ParticipantId, Vehicle},
    network::{
        Authority, FieldUpdate, NetworkOutbox, ReplicationOutbox, SessionRole, VehicleRpc,
    },
    physics::RigidBody,
    resources::SimulationConfig,
};

/// Everything one vehicle tick may read or emit.
#[derive(Debug)]
pub struct TickContext<'a> {
    pub role: SessionRole,
    /// Local clock at the start of the tick [ms]
    pub now_ms: i32,
    /// Tick length [s]
    pub dt: f64,
    pub controller_send_interval: u32,
    pub outbox: &'a mut NetworkOutbox,
    pub replication: &'a mut ReplicationOutbox,
}

impl<'a> TickContext<'a> {
    pub fn new(
        config: &SimulationConfig,
        now_ms: i32,
        outbox: &'a mut NetworkOutbox,
        replication: &'a mut ReplicationOutbox,
    ) -> Self {
        Self {
            role: config.role,
            now_ms,
            dt: config.timestep,
            controller_send_interval: config.controller_send_interval,
            outbox,
            replication,
        }
    }
}

/// Receiving side of an RPC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RpcContext {
    pub role: SessionRole,
    pub now_ms: i32,
    pub sender: ParticipantId,
}

/// What one tick did, for hosts and tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub authority: Authority,
    pub grounded_wheels: usize,
    /// Linear impulse applied this tick [N·s]
    pub impulse: Vector3<f64>,
    /// Angular impulse applied this tick [N·m·s]
    pub torque_impulse: Vector3<f64>,
    /// Extrapolated target the body was moved toward
    pub predicted: Option<BodyTransform>,
}

impl TickReport {
    pub(crate) fn new(authority: Authority) -> Self {
        Self {
            authority,
            grounded_wheels: 0,
            impulse: Vector3::zeros(),
            torque_impulse: Vector3::zeros(),
            predicted: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Sent by this node
    OwnMessage,
    /// Not valid for the vehicle's network mode
    WrongMode,
    /// Not valid for this node's role
    WrongRole,
    /// Not newer than what was already applied
    Stale,
    /// Control input from someone other than the seated driver
    NotDriver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcOutcome {
    Applied,
    Ignored(IgnoreReason),
}

/// Host-facing hooks of a simulated vehicle.
///
/// The host owns the entity lifecycle and calls these; the vehicle never
/// spawns, despawns or schedules itself.
pub trait VehicleBehaviour {
    /// Body created; returns whether this node runs dynamics for it.
    fn on_create_physics(&mut self, role: SessionRole, body: &mut dyn RigidBody) -> bool;

    /// One fixed simulation step.
    fn on_tick(&mut self, ctx: &mut TickContext<'_>, body: &mut dyn RigidBody) -> TickReport;

    /// A decoded RPC addressed to this vehicle.
    fn on_rpc(&mut self, ctx: &RpcContext, rpc: &VehicleRpc) -> RpcOutcome;

    /// Replicated fields arrived for this vehicle. Routing by vehicle is the
    /// host's job; every update given here is applied.
    fn on_variables_synchronized(&mut self, updates: &[FieldUpdate]);
}

impl VehicleBehaviour for Vehicle {
    fn on_create_physics(&mut self, role: SessionRole, body: &mut dyn RigidBody) -> bool {
        create_physics(self, role, body)
    }

    fn on_tick(&mut self, ctx: &mut TickContext<'_>, body: &mut dyn RigidBody) -> TickReport {
        simulate_tick(self, body, ctx)
    }

    fn on_rpc(&mut self, ctx: &RpcContext, rpc: &VehicleRpc) -> RpcOutcome {
        handle_rpc(self, ctx, rpc)
    }

    fn on_variables_synchronized(&mut self, updates: &[FieldUpdate]) {
        apply_replicated_fields(self, updates)
    }
}
