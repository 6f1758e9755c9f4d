mod behaviour;
mod simulation;
mod sync;

pub use behaviour::{
    IgnoreReason, RpcContext, RpcOutcome, TickContext, TickReport, VehicleBehaviour,
};
pub use simulation::{
    advance_clock_system, create_physics, create_physics_system, simple_body_step_system,
    simulate_tick, vehicle_post_simulate_system, vehicle_simulation_system,
};
pub use sync::{
    apply_replicated_fields, flush_outbox_system, flush_replication_system, handle_rpc,
    on_network_transform_update, receive_network_transform_system,
    receive_replicated_fields_system, receive_rpc_system, synchronize_variables,
    NetworkTransformReceived, OutboundRpcReady, ReplicatedFieldsReceived, ReplicationBatchReady,
    VehicleRpcReceived,
};
