//! Built-in defaults: a flat collection of `pub const` values consulted by
//! `Settings::load` as the last fallback tier, and directly by call sites
//! that don't need the full `Settings` struct (e.g. test code).

/// Default AMQP host.
pub const DEFAULT_HOST: &str = "localhost";
/// Default AMQP port.
pub const DEFAULT_PORT: u16 = 5672;
/// Default SASL plaintext credentials.
pub const DEFAULT_USERNAME: &str = "guest";
pub const DEFAULT_PASSWORD: &str = "guest";

/// Topic exchange name.
pub const EXCHANGE_NAME: &str = "CargoNetSim.Exchange";
/// Inbound command queue + routing key.
pub const COMMAND_QUEUE: &str = "CargoNetSim.CommandQueue.ShipNetSim";
pub const COMMAND_ROUTING_KEY: &str = "CargoNetSim.Command.ShipNetSim";
/// Outbound response queue + routing key.
pub const RESPONSE_QUEUE: &str = "CargoNetSim.ResponseQueue.ShipNetSim";
pub const RESPONSE_ROUTING_KEY: &str = "CargoNetSim.Response.ShipNetSim";

/// Host identifier carried on every outbound event.
pub const HOST_ID: &str = "ShipNetSim";

/// Broker reconnect policy.
pub const CONNECT_MAX_ATTEMPTS: u32 = 5;
pub const CONNECT_BACKOFF_SECS: u64 = 5;

/// Outbound publish retry policy.
pub const PUBLISH_MAX_ATTEMPTS: u32 = 3;
pub const PUBLISH_RETRY_SECS: u64 = 1;

/// Consumer poll timeout while idle.
pub const CONSUME_POLL_MS: u64 = 100;
/// Busy back-off between poll attempts.
pub const BUSY_YIELD_MS: u64 = 100;

/// Ship loading admission control: a ship "clears" its origin point once
/// it has travelled at least its own waterline length.
pub const LOADING_ADMISSION_MULTIPLE: f64 = 1.0;

/// Forward-kick heuristic: speeds within this epsilon of zero (m/s) are
/// treated as "stopped" for the purposes of the stall-avoidance kick.
pub const KICK_FORWARD_EPSILON_MPS: f64 = 0.001;

/// Sentinel "no global speed cap" passed to `Ship::sail`. Intentionally not
/// `ship.current_max_speed()` — see DESIGN.md open question resolution.
pub const NO_SPEED_CAP_SENTINEL_MPS: f64 = 100.0;

/// `simulationProgressUpdate` is only re-emitted on a multiple of this
/// step.
pub const PROGRESS_EMIT_STEP_PERCENT: u8 = 5;

/// `ShipsResults` wire form omits the trajectory blob above this size.
pub const TRAJECTORY_BLOB_INLINE_LIMIT_BYTES: usize = 1024 * 1024;

/// Sentinel separating key/value pairs in the wire-encoded summary text.
pub const SUMMARY_KV_SENTINEL: &str = "\u{1D} :";

/// Default size of each World's job queue (bounded `crossbeam_channel`).
pub const WORLD_JOB_QUEUE_CAPACITY: usize = 256;
