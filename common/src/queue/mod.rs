// Queue integration: NATS JetStream client and the pipeline launcher

pub mod launcher;
pub mod nats;

pub use launcher::NatsPipelineLauncher;
pub use nats::{NatsClient, NatsConfig};
