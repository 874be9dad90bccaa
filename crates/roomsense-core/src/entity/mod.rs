pub mod agent;

pub use agent::{AgentBody, HeldObject, Pose, Stance};
