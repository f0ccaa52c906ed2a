pub mod config;
pub mod controller;
pub mod crouch;
pub mod ellipse;
pub mod events;
pub mod ground;
pub mod horizontal;
pub mod input;
pub mod probe;
pub mod rapier_world;
pub mod rotation;
pub mod settings;
pub mod sprint;
pub mod types;
pub mod utils;
pub mod vertical;

#[cfg(test)]
mod testing;

pub use config::{
    CrouchConfig, GroundConfig, JumpConfig, LocomotionConfig, MovementConfig, ProbeFilter,
    RotationConfig, SprintConfig,
};
pub use controller::{ActivationWarning, FirstPersonController};
pub use ellipse::{DirectionalScales, ellipse_scaled};
pub use events::{EventFlags, EventQueue, FlagBit, LocomotionEvent};
pub use input::{InputChannel, InputTable};
pub use probe::{CharacterBody, ObstructionProbe, SphereCast};
pub use rapier_world::{BodyKind, ColliderShapeDef, RapierQueryWorld, WorldColliderDef};
pub use types::{EntityId, ProbeHit, Quat, Vec2, Vec3};
