pub mod fsm;
pub mod knee;
pub mod session;

pub use fsm::SquatState;
pub use knee::{KneeState, KneeThresholds, DOWN_ANGLE, UP_ANGLE};
pub use session::Session;
