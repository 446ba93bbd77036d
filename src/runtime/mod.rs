pub mod branch;
pub mod driver;
pub mod interpreter;
pub mod session;
pub mod types;

pub use driver::TurnDriver;
pub use interpreter::NodeInterpreter;
pub use session::{SessionRegistry, SessionState};
pub use types::{NextPosition, TurnContext, TurnOutcome, TurnPosition, TurnRequest};
