//! The focus session logic. [machine::FocusStateMachine] is pure: it reads and updates a
//! [state::SessionState] owned by the caller and returns [intent::Intent]s that the caller
//! executes.

pub mod clock;
pub mod intent;
pub mod machine;
pub mod state;
