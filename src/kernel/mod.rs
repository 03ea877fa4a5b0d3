//! The voice dialogue kernel: a pure state machine plus its telemetry.
//! Nothing in here performs I/O; the runtime driver executes side effects.

pub mod controller;
pub mod effect;
pub mod event;
pub mod mode;
pub mod state;
pub mod stopwords;
pub mod telemetry;
pub mod time;
