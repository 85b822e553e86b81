//! Frame production: clock, compositing, captions, and the scheduling state machine.

pub(crate) mod blend;
pub mod caption;
pub mod clock;
pub mod compositor;
pub mod frame;
pub mod motion;
pub mod scheduler;
