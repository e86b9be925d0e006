pub mod clock;

pub use clock::{elapsed_between, offset, Clock, ManualClock, SystemClock};
