pub mod logging;
pub mod poll;

pub use poll::PollPolicy;
