pub mod bus;
pub mod reactor;

pub use bus::{Bus, BusError, Command, CommandResponse, Event};
