pub mod command;
pub mod window;

use super::WmState;
use crate::actor::bus::Bus;

/// Wires every handler and subscriber the layout core provides.
pub fn register(bus: &mut Bus<WmState>) {
    command::register(bus);
    window::register(bus);
}
