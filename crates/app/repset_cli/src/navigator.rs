//! Terminal navigator: destinations print as screen transitions.

use repset_core::flows::{Destination, Navigator};

pub struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    fn go_to(&self, destination: Destination) {
        match destination {
            Destination::Login => println!("-> login"),
            Destination::Dashboard => println!("-> dashboard"),
            Destination::Workout(kind) => println!("-> workout/{kind}"),
        }
    }
}
