//! Reactive navigation.

mod controller;

pub use controller::{NavDecision, NavigationController, NavigatorConfig};
