//! Secondary notification hooks for generated events.
//!
//! This crate provides:
//! - `Notifier` trait for pluggable notification channels
//! - A webhook notifier
//! - Minijinja template rendering for notification messages
//! - A channel dispatcher fanning notifications out to every channel
//! - `NotifyHook`, which plugs all of the above into the rule dispatcher

pub mod dispatcher;
pub mod hook;
pub mod templating;
pub mod traits;
pub mod webhook;

pub use dispatcher::ChannelDispatcher;
pub use hook::NotifyHook;
pub use traits::{Notifier, NotifyError};
pub use webhook::WebhookNotifier;
