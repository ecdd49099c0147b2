//! Chat Commands
//!
//! Command registry, dispatcher, and the built-in command modules.
//! Every command module exposes a `register` function; [`register_builtin`]
//! calls them in order before any message is dispatched.

pub mod dispatch;
pub mod error;
pub mod main;
pub mod registry;
pub mod types;

pub use dispatch::{DispatchOutcome, Dispatcher, Invocation};
pub use error::{CommandError, RegistryError, Result};
pub use registry::CommandRegistry;
pub use types::{ChatMessage, CommandDescriptor, CommandHandler, CommandSummary};

/// Register every built-in command module.
///
/// Stops at the first conflict; the caller should treat that as fatal.
pub fn register_builtin<C: ?Sized + Sync>(
    registry: &mut CommandRegistry<C>,
) -> std::result::Result<(), RegistryError> {
    main::register(registry)?;
    Ok(())
}

/// Build the frozen built-in registry in one step
pub fn builtin_registry<C: ?Sized + Sync>() -> std::result::Result<CommandRegistry<C>, RegistryError> {
    let mut registry = CommandRegistry::new();
    register_builtin(&mut registry)?;
    Ok(registry)
}
