//! Commands tagged `main`

mod ping;

pub use ping::Ping;

use super::{CommandRegistry, RegistryError};

pub fn register<C: ?Sized + Sync>(registry: &mut CommandRegistry<C>) -> Result<(), RegistryError> {
    registry.register(ping::descriptor())
}
