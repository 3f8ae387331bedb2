//! Convenient re-exports of commonly used types.
//!
//! The prelude can be imported with:
//! ```
//! use archetype_ecs::prelude::*;
//! ```

pub use crate::app::App;
pub use crate::command::CommandBuffer;
pub use crate::component::{Bundle, Component, DynamicComponent};
pub use crate::entity::EntityId;
pub use crate::error::{EcsError, Result};
pub use crate::plugin::Plugin;
pub use crate::query::Query;
pub use crate::registry::ComponentTypeId;
pub use crate::schedule::{Schedule, SystemGroup};
pub use crate::service::{InvocableService, ServiceTable};
pub use crate::system::{System, SystemAccess};
pub use crate::world::{World, WorldConfig};
