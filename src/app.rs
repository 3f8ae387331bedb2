use crate::error::Result;
use crate::executor::Executor;
use crate::plugin::Plugin;
use crate::schedule::{Schedule, SystemGroup};
use crate::service::ServiceTable;
use crate::system::BoxedSystem;
use crate::world::World;

/// Glues one `World`, one `Schedule`, and one `ServiceTable` together and drives them through
/// the Driver interface (§6.5). Plugins register systems, services, and component types against
/// it; `add_plugin` namespaces everything a plugin registers under `plugin.name()`.
pub struct App {
    pub world: World,
    pub services: ServiceTable,
    executor: Executor,
    current_plugin: Option<String>,
}

impl App {
    pub fn new() -> Self {
        Self {
            world: World::new(),
            services: ServiceTable::new(),
            executor: Executor::new(Schedule::new()),
            current_plugin: None,
        }
    }

    pub fn schedule(&self) -> &Schedule {
        &self.executor.schedule
    }

    pub fn schedule_mut(&mut self) -> &mut Schedule {
        &mut self.executor.schedule
    }

    /// Builds `plugin` into this app, namespacing every system it registers under
    /// `plugin.name()` as that system's `owner`.
    pub fn add_plugin<P: Plugin>(&mut self, plugin: P) -> &mut Self {
        self.current_plugin = Some(plugin.name().to_string());
        plugin.build(self);
        self.current_plugin = None;
        self
    }

    /// Adds `system` to the `Simulation` group at priority 0, tagged with the currently-building
    /// plugin's name (if any) as its owner.
    pub fn add_system(&mut self, system: BoxedSystem) -> &mut Self {
        self.add_system_in(system, SystemGroup::Simulation, 0)
    }

    pub fn add_system_in(&mut self, system: BoxedSystem, group: SystemGroup, priority: i32) -> &mut Self {
        let owner = self.current_plugin.clone();
        self.executor.schedule.add_system_owned(system, group, priority, owner);
        self
    }

    /// Registers a named service under the currently-building plugin's name as owner.
    pub fn add_service<T: std::any::Any + Send + Sync>(&mut self, name: impl Into<String>, service: T) -> &mut Self {
        let owner = self.current_plugin.clone().unwrap_or_else(|| "app".to_string());
        self.services.register(name, owner, service);
        self
    }

    pub fn add_invocable_service<T: std::any::Any + crate::service::InvocableService>(
        &mut self,
        name: impl Into<String>,
        service: T,
    ) -> &mut Self {
        let owner = self.current_plugin.clone().unwrap_or_else(|| "app".to_string());
        self.services.register_invocable(name, owner, service);
        self
    }

    /// Runs one frame: every enabled system once, grouped and barriered per §5.
    pub fn update(&mut self) -> Result<()> {
        self.executor.execute_frame(&mut self.world)
    }

    pub fn tick_count(&self) -> u64 {
        self.world.tick_count()
    }

    pub fn is_paused(&self) -> bool {
        self.world.is_paused()
    }

    pub fn pause(&mut self) {
        self.world.pause();
    }

    pub fn resume(&mut self) {
        self.world.resume();
    }

    /// Advances the world clock by `dt` seconds and, unless paused, runs one frame.
    pub fn tick(&mut self, dt: f64) -> Result<()> {
        self.world.tick(dt)?;
        if !self.world.is_paused() {
            self.update()?;
        }
        Ok(())
    }

    /// Runs `frames` frames back to back, each advancing the clock by `dt` seconds. Only valid
    /// while paused (§6.1) — `World::step` rejects the call otherwise.
    pub fn step(&mut self, frames: u32, dt: f64) -> Result<()> {
        self.world.step(frames, dt)?;
        for _ in 0..frames {
            self.update()?;
        }
        Ok(())
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestPlugin;
    impl Plugin for TestPlugin {
        fn name(&self) -> &str {
            "test_plugin"
        }

        fn build(&self, _app: &mut App) {}
    }

    #[test]
    fn test_app_creation() {
        let mut app = App::new();
        app.add_plugin(TestPlugin);
    }

    #[test]
    fn systems_registered_during_plugin_build_are_tagged_with_its_name() {
        use crate::command::CommandBuffer;
        use crate::system::{System, SystemAccess};

        struct NoOpSystem;
        impl System for NoOpSystem {
            fn access(&self) -> SystemAccess {
                SystemAccess::empty()
            }
            fn name(&self) -> &'static str {
                "no_op"
            }
            fn run(&mut self, _world: &World, _commands: &mut CommandBuffer) -> Result<()> {
                Ok(())
            }
        }

        struct RegistersASystem;
        impl Plugin for RegistersASystem {
            fn name(&self) -> &str {
                "movement"
            }
            fn build(&self, app: &mut App) {
                app.add_system(Box::new(NoOpSystem));
            }
        }

        let mut app = App::new();
        app.add_plugin(RegistersASystem);
        let systems = app.schedule().list_systems();
        assert_eq!(systems.len(), 1);
        assert_eq!(systems[0].owner.as_deref(), Some("movement"));
    }

    #[test]
    fn update_runs_a_frame_without_advancing_the_clock() {
        let mut app = App::new();
        app.update().unwrap();
        assert_eq!(app.tick_count(), 0);
    }

    #[test]
    fn tick_is_entirely_skipped_while_paused() {
        use crate::command::CommandBuffer;
        use crate::system::{System, SystemAccess};
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        struct CountsRuns(Arc<AtomicUsize>);
        impl System for CountsRuns {
            fn access(&self) -> SystemAccess {
                SystemAccess::empty()
            }
            fn name(&self) -> &'static str {
                "counts_runs"
            }
            fn run(&mut self, _world: &World, _commands: &mut CommandBuffer) -> Result<()> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }

        let counter = Arc::new(AtomicUsize::new(0));
        let mut app = App::new();
        app.add_system(Box::new(CountsRuns(counter.clone())));
        app.pause();
        app.tick(1.0 / 60.0).unwrap();
        assert_eq!(app.tick_count(), 0);
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        app.resume();
        app.tick(1.0 / 60.0).unwrap();
        assert_eq!(app.tick_count(), 1);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
