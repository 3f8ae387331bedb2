use crate::app::App;

/// A bundle of systems, services, and component types registered together under one name
/// prefix (§6.5). `name()` becomes the `owner` field surfaced by `list_systems` and
/// `list_component_types` in the inspector.
pub trait Plugin {
    fn name(&self) -> &str;

    /// Build the plugin into the app: register systems, services, and component types.
    fn build(&self, app: &mut App);
}
