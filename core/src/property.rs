//! Generic "set a value" command.

use std::fmt;

use crate::command::{Command, CommandError, CommandResult, Editable, MergeKey};

/// Sets one property of the target through a pair of accessor functions.
///
/// The previous value is read once, when the command is built, and never
/// changes afterwards: merging a later `SetProperty` with the same key only
/// replaces the value being written, so a single undo restores the value from
/// before the whole gesture.
///
/// If the property cannot be read at construction (the object is gone) the
/// command reports itself invalid and the history rejects it.
///
/// ```ignore
/// let cmd = SetProperty::new(
///     &scene,
///     MergeKey::new(light, CommandKind::AttributeValue).with_attribute("color"),
///     |scene| scene.light(light).map(|l| l.color),
///     |scene, color| scene.set_light_color(light, *color),
///     Color::RED,
/// )
/// .with_description("Set light color");
/// ```
pub struct SetProperty<T, V> {
    key: MergeKey,
    description: String,
    write: Box<dyn Fn(&mut T, &V) -> CommandResult + Send>,
    before: Option<V>,
    after: V,
}

impl<T, V> SetProperty<T, V>
where
    T: Editable,
    V: Clone + fmt::Debug + Send + 'static,
{
    pub fn new(
        target: &T,
        key: MergeKey,
        read: impl FnOnce(&T) -> Option<V>,
        write: impl Fn(&mut T, &V) -> CommandResult + Send + 'static,
        value: V,
    ) -> Self {
        let description = match &key.attribute {
            Some(attribute) => format!("Set {attribute}"),
            None => format!("Set {}", key.kind),
        };
        Self {
            before: read(target),
            key,
            description,
            write: Box::new(write),
            after: value,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// The value restored by undo.
    pub fn before(&self) -> Option<&V> {
        self.before.as_ref()
    }

    /// The value written by execute and redo.
    pub fn after(&self) -> &V {
        &self.after
    }
}

impl<T, V> Command<T> for SetProperty<T, V>
where
    T: Editable,
    V: Clone + fmt::Debug + Send + 'static,
{
    fn execute(&mut self, target: &mut T) -> CommandResult {
        (self.write)(target, &self.after)
    }

    fn undo(&mut self, target: &mut T) -> CommandResult {
        let before = self.before.as_ref().ok_or_else(|| {
            CommandError::InvalidState(format!("{} has no previous value", self.description))
        })?;
        (self.write)(target, before)
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn is_valid(&self) -> bool {
        self.before.is_some()
    }

    fn is_mergeable(&self) -> bool {
        true
    }

    fn merge_key(&self) -> Option<MergeKey> {
        Some(self.key.clone())
    }

    fn update(&mut self, other: &dyn Command<T>) {
        if let Some(other) = other.as_any().downcast_ref::<Self>() {
            self.after = other.after.clone();
        }
    }
}

impl<T, V: fmt::Debug> fmt::Debug for SetProperty<T, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetProperty")
            .field("key", &self.key)
            .field("before", &self.before)
            .field("after", &self.after)
            .finish()
    }
}
