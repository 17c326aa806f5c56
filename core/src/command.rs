//! Editable targets and reversible commands.
//!
//! This module defines the contract every command submitted to a
//! [`CommandHistory`](crate::history::CommandHistory) fulfils:
//!
//! - [`Editable`]: marker trait for types that commands operate on
//! - [`Command`]: a reversible edit operation (Command pattern)
//! - [`MergeKey`] / [`CommandKind`]: identity used to coalesce edits
//! - [`CommandError`] / [`CommandResult`]: failures reported by effects
//!
//! Commands are self-contained: each implementation stores whatever data it
//! needs (target identifiers, old/new values, source text, etc.). The history
//! never performs the domain mutation itself.

use std::any::Any;
use std::fmt;

use thiserror::Error;

/// Helper trait for downcasting trait objects to concrete types.
///
/// Automatically implemented for all `'static` types. Used by
/// [`Command::update`] to downcast `&dyn Command<T>` to the concrete
/// command type being absorbed.
pub trait AsAny: 'static {
    /// Returns a reference to `self` as `&dyn Any` for downcasting.
    fn as_any(&self) -> &dyn Any;
}

impl<T: 'static> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Marker trait for types that serve as editing targets.
///
/// Implement this on whatever a document edits: a scene graph, a material,
/// a script buffer, etc.
///
/// ```ignore
/// struct Scene { /* ... */ }
/// impl Editable for Scene {}
/// ```
pub trait Editable: 'static {}

/// Error returned by a command's forward or reverse effect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// The target object was not found.
    #[error("target not found: {0}")]
    TargetNotFound(String),
    /// The target is in an invalid state for this command.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// A custom error with a description.
    #[error("{0}")]
    Custom(String),
}

/// Result type for command effects.
pub type CommandResult<T = ()> = Result<T, CommandError>;

/// Identity of the object a command edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(pub u64);

/// Identity of a script or asset associated with a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId(pub u64);

/// Kind tag of a command, compared as part of the [`MergeKey`].
///
/// The tag also selects the merge-type override: kinds whose
/// [`ignores_merge_window`](Self::ignores_merge_window) returns `true`
/// coalesce into the previous entry no matter how much time has passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// A single attribute value (color, intensity, script parameter).
    AttributeValue,
    /// Script or shader source text.
    SourceText,
    /// Position, rotation or scale of an object.
    Transform,
    /// Application-defined kind. Coalesces within the merge window only.
    Custom(&'static str),
}

impl CommandKind {
    /// Returns `true` if commands of this kind always coalesce with a
    /// matching previous entry, regardless of the merge window.
    ///
    /// Attribute and text edits arrive once per keystroke or drag tick, so
    /// they collapse into a single entry for as long as the key matches.
    pub fn ignores_merge_window(&self) -> bool {
        matches!(self, Self::AttributeValue | Self::SourceText)
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AttributeValue => f.write_str("attribute value"),
            Self::SourceText => f.write_str("source text"),
            Self::Transform => f.write_str("transform"),
            Self::Custom(name) => f.write_str(name),
        }
    }
}

/// The set of identity attributes compared to decide whether two mergeable
/// commands address the same edit in progress.
///
/// Two keys match only when every field is equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MergeKey {
    pub target: TargetId,
    pub attribute: Option<String>,
    pub kind: CommandKind,
    pub asset: Option<AssetId>,
}

impl MergeKey {
    /// Creates a key for `kind` edits of `target` with no attribute or asset.
    pub fn new(target: TargetId, kind: CommandKind) -> Self {
        Self {
            target,
            attribute: None,
            kind,
            asset: None,
        }
    }

    /// Sets the attribute (or component slot) the command edits.
    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    /// Sets the script or asset the command is associated with.
    pub fn with_asset(mut self, asset: AssetId) -> Self {
        self.asset = Some(asset);
        self
    }
}

/// A reversible editor command (Command pattern).
///
/// Commands encapsulate a single logical edit and capture enough state to
/// reverse it and apply it again. Ownership passes to the history on
/// submission; the history calls [`dispose`](Self::dispose) exactly once when
/// the command is permanently evicted.
///
/// # Coalescing
///
/// Commands that represent incremental changes (each tick of a slider drag,
/// each keystroke in a text field) return `true` from
/// [`is_mergeable`](Self::is_mergeable) and a [`MergeKey`] from
/// [`merge_key`](Self::merge_key). When the history decides to coalesce, it
/// calls [`update`](Self::update) on the existing entry with the new command;
/// the entry must keep its original "before" state and take the new target
/// value. Use [`AsAny::as_any`] on `other` to downcast it.
///
/// # Object Safety
///
/// This trait is dyn-compatible so that different command types can share a
/// single history as `Box<dyn Command<T>>`.
///
/// ```ignore
/// #[derive(Debug)]
/// struct SetColor {
///     object: TargetId,
///     before: Color,
///     after: Color,
/// }
///
/// impl Command<Scene> for SetColor {
///     fn execute(&mut self, scene: &mut Scene) -> CommandResult {
///         scene.set_color(self.object, self.after)
///     }
///
///     fn undo(&mut self, scene: &mut Scene) -> CommandResult {
///         scene.set_color(self.object, self.before)
///     }
///
///     fn description(&self) -> &str {
///         "Set color"
///     }
///
///     fn is_mergeable(&self) -> bool {
///         true
///     }
///
///     fn merge_key(&self) -> Option<MergeKey> {
///         Some(MergeKey::new(self.object, CommandKind::AttributeValue).with_attribute("color"))
///     }
///
///     fn update(&mut self, other: &dyn Command<Scene>) {
///         if let Some(other) = other.as_any().downcast_ref::<SetColor>() {
///             self.after = other.after;
///         }
///     }
/// }
/// ```
pub trait Command<T: Editable>: fmt::Debug + AsAny + Send {
    /// Applies the command to the target (forward direction).
    fn execute(&mut self, target: &mut T) -> CommandResult;

    /// Reverses the command.
    ///
    /// Must restore the target to the state before [`execute`](Self::execute)
    /// was first called.
    fn undo(&mut self, target: &mut T) -> CommandResult;

    /// Re-applies the command after an undo.
    ///
    /// Defaults to [`execute`](Self::execute). Override when re-execution can
    /// take a cheaper path with the same result.
    fn redo(&mut self, target: &mut T) -> CommandResult {
        self.execute(target)
    }

    /// A short, human-readable description for the history list.
    ///
    /// Examples: `"Set position"`, `"Set material color"`, `"Edit script"`.
    fn description(&self) -> &str;

    /// Whether the command may enter the history at all.
    ///
    /// Invalid commands are handed back through
    /// [`on_rejected`](Self::on_rejected) and never executed.
    ///
    /// Default: `true`.
    fn is_valid(&self) -> bool {
        true
    }

    /// Whether the command participates in coalescing.
    ///
    /// Default: `false`.
    fn is_mergeable(&self) -> bool {
        false
    }

    /// The identity used to decide whether two mergeable commands describe
    /// the same edit in progress. A mergeable command without a key never
    /// coalesces.
    fn merge_key(&self) -> Option<MergeKey> {
        None
    }

    /// Absorbs the effect of `other`, a newer command with a matching
    /// [`MergeKey`].
    ///
    /// The receiver keeps its original "before" state. The history disposes
    /// `other` right after this call; it is never executed on its own.
    fn update(&mut self, other: &dyn Command<T>) {
        let _ = other;
    }

    /// Called once when the history permanently evicts the command.
    fn dispose(&mut self) {}

    /// Called when [`is_valid`](Self::is_valid) returned `false` on
    /// submission.
    fn on_rejected(&mut self) {}
}
