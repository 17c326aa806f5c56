use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rstest::rstest;

use retrace_core::{
    BlockedOperation, Command, CommandError, CommandHistory, CommandKind, CommandResult, Editable,
    Execution, HistoryError, ManualClock, MergeKey, Notifier, SequenceId, SetProperty,
    SimulationFlag, SimulationState, TargetId,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ---------------------------------------------------------------------------
// A tiny scene: named objects with a color and an x position
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
struct Scene {
    objects: BTreeMap<u64, Object>,
}

#[derive(Debug, Clone, PartialEq)]
struct Object {
    name: &'static str,
    color: &'static str,
    x: i32,
}

impl Editable for Scene {}

#[derive(Debug)]
struct AddObject {
    id: u64,
    name: &'static str,
    disposed: Option<Arc<Mutex<Vec<&'static str>>>>,
}

impl AddObject {
    fn boxed(id: u64, name: &'static str) -> Box<Self> {
        Box::new(Self {
            id,
            name,
            disposed: None,
        })
    }
}

impl Command<Scene> for AddObject {
    fn execute(&mut self, scene: &mut Scene) -> CommandResult {
        scene.objects.insert(
            self.id,
            Object {
                name: self.name,
                color: "white",
                x: 0,
            },
        );
        Ok(())
    }

    fn undo(&mut self, scene: &mut Scene) -> CommandResult {
        scene.objects.remove(&self.id);
        Ok(())
    }

    fn description(&self) -> &str {
        self.name
    }

    fn dispose(&mut self) {
        if let Some(log) = &self.disposed {
            log.lock().push(self.name);
        }
    }
}

fn object_mut(scene: &mut Scene, id: u64) -> CommandResult<&mut Object> {
    scene
        .objects
        .get_mut(&id)
        .ok_or_else(|| CommandError::TargetNotFound(format!("object {id}")))
}

fn set_color(
    scene: &Scene,
    id: u64,
    color: &'static str,
) -> Box<SetProperty<Scene, &'static str>> {
    Box::new(SetProperty::new(
        scene,
        MergeKey::new(TargetId(id), CommandKind::AttributeValue).with_attribute("color"),
        |scene| scene.objects.get(&id).map(|o| o.color),
        move |scene, color| {
            object_mut(scene, id)?.color = *color;
            Ok(())
        },
        color,
    ))
}

fn move_x(scene: &Scene, id: u64, x: i32) -> Box<SetProperty<Scene, i32>> {
    Box::new(SetProperty::new(
        scene,
        MergeKey::new(TargetId(id), CommandKind::Transform).with_attribute("x"),
        |scene| scene.objects.get(&id).map(|o| o.x),
        move |scene, x| {
            object_mut(scene, id)?.x = *x;
            Ok(())
        },
        x,
    ))
}

fn ids(entries: &[retrace_core::HistoryEntry<Scene>]) -> Vec<u64> {
    entries.iter().map(|e| e.id().get()).collect()
}

fn history_with_clock() -> (CommandHistory<Scene>, ManualClock) {
    init_logging();
    let clock = ManualClock::new();
    (CommandHistory::new().with_clock(clock.clone()), clock)
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn execute_then_undo_single_command() {
    let (mut history, _) = history_with_clock();
    let mut scene = Scene::default();

    history.execute(AddObject::boxed(1, "A"), &mut scene).unwrap();
    assert_eq!(ids(history.past()), vec![1]);
    assert!(history.future().is_empty());

    let undone = history.undo(&mut scene).unwrap();
    assert_eq!(undone.map(|c| c.description()), Some("A"));
    assert!(history.past().is_empty());
    assert_eq!(ids(history.future()), vec![1]);
    assert!(scene.objects.is_empty());
}

#[test]
fn new_command_after_undo_replaces_redo_branch() {
    let (mut history, _) = history_with_clock();
    let mut scene = Scene::default();
    let disposed = Arc::new(Mutex::new(Vec::new()));

    history.execute(AddObject::boxed(1, "A"), &mut scene).unwrap();
    history
        .execute(
            Box::new(AddObject {
                id: 2,
                name: "B",
                disposed: Some(Arc::clone(&disposed)),
            }),
            &mut scene,
        )
        .unwrap();
    assert_eq!(ids(history.past()), vec![1, 2]);

    history.undo(&mut scene).unwrap();
    assert_eq!(ids(history.past()), vec![1]);
    assert_eq!(ids(history.future()), vec![2]);

    history.execute(AddObject::boxed(3, "C"), &mut scene).unwrap();
    assert_eq!(ids(history.past()), vec![1, 2]);
    assert_eq!(history.past()[1].description(), "C");
    assert!(history.future().is_empty());
    assert_eq!(*disposed.lock(), vec!["B"]);
}

#[test]
fn rapid_color_changes_undo_to_original() {
    let (mut history, clock) = history_with_clock();
    let mut scene = Scene::default();
    history.execute(AddObject::boxed(1, "A"), &mut scene).unwrap();
    clock.advance(Duration::from_secs(2));

    history
        .execute(set_color(&scene, 1, "red"), &mut scene)
        .unwrap();
    clock.advance(Duration::from_millis(300));
    let second = history
        .execute(set_color(&scene, 1, "blue"), &mut scene)
        .unwrap();

    assert_eq!(second, Execution::Merged(SequenceId::new(2)));
    assert_eq!(history.undo_count(), 2);
    assert_eq!(scene.objects[&1].color, "blue");

    history.undo(&mut scene).unwrap();
    assert_eq!(scene.objects[&1].color, "white");
}

#[test]
fn go_to_state_walks_both_directions() {
    let (mut history, _) = history_with_clock();
    let mut scene = Scene::default();
    for (id, name) in [(1, "A"), (2, "B"), (3, "C")] {
        history
            .execute(AddObject::boxed(id, name), &mut scene)
            .unwrap();
    }

    history
        .go_to_state(SequenceId::new(1), &mut scene)
        .unwrap();
    assert_eq!(ids(history.past()), vec![1]);
    assert_eq!(ids(history.future()), vec![3, 2]);

    history
        .go_to_state(SequenceId::new(3), &mut scene)
        .unwrap();
    assert_eq!(ids(history.past()), vec![1, 2, 3]);
    assert!(history.future().is_empty());
    assert_eq!(scene.objects.len(), 3);
}

#[derive(Clone, Default)]
struct Notices(Arc<Mutex<Vec<BlockedOperation>>>);

impl Notifier for Notices {
    fn history_locked(&self, operation: BlockedOperation) {
        self.0.lock().push(operation);
    }
}

#[test]
fn undo_during_simulation_is_refused_with_notice() {
    init_logging();
    let flag = SimulationFlag::new();
    let notices = Notices::default();
    let mut history = CommandHistory::new()
        .with_simulation(flag.clone())
        .with_notifier(notices.clone());
    let mut scene = Scene::default();
    history.execute(AddObject::boxed(1, "A"), &mut scene).unwrap();

    flag.on_simulation_state_changed(SimulationState::Started);
    let result = history.undo(&mut scene);

    assert_eq!(
        result.unwrap_err(),
        HistoryError::Locked(BlockedOperation::Undo)
    );
    assert_eq!(ids(history.past()), vec![1]);
    assert!(history.future().is_empty());
    assert_eq!(*notices.0.lock(), vec![BlockedOperation::Undo]);
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

#[rstest]
#[case::within_window(Duration::from_millis(100), 1)]
#[case::just_inside(Duration::from_millis(499), 1)]
#[case::at_window(Duration::from_millis(500), 2)]
#[case::long_pause(Duration::from_secs(3), 2)]
fn drag_coalescing_depends_on_window(#[case] pause: Duration, #[case] entries: usize) {
    let (mut history, clock) = history_with_clock();
    let mut scene = Scene::default();
    history.execute(AddObject::boxed(1, "A"), &mut scene).unwrap();
    clock.advance(Duration::from_secs(2));

    history.execute(move_x(&scene, 1, 5), &mut scene).unwrap();
    clock.advance(pause);
    history.execute(move_x(&scene, 1, 9), &mut scene).unwrap();

    assert_eq!(history.undo_count(), 1 + entries);
    assert_eq!(scene.objects[&1].x, 9);

    for _ in 0..entries {
        history.undo(&mut scene).unwrap();
    }
    assert_eq!(scene.objects[&1].x, 0);
}

#[rstest]
#[case::one_undone(1)]
#[case::two_undone(2)]
#[case::all_undone(3)]
fn execute_always_empties_future(#[case] undone: usize) {
    let (mut history, _) = history_with_clock();
    let mut scene = Scene::default();
    for (id, name) in [(1, "A"), (2, "B"), (3, "C")] {
        history
            .execute(AddObject::boxed(id, name), &mut scene)
            .unwrap();
    }
    for _ in 0..undone {
        history.undo(&mut scene).unwrap();
    }
    assert_eq!(history.redo_count(), undone);

    history.execute(AddObject::boxed(9, "Z"), &mut scene).unwrap();
    assert_eq!(history.redo_count(), 0);
}

#[test]
fn undo_then_redo_is_identity() {
    let (mut history, clock) = history_with_clock();
    let mut scene = Scene::default();
    history.execute(AddObject::boxed(1, "A"), &mut scene).unwrap();
    clock.advance(Duration::from_secs(1));
    history.execute(move_x(&scene, 1, 4), &mut scene).unwrap();

    let scene_before = scene.clone();
    let past_before = ids(history.past());

    history.undo(&mut scene).unwrap();
    history.redo(&mut scene).unwrap();

    assert_eq!(scene, scene_before);
    assert_eq!(ids(history.past()), past_before);
    assert!(history.future().is_empty());
}

#[test]
fn appended_ids_strictly_increase() {
    let (mut history, clock) = history_with_clock();
    let mut scene = Scene::default();
    let mut last = SequenceId::INITIAL;
    for id in 1..=20 {
        let execution = history
            .execute(AddObject::boxed(id, "obj"), &mut scene)
            .unwrap();
        let Execution::Appended(assigned) = execution else {
            panic!("expected append, got {execution:?}");
        };
        assert!(assigned > last);
        last = assigned;
        clock.advance(Duration::from_millis(10));
    }
}

#[rstest]
#[case(0)]
#[case(1)]
#[case(3)]
#[case(5)]
fn go_to_state_matches_replay(#[case] target: u64) {
    let names = ["A", "B", "C", "D", "E"];
    let (mut history, _) = history_with_clock();
    let mut scene = Scene::default();
    for (i, &name) in names.iter().enumerate() {
        history
            .execute(AddObject::boxed(i as u64 + 1, name), &mut scene)
            .unwrap();
    }
    // Start from the middle so both directions get exercised.
    history
        .go_to_state(SequenceId::new(2), &mut scene)
        .unwrap();

    let reached = history
        .go_to_state(SequenceId::new(target), &mut scene)
        .unwrap();
    assert_eq!(reached, SequenceId::new(target));

    let mut replayed = Scene::default();
    for (i, &name) in names.iter().enumerate().take(target as usize) {
        AddObject::boxed(i as u64 + 1, name)
            .execute(&mut replayed)
            .unwrap();
    }
    assert_eq!(scene, replayed);
}

#[test]
fn gate_never_mutates_stacks() {
    init_logging();
    let flag = SimulationFlag::new();
    let mut history = CommandHistory::new().with_simulation(flag.clone());
    let mut scene = Scene::default();
    for (id, name) in [(1, "A"), (2, "B"), (3, "C")] {
        history
            .execute(AddObject::boxed(id, name), &mut scene)
            .unwrap();
    }
    history.undo(&mut scene).unwrap();
    flag.on_simulation_state_changed(SimulationState::Started);

    let snapshot = (ids(history.past()), ids(history.future()), scene.clone());
    for target in 0..=4 {
        assert!(history.undo(&mut scene).is_err());
        assert!(history.redo(&mut scene).is_err());
        assert!(
            history
                .go_to_state(SequenceId::new(target), &mut scene)
                .is_err()
        );
    }
    assert_eq!(
        (ids(history.past()), ids(history.future()), scene.clone()),
        snapshot
    );
}
