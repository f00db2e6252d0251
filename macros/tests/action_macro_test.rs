//! Tests for #[derive(ActionName)] macro

use namespaced_store_core::creators::{map_to_actions, ActionName};
use namespaced_store_macros::ActionName;

#[derive(ActionName, Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum TodoAction {
    Set,
    Add,
    ToggleDone,
    #[action(name = "remove")]
    DeleteItem,
}

#[test]
fn test_all_in_declaration_order() {
    assert_eq!(
        TodoAction::ALL,
        &[
            TodoAction::Set,
            TodoAction::Add,
            TodoAction::ToggleDone,
            TodoAction::DeleteItem,
        ]
    );
}

#[test]
fn test_wire_names() {
    assert_eq!(TodoAction::Set.as_str(), "set");
    assert_eq!(TodoAction::ToggleDone.as_str(), "toggleDone");
    assert_eq!(TodoAction::DeleteItem.as_str(), "remove");
}

#[test]
fn test_from_name_round_trips() {
    for name in TodoAction::ALL {
        assert_eq!(TodoAction::from_name(name.as_str()), Some(*name));
    }
    assert_eq!(TodoAction::from_name("DeleteItem"), None);
}

#[test]
fn test_creators_use_wire_names() {
    let actions = map_to_actions("Todo", TodoAction::ALL.iter().copied());
    let action = actions.create(TodoAction::ToggleDone, None);

    assert_eq!(action.action_type, "@Todo/toggleDone");
}
