//! The application state tree
//!
//! Four slices, each held behind its own `Arc` so that an action which does
//! not touch a slice leaves the very same allocation in place. Persistence
//! relies on that identity to detect which slices changed.

use std::fmt;
use std::sync::Arc;
use tasknest_core::{
    Codec, PersistentState, Profile, Reducer, Session, StoreError, StoreResult, Task, TaskId,
    Theme,
};

use crate::codec::{JsonCodec, TaskListCodec, ThemeCodec};
use crate::reducers;

pub const TASKS_KEY: &str = "tasks";
pub const THEME_KEY: &str = "theme";
pub const SESSION_KEY: &str = "session";
pub const PROFILE_KEY: &str = "profile";

const TASKS_CODEC: TaskListCodec = TaskListCodec::new(TASKS_KEY);
const THEME_CODEC: ThemeCodec = ThemeCodec::new(THEME_KEY);
const SESSION_CODEC: JsonCodec<Session> = JsonCodec::new(SESSION_KEY);
const PROFILE_CODEC: JsonCodec<Profile> = JsonCodec::new(PROFILE_KEY);

/// Top-level slices of [`AppState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SliceKey {
    Tasks,
    Theme,
    Session,
    Profile,
}

impl SliceKey {
    pub const ALL: [SliceKey; 4] = [
        SliceKey::Tasks,
        SliceKey::Theme,
        SliceKey::Session,
        SliceKey::Profile,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SliceKey::Tasks => TASKS_KEY,
            SliceKey::Theme => THEME_KEY,
            SliceKey::Session => SESSION_KEY,
            SliceKey::Profile => PROFILE_KEY,
        }
    }
}

impl fmt::Display for SliceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every mutation the application can perform
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    // Tasks
    AddTask(Task),
    ToggleTask(TaskId),
    RemoveTask(TaskId),
    SetTasks(Vec<Task>),

    // Theme
    SetTheme(Theme),
    ToggleTheme,

    // Session
    LogIn {
        email: String,
        name: Option<String>,
    },
    LogOut,
    SetSession(Session),

    // Profile
    UpdateProfile(Profile),
    SetProfile(Profile),
}

impl Action {
    /// Prepare an `AddTask` with a fresh identifier
    pub fn add_task(title: &str) -> StoreResult<Action> {
        prepare_task(title).map(Action::AddTask)
    }

    pub fn log_in(email: &str, name: Option<&str>) -> StoreResult<Action> {
        let email = email.trim();
        if email.is_empty() {
            return Err(StoreError::Validation("email must not be empty".to_string()));
        }
        let name = name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string);
        Ok(Action::LogIn {
            email: email.to_string(),
            name,
        })
    }

    pub fn update_profile(name: &str, bio: &str) -> StoreResult<Action> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::Validation(
                "profile name must not be empty".to_string(),
            ));
        }
        Ok(Action::UpdateProfile(Profile::new(name, bio.trim())))
    }
}

/// Build a new open task from user input.
///
/// The title is trimmed; an empty title never reaches the container.
pub fn prepare_task(title: &str) -> StoreResult<Task> {
    let title = title.trim();
    if title.is_empty() {
        return Err(StoreError::Validation(
            "task title must not be empty".to_string(),
        ));
    }
    Ok(Task::new(title))
}

/// Root state tree
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    pub tasks: Arc<Vec<Task>>,
    pub theme: Arc<Theme>,
    pub session: Arc<Session>,
    pub profile: Arc<Profile>,
}

impl AppState {
    pub fn task(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| &task.id == id)
    }
}

impl Reducer for AppState {
    type Action = Action;

    fn reduce(&self, action: &Action) -> Self {
        AppState {
            tasks: reducers::tasks(&self.tasks, action),
            theme: reducers::theme(&self.theme, action),
            session: reducers::session(&self.session, action),
            profile: reducers::profile(&self.profile, action),
        }
    }
}

impl PersistentState for AppState {
    type Slice = SliceKey;

    fn slices() -> &'static [SliceKey] {
        &SliceKey::ALL
    }

    fn slice_key(slice: SliceKey) -> &'static str {
        slice.as_str()
    }

    fn slice_changed(&self, previous: &Self, slice: SliceKey) -> bool {
        match slice {
            SliceKey::Tasks => !Arc::ptr_eq(&self.tasks, &previous.tasks),
            SliceKey::Theme => !Arc::ptr_eq(&self.theme, &previous.theme),
            SliceKey::Session => !Arc::ptr_eq(&self.session, &previous.session),
            SliceKey::Profile => !Arc::ptr_eq(&self.profile, &previous.profile),
        }
    }

    fn encode_slice(&self, slice: SliceKey) -> StoreResult<String> {
        match slice {
            SliceKey::Tasks => TASKS_CODEC.encode(&self.tasks),
            SliceKey::Theme => THEME_CODEC.encode(&self.theme),
            SliceKey::Session => SESSION_CODEC.encode(&self.session),
            SliceKey::Profile => PROFILE_CODEC.encode(&self.profile),
        }
    }

    fn restore_action(slice: SliceKey, raw: &str) -> StoreResult<Action> {
        Ok(match slice {
            SliceKey::Tasks => Action::SetTasks(TASKS_CODEC.decode(raw)?),
            SliceKey::Theme => Action::SetTheme(THEME_CODEC.decode(raw)?),
            SliceKey::Session => Action::SetSession(SESSION_CODEC.decode(raw)?),
            SliceKey::Profile => Action::SetProfile(PROFILE_CODEC.decode(raw)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_task_rejects_blank_title() {
        let err = Action::add_task("   ").unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn test_add_task_trims_title() {
        match Action::add_task("  Buy milk ").unwrap() {
            Action::AddTask(task) => {
                assert_eq!(task.title, "Buy milk");
                assert!(!task.completed);
            }
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn test_log_in_drops_blank_name() {
        let action = Action::log_in("a@b.c", Some(" ")).unwrap();
        assert_eq!(
            action,
            Action::LogIn {
                email: "a@b.c".to_string(),
                name: None
            }
        );
        assert!(Action::log_in("", None).is_err());
    }

    #[test]
    fn test_untouched_slices_keep_identity() {
        let state = AppState::default();
        let next = state.reduce(&Action::ToggleTheme);

        assert!(next.slice_changed(&state, SliceKey::Theme));
        assert!(!next.slice_changed(&state, SliceKey::Tasks));
        assert!(!next.slice_changed(&state, SliceKey::Session));
        assert!(!next.slice_changed(&state, SliceKey::Profile));
    }

    #[test]
    fn test_every_reachable_slice_roundtrips() {
        let mut state = AppState::default();
        for action in [
            Action::add_task("A").unwrap(),
            Action::add_task("B").unwrap(),
            Action::ToggleTheme,
            Action::log_in("a@b.c", Some("Ada")).unwrap(),
            Action::update_profile("Ada", "likes lists").unwrap(),
        ] {
            state = state.reduce(&action);
        }
        let first = state.tasks[0].id.clone();
        state = state.reduce(&Action::ToggleTask(first));

        let mut restored = AppState::default();
        for slice in AppState::slices() {
            let raw = state.encode_slice(*slice).unwrap();
            let action = AppState::restore_action(*slice, &raw).unwrap();
            restored = restored.reduce(&action);
        }

        assert_eq!(restored, state);
    }

    #[test]
    fn test_raw_task_actions_roundtrip() {
        let mut state = AppState::default();
        for action in [
            Action::add_task("keep me").unwrap(),
            Action::AddTask(Task::with_id(TaskId::from("z"), "")),
            Action::AddTask(Task::with_id(TaskId::from("ü-1"), "  padded  ").completed(true)),
            Action::AddTask(Task::with_id(TaskId::from("z"), "ignored")),
            Action::SetTasks(Vec::new()),
            Action::SetTasks(vec![
                Task::with_id(TaskId::from("d"), "one"),
                Task::with_id(TaskId::from("d"), "two"),
                Task::with_id(TaskId::from("blank"), ""),
            ]),
            Action::add_task("and me").unwrap(),
        ] {
            state = state.reduce(&action);

            let raw = state.encode_slice(SliceKey::Tasks).unwrap();
            let restored = AppState::default()
                .reduce(&AppState::restore_action(SliceKey::Tasks, &raw).unwrap());
            assert_eq!(restored.tasks, state.tasks, "after {:?}", action);
        }
    }

    #[test]
    fn test_slice_from_key() {
        assert_eq!(AppState::slice_from_key("theme"), Some(SliceKey::Theme));
        assert_eq!(AppState::slice_from_key("nope"), None);
    }
}
