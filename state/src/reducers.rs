//! Slice reducers
//!
//! Each reducer is pure and total. An action a slice does not handle returns
//! the same `Arc`, untouched. Every variant is listed explicitly so a new
//! action forces a decision in each slice.

use std::collections::HashSet;
use std::sync::Arc;
use tasknest_core::{Profile, Session, Task, Theme};

use crate::app::Action;

pub fn tasks(state: &Arc<Vec<Task>>, action: &Action) -> Arc<Vec<Task>> {
    match action {
        Action::AddTask(task) => {
            // Identifiers stay unique; a conflicting add is ignored
            if state.iter().any(|existing| existing.id == task.id) {
                return Arc::clone(state);
            }
            let mut next = Vec::with_capacity(state.len() + 1);
            next.extend(state.iter().cloned());
            next.push(task.clone());
            Arc::new(next)
        }
        Action::ToggleTask(id) => match state.iter().position(|task| &task.id == id) {
            Some(index) => {
                let mut next = state.to_vec();
                next[index].completed = !next[index].completed;
                Arc::new(next)
            }
            None => Arc::clone(state),
        },
        Action::RemoveTask(id) => {
            if !state.iter().any(|task| &task.id == id) {
                return Arc::clone(state);
            }
            Arc::new(state.iter().filter(|task| &task.id != id).cloned().collect())
        }
        Action::SetTasks(tasks) => {
            // First occurrence of an identifier wins
            let mut seen = HashSet::with_capacity(tasks.len());
            Arc::new(
                tasks
                    .iter()
                    .filter(|&task| seen.insert(&task.id))
                    .cloned()
                    .collect(),
            )
        }
        Action::SetTheme(_)
        | Action::ToggleTheme
        | Action::LogIn { .. }
        | Action::LogOut
        | Action::SetSession(_)
        | Action::UpdateProfile(_)
        | Action::SetProfile(_) => Arc::clone(state),
    }
}

pub fn theme(state: &Arc<Theme>, action: &Action) -> Arc<Theme> {
    match action {
        Action::SetTheme(theme) => Arc::new(*theme),
        Action::ToggleTheme => Arc::new(state.toggled()),
        Action::AddTask(_)
        | Action::ToggleTask(_)
        | Action::RemoveTask(_)
        | Action::SetTasks(_)
        | Action::LogIn { .. }
        | Action::LogOut
        | Action::SetSession(_)
        | Action::UpdateProfile(_)
        | Action::SetProfile(_) => Arc::clone(state),
    }
}

pub fn session(state: &Arc<Session>, action: &Action) -> Arc<Session> {
    match action {
        Action::LogIn { email, name } => {
            Arc::new(Session::logged_in(email.clone(), name.clone()))
        }
        Action::LogOut => Arc::new(Session::logged_out()),
        Action::SetSession(session) => Arc::new(session.clone()),
        Action::AddTask(_)
        | Action::ToggleTask(_)
        | Action::RemoveTask(_)
        | Action::SetTasks(_)
        | Action::SetTheme(_)
        | Action::ToggleTheme
        | Action::UpdateProfile(_)
        | Action::SetProfile(_) => Arc::clone(state),
    }
}

pub fn profile(state: &Arc<Profile>, action: &Action) -> Arc<Profile> {
    match action {
        Action::UpdateProfile(profile) | Action::SetProfile(profile) => {
            Arc::new(profile.clone())
        }
        Action::AddTask(_)
        | Action::ToggleTask(_)
        | Action::RemoveTask(_)
        | Action::SetTasks(_)
        | Action::SetTheme(_)
        | Action::ToggleTheme
        | Action::LogIn { .. }
        | Action::LogOut
        | Action::SetSession(_) => Arc::clone(state),
    }
}
