//! CLI command handlers

use anyhow::{anyhow, bail};
use colored::Colorize;
use tasknest_core::{Task, TaskId, Theme};
use tasknest_state::{visible_tasks, AppStore, SliceOutcome, TaskFilter, TaskStats};

/// Find a task by full identifier or unique identifier prefix
pub fn resolve_task_id(tasks: &[Task], query: &str) -> anyhow::Result<TaskId> {
    if let Some(task) = tasks.iter().find(|task| task.id.as_str() == query) {
        return Ok(task.id.clone());
    }

    let mut matches = tasks.iter().filter(|task| task.id.as_str().starts_with(query));
    match (matches.next(), matches.next()) {
        (Some(task), None) => Ok(task.id.clone()),
        (Some(_), Some(_)) => bail!("'{}' matches more than one task", query),
        (None, _) => Err(anyhow!("no task matches '{}'", query)),
    }
}

/// Short identifier shown in listings: the first eight characters
fn short_id(id: &TaskId) -> &str {
    let id = id.as_str();
    id.char_indices().nth(8).map_or(id, |(end, _)| &id[..end])
}

pub fn render_tasks(tasks: &[Task], filter: TaskFilter) -> String {
    let visible = visible_tasks(tasks, filter);
    if visible.is_empty() {
        return format!("No {} tasks.", filter);
    }

    let mut out = String::new();
    for task in visible {
        let mark = if task.completed {
            "[x]".green().to_string()
        } else {
            "[ ]".to_string()
        };
        let title = if task.completed {
            task.title.dimmed().to_string()
        } else {
            task.title.clone()
        };
        out.push_str(&format!("{} {}  {}\n", mark, short_id(&task.id), title));
    }

    let stats = TaskStats::of(tasks);
    out.push_str(&format!(
        "{} total, {} active, {} completed",
        stats.total, stats.active, stats.completed
    ));
    out
}

pub fn add_task(store: &AppStore, title: &str) -> anyhow::Result<()> {
    let id = store.add_task(title)?;
    println!("✅ Added task {}", short_id(&id));
    Ok(())
}

pub fn toggle_task(store: &AppStore, query: &str) -> anyhow::Result<()> {
    let id = resolve_task_id(&store.state().tasks, query)?;
    store.toggle_task(&id);

    let state = store.state();
    if let Some(task) = state.task(&id) {
        let status = if task.completed { "done" } else { "open" };
        println!("Task {} is now {}", short_id(&id), status);
    }
    Ok(())
}

pub fn remove_task(store: &AppStore, query: &str) -> anyhow::Result<()> {
    let id = resolve_task_id(&store.state().tasks, query)?;
    store.remove_task(&id);
    println!("🗑️  Removed task {}", short_id(&id));
    Ok(())
}

pub fn list_tasks(store: &AppStore, filter: TaskFilter, json: bool) -> anyhow::Result<()> {
    let state = store.state();
    if json {
        let visible = visible_tasks(&state.tasks, filter);
        println!("{}", serde_json::to_string_pretty(&visible)?);
    } else {
        println!("{}", render_tasks(&state.tasks, filter));
    }
    Ok(())
}

pub fn set_theme(store: &AppStore, theme: Option<&str>) -> anyhow::Result<()> {
    let theme = match theme {
        Some(name) => {
            let theme: Theme = name.parse()?;
            store.set_theme(theme);
            theme
        }
        None => store.toggle_theme(),
    };
    println!("Theme: {}", theme);
    Ok(())
}

pub fn render_status(store: &AppStore) -> String {
    let state = store.state();
    let stats = TaskStats::of(&state.tasks);

    let mut out = String::new();
    out.push_str("Tasknest Status\n");
    out.push_str("===============\n");
    out.push_str(&format!("Theme:     {}\n", state.theme));
    let session = match (state.session.is_logged_in, state.session.email.as_deref()) {
        (true, Some(email)) => format!("logged in as {}", email),
        (true, None) => "logged in".to_string(),
        (false, _) => "logged out".to_string(),
    };
    out.push_str(&format!("Session:   {}\n", session));
    out.push_str(&format!(
        "Tasks:     {} ({} active, {} completed)\n",
        stats.total, stats.active, stats.completed
    ));

    out.push_str("Restored:  ");
    let outcomes: Vec<String> = store
        .rehydration()
        .outcomes
        .iter()
        .map(|(key, outcome)| {
            let label = match outcome {
                SliceOutcome::Restored => "restored".green(),
                SliceOutcome::Missing => "default".normal(),
                SliceOutcome::Corrupted => "corrupt".red(),
                SliceOutcome::Unavailable => "unavailable".yellow(),
            };
            format!("{}={}", key, label)
        })
        .collect();
    if outcomes.is_empty() {
        out.push_str("persistence disabled");
    } else {
        out.push_str(&outcomes.join(", "));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tasknest_core::PersistenceConfig;
    use tasknest_state::{MemoryErrorSink, MemoryKeyValueStore};

    fn sample() -> Vec<Task> {
        vec![
            Task::with_id(TaskId::from("abc123"), "one"),
            Task::with_id(TaskId::from("abd456"), "two").completed(true),
        ]
    }

    #[test]
    fn test_resolve_by_prefix() {
        let tasks = sample();
        assert_eq!(resolve_task_id(&tasks, "abc").unwrap(), TaskId::from("abc123"));
        assert_eq!(resolve_task_id(&tasks, "abd456").unwrap(), TaskId::from("abd456"));
    }

    #[test]
    fn test_resolve_ambiguous_or_missing() {
        let tasks = sample();
        assert!(resolve_task_id(&tasks, "ab").is_err());
        assert!(resolve_task_id(&tasks, "zzz").is_err());
    }

    #[test]
    fn test_render_tasks() {
        colored::control::set_override(false);
        let rendered = render_tasks(&sample(), TaskFilter::All);
        assert!(rendered.contains("[ ] abc123  one"));
        assert!(rendered.contains("[x] abd456  two"));
        assert!(rendered.ends_with("2 total, 1 active, 1 completed"));

        assert_eq!(render_tasks(&[], TaskFilter::Active), "No active tasks.");
    }

    #[test]
    fn test_short_id_respects_char_boundaries() {
        assert_eq!(short_id(&TaskId::from("aéééé")), "aéééé");
        assert_eq!(short_id(&TaskId::from("ééééééééé")), "éééééééé");
        assert_eq!(short_id(&TaskId::from("0123456789abcdef")), "01234567");

        colored::control::set_override(false);
        let rendered = render_tasks(&[Task::with_id(TaskId::from("aéééééééé"), "x")], TaskFilter::All);
        assert!(rendered.contains("[ ] aééééééé  x"));
    }

    #[tokio::test]
    async fn test_render_status() {
        colored::control::set_override(false);
        let store = AppStore::open(
            &PersistenceConfig::default(),
            Arc::new(MemoryKeyValueStore::with_entries([("theme", "dark")])),
            Arc::new(MemoryErrorSink::new()),
        )
        .await
        .unwrap();
        store.add_task("A").unwrap();

        let status = render_status(&store);
        assert!(status.contains("Theme:     dark"));
        assert!(status.contains("Session:   logged out"));
        assert!(status.contains("theme=restored"));
        assert!(status.contains("tasks=default"));
    }
}
