//! Todo demo
//!
//! - `Todo`: a synchronous binding over [`TodoListState`]
//! - `TodoAsync`: `fetch` loads the list from the backend (latest request
//!   wins, transient failures retried) and `save` stores it (one save at a
//!   time; presses during a save are ignored)
//!
//! The backend is any [`TodoApi`]; the binary uses the mock server over HTTP.

pub mod api;

pub use api::{ApiError, HttpTodoApi, InMemoryTodoApi, TodoApi};

use namespaced_store_core::{combine_reducers, ActionCreators, BindingError, CombinedReducer, SyncBinding, Value};
use namespaced_store_macros::ActionName;
use namespaced_store_runtime::retry::{retry_with_predicate, RetryPolicy};
use namespaced_store_runtime::{AsyncBinding, Store, StoreError, WatchMode, WorkerHandle};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// One todo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    /// Identifier, unique within a list
    pub id: u64,
    /// What to do
    pub content: String,
    /// Whether it is done
    pub done: bool,
}

/// State of the `Todo` binding
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoListState {
    /// The list
    pub items: Vec<TodoItem>,
    /// A fetch is in progress
    pub loading: bool,
    /// Message of the last failure, cleared by the next load
    pub error: Option<String>,
}

/// Actions of the `Todo` namespace
#[derive(ActionName, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TodoAction {
    /// Replace the list (payload: the items)
    Set,
    /// Append an item (payload: its content)
    Add,
    /// Flip `done` (payload: the id)
    Toggle,
    /// Drop an item (payload: the id)
    Remove,
    /// Mark a fetch as started
    Loading,
    /// Record a failure (payload: the message)
    Failed,
}

/// Actions of the `TodoAsync` namespace
#[derive(ActionName, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TodoAsyncAction {
    /// Load the list from the backend
    Fetch,
    /// Store the list (payload: the items)
    Save,
}

/// Root state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppState {
    /// The todo slice
    pub todos: TodoListState,
}

fn payload_id(payload: Option<&Value>) -> Option<u64> {
    payload.and_then(Value::as_u64)
}

fn set(state: &TodoListState, payload: Option<&Value>) -> TodoListState {
    let Some(items) = payload.and_then(|p| serde_json::from_value::<Vec<TodoItem>>(p.clone()).ok()) else {
        tracing::warn!("Todo/set without a valid list, ignored");
        return state.clone();
    };

    TodoListState {
        items,
        loading: false,
        error: None,
    }
}

fn add(state: &TodoListState, payload: Option<&Value>) -> TodoListState {
    let Some(content) = payload.and_then(Value::as_str) else {
        return state.clone();
    };

    let Some(id) = state.items.iter().map(|i| i.id).max().map_or(Some(1), |max| max.checked_add(1)) else {
        tracing::warn!("Todo/add with no id left after u64::MAX, ignored");
        return state.clone();
    };

    let mut next = state.clone();
    next.items.push(TodoItem {
        id,
        content: content.to_string(),
        done: false,
    });
    next
}

fn toggle(state: &TodoListState, payload: Option<&Value>) -> TodoListState {
    let mut next = state.clone();
    if let Some(id) = payload_id(payload) {
        for item in next.items.iter_mut().filter(|i| i.id == id) {
            item.done = !item.done;
        }
    }
    next
}

fn remove(state: &TodoListState, payload: Option<&Value>) -> TodoListState {
    let mut next = state.clone();
    if let Some(id) = payload_id(payload) {
        next.items.retain(|i| i.id != id);
    }
    next
}

/// The `Todo` binding
///
/// # Errors
///
/// Never fails in practice; the table has no duplicate names.
pub fn todo() -> Result<SyncBinding<TodoListState, TodoAction>, BindingError> {
    SyncBinding::builder("Todo", TodoListState::default())
        .reducer(TodoAction::Set, set)
        .reducer(TodoAction::Add, add)
        .reducer(TodoAction::Toggle, toggle)
        .reducer(TodoAction::Remove, remove)
        .reducer(TodoAction::Loading, |state, _| TodoListState {
            loading: true,
            error: None,
            ..state.clone()
        })
        .reducer(TodoAction::Failed, |state, payload| TodoListState {
            loading: false,
            error: Some(payload.and_then(Value::as_str).unwrap_or("unknown error").to_string()),
            ..state.clone()
        })
        .build()
}

/// The `TodoAsync` binding
///
/// Both effects report failures to `Todo/failed` instead of failing the run.
///
/// # Errors
///
/// Never fails in practice; the table has no duplicate names.
pub fn todo_async(
    api: Arc<dyn TodoApi>,
    todo: ActionCreators<TodoAction>,
    retry: RetryPolicy,
) -> Result<AsyncBinding<TodoAsyncAction>, BindingError> {
    let fetch_api = Arc::clone(&api);
    let fetch_todo = todo.clone();

    AsyncBinding::builder("TodoAsync")
        .effect_with(TodoAsyncAction::Fetch, WatchMode::LatestOnly, move |_, ctx| {
            let api = Arc::clone(&fetch_api);
            let todo = fetch_todo.clone();
            let retry = retry.clone();
            async move {
                ctx.put(todo.create(TodoAction::Loading, None)).await?;

                let fetched = retry_with_predicate(&retry, || api.fetch(), ApiError::is_transient).await;
                let next = match fetched {
                    Ok(items) => todo.with_payload(TodoAction::Set, &items)?,
                    Err(error) => todo.with_payload(TodoAction::Failed, &error.to_string())?,
                };

                ctx.put(next).await?;
                Ok(())
            }
        })
        .effect_with(TodoAsyncAction::Save, WatchMode::LeadingOnly, move |action, ctx| {
            let api = Arc::clone(&api);
            let todo = todo.clone();
            async move {
                let Some(items) = action.payload_as::<Vec<TodoItem>>()? else {
                    anyhow::bail!("TodoAsync/save needs the list as payload");
                };

                if let Err(error) = api.save(&items).await {
                    tracing::warn!(%error, "Save failed");
                    ctx.put(todo.with_payload(TodoAction::Failed, &error.to_string())?).await?;
                }
                Ok(())
            }
        })
        .build()
}

/// Mount `Todo` under `todos`
///
/// # Errors
///
/// Returns [`BindingError`] if the slices collide.
pub fn root_reducer(todo: SyncBinding<TodoListState, TodoAction>) -> Result<CombinedReducer<AppState>, BindingError> {
    let root = combine_reducers::<AppState>()
        .slice("todos", |s: &mut AppState| &mut s.todos, todo)?
        .build();

    root.ensure_unique_action_types()?;
    Ok(root)
}

/// The assembled demo
#[derive(Debug)]
pub struct TodoApp {
    store: Store<AppState>,
    todo: ActionCreators<TodoAction>,
    todo_async: ActionCreators<TodoAsyncAction>,
    worker: WorkerHandle,
}

impl TodoApp {
    /// Build the bindings, create the store, and start the worker
    ///
    /// Must be called inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Binding`] if a binding is misconfigured.
    pub fn start(api: Arc<dyn TodoApi>, retry: RetryPolicy) -> Result<Self, StoreError> {
        let todo = todo()?;
        let todo_async = todo_async(api, todo.actions().clone(), retry)?;

        let todo_actions = todo.actions().clone();
        let store = Store::new(AppState::default(), root_reducer(todo)?);
        let worker = store.run(&todo_async)?;

        Ok(Self {
            store,
            todo: todo_actions,
            todo_async: todo_async.actions().clone(),
            worker,
        })
    }

    /// The underlying store
    #[must_use]
    pub const fn store(&self) -> &Store<AppState> {
        &self.store
    }

    /// Request a fetch
    ///
    /// # Errors
    ///
    /// Fails once the store is shutting down.
    pub async fn fetch(&self) -> Result<(), StoreError> {
        self.store.dispatch(self.todo_async.create(TodoAsyncAction::Fetch, None)).await
    }

    /// Request a save of the current list
    ///
    /// # Errors
    ///
    /// Fails once the store is shutting down, or if the list cannot be
    /// serialized.
    pub async fn save(&self) -> anyhow::Result<()> {
        let items = self.store.state(|s| s.todos.items.clone()).await;
        let action = self.todo_async.with_payload(TodoAsyncAction::Save, &items)?;
        self.store.dispatch(action).await?;
        Ok(())
    }

    /// Append an item
    ///
    /// # Errors
    ///
    /// Fails once the store is shutting down.
    pub async fn add(&self, content: &str) -> Result<(), StoreError> {
        self.store
            .dispatch(self.todo.create(TodoAction::Add, Some(Value::from(content))))
            .await
    }

    /// Flip an item's `done`
    ///
    /// # Errors
    ///
    /// Fails once the store is shutting down.
    pub async fn toggle(&self, id: u64) -> Result<(), StoreError> {
        self.store
            .dispatch(self.todo.create(TodoAction::Toggle, Some(Value::from(id))))
            .await
    }

    /// Drop an item
    ///
    /// # Errors
    ///
    /// Fails once the store is shutting down.
    pub async fn remove(&self, id: u64) -> Result<(), StoreError> {
        self.store
            .dispatch(self.todo.create(TodoAction::Remove, Some(Value::from(id))))
            .await
    }

    /// Current todo slice
    pub async fn snapshot(&self) -> TodoListState {
        self.store.state(|s| s.todos.clone()).await
    }

    /// Stop the worker and wait for in-flight runs
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if runs do not unwind in time.
    pub async fn shutdown(self, timeout: Duration) -> Result<(), StoreError> {
        self.worker.stop();
        self.store.shutdown(timeout).await
    }
}
