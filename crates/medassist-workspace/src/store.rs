//! The workspace store
//!
//! All mutations go through [`WorkspaceStore::commit`]: the change is applied
//! to a copy of the state, persisted, swapped in, and only then are observers
//! notified, outside of the lock.

use chrono::Utc;
use medassist_core::{
    load_json, save_json, Category, Folder, StateStorage, StoreBackend, Workspace,
    WorkspaceEvent, WorkspaceId, WorkspaceListing, WorkspaceObserver, WorkspaceSnapshot,
};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::{Result, WorkspaceError};

/// Storage key of the persisted workspace list
pub const WORKSPACES_KEY: &str = "workspaces";

/// Storage key of the persisted active workspace
pub const ACTIVE_WORKSPACE_KEY: &str = "activeWorkspace";

/// Name used when the store creates the first-run workspace
pub const DEFAULT_WORKSPACE_NAME: &str = "My Workspace";

#[derive(Debug, Clone, Default)]
struct StoreState {
    workspaces: Vec<Workspace>,
    active: Option<WorkspaceId>,
}

impl StoreState {
    fn contains(&self, id: &WorkspaceId) -> bool {
        self.workspaces.iter().any(|w| &w.id == id)
    }

    fn active_workspace(&self) -> Option<&Workspace> {
        let id = self.active.as_ref()?;
        self.workspaces.iter().find(|w| &w.id == id)
    }

    /// Point `active` at a member of the set, or at nothing when empty.
    fn repair_active(&mut self) {
        let valid = self.active.as_ref().is_some_and(|id| self.contains(id));
        if !valid {
            self.active = self.workspaces.first().map(|w| w.id.clone());
        }
    }

    fn insert(&mut self, workspace: Workspace) -> Vec<WorkspaceEvent> {
        let id = workspace.id.clone();
        match self.workspaces.iter_mut().find(|w| w.id == id) {
            Some(existing) => *existing = workspace,
            None => self.workspaces.push(workspace),
        }

        let previous = self.active.replace(id.clone());
        let mut events = vec![WorkspaceEvent::Added { id: id.clone() }];
        if previous.as_ref() != Some(&id) {
            events.push(WorkspaceEvent::ActiveChanged {
                previous,
                current: Some(id),
            });
        }
        events
    }

    fn remove(&mut self, id: &WorkspaceId) -> Vec<WorkspaceEvent> {
        self.workspaces.retain(|w| &w.id != id);

        let previous = self.active.clone();
        self.repair_active();

        let mut events = vec![WorkspaceEvent::Deleted { id: id.clone() }];
        if previous != self.active {
            events.push(WorkspaceEvent::ActiveChanged {
                previous,
                current: self.active.clone(),
            });
        }
        events
    }

    fn name_taken(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        self.workspaces
            .iter()
            .any(|w| w.name.to_lowercase() == lower)
    }

    fn snapshot(&self) -> WorkspaceSnapshot {
        WorkspaceSnapshot {
            workspaces: self.workspaces.clone(),
            active: self.active_workspace().cloned(),
        }
    }
}

/// Folders reported by the backend for `name`, in category order.
fn folders_for(listing: &[WorkspaceListing], name: &str) -> Vec<Folder> {
    let Some(entry) = listing.iter().find(|l| l.name == name) else {
        return Vec::new();
    };

    Category::ALL
        .iter()
        .filter_map(|category| {
            entry
                .folders
                .iter()
                .find(|f| f.category == *category)
                .cloned()
        })
        .collect()
}

/// Single source of truth for workspaces and the active workspace
pub struct WorkspaceStore {
    state: RwLock<StoreState>,
    storage: Arc<dyn StateStorage>,
    backend: Arc<dyn StoreBackend>,
    observers: RwLock<Vec<Arc<dyn WorkspaceObserver>>>,
}

impl WorkspaceStore {
    /// Load persisted state and return a fully initialized store.
    pub fn open(storage: Arc<dyn StateStorage>, backend: Arc<dyn StoreBackend>) -> Result<Self> {
        let workspaces: Vec<Workspace> =
            load_json(storage.as_ref(), WORKSPACES_KEY)?.unwrap_or_default();
        let persisted_active: Option<Workspace> =
            load_json::<Option<Workspace>>(storage.as_ref(), ACTIVE_WORKSPACE_KEY)?.flatten();

        let mut state = StoreState {
            workspaces,
            active: persisted_active.map(|w| w.id),
        };
        state.repair_active();

        info!(
            count = state.workspaces.len(),
            active = ?state.active,
            "Loaded workspaces"
        );

        Ok(Self {
            state: RwLock::new(state),
            storage,
            backend,
            observers: RwLock::new(Vec::new()),
        })
    }

    /// Register an observer; observers run in registration order.
    pub fn subscribe(&self, observer: Arc<dyn WorkspaceObserver>) {
        self.observers.write().push(observer);
    }

    pub fn workspaces(&self) -> Vec<Workspace> {
        self.state.read().workspaces.clone()
    }

    pub fn active_workspace(&self) -> Option<Workspace> {
        self.state.read().active_workspace().cloned()
    }

    pub fn active_id(&self) -> Option<WorkspaceId> {
        self.state.read().active.clone()
    }

    pub fn get(&self, id: &WorkspaceId) -> Option<Workspace> {
        self.state
            .read()
            .workspaces
            .iter()
            .find(|w| &w.id == id)
            .cloned()
    }

    pub fn find_by_name(&self, name: &str) -> Option<Workspace> {
        self.state
            .read()
            .workspaces
            .iter()
            .find(|w| w.name == name)
            .cloned()
    }

    pub fn snapshot(&self) -> WorkspaceSnapshot {
        self.state.read().snapshot()
    }

    pub fn len(&self) -> usize {
        self.state.read().workspaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Persisted workspaces with folders taken from the backend listing.
    ///
    /// Workspaces the backend reports but the client never persisted are
    /// left out.
    #[instrument(skip(self))]
    pub async fn list_workspaces(&self) -> Result<Vec<Workspace>> {
        let listing = self.backend.list_workspaces().await?;

        Ok(self
            .workspaces()
            .into_iter()
            .map(|mut ws| {
                ws.folders = folders_for(&listing, &ws.name);
                ws
            })
            .collect())
    }

    /// Append a workspace and make it active.
    pub fn add_workspace(&self, workspace: Workspace) -> Result<Workspace> {
        self.commit(move |state| {
            let events = state.insert(workspace.clone());
            Ok((workspace, events))
        })
    }

    /// Create a workspace with a fresh id and make it active.
    pub fn create_workspace(&self, name: &str) -> Result<Workspace> {
        let name = name.trim();
        if name.is_empty() {
            return Err(WorkspaceError::InvalidName);
        }

        let workspace = Workspace::new(name);
        let created = self.commit(move |state| {
            if state.name_taken(&workspace.name) {
                return Err(WorkspaceError::DuplicateName(workspace.name.clone()));
            }
            let events = state.insert(workspace.clone());
            Ok((workspace, events))
        })?;

        info!(id = %created.id, name = %created.name, "Created workspace");
        Ok(created)
    }

    /// User-initiated deletion; the last workspace cannot be deleted.
    pub fn delete_workspace(&self, id: &WorkspaceId) -> Result<()> {
        self.commit(|state| {
            if !state.contains(id) {
                return Err(WorkspaceError::NotFound(id.clone()));
            }
            if state.workspaces.len() <= 1 {
                return Err(WorkspaceError::MinimumWorkspace);
            }
            Ok(((), state.remove(id)))
        })?;

        info!(id = %id, "Deleted workspace");
        Ok(())
    }

    /// Programmatic deletion without the minimum-count guard.
    pub fn remove_workspace(&self, id: &WorkspaceId) -> Result<()> {
        self.commit(|state| {
            if !state.contains(id) {
                return Err(WorkspaceError::NotFound(id.clone()));
            }
            Ok(((), state.remove(id)))
        })
    }

    pub fn set_active(&self, id: &WorkspaceId) -> Result<Workspace> {
        self.commit(|state| {
            let workspace = state
                .workspaces
                .iter()
                .find(|w| &w.id == id)
                .cloned()
                .ok_or_else(|| WorkspaceError::NotFound(id.clone()))?;

            if state.active.as_ref() == Some(id) {
                return Ok((workspace, Vec::new()));
            }

            let previous = state.active.replace(id.clone());
            Ok((
                workspace,
                vec![WorkspaceEvent::ActiveChanged {
                    previous,
                    current: Some(id.clone()),
                }],
            ))
        })
    }

    /// Reload folder listings from the store backend.
    ///
    /// `updatedAt` moves only for workspaces whose folders changed.
    #[instrument(skip(self))]
    pub async fn refresh_workspaces(&self) -> Result<Vec<Workspace>> {
        let listing = self.backend.list_workspaces().await?;
        let now = Utc::now();

        self.commit(|state| {
            let mut changed = 0usize;
            for ws in state.workspaces.iter_mut() {
                let folders = folders_for(&listing, &ws.name);
                if ws.folders != folders {
                    ws.folders = folders;
                    ws.updated_at = now;
                    changed += 1;
                }
            }
            debug!(changed, "Refreshed folder listings");

            let previous = state.active.clone();
            state.repair_active();

            let mut events = vec![WorkspaceEvent::Refreshed];
            if previous != state.active {
                events.push(WorkspaceEvent::ActiveChanged {
                    previous,
                    current: state.active.clone(),
                });
            }
            Ok((state.workspaces.clone(), events))
        })
    }

    /// Create the default workspace when none exist.
    pub fn ensure_default_workspace(&self) -> Result<Option<Workspace>> {
        let created = self.commit(|state| {
            if !state.workspaces.is_empty() {
                return Ok((None, Vec::new()));
            }
            let workspace = Workspace::new(DEFAULT_WORKSPACE_NAME);
            let events = state.insert(workspace.clone());
            Ok((Some(workspace), events))
        })?;

        if let Some(ref ws) = created {
            info!(id = %ws.id, "Created default workspace");
        }
        Ok(created)
    }

    /// Apply `mutate` to a copy of the state, persist it, swap it in and
    /// notify observers. Nothing is written when no event is produced.
    fn commit<T, F>(&self, mutate: F) -> Result<T>
    where
        F: FnOnce(&mut StoreState) -> Result<(T, Vec<WorkspaceEvent>)>,
    {
        let (value, events, snapshot) = {
            let mut guard = self.state.write();
            let mut next = guard.clone();
            let (value, events) = mutate(&mut next)?;
            if events.is_empty() {
                return Ok(value);
            }

            self.persist(&next)?;
            *guard = next;
            (value, events, guard.snapshot())
        };

        self.notify(&events, &snapshot);
        Ok(value)
    }

    fn persist(&self, state: &StoreState) -> Result<()> {
        save_json(self.storage.as_ref(), WORKSPACES_KEY, &state.workspaces)?;
        match state.active_workspace() {
            Some(active) => save_json(self.storage.as_ref(), ACTIVE_WORKSPACE_KEY, active)?,
            None => self.storage.remove(ACTIVE_WORKSPACE_KEY)?,
        }
        Ok(())
    }

    fn notify(&self, events: &[WorkspaceEvent], snapshot: &WorkspaceSnapshot) {
        let observers = self.observers.read().clone();
        for event in events {
            debug!(event = event.event_type(), "Notifying observers");
            for observer in &observers {
                observer.on_workspace_event(event, snapshot);
            }
        }
    }
}

impl std::fmt::Debug for WorkspaceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("WorkspaceStore")
            .field("workspaces", &state.workspaces.len())
            .field("active", &state.active)
            .field("observers", &self.observers.read().len())
            .finish()
    }
}
