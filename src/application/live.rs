// src/application/live.rs
use crate::application::NoteRepository;
use crate::domain::{group_by_pinned, DomainError, Folder, Header, Item};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tokio::sync::watch::error::RecvError;
use tracing::{trace, warn};

pub(crate) type SharedRepository<R> = Arc<Mutex<R>>;

pub(crate) fn lock<R>(repository: &SharedRepository<R>) -> Result<MutexGuard<'_, R>, DomainError> {
    repository
        .lock()
        .map_err(|_| DomainError::Storage("note store lock poisoned".to_string()))
}

/// Section headers injected by `group_by_pinned`
#[derive(Debug, Clone)]
pub struct Headers {
    pub pinned: Header,
    pub others: Header,
}

impl Headers {
    pub fn group(&self, notes: Vec<crate::domain::Note>) -> Vec<Item> {
        group_by_pinned(notes, &self.pinned, &self.others)
    }
}

/// Latest value of a query that is re-run after every store change
#[derive(Debug, Clone)]
pub struct Live<T> {
    receiver: watch::Receiver<T>,
}

/// Grouped notes of a folder, a label or a search
pub type LiveList = Live<Vec<Item>>;

/// All label values, sorted
pub type LiveLabels = Live<Vec<String>>;

impl<T: Clone> Live<T> {
    fn new(receiver: watch::Receiver<T>) -> Self {
        Self { receiver }
    }

    pub fn current(&self) -> T {
        (*self.receiver.borrow()).clone()
    }

    /// Wait for the next published value
    pub async fn changed(&mut self) -> Result<T, RecvError> {
        self.receiver.changed().await?;
        Ok((*self.receiver.borrow_and_update()).clone())
    }

    /// Wait until the published value satisfies `predicate`
    pub async fn wait_for(&mut self, predicate: impl FnMut(&T) -> bool) -> Result<T, RecvError> {
        let value = self.receiver.wait_for(predicate).await?;
        Ok((*value).clone())
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.receiver.clone()
    }
}

async fn run_query<R, T, F>(repository: &SharedRepository<R>, query: &Arc<F>) -> Option<T>
where
    R: NoteRepository,
    T: Send + 'static,
    F: Fn(&mut R) -> Result<T, DomainError> + Send + Sync + 'static,
{
    let repository = Arc::clone(repository);
    let query = Arc::clone(query);
    let result = tokio::task::spawn_blocking(move || {
        let mut guard = lock(&repository)?;
        query(&mut *guard)
    })
    .await;

    match result {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            warn!(error = %e, "Live query failed");
            None
        }
        Err(e) => {
            warn!(error = %e, "Live query task aborted");
            None
        }
    }
}

/// Publish `query` now and again after every change seen on `changes`.
///
/// Runs until the store or every receiver of the result goes away.
pub(crate) fn spawn_live<R, T, F>(
    repository: SharedRepository<R>,
    mut changes: watch::Receiver<u64>,
    query: F,
) -> Live<T>
where
    R: NoteRepository,
    T: Clone + Default + Send + Sync + 'static,
    F: Fn(&mut R) -> Result<T, DomainError> + Send + Sync + 'static,
{
    let (sender, receiver) = watch::channel(T::default());
    let query = Arc::new(query);

    tokio::spawn(async move {
        loop {
            let revision = *changes.borrow_and_update();
            if let Some(value) = run_query(&repository, &query).await {
                trace!(revision, "Publishing live query result");
                if sender.send(value).is_err() {
                    break;
                }
            }
            tokio::select! {
                changed = changes.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = sender.closed() => break,
            }
        }
    });

    Live::new(receiver)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
    pub keyword: String,
    pub folder: Folder,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            keyword: String::new(),
            folder: Folder::Notes,
        }
    }
}

/// Search stream re-run whenever the keyword, the folder or the store changes
#[derive(Debug)]
pub struct SearchResults {
    params: watch::Sender<SearchParams>,
    results: LiveList,
}

impl SearchResults {
    pub(crate) fn spawn<R: NoteRepository>(
        repository: SharedRepository<R>,
        mut changes: watch::Receiver<u64>,
        headers: Arc<Headers>,
    ) -> Self {
        let (params, mut params_rx) = watch::channel(SearchParams::default());
        let (sender, receiver) = watch::channel(Vec::new());

        tokio::spawn(async move {
            loop {
                let current = params_rx.borrow_and_update().clone();
                changes.borrow_and_update();

                let headers = Arc::clone(&headers);
                let query = Arc::new(move |repository: &mut R| -> Result<Vec<Item>, DomainError> {
                    let notes = repository.search(&current.keyword, current.folder)?;
                    Ok(headers.group(notes))
                });
                if let Some(items) = run_query(&repository, &query).await {
                    if sender.send(items).is_err() {
                        break;
                    }
                }

                tokio::select! {
                    changed = params_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    changed = changes.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    _ = sender.closed() => break,
                }
            }
        });

        Self {
            params,
            results: Live::new(receiver),
        }
    }

    /// Returns whether the keyword changed and a refetch was triggered
    pub fn set_keyword(&self, keyword: &str) -> bool {
        self.params.send_if_modified(|params| {
            if params.keyword == keyword {
                return false;
            }
            params.keyword = keyword.to_string();
            true
        })
    }

    /// Returns whether the folder changed and a refetch was triggered
    pub fn set_folder(&self, folder: Folder) -> bool {
        self.params.send_if_modified(|params| {
            if params.folder == folder {
                return false;
            }
            params.folder = folder;
            true
        })
    }

    pub fn params(&self) -> SearchParams {
        self.params.borrow().clone()
    }

    pub fn results(&self) -> LiveList {
        self.results.clone()
    }
}
