use tokio::sync::watch;

use super::{AuthSession, GuardOutcome, HOME_ROUTE, Navigation, RouteTable};

/// Navigator
///
/// Performs navigation on behalf of the guards. Fire-and-forget: a later navigation
/// simply supersedes an earlier one.
pub trait Navigator: Send + Sync {
    fn navigate(&self, navigation: &Navigation);
}

/// History
///
/// Client-side history stack published through a `watch` channel. The last entry is
/// the current location.
#[derive(Clone)]
pub struct History {
    tx: watch::Sender<Vec<String>>,
}

impl History {
    pub fn new(initial: &str) -> Self {
        let (tx, _rx) = watch::channel(vec![initial.to_string()]);
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<String>> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> String {
        current_path(&self.tx.borrow())
    }

    pub fn entries(&self) -> Vec<String> {
        self.tx.borrow().clone()
    }

    pub fn push(&self, path: &str) {
        self.tx.send_modify(|entries| entries.push(path.to_string()));
    }

    pub fn replace(&self, path: &str) {
        self.tx.send_modify(|entries| match entries.last_mut() {
            Some(last) => *last = path.to_string(),
            None => entries.push(path.to_string()),
        });
    }

    /// Browser "back". The first entry is never popped.
    pub fn back(&self) {
        self.tx.send_if_modified(|entries| {
            if entries.len() > 1 {
                entries.pop();
                true
            } else {
                false
            }
        });
    }
}

impl Navigator for History {
    fn navigate(&self, navigation: &Navigation) {
        if navigation.replace {
            self.replace(&navigation.to);
        } else {
            self.push(&navigation.to);
        }
    }
}

fn current_path(entries: &[String]) -> String {
    entries
        .last()
        .cloned()
        .unwrap_or_else(|| HOME_ROUTE.to_string())
}

/// GuardRuntime
///
/// Recomputes the guard outcome on every session or location change and performs the
/// requested navigation only on the transition into a redirecting outcome. A redirect is
/// issued once per source path: re-evaluating the same path does not navigate again, but
/// the same redirect requested from a different path does.
pub struct GuardRuntime<N> {
    table: RouteTable,
    navigator: N,
    // Source path and the navigation issued from it.
    last_issued: Option<(String, Navigation)>,
}

impl<N: Navigator> GuardRuntime<N> {
    pub fn new(table: RouteTable, navigator: N) -> Self {
        Self {
            table,
            navigator,
            last_issued: None,
        }
    }

    pub fn navigator(&self) -> &N {
        &self.navigator
    }

    /// evaluate
    ///
    /// One render pass: pure decision first, then the navigation effect if this pass
    /// entered a redirecting state.
    pub fn evaluate(&mut self, session: &AuthSession, path: &str) -> GuardOutcome {
        let outcome = self.table.resolve(session, path);

        match &outcome.navigation {
            Some(navigation) => {
                let already_issued = self
                    .last_issued
                    .as_ref()
                    .is_some_and(|(from, issued)| from == path && issued == navigation);
                if !already_issued {
                    tracing::debug!(from = path, to = %navigation.to, "guard navigation");
                    self.navigator.navigate(navigation);
                    self.last_issued = Some((path.to_string(), navigation.clone()));
                }
            }
            None => self.last_issued = None,
        }

        outcome
    }

    /// run
    ///
    /// Drives [`GuardRuntime::evaluate`] from the auth session and history channels until
    /// either sender is dropped. Every outcome is published on `outcomes`.
    pub async fn run(
        mut self,
        mut session_rx: watch::Receiver<AuthSession>,
        mut history_rx: watch::Receiver<Vec<String>>,
        outcomes: watch::Sender<Option<GuardOutcome>>,
    ) {
        loop {
            let session = session_rx.borrow_and_update().clone();
            let path = current_path(&history_rx.borrow_and_update());

            let outcome = self.evaluate(&session, &path);
            outcomes.send_replace(Some(outcome));

            tokio::select! {
                changed = session_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                changed = history_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        tracing::debug!("guard runtime stopped");
    }
}
