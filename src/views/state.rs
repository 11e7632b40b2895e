//! Per-page UI state. Nothing here outlives the page that owns it.
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::SubscribeError;
use crate::models::subscriber::SubscribeOutcome;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MenuState {
    pub open: bool,
}

impl MenuState {
    pub fn from_param(param: Option<&str>) -> Self {
        Self {
            open: param == Some("open"),
        }
    }

    pub fn toggled(self) -> Self {
        Self { open: !self.open }
    }

    /// Query string that renders the page in this state.
    pub fn query(self) -> &'static str {
        if self.open {
            "?menu=open"
        } else {
            ""
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFilter {
    #[default]
    Logs,
    ErrorLogs,
}

impl LogFilter {
    /// Unknown or missing values fall back to the hourly view.
    pub fn from_param(param: Option<&str>) -> Self {
        match param {
            Some("errorLogs") => LogFilter::ErrorLogs,
            _ => LogFilter::Logs,
        }
    }

    pub fn as_param(self) -> &'static str {
        match self {
            LogFilter::Logs => "logs",
            LogFilter::ErrorLogs => "errorLogs",
        }
    }
}

/// Query parameters shared by every page.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub menu: Option<String>,
    pub filter: Option<String>,
}

impl PageQuery {
    pub fn menu(&self) -> MenuState {
        MenuState::from_param(self.menu.as_deref())
    }

    pub fn filter(&self) -> LogFilter {
        LogFilter::from_param(self.filter.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Success(String),
    Info(String),
    Failure(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubscribeForm {
    pub email: String,
    pub notice: Option<Notice>,
}

impl SubscribeForm {
    pub fn with_email(email: &str) -> Self {
        Self {
            email: email.to_string(),
            notice: None,
        }
    }

    /// The input is cleared only after a new subscription; on failure it stays for a retry.
    pub fn apply(&mut self, result: &Result<SubscribeOutcome, SubscribeError>) {
        self.notice = Some(match result {
            Ok(SubscribeOutcome::Subscribed { .. }) => {
                self.email.clear();
                Notice::Success("Thanks for subscribing! We'll keep you posted.".to_string())
            }
            Ok(SubscribeOutcome::AlreadySubscribed) => {
                Notice::Info("This email is already subscribed.".to_string())
            }
            Err(SubscribeError::InvalidEmail(_)) => {
                Notice::Failure("Please enter a valid email address.".to_string())
            }
            Err(SubscribeError::Gateway(_)) => {
                Notice::Failure("Subscription failed. Please try again.".to_string())
            }
        });
    }
}

/// State owned by one page for as long as it is mounted.
///
/// Async work started by the page hands its result to `apply`; once the page
/// is unmounted those late results are dropped instead of written.
pub struct PageSession<S> {
    state: Arc<Mutex<S>>,
    mounted: Arc<AtomicBool>,
}

impl<S> Clone for PageSession<S> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            mounted: Arc::clone(&self.mounted),
        }
    }
}

impl<S: Clone> PageSession<S> {
    pub fn mount(initial: S) -> Self {
        Self {
            state: Arc::new(Mutex::new(initial)),
            mounted: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    /// Runs `update` against the state if the page is still mounted. Returns whether it ran.
    pub fn apply<F>(&self, update: F) -> bool
    where
        F: FnOnce(&mut S),
    {
        if !self.is_mounted() {
            log::debug!("Discarding update for an unmounted page");
            return false;
        }
        match self.state.lock() {
            Ok(mut state) => {
                update(&mut state);
                true
            }
            Err(_) => false,
        }
    }

    pub fn snapshot(&self) -> Option<S> {
        self.state.lock().ok().map(|state| state.clone())
    }

    pub fn unmount(&self) {
        self.mounted.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;

    #[test]
    fn test_menu_toggle() {
        let closed = MenuState::from_param(None);
        assert!(!closed.open);
        assert_eq!(closed.toggled().query(), "?menu=open");
        assert!(!MenuState::from_param(Some("open")).toggled().open);
    }

    #[test]
    fn test_filter_defaults_to_logs() {
        assert_eq!(LogFilter::from_param(None), LogFilter::Logs);
        assert_eq!(LogFilter::from_param(Some("errorLogs")), LogFilter::ErrorLogs);
        assert_eq!(LogFilter::from_param(Some("bogus")), LogFilter::Logs);
        assert_eq!(LogFilter::ErrorLogs.as_param(), "errorLogs");
    }

    #[test]
    fn test_form_clears_only_on_success() {
        let mut form = SubscribeForm::with_email("a@b.co");
        form.apply(&Ok(SubscribeOutcome::Subscribed { id: "1".to_string() }));
        assert_eq!(form.email, "");
        assert!(matches!(form.notice, Some(Notice::Success(_))));

        let mut form = SubscribeForm::with_email("a@b.co");
        form.apply(&Ok(SubscribeOutcome::AlreadySubscribed));
        assert_eq!(form.email, "a@b.co");

        let mut form = SubscribeForm::with_email("a@b.co");
        form.apply(&Err(SubscribeError::Gateway(GatewayError::Decode("x".to_string()))));
        assert_eq!(form.email, "a@b.co");
        assert!(matches!(form.notice, Some(Notice::Failure(_))));
    }

    #[test]
    fn test_session_discards_late_updates() {
        let session = PageSession::mount(0u32);
        let handle = session.clone();

        assert!(handle.apply(|n| *n += 1));
        session.unmount();
        assert!(!handle.apply(|n| *n += 1));
        assert_eq!(session.snapshot(), Some(1));
    }

    #[tokio::test]
    async fn test_result_arriving_after_unmount_is_dropped() {
        let session = PageSession::mount(Vec::<u32>::new());
        let (tx, rx) = tokio::sync::oneshot::channel::<Vec<u32>>();

        let worker = {
            let session = session.clone();
            tokio::spawn(async move {
                if let Ok(result) = rx.await {
                    session.apply(|state| *state = result);
                }
            })
        };

        session.unmount();
        tx.send(vec![1, 2, 3]).unwrap();
        worker.await.unwrap();

        assert_eq!(session.snapshot(), Some(Vec::new()));
    }
}
