use std::cell::RefCell;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormMethod {
    Get,
    Post,
}

impl FormMethod {
    /// Parse a `method` attribute; anything other than `post` falls back to GET.
    pub fn from_attribute(raw: Option<&str>) -> Self {
        match raw {
            Some(value) if value.trim().eq_ignore_ascii_case("post") => Self::Post,
            _ => Self::Get,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormSubmission {
    pub method: FormMethod,
    pub action: Url,
    pub fields: Vec<(String, String)>,
}

#[derive(Debug, Error)]
pub enum NavigationError {
    #[error("failed to encode form data: {0}")]
    Encode(#[from] serde_urlencoded::ser::Error),
}

impl FormSubmission {
    /// The URL the browser would load. GET submissions replace the action's query
    /// with the encoded form data; POST keeps the action as-is and sends a body.
    pub fn target_url(&self) -> Result<Url, NavigationError> {
        match self.method {
            FormMethod::Get => {
                let mut url = self.action.clone();
                let query = serde_urlencoded::to_string(&self.fields)?;
                url.set_query(Some(&query));
                Ok(url)
            }
            FormMethod::Post => Ok(self.action.clone()),
        }
    }

    pub fn body(&self) -> Result<Option<String>, NavigationError> {
        match self.method {
            FormMethod::Get => Ok(None),
            FormMethod::Post => Ok(Some(serde_urlencoded::to_string(&self.fields)?)),
        }
    }
}

/// A navigation leaving the page: a followed link or a submitted form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NavigationRequest {
    Link { url: Url },
    Form(FormSubmission),
}

impl NavigationRequest {
    pub fn url(&self) -> Result<Url, NavigationError> {
        match self {
            Self::Link { url } => Ok(url.clone()),
            Self::Form(submission) => submission.target_url(),
        }
    }
}

/// Where link follows and form submissions are handed off.
pub trait Navigator {
    fn navigate(&self, request: NavigationRequest);
}

/// Navigator that records every request instead of loading anything.
#[derive(Debug, Default)]
pub struct NavigationLog {
    requests: RefCell<Vec<NavigationRequest>>,
}

impl NavigationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<NavigationRequest> {
        self.requests.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.requests.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.borrow().is_empty()
    }

    pub fn take(&self) -> Vec<NavigationRequest> {
        std::mem::take(&mut *self.requests.borrow_mut())
    }
}

impl Navigator for NavigationLog {
    fn navigate(&self, request: NavigationRequest) {
        match request.url() {
            Ok(url) => info!(target = "page", %url, "navigation requested"),
            Err(err) => info!(target = "page", error = %err, "navigation requested"),
        }
        self.requests.borrow_mut().push(request);
    }
}
