use tracing::debug;

/// Blocking yes/no prompt shown before destructive actions.
pub trait ConfirmProvider {
    fn confirm(&self, message: &str) -> bool;
}

/// Always gives the same answer; used headless and in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedAnswer(pub bool);

impl ConfirmProvider for FixedAnswer {
    fn confirm(&self, message: &str) -> bool {
        debug!(target = "confirm", %message, answer = self.0, "answering confirmation prompt");
        self.0
    }
}

impl<F> ConfirmProvider for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, message: &str) -> bool {
        self(message)
    }
}
