/// Transient banner shown after a sign-in attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feedback {
    Error(String),
    Success(String),
}

impl Feedback {
    pub fn message(&self) -> &str {
        match self {
            Feedback::Error(message) | Feedback::Success(message) => message,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Feedback::Error(_))
    }
}

/// At most one active banner.
///
/// Every change bumps `generation`; an expiry timer armed for an older
/// generation is a no-op, so a replaced banner never takes the new one with it.
#[derive(Debug, Default)]
pub struct FeedbackState {
    current: Option<Feedback>,
    generation: u64,
}

impl FeedbackState {
    pub fn current(&self) -> Option<&Feedback> {
        self.current.as_ref()
    }

    /// Replaces the banner and returns the generation to arm a timer for.
    pub fn show(&mut self, feedback: Feedback) -> u64 {
        self.generation += 1;
        self.current = Some(feedback);
        self.generation
    }

    /// Drops whatever is showing. Returns true if something was cleared.
    pub fn clear(&mut self) -> bool {
        self.generation += 1;
        self.current.take().is_some()
    }

    /// Timer-driven clear; only acts if nothing changed since `generation`.
    pub fn expire(&mut self, generation: u64) -> bool {
        if self.generation != generation {
            return false;
        }
        self.clear()
    }
}
