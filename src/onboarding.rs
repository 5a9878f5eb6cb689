//! Onboarding carousel

use serde::Serialize;

/// One page of the onboarding carousel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OnboardingStep {
    pub title: &'static str,
    pub subtitle: &'static str,
    pub description: &'static str,
}

/// Built-in onboarding pages
pub const DEFAULT_STEPS: &[OnboardingStep] = &[
    OnboardingStep {
        title: "Welcome to BackZap",
        subtitle: "The fastest way to remove backgrounds from your photos",
        description: "Transform your images with just one tap using our powerful AI technology.",
    },
    OnboardingStep {
        title: "Upload Any Photo",
        subtitle: "Select from gallery or take a new photo",
        description: "Works best with clear subjects and good lighting. Portrait photos give amazing results.",
    },
    OnboardingStep {
        title: "Instant Processing",
        subtitle: "AI removes backgrounds in seconds",
        description: "Our advanced algorithms automatically detect and remove backgrounds with precision.",
    },
    OnboardingStep {
        title: "Save & Share",
        subtitle: "Download or share your creations",
        description: "Save to your gallery, share on social media, or use in your projects.",
    },
];

/// Result of advancing the carousel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnboardingAction {
    /// Moved to the page at this index
    Advanced(usize),
    /// Past the last page; hand over to the editor
    Finished,
}

/// Carousel position over a fixed list of steps
#[derive(Debug, Clone)]
pub struct OnboardingFlow {
    steps: &'static [OnboardingStep],
    current: usize,
    finished: bool,
}

impl Default for OnboardingFlow {
    fn default() -> Self {
        Self::new(DEFAULT_STEPS)
    }
}

impl OnboardingFlow {
    /// An empty step list is finished immediately
    #[must_use]
    pub fn new(steps: &'static [OnboardingStep]) -> Self {
        Self {
            steps,
            current: 0,
            finished: steps.is_empty(),
        }
    }

    /// Page being shown, `None` once finished
    #[must_use]
    pub fn current(&self) -> Option<&OnboardingStep> {
        if self.finished {
            None
        } else {
            self.steps.get(self.current)
        }
    }

    /// Go to the next page, or finish on the last one
    pub fn next(&mut self) -> OnboardingAction {
        if self.finished {
            return OnboardingAction::Finished;
        }
        if self.current + 1 < self.steps.len() {
            self.current += 1;
            OnboardingAction::Advanced(self.current)
        } else {
            self.finished = true;
            OnboardingAction::Finished
        }
    }

    pub fn skip(&mut self) -> OnboardingAction {
        self.finished = true;
        OnboardingAction::Finished
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// `(index, total)` for the step indicator
    #[must_use]
    pub fn progress(&self) -> (usize, usize) {
        (self.current, self.steps.len())
    }
}
