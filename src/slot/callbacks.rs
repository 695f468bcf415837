use crate::ad::AdCandidate;
use crate::error::AdSlotError;
use std::fmt;

type AdCallback = Box<dyn Fn(&AdCandidate) + Send + Sync>;

/// Lifecycle callbacks supplied by the host page
#[derive(Default)]
pub struct Callbacks {
    on_load: Option<AdCallback>,
    on_click: Option<AdCallback>,
    on_close: Option<Box<dyn Fn() + Send + Sync>>,
    on_impression: Option<AdCallback>,
    on_error: Option<Box<dyn Fn(&AdSlotError) + Send + Sync>>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called when a new ad is committed to the slot
    pub fn on_load(mut self, f: impl Fn(&AdCandidate) + Send + Sync + 'static) -> Self {
        self.on_load = Some(Box::new(f));
        self
    }

    pub fn on_click(mut self, f: impl Fn(&AdCandidate) + Send + Sync + 'static) -> Self {
        self.on_click = Some(Box::new(f));
        self
    }

    pub fn on_close(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_close = Some(Box::new(f));
        self
    }

    pub fn on_impression(mut self, f: impl Fn(&AdCandidate) + Send + Sync + 'static) -> Self {
        self.on_impression = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&AdSlotError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    pub(crate) fn emit_load(&self, ad: &AdCandidate) {
        if let Some(f) = &self.on_load {
            f(ad);
        }
    }

    pub(crate) fn emit_click(&self, ad: &AdCandidate) {
        if let Some(f) = &self.on_click {
            f(ad);
        }
    }

    pub(crate) fn emit_close(&self) {
        if let Some(f) = &self.on_close {
            f();
        }
    }

    pub(crate) fn emit_impression(&self, ad: &AdCandidate) {
        if let Some(f) = &self.on_impression {
            f(ad);
        }
    }

    pub(crate) fn emit_error(&self, error: &AdSlotError) {
        if let Some(f) = &self.on_error {
            f(error);
        }
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_load", &self.on_load.is_some())
            .field("on_click", &self.on_click.is_some())
            .field("on_close", &self.on_close.is_some())
            .field("on_impression", &self.on_impression.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}
