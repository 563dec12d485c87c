//! Instrumentation hook
//!
//! An observer attached to the training loop. The controller notifies the
//! hook on phase transitions and after each training epoch; the null variant
//! makes instrumentation free when disabled, without `if` branching at every
//! call site.

use tracing::debug;

/// Phase the model is currently running in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Train,
    Eval,
}

/// Observer notified of training-loop events
pub trait Hook {
    /// Called once before training with the backbone name
    fn register_model(&mut self, model_name: &str);

    /// Called once before training with the loss criterion name
    fn register_loss(&mut self, criterion: &str);

    /// Called whenever the loop switches between training and evaluation
    fn set_mode(&mut self, mode: Mode);

    /// Called after each training epoch with its average loss
    fn record_loss(&mut self, epoch: usize, loss: f64);
}

/// Hook that ignores every event
#[derive(Debug, Default)]
pub struct NullHook;

impl Hook for NullHook {
    fn register_model(&mut self, _model_name: &str) {}
    fn register_loss(&mut self, _criterion: &str) {}
    fn set_mode(&mut self, _mode: Mode) {}
    fn record_loss(&mut self, _epoch: usize, _loss: f64) {}
}

/// Hook that traces events to the log
#[derive(Debug, Default)]
pub struct TraceHook {
    mode: Option<Mode>,
    transitions: usize,
    registrations: Vec<String>,
    losses: Vec<(usize, f64)>,
}

impl TraceHook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of mode transitions observed so far
    pub fn transitions(&self) -> usize {
        self.transitions
    }

    /// Names registered at startup (model, then loss criterion)
    pub fn registrations(&self) -> &[String] {
        &self.registrations
    }

    /// Recorded `(epoch, loss)` pairs
    pub fn losses(&self) -> &[(usize, f64)] {
        &self.losses
    }
}

impl Hook for TraceHook {
    fn register_model(&mut self, model_name: &str) {
        debug!("hook: registered model '{}'", model_name);
        self.registrations.push(model_name.to_string());
    }

    fn register_loss(&mut self, criterion: &str) {
        debug!("hook: registered loss '{}'", criterion);
        self.registrations.push(criterion.to_string());
    }

    fn set_mode(&mut self, mode: Mode) {
        if self.mode != Some(mode) {
            self.transitions += 1;
            debug!("hook: mode -> {:?}", mode);
        }
        self.mode = Some(mode);
    }

    fn record_loss(&mut self, epoch: usize, loss: f64) {
        debug!("hook: epoch {} loss {:.6}", epoch, loss);
        self.losses.push((epoch, loss));
    }
}

/// Build the hook selected by the CLI flag
pub fn create(enabled: bool) -> Box<dyn Hook> {
    if enabled {
        Box::new(TraceHook::new())
    } else {
        Box::new(NullHook)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_hook_counts_transitions() {
        let mut hook = TraceHook::new();
        hook.set_mode(Mode::Train);
        hook.set_mode(Mode::Train);
        hook.set_mode(Mode::Eval);
        hook.set_mode(Mode::Train);
        assert_eq!(hook.transitions(), 3);
    }

    #[test]
    fn test_trace_hook_records_losses() {
        let mut hook = TraceHook::new();
        hook.record_loss(1, 0.9);
        hook.record_loss(2, 0.5);
        assert_eq!(hook.losses(), &[(1, 0.9), (2, 0.5)]);
    }

    #[test]
    fn test_trace_hook_records_registrations() {
        let mut hook = TraceHook::new();
        hook.register_model("resnet18");
        hook.register_loss("cross_entropy");
        assert_eq!(hook.registrations(), &["resnet18", "cross_entropy"]);
    }

    #[test]
    fn test_null_hook_is_inert() {
        let mut hook = NullHook;
        hook.register_model("resnet18");
        hook.register_loss("cross_entropy");
        hook.set_mode(Mode::Eval);
        hook.record_loss(1, 0.1);
    }

    #[test]
    fn test_create_selects_variant() {
        let mut enabled = create(true);
        let mut disabled = create(false);
        enabled.set_mode(Mode::Train);
        disabled.set_mode(Mode::Train);
    }
}
