//! Demo lifecycle.

/// Where the demo is in its lifecycle. The world exists only once loaded.
#[derive(Debug)]
pub enum Phase<W> {
    Loading,
    Active(W),
    Inactive(W),
}

impl<W> Default for Phase<W> {
    fn default() -> Self {
        Phase::Loading
    }
}

impl<W> Phase<W> {
    /// Loading → Active. Any other phase keeps its world and drops `world`.
    pub fn load(&mut self, world: W) {
        if matches!(self, Phase::Loading) {
            *self = Phase::Active(world);
        } else {
            log::warn!("load ignored: world already loaded");
        }
    }

    /// Active → Inactive. No-op elsewhere.
    pub fn deactivate(&mut self) {
        match std::mem::replace(self, Phase::Loading) {
            Phase::Active(w) | Phase::Inactive(w) => *self = Phase::Inactive(w),
            Phase::Loading => {}
        }
    }

    /// Inactive → Active. No-op elsewhere.
    pub fn activate(&mut self) {
        match std::mem::replace(self, Phase::Loading) {
            Phase::Inactive(w) | Phase::Active(w) => *self = Phase::Active(w),
            Phase::Loading => {}
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Phase::Loading)
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Phase::Active(_))
    }

    pub fn world(&self) -> Option<&W> {
        match self {
            Phase::Loading => None,
            Phase::Active(w) | Phase::Inactive(w) => Some(w),
        }
    }

    pub fn world_mut(&mut self) -> Option<&mut W> {
        match self {
            Phase::Loading => None,
            Phase::Active(w) | Phase::Inactive(w) => Some(w),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_loading_without_world() {
        let phase: Phase<u32> = Phase::default();
        assert!(phase.is_loading());
        assert!(phase.world().is_none());
    }

    #[test]
    fn load_then_focus_cycle() {
        let mut phase = Phase::default();
        phase.load(7u32);
        assert!(phase.is_active());

        phase.deactivate();
        assert!(matches!(phase, Phase::Inactive(7)));

        phase.activate();
        assert!(matches!(phase, Phase::Active(7)));
    }

    #[test]
    fn second_load_keeps_first_world() {
        let mut phase = Phase::default();
        phase.load(1u32);
        phase.deactivate();
        phase.load(2);
        assert_eq!(phase.world(), Some(&1));
        assert!(!phase.is_active());
    }

    #[test]
    fn focus_changes_before_load_are_ignored() {
        let mut phase: Phase<u32> = Phase::default();
        phase.deactivate();
        phase.activate();
        assert!(phase.is_loading());
    }
}
