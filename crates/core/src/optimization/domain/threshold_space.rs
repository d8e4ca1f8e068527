/// Move between adjacent candidate thresholds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    Decrease = 0,
    Increase = 1,
}

impl Action {
    pub const ALL: [Action; 2] = [Action::Decrease, Action::Increase];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Action> {
        match index {
            0 => Some(Action::Decrease),
            1 => Some(Action::Increase),
            _ => None,
        }
    }
}

/// Ordered, non-empty list of candidate confidence thresholds.
///
/// States are indices into this list. Actions saturate at both ends.
#[derive(Clone, Debug, PartialEq)]
pub struct ThresholdSpace {
    candidates: Vec<f64>,
}

impl ThresholdSpace {
    pub fn new(candidates: Vec<f64>) -> Result<Self, String> {
        if candidates.is_empty() {
            return Err("candidate threshold list is empty".into());
        }
        if let Some(bad) = candidates.iter().find(|t| !(0.0..=1.0).contains(*t)) {
            return Err(format!("candidate threshold {bad} is outside [0, 1]"));
        }
        if candidates.windows(2).any(|w| w[0] >= w[1]) {
            return Err("candidate thresholds must be strictly ascending".into());
        }
        Ok(Self { candidates })
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn threshold(&self, state: usize) -> f64 {
        self.candidates[state]
    }

    pub fn candidates(&self) -> &[f64] {
        &self.candidates
    }

    /// Destination state of `action` from `state`, clamped to the list.
    pub fn apply(&self, state: usize, action: Action) -> usize {
        match action {
            Action::Decrease => state.saturating_sub(1),
            Action::Increase => (state + 1).min(self.len() - 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn space() -> ThresholdSpace {
        ThresholdSpace::new(vec![0.2, 0.3, 0.4]).unwrap()
    }

    #[rstest]
    #[case(0, Action::Decrease, 0)]
    #[case(0, Action::Increase, 1)]
    #[case(1, Action::Decrease, 0)]
    #[case(1, Action::Increase, 2)]
    #[case(2, Action::Increase, 2)]
    fn test_apply_saturates(#[case] state: usize, #[case] action: Action, #[case] expected: usize) {
        assert_eq!(space().apply(state, action), expected);
    }

    #[test]
    fn test_single_candidate_never_moves() {
        let s = ThresholdSpace::new(vec![0.5]).unwrap();
        assert_eq!(s.apply(0, Action::Decrease), 0);
        assert_eq!(s.apply(0, Action::Increase), 0);
    }

    #[rstest]
    #[case::empty(vec![])]
    #[case::descending(vec![0.4, 0.3])]
    #[case::duplicate(vec![0.3, 0.3])]
    #[case::out_of_range(vec![0.5, 1.5])]
    fn test_rejects_invalid_lists(#[case] candidates: Vec<f64>) {
        assert!(ThresholdSpace::new(candidates).is_err());
    }

    #[test]
    fn test_action_index_round_trip() {
        for action in Action::ALL {
            assert_eq!(Action::from_index(action.index()), Some(action));
        }
        assert_eq!(Action::from_index(2), None);
    }
}
