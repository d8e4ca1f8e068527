use ndarray::{Array1, Array2, Axis};

use super::threshold_space::Action;

/// Action values indexed by `[state, action]`, zero-initialized.
#[derive(Clone, Debug, PartialEq)]
pub struct QTable {
    values: Array2<f64>,
}

impl QTable {
    pub fn new(num_states: usize) -> Self {
        Self {
            values: Array2::zeros((num_states, Action::ALL.len())),
        }
    }

    pub fn num_states(&self) -> usize {
        self.values.nrows()
    }

    pub fn get(&self, state: usize, action: Action) -> f64 {
        self.values[[state, action.index()]]
    }

    /// Greedy action for `state`; ties go to the lowest action index.
    pub fn best_action(&self, state: usize) -> Action {
        let row = self.values.row(state);
        let mut best = 0;
        for (i, v) in row.iter().enumerate().skip(1) {
            if *v > row[best] {
                best = i;
            }
        }
        Action::from_index(best).unwrap_or(Action::Decrease)
    }

    pub fn max_value(&self, state: usize) -> f64 {
        self.values
            .row(state)
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Temporal-difference update
    /// `Q[s,a] = (1 - alpha) Q[s,a] + alpha (reward + gamma max Q[next,:])`.
    /// Returns the new value.
    pub fn update(
        &mut self,
        state: usize,
        action: Action,
        reward: f64,
        next_state: usize,
        alpha: f64,
        gamma: f64,
    ) -> f64 {
        let target = reward + gamma * self.max_value(next_state);
        let cell = &mut self.values[[state, action.index()]];
        *cell = (1.0 - alpha) * *cell + alpha * target;
        *cell
    }

    /// Mean action value per state.
    pub fn state_means(&self) -> Array1<f64> {
        self.values
            .mean_axis(Axis(1))
            .unwrap_or_else(|| Array1::zeros(self.num_states()))
    }

    /// State with the highest mean action value; the first one wins ties.
    pub fn recommended_state(&self) -> usize {
        let means = self.state_means();
        let mut best = 0;
        for (i, v) in means.iter().enumerate().skip(1) {
            if *v > means[best] {
                best = i;
            }
        }
        best
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_new_table_is_zero() {
        let q = QTable::new(4);
        assert_eq!(q.values().shape(), &[4, 2]);
        assert!(q.values().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_update_is_convex_combination() {
        let mut q = QTable::new(3);
        q.values[[0, 1]] = 4.0;
        q.values[[2, 0]] = 1.0;
        q.values[[2, 1]] = 3.0;

        let (alpha, gamma, reward) = (0.25, 0.5, 10.0);
        let target = reward + gamma * 3.0;
        let new = q.update(0, Action::Increase, reward, 2, alpha, gamma);

        assert_relative_eq!(new, 0.75 * 4.0 + 0.25 * target);
        assert!(new >= 4.0_f64.min(target) && new <= 4.0_f64.max(target));
        assert_relative_eq!(q.get(0, Action::Increase), new);
    }

    #[test]
    fn test_alpha_zero_leaves_value() {
        let mut q = QTable::new(2);
        q.values[[1, 0]] = 2.5;
        assert_relative_eq!(q.update(1, Action::Decrease, 100.0, 0, 0.0, 0.9), 2.5);
    }

    #[test]
    fn test_alpha_one_takes_target() {
        let mut q = QTable::new(2);
        q.values[[1, 1]] = 6.0;
        assert_relative_eq!(q.update(0, Action::Decrease, 1.0, 1, 1.0, 0.5), 4.0);
    }

    #[test]
    fn test_best_action_prefers_lowest_on_tie() {
        let mut q = QTable::new(2);
        assert_eq!(q.best_action(0), Action::Decrease);
        q.values[[1, 1]] = 0.1;
        assert_eq!(q.best_action(1), Action::Increase);
    }

    #[test]
    fn test_recommended_state_first_max_wins() {
        let mut q = QTable::new(4);
        q.values[[1, 0]] = 2.0;
        q.values[[3, 1]] = 2.0;
        assert_eq!(q.recommended_state(), 1);
        assert_relative_eq!(q.state_means()[1], 1.0);
    }

    #[test]
    fn test_all_zero_recommends_first_state() {
        assert_eq!(QTable::new(5).recommended_state(), 0);
    }
}
