//! A lazy, restartable choice of zero or more alternatives.
//!
//! `Choice` is the backtracking backbone of the matcher: every way a
//! pattern can match yields one option, and sequential matching steps
//! compose with `then_choose`. Options are produced lazily and in a
//! deterministic left-to-right order, so "first match wins" callers get a
//! stable result and never pay for alternatives they do not consume.
//!
//! Nothing is cached: the value is a shared producing closure, and every
//! iteration re-runs it. Callers that need an option more than once must
//! capture it.

use std::rc::Rc;

/// Zero or more ways a computation can succeed.
pub struct Choice<'a, T> {
    produce: Rc<dyn Fn() -> Box<dyn Iterator<Item = T> + 'a> + 'a>,
}

impl<'a, T> Clone for Choice<'a, T> {
    fn clone(&self) -> Self {
        Choice { produce: Rc::clone(&self.produce) }
    }
}

impl<'a, T: 'a> Choice<'a, T> {
    /// The empty choice: the identity for `or`, absorbing for
    /// `then_choose`.
    pub fn none() -> Self {
        Choice { produce: Rc::new(|| Box::new(std::iter::empty())) }
    }

    /// A choice with exactly one option.
    pub fn of(value: T) -> Self
    where
        T: Clone,
    {
        Choice { produce: Rc::new(move || Box::new(std::iter::once(value.clone()))) }
    }

    /// A choice over the elements of a vector, in order.
    pub fn from_vec(values: Vec<T>) -> Self
    where
        T: Clone,
    {
        if values.is_empty() {
            return Choice::none();
        }
        Choice { produce: Rc::new(move || Box::new(values.clone().into_iter())) }
    }

    /// A choice with one option if present, none otherwise.
    pub fn from_option(value: Option<T>) -> Self
    where
        T: Clone,
    {
        match value {
            Some(v) => Choice::of(v),
            None => Choice::none(),
        }
    }

    /// `value` as the only option if `condition` holds, none otherwise.
    pub fn when(condition: bool, value: T) -> Self
    where
        T: Clone,
    {
        if condition {
            Choice::of(value)
        } else {
            Choice::none()
        }
    }

    /// All options of all the given choices, in order.
    pub fn any(choices: Vec<Choice<'a, T>>) -> Self {
        Choice {
            produce: Rc::new(move || {
                Box::new(choices.clone().into_iter().flat_map(|c| c.into_iter()))
            }),
        }
    }

    /// Iterate the options. Each call restarts the computation.
    pub fn iter(&self) -> Box<dyn Iterator<Item = T> + 'a> {
        (self.produce)()
    }

    /// The first option, if any.
    pub fn first(&self) -> Option<T> {
        self.iter().next()
    }

    /// Monadic bind: for every option, every option of `f` applied to it,
    /// preserving first-found-first-returned order.
    pub fn then_choose<R: 'a>(self, f: impl Fn(T) -> Choice<'a, R> + 'a) -> Choice<'a, R> {
        let f = Rc::new(f);
        let produce = self.produce;
        Choice {
            produce: Rc::new(move || {
                let f = Rc::clone(&f);
                Box::new((produce)().flat_map(move |t| f(t).into_iter()))
            }),
        }
    }

    /// Bind through an optional step: options for which `f` returns
    /// `None` are dropped.
    pub fn then_option<R: 'a>(self, f: impl Fn(T) -> Option<R> + 'a) -> Choice<'a, R> {
        let f = Rc::new(f);
        let produce = self.produce;
        Choice {
            produce: Rc::new(move || {
                let f = Rc::clone(&f);
                Box::new((produce)().filter_map(move |t| f(t)))
            }),
        }
    }

    /// Functor map over the options.
    pub fn transform<R: 'a>(self, f: impl Fn(T) -> R + 'a) -> Choice<'a, R> {
        let f = Rc::new(f);
        let produce = self.produce;
        Choice {
            produce: Rc::new(move || {
                let f = Rc::clone(&f);
                Box::new((produce)().map(move |t| f(t)))
            }),
        }
    }

    /// The options of `self` followed by the options of `other`.
    pub fn or(self, other: Choice<'a, T>) -> Choice<'a, T> {
        let a = self.produce;
        let b = other.produce;
        Choice { produce: Rc::new(move || Box::new((a)().chain((b)()))) }
    }

    /// Keep only the options satisfying `predicate`.
    pub fn condition(self, predicate: impl Fn(&T) -> bool + 'a) -> Choice<'a, T> {
        let predicate = Rc::new(predicate);
        let produce = self.produce;
        Choice {
            produce: Rc::new(move || {
                let predicate = Rc::clone(&predicate);
                Box::new((produce)().filter(move |t| predicate(t)))
            }),
        }
    }

    /// This choice if `condition` holds, the empty choice otherwise.
    pub fn require(self, condition: bool) -> Choice<'a, T> {
        if condition {
            self
        } else {
            Choice::none()
        }
    }
}

impl<'a, T: 'a> IntoIterator for Choice<'a, T> {
    type Item = T;
    type IntoIter = Box<dyn Iterator<Item = T> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        (self.produce)()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn collect<T: 'static>(c: &Choice<'static, T>) -> Vec<T> {
        c.iter().collect()
    }

    #[test]
    fn none_is_identity_for_or() {
        let c = Choice::from_vec(vec![1, 2, 3]).or(Choice::none());
        assert_eq!(collect(&c), vec![1, 2, 3]);
        let c = Choice::none().or(Choice::from_vec(vec![1, 2, 3]));
        assert_eq!(collect(&c), vec![1, 2, 3]);
    }

    #[test]
    fn none_absorbs_then_choose() {
        let c: Choice<i32> = Choice::none().then_choose(|x: i32| Choice::of(x + 1));
        assert_eq!(collect(&c), Vec::<i32>::new());
    }

    #[test]
    fn of_is_right_identity_for_then_choose() {
        let c = Choice::from_vec(vec![1, 2, 3]).then_choose(Choice::of);
        assert_eq!(collect(&c), vec![1, 2, 3]);
    }

    #[test]
    fn then_choose_preserves_depth_first_order() {
        let c = Choice::from_vec(vec![10, 20])
            .then_choose(|x| Choice::from_vec(vec![x + 1, x + 2]));
        assert_eq!(collect(&c), vec![11, 12, 21, 22]);
    }

    #[test]
    fn enumeration_is_deterministic_across_restarts() {
        let c = Choice::from_vec(vec![1, 2])
            .then_choose(|x| Choice::from_vec(vec![x * 10, x * 10 + 1]))
            .condition(|x| x % 2 == 0);
        let first_run: Vec<i32> = c.iter().collect();
        let second_run: Vec<i32> = c.iter().collect();
        assert_eq!(first_run, second_run);
        assert_eq!(first_run, vec![10, 20]);
    }

    #[test]
    fn laziness_only_computes_consumed_options() {
        let calls = Rc::new(Cell::new(0));
        let calls_inner = Rc::clone(&calls);
        let c = Choice::from_vec(vec![1, 2, 3]).then_choose(move |x| {
            calls_inner.set(calls_inner.get() + 1);
            Choice::of(x)
        });
        assert_eq!(c.first(), Some(1));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn condition_filters_and_require_gates() {
        let c = Choice::from_vec(vec![1, 2, 3, 4]).condition(|x| x % 2 == 0);
        assert_eq!(collect(&c), vec![2, 4]);
        let c = Choice::from_vec(vec![1, 2]).require(false);
        assert_eq!(collect(&c), Vec::<i32>::new());
    }

    #[test]
    fn any_concatenates_in_order() {
        let c = Choice::any(vec![
            Choice::from_vec(vec![1, 2]),
            Choice::none(),
            Choice::of(3),
        ]);
        assert_eq!(collect(&c), vec![1, 2, 3]);
    }
}
