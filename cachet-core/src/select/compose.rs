//! Selector Composition
//!
//! [`create_async_selector`] builds a derived selector out of existing
//! ones. The derived selector is memoized in two layers:
//!
//! 1. **Per snapshot.** Calling it again with the same state and props
//!    snapshots (by [`Identity`]) returns the previous result without
//!    evaluating the inputs.
//!
//! 2. **Per input value.** When the inputs are evaluated but yield
//!    equivalent async values (see [`results_are_equal`]), the combining
//!    function is not run again and the previous result is returned. A
//!    recomputed result equivalent to the previous one is also replaced by
//!    the previous one. The combining function also remembers its last
//!    input values, so inputs that go pending and come back with equal
//!    values do not run it again.
//!
//! Together these keep the result's `Arc` stable for as long as the
//! derived value is unchanged, even across unrelated state updates.
//!
//! [`create_tracked_selector`] wraps a plain selector so that everything
//! composed from it tracks it as a user input.

use std::sync::Arc;

use super::async_value::{sequence, AsyncValue};
use super::equality::{by_value, Equality, Identity};
use super::memo::Memo;
use super::selector::{results_are_equal, AsyncSelector, AsyncSelectorResult, IntoAsyncSelector, SelectorOutput};
use super::tracked::{combine_tracked, Tracked, TrackedId};

/// A fixed set of input selectors.
///
/// Implemented for tuples of one to four [`AsyncSelector`]s (with
/// heterogeneous values) and for `Vec`s of same-typed selectors.
pub trait SelectorInputs<S, P, C>: Send + Sync + 'static {
    /// The shared results of all inputs for one evaluation.
    type Results: Send + 'static;

    /// The input values handed to the combining function.
    type Values: Clone + PartialEq + Send + 'static;

    fn select(&self, state: &S, props: &P) -> Self::Results;

    /// Input-wise [`results_are_equal`].
    fn results_are_equal(left: &Self::Results, right: &Self::Results) -> bool;

    /// Combine the async values and merge the tracked inputs.
    fn combine(results: &Self::Results) -> (AsyncValue<C, Self::Values>, Vec<Tracked<S, P>>);
}

/// Conversion into [`SelectorInputs`].
pub trait IntoSelectorInputs<S, P, C> {
    type Inputs: SelectorInputs<S, P, C>;

    fn into_inputs(self) -> Self::Inputs;
}

fn merge_tracked<'a, S: 'a, P: 'a>(lists: impl IntoIterator<Item = &'a [Tracked<S, P>]>) -> Vec<Tracked<S, P>> {
    lists
        .into_iter()
        .fold(Vec::new(), |acc, tracked| combine_tracked(&acc, tracked))
}

impl<S, P, C, A> SelectorInputs<S, P, C> for (AsyncSelector<S, P, C, A>,)
where
    S: 'static,
    P: 'static,
    C: Clone + Send + Sync + 'static,
    A: Clone + PartialEq + Send + Sync + 'static,
{
    type Results = (SelectorOutput<S, P, C, A>,);
    type Values = (A,);

    fn select(&self, state: &S, props: &P) -> Self::Results {
        (self.0.select(state, props),)
    }

    fn results_are_equal(left: &Self::Results, right: &Self::Results) -> bool {
        results_are_equal(&left.0, &right.0)
    }

    fn combine(results: &Self::Results) -> (AsyncValue<C, Self::Values>, Vec<Tracked<S, P>>) {
        let value = results.0.value().clone().map(|a| (a,));
        (value, merge_tracked([results.0.tracked()]))
    }
}

impl<S, P, C, A, B> SelectorInputs<S, P, C> for (AsyncSelector<S, P, C, A>, AsyncSelector<S, P, C, B>)
where
    S: 'static,
    P: 'static,
    C: Clone + Send + Sync + 'static,
    A: Clone + PartialEq + Send + Sync + 'static,
    B: Clone + PartialEq + Send + Sync + 'static,
{
    type Results = (SelectorOutput<S, P, C, A>, SelectorOutput<S, P, C, B>);
    type Values = (A, B);

    fn select(&self, state: &S, props: &P) -> Self::Results {
        (self.0.select(state, props), self.1.select(state, props))
    }

    fn results_are_equal(left: &Self::Results, right: &Self::Results) -> bool {
        results_are_equal(&left.0, &right.0) && results_are_equal(&left.1, &right.1)
    }

    fn combine(results: &Self::Results) -> (AsyncValue<C, Self::Values>, Vec<Tracked<S, P>>) {
        let value = results
            .0
            .value()
            .clone()
            .combine(results.1.value().clone(), |a, b| (a, b));
        (value, merge_tracked([results.0.tracked(), results.1.tracked()]))
    }
}

impl<S, P, C, A, B, D> SelectorInputs<S, P, C>
    for (AsyncSelector<S, P, C, A>, AsyncSelector<S, P, C, B>, AsyncSelector<S, P, C, D>)
where
    S: 'static,
    P: 'static,
    C: Clone + Send + Sync + 'static,
    A: Clone + PartialEq + Send + Sync + 'static,
    B: Clone + PartialEq + Send + Sync + 'static,
    D: Clone + PartialEq + Send + Sync + 'static,
{
    type Results = (SelectorOutput<S, P, C, A>, SelectorOutput<S, P, C, B>, SelectorOutput<S, P, C, D>);
    type Values = (A, B, D);

    fn select(&self, state: &S, props: &P) -> Self::Results {
        (self.0.select(state, props), self.1.select(state, props), self.2.select(state, props))
    }

    fn results_are_equal(left: &Self::Results, right: &Self::Results) -> bool {
        results_are_equal(&left.0, &right.0)
            && results_are_equal(&left.1, &right.1)
            && results_are_equal(&left.2, &right.2)
    }

    fn combine(results: &Self::Results) -> (AsyncValue<C, Self::Values>, Vec<Tracked<S, P>>) {
        let value = results
            .0
            .value()
            .clone()
            .combine(results.1.value().clone(), |a, b| (a, b))
            .combine(results.2.value().clone(), |(a, b), d| (a, b, d));
        let tracked = merge_tracked([results.0.tracked(), results.1.tracked(), results.2.tracked()]);
        (value, tracked)
    }
}

impl<S, P, C, A, B, D, E> SelectorInputs<S, P, C>
    for (
        AsyncSelector<S, P, C, A>,
        AsyncSelector<S, P, C, B>,
        AsyncSelector<S, P, C, D>,
        AsyncSelector<S, P, C, E>,
    )
where
    S: 'static,
    P: 'static,
    C: Clone + Send + Sync + 'static,
    A: Clone + PartialEq + Send + Sync + 'static,
    B: Clone + PartialEq + Send + Sync + 'static,
    D: Clone + PartialEq + Send + Sync + 'static,
    E: Clone + PartialEq + Send + Sync + 'static,
{
    type Results = (
        SelectorOutput<S, P, C, A>,
        SelectorOutput<S, P, C, B>,
        SelectorOutput<S, P, C, D>,
        SelectorOutput<S, P, C, E>,
    );
    type Values = (A, B, D, E);

    fn select(&self, state: &S, props: &P) -> Self::Results {
        (
            self.0.select(state, props),
            self.1.select(state, props),
            self.2.select(state, props),
            self.3.select(state, props),
        )
    }

    fn results_are_equal(left: &Self::Results, right: &Self::Results) -> bool {
        results_are_equal(&left.0, &right.0)
            && results_are_equal(&left.1, &right.1)
            && results_are_equal(&left.2, &right.2)
            && results_are_equal(&left.3, &right.3)
    }

    fn combine(results: &Self::Results) -> (AsyncValue<C, Self::Values>, Vec<Tracked<S, P>>) {
        let value = results
            .0
            .value()
            .clone()
            .combine(results.1.value().clone(), |a, b| (a, b))
            .combine(results.2.value().clone(), |(a, b), d| (a, b, d))
            .combine(results.3.value().clone(), |(a, b, d), e| (a, b, d, e));
        let tracked = merge_tracked([
            results.0.tracked(),
            results.1.tracked(),
            results.2.tracked(),
            results.3.tracked(),
        ]);
        (value, tracked)
    }
}

impl<S, P, C, V> SelectorInputs<S, P, C> for Vec<AsyncSelector<S, P, C, V>>
where
    S: 'static,
    P: 'static,
    C: Clone + Send + Sync + 'static,
    V: Clone + PartialEq + Send + Sync + 'static,
{
    type Results = Vec<SelectorOutput<S, P, C, V>>;
    type Values = Vec<V>;

    fn select(&self, state: &S, props: &P) -> Self::Results {
        self.iter().map(|selector| selector.select(state, props)).collect()
    }

    fn results_are_equal(left: &Self::Results, right: &Self::Results) -> bool {
        left.len() == right.len() && left.iter().zip(right).all(|(l, r)| results_are_equal(l, r))
    }

    fn combine(results: &Self::Results) -> (AsyncValue<C, Self::Values>, Vec<Tracked<S, P>>) {
        let value = sequence(results.iter().map(|result| result.value().clone()));
        (value, merge_tracked(results.iter().map(|result| result.tracked())))
    }
}

impl<S, P, C, V> IntoSelectorInputs<S, P, C> for Vec<AsyncSelector<S, P, C, V>>
where
    Vec<AsyncSelector<S, P, C, V>>: SelectorInputs<S, P, C>,
{
    type Inputs = Self;

    fn into_inputs(self) -> Self {
        self
    }
}

impl<S, P, C, A> IntoSelectorInputs<S, P, C> for (A,)
where
    A: IntoAsyncSelector<S, P, C>,
    (AsyncSelector<S, P, C, A::Value>,): SelectorInputs<S, P, C>,
{
    type Inputs = (AsyncSelector<S, P, C, A::Value>,);

    fn into_inputs(self) -> Self::Inputs {
        (self.0.into_async_selector(),)
    }
}

impl<S, P, C, A, B> IntoSelectorInputs<S, P, C> for (A, B)
where
    A: IntoAsyncSelector<S, P, C>,
    B: IntoAsyncSelector<S, P, C>,
    (AsyncSelector<S, P, C, A::Value>, AsyncSelector<S, P, C, B::Value>): SelectorInputs<S, P, C>,
{
    type Inputs = (AsyncSelector<S, P, C, A::Value>, AsyncSelector<S, P, C, B::Value>);

    fn into_inputs(self) -> Self::Inputs {
        (self.0.into_async_selector(), self.1.into_async_selector())
    }
}

impl<S, P, C, A, B, D> IntoSelectorInputs<S, P, C> for (A, B, D)
where
    A: IntoAsyncSelector<S, P, C>,
    B: IntoAsyncSelector<S, P, C>,
    D: IntoAsyncSelector<S, P, C>,
    (
        AsyncSelector<S, P, C, A::Value>,
        AsyncSelector<S, P, C, B::Value>,
        AsyncSelector<S, P, C, D::Value>,
    ): SelectorInputs<S, P, C>,
{
    type Inputs = (
        AsyncSelector<S, P, C, A::Value>,
        AsyncSelector<S, P, C, B::Value>,
        AsyncSelector<S, P, C, D::Value>,
    );

    fn into_inputs(self) -> Self::Inputs {
        (
            self.0.into_async_selector(),
            self.1.into_async_selector(),
            self.2.into_async_selector(),
        )
    }
}

impl<S, P, C, A, B, D, E> IntoSelectorInputs<S, P, C> for (A, B, D, E)
where
    A: IntoAsyncSelector<S, P, C>,
    B: IntoAsyncSelector<S, P, C>,
    D: IntoAsyncSelector<S, P, C>,
    E: IntoAsyncSelector<S, P, C>,
    (
        AsyncSelector<S, P, C, A::Value>,
        AsyncSelector<S, P, C, B::Value>,
        AsyncSelector<S, P, C, D::Value>,
        AsyncSelector<S, P, C, E::Value>,
    ): SelectorInputs<S, P, C>,
{
    type Inputs = (
        AsyncSelector<S, P, C, A::Value>,
        AsyncSelector<S, P, C, B::Value>,
        AsyncSelector<S, P, C, D::Value>,
        AsyncSelector<S, P, C, E::Value>,
    );

    fn into_inputs(self) -> Self::Inputs {
        (
            self.0.into_async_selector(),
            self.1.into_async_selector(),
            self.2.into_async_selector(),
            self.3.into_async_selector(),
        )
    }
}

type InputValues<S, P, C, I> = <<I as IntoSelectorInputs<S, P, C>>::Inputs as SelectorInputs<S, P, C>>::Values;
type InputResults<S, P, C, I> = <<I as IntoSelectorInputs<S, P, C>>::Inputs as SelectorInputs<S, P, C>>::Results;

/// Compose `inputs` with a function producing a plain value.
///
/// The derived value is received once every input is received; pending
/// commands of all inputs surface, otherwise any awaiting input makes the
/// derived value await.
pub fn create_async_selector<S, P, C, V, I, F>(inputs: I, f: F) -> AsyncSelector<S, P, C, V>
where
    S: Identity,
    P: Identity,
    C: Clone + Send + Sync + 'static,
    V: Clone + PartialEq + Send + Sync + 'static,
    I: IntoSelectorInputs<S, P, C> + 'static,
    F: Fn(InputValues<S, P, C, I>) -> V + Send + Sync + 'static,
{
    create_async_selector_flat(inputs, move |values| AsyncValue::Received(f(values)))
}

/// Compose `inputs` with a function that may itself emit a pending or
/// awaiting value, for example a cache lookup.
pub fn create_async_selector_flat<S, P, C, V, I, F>(inputs: I, f: F) -> AsyncSelector<S, P, C, V>
where
    S: Identity,
    P: Identity,
    C: Clone + Send + Sync + 'static,
    V: Clone + PartialEq + Send + Sync + 'static,
    I: IntoSelectorInputs<S, P, C> + 'static,
    F: Fn(InputValues<S, P, C, I>) -> AsyncValue<C, V> + Send + Sync + 'static,
{
    let inputs = inputs.into_inputs();

    let apply = Memo::new(
        move |values: &InputValues<S, P, C, I>| f(values.clone()),
        by_value::<InputValues<S, P, C, I>>,
    );

    let combine = Memo::new(
        move |results: &InputResults<S, P, C, I>| {
            let (value, tracked) = <I::Inputs as SelectorInputs<S, P, C>>::combine(results);
            Arc::new(AsyncSelectorResult::new(value.and_then(|values| apply.call(values)), tracked))
        },
        |left: &InputResults<S, P, C, I>, right: &InputResults<S, P, C, I>| {
            <I::Inputs as SelectorInputs<S, P, C>>::results_are_equal(left, right)
        },
    )
    .with_result_equality(results_are_equal::<S, P, C, V>);

    let select = Memo::new(
        move |(state, props): &(S, P)| combine.call(inputs.select(state, props)),
        same_snapshot::<S, P>,
    );

    AsyncSelector::new(move |state: &S, props: &P| select.call((state.clone(), props.clone())))
}

/// Wrap `selector` so that selectors composed from it track its value as a
/// user input, compared with `equality`.
pub fn create_tracked_selector<S, P, C, T, F, E>(selector: F, equality: E) -> AsyncSelector<S, P, C, T>
where
    S: Identity,
    P: Identity,
    C: Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
    F: Fn(&S, &P) -> T + Send + Sync + 'static,
    E: Equality<T> + 'static,
{
    let source = TrackedId::new();
    let selector = Arc::new(selector);
    let equality = Arc::new(equality);

    let select = Memo::new(
        move |(state, props): &(S, P)| {
            let value = selector(state, props);
            let equality = Arc::clone(&equality);
            let tracked = Tracked::new(source, Arc::clone(&selector), value.clone(), move |l: &T, r: &T| {
                equality.equals(l, r)
            });
            Arc::new(AsyncSelectorResult::new(AsyncValue::Received(value), vec![tracked]))
        },
        same_snapshot::<S, P>,
    );

    AsyncSelector::new(move |state: &S, props: &P| select.call((state.clone(), props.clone())))
}

fn same_snapshot<S: Identity, P: Identity>(left: &(S, P), right: &(S, P)) -> bool {
    left.0.is_same(&right.0) && left.1.is_same(&right.1)
}
