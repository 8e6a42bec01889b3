//! Choosers narrow a value to one of its variants, refusing values that do
//! not match. Refusal is `None`.

/// A read-only narrowing from `P` to `Q`.
///
/// Implemented for every `Fn(&P) -> Option<Q>`.
pub trait Chooser<P, Q> {
    fn choose(&self, parent: &P) -> Option<Q>;
}

impl<P, Q, F> Chooser<P, Q> for F
where
    F: Fn(&P) -> Option<Q>,
{
    fn choose(&self, parent: &P) -> Option<Q> {
        self(parent)
    }
}

/// Chooser that refuses `None` and passes the payload of `Some` through.
pub fn present<T: Clone>() -> impl Fn(&Option<T>) -> Option<T> + Clone {
    |value: &Option<T>| value.clone()
}

/// Same-type chooser that refuses values failing `predicate`.
pub fn when<T, F>(predicate: F) -> impl Fn(&T) -> Option<T> + Clone
where
    T: Clone,
    F: Fn(&T) -> bool + Clone,
{
    move |value: &T| predicate(value).then(|| value.clone())
}
