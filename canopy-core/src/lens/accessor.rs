//! Accessors
//!
//! An accessor is a reified read/write path from a parent value of type `P`
//! to a child value of type `C`. Reads may come back empty (a missing map
//! key, a refusing chooser); writes are only ever attempted when the parent
//! side is present, which composition enforces. A write can also be refused
//! by the parent itself (an index past the end of a vector), in which case
//! the parent is left unchanged.

use std::marker::PhantomData;

use crate::error::{Result, TreeError};

/// A read/write path from a parent `P` to a child `C`.
pub trait Accessor<P, C> {
    /// Read the child out of the parent, or `None` when the child is absent.
    fn read(&self, parent: &P) -> Option<C>;

    /// Write a new child into the parent.
    ///
    /// # Errors
    ///
    /// When the parent cannot hold the child. The parent is unchanged.
    fn write(&self, parent: &mut P, child: C) -> Result<()>;

    /// Compose with an accessor from `C` to `D`.
    ///
    /// The composed read short-circuits on the first absent stage. The
    /// composed write reads the intermediate value, writes `D` into it and
    /// stores it back; it fails with [`TreeError::Vacant`] when the
    /// intermediate is absent.
    fn and<D, B>(self, next: B) -> Then<Self, B, C>
    where
        Self: Sized,
        B: Accessor<C, D>,
    {
        Then {
            outer: self,
            inner: next,
            _mid: PhantomData,
        }
    }
}

/// Composition of two accessors. See [`Accessor::and`].
#[derive(Debug, Clone, Copy)]
pub struct Then<A, B, M> {
    outer: A,
    inner: B,
    _mid: PhantomData<fn() -> M>,
}

impl<P, M, C, A, B> Accessor<P, C> for Then<A, B, M>
where
    A: Accessor<P, M>,
    B: Accessor<M, C>,
{
    fn read(&self, parent: &P) -> Option<C> {
        self.outer.read(parent).and_then(|mid| self.inner.read(&mid))
    }

    fn write(&self, parent: &mut P, child: C) -> Result<()> {
        let mut mid = self.outer.read(parent).ok_or(TreeError::Vacant)?;
        self.inner.write(&mut mid, child)?;
        self.outer.write(parent, mid)
    }
}

/// Structural accessor over a field that is always present.
#[derive(Clone, Copy)]
pub struct Field<G, M> {
    get: G,
    get_mut: M,
}

impl<G, M> std::fmt::Debug for Field<G, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Field").finish_non_exhaustive()
    }
}

/// Build a structural accessor from a pair of projections.
///
/// ```rust
/// use canopy_core::lens::{field, Accessor};
///
/// #[derive(Clone)]
/// struct Point { x: i32, y: i32 }
///
/// let x = field(|p: &Point| &p.x, |p: &mut Point| &mut p.x);
/// let mut p = Point { x: 1, y: 2 };
/// x.write(&mut p, 5).unwrap();
/// assert_eq!(x.read(&p), Some(5));
/// ```
pub fn field<P, C, G, M>(get: G, get_mut: M) -> Field<G, M>
where
    G: Fn(&P) -> &C,
    M: Fn(&mut P) -> &mut C,
{
    Field { get, get_mut }
}

impl<P, C, G, M> Accessor<P, C> for Field<G, M>
where
    C: Clone,
    G: Fn(&P) -> &C,
    M: Fn(&mut P) -> &mut C,
{
    fn read(&self, parent: &P) -> Option<C> {
        Some((self.get)(parent).clone())
    }

    fn write(&self, parent: &mut P, child: C) -> Result<()> {
        *(self.get_mut)(parent) = child;
        Ok(())
    }
}

/// Build a [`Field`] accessor for `Type.name`.
///
/// ```rust
/// use canopy_core::field;
/// use canopy_core::lens::Accessor;
///
/// #[derive(Clone)]
/// struct Point { x: i32, y: i32 }
///
/// let y = field!(Point, y);
/// assert_eq!(y.read(&Point { x: 0, y: 7 }), Some(7));
/// ```
#[macro_export]
macro_rules! field {
    ($ty:ty, $($name:tt).+) => {
        $crate::lens::field(
            |parent: &$ty| &parent.$($name).+,
            |parent: &mut $ty| &mut parent.$($name).+,
        )
    };
}

/// Accessor built from a free-form read and write pair.
#[derive(Clone, Copy)]
pub struct FnAccessor<R, W> {
    read: R,
    write: W,
}

/// Build an accessor from closures. Use this for computed children or
/// children that may be absent.
pub fn accessor<P, C, R, W>(read: R, write: W) -> FnAccessor<R, W>
where
    R: Fn(&P) -> Option<C>,
    W: Fn(&mut P, C),
{
    FnAccessor { read, write }
}

impl<P, C, R, W> Accessor<P, C> for FnAccessor<R, W>
where
    R: Fn(&P) -> Option<C>,
    W: Fn(&mut P, C),
{
    fn read(&self, parent: &P) -> Option<C> {
        (self.read)(parent)
    }

    fn write(&self, parent: &mut P, child: C) -> Result<()> {
        (self.write)(parent, child);
        Ok(())
    }
}
