//! Event argument classification and broadcasting.
//!
//! An event is an ordered list of values. The first `rank` values are
//! coordinates; any further values are weight components. Each value is
//! either a **scalar** or a **sequence**:
//!
//! * [`FillArg::IS_SEQUENCE`] classifies a type at compile time. Numeric
//!   scalars and [`WeightTensor`] are scalars; slices, `Vec`s and arrays of
//!   those are sequences.
//! * [`FillArgs`] is implemented for tuples of up to [`MAX_ARGS`] arguments.
//!   [`FillArgs::HAS_SEQUENCE`] is the compile-time disjunction over the tuple
//!   and selects the entry point: a single fill, or the broadcast loop.
//!
//! ## Broadcast loop
//!
//! When at least one argument is a sequence, the event is expanded into one
//! fill per element. Sequence cursors advance in lock step; scalars are reused
//! unchanged for every element. Sequence lengths are read once, up front, and
//! must all equal the first sequence's length. Validation runs **before** the
//! first element is filled, so a rejected event never leaves a partial fill
//! behind.
//!
//! ```text
//! args:   x = [1, 2, 3]   y = 0.5   w = [w0, w1, w2]
//! fills:  (1, 0.5) * w0,  (2, 0.5) * w1,  (3, 0.5) * w2
//! ```

use smallvec::SmallVec;

use crate::engine::error::{FillError, FillResult, InvalidInputError};
use crate::engine::tensor::{Shape, WeightTensor};
use crate::engine::types::{Coords, MAX_ARGS};
use crate::engine::weight::{combine, CombinedWeight};


/// One value of one (broadcast) event instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value<'a> {
    /// Real number; coordinates are always real.
    Real(f64),

    /// Tensor weight component.
    Tensor(&'a WeightTensor),
}

impl Value<'_> {
    /// The real value, if this is not a tensor.
    #[inline]
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Value::Real(v) => Some(*v),
            Value::Tensor(_) => None,
        }
    }
}

/// Borrowed sequence of values, tagged by element type.
#[derive(Debug, Clone, Copy)]
pub enum Sequence<'a> {
    /// `f64` values.
    F64(&'a [f64]),
    /// `f32` values.
    F32(&'a [f32]),
    /// `i8` values.
    I8(&'a [i8]),
    /// `i16` values.
    I16(&'a [i16]),
    /// `i32` values.
    I32(&'a [i32]),
    /// `i64` values.
    I64(&'a [i64]),
    /// `isize` values.
    Isize(&'a [isize]),
    /// `u8` values.
    U8(&'a [u8]),
    /// `u16` values.
    U16(&'a [u16]),
    /// `u32` values.
    U32(&'a [u32]),
    /// `u64` values.
    U64(&'a [u64]),
    /// `usize` values.
    Usize(&'a [usize]),
    /// `bool` values, filled as `0.0` / `1.0`.
    Bool(&'a [bool]),
    /// Tensor weights.
    Tensors(&'a [WeightTensor]),
}

impl<'a> Sequence<'a> {
    /// Number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            Sequence::F64(s) => s.len(),
            Sequence::F32(s) => s.len(),
            Sequence::I8(s) => s.len(),
            Sequence::I16(s) => s.len(),
            Sequence::I32(s) => s.len(),
            Sequence::I64(s) => s.len(),
            Sequence::Isize(s) => s.len(),
            Sequence::U8(s) => s.len(),
            Sequence::U16(s) => s.len(),
            Sequence::U32(s) => s.len(),
            Sequence::U64(s) => s.len(),
            Sequence::Usize(s) => s.len(),
            Sequence::Bool(s) => s.len(),
            Sequence::Tensors(s) => s.len(),
        }
    }

    /// Returns `true` for an empty sequence.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element `i`. Panics if out of bounds.
    #[inline]
    pub fn get(&self, i: usize) -> Value<'a> {
        match *self {
            Sequence::F64(s) => Value::Real(s[i]),
            Sequence::F32(s) => Value::Real(s[i] as f64),
            Sequence::I8(s) => Value::Real(s[i] as f64),
            Sequence::I16(s) => Value::Real(s[i] as f64),
            Sequence::I32(s) => Value::Real(s[i] as f64),
            Sequence::I64(s) => Value::Real(s[i] as f64),
            Sequence::Isize(s) => Value::Real(s[i] as f64),
            Sequence::U8(s) => Value::Real(s[i] as f64),
            Sequence::U16(s) => Value::Real(s[i] as f64),
            Sequence::U32(s) => Value::Real(s[i] as f64),
            Sequence::U64(s) => Value::Real(s[i] as f64),
            Sequence::Usize(s) => Value::Real(s[i] as f64),
            Sequence::Bool(s) => Value::Real(s[i] as u8 as f64),
            Sequence::Tensors(s) => Value::Tensor(&s[i]),
        }
    }
}

/// Tagged argument descriptor: the runtime image of a classified argument.
#[derive(Debug, Clone, Copy)]
pub enum Arg<'a> {
    /// Reused unchanged for every broadcast element.
    Scalar(Value<'a>),

    /// Advanced in lock step with the other sequences.
    Sequence(Sequence<'a>),
}

impl<'a> Arg<'a> {
    /// Length contributed to the broadcast (`1` for scalars).
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            Arg::Scalar(_) => 1,
            Arg::Sequence(s) => s.len(),
        }
    }

    /// Returns `true` for an empty sequence. Scalars are never empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` for sequence arguments.
    #[inline]
    pub fn is_sequence(&self) -> bool {
        matches!(self, Arg::Sequence(_))
    }

    /// Returns `true` if the argument yields tensors.
    #[inline]
    pub fn is_tensor(&self) -> bool {
        matches!(self, Arg::Scalar(Value::Tensor(_)) | Arg::Sequence(Sequence::Tensors(_)))
    }

    /// Value at broadcast position `i`; scalars ignore `i`.
    #[inline]
    pub fn at(&self, i: usize) -> Value<'a> {
        match self {
            Arg::Scalar(v) => *v,
            Arg::Sequence(s) => s.get(i),
        }
    }
}

/// Inline descriptor list for one event.
pub type ArgList<'a> = SmallVec<[Arg<'a>; MAX_ARGS]>;

/// Element type usable inside a sequence argument.
pub trait Element: Sized {
    /// Wraps a slice of `Self`.
    fn sequence(slice: &[Self]) -> Sequence<'_>;
}

/// Compile-time classification of a single event argument.
pub trait FillArg {
    /// `true` if the argument is a data container broadcast element-wise.
    const IS_SEQUENCE: bool;

    /// Runtime descriptor of the argument.
    fn as_arg(&self) -> Arg<'_>;
}

macro_rules! scalar_arg {
    ($($ty:ty => $variant:ident),* $(,)?) => {$(
        impl FillArg for $ty {
            const IS_SEQUENCE: bool = false;

            #[inline]
            fn as_arg(&self) -> Arg<'_> {
                Arg::Scalar(Value::Real(*self as f64))
            }
        }

        impl Element for $ty {
            #[inline]
            fn sequence(slice: &[Self]) -> Sequence<'_> {
                Sequence::$variant(slice)
            }
        }
    )*};
}

scalar_arg!(
    f64 => F64, f32 => F32,
    i8 => I8, i16 => I16, i32 => I32, i64 => I64, isize => Isize,
    u8 => U8, u16 => U16, u32 => U32, u64 => U64, usize => Usize,
);

impl FillArg for bool {
    const IS_SEQUENCE: bool = false;

    #[inline]
    fn as_arg(&self) -> Arg<'_> {
        Arg::Scalar(Value::Real(*self as u8 as f64))
    }
}

impl Element for bool {
    #[inline]
    fn sequence(slice: &[Self]) -> Sequence<'_> {
        Sequence::Bool(slice)
    }
}

impl FillArg for WeightTensor {
    const IS_SEQUENCE: bool = false;

    #[inline]
    fn as_arg(&self) -> Arg<'_> {
        Arg::Scalar(Value::Tensor(self))
    }
}

impl Element for WeightTensor {
    #[inline]
    fn sequence(slice: &[Self]) -> Sequence<'_> {
        Sequence::Tensors(slice)
    }
}

impl<T: Element> FillArg for [T] {
    const IS_SEQUENCE: bool = true;

    #[inline]
    fn as_arg(&self) -> Arg<'_> {
        Arg::Sequence(T::sequence(self))
    }
}

impl<T: Element> FillArg for Vec<T> {
    const IS_SEQUENCE: bool = true;

    #[inline]
    fn as_arg(&self) -> Arg<'_> {
        Arg::Sequence(T::sequence(self))
    }
}

impl<T: Element, const N: usize> FillArg for [T; N] {
    const IS_SEQUENCE: bool = true;

    #[inline]
    fn as_arg(&self) -> Arg<'_> {
        Arg::Sequence(T::sequence(self))
    }
}

impl<T: FillArg + ?Sized> FillArg for &T {
    const IS_SEQUENCE: bool = T::IS_SEQUENCE;

    #[inline]
    fn as_arg(&self) -> Arg<'_> {
        (**self).as_arg()
    }
}

/// A complete argument list for one event.
pub trait FillArgs {
    /// `true` if any argument is a sequence.
    const HAS_SEQUENCE: bool;

    /// Number of arguments.
    const LEN: usize;

    /// Runtime descriptors, in order.
    fn descriptors(&self) -> ArgList<'_>;
}

macro_rules! tuple_args {
    ($($name:ident . $idx:tt),+) => {
        impl<$($name: FillArg),+> FillArgs for ($($name,)+) {
            const HAS_SEQUENCE: bool = false $(|| $name::IS_SEQUENCE)+;
            const LEN: usize = [$(stringify!($name)),+].len();

            #[inline]
            fn descriptors(&self) -> ArgList<'_> {
                let mut list = ArgList::new();
                $(list.push(self.$idx.as_arg());)+
                list
            }
        }
    };
}

tuple_args!(A.0);
tuple_args!(A.0, B.1);
tuple_args!(A.0, B.1, C.2);
tuple_args!(A.0, B.1, C.2, D.3);
tuple_args!(A.0, B.1, C.2, D.3, E.4);
tuple_args!(A.0, B.1, C.2, D.3, E.4, F.5);
tuple_args!(A.0, B.1, C.2, D.3, E.4, F.5, G.6);
tuple_args!(A.0, B.1, C.2, D.3, E.4, F.5, G.6, H.7);

impl<T: FillArgs + ?Sized> FillArgs for &T {
    const HAS_SEQUENCE: bool = T::HAS_SEQUENCE;
    const LEN: usize = T::LEN;

    #[inline]
    fn descriptors(&self) -> ArgList<'_> {
        (**self).descriptors()
    }
}

/// What an event's values are validated against.
#[derive(Debug, Clone, Copy)]
pub struct EventLayout<'s> {
    /// Number of coordinates consumed per fill.
    pub rank: usize,

    /// Tensor shape of the accumulator, `None` for scalar leaves.
    pub tensor_shape: Option<&'s Shape>,
}

/// Checks everything that could reject the event, before any fill happens.
///
/// Sequence lengths are checked separately by [`broadcast`].
pub fn validate(args: &[Arg<'_>], layout: EventLayout<'_>) -> Result<(), InvalidInputError> {
    if args.len() > MAX_ARGS {
        return Err(InvalidInputError::TooManyArguments { given: args.len() });
    }
    if args.len() < layout.rank {
        return Err(InvalidInputError::MissingCoordinates { rank: layout.rank, given: args.len() });
    }
    if let Some(argument) = args[..layout.rank].iter().position(Arg::is_tensor) {
        return Err(InvalidInputError::NonScalarCoordinate { argument });
    }

    let weights = &args[layout.rank..];
    if weights.iter().filter(|a| a.is_tensor()).count() > 1 {
        return Err(InvalidInputError::TensorProduct);
    }

    let expected = || layout.tensor_shape.map(|s| s.dims().to_vec()).unwrap_or_default();
    let check = |t: &WeightTensor| match layout.tensor_shape {
        Some(shape) if shape == t.shape() => Ok(()),
        _ => Err(InvalidInputError::TensorShapeMismatch {
            expected: expected(),
            found: t.shape().dims().to_vec(),
        }),
    };
    for w in weights {
        match w {
            Arg::Scalar(Value::Tensor(t)) => check(*t)?,
            Arg::Sequence(Sequence::Tensors(ts)) => ts.iter().try_for_each(|t| check(t))?,
            _ => {}
        }
    }
    Ok(())
}

/// Fills once from an event without sequence arguments.
pub fn fill_scalars<F>(args: &[Arg<'_>], layout: EventLayout<'_>, mut sink: F) -> FillResult<()>
where
    F: FnMut(&[f64], &CombinedWeight<'_>),
{
    validate(args, layout)?;
    fill_at(args, layout.rank, 0, &mut sink)
}

/// Fills once per element of the sequence arguments.
///
/// Fails with [`InvalidInputError::LengthMismatch`] before any fill if two
/// sequences disagree in length, and with
/// [`FillError::InternalInvariantViolation`] if no sequence is present.
pub fn broadcast<F>(args: &[Arg<'_>], layout: EventLayout<'_>, mut sink: F) -> FillResult<()>
where
    F: FnMut(&[f64], &CombinedWeight<'_>),
{
    let first = args
        .iter()
        .position(Arg::is_sequence)
        .ok_or(FillError::InternalInvariantViolation("no sequence argument found in broadcast"))?;

    let sizes: SmallVec<[usize; MAX_ARGS]> = args.iter().map(Arg::len).collect();
    let expected = sizes[first];
    for (argument, arg) in args.iter().enumerate() {
        if arg.is_sequence() && sizes[argument] != expected {
            return Err(InvalidInputError::LengthMismatch { argument, expected, found: sizes[argument] }.into());
        }
    }

    validate(args, layout)?;

    for i in 0..expected {
        fill_at(args, layout.rank, i, &mut sink)?;
    }
    Ok(())
}

/// Dispatches on the runtime tags: broadcast if any argument is a sequence.
pub fn dispatch<F>(args: &[Arg<'_>], layout: EventLayout<'_>, sink: F) -> FillResult<()>
where
    F: FnMut(&[f64], &CombinedWeight<'_>),
{
    if args.iter().any(Arg::is_sequence) {
        broadcast(args, layout, sink)
    } else {
        fill_scalars(args, layout, sink)
    }
}

#[inline]
fn fill_at<F>(args: &[Arg<'_>], rank: usize, i: usize, sink: &mut F) -> FillResult<()>
where
    F: FnMut(&[f64], &CombinedWeight<'_>),
{
    let mut coords = Coords::with_capacity(rank);
    for arg in &args[..rank] {
        coords.push(
            arg.at(i)
                .as_real()
                .ok_or(FillError::InternalInvariantViolation("tensor coordinate passed validation"))?,
        );
    }

    if args.len() > rank {
        let components: SmallVec<[Value<'_>; MAX_ARGS]> = args[rank..].iter().map(|a| a.at(i)).collect();
        let weight = combine(&components)?;
        sink(&coords, &weight);
    } else {
        sink(&coords, &CombinedWeight::Unit);
    }
    Ok(())
}
