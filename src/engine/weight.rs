//! Weight combination.
//!
//! Folds the trailing weight components of one (broadcast) event instance into
//! a single [`CombinedWeight`]:
//!
//! * no component → [`CombinedWeight::Unit`]; the fill path never calls the
//!   combiner in that case,
//! * one component → returned as-is; tensors stay borrowed,
//! * several → left fold `((w1 * w2) * w3) * …`.
//!
//! Scalar × scalar multiplies, scalar × tensor scales element-wise. Tensor ×
//! tensor has no typed `Mul` impl (see [`crate::engine::tensor`]); in this
//! runtime-tagged path it is rejected with
//! [`InvalidInputError::TensorProduct`].

use std::borrow::Cow;

use crate::engine::args::Value;
use crate::engine::error::InvalidInputError;
use crate::engine::tensor::WeightTensor;


/// Product of all weight components of one event instance.
#[derive(Debug, Clone, PartialEq)]
pub enum CombinedWeight<'a> {
    /// Implicit weight of one.
    Unit,

    /// Scalar weight.
    Scalar(f64),

    /// Tensor weight, borrowed when it came from a single component.
    Tensor(Cow<'a, WeightTensor>),
}

impl<'a> CombinedWeight<'a> {
    /// Scalar value, if this weight is not a tensor.
    #[inline]
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            CombinedWeight::Unit => Some(1.0),
            CombinedWeight::Scalar(w) => Some(*w),
            CombinedWeight::Tensor(_) => None,
        }
    }

    /// Multiplies by one more component.
    pub fn mul(self, rhs: Value<'a>) -> Result<CombinedWeight<'a>, InvalidInputError> {
        Ok(match (self, rhs) {
            (CombinedWeight::Unit, rhs) => rhs.into(),
            (CombinedWeight::Scalar(a), Value::Real(b)) => CombinedWeight::Scalar(a * b),
            (CombinedWeight::Scalar(a), Value::Tensor(t)) => CombinedWeight::Tensor(Cow::Owned(a * t)),
            (CombinedWeight::Tensor(t), Value::Real(b)) => {
                CombinedWeight::Tensor(Cow::Owned(t.into_owned() * b))
            }
            (CombinedWeight::Tensor(_), Value::Tensor(_)) => return Err(InvalidInputError::TensorProduct),
        })
    }
}

impl<'a> From<Value<'a>> for CombinedWeight<'a> {
    #[inline]
    fn from(v: Value<'a>) -> Self {
        match v {
            Value::Real(w) => CombinedWeight::Scalar(w),
            Value::Tensor(t) => CombinedWeight::Tensor(Cow::Borrowed(t)),
        }
    }
}

/// Folds `components` left to right.
pub fn combine<'a>(components: &[Value<'a>]) -> Result<CombinedWeight<'a>, InvalidInputError> {
    match components {
        [] => Ok(CombinedWeight::Unit),
        [only] => Ok((*only).into()),
        [first, rest @ ..] => rest
            .iter()
            .try_fold(CombinedWeight::from(*first), |acc, w| acc.mul(*w)),
    }
}
