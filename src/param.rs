//! Query values and path segments.
//!
//! [`IntoParam`] turns a value into the text written to the URL, or `None`
//! when the value is absent or empty. Such values are skipped entirely:
//! neither a query key nor an empty path segment appears in the URL.
//!
//! Only `None` and `""` count as empty. `0` and `false` are written as-is.

use std::borrow::Cow;

/// A value that can be written as a query value or path segment.
pub trait IntoParam {
    /// The text to write, or `None` to skip the value.
    fn into_param(self) -> Option<String>;
}

impl IntoParam for &str {
    fn into_param(self) -> Option<String> {
        (!self.is_empty()).then(|| self.to_owned())
    }
}

impl IntoParam for String {
    fn into_param(self) -> Option<String> {
        (!self.is_empty()).then_some(self)
    }
}

impl IntoParam for &String {
    fn into_param(self) -> Option<String> {
        self.as_str().into_param()
    }
}

impl IntoParam for Cow<'_, str> {
    fn into_param(self) -> Option<String> {
        self.into_owned().into_param()
    }
}

impl<T: IntoParam> IntoParam for Option<T> {
    fn into_param(self) -> Option<String> {
        self.and_then(IntoParam::into_param)
    }
}

macro_rules! display_param {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoParam for $ty {
                fn into_param(self) -> Option<String> {
                    Some(self.to_string())
                }
            }
        )*
    };
}

display_param!(bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

/// Convert every item, dropping the ones that are empty.
pub(crate) fn collect_params<I>(items: I) -> (usize, Vec<String>)
where
    I: IntoIterator,
    I::Item: IntoParam,
{
    let mut total = 0usize;
    let kept = items
        .into_iter()
        .inspect(|_| total += 1)
        .filter_map(IntoParam::into_param)
        .collect();
    (total, kept)
}
