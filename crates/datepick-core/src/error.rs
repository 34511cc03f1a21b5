use chrono::NaiveDate;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("datepicker selector cannot be empty")]
    EmptySelector,
    #[error("no element matches selector `{0}`")]
    SelectorNotFound(String),
    #[error("using a shadow root as the datepicker root is not supported")]
    UnsupportedRoot,
    #[error("cannot attach a datepicker to void element <{0}>")]
    VoidElement(String),
    #[error("element already has a datepicker attached")]
    AlreadyAttached,
    #[error("minDate {min} is later than maxDate {max}")]
    MinAfterMax { min: NaiveDate, max: NaiveDate },
    #[error("startDay must be between 0 and 6, got {0}")]
    StartDayOutOfRange(i64),
    #[error("invalid date `{0}`; expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("`{option}` needs exactly {expected} labels, got {found}")]
    InvalidLabels {
        option: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("range id {0} is already used by two datepickers")]
    PairFull(u64),
    #[error("unable to use a datepicker instance after it has been removed")]
    Removed,
    #[error("operation is only available on range-linked datepickers")]
    NotPaired,
    #[error("bound would leave minDate {min} later than maxDate {max}")]
    BoundOrder { min: NaiveDate, max: NaiveDate },
}

impl Error {
    /// Construction-time validation failures, as opposed to usage errors on a
    /// live (or removed) instance.
    pub fn is_construction(&self) -> bool {
        !matches!(
            self,
            Error::Removed | Error::NotPaired | Error::BoundOrder { .. }
        )
    }
}
