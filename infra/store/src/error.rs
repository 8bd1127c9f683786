use std::borrow::Cow;

/// A specialized [`StoreError`] enum of this crate.
#[nseries_derive::nseries_error]
pub enum StoreError {
    #[error("Series not found{}: {message}", format_context(.context))]
    SeriesNotFound { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Series line not found{}: {message}", format_context(.context))]
    LineNotFound { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Invalid catalog{}: {message}", format_context(.context))]
    InvalidCatalog { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Row lock not held{}: {message}", format_context(.context))]
    LockNotHeld { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Deadlock on row lock{}: {message}", format_context(.context))]
    Deadlock { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Counter overflow{}: {message}", format_context(.context))]
    CounterOverflow { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal store error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
