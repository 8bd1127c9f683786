use nseries_derive::nseries_error;
use std::borrow::Cow;

#[nseries_error]
pub enum RangeError {
    #[suppressible]
    #[error("Range exhausted{}: {message}", format_context(.context))]
    Exhausted { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Not allowed{}: {message}", format_context(.context))]
    NotAllowed { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn main() {
    let exhausted = RangeError::Exhausted { message: "S99999".into(), context: None };
    let denied = RangeError::NotAllowed { message: "SALES".into(), context: None };
    assert!(exhausted.is_suppressible());
    assert!(!denied.is_suppressible());

    let with_context: Result<(), RangeError> = Err(denied);
    let with_context = with_context.context("manual entry");
    assert!(with_context.unwrap_err().to_string().contains("(manual entry)"));
}
