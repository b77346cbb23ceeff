use std::borrow::Cow;
use validator::ValidationError;

/// Fails unless exactly one of the alternatives is present.
pub fn exactly_one_of(present: &[bool], code: &'static str, message: &'static str) -> Result<(), ValidationError> {
    if present.iter().filter(|p| **p).count() == 1 {
        return Ok(());
    }
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    Err(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_only_a_single_alternative() {
        assert!(exactly_one_of(&[true, false], "one", "pick one").is_ok());
        assert!(exactly_one_of(&[false, false], "one", "pick one").is_err());
        let err = exactly_one_of(&[true, true], "one", "pick one").unwrap_err();
        assert_eq!(err.code, "one");
    }
}
