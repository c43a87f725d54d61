//! Block validity predicates used by the ledger.

use crate::types::Block;

use super::error::ValidationError;

/// Pluggable validity predicate for a block appended on top of `parent`.
///
/// Implementations should be deterministic and side-effect free. Checks
/// that only look at the block itself ignore `parent`.
pub trait BlockValidator {
    fn validate(&self, parent: &Block, block: &Block) -> Result<(), ValidationError>;
}

/// A validator that composes two other validators.
///
/// `CombinedValidator { base, link }` runs `base.validate` and then
/// `link.validate`, failing fast on the first error.
#[derive(Clone, Debug)]
pub struct CombinedValidator<B, L> {
    pub base: B,
    pub link: L,
}

impl<B, L> CombinedValidator<B, L> {
    pub fn new(base: B, link: L) -> Self {
        Self { base, link }
    }
}

impl<B, L> BlockValidator for CombinedValidator<B, L>
where
    B: BlockValidator,
    L: BlockValidator,
{
    fn validate(&self, parent: &Block, block: &Block) -> Result<(), ValidationError> {
        self.base.validate(parent, block)?;
        self.link.validate(parent, block)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Option<&'static str>);

    impl BlockValidator for Fixed {
        fn validate(&self, _parent: &Block, _block: &Block) -> Result<(), ValidationError> {
            match self.0 {
                None => Ok(()),
                Some(msg) => Err(ValidationError::Invalid(msg)),
            }
        }
    }

    #[test]
    fn combined_validator_fails_fast_on_base() {
        let genesis = Block::genesis();
        let v = CombinedValidator::new(Fixed(Some("base")), Fixed(Some("link")));

        match v.validate(&genesis, &genesis) {
            Err(ValidationError::Invalid(msg)) => assert_eq!(msg, "base"),
            other => panic!("unexpected result: {other:?}"),
        }

        let ok = CombinedValidator::new(Fixed(None), Fixed(None));
        assert!(ok.validate(&genesis, &genesis).is_ok());
    }
}
