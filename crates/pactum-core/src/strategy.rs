//! Generation strategies
//!
//! Chosen once when a `Feature` is built and never changed during a run.

use crate::config::EngineConfig;
use crate::error::ContractError;
use crate::pattern::Pattern;
use crate::resolver::Resolver;

/// How `new_based_on` expands beyond the declared examples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenerationStrategy {
    /// Example-driven variants plus one vanilla shape; no negative tests.
    #[default]
    NonGenerative,
    /// Also folds in vanilla variants the examples do not already cover.
    /// `positive_only` keeps that expansion but suppresses negative tests.
    Generative { positive_only: bool },
}

impl GenerationStrategy {
    #[must_use]
    pub const fn from_config(config: &EngineConfig) -> Self {
        if config.generative {
            Self::Generative {
                positive_only: config.positive_only,
            }
        } else {
            Self::NonGenerative
        }
    }

    #[must_use]
    pub const fn is_generative(self) -> bool {
        matches!(self, Self::Generative { .. })
    }

    #[must_use]
    pub const fn negative_tests_enabled(self) -> bool {
        matches!(
            self,
            Self::Generative {
                positive_only: false
            }
        )
    }

    /// Combine example-driven variants with vanilla ones.
    ///
    /// Non-generative: the example variants when any exist, else the vanilla
    /// shape. Generative: the example variants followed by every vanilla
    /// variant that no example variant encompasses.
    pub fn positive_variants(
        self,
        examples: Vec<Pattern>,
        vanilla: impl FnOnce() -> Result<Vec<Pattern>, ContractError>,
        resolver: &Resolver,
    ) -> Result<Vec<Pattern>, ContractError> {
        if examples.is_empty() {
            return vanilla();
        }
        match self {
            Self::NonGenerative => Ok(examples),
            Self::Generative { .. } => {
                let extra: Vec<Pattern> = vanilla()?
                    .into_iter()
                    .filter(|candidate| {
                        !examples.iter().any(|example| {
                            example
                                .encompasses(candidate, resolver, resolver, &mut Default::default())
                                .is_success()
                        })
                    })
                    .collect();
                let mut variants = examples;
                variants.extend(extra);
                variants.truncate(resolver.max_combinations());
                Ok(variants)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::ExactValuePattern;
    use crate::value::Value;

    #[test]
    fn from_config_honours_flags() {
        let mut config = EngineConfig::default();
        assert_eq!(GenerationStrategy::from_config(&config), GenerationStrategy::NonGenerative);
        config.generative = true;
        config.positive_only = true;
        let strategy = GenerationStrategy::from_config(&config);
        assert!(strategy.is_generative());
        assert!(!strategy.negative_tests_enabled());
    }

    #[test]
    fn non_generative_keeps_examples_only() {
        let exact = Pattern::Exact(ExactValuePattern::new(Value::from(10)));
        let variants = GenerationStrategy::NonGenerative
            .positive_variants(vec![exact.clone()], || Ok(vec![Pattern::number()]), &Resolver::default())
            .unwrap();
        assert_eq!(variants, vec![exact]);
    }

    #[test]
    fn generative_adds_uncovered_vanilla() {
        let exact = Pattern::Exact(ExactValuePattern::new(Value::from(10)));
        let variants = GenerationStrategy::Generative { positive_only: false }
            .positive_variants(vec![exact.clone()], || Ok(vec![Pattern::number()]), &Resolver::default())
            .unwrap();
        assert_eq!(variants, vec![exact, Pattern::number()]);
    }

    #[test]
    fn vanilla_used_without_examples() {
        let variants = GenerationStrategy::NonGenerative
            .positive_variants(vec![], || Ok(vec![Pattern::string()]), &Resolver::default())
            .unwrap();
        assert_eq!(variants, vec![Pattern::string()]);
    }
}
