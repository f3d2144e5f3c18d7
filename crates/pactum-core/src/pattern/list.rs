//! Ordered lists and fixed tuples

use rand::Rng;

use super::combinations::bounded_product;
use super::{Pattern, Visited};
use crate::error::ContractError;
use crate::resolver::Resolver;
use crate::result::{Failure, MatchResult};
use crate::row::Row;
use crate::value::Value;

const MAX_GENERATED_ITEMS: usize = 3;

fn element_failures<'a>(
    items: impl Iterator<Item = (&'a Pattern, &'a Value)>,
    resolver: &Resolver,
) -> Vec<Failure> {
    items
        .enumerate()
        .filter_map(|(i, (pattern, item))| {
            pattern
                .matches(item, resolver)
                .into_failure()
                .map(|f| f.breadcrumb(format!("[{i}]")))
        })
        .collect()
}

// ── List ──

/// Any number of elements, all of one pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct ListPattern {
    element: Box<Pattern>,
    type_alias: Option<String>,
}

impl ListPattern {
    #[must_use]
    pub fn new(element: Pattern) -> Self {
        Self {
            element: Box::new(element),
            type_alias: None,
        }
    }

    #[must_use]
    pub fn element(&self) -> &Pattern {
        &self.element
    }

    pub(crate) fn type_alias(&self) -> Option<&str> {
        self.type_alias.as_deref()
    }

    pub(crate) fn with_type_alias(mut self, alias: &str) -> Self {
        self.type_alias = Some(alias.to_string());
        self
    }

    fn inside(&self, resolver: &Resolver) -> Resolver {
        match &self.type_alias {
            Some(alias) if !resolver.on_stack(alias) => resolver.pushing(alias),
            _ => resolver.clone(),
        }
    }

    pub(crate) fn matches(&self, value: &Value, resolver: &Resolver) -> MatchResult {
        let Value::Array(items) = value else {
            return resolver.mismatch("json array", value);
        };
        MatchResult::from_failures(element_failures(
            std::iter::repeat(self.element.as_ref()).zip(items),
            resolver,
        ))
    }

    /// Elements sit below a nullable edge: a recursive element type is cut
    /// to an empty list.
    pub(crate) fn generate(&self, resolver: &Resolver) -> Result<Value, ContractError> {
        let build = |r: &Resolver| -> Result<Value, ContractError> {
            let count = rand::thread_rng().gen_range(1..=MAX_GENERATED_ITEMS);
            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                match r.through_nullable(|r| self.element.generate(r))? {
                    Some(item) => items.push(item),
                    None => return Ok(Value::Array(Vec::new())),
                }
            }
            Ok(Value::Array(items))
        };
        match &self.type_alias {
            Some(alias) => resolver.entering(alias, build),
            None => build(resolver),
        }
    }

    pub(crate) fn new_based_on(&self, row: &Row, resolver: &Resolver) -> Result<Vec<Pattern>, ContractError> {
        Ok(self
            .element
            .new_based_on(row, &self.inside(resolver))?
            .into_iter()
            .map(|element| {
                Pattern::List(Self {
                    element: Box::new(element),
                    type_alias: self.type_alias.clone(),
                })
            })
            .collect())
    }

    pub(crate) fn negative_based_on(&self, row: &Row, resolver: &Resolver) -> Result<Vec<Pattern>, ContractError> {
        Ok(self
            .element
            .negative_based_on(row, &self.inside(resolver))?
            .into_iter()
            .map(|element| Pattern::List(Self::new(element)))
            .collect())
    }

    pub(crate) fn encompasses(
        &self,
        other: &Pattern,
        this_resolver: &Resolver,
        other_resolver: &Resolver,
        visited: &mut Visited,
    ) -> MatchResult {
        match other {
            Pattern::List(theirs) => self
                .element
                .encompasses(&theirs.element, this_resolver, other_resolver, visited)
                .breadcrumb("[]"),
            Pattern::Tuple(tuple) => MatchResult::from_failures(
                tuple
                    .elements
                    .iter()
                    .enumerate()
                    .filter_map(|(i, element)| {
                        self.element
                            .encompasses(element, this_resolver, other_resolver, visited)
                            .into_failure()
                            .map(|f| f.breadcrumb(format!("[{i}]")))
                    })
                    .collect(),
            ),
            _ => MatchResult::failure(
                this_resolver
                    .messages()
                    .mismatch("json array", &other.type_name()),
            ),
        }
    }
}

// ── Tuple ──

/// A fixed number of elements, each with its own pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct TuplePattern {
    elements: Vec<Pattern>,
}

impl TuplePattern {
    #[must_use]
    pub fn new(elements: Vec<Pattern>) -> Self {
        Self { elements }
    }

    #[must_use]
    pub fn elements(&self) -> &[Pattern] {
        &self.elements
    }

    pub(crate) fn matches(&self, value: &Value, resolver: &Resolver) -> MatchResult {
        let Value::Array(items) = value else {
            return resolver.mismatch("json array", value);
        };
        if items.len() != self.elements.len() {
            return MatchResult::failure(format!(
                "Expected an array of {} elements, actual had {} elements",
                self.elements.len(),
                items.len()
            ));
        }
        MatchResult::from_failures(element_failures(self.elements.iter().zip(items), resolver))
    }

    pub(crate) fn generate(&self, resolver: &Resolver) -> Result<Value, ContractError> {
        self.elements
            .iter()
            .map(|element| element.generate(resolver))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    }

    pub(crate) fn new_based_on(&self, row: &Row, resolver: &Resolver) -> Result<Vec<Pattern>, ContractError> {
        let options = self
            .elements
            .iter()
            .map(|element| element.new_based_on(row, resolver))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(bounded_product(&options, resolver.max_combinations())
            .into_iter()
            .map(|elements| Pattern::Tuple(Self { elements }))
            .collect())
    }

    pub(crate) fn negative_based_on(&self, row: &Row, resolver: &Resolver) -> Result<Vec<Pattern>, ContractError> {
        let mut negatives = Vec::new();
        for (index, element) in self.elements.iter().enumerate() {
            for negative in element.negative_based_on(row, resolver)? {
                let mut elements = self.elements.clone();
                elements[index] = negative;
                negatives.push(Pattern::Tuple(Self { elements }));
                if negatives.len() >= resolver.max_combinations() {
                    return Ok(negatives);
                }
            }
        }
        Ok(negatives)
    }

    pub(crate) fn encompasses(
        &self,
        other: &TuplePattern,
        this_resolver: &Resolver,
        other_resolver: &Resolver,
        visited: &mut Visited,
    ) -> MatchResult {
        if self.elements.len() != other.elements.len() {
            return MatchResult::failure(this_resolver.messages().mismatch(
                &format!("an array of {} elements", self.elements.len()),
                &format!("an array of {} elements", other.elements.len()),
            ));
        }
        MatchResult::from_failures(
            self.elements
                .iter()
                .zip(&other.elements)
                .enumerate()
                .filter_map(|(i, (mine, theirs))| {
                    mine.encompasses(theirs, this_resolver, other_resolver, visited)
                        .into_failure()
                        .map(|f| f.breadcrumb(format!("[{i}]")))
                })
                .collect(),
        )
    }
}
