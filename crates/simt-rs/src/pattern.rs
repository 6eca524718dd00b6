use crate::{index::InstId, rewriter::ProgramRewriter, spec::Operation};

/// Predicate used to restrict which operations a pattern should consider.
pub type OperationMatcher = fn(&Operation) -> bool;

pub trait OperationView: Clone {
    const MATCHER: OperationMatcher;
    fn extract(root: InstId, rewriter: &ProgramRewriter) -> Option<Self>;
}

mod views;
pub use views::*;

/// Base trait for rewrite patterns operating on lane IR.
pub trait Pattern: Send + Sync {
    fn matches_operation(&self, op: &Operation) -> bool {
        let _ = op;
        true
    }
    fn benefit(&self) -> u16 {
        1
    }
    fn match_and_rewrite(&self, root: InstId, rewriter: &mut ProgramRewriter) -> bool;
}

/// Typed convenience trait for patterns over a single operation view.
pub trait OpRewritePattern<T> {
    fn benefit(&self) -> u16 {
        1
    }
    fn may_match(&self, _op: &T, _rewriter: &ProgramRewriter) -> bool {
        true
    }
    fn match_and_rewrite(&self, op: T, rewriter: &mut ProgramRewriter) -> bool;
}

/// Adapter converting a typed pattern into a `Pattern`.
pub struct TypedPattern<P, T> {
    pattern: P,
    matcher: Option<OperationMatcher>,
    extractor: fn(InstId, &ProgramRewriter) -> Option<T>,
}

impl<P, T> TypedPattern<P, T> {
    pub fn with_operation_matcher(
        pattern: P,
        matcher: OperationMatcher,
        extractor: fn(InstId, &ProgramRewriter) -> Option<T>,
    ) -> Self {
        Self {
            pattern,
            matcher: Some(matcher),
            extractor,
        }
    }
}

impl<P, V> TypedPattern<P, V>
where
    V: OperationView,
{
    pub fn from_view(pattern: P) -> Self {
        Self::with_operation_matcher(pattern, V::MATCHER, V::extract)
    }
}

impl<P, T> Pattern for TypedPattern<P, T>
where
    P: OpRewritePattern<T> + Send + Sync,
    T: Send,
{
    fn matches_operation(&self, op: &Operation) -> bool {
        match self.matcher {
            Some(matcher) => matcher(op),
            None => true,
        }
    }

    fn benefit(&self) -> u16 {
        self.pattern.benefit()
    }

    fn match_and_rewrite(&self, root: InstId, rewriter: &mut ProgramRewriter) -> bool {
        let Some(view) = (self.extractor)(root, rewriter) else {
            return false;
        };
        if !self.pattern.may_match(&view, rewriter) {
            return false;
        }
        self.pattern.match_and_rewrite(view, rewriter)
    }
}

/// Mutable set that collects rewrite patterns prior to freezing.
pub struct PatternSet {
    patterns: Vec<Box<dyn Pattern>>,
}

impl PatternSet {
    pub fn new() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    pub fn add<P>(&mut self, pattern: P) -> &mut Self
    where
        P: Pattern + 'static,
    {
        self.patterns.push(Box::new(pattern));
        self
    }

    pub fn insert_view<V, P>(&mut self, pattern: P) -> &mut Self
    where
        V: OperationView + Send + 'static,
        P: OpRewritePattern<V> + Send + Sync + 'static,
    {
        self.add(TypedPattern::<P, V>::from_view(pattern))
    }

    pub fn freeze(mut self) -> FrozenPatternSet {
        self.patterns
            .sort_by_key(|pattern| std::cmp::Reverse(pattern.benefit()));
        FrozenPatternSet {
            patterns: self.patterns,
        }
    }
}

impl Default for PatternSet {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable collection of rewrite patterns ready for use by the driver.
pub struct FrozenPatternSet {
    patterns: Vec<Box<dyn Pattern>>,
}

impl FrozenPatternSet {
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &dyn Pattern)> {
        self.patterns.iter().enumerate().map(|(idx, p)| (idx, &**p))
    }

    pub fn matching<'a>(
        &'a self,
        op: &'a Operation,
    ) -> impl Iterator<Item = (usize, &'a dyn Pattern)> + 'a {
        self.patterns
            .iter()
            .enumerate()
            .filter(move |(_, pattern)| pattern.matches_operation(op))
            .map(|(idx, pattern)| (idx, &**pattern))
    }
}

/// Common operation matchers.
pub mod filters {
    use crate::spec::Operation;

    pub const fn any(op: &Operation) -> bool {
        let _ = op;
        true
    }

    pub fn constant(op: &Operation) -> bool {
        matches!(op, Operation::Constant(_))
    }

    pub fn elementwise(op: &Operation) -> bool {
        matches!(
            op,
            Operation::ElementwiseUnary(_) | Operation::ElementwiseBinary(_)
        )
    }

    pub fn transfer_read(op: &Operation) -> bool {
        matches!(op, Operation::TransferRead(_))
    }

    pub fn transfer_write(op: &Operation) -> bool {
        matches!(op, Operation::TransferWrite(_))
    }
}
